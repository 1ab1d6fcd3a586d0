use std::error::Error;

use engine_supervisor::{AnalysisRequest, AnalysisSession, EngineConfig};

const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Analyses the FEN given on the command line (the start position if none)
/// and prints the result as JSON. Engine settings come from `ENGINE_*`
/// variables or a `.env` file.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let fen = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    let fen = if fen.trim().is_empty() { START_FEN.to_string() } else { fen };

    let config = EngineConfig::from_env()?;
    let request = AnalysisRequest::from_config(&fen, &config)?;
    log::info!("analysing {} with {}", request.fen(), config.engine_path.display());

    let mut session = AnalysisSession::new(config);
    let result = session.run_analysis(&request).await;
    session.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}
