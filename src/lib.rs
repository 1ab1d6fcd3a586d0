use async_trait::async_trait;
use thiserror::Error;

pub mod aggregator;
pub mod config;
pub mod handshake;
pub mod parser;
pub mod process;
pub mod score;
pub mod session;
pub mod state;
pub mod uci;
pub mod wdl;

pub use aggregator::{AnalysisResult, LineResult, ResultAggregator};
pub use config::EngineConfig;
pub use handshake::EngineIdentity;
pub use process::ProcessSupervisor;
pub use score::{Score, Side};
pub use session::{AnalysisRequest, AnalysisSession, SearchLimit};
pub use state::{EngineState, StateHandle};
pub use wdl::Wdl;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Engine process not running")]
    NotRunning,
    #[error("Engine failed to start: {0}")]
    SpawnFailed(String),
    #[error("Engine did not complete the UCI handshake in time")]
    HandshakeTimeout,
    #[error("Engine did not answer isready in time")]
    SyncTimeout,
    #[error("Engine timeout")]
    Timeout,
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Analysis failed after {attempts} attempt(s)")]
    RetriesExhausted { attempts: u32 },
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Line-oriented duplex channel to a UCI engine.
///
/// The session is the only writer and the only reader; implementations don't
/// need to be shareable. `ProcessSupervisor` is the production implementation.
#[async_trait]
pub trait EngineTransport: Send {
    async fn start(&mut self) -> Result<(), EngineError>;

    fn is_alive(&mut self) -> bool;

    /// Tears the engine down. Must not fail.
    async fn stop(&mut self);

    async fn restart(&mut self) -> Result<(), EngineError> {
        self.stop().await;
        self.start().await
    }

    async fn send(&mut self, line: &str) -> Result<(), EngineError>;

    /// Next line from the engine, without the trailing newline.
    async fn read_line(&mut self) -> Result<String, EngineError>;
}
