use std::time::Duration;

use tokio::time::Instant;

use crate::config::EngineConfig;
use crate::parser::{UciMessage, parse_uci_line};
use crate::uci::UciCommand;
use crate::{EngineError, EngineTransport};

/// What the engine said about itself during `uci`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineIdentity {
    pub name: Option<String>,
    pub author: Option<String>,
}

pub(crate) async fn send<T>(transport: &mut T, command: UciCommand) -> Result<(), EngineError>
where
    T: EngineTransport + ?Sized,
{
    if !transport.is_alive() {
        return Err(EngineError::NotRunning);
    }
    transport.send(&command.to_string()).await
}

/// Reads decoded lines until `on_message` returns a value or the deadline
/// passes. On expiry the pending read is dropped, so whatever the engine
/// sends afterwards is never delivered to this exchange.
pub(crate) async fn read_until<T, R, F>(
    transport: &mut T,
    deadline: Instant,
    mut on_message: F,
) -> Result<R, EngineError>
where
    T: EngineTransport + ?Sized,
    F: FnMut(UciMessage) -> Option<R>,
{
    let exchange = async {
        loop {
            let line = transport.read_line().await?;
            if let Some(message) = parse_uci_line(&line) {
                if let Some(result) = on_message(message) {
                    return Ok::<R, EngineError>(result);
                }
            }
        }
    };
    tokio::time::timeout_at(deadline, exchange)
        .await
        .map_err(|_| EngineError::Timeout)?
}

/// `uci` / `uciok`, engine options, then `isready` / `readyok`.
///
/// Does not retry and does not touch session state; the caller decides what
/// a failure means.
pub async fn perform_handshake<T>(
    transport: &mut T,
    config: &EngineConfig,
) -> Result<EngineIdentity, EngineError>
where
    T: EngineTransport + ?Sized,
{
    let timeout = config.handshake_timeout();
    let mut identity = EngineIdentity::default();

    send(transport, UciCommand::Uci).await?;
    read_until(transport, Instant::now() + timeout, |message| match message {
        UciMessage::UciOk => Some(()),
        UciMessage::IdName(name) => {
            identity.name = Some(name);
            None
        }
        UciMessage::IdAuthor(author) => {
            identity.author = Some(author);
            None
        }
        _ => None,
    })
    .await
    .map_err(|e| match e {
        EngineError::Timeout => EngineError::HandshakeTimeout,
        other => other,
    })?;

    if config.enable_wdl {
        send(transport, UciCommand::set_option("UCI_ShowWDL", true)).await?;
    }
    for (name, value) in &config.options {
        send(transport, UciCommand::set_option(name.as_str(), value)).await?;
    }

    sync(transport, timeout).await.map_err(|e| match e {
        EngineError::SyncTimeout => EngineError::HandshakeTimeout,
        other => other,
    })?;

    log::info!(
        "handshake complete with {}",
        identity.name.as_deref().unwrap_or("unnamed engine")
    );
    Ok(identity)
}

/// `isready` / `readyok`. Anything else the engine still had queued,
/// including a late `bestmove`, is discarded.
pub async fn sync<T>(transport: &mut T, timeout: Duration) -> Result<(), EngineError>
where
    T: EngineTransport + ?Sized,
{
    send(transport, UciCommand::IsReady).await?;
    read_until(transport, Instant::now() + timeout, |message| match message {
        UciMessage::ReadyOk => Some(()),
        other => {
            log::trace!("discarding {:?} while syncing", other);
            None
        }
    })
    .await
    .map_err(|e| match e {
        EngineError::Timeout => EngineError::SyncTimeout,
        other => other,
    })
}
