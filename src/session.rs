use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::aggregator::{AnalysisResult, ResultAggregator};
use crate::config::EngineConfig;
use crate::handshake::{self, EngineIdentity, read_until, send};
use crate::parser::UciMessage;
use crate::process::ProcessSupervisor;
use crate::score::Side;
use crate::state::{EngineState, StateCell, StateHandle};
use crate::uci::UciCommand;
use crate::{EngineError, EngineTransport};

/// Depth-limited searches are reproducible; time-limited ones trade that
/// for strength on complicated positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchLimit {
    Depth(u32),
    MoveTime(u64),
}

impl SearchLimit {
    fn command(self) -> UciCommand {
        match self {
            SearchLimit::Depth(depth) => UciCommand::GoDepth(depth),
            SearchLimit::MoveTime(ms) => UciCommand::GoMoveTime(ms),
        }
    }

    fn movetime(self) -> Option<u64> {
        match self {
            SearchLimit::Depth(_) => None,
            SearchLimit::MoveTime(ms) => Some(ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    fen: String,
    side_to_move: Side,
    limit: SearchLimit,
    multi_pv: u32,
}

impl AnalysisRequest {
    pub fn new(fen: &str, limit: SearchLimit, multi_pv: u32) -> Result<Self, EngineError> {
        let fen = fen.trim();
        let side_to_move = Side::from_fen(fen)?;
        if multi_pv == 0 {
            return Err(EngineError::InvalidRequest("multi_pv must be at least 1".to_string()));
        }
        if matches!(limit, SearchLimit::Depth(0) | SearchLimit::MoveTime(0)) {
            return Err(EngineError::InvalidRequest("search limit must be positive".to_string()));
        }
        Ok(Self {
            fen: fen.to_string(),
            side_to_move,
            limit,
            multi_pv,
        })
    }

    /// Time-based search when the config carries a minimum time budget,
    /// depth-based otherwise.
    pub fn from_config(fen: &str, config: &EngineConfig) -> Result<Self, EngineError> {
        let limit = match config.min_time_ms {
            Some(ms) => SearchLimit::MoveTime(ms),
            None => SearchLimit::Depth(config.depth),
        };
        Self::new(fen, limit, config.multi_pv)
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    pub fn side_to_move(&self) -> Side {
        self.side_to_move
    }

    pub fn limit(&self) -> SearchLimit {
        self.limit
    }

    pub fn multi_pv(&self) -> u32 {
        self.multi_pv
    }
}

/// Steps of a single analysis attempt, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Revive,
    Sync,
    Configure,
    Search,
}

struct AttemptFailure {
    phase: Phase,
    error: EngineError,
    partial: Option<AnalysisResult>,
}

impl AttemptFailure {
    fn at(phase: Phase) -> impl FnOnce(EngineError) -> Self {
        move |error| Self {
            phase,
            error,
            partial: None,
        }
    }
}

/// Drives one supervised engine. Every command goes through `&mut self`, so
/// there is only ever one writer and one reader on the pipes.
pub struct AnalysisSession<T: EngineTransport = ProcessSupervisor> {
    transport: T,
    config: EngineConfig,
    state: StateCell,
    identity: Option<EngineIdentity>,
    /// Set when a match request was abandoned while the engine was still
    /// searching.
    needs_resync: bool,
}

impl AnalysisSession<ProcessSupervisor> {
    pub fn new(config: EngineConfig) -> Self {
        let transport = ProcessSupervisor::new(config.engine_path.clone(), config.spawn_grace());
        Self::with_transport(transport, config)
    }
}

impl<T: EngineTransport> AnalysisSession<T> {
    pub fn with_transport(transport: T, config: EngineConfig) -> Self {
        Self {
            transport,
            config,
            state: StateCell::new(),
            identity: None,
            needs_resync: false,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.handle()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn engine_name(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|id| id.name.as_deref())
    }

    /// Spawns the engine and runs the handshake.
    pub async fn initialize(&mut self) -> Result<(), EngineError> {
        self.bring_up(false).await
    }

    /// Tears the current process down and brings up a new one. Safe to call
    /// repeatedly from `Error`.
    pub async fn restart(&mut self) -> Result<(), EngineError> {
        self.bring_up(true).await
    }

    pub async fn shutdown(&mut self) {
        self.transport.stop().await;
        self.identity = None;
        self.needs_resync = false;
        self.state.set(EngineState::Uninitialized);
    }

    async fn bring_up(&mut self, restart: bool) -> Result<(), EngineError> {
        self.state.set(EngineState::Starting);
        self.needs_resync = false;

        let started = if restart {
            self.transport.restart().await
        } else {
            self.transport.start().await
        };
        let result = match started {
            Ok(()) => handshake::perform_handshake(&mut self.transport, &self.config).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(identity) => {
                self.identity = Some(identity);
                self.state.set(EngineState::Ready);
                Ok(())
            }
            Err(e) => {
                log::warn!("engine failed to come up: {}", e);
                self.transport.stop().await;
                self.state.set(EngineState::Error);
                Err(e)
            }
        }
    }

    fn needs_revive(&mut self) -> bool {
        self.state.get() != EngineState::Ready || !self.transport.is_alive()
    }

    /// Makes sure nothing from an earlier exchange is still queued.
    async fn resync(&mut self) -> Result<(), EngineError> {
        if self.needs_resync {
            log::debug!("stopping abandoned search before reuse");
            send(&mut self.transport, UciCommand::Stop).await?;
        }
        handshake::sync(&mut self.transport, self.config.sync_timeout()).await?;
        self.needs_resync = false;
        Ok(())
    }

    /// Runs a full analysis with bounded retries. Each failed attempt leaves
    /// the engine in `Error` and the next attempt starts with a fresh process.
    pub async fn run_analysis(
        &mut self,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResult, EngineError> {
        let max_attempts = self.config.max_retries.max(1);
        let mut salvaged = None;

        for attempt in 1..=max_attempts {
            match self.attempt(request).await {
                Ok(result) => {
                    log::info!(
                        "analysis done: bestmove {} eval {}",
                        result.best_move.as_deref().unwrap_or("(none)"),
                        result.evaluation
                    );
                    return Ok(result);
                }
                Err(failure) => {
                    log::warn!(
                        "analysis attempt {}/{} failed during {:?}: {}",
                        attempt,
                        max_attempts,
                        failure.phase,
                        failure.error
                    );
                    self.state.set(EngineState::Error);
                    if failure.partial.is_some() {
                        salvaged = failure.partial;
                    }
                }
            }
        }

        match salvaged {
            Some(partial) => {
                log::warn!("returning partial result after {} attempts", max_attempts);
                Ok(partial)
            }
            None => {
                log::error!("analysis gave up after {} attempts", max_attempts);
                Err(EngineError::RetriesExhausted {
                    attempts: max_attempts,
                })
            }
        }
    }

    async fn attempt(&mut self, request: &AnalysisRequest) -> Result<AnalysisResult, AttemptFailure> {
        let mut phase = Phase::Revive;
        loop {
            phase = match phase {
                Phase::Revive => {
                    if self.needs_revive() {
                        self.restart().await.map_err(AttemptFailure::at(phase))?;
                    }
                    Phase::Sync
                }
                Phase::Sync => {
                    self.resync().await.map_err(AttemptFailure::at(phase))?;
                    Phase::Configure
                }
                Phase::Configure => {
                    self.configure(request).await.map_err(AttemptFailure::at(phase))?;
                    Phase::Search
                }
                Phase::Search => return self.search(request).await,
            };
        }
    }

    async fn configure(&mut self, request: &AnalysisRequest) -> Result<(), EngineError> {
        let commands = [
            UciCommand::set_option("MultiPV", request.multi_pv()),
            // Fresh hash and history for every independent position.
            UciCommand::UciNewGame,
            UciCommand::PositionFen(request.fen().to_string()),
        ];
        for command in commands {
            send(&mut self.transport, command).await?;
        }
        Ok(())
    }

    async fn search(&mut self, request: &AnalysisRequest) -> Result<AnalysisResult, AttemptFailure> {
        let mut aggregator = ResultAggregator::new(request.side_to_move(), request.multi_pv());
        let limit = request.limit();

        self.state.set(EngineState::Analyzing);
        send(&mut self.transport, limit.command())
            .await
            .map_err(AttemptFailure::at(Phase::Search))?;

        let deadline = Instant::now() + self.config.search_deadline(limit.movetime());
        let outcome = read_until(&mut self.transport, deadline, |message| {
            collect(&mut aggregator, message)
        })
        .await;

        match outcome {
            Ok(hint) => {
                self.state.set(EngineState::Ready);
                Ok(aggregator.finish(hint.as_deref(), false))
            }
            Err(EngineError::Timeout) => {
                // Ask for whatever the engine has; the process is still
                // retired afterwards.
                let _ = send(&mut self.transport, UciCommand::Stop).await;
                let grace = Instant::now() + self.config.stop_grace();
                let salvage = read_until(&mut self.transport, grace, |message| {
                    collect(&mut aggregator, message)
                })
                .await;
                self.state.set(EngineState::Error);
                Err(AttemptFailure {
                    phase: Phase::Search,
                    error: EngineError::Timeout,
                    partial: salvage.ok().map(|hint| aggregator.finish(hint.as_deref(), true)),
                })
            }
            Err(error) => {
                self.state.set(EngineState::Error);
                Err(AttemptFailure {
                    phase: Phase::Search,
                    error,
                    partial: None,
                })
            }
        }
    }

    /// Plays one move of an ongoing game.
    ///
    /// Keeps the hash between calls (no `ucinewgame`), always searches a
    /// single line and never retries. Returns `None` on failure or when
    /// `cancel` fires. A cancelled search may still be running inside the
    /// engine; it is stopped and drained at the start of the next request.
    pub async fn run_match_move(
        &mut self,
        fen: &str,
        go_command: &str,
        cancel: &CancellationToken,
    ) -> Option<String> {
        let go = go_command.trim();
        if go != "go" && !go.starts_with("go ") {
            log::warn!("rejecting match search command '{}'", go);
            return None;
        }
        if cancel.is_cancelled() {
            return None;
        }
        if self.needs_revive() {
            if let Err(e) = self.restart().await {
                log::warn!("match move: engine unavailable: {}", e);
                return None;
            }
        }

        if let Err(e) = self.prepare_match_move(fen, go).await {
            log::warn!("match move: {}", e);
            self.state.set(EngineState::Error);
            return None;
        }

        let deadline = Instant::now() + self.config.match_timeout();
        let read = read_until(&mut self.transport, deadline, |message| match message {
            UciMessage::BestMove { .. } => Some(message.best_move().map(str::to_string)),
            _ => None,
        });
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = read => Some(result),
        };

        match outcome {
            None => {
                log::debug!("match move cancelled; engine may still be searching");
                self.needs_resync = true;
                self.state.set(EngineState::Ready);
                None
            }
            Some(Ok(best_move)) => {
                self.state.set(EngineState::Ready);
                best_move
            }
            Some(Err(e)) => {
                log::warn!("match move failed: {}", e);
                self.state.set(EngineState::Error);
                None
            }
        }
    }

    async fn prepare_match_move(&mut self, fen: &str, go: &str) -> Result<(), EngineError> {
        self.resync().await?;
        send(&mut self.transport, UciCommand::set_option("MultiPV", 1)).await?;
        send(&mut self.transport, UciCommand::PositionFen(fen.to_string())).await?;
        self.state.set(EngineState::Analyzing);
        send(&mut self.transport, UciCommand::GoRaw(go.to_string())).await
    }
}

/// `Some(hint)` once `bestmove` arrives; info lines go to the aggregator.
fn collect(aggregator: &mut ResultAggregator, message: UciMessage) -> Option<Option<String>> {
    match message {
        UciMessage::BestMove { .. } => Some(message.best_move().map(str::to_string)),
        other => {
            aggregator.ingest(&other);
            None
        }
    }
}
