#![allow(dead_code)]

use std::collections::VecDeque;

use async_trait::async_trait;
use engine_supervisor::{EngineConfig, EngineError, EngineTransport};

pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const AFTER_E4_FEN: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

/// How the fake engine answers. Shared by every "process" it starts.
#[derive(Debug, Clone)]
pub struct Script {
    pub answer_uci: bool,
    pub answer_isready: bool,
    /// Lines printed for each `go`.
    pub search: Vec<String>,
    /// The next this many `go` commands print nothing.
    pub hang_searches: u32,
    /// The next this many `go` commands kill the engine.
    pub die_on_search: u32,
    /// Printed in reply to `stop`.
    pub on_stop: Vec<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            answer_uci: true,
            answer_isready: true,
            search: lines(&[
                "info depth 10 seldepth 14 multipv 1 score cp 32 wdl 80 870 50 nodes 52000 pv e2e4 e7e5 g1f3",
                "bestmove e2e4 ponder e7e5",
            ]),
            hang_searches: 0,
            die_on_search: 0,
            on_stop: Vec::new(),
        }
    }
}

pub fn lines(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|l| l.to_string()).collect()
}

/// In-memory engine speaking just enough UCI for the session tests.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    pub script: Script,
    pub sent: Vec<String>,
    pub starts: u32,
    pub stops: u32,
    pub uci_count: u32,
    pub live: u32,
    pub max_live: u32,
    alive: bool,
    outbox: VecDeque<String>,
}

impl ScriptedEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn sent_since(&self, command: &str) -> &[String] {
        let start = self
            .sent
            .iter()
            .rposition(|line| line == command)
            .unwrap_or(0);
        &self.sent[start..]
    }

    fn respond(&mut self, line: &str) {
        let command = line.split_whitespace().next().unwrap_or("");
        match command {
            "uci" => {
                self.uci_count += 1;
                if self.script.answer_uci {
                    self.outbox.push_back("id name Scripted 1.0".to_string());
                    self.outbox.push_back("id author Test Suite".to_string());
                    self.outbox.push_back("option name MultiPV type spin default 1".to_string());
                    self.outbox.push_back("uciok".to_string());
                }
            }
            "isready" => {
                if self.script.answer_isready {
                    self.outbox.push_back("readyok".to_string());
                }
            }
            "go" => {
                if self.script.die_on_search > 0 {
                    self.script.die_on_search -= 1;
                    self.alive = false;
                    self.live -= 1;
                } else if self.script.hang_searches > 0 {
                    self.script.hang_searches -= 1;
                } else {
                    let search = self.script.search.clone();
                    self.outbox.extend(search);
                }
            }
            "stop" => {
                let replies = self.script.on_stop.clone();
                self.outbox.extend(replies);
            }
            _ => {}
        }
    }
}

#[async_trait]
impl EngineTransport for ScriptedEngine {
    async fn start(&mut self) -> Result<(), EngineError> {
        if self.alive {
            self.stop().await;
        }
        self.starts += 1;
        self.alive = true;
        self.live += 1;
        self.max_live = self.max_live.max(self.live);
        self.outbox.clear();
        Ok(())
    }

    fn is_alive(&mut self) -> bool {
        self.alive
    }

    async fn stop(&mut self) {
        self.stops += 1;
        if self.alive {
            self.alive = false;
            self.live -= 1;
        }
        self.outbox.clear();
    }

    async fn send(&mut self, line: &str) -> Result<(), EngineError> {
        if !self.alive {
            return Err(EngineError::NotRunning);
        }
        self.sent.push(line.to_string());
        self.respond(line);
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, EngineError> {
        if !self.alive {
            return Err(EngineError::NotRunning);
        }
        match self.outbox.pop_front() {
            Some(line) => Ok(line),
            // A silent engine: the caller's deadline has to fire.
            None => std::future::pending().await,
        }
    }
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        handshake_timeout_ms: 100,
        sync_timeout_ms: 100,
        search_timeout_ms: 200,
        stop_grace_ms: 100,
        spawn_grace_ms: 0,
        match_timeout_ms: 300,
        ..EngineConfig::default()
    }
}
