use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum EngineState {
    Uninitialized = 0,
    Starting = 1,
    Ready = 2,
    Analyzing = 3,
    Error = 4,
}

impl EngineState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Starting,
            2 => Self::Ready,
            3 => Self::Analyzing,
            _ => Self::Error,
        }
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Analyzing => "analyzing",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Read-only view of a session's state, safe to poll from other threads
/// while an analysis is in flight.
#[derive(Debug, Clone)]
pub struct StateHandle(Arc<AtomicU8>);

impl StateHandle {
    pub fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }
}

/// Owner side of the state cell. Only the session writes.
#[derive(Debug)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicU8::new(EngineState::Uninitialized as u8)))
    }

    pub(crate) fn get(&self) -> EngineState {
        EngineState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn set(&self, next: EngineState) {
        let prev = EngineState::from_u8(self.0.swap(next as u8, Ordering::AcqRel));
        if prev != next {
            log::debug!("engine state {} -> {}", prev, next);
        }
    }

    pub(crate) fn handle(&self) -> StateHandle {
        StateHandle(Arc::clone(&self.0))
    }
}
