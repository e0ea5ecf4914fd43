//! Turn persistence contracts and a basic in-memory implementation.

use std::sync::Mutex;

use rcommon::BoxFuture;

use crate::{ChatError, Turn};

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

/// Receives each finished turn exactly once: `commit` on success,
/// `salvage_partial` on failure or cancellation.
pub trait TurnSink: Send + Sync {
    fn commit<'a>(&'a self, turn: &'a Turn) -> ChatFuture<'a, Result<(), ChatError>>;

    fn salvage_partial<'a>(&'a self, turn: &'a Turn) -> ChatFuture<'a, Result<(), ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryTurnSink {
    committed: Mutex<Vec<Turn>>,
    salvaged: Mutex<Vec<Turn>>,
}

impl InMemoryTurnSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn committed(&self) -> Result<Vec<Turn>, ChatError> {
        self.committed
            .lock()
            .map(|turns| turns.clone())
            .map_err(|_| ChatError::store("turn sink lock poisoned"))
    }

    pub fn salvaged(&self) -> Result<Vec<Turn>, ChatError> {
        self.salvaged
            .lock()
            .map(|turns| turns.clone())
            .map_err(|_| ChatError::store("turn sink lock poisoned"))
    }
}

impl TurnSink for InMemoryTurnSink {
    fn commit<'a>(&'a self, turn: &'a Turn) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.committed
                .lock()
                .map_err(|_| ChatError::store("turn sink lock poisoned"))?
                .push(turn.clone());
            Ok(())
        })
    }

    fn salvage_partial<'a>(&'a self, turn: &'a Turn) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.salvaged
                .lock()
                .map_err(|_| ChatError::store("turn sink lock poisoned"))?
                .push(turn.clone());
            Ok(())
        })
    }
}
