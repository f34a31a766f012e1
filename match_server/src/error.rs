use std::fmt;

use game_core::Side;
use serde::{Deserialize, Serialize};

/// Scheduler-assigned session handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session limit reached (max {max})")]
    CapacityReached { max: usize },

    #[error("malformed client message: {0}")]
    Decode(#[from] proto::WireError),

    #[error("{0} paddle is not human-controlled")]
    NotHuman(Side),

    #[error("session {0} is ticked by its own loop")]
    LoopDriven(SessionId),
}

/// A snapshot sink that can no longer accept messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("snapshot sink closed")]
pub struct SinkClosed;
