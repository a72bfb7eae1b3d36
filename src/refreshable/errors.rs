use thiserror::Error;

use crate::leaderboard::LeaderboardError;

#[derive(Debug, Clone, Error)]
pub enum RefreshableError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Timed out while {0}")]
    Timeout(&'static str),
}

impl RefreshableError {
    pub fn transport(msg: impl Into<String>) -> Self {
        RefreshableError::Transport(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        RefreshableError::Backend(msg.into())
    }
}

impl From<LeaderboardError> for RefreshableError {
    fn from(err: LeaderboardError) -> Self {
        RefreshableError::Backend(err.to_string())
    }
}
