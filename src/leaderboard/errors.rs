use thiserror::Error;

use crate::metrics::MetricsError;
use crate::names::NameError;

#[derive(Debug, Clone, Error)]
pub enum LeaderboardError {
    #[error("Invalid player id at position {index}")]
    InvalidPlayerId { index: usize },

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),

    #[error("Name lookup error: {0}")]
    NameLookup(#[from] NameError),

    #[error("Timed out while {0}")]
    Timeout(&'static str),
}

impl LeaderboardError {
    /// Whether the failure came from the caller's input rather than a collaborator
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, LeaderboardError::InvalidPlayerId { .. })
    }
}
