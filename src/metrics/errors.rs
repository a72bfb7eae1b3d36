use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MetricsError {
    #[error("Metrics store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid continuation token: {0}")]
    InvalidToken(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
