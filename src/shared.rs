use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::interactions::{DiscordPublicKey, InteractionResponse};
use crate::leaderboard::{LeaderboardService, StandingsPresenter};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub leaderboard: Arc<LeaderboardService>,
    pub presenter: Arc<StandingsPresenter>,
    pub public_key: Arc<DiscordPublicKey>,
    /// Bound on building a standings reply
    pub call_timeout: Duration,
}

impl AppState {
    pub fn new(
        leaderboard: Arc<LeaderboardService>,
        presenter: Arc<StandingsPresenter>,
        public_key: DiscordPublicKey,
        call_timeout: Duration,
    ) -> Self {
        Self {
            leaderboard,
            presenter,
            public_key: Arc::new(public_key),
            call_timeout,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
        };

        (status, Json(InteractionResponse::message(message))).into_response()
    }
}
