use axum::{body::Bytes, extract::State, Json};
use tracing::{error, info, instrument, warn};

use super::types::{interaction_type, Embed, Interaction, InteractionResponse};
use crate::leaderboard::{DisplayDocument, LeaderboardError, RenderOptions};
use crate::shared::{AppError, AppState};

pub const STANDINGS_ERROR_MESSAGE: &str = "error fetching standings";

/// POST /interactions
#[instrument(name = "handle_interaction", skip(state, body))]
pub async fn handle_interaction(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<InteractionResponse>, AppError> {
    let interaction: Interaction = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "Malformed interaction payload");
        AppError::BadRequest(format!("malformed interaction: {e}"))
    })?;

    match interaction.kind {
        interaction_type::PING => Ok(Json(InteractionResponse::pong())),
        interaction_type::APPLICATION_COMMAND => match interaction.command_name() {
            Some("leaderboard") => Ok(Json(leaderboard(&state).await)),
            Some("version") => Ok(Json(InteractionResponse::message(version()))),
            other => {
                warn!(command = ?other, "Unknown command");
                Err(AppError::Unprocessable(format!(
                    "unknown command: {}",
                    other.unwrap_or_default()
                )))
            }
        },
        other => Err(AppError::Unprocessable(format!(
            "unsupported interaction type: {other}"
        ))),
    }
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

async fn leaderboard(state: &AppState) -> InteractionResponse {
    let document = tokio::time::timeout(state.call_timeout, standings_document(state))
        .await
        .unwrap_or(Err(LeaderboardError::Timeout("fetching standings")));

    match document {
        Ok(document) => {
            info!(players = document.fields.len(), "Answered leaderboard command");
            InteractionResponse::embed(Embed::from(&document))
        }
        Err(e) => {
            error!(error = %e, "Failed to build standings for leaderboard command");
            InteractionResponse::message(STANDINGS_ERROR_MESSAGE)
        }
    }
}

async fn standings_document(state: &AppState) -> Result<DisplayDocument, LeaderboardError> {
    let standings = state.leaderboard.get_standings().await?;
    state
        .presenter
        .render(&standings, RenderOptions::default())
        .await
}

fn version() -> String {
    format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
