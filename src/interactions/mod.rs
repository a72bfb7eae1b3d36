pub mod handlers;
pub mod types;
pub mod verify;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{handle_interaction, health, STANDINGS_ERROR_MESSAGE};
pub use types::{interaction_type, Embed, EmbedField, Interaction, InteractionResponse};
pub use verify::{verify_signature, DiscordPublicKey, SignatureError, SIGNATURE_HEADER, TIMESTAMP_HEADER};

use crate::shared::AppState;

/// HTTP surface: the signed interactions webhook plus a health check
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/interactions", post(handle_interaction))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            verify_signature,
        ))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
