use axum::{
    body::Body,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

pub const FAKE_BOT_TOKEN: &str = "test-token";

#[derive(Default)]
struct FakeDiscordState {
    calls: Vec<String>,
    bodies: Vec<Value>,
    channels: Vec<Value>,
    next_id: u32,
    rate_limit_next_pin: bool,
}

/// In-process stand-in for the Discord REST api, recording every call
#[derive(Clone, Default)]
pub struct FakeDiscord {
    state: Arc<Mutex<FakeDiscordState>>,
}

#[allow(dead_code)]
impl FakeDiscord {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next pin request is answered with a short 429
    pub async fn rate_limit_next_pin(&self) {
        self.state.lock().await.rate_limit_next_pin = true;
    }

    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn bodies(&self) -> Vec<Value> {
        self.state.lock().await.bodies.clone()
    }

    /// Serves on an ephemeral port and returns the api base url
    pub async fn serve(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        let app = self.router();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v10")
    }

    fn router(&self) -> Router {
        let api = Router::new()
            .route("/users/@me", get(current_user))
            .route("/guilds/:guild_id/channels", get(list_channels).post(create_channel))
            .route("/channels/:channel_id/pins", get(list_pins))
            .route("/channels/:channel_id/pins/:message_id", put(pin))
            .route("/channels/:channel_id/messages", post(send_message))
            .route("/channels/:channel_id/messages/:message_id", patch(edit_message))
            .route(
                "/channels/:channel_id/messages/:message_id/reactions",
                axum::routing::delete(clear_reactions),
            )
            .route(
                "/channels/:channel_id/messages/:message_id/reactions/:emoji/:user",
                put(add_reaction).delete(remove_reaction),
            )
            .layer(middleware::from_fn(require_bot_token));

        Router::new()
            .nest("/api/v10", api)
            .with_state(self.state.clone())
    }
}

type Shared = State<Arc<Mutex<FakeDiscordState>>>;

async fn require_bot_token(request: Request<Body>, next: Next) -> Response {
    let authorized = request
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bot {FAKE_BOT_TOKEN}").as_str());
    if !authorized {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    next.run(request).await
}

async fn current_user(State(state): Shared) -> Json<Value> {
    state.lock().await.calls.push("GET /users/@me".to_string());
    Json(json!({ "id": "bot-1", "username": "tonkatsu", "bot": true }))
}

async fn list_channels(State(state): Shared, Path(guild_id): Path<String>) -> Json<Value> {
    let mut state = state.lock().await;
    state.calls.push(format!("GET /guilds/{guild_id}/channels"));
    let channels: Vec<Value> = state
        .channels
        .iter()
        .filter(|c| c["guild_id"] == guild_id.as_str())
        .cloned()
        .chain(std::iter::once(
            json!({ "id": "voice-1", "type": 2, "guild_id": guild_id, "name": "leaderboard" }),
        ))
        .collect();
    Json(Value::Array(channels))
}

async fn create_channel(
    State(state): Shared,
    Path(guild_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().await;
    state.next_id += 1;
    let channel = json!({
        "id": format!("chan-{}", state.next_id),
        "type": body["type"],
        "guild_id": guild_id,
        "name": body["name"],
    });
    state.calls.push(format!(
        "POST /guilds/{guild_id}/channels {}",
        body["name"].as_str().unwrap_or_default()
    ));
    state.channels.push(channel.clone());
    Json(channel)
}

async fn list_pins(State(state): Shared, Path(channel_id): Path<String>) -> Json<Value> {
    state
        .lock()
        .await
        .calls
        .push(format!("GET /channels/{channel_id}/pins"));
    Json(json!([]))
}

async fn pin(
    State(state): Shared,
    Path((channel_id, message_id)): Path<(String, String)>,
) -> Response {
    let mut state = state.lock().await;
    state
        .calls
        .push(format!("PUT /channels/{channel_id}/pins/{message_id}"));
    if std::mem::take(&mut state.rate_limit_next_pin) {
        let body = json!({
            "message": "You are being rate limited.",
            "retry_after": 0.01,
            "global": false,
        });
        return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn send_message(
    State(state): Shared,
    Path(channel_id): Path<String>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().await;
    state.next_id += 1;
    let id = format!("msg-{}", state.next_id);
    state.calls.push(format!("POST /channels/{channel_id}/messages"));
    state.bodies.push(body);
    Json(json!({ "id": id, "channel_id": channel_id, "author": { "id": "bot-1" } }))
}

async fn edit_message(
    State(state): Shared,
    Path((channel_id, message_id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut state = state.lock().await;
    state
        .calls
        .push(format!("PATCH /channels/{channel_id}/messages/{message_id}"));
    state.bodies.push(body);
    Json(json!({ "id": message_id, "channel_id": channel_id, "author": { "id": "bot-1" } }))
}

async fn clear_reactions(
    State(state): Shared,
    Path((channel_id, message_id)): Path<(String, String)>,
) -> StatusCode {
    state.lock().await.calls.push(format!(
        "DELETE /channels/{channel_id}/messages/{message_id}/reactions"
    ));
    StatusCode::NO_CONTENT
}

async fn add_reaction(
    State(state): Shared,
    Path((channel_id, message_id, emoji, user)): Path<(String, String, String, String)>,
) -> StatusCode {
    state.lock().await.calls.push(format!(
        "PUT /channels/{channel_id}/messages/{message_id}/reactions/{emoji}/{user}"
    ));
    StatusCode::NO_CONTENT
}

async fn remove_reaction(
    State(state): Shared,
    Path((channel_id, message_id, emoji, user)): Path<(String, String, String, String)>,
) -> StatusCode {
    state.lock().await.calls.push(format!(
        "DELETE /channels/{channel_id}/messages/{message_id}/reactions/{emoji}/{user}"
    ));
    StatusCode::NO_CONTENT
}
