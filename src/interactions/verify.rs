use axum::{
    body::Body,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use ring::signature::{UnparsedPublicKey, ED25519};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::shared::{AppError, AppState};

pub const SIGNATURE_HEADER: &str = "X-Signature-Ed25519";
pub const TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

const MAX_BODY_BYTES: usize = 1024 * 1024;
const PUBLIC_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Invalid public key: {0}")]
    InvalidKey(String),

    #[error("Malformed signature")]
    Malformed,

    #[error("Signature does not match")]
    Mismatch,
}

/// Ed25519 key the chat platform signs webhook requests with
#[derive(Debug, Clone)]
pub struct DiscordPublicKey {
    bytes: Vec<u8>,
}

impl DiscordPublicKey {
    pub fn from_hex(hex_key: &str) -> Result<Self, SignatureError> {
        let bytes =
            hex::decode(hex_key.trim()).map_err(|e| SignatureError::InvalidKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SignatureError> {
        if bytes.len() != PUBLIC_KEY_LEN {
            return Err(SignatureError::InvalidKey(format!(
                "expected {PUBLIC_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
        })
    }

    /// Checks `signature_hex` over `timestamp || body`
    pub fn verify(
        &self,
        timestamp: &str,
        body: &[u8],
        signature_hex: &str,
    ) -> Result<(), SignatureError> {
        let signature = hex::decode(signature_hex).map_err(|_| SignatureError::Malformed)?;

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        UnparsedPublicKey::new(&ED25519, &self.bytes)
            .verify(&message, &signature)
            .map_err(|_| SignatureError::Mismatch)
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Rejects requests whose body was not signed by the configured key.
/// Usage: .route_layer(middleware::from_fn_with_state(state.clone(), verify_signature))
#[instrument(skip(state, req, next))]
pub async fn verify_signature(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = req.into_parts();

    let (Some(signature), Some(timestamp)) = (
        header(&parts.headers, SIGNATURE_HEADER),
        header(&parts.headers, TIMESTAMP_HEADER),
    ) else {
        warn!("Missing signature headers");
        return Err(AppError::Unauthorized("invalid signature".to_string()));
    };

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable body: {e}")))?;

    if let Err(e) = state.public_key.verify(timestamp, &bytes, signature) {
        warn!(error = %e, "Rejected interaction signature");
        return Err(AppError::Unauthorized("invalid signature".to_string()));
    }

    Ok(next.run(Request::from_parts(parts, Body::from(bytes))).await)
}
