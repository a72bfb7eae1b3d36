use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Error)]
pub enum NameError {
    #[error("Player not found: {0}")]
    NotFound(String),

    #[error("Name service error: {0}")]
    Upstream(String),
}

#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Current username for a player id
    async fn get_username(&self, player_id: &str) -> Result<String, NameError>;

    /// Player id for a username, `None` when no such player exists
    async fn get_uuid(&self, username: &str) -> Result<Option<String>, NameError>;
}

/// Fixed id -> username table, for local runs and tests
#[derive(Debug, Default, Clone)]
pub struct InMemoryNameResolver {
    names: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryNameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_players<I, K, V>(players: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let names = players
            .into_iter()
            .map(|(id, name)| (id.into(), name.into()))
            .collect();
        Self {
            names: Arc::new(RwLock::new(names)),
        }
    }

    pub async fn insert(&self, player_id: impl Into<String>, username: impl Into<String>) {
        self.names
            .write()
            .await
            .insert(player_id.into(), username.into());
    }
}

#[async_trait]
impl NameResolver for InMemoryNameResolver {
    async fn get_username(&self, player_id: &str) -> Result<String, NameError> {
        self.names
            .read()
            .await
            .get(player_id)
            .cloned()
            .ok_or_else(|| NameError::NotFound(player_id.to_string()))
    }

    async fn get_uuid(&self, username: &str) -> Result<Option<String>, NameError> {
        let names = self.names.read().await;
        Ok(names
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(username))
            .map(|(id, _)| id.clone()))
    }
}
