use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{NameError, NameResolver};

pub const PLAYERDB_BASE_URL: &str = "https://playerdb.co/api/player/minecraft";

const PLAYER_FOUND: &str = "player.found";

#[derive(Debug, Deserialize)]
struct PlayerDbResponse {
    code: String,
    #[serde(default)]
    data: PlayerDbData,
}

#[derive(Debug, Default, Deserialize)]
struct PlayerDbData {
    #[serde(default)]
    player: Option<PlayerDbPlayer>,
}

#[derive(Debug, Deserialize)]
struct PlayerDbPlayer {
    #[serde(default)]
    username: String,
    #[serde(default)]
    raw_id: String,
}

/// Name lookups against the playerdb.co Minecraft API
#[derive(Debug, Clone)]
pub struct PlayerDbResolver {
    client: reqwest::Client,
    base_url: Url,
}

impl PlayerDbResolver {
    pub fn new(timeout: Duration) -> Result<Self, NameError> {
        Self::with_base_url(PLAYERDB_BASE_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, NameError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| NameError::Upstream(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(NameError::Upstream(format!("{base_url} cannot be a base url")));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tonkatsu/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NameError::Upstream(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// The base url with `key` appended as one encoded path segment
    fn player_url(&self, key: &str) -> Result<Url, NameError> {
        if key.is_empty() {
            return Err(NameError::NotFound(key.to_string()));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| NameError::Upstream(format!("{} cannot be a base url", self.base_url)))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }

    #[instrument(skip(self))]
    async fn lookup(&self, key: &str) -> Result<PlayerDbResponse, NameError> {
        let url = self.player_url(key)?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| NameError::Upstream(e.to_string()))?;

        // playerdb answers unknown players with a 4xx and a JSON body carrying the code
        let status = response.status();
        let body: PlayerDbResponse = response.json().await.map_err(|e| {
            warn!(%status, error = %e, "Undecodable playerdb response");
            NameError::Upstream(format!("invalid response ({status}): {e}"))
        })?;

        debug!(%status, code = %body.code, "playerdb lookup complete");
        Ok(body)
    }
}

fn found_player(response: PlayerDbResponse) -> Option<PlayerDbPlayer> {
    if response.code != PLAYER_FOUND {
        return None;
    }
    response.data.player
}

#[async_trait]
impl NameResolver for PlayerDbResolver {
    async fn get_username(&self, player_id: &str) -> Result<String, NameError> {
        let response = self.lookup(player_id).await?;
        found_player(response)
            .map(|p| p.username)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| NameError::NotFound(player_id.to_string()))
    }

    async fn get_uuid(&self, username: &str) -> Result<Option<String>, NameError> {
        if username.is_empty() {
            return Ok(None);
        }
        let response = self.lookup(username).await?;
        Ok(found_player(response)
            .map(|p| p.raw_id)
            .filter(|id| !id.is_empty()))
    }
}
