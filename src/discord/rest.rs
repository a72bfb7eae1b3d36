use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::interactions::Embed;
use crate::leaderboard::DisplayDocument;
use crate::refreshable::{Channel, ChatTransport, Message, RefreshableError};

pub const DISCORD_API_BASE_URL: &str = "https://discord.com/api/v10";

const GUILD_TEXT_CHANNEL: u8 = 0;

/// Longest rate-limit wait honoured before giving up on a call
const MAX_RETRY_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct UserObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChannelObject {
    id: String,
    #[serde(rename = "type")]
    kind: u8,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageObject {
    id: String,
    channel_id: String,
    author: UserObject,
}

#[derive(Debug, Deserialize)]
struct RateLimited {
    retry_after: f64,
}

#[derive(Debug, Serialize)]
struct CreateChannel<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Serialize)]
struct MessageEmbeds {
    embeds: Vec<Embed>,
}

impl From<&DisplayDocument> for MessageEmbeds {
    fn from(document: &DisplayDocument) -> Self {
        Self {
            embeds: vec![Embed::from(document)],
        }
    }
}

impl From<MessageObject> for Message {
    fn from(message: MessageObject) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            author_id: message.author.id,
        }
    }
}

fn to_channel(channel: ChannelObject, fallback_guild_id: &str) -> Channel {
    Channel {
        id: channel.id,
        guild_id: channel
            .guild_id
            .unwrap_or_else(|| fallback_guild_id.to_string()),
        name: channel.name.unwrap_or_default(),
    }
}

/// [`ChatTransport`] over the Discord REST API, authenticated as a bot
#[derive(Debug, Clone)]
pub struct DiscordRestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl DiscordRestTransport {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, RefreshableError> {
        Self::with_base_url(DISCORD_API_BASE_URL, bot_token, timeout)
    }

    pub fn with_base_url(
        base_url: &str,
        bot_token: &str,
        timeout: Duration,
    ) -> Result<Self, RefreshableError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| RefreshableError::transport(format!("invalid api url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(RefreshableError::transport(format!(
                "{base_url} cannot be a base url"
            )));
        }

        let mut authorization = HeaderValue::from_str(&format!("Bot {bot_token}"))
            .map_err(|_| RefreshableError::transport("bot token is not a valid header value"))?;
        authorization.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("DiscordBot (tonkatsu, ", env!("CARGO_PKG_VERSION"), ")"))
            .build()
            .map_err(|e| RefreshableError::transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Api url with each segment percent-encoded
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url, RefreshableError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RefreshableError::transport("api url cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one request, waiting out a single rate limit if Discord asks for it
    async fn execute<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<reqwest::Response, RefreshableError> {
        let mut retried = false;
        loop {
            let mut request = self.client.request(method.clone(), url.clone());
            request = match body {
                Some(body) => request.json(body),
                None => request.header(reqwest::header::CONTENT_LENGTH, 0),
            };

            let response = request
                .send()
                .await
                .map_err(|e| RefreshableError::transport(format!("{method} {}: {e}", url.path())))?;

            let status = response.status();
            if status.is_success() {
                debug!(%method, path = url.path(), %status, "Discord call complete");
                return Ok(response);
            }

            let text = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS && !retried {
                if let Some(wait) = retry_after(&text) {
                    warn!(
                        %method,
                        path = url.path(),
                        wait_ms = wait.as_millis() as u64,
                        "Rate limited by Discord"
                    );
                    tokio::time::sleep(wait).await;
                    retried = true;
                    continue;
                }
            }

            return Err(RefreshableError::transport(format!(
                "{method} {} returned {status}: {text}",
                url.path()
            )));
        }
    }

    async fn json<T: DeserializeOwned, B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, RefreshableError> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        self.execute(method, url, body)
            .await?
            .json()
            .await
            .map_err(|e| RefreshableError::transport(format!("decoding {path}: {e}")))
    }

    async fn empty(&self, method: Method, segments: &[&str]) -> Result<(), RefreshableError> {
        let url = self.endpoint(segments)?;
        self.execute::<()>(method, url, None).await?;
        Ok(())
    }
}

fn retry_after(body: &str) -> Option<Duration> {
    let limited: RateLimited = serde_json::from_str(body).ok()?;
    let wait = Duration::try_from_secs_f64(limited.retry_after).ok()?;
    (wait <= MAX_RETRY_AFTER).then_some(wait)
}

#[async_trait]
impl ChatTransport for DiscordRestTransport {
    async fn current_user_id(&self) -> Result<String, RefreshableError> {
        let user: UserObject = self
            .json::<_, ()>(Method::GET, &["users", "@me"], None)
            .await?;
        Ok(user.id)
    }

    #[instrument(skip(self))]
    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, RefreshableError> {
        let channels: Vec<ChannelObject> = self
            .json::<_, ()>(Method::GET, &["guilds", guild_id, "channels"], None)
            .await?;
        Ok(channels
            .into_iter()
            .filter(|channel| channel.kind == GUILD_TEXT_CHANNEL)
            .map(|channel| to_channel(channel, guild_id))
            .collect())
    }

    #[instrument(skip(self))]
    async fn create_text_channel(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<Channel, RefreshableError> {
        let channel: ChannelObject = self
            .json(
                Method::POST,
                &["guilds", guild_id, "channels"],
                Some(&CreateChannel {
                    name,
                    kind: GUILD_TEXT_CHANNEL,
                }),
            )
            .await?;
        Ok(to_channel(channel, guild_id))
    }

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<Message>, RefreshableError> {
        let messages: Vec<MessageObject> = self
            .json::<_, ()>(Method::GET, &["channels", channel_id, "pins"], None)
            .await?;
        Ok(messages.into_iter().map(Message::from).collect())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        document: &DisplayDocument,
    ) -> Result<Message, RefreshableError> {
        let message: MessageObject = self
            .json(
                Method::POST,
                &["channels", channel_id, "messages"],
                Some(&MessageEmbeds::from(document)),
            )
            .await?;
        Ok(message.into())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        document: &DisplayDocument,
    ) -> Result<(), RefreshableError> {
        let _: MessageObject = self
            .json(
                Method::PATCH,
                &["channels", channel_id, "messages", message_id],
                Some(&MessageEmbeds::from(document)),
            )
            .await?;
        Ok(())
    }

    async fn pin_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), RefreshableError> {
        self.empty(Method::PUT, &["channels", channel_id, "pins", message_id])
            .await
    }

    async fn remove_all_reactions(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), RefreshableError> {
        self.empty(
            Method::DELETE,
            &["channels", channel_id, "messages", message_id, "reactions"],
        )
        .await
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), RefreshableError> {
        self.empty(
            Method::PUT,
            &["channels", channel_id, "messages", message_id, "reactions", emoji, "@me"],
        )
        .await
    }

    async fn remove_user_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<(), RefreshableError> {
        self.empty(
            Method::DELETE,
            &["channels", channel_id, "messages", message_id, "reactions", emoji, user_id],
        )
        .await
    }
}
