use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use super::{
    ChatTransport, Guild, MessageRegistry, ReactionAdd, RefreshableBackend, RefreshableError,
    TrackedMessage,
};

pub const REFRESH_EMOJI: &str = "♻️";

#[derive(Debug, Clone)]
pub struct RefreshableConfig {
    /// Name of the channel holding the pinned message
    pub pinned_channel_name: String,
    pub refresh_emoji: String,
    /// Upper bound for every single transport or backend call
    pub call_timeout: Duration,
}

impl Default for RefreshableConfig {
    fn default() -> Self {
        Self {
            pinned_channel_name: "leaderboard".to_string(),
            refresh_emoji: REFRESH_EMOJI.to_string(),
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl RefreshableConfig {
    pub fn new(pinned_channel_name: impl Into<String>) -> Self {
        Self {
            pinned_channel_name: pinned_channel_name.into(),
            ..Self::default()
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }
}

/// Where a guild is in the pinned-message lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuildState {
    Uninitialized,
    Discovering,
    Creating,
    Found,
    Steady,
}

/// Result of setting up one guild on ready
#[derive(Debug)]
pub struct GuildSetup {
    pub guild_id: String,
    pub result: Result<TrackedMessage, RefreshableError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    IgnoredOwnReaction,
    IgnoredOtherEmoji,
    IgnoredUntrackedMessage,
    Refreshed,
}

pub struct RefreshableHandler {
    transport: Arc<dyn ChatTransport>,
    backend: Arc<dyn RefreshableBackend>,
    registry: Arc<MessageRegistry>,
    config: RefreshableConfig,
    bot_user_id: Mutex<Option<String>>,
    states: Mutex<HashMap<String, GuildState>>,
    refresh_locks: RwLock<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl RefreshableHandler {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        backend: Arc<dyn RefreshableBackend>,
        registry: Arc<MessageRegistry>,
        config: RefreshableConfig,
    ) -> Self {
        Self {
            transport,
            backend,
            registry,
            config,
            bot_user_id: Mutex::new(None),
            states: Mutex::new(HashMap::new()),
            refresh_locks: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<MessageRegistry> {
        &self.registry
    }

    pub fn guild_state(&self, guild_id: &str) -> GuildState {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(guild_id)
            .copied()
            .unwrap_or(GuildState::Uninitialized)
    }

    /// Rediscovers or creates the pinned message of every guild.
    ///
    /// Guilds are independent: a failure is logged and reported for that guild only.
    #[instrument(skip(self, guilds), fields(guilds = guilds.len()))]
    pub async fn on_ready(&self, guilds: &[Guild]) -> Vec<GuildSetup> {
        self.registry.reset();
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();

        let bot_id = match self
            .bounded("fetching current user", self.transport.current_user_id())
            .await
        {
            Ok(id) => {
                *self
                    .bot_user_id
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
                id
            }
            Err(err) => {
                error!(error = %err, "Unable to fetch current user for refreshable setup");
                return guilds
                    .iter()
                    .map(|guild| GuildSetup {
                        guild_id: guild.id.clone(),
                        result: Err(err.clone()),
                    })
                    .collect();
            }
        };

        futures::future::join_all(guilds.iter().map(|guild| self.setup_guild(guild, &bot_id)))
            .await
    }

    /// Refreshes the tracked message when someone other than the bot adds the refresh reaction
    #[instrument(skip(self, event), fields(guild_id = %event.guild_id, message_id = %event.message_id))]
    pub async fn on_reaction_add(
        &self,
        event: &ReactionAdd,
    ) -> Result<ReactionOutcome, RefreshableError> {
        let bot_id = self.bot_user_id().await?;
        if event.user_id == bot_id {
            return Ok(ReactionOutcome::IgnoredOwnReaction);
        }
        if event.emoji != self.config.refresh_emoji {
            return Ok(ReactionOutcome::IgnoredOtherEmoji);
        }
        if !self.registry.is_tracked(&event.guild_id, &event.message_id) {
            debug!("Reaction on a message that is not tracked");
            return Ok(ReactionOutcome::IgnoredUntrackedMessage);
        }

        let lock = self.refresh_lock(&event.guild_id).await;
        let _guard = lock.lock().await;

        self.bounded(
            "removing refresh reaction",
            self.transport.remove_user_reaction(
                &event.channel_id,
                &event.message_id,
                &self.config.refresh_emoji,
                &event.user_id,
            ),
        )
        .await
        .inspect_err(|err| warn!(error = %err, "Failed to remove refresh reaction"))?;

        self.bounded(
            "refreshing message",
            self.backend.refresh_message(self.transport.as_ref(), event),
        )
        .await
        .inspect_err(|err| error!(error = %err, "Failed to refresh pinned message"))?;

        self.set_state(&event.guild_id, GuildState::Steady);
        info!(user_id = %event.user_id, "Pinned message refreshed");
        Ok(ReactionOutcome::Refreshed)
    }

    #[instrument(skip(self, guild, bot_id), fields(guild_id = %guild.id))]
    async fn setup_guild(&self, guild: &Guild, bot_id: &str) -> GuildSetup {
        let result = self.discover_and_pin(guild, bot_id).await;
        match &result {
            Ok(tracked) => info!(
                channel_id = %tracked.channel_id,
                message_id = %tracked.message_id,
                "Refreshable message ready"
            ),
            Err(err) => {
                error!(error = %err, guild_name = %guild.name, "Refreshable setup failed");
                self.set_state(&guild.id, GuildState::Uninitialized);
            }
        }
        GuildSetup {
            guild_id: guild.id.clone(),
            result,
        }
    }

    async fn discover_and_pin(
        &self,
        guild: &Guild,
        bot_id: &str,
    ) -> Result<TrackedMessage, RefreshableError> {
        let channel_name = &self.config.pinned_channel_name;
        self.set_state(&guild.id, GuildState::Discovering);

        let channels = self
            .bounded(
                "listing guild channels",
                self.transport.guild_channels(&guild.id),
            )
            .await?;

        let channel_id = match channels.into_iter().find(|c| &c.name == channel_name) {
            Some(channel) => {
                debug!(channel_id = %channel.id, "Found refreshable channel");
                let pinned = self
                    .bounded(
                        "listing pinned messages",
                        self.transport.pinned_messages(&channel.id),
                    )
                    .await?;
                if let Some(message) = pinned.into_iter().find(|m| m.author_id == bot_id) {
                    info!(message_id = %message.id, "Reusing pinned message");
                    self.registry.track(
                        &guild.id,
                        TrackedMessage {
                            channel_id: channel.id.clone(),
                            message_id: message.id,
                        },
                    );
                    self.set_state(&guild.id, GuildState::Found);
                }
                channel.id
            }
            None => {
                info!(channel = %channel_name, "Creating refreshable channel");
                self.bounded(
                    "creating channel",
                    self.transport.create_text_channel(&guild.id, channel_name),
                )
                .await?
                .id
            }
        };

        let tracked = match self.registry.get(&guild.id) {
            Some(tracked) => tracked,
            None => {
                self.set_state(&guild.id, GuildState::Creating);
                let message = self
                    .bounded(
                        "creating refreshable message",
                        self.backend.create_refreshable_message(
                            self.transport.as_ref(),
                            &guild.id,
                            &channel_id,
                        ),
                    )
                    .await?;

                if let Err(err) = self
                    .bounded(
                        "pinning message",
                        self.transport.pin_message(&channel_id, &message.id),
                    )
                    .await
                {
                    warn!(error = %err, message_id = %message.id, "Failed to pin refreshable message");
                }

                let tracked = TrackedMessage {
                    channel_id,
                    message_id: message.id,
                };
                self.registry.track(&guild.id, tracked.clone());
                tracked
            }
        };

        if let Err(err) = self
            .bounded(
                "clearing reactions",
                self.transport
                    .remove_all_reactions(&tracked.channel_id, &tracked.message_id),
            )
            .await
        {
            warn!(error = %err, "Failed to clear reactions on pinned message");
        }

        if let Err(err) = self
            .bounded(
                "adding refresh reaction",
                self.transport.add_reaction(
                    &tracked.channel_id,
                    &tracked.message_id,
                    &self.config.refresh_emoji,
                ),
            )
            .await
        {
            warn!(error = %err, "Failed to add refresh reaction to pinned message");
        }

        self.set_state(&guild.id, GuildState::Steady);
        Ok(tracked)
    }

    async fn bot_user_id(&self) -> Result<String, RefreshableError> {
        let cached = self
            .bot_user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(id) = cached {
            return Ok(id);
        }

        let id = self
            .bounded("fetching current user", self.transport.current_user_id())
            .await?;
        *self
            .bot_user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        Ok(id)
    }

    fn set_state(&self, guild_id: &str, state: GuildState) {
        self.states
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(guild_id.to_string(), state);
    }

    async fn refresh_lock(&self, guild_id: &str) -> Arc<AsyncMutex<()>> {
        {
            let guard = self.refresh_locks.read().await;
            if let Some(lock) = guard.get(guild_id) {
                return lock.clone();
            }
        }

        let mut guard = self.refresh_locks.write().await;
        guard
            .entry(guild_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn bounded<T>(
        &self,
        action: &'static str,
        call: impl Future<Output = Result<T, RefreshableError>>,
    ) -> Result<T, RefreshableError> {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .unwrap_or(Err(RefreshableError::Timeout(action)))
    }
}
