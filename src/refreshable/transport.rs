use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RefreshableError;
use crate::leaderboard::DisplayDocument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub guild_id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub author_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionAdd {
    pub guild_id: String,
    pub channel_id: String,
    pub message_id: String,
    pub user_id: String,
    pub emoji: String,
}

/// Chat platform operations the refresh protocol needs
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn current_user_id(&self) -> Result<String, RefreshableError>;

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, RefreshableError>;

    async fn create_text_channel(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<Channel, RefreshableError>;

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<Message>, RefreshableError>;

    async fn send_message(
        &self,
        channel_id: &str,
        document: &DisplayDocument,
    ) -> Result<Message, RefreshableError>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        document: &DisplayDocument,
    ) -> Result<(), RefreshableError>;

    async fn pin_message(&self, channel_id: &str, message_id: &str)
        -> Result<(), RefreshableError>;

    async fn remove_all_reactions(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), RefreshableError>;

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), RefreshableError>;

    async fn remove_user_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<(), RefreshableError>;
}

/// Produces the content of a refreshable message
#[async_trait]
pub trait RefreshableBackend: Send + Sync {
    /// Sends a fresh message into `channel_id` and returns it
    async fn create_refreshable_message(
        &self,
        transport: &dyn ChatTransport,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Message, RefreshableError>;

    /// Re-renders the message the reaction was added to
    async fn refresh_message(
        &self,
        transport: &dyn ChatTransport,
        event: &ReactionAdd,
    ) -> Result<(), RefreshableError>;
}
