use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::{DisplayDocument, LeaderboardService, RenderOptions, StandingsPresenter};
use crate::refreshable::{ChatTransport, Message, ReactionAdd, RefreshableBackend, RefreshableError};

/// Keeps a pinned standings message in sync with the metrics store
pub struct PinnedLeaderboard {
    service: Arc<LeaderboardService>,
    presenter: Arc<StandingsPresenter>,
}

impl PinnedLeaderboard {
    pub fn new(service: Arc<LeaderboardService>, presenter: Arc<StandingsPresenter>) -> Self {
        Self { service, presenter }
    }

    async fn current_document(&self) -> Result<DisplayDocument, RefreshableError> {
        let standings = self.service.get_standings().await?;
        let document = self
            .presenter
            .render(&standings, RenderOptions::with_last_updated())
            .await?;
        Ok(document)
    }
}

#[async_trait]
impl RefreshableBackend for PinnedLeaderboard {
    #[instrument(skip(self, transport))]
    async fn create_refreshable_message(
        &self,
        transport: &dyn ChatTransport,
        guild_id: &str,
        channel_id: &str,
    ) -> Result<Message, RefreshableError> {
        let document = self.current_document().await?;
        let message = transport.send_message(channel_id, &document).await?;
        debug!(message_id = %message.id, "Sent standings message");
        Ok(message)
    }

    #[instrument(skip(self, transport, event), fields(message_id = %event.message_id))]
    async fn refresh_message(
        &self,
        transport: &dyn ChatTransport,
        event: &ReactionAdd,
    ) -> Result<(), RefreshableError> {
        let document = self.current_document().await?;
        transport
            .edit_message(&event.channel_id, &event.message_id, &document)
            .await
    }
}
