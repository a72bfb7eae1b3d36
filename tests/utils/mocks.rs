use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use tonkatsu::leaderboard::DisplayDocument;
use tonkatsu::metrics::{
    GetMetricDataRequest, ListMetricsRequest, Metric, MetricDataResult, MetricDatum, Page,
};
use tonkatsu::refreshable::{Channel, ChatTransport, Message, RefreshableError};
use tonkatsu::{InMemoryMetricsGateway, MetricsError, MetricsGateway};

// ============================================================================
// Chat transport mock
// ============================================================================

/// Every mutating call the handler makes, in order
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum TransportCall {
    CreateChannel { guild_id: String, name: String },
    SendMessage { channel_id: String, document: DisplayDocument },
    EditMessage { channel_id: String, message_id: String, document: DisplayDocument },
    Pin { channel_id: String, message_id: String },
    RemoveAllReactions { channel_id: String, message_id: String },
    AddReaction { channel_id: String, message_id: String, emoji: String },
    RemoveUserReaction { channel_id: String, message_id: String, emoji: String, user_id: String },
}

pub struct MockChatTransport {
    bot_user_id: String,
    channels: RwLock<HashMap<String, Vec<Channel>>>,
    pinned: RwLock<HashMap<String, Vec<Message>>>,
    calls: RwLock<Vec<TransportCall>>,
    broken_guilds: RwLock<HashSet<String>>,
    next_id: AtomicUsize,
    edit_delay: Duration,
    edits_in_flight: AtomicUsize,
    max_edits_in_flight: AtomicUsize,
}

#[allow(dead_code)]
impl MockChatTransport {
    pub fn new(bot_user_id: &str) -> Self {
        Self {
            bot_user_id: bot_user_id.to_string(),
            channels: RwLock::new(HashMap::new()),
            pinned: RwLock::new(HashMap::new()),
            calls: RwLock::new(Vec::new()),
            broken_guilds: RwLock::new(HashSet::new()),
            next_id: AtomicUsize::new(1),
            edit_delay: Duration::ZERO,
            edits_in_flight: AtomicUsize::new(0),
            max_edits_in_flight: AtomicUsize::new(0),
        }
    }

    /// Makes every edit take `delay`, so overlapping refreshes can be observed
    pub fn with_edit_delay(mut self, delay: Duration) -> Self {
        self.edit_delay = delay;
        self
    }

    pub fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    pub async fn add_channel(&self, guild_id: &str, channel_id: &str, name: &str) {
        self.channels
            .write()
            .await
            .entry(guild_id.to_string())
            .or_default()
            .push(Channel {
                id: channel_id.to_string(),
                guild_id: guild_id.to_string(),
                name: name.to_string(),
            });
    }

    pub async fn add_pinned(&self, channel_id: &str, message_id: &str, author_id: &str) {
        self.pinned
            .write()
            .await
            .entry(channel_id.to_string())
            .or_default()
            .push(Message {
                id: message_id.to_string(),
                channel_id: channel_id.to_string(),
                author_id: author_id.to_string(),
            });
    }

    /// Channel listing fails for this guild
    pub async fn break_guild(&self, guild_id: &str) {
        self.broken_guilds.write().await.insert(guild_id.to_string());
    }

    pub async fn calls(&self) -> Vec<TransportCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    pub async fn edits(&self) -> Vec<TransportCall> {
        self.calls()
            .await
            .into_iter()
            .filter(|call| matches!(call, TransportCall::EditMessage { .. }))
            .collect()
    }

    pub fn max_edits_in_flight(&self) -> usize {
        self.max_edits_in_flight.load(Ordering::SeqCst)
    }

    fn fresh_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn record(&self, call: TransportCall) {
        self.calls.write().await.push(call);
    }
}

#[async_trait]
impl ChatTransport for MockChatTransport {
    async fn current_user_id(&self) -> Result<String, RefreshableError> {
        Ok(self.bot_user_id.clone())
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<Channel>, RefreshableError> {
        if self.broken_guilds.read().await.contains(guild_id) {
            return Err(RefreshableError::transport("missing access"));
        }
        Ok(self
            .channels
            .read()
            .await
            .get(guild_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_text_channel(
        &self,
        guild_id: &str,
        name: &str,
    ) -> Result<Channel, RefreshableError> {
        let id = self.fresh_id("channel");
        self.add_channel(guild_id, &id, name).await;
        self.record(TransportCall::CreateChannel {
            guild_id: guild_id.to_string(),
            name: name.to_string(),
        })
        .await;
        Ok(Channel {
            id,
            guild_id: guild_id.to_string(),
            name: name.to_string(),
        })
    }

    async fn pinned_messages(&self, channel_id: &str) -> Result<Vec<Message>, RefreshableError> {
        Ok(self
            .pinned
            .read()
            .await
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(
        &self,
        channel_id: &str,
        document: &DisplayDocument,
    ) -> Result<Message, RefreshableError> {
        let id = self.fresh_id("message");
        self.record(TransportCall::SendMessage {
            channel_id: channel_id.to_string(),
            document: document.clone(),
        })
        .await;
        Ok(Message {
            id,
            channel_id: channel_id.to_string(),
            author_id: self.bot_user_id.clone(),
        })
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        document: &DisplayDocument,
    ) -> Result<(), RefreshableError> {
        let in_flight = self.edits_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_edits_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if !self.edit_delay.is_zero() {
            tokio::time::sleep(self.edit_delay).await;
        }
        self.record(TransportCall::EditMessage {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            document: document.clone(),
        })
        .await;
        self.edits_in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn pin_message(&self, channel_id: &str, message_id: &str) -> Result<(), RefreshableError> {
        self.add_pinned(channel_id, message_id, &self.bot_user_id).await;
        self.record(TransportCall::Pin {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        })
        .await;
        Ok(())
    }

    async fn remove_all_reactions(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<(), RefreshableError> {
        self.record(TransportCall::RemoveAllReactions {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
        })
        .await;
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
    ) -> Result<(), RefreshableError> {
        self.record(TransportCall::AddReaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
        })
        .await;
        Ok(())
    }

    async fn remove_user_reaction(
        &self,
        channel_id: &str,
        message_id: &str,
        emoji: &str,
        user_id: &str,
    ) -> Result<(), RefreshableError> {
        self.record(TransportCall::RemoveUserReaction {
            channel_id: channel_id.to_string(),
            message_id: message_id.to_string(),
            emoji: emoji.to_string(),
            user_id: user_id.to_string(),
        })
        .await;
        Ok(())
    }
}

// ============================================================================
// Metrics gateway mocks
// ============================================================================

/// Passes through to an in-memory store, remembering the size of every data request
pub struct CountingGateway {
    inner: Arc<InMemoryMetricsGateway>,
    puts: AtomicUsize,
    data_batches: RwLock<Vec<usize>>,
}

#[allow(dead_code)]
impl CountingGateway {
    pub fn new(inner: Arc<InMemoryMetricsGateway>) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
            data_batches: RwLock::new(Vec::new()),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Query count of each `get_metric_data` call, first page only
    pub async fn data_batches(&self) -> Vec<usize> {
        self.data_batches.read().await.clone()
    }
}

#[async_trait]
impl MetricsGateway for CountingGateway {
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), MetricsError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put_metric_data(namespace, data).await
    }

    async fn list_metrics(
        &self,
        request: &ListMetricsRequest,
        next_token: Option<&str>,
    ) -> Result<Page<Metric>, MetricsError> {
        self.inner.list_metrics(request, next_token).await
    }

    async fn get_metric_data(
        &self,
        request: &GetMetricDataRequest,
        next_token: Option<&str>,
    ) -> Result<Page<MetricDataResult>, MetricsError> {
        if next_token.is_none() {
            self.data_batches.write().await.push(request.queries.len());
        }
        self.inner.get_metric_data(request, next_token).await
    }
}

/// Store that is always down
pub struct UnavailableGateway;

#[async_trait]
impl MetricsGateway for UnavailableGateway {
    async fn put_metric_data(&self, _: &str, _: Vec<MetricDatum>) -> Result<(), MetricsError> {
        Err(MetricsError::Unavailable("connection refused".to_string()))
    }

    async fn list_metrics(
        &self,
        _: &ListMetricsRequest,
        _: Option<&str>,
    ) -> Result<Page<Metric>, MetricsError> {
        Err(MetricsError::Unavailable("connection refused".to_string()))
    }

    async fn get_metric_data(
        &self,
        _: &GetMetricDataRequest,
        _: Option<&str>,
    ) -> Result<Page<MetricDataResult>, MetricsError> {
        Err(MetricsError::Unavailable("connection refused".to_string()))
    }
}
