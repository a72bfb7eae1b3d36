use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;

use tonkatsu::leaderboard::PlayerScore;
use tonkatsu::refreshable::{MessageRegistry, RefreshableConfig};
use tonkatsu::{
    FixedClock, InMemoryMetricsGateway, InMemoryNameResolver, LeaderboardService, MetricsGateway,
    PinnedLeaderboard, RefreshableHandler, StandingsPresenter,
};

use super::mocks::{CountingGateway, MockChatTransport};

pub const BOT_USER_ID: &str = "bot-1";
pub const CHANNEL_NAME: &str = "leaderboard";

/// 2024-05-10 12:00:00 UTC, already on a window boundary
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
}

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

#[allow(dead_code)]
pub struct TestSetup {
    pub clock: Arc<FixedClock>,
    pub store: Arc<InMemoryMetricsGateway>,
    pub gateway: Arc<CountingGateway>,
    pub service: Arc<LeaderboardService>,
    pub names: Arc<InMemoryNameResolver>,
    pub presenter: Arc<StandingsPresenter>,
    pub transport: Arc<MockChatTransport>,
    pub handler: Arc<RefreshableHandler>,
}

#[allow(dead_code)]
impl TestSetup {
    /// Records one batch and moves the clock past the next window boundary,
    /// so the new points fall inside the standings window
    pub async fn record_and_settle(&self, scores: &[(&str, i64)]) {
        let scores: Vec<PlayerScore> = scores
            .iter()
            .map(|(id, score)| PlayerScore::new(*id, *score))
            .collect();
        self.service
            .record_scores(&scores)
            .await
            .expect("recording scores should succeed");
        self.clock.advance(Duration::minutes(5));
    }
}

pub struct TestSetupBuilder {
    players: Vec<(String, String)>,
    page_sizes: Option<(usize, usize)>,
    transport: Option<MockChatTransport>,
}

#[allow(dead_code)]
impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: Vec::new(),
            page_sizes: None,
            transport: None,
        }
    }

    pub fn with_players(mut self, players: &[(&str, &str)]) -> Self {
        self.players = players
            .iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();
        self
    }

    pub fn with_steve_and_alex(self) -> Self {
        self.with_players(&[("p1", "Steve"), ("p2", "Alex")])
    }

    pub fn with_page_sizes(mut self, list_page_size: usize, data_page_size: usize) -> Self {
        self.page_sizes = Some((list_page_size, data_page_size));
        self
    }

    pub fn with_transport(mut self, transport: MockChatTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> TestSetup {
        let clock = Arc::new(FixedClock::new(base_time()));

        let mut store = InMemoryMetricsGateway::with_clock(clock.clone());
        if let Some((list, data)) = self.page_sizes {
            store = store.with_page_sizes(list, data);
        }
        let store = Arc::new(store);
        let gateway = Arc::new(CountingGateway::new(store.clone()));

        let service = Arc::new(LeaderboardService::with_clock(
            gateway.clone() as Arc<dyn MetricsGateway>,
            "test",
            clock.clone(),
        ));
        let names = Arc::new(InMemoryNameResolver::with_players(self.players));
        let presenter = Arc::new(StandingsPresenter::new(names.clone()));

        let transport = Arc::new(
            self.transport
                .unwrap_or_else(|| MockChatTransport::new(BOT_USER_ID)),
        );
        let handler = Arc::new(RefreshableHandler::new(
            transport.clone(),
            Arc::new(PinnedLeaderboard::new(service.clone(), presenter.clone())),
            Arc::new(MessageRegistry::new()),
            RefreshableConfig::new(CHANNEL_NAME),
        ));

        TestSetup {
            clock,
            store,
            gateway,
            service,
            names,
            presenter,
            transport,
            handler,
        }
    }
}
