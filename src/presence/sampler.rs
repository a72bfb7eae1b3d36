use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::interval;
use tracing::{debug, error, info, instrument};

use crate::leaderboard::{LeaderboardError, LeaderboardService, PlayerScore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlinePlayer {
    pub id: String,
    pub name: String,
}

/// Source of the players currently connected to the game server
#[async_trait]
pub trait OnlinePlayers: Send + Sync {
    async fn online_players(&self) -> Result<Vec<OnlinePlayer>, PresenceError>;
}

/// Fixed player list for local runs and tests
#[derive(Debug, Clone, Default)]
pub struct StaticOnlinePlayers {
    players: Vec<OnlinePlayer>,
}

impl StaticOnlinePlayers {
    pub fn new(ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let players = ids
            .into_iter()
            .map(Into::into)
            .map(|id: String| OnlinePlayer {
                name: id.clone(),
                id,
            })
            .collect();
        Self { players }
    }
}

#[async_trait]
impl OnlinePlayers for StaticOnlinePlayers {
    async fn online_players(&self) -> Result<Vec<OnlinePlayer>, PresenceError> {
        Ok(self.players.clone())
    }
}

#[derive(Debug, Clone, Error)]
pub enum PresenceError {
    #[error("Player source error: {0}")]
    Source(String),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    #[error("Presence sample timed out")]
    Timeout,
}

#[derive(Debug, Clone)]
pub struct PresenceConfig {
    pub interval: Duration,
    /// Score recorded for each online player per sample
    pub points_per_sample: i64,
    pub call_timeout: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            points_per_sample: 1,
            call_timeout: Duration::from_secs(30),
        }
    }
}

/// Periodically awards points to every online player. Runs until the task is dropped.
#[instrument(skip(source, service))]
pub async fn start_presence_task(
    source: Arc<dyn OnlinePlayers>,
    service: Arc<LeaderboardService>,
    config: PresenceConfig,
) {
    info!(
        interval_secs = config.interval.as_secs(),
        points_per_sample = config.points_per_sample,
        "Starting presence sampler"
    );

    let mut ticker = interval(config.interval);

    loop {
        ticker.tick().await;

        match tokio::time::timeout(
            config.call_timeout,
            sample_once(source.as_ref(), &service, config.points_per_sample),
        )
        .await
        .unwrap_or(Err(PresenceError::Timeout))
        {
            Ok(0) => debug!("No players online"),
            Ok(recorded) => info!(recorded, "Presence sample recorded"),
            Err(e) => error!(error = %e, "Presence sample failed"),
        }
    }
}

/// Takes one sample and returns how many players were credited
pub async fn sample_once(
    source: &dyn OnlinePlayers,
    service: &LeaderboardService,
    points_per_sample: i64,
) -> Result<usize, PresenceError> {
    let players = source.online_players().await?;
    if players.is_empty() {
        return Ok(0);
    }

    let scores: Vec<PlayerScore> = players
        .into_iter()
        .map(|player| PlayerScore::new(player.id, points_per_sample))
        .collect();

    service.record_scores(&scores).await?;
    Ok(scores.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::metrics::{InMemoryMetricsGateway, MetricsGateway};
    use chrono::TimeZone;

    struct BrokenSource;

    #[async_trait]
    impl OnlinePlayers for BrokenSource {
        async fn online_players(&self) -> Result<Vec<OnlinePlayer>, PresenceError> {
            Err(PresenceError::Source("server unreachable".to_string()))
        }
    }

    fn service(gateway: Arc<InMemoryMetricsGateway>) -> LeaderboardService {
        LeaderboardService::new(gateway as Arc<dyn MetricsGateway>, "test")
    }

    #[tokio::test]
    async fn sample_credits_each_online_player() {
        let clock = Arc::new(FixedClock::new(
            chrono::Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap(),
        ));
        let gateway = Arc::new(InMemoryMetricsGateway::with_clock(clock.clone()));
        let service = LeaderboardService::with_clock(gateway, "test", clock.clone());
        let source = StaticOnlinePlayers::new(["p1", "p2"]);

        let recorded = sample_once(&source, &service, 3).await.unwrap();
        assert_eq!(recorded, 2);

        clock.advance(chrono::Duration::minutes(10));
        let standings = service.get_standings().await.unwrap();
        assert_eq!(
            standings.sorted_standings,
            vec![PlayerScore::new("p1", 3), PlayerScore::new("p2", 3)]
        );
    }

    #[tokio::test]
    async fn empty_server_records_nothing() {
        let gateway = Arc::new(InMemoryMetricsGateway::new());
        let service = service(gateway.clone());

        let recorded = sample_once(&StaticOnlinePlayers::default(), &service, 1)
            .await
            .unwrap();

        assert_eq!(recorded, 0);
        assert_eq!(gateway.data_point_count().await, 0);
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let service = service(Arc::new(InMemoryMetricsGateway::new()));
        let result = sample_once(&BrokenSource, &service, 1).await;
        assert!(matches!(result, Err(PresenceError::Source(_))));
    }
}
