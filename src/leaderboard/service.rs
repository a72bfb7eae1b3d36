use std::sync::Arc;

use super::{LeaderboardError, PlayerScore, ScoreRecorder, Standings, StandingsAggregator};
use crate::clock::{Clock, SystemClock};
use crate::metrics::MetricsGateway;

/// The two entry points transports call into: record scores, read standings
pub struct LeaderboardService {
    recorder: ScoreRecorder,
    aggregator: StandingsAggregator,
}

impl LeaderboardService {
    pub fn new(gateway: Arc<dyn MetricsGateway>, namespace_prefix: &str) -> Self {
        Self::with_clock(gateway, namespace_prefix, Arc::new(SystemClock))
    }

    pub fn with_clock(
        gateway: Arc<dyn MetricsGateway>,
        namespace_prefix: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            recorder: ScoreRecorder::new(gateway.clone(), namespace_prefix),
            aggregator: StandingsAggregator::with_clock(gateway, namespace_prefix, clock),
        }
    }

    pub fn namespace(&self) -> &str {
        self.recorder.namespace()
    }

    pub async fn record_scores(&self, scores: &[PlayerScore]) -> Result<(), LeaderboardError> {
        self.recorder.record_scores(scores).await
    }

    pub async fn get_standings(&self) -> Result<Standings, LeaderboardError> {
        self.aggregator.get_standings().await
    }
}
