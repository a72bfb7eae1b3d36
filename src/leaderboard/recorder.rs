use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    leaderboard_namespace, LeaderboardError, PlayerScore, PLAYER_ID_DIMENSION,
    PLAYER_SCORE_METRIC,
};
use crate::metrics::{Dimension, MetricDatum, MetricsGateway};

/// Submits score increments as metric data points
pub struct ScoreRecorder {
    gateway: Arc<dyn MetricsGateway>,
    namespace: String,
}

impl ScoreRecorder {
    pub fn new(gateway: Arc<dyn MetricsGateway>, namespace_prefix: &str) -> Self {
        Self {
            gateway,
            namespace: leaderboard_namespace(namespace_prefix),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Validates the whole batch, then submits it in one call.
    ///
    /// A single empty player id rejects the batch before anything is sent.
    #[instrument(skip(self, scores), fields(count = scores.len(), namespace = %self.namespace))]
    pub async fn record_scores(&self, scores: &[PlayerScore]) -> Result<(), LeaderboardError> {
        if let Some(index) = scores.iter().position(|s| s.player_id.is_empty()) {
            return Err(LeaderboardError::InvalidPlayerId { index });
        }

        if scores.is_empty() {
            debug!("No scores to record");
            return Ok(());
        }

        let data: Vec<MetricDatum> = scores.iter().map(to_datum).collect();
        self.gateway.put_metric_data(&self.namespace, data).await?;

        info!(count = scores.len(), "Recorded player scores");
        Ok(())
    }
}

fn to_datum(score: &PlayerScore) -> MetricDatum {
    MetricDatum {
        metric_name: PLAYER_SCORE_METRIC.to_string(),
        dimensions: vec![Dimension::new(PLAYER_ID_DIMENSION, score.player_id.clone())],
        value: score.score as f64,
    }
}
