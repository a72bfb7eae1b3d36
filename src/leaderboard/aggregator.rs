use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::{
    leaderboard_namespace, LeaderboardError, PlayerScore, Standings, StandingsWindow,
    PLAYER_ID_DIMENSION, PLAYER_SCORE_METRIC,
};
use crate::clock::{Clock, SystemClock};
use crate::metrics::{
    GetMetricDataRequest, ListMetricsRequest, Metric, MetricDataPages, MetricDataQuery,
    MetricDataResult, MetricListPages, MetricStat, MetricsGateway, Paginator, Statistic,
};

/// Period of each bucket the store sums over
pub const STANDINGS_PERIOD_SECS: u32 = 21_600;

/// Most queries the store accepts in one `GetMetricData` call
pub const MAX_QUERIES_PER_REQUEST: usize = 500;

/// Rebuilds the ranking over the trailing standings window from the metrics store
pub struct StandingsAggregator {
    gateway: Arc<dyn MetricsGateway>,
    namespace: String,
    clock: Arc<dyn Clock>,
}

impl StandingsAggregator {
    pub fn new(gateway: Arc<dyn MetricsGateway>, namespace_prefix: &str) -> Self {
        Self::with_clock(gateway, namespace_prefix, Arc::new(SystemClock))
    }

    pub fn with_clock(
        gateway: Arc<dyn MetricsGateway>,
        namespace_prefix: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gateway,
            namespace: leaderboard_namespace(namespace_prefix),
            clock,
        }
    }

    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get_standings(&self) -> Result<Standings, LeaderboardError> {
        let window = StandingsWindow::ending_at(self.clock.now());

        let series = self.list_series().await?;
        if series.is_empty() {
            debug!("No player score series found");
            return Ok(Standings::empty(window.end));
        }

        let queries = build_queries(series);
        let results = self.fetch_results(queries, &window).await?;
        let sorted_standings = rank(results);

        info!(
            players = sorted_standings.len(),
            window_end = %window.end,
            "Standings aggregated"
        );

        Ok(Standings {
            sorted_standings,
            last_updated: window.end,
        })
    }

    async fn list_series(&self) -> Result<Vec<Metric>, LeaderboardError> {
        let request = ListMetricsRequest {
            namespace: self.namespace.clone(),
            metric_name: Some(PLAYER_SCORE_METRIC.to_string()),
        };
        let series = Paginator::new(MetricListPages::new(self.gateway.as_ref(), request))
            .collect_all()
            .await?;
        debug!(series = series.len(), "Listed player score series");
        Ok(series)
    }

    /// Runs every query, merging page fragments that share a query id
    async fn fetch_results(
        &self,
        queries: Vec<MetricDataQuery>,
        window: &StandingsWindow,
    ) -> Result<Vec<MetricDataResult>, LeaderboardError> {
        let mut merged: Vec<MetricDataResult> = Vec::with_capacity(queries.len());
        let mut positions: HashMap<String, usize> = HashMap::with_capacity(queries.len());

        for batch in queries.chunks(MAX_QUERIES_PER_REQUEST) {
            let request = GetMetricDataRequest {
                queries: batch.to_vec(),
                start: window.start,
                end: window.end,
            };
            let fragments = Paginator::new(MetricDataPages::new(self.gateway.as_ref(), request))
                .collect_all()
                .await?;

            for fragment in fragments {
                match positions.get(&fragment.id) {
                    Some(&position) => {
                        let existing = &mut merged[position];
                        existing.timestamps.extend(fragment.timestamps);
                        existing.values.extend(fragment.values);
                    }
                    None => {
                        positions.insert(fragment.id.clone(), merged.len());
                        merged.push(fragment);
                    }
                }
            }
        }

        Ok(merged)
    }
}

/// One `Sum` query per series, labelled with the series' player id.
/// A series without a player id dimension gets an empty label.
pub(crate) fn build_queries(series: Vec<Metric>) -> Vec<MetricDataQuery> {
    series
        .into_iter()
        .enumerate()
        .map(|(index, metric)| MetricDataQuery {
            id: format!("query{index}"),
            label: metric
                .dimension(PLAYER_ID_DIMENSION)
                .unwrap_or_default()
                .to_string(),
            metric_stat: MetricStat {
                metric,
                period_secs: STANDINGS_PERIOD_SECS,
                stat: Statistic::Sum,
            },
        })
        .collect()
}

/// Sums each result, drops non-positive totals and sorts descending.
/// Totals saturate at the `i64` bounds.
/// The sort is stable, so equal totals keep the order the store returned them in.
pub(crate) fn rank(results: Vec<MetricDataResult>) -> Vec<PlayerScore> {
    let mut standings: Vec<PlayerScore> = results
        .into_iter()
        .map(|result| PlayerScore {
            score: result
                .values
                .iter()
                .fold(0i64, |total, v| total.saturating_add(*v as i64)),
            player_id: result.label,
        })
        .filter(|score| score.score > 0)
        .collect();

    standings.sort_by(|a, b| b.score.cmp(&a.score));
    standings
}
