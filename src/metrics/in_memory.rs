use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::{
    Dimension, GetMetricDataRequest, ListMetricsRequest, Metric, MetricDataResult, MetricDatum,
    MetricsError, MetricsGateway, Page, Statistic,
};
use crate::clock::{Clock, SystemClock};

pub const DEFAULT_LIST_PAGE_SIZE: usize = 500;
pub const DEFAULT_DATA_PAGE_SIZE: usize = 100_800;

/// Series without a data point in this window are not listed
const LIST_RETENTION_DAYS: i64 = 14;

#[derive(Debug, Clone)]
struct DataPoint {
    timestamp: DateTime<Utc>,
    value: f64,
}

#[derive(Debug, Clone)]
struct StoredSeries {
    metric: Metric,
    points: Vec<DataPoint>,
}

/// In-memory implementation of [`MetricsGateway`]
///
/// Keeps series in first-seen order, buckets data points by query period and
/// paginates both listings with offset tokens. Nothing survives a restart.
pub struct InMemoryMetricsGateway {
    series: RwLock<Vec<StoredSeries>>,
    clock: Arc<dyn Clock>,
    list_page_size: usize,
    data_page_size: usize,
}

impl Default for InMemoryMetricsGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetricsGateway {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            series: RwLock::new(Vec::new()),
            clock,
            list_page_size: DEFAULT_LIST_PAGE_SIZE,
            data_page_size: DEFAULT_DATA_PAGE_SIZE,
        }
    }

    /// Overrides page sizes, mostly to exercise pagination in tests
    pub fn with_page_sizes(mut self, list_page_size: usize, data_page_size: usize) -> Self {
        self.list_page_size = list_page_size.max(1);
        self.data_page_size = data_page_size.max(1);
        self
    }

    pub async fn series_count(&self) -> usize {
        self.series.read().await.len()
    }

    pub async fn data_point_count(&self) -> usize {
        self.series
            .read()
            .await
            .iter()
            .map(|s| s.points.len())
            .sum()
    }

    async fn record(&self, namespace: &str, data: Vec<MetricDatum>, timestamp: DateTime<Utc>) {
        let mut series = self.series.write().await;
        for datum in data {
            let mut dimensions = datum.dimensions;
            dimensions.sort();
            let metric = Metric {
                namespace: namespace.to_string(),
                metric_name: datum.metric_name,
                dimensions,
            };
            let point = DataPoint {
                timestamp,
                value: datum.value,
            };

            match series.iter_mut().find(|s| s.metric == metric) {
                Some(existing) => existing.points.push(point),
                None => series.push(StoredSeries {
                    metric,
                    points: vec![point],
                }),
            }
        }
    }
}

fn parse_offset(token: Option<&str>) -> Result<usize, MetricsError> {
    match token {
        None => Ok(0),
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| MetricsError::InvalidToken(token.to_string())),
    }
}

fn next_offset_token(offset: usize, page_size: usize, total: usize) -> Option<String> {
    let next = offset + page_size;
    (next < total).then(|| next.to_string())
}

fn aggregate(stat: Statistic, values: &[f64]) -> f64 {
    match stat {
        Statistic::Sum => values.iter().sum(),
        Statistic::Average => values.iter().sum::<f64>() / values.len() as f64,
        Statistic::Minimum => values.iter().copied().fold(f64::INFINITY, f64::min),
        Statistic::Maximum => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Statistic::SampleCount => values.len() as f64,
    }
}

fn matches_dimensions(stored: &[Dimension], wanted: &[Dimension]) -> bool {
    let mut wanted = wanted.to_vec();
    wanted.sort();
    stored == wanted.as_slice()
}

#[async_trait]
impl MetricsGateway for InMemoryMetricsGateway {
    #[instrument(skip(self, data), fields(count = data.len()))]
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), MetricsError> {
        if namespace.is_empty() {
            return Err(MetricsError::InvalidRequest(
                "namespace must not be empty".to_string(),
            ));
        }
        if let Some(bad) = data
            .iter()
            .find(|d| d.metric_name.is_empty() || !d.value.is_finite())
        {
            return Err(MetricsError::InvalidRequest(format!(
                "invalid datum for metric '{}'",
                bad.metric_name
            )));
        }

        let now = self.clock.now();
        self.record(namespace, data, now).await;
        debug!(namespace = %namespace, "Recorded metric data");
        Ok(())
    }

    async fn list_metrics(
        &self,
        request: &ListMetricsRequest,
        next_token: Option<&str>,
    ) -> Result<Page<Metric>, MetricsError> {
        let offset = parse_offset(next_token)?;
        let cutoff = self.clock.now() - Duration::days(LIST_RETENTION_DAYS);

        let series = self.series.read().await;
        let matching: Vec<&StoredSeries> = series
            .iter()
            .filter(|s| s.metric.namespace == request.namespace)
            .filter(|s| {
                request
                    .metric_name
                    .as_ref()
                    .map_or(true, |name| &s.metric.metric_name == name)
            })
            .filter(|s| s.points.iter().any(|p| p.timestamp >= cutoff))
            .collect();

        if offset > matching.len() {
            return Err(MetricsError::InvalidToken(offset.to_string()));
        }

        let items = matching
            .iter()
            .skip(offset)
            .take(self.list_page_size)
            .map(|s| s.metric.clone())
            .collect();

        Ok(Page {
            items,
            next_token: next_offset_token(offset, self.list_page_size, matching.len()),
        })
    }

    async fn get_metric_data(
        &self,
        request: &GetMetricDataRequest,
        next_token: Option<&str>,
    ) -> Result<Page<MetricDataResult>, MetricsError> {
        if request.start >= request.end {
            return Err(MetricsError::InvalidRequest(
                "start time must be before end time".to_string(),
            ));
        }
        if let Some(query) = request
            .queries
            .iter()
            .find(|q| q.metric_stat.period_secs == 0 || q.metric_stat.period_secs % 60 != 0)
        {
            return Err(MetricsError::InvalidRequest(format!(
                "query '{}' has an invalid period",
                query.id
            )));
        }

        let offset = parse_offset(next_token)?;
        let series = self.series.read().await;

        // One entry per bucket value, or a single empty entry for a query with no data
        let mut entries: Vec<(usize, Option<(DateTime<Utc>, f64)>)> = Vec::new();
        for (index, query) in request.queries.iter().enumerate() {
            let stat = &query.metric_stat;
            let period = i64::from(stat.period_secs);

            let mut buckets: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
            for stored in series.iter().filter(|s| {
                s.metric.namespace == stat.metric.namespace
                    && s.metric.metric_name == stat.metric.metric_name
                    && matches_dimensions(&s.metric.dimensions, &stat.metric.dimensions)
            }) {
                for point in stored
                    .points
                    .iter()
                    .filter(|p| p.timestamp >= request.start && p.timestamp < request.end)
                {
                    let bucket = (point.timestamp - request.start).num_seconds() / period;
                    buckets.entry(bucket).or_default().push(point.value);
                }
            }

            if buckets.is_empty() {
                entries.push((index, None));
                continue;
            }

            // Newest bucket first
            for (bucket, values) in buckets.iter().rev() {
                let timestamp = request.start + Duration::seconds(bucket * period);
                entries.push((index, Some((timestamp, aggregate(stat.stat, values)))));
            }
        }

        if offset > entries.len() {
            return Err(MetricsError::InvalidToken(offset.to_string()));
        }

        let mut items: Vec<MetricDataResult> = Vec::new();
        let mut current: Option<usize> = None;
        for (index, value) in entries.iter().skip(offset).take(self.data_page_size) {
            if current != Some(*index) {
                let query = &request.queries[*index];
                items.push(MetricDataResult {
                    id: query.id.clone(),
                    label: query.label.clone(),
                    timestamps: Vec::new(),
                    values: Vec::new(),
                });
                current = Some(*index);
            }
            if let (Some(result), Some((timestamp, value))) = (items.last_mut(), value) {
                result.timestamps.push(*timestamp);
                result.values.push(*value);
            }
        }

        Ok(Page {
            items,
            next_token: next_offset_token(offset, self.data_page_size, entries.len()),
        })
    }
}
