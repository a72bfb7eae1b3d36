use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::MetricsError;

/// Key/value label distinguishing one series from another under the same metric name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One observation submitted to the store. The store assigns the timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDatum {
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub value: f64,
}

/// Descriptor of a stored series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
}

impl Metric {
    /// Value of the named dimension, if the series carries it
    pub fn dimension(&self, name: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.value.as_str())
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, AsRefStr, Serialize, Deserialize,
)]
pub enum Statistic {
    Sum,
    Average,
    Minimum,
    Maximum,
    SampleCount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStat {
    pub metric: Metric,
    pub period_secs: u32,
    pub stat: Statistic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDataQuery {
    pub id: String,
    pub label: String,
    pub metric_stat: MetricStat,
}

/// Aggregated values for one query. A query may be split across several pages,
/// in which case the same `id` shows up once per page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDataResult {
    pub id: String,
    pub label: String,
    pub timestamps: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMetricsRequest {
    pub namespace: String,
    pub metric_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GetMetricDataRequest {
    pub queries: Vec<MetricDataQuery>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// One page of a paginated listing. `next_token` is `None` on the last page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }
}

#[async_trait]
pub trait MetricsGateway: Send + Sync {
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), MetricsError>;

    async fn list_metrics(
        &self,
        request: &ListMetricsRequest,
        next_token: Option<&str>,
    ) -> Result<Page<Metric>, MetricsError>;

    async fn get_metric_data(
        &self,
        request: &GetMetricDataRequest,
        next_token: Option<&str>,
    ) -> Result<Page<MetricDataResult>, MetricsError>;
}
