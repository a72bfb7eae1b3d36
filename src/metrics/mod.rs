// Time-series metrics capability consumed by the leaderboard.
//
// Production runs against CloudWatch; the in-memory store serves local runs
// and tests.

pub use cloudwatch::CloudWatchMetricsGateway;
pub use errors::MetricsError;
pub use gateway::{
    Dimension, GetMetricDataRequest, ListMetricsRequest, Metric, MetricDataQuery,
    MetricDataResult, MetricDatum, MetricStat, MetricsGateway, Page, Statistic,
};
pub use in_memory::InMemoryMetricsGateway;
pub use pagination::{MetricDataPages, MetricListPages, PageSource, Paginator};

mod cloudwatch;
mod errors;
pub mod gateway;
mod in_memory;
pub mod pagination;
