use async_trait::async_trait;
use aws_sdk_cloudwatch::error::DisplayErrorContext;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types as cw;
use aws_sdk_cloudwatch::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use super::{
    Dimension, GetMetricDataRequest, ListMetricsRequest, Metric, MetricDataQuery,
    MetricDataResult, MetricDatum, MetricsError, MetricsGateway, Page,
};

/// [`MetricsGateway`] backed by Amazon CloudWatch
///
/// Credentials and region come from the standard AWS environment chain.
#[derive(Debug, Clone)]
pub struct CloudWatchMetricsGateway {
    client: Client,
}

impl CloudWatchMetricsGateway {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(Client::new(&config))
    }
}

fn unavailable(operation: &str, error: impl std::error::Error) -> MetricsError {
    let message = format!("{operation}: {}", DisplayErrorContext(error));
    warn!(%message, "CloudWatch call failed");
    MetricsError::Unavailable(message)
}

#[async_trait]
impl MetricsGateway for CloudWatchMetricsGateway {
    #[instrument(skip(self, data), fields(points = data.len()))]
    async fn put_metric_data(
        &self,
        namespace: &str,
        data: Vec<MetricDatum>,
    ) -> Result<(), MetricsError> {
        self.client
            .put_metric_data()
            .namespace(namespace)
            .set_metric_data(Some(data.iter().map(to_cloudwatch_datum).collect()))
            .send()
            .await
            .map_err(|e| unavailable("PutMetricData", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_metrics(
        &self,
        request: &ListMetricsRequest,
        next_token: Option<&str>,
    ) -> Result<Page<Metric>, MetricsError> {
        let output = self
            .client
            .list_metrics()
            .namespace(&request.namespace)
            .set_metric_name(request.metric_name.clone())
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| unavailable("ListMetrics", e))?;

        let items: Vec<Metric> = output.metrics().iter().map(from_cloudwatch_metric).collect();
        debug!(series = items.len(), "Listed CloudWatch metrics page");
        Ok(Page {
            items,
            next_token: next_page(output.next_token()),
        })
    }

    #[instrument(skip(self, request), fields(queries = request.queries.len()))]
    async fn get_metric_data(
        &self,
        request: &GetMetricDataRequest,
        next_token: Option<&str>,
    ) -> Result<Page<MetricDataResult>, MetricsError> {
        let output = self
            .client
            .get_metric_data()
            .set_metric_data_queries(Some(request.queries.iter().map(to_cloudwatch_query).collect()))
            .start_time(to_aws_time(request.start))
            .end_time(to_aws_time(request.end))
            .set_next_token(next_token.map(str::to_string))
            .send()
            .await
            .map_err(|e| unavailable("GetMetricData", e))?;

        Ok(Page {
            items: output
                .metric_data_results()
                .iter()
                .map(from_cloudwatch_result)
                .collect(),
            next_token: next_page(output.next_token()),
        })
    }
}

fn next_page(token: Option<&str>) -> Option<String> {
    token.filter(|t| !t.is_empty()).map(str::to_string)
}

fn to_aws_time(time: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(time.timestamp())
}

fn from_aws_time(time: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

fn to_cloudwatch_dimension(dimension: &Dimension) -> cw::Dimension {
    cw::Dimension::builder()
        .name(&dimension.name)
        .value(&dimension.value)
        .build()
}

pub(crate) fn to_cloudwatch_datum(datum: &MetricDatum) -> cw::MetricDatum {
    cw::MetricDatum::builder()
        .metric_name(&datum.metric_name)
        .set_dimensions(Some(
            datum.dimensions.iter().map(to_cloudwatch_dimension).collect(),
        ))
        .value(datum.value)
        .build()
}

pub(crate) fn to_cloudwatch_query(query: &MetricDataQuery) -> cw::MetricDataQuery {
    let metric = &query.metric_stat.metric;
    let stat = cw::MetricStat::builder()
        .metric(
            cw::Metric::builder()
                .namespace(&metric.namespace)
                .metric_name(&metric.metric_name)
                .set_dimensions(Some(
                    metric.dimensions.iter().map(to_cloudwatch_dimension).collect(),
                ))
                .build(),
        )
        .period(i32::try_from(query.metric_stat.period_secs).unwrap_or(i32::MAX))
        .stat(query.metric_stat.stat.as_ref())
        .build();

    cw::MetricDataQuery::builder()
        .id(&query.id)
        .label(&query.label)
        .metric_stat(stat)
        .build()
}

pub(crate) fn from_cloudwatch_metric(metric: &cw::Metric) -> Metric {
    Metric {
        namespace: metric.namespace().unwrap_or_default().to_string(),
        metric_name: metric.metric_name().unwrap_or_default().to_string(),
        dimensions: metric
            .dimensions()
            .iter()
            .map(|d| {
                Dimension::new(
                    d.name().unwrap_or_default(),
                    d.value().unwrap_or_default(),
                )
            })
            .collect(),
    }
}

pub(crate) fn from_cloudwatch_result(result: &cw::MetricDataResult) -> MetricDataResult {
    MetricDataResult {
        id: result.id().unwrap_or_default().to_string(),
        label: result.label().unwrap_or_default().to_string(),
        timestamps: result.timestamps().iter().filter_map(from_aws_time).collect(),
        values: result.values().to_vec(),
    }
}
