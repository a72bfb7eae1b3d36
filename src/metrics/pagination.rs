use async_trait::async_trait;

use super::{
    GetMetricDataRequest, ListMetricsRequest, Metric, MetricDataResult, MetricsError,
    MetricsGateway, Page,
};

/// Anything that serves pages keyed by a continuation token
#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;

    async fn fetch_page(&self, next_token: Option<&str>)
        -> Result<Page<Self::Item>, MetricsError>;
}

/// `ListMetrics` bound to one request
pub struct MetricListPages<'a> {
    gateway: &'a dyn MetricsGateway,
    request: ListMetricsRequest,
}

impl<'a> MetricListPages<'a> {
    pub fn new(gateway: &'a dyn MetricsGateway, request: ListMetricsRequest) -> Self {
        Self { gateway, request }
    }
}

#[async_trait]
impl PageSource for MetricListPages<'_> {
    type Item = Metric;

    async fn fetch_page(&self, next_token: Option<&str>) -> Result<Page<Metric>, MetricsError> {
        self.gateway.list_metrics(&self.request, next_token).await
    }
}

/// `GetMetricData` bound to one request
pub struct MetricDataPages<'a> {
    gateway: &'a dyn MetricsGateway,
    request: GetMetricDataRequest,
}

impl<'a> MetricDataPages<'a> {
    pub fn new(gateway: &'a dyn MetricsGateway, request: GetMetricDataRequest) -> Self {
        Self { gateway, request }
    }
}

#[async_trait]
impl PageSource for MetricDataPages<'_> {
    type Item = MetricDataResult;

    async fn fetch_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<Page<MetricDataResult>, MetricsError> {
        self.gateway.get_metric_data(&self.request, next_token).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Cursor {
    Start,
    Next(String),
    Exhausted,
}

/// Lazy, finite walk over a [`PageSource`].
///
/// Pages are only fetched on demand. A failed fetch leaves the cursor where it
/// was, and [`Paginator::restart`] rewinds to the first page.
pub struct Paginator<S> {
    source: S,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<S: PageSource> Paginator<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    pub fn has_more_pages(&self) -> bool {
        self.cursor != Cursor::Exhausted
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    pub fn restart(&mut self) {
        self.cursor = Cursor::Start;
        self.pages_fetched = 0;
    }

    /// Fetches the next page, or `None` once the source is exhausted
    pub async fn next_page(&mut self) -> Result<Option<Vec<S::Item>>, MetricsError> {
        let token = match &self.cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token.clone()),
            Cursor::Exhausted => return Ok(None),
        };

        let page = self.source.fetch_page(token.as_deref()).await?;
        self.pages_fetched += 1;

        self.cursor = match page.next_token.filter(|t| !t.is_empty()) {
            // A store handing back the token it was just given would loop forever
            Some(next) if token.as_deref() == Some(next.as_str()) => {
                return Err(MetricsError::InvalidToken(format!(
                    "store returned the same continuation token twice: {next}"
                )));
            }
            Some(next) => Cursor::Next(next),
            None => Cursor::Exhausted,
        };

        Ok(Some(page.items))
    }

    /// Drains every remaining page. Nothing is returned unless every page succeeds.
    pub async fn collect_all(mut self) -> Result<Vec<S::Item>, MetricsError> {
        let mut items = Vec::new();
        while let Some(page) = self.next_page().await? {
            items.extend(page);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves numbered pages; token `n` means "page n"
    struct NumberedPages {
        pages: Vec<Vec<u32>>,
        fail_on: Option<usize>,
        calls: AtomicUsize,
    }

    impl NumberedPages {
        fn new(pages: Vec<Vec<u32>>) -> Self {
            Self {
                pages,
                fail_on: None,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageSource for NumberedPages {
        type Item = u32;

        async fn fetch_page(&self, next_token: Option<&str>) -> Result<Page<u32>, MetricsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let index = next_token.map(|t| t.parse::<usize>().unwrap()).unwrap_or(0);
            if self.fail_on == Some(index) {
                return Err(MetricsError::Unavailable("boom".to_string()));
            }
            let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
            Ok(Page {
                items: self.pages[index].clone(),
                next_token,
            })
        }
    }

    struct StuckToken;

    #[async_trait]
    impl PageSource for StuckToken {
        type Item = u32;

        async fn fetch_page(&self, _next_token: Option<&str>) -> Result<Page<u32>, MetricsError> {
            Ok(Page {
                items: vec![1],
                next_token: Some("same".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn collect_all_drains_every_page_in_order() {
        let source = NumberedPages::new(vec![vec![1, 2], vec![3], vec![], vec![4, 5]]);
        let paginator = Paginator::new(source);

        let items = paginator.collect_all().await.unwrap();

        assert_eq!(items, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn single_page_source_is_exhausted_after_one_fetch() {
        let mut paginator = Paginator::new(NumberedPages::new(vec![vec![7]]));

        assert!(paginator.has_more_pages());
        assert_eq!(paginator.next_page().await.unwrap(), Some(vec![7]));
        assert!(!paginator.has_more_pages());
        assert_eq!(paginator.next_page().await.unwrap(), None);
        assert_eq!(paginator.pages_fetched(), 1);
    }

    #[tokio::test]
    async fn failure_keeps_cursor_and_restart_rewinds() {
        let mut source = NumberedPages::new(vec![vec![1], vec![2], vec![3]]);
        source.fail_on = Some(1);
        let mut paginator = Paginator::new(source);

        assert_eq!(paginator.next_page().await.unwrap(), Some(vec![1]));
        assert!(paginator.next_page().await.is_err());
        assert!(paginator.has_more_pages());

        paginator.restart();
        assert_eq!(paginator.pages_fetched(), 0);
        assert_eq!(paginator.next_page().await.unwrap(), Some(vec![1]));
    }

    #[tokio::test]
    async fn collect_all_returns_nothing_when_a_later_page_fails() {
        let mut source = NumberedPages::new(vec![vec![1], vec![2], vec![3]]);
        source.fail_on = Some(2);

        let result = Paginator::new(source).collect_all().await;

        assert!(matches!(result, Err(MetricsError::Unavailable(_))));
    }

    #[tokio::test]
    async fn repeated_token_is_rejected() {
        let mut paginator = Paginator::new(StuckToken);

        assert!(paginator.next_page().await.is_ok());
        assert!(matches!(
            paginator.next_page().await,
            Err(MetricsError::InvalidToken(_))
        ));
    }
}
