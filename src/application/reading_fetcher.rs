// Reading fetcher - One page of readings, or the exact statistics, per selection
use crate::application::amper_api::{AmperApi, FetchError};
use crate::domain::product::Selection;
use crate::domain::reading::ReadingPage;
use crate::domain::stats::UserStats;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone)]
pub struct ReadingFetcher {
    api: Arc<dyn AmperApi>,
}

impl ReadingFetcher {
    pub fn new(api: Arc<dyn AmperApi>) -> Self {
        Self { api }
    }

    /// Fetch one page. Never retries; retrying is up to the caller.
    pub async fn fetch_page(
        &self,
        selection: &Selection,
        page: u32,
        page_size: u32,
    ) -> Result<ReadingPage, FetchError> {
        if page == 0 {
            return Err(FetchError::InvalidRequest("page numbers start at 1".to_string()));
        }
        if page_size == 0 {
            return Err(FetchError::InvalidRequest("page size must be positive".to_string()));
        }

        let result = self.api.get_readings(selection, page, page_size).await?;
        let pagination = result.pagination;

        if pagination.page != page {
            tracing::warn!(
                "Requested page {} for {}/{} but server returned page {}",
                page,
                selection.product_id,
                selection.username,
                pagination.page
            );
        }
        if !pagination.is_consistent() {
            tracing::warn!("Inconsistent pagination metadata from server: {:?}", pagination);
        }

        tracing::debug!(
            "Fetched {} readings (page {}/{}, total {}) for {} on {} [{}]",
            result.readings.len(),
            pagination.page,
            pagination.pages,
            pagination.total,
            selection.username,
            selection.sensor,
            selection.time_range
        );

        Ok(result)
    }

    /// Fetch the exact statistics. Failure is expected when the backend has no
    /// stats endpoint.
    pub async fn fetch_stats(&self, selection: &Selection) -> Result<UserStats, FetchError> {
        self.api.get_stats(selection).await.inspect_err(|e| {
            tracing::debug!("Stats endpoint unavailable for {}: {}", selection.username, e);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::FakeApi;
    use crate::domain::time_range::TimeRange;

    fn selection() -> Selection {
        Selection::new("p1", "ayse", "s1", TimeRange::Last24Hours)
    }

    #[tokio::test]
    async fn test_fetch_page_passes_request_through() {
        let api = Arc::new(FakeApi::with_values(&[0.5, 2.0, 4.0], 25));
        let fetcher = ReadingFetcher::new(api.clone());

        let page = fetcher.fetch_page(&selection(), 2, 10).await.unwrap();

        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.pagination.total, 25);
        assert_eq!(page.readings.len(), 3);
        assert_eq!(api.page_calls(), 1);
        assert_eq!(api.last_request(), Some((TimeRange::Last24Hours, 2, 10)));
    }

    #[tokio::test]
    async fn test_fetch_page_rejects_bad_arguments_locally() {
        let api = Arc::new(FakeApi::with_values(&[], 0));
        let fetcher = ReadingFetcher::new(api.clone());

        let err = fetcher.fetch_page(&selection(), 0, 10).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));

        let err = fetcher.fetch_page(&selection(), 1, 0).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidRequest(_)));

        assert_eq!(api.page_calls(), 0);
    }

    #[tokio::test]
    async fn test_fetch_page_keeps_server_page_on_mismatch() {
        let api = Arc::new(FakeApi::with_values(&[1.0], 5));
        api.clamp_pages_to(1);
        let fetcher = ReadingFetcher::new(api);

        let page = fetcher.fetch_page(&selection(), 4, 10).await.unwrap();
        assert_eq!(page.pagination.page, 1);
    }

    #[tokio::test]
    async fn test_fetch_stats_failure_is_returned() {
        let api = Arc::new(FakeApi::with_values(&[1.0], 1));
        api.fail_stats();
        let fetcher = ReadingFetcher::new(api);

        let err = fetcher.fetch_stats(&selection()).await.unwrap_err();
        assert_eq!(err.kind(), crate::application::amper_api::FetchErrorKind::ServerError);
    }
}
