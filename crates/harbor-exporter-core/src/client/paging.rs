//! Sequential pagination over Harbor listings.
//!
//! Harbor pages with `page`/`page_size` query parameters and reports the
//! collection size in `x-total-count`. Pages are requested strictly one after
//! another: page numbering and the total-count arithmetic both depend on it.

use serde::de::DeserializeOwned;

use crate::error::{CollectError, DecodeError, FetchError};

use super::{HarborClient, decode};

/// Position within one paginated fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    page: u64,
    page_size: usize,
    total_count: Option<u64>,
}

impl PageCursor {
    pub fn new(page_size: usize) -> Self {
        debug_assert!(page_size > 0, "page size is validated at startup");
        Self {
            page: 1,
            page_size,
            total_count: None,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// `endpoint` with the paging parameters of the current page appended.
    pub fn endpoint(&self, endpoint: &str) -> String {
        let separator = if endpoint.contains('?') { '&' } else { '?' };
        format!(
            "{endpoint}{separator}page={}&page_size={}",
            self.page, self.page_size
        )
    }

    /// Records the outcome of the current page and moves to the next one.
    ///
    /// Returns `false` once the listing is drained: no total-count header
    /// (single page), a short page, or `page * page_size >= total`.
    pub fn advance(&mut self, returned: usize, total_count: Option<u64>) -> bool {
        self.total_count = total_count;
        let Some(total) = total_count else {
            return false;
        };
        if returned < self.page_size {
            return false;
        }
        if self.page * self.page_size as u64 >= total {
            return false;
        }
        self.page += 1;
        true
    }
}

/// Drains a paginated listing into memory.
///
/// Any failing page fails the whole fetch; no partial collection is returned.
pub struct PagedFetcher<'a> {
    client: &'a HarborClient,
    page_size: usize,
}

impl<'a> PagedFetcher<'a> {
    pub fn new(client: &'a HarborClient, page_size: usize) -> Self {
        Self { client, page_size }
    }

    /// Requests every page of `endpoint`, handing each body to `on_page`.
    ///
    /// `on_page` decodes the body and returns how many records it held.
    pub async fn fetch_pages<F>(&self, endpoint: &str, mut on_page: F) -> Result<(), CollectError>
    where
        F: FnMut(&str, &[u8]) -> Result<usize, DecodeError>,
    {
        let mut cursor = PageCursor::new(self.page_size);
        loop {
            let path = cursor.endpoint(endpoint);
            let resp = self.client.get(&path).await?;
            let returned = on_page(&path, &resp.body)?;

            let total_count = match resp.total_count {
                Some(raw) => Some(raw.trim().parse::<u64>().map_err(|_| {
                    FetchError::TotalCount {
                        endpoint: path.clone(),
                        value: raw.clone(),
                    }
                })?),
                None => None,
            };

            if !cursor.advance(returned, total_count) {
                return Ok(());
            }
        }
    }

    /// Fetches every page of a JSON array listing and concatenates the records
    /// in page order.
    pub async fn fetch_all<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>, CollectError> {
        let mut records = Vec::new();
        self.fetch_pages(endpoint, |path, body| {
            let page: Vec<T> = decode(path, body)?;
            let returned = page.len();
            records.extend(page);
            Ok(returned)
        })
        .await?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::testing::MockHarbor;
    use crate::config::CollectorConfig;

    fn numbered(from: usize, count: usize) -> String {
        let items: Vec<String> = (from..from + count).map(|i| format!("{{\"id\":{i}}}")).collect();
        format!("[{}]", items.join(","))
    }

    #[derive(Debug, serde::Deserialize)]
    struct Item {
        id: usize,
    }

    fn client_for(config: CollectorConfig, page_size: usize) -> HarborClient {
        HarborClient::new(&CollectorConfig {
            page_size,
            ..config
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_separator() {
        let cursor = PageCursor::new(10);
        assert_eq!(cursor.endpoint("/quotas"), "/quotas?page=1&page_size=10");
        assert_eq!(
            cursor.endpoint("/repositories?project_id=3"),
            "/repositories?project_id=3&page=1&page_size=10"
        );
    }

    #[test]
    fn test_cursor_stops_without_total_count() {
        let mut cursor = PageCursor::new(10);
        assert!(!cursor.advance(10, None));
        assert_eq!(cursor.page(), 1);
    }

    #[test]
    fn test_cursor_follows_total_count() {
        let mut cursor = PageCursor::new(10);
        assert!(cursor.advance(10, Some(25)));
        assert_eq!(cursor.page(), 2);
        assert!(cursor.advance(10, Some(25)));
        assert_eq!(cursor.page(), 3);
        assert!(!cursor.advance(5, Some(25)));
        assert_eq!(cursor.total_count(), Some(25));
    }

    #[test]
    fn test_cursor_stops_on_empty_page() {
        let mut cursor = PageCursor::new(10);
        assert!(!cursor.advance(0, Some(100)));
    }

    #[test]
    fn test_cursor_exact_multiple() {
        let mut cursor = PageCursor::new(10);
        assert!(cursor.advance(10, Some(20)));
        assert!(!cursor.advance(10, Some(20)));
    }

    #[tokio::test]
    async fn test_fetch_all_follows_total_count() {
        let mock = MockHarbor::new()
            .paged_route(
                "/api/v2.0/projects",
                vec![numbered(0, 10), numbered(10, 10), numbered(20, 5)],
                Some("25"),
            )
            .start()
            .await;
        let client = client_for(mock.config(), 10);

        let items: Vec<Item> = client.pages().fetch_all("/projects").await.unwrap();

        assert_eq!(items.len(), 25);
        assert!(items.iter().enumerate().all(|(i, item)| item.id == i));
        assert_eq!(mock.hits("/api/v2.0/projects"), 3);
        assert_eq!(
            mock.requests(),
            vec![
                "/api/v2.0/projects?page=1&page_size=10",
                "/api/v2.0/projects?page=2&page_size=10",
                "/api/v2.0/projects?page=3&page_size=10",
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_all_single_page_without_header() {
        let mock = MockHarbor::new()
            .paged_route("/api/v2.0/projects", vec![numbered(0, 10), numbered(10, 10)], None)
            .start()
            .await;
        let client = client_for(mock.config(), 10);

        let items: Vec<Item> = client.pages().fetch_all("/projects").await.unwrap();

        assert_eq!(items.len(), 10);
        assert_eq!(mock.hits("/api/v2.0/projects"), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_rejects_bad_total_count() {
        let mock = MockHarbor::new()
            .paged_route("/api/v2.0/projects", vec![numbered(0, 10)], Some("lots"))
            .start()
            .await;
        let client = client_for(mock.config(), 10);

        let err = client.pages().fetch_all::<Item>("/projects").await.unwrap_err();
        assert!(matches!(err, CollectError::Fetch(FetchError::TotalCount { .. })));
    }

    #[tokio::test]
    async fn test_fetch_all_fails_on_bad_page() {
        let mock = MockHarbor::new()
            .paged_route(
                "/api/v2.0/projects",
                vec![numbered(0, 10), "[{\"id\":".to_string()],
                Some("20"),
            )
            .start()
            .await;
        let client = client_for(mock.config(), 10);

        let err = client.pages().fetch_all::<Item>("/projects").await.unwrap_err();
        assert!(matches!(err, CollectError::Decode(_)));
        assert_eq!(mock.hits("/api/v2.0/projects"), 2);
    }
}
