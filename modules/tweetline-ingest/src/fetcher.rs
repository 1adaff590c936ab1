// The raw-page fetcher seam. Transport, authentication and retries live
// behind this trait; the paginator only sees pages of opaque records.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::FetchError;

/// One page of undecoded records plus the cursor for the page after it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPage {
    pub items: Vec<Value>,
    /// Empty when the platform has nothing further.
    pub next_cursor: String,
}

impl RawPage {
    pub fn new(items: Vec<Value>, next_cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: next_cursor.into(),
        }
    }
}

/// Fetches one page. Must be safe to call again with the same arguments.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// `cursor` is empty for the first page. `remaining` is how many more
    /// entities the session still wants and is always at least 1.
    async fn fetch_page(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<RawPage, FetchError>;
}

#[async_trait]
impl<T: PageFetcher + ?Sized> PageFetcher for Arc<T> {
    async fn fetch_page(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<RawPage, FetchError> {
        (**self).fetch_page(query, remaining, cursor).await
    }
}

/// Adapts an async closure `(query, remaining, cursor)` into a fetcher.
pub struct FnFetcher<F> {
    f: F,
}

pub fn fetch_fn<F, Fut>(f: F) -> FnFetcher<F>
where
    F: Fn(String, usize, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawPage, FetchError>> + Send + 'static,
{
    FnFetcher { f }
}

#[async_trait]
impl<F, Fut> PageFetcher for FnFetcher<F>
where
    F: Fn(String, usize, String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RawPage, FetchError>> + Send + 'static,
{
    async fn fetch_page(
        &self,
        query: &str,
        remaining: usize,
        cursor: &str,
    ) -> Result<RawPage, FetchError> {
        (self.f)(query.to_string(), remaining, cursor.to_string()).await
    }
}
