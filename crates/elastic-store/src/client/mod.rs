//! Search engine client abstraction.
//!
//! [`SearchClient`] is the seam between the store and the transport. Each
//! method maps 1:1 onto one engine API call; transport concerns (HTTP framing,
//! retries, pooling, timeouts) stay behind it.
//!
//! With the `elasticsearch` feature enabled, the trait is implemented for the
//! official `elasticsearch::Elasticsearch` client.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreResult;

#[cfg(feature = "elasticsearch")]
mod es_client;

#[cfg(feature = "elasticsearch")]
pub use es_client::build_client;

/// A search (or scroll-opening) request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Target index.
    pub index: String,
    /// Request body (query, sort, script fields, ...).
    pub body: Value,
    /// Offset of the first hit.
    pub from: Option<u64>,
    /// Hits per response; per batch when scrolling.
    pub size: Option<u64>,
    /// Opens a scroll cursor retained for this long between round-trips.
    pub scroll: Option<Duration>,
    /// Sort tokens passed as URL parameters (e.g. `_doc`).
    pub sort: Vec<String>,
}

impl SearchRequest {
    /// Creates a request for `index` with no paging or scroll settings.
    pub fn new(index: impl Into<String>, body: Value) -> Self {
        Self {
            index: index.into(),
            body,
            from: None,
            size: None,
            scroll: None,
            sort: Vec::new(),
        }
    }

    /// Sets the offset of the first hit.
    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the number of hits per response.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Opens a scroll cursor kept alive for `keep_alive`.
    pub fn with_scroll(mut self, keep_alive: Duration) -> Self {
        self.scroll = Some(keep_alive);
        self
    }

    /// Appends a sort token.
    pub fn with_sort(mut self, token: impl Into<String>) -> Self {
        self.sort.push(token.into());
        self
    }
}

/// Advances an open scroll cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollRequest {
    /// Token from the previous response.
    pub scroll_id: String,
    /// Renewed retention for the cursor.
    pub scroll: Duration,
}

/// Formats a keep-alive the way the engine's time units expect it:
/// whole seconds when possible, otherwise milliseconds rounded up.
pub fn keep_alive_param(keep_alive: Duration) -> String {
    if keep_alive.subsec_nanos() == 0 {
        format!("{}s", keep_alive.as_secs())
    } else {
        format!("{}ms", keep_alive.as_nanos().div_ceil(1_000_000))
    }
}

/// Operations the store needs from the search engine.
///
/// Non-success engine answers are reported as
/// [`StoreError::Response`](crate::StoreError::Response); transport failures
/// as [`StoreError::Transport`](crate::StoreError::Transport). A scroll against
/// an expired cursor must fail with
/// [`StoreError::StaleCursor`](crate::StoreError::StaleCursor).
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Creates `index`, with optional settings/mappings.
    async fn create_index(&self, index: &str, body: Option<Value>) -> StoreResult<Value>;

    /// Deletes `index` and every document in it.
    async fn delete_index(&self, index: &str) -> StoreResult<Value>;

    /// Whether `index` exists.
    async fn index_exists(&self, index: &str) -> StoreResult<bool>;

    /// Replaces or extends the field mapping of `index`.
    async fn put_mapping(&self, index: &str, mapping: Value) -> StoreResult<Value>;

    /// Indexes (creates or replaces) one document.
    async fn index_document(&self, index: &str, id: &str, body: Value) -> StoreResult<Value>;

    /// Partially updates one document; `body` is an update request
    /// (e.g. `{"doc": {...}}`).
    async fn update_document(&self, index: &str, id: &str, body: Value) -> StoreResult<Value>;

    /// Deletes one document. Deleting an absent document succeeds with a
    /// `"result": "not_found"` body.
    async fn delete_document(&self, index: &str, id: &str) -> StoreResult<Value>;

    /// Whether a document with `id` exists.
    async fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool>;

    /// Fetches one document, `None` if it does not exist.
    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Option<Value>>;

    /// Runs a search, opening a scroll cursor when `request.scroll` is set.
    async fn search(&self, request: SearchRequest) -> StoreResult<Value>;

    /// Fetches the next batch of an open scroll cursor.
    async fn scroll(&self, request: ScrollRequest) -> StoreResult<Value>;

    /// Releases a scroll cursor.
    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()>;

    /// Sends a batch of bulk action/source lines against `index`.
    async fn bulk(&self, index: &str, operations: Vec<Value>) -> StoreResult<Value>;
}
