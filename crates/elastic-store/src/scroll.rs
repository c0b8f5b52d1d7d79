//! Full id enumeration over a server-side scroll cursor.
//!
//! A bounded search returns one page. [`find_all_ids`] instead opens a scroll
//! cursor and keeps advancing it until every matching document id has been
//! collected, then releases the cursor.
//!
//! ```text
//! search(scroll, size, sort=_doc) ──► ids + total + _scroll_id
//!        │
//!        ▼
//! while collected < total:
//!     scroll(_scroll_id) ──► ids (+ renewed _scroll_id)
//!     empty batch ──► stop
//!        │
//!        ▼
//! clear_scroll(_scroll_id)   (best-effort)
//! ```

use std::time::Duration;

use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::client::{ScrollRequest, SearchClient, SearchRequest};
use crate::config::ElasticStoreConfig;
use crate::error::{StoreError, StoreResult};

/// Default number of documents per scroll round-trip.
pub const DEFAULT_SCROLL_BATCH_SIZE: u64 = 100;

/// Default scroll cursor retention between round-trips.
pub const DEFAULT_SCROLL_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Batch size and keep-alive for a scroll run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollOptions {
    /// Documents per round-trip.
    pub batch_size: u64,
    /// Cursor retention between round-trips.
    pub keep_alive: Duration,
}

impl Default for ScrollOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_SCROLL_BATCH_SIZE,
            keep_alive: DEFAULT_SCROLL_KEEP_ALIVE,
        }
    }
}

impl ScrollOptions {
    /// Reads the scroll settings of a store configuration.
    pub fn from_config(config: &ElasticStoreConfig) -> StoreResult<Self> {
        Ok(Self {
            batch_size: config.scroll_batch_size,
            keep_alive: config.scroll_keep_alive_duration()?,
        })
    }
}

/// An open server-side cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrollCursor {
    /// Latest cursor token returned by the engine.
    pub scroll_id: String,
    /// Retention requested on each continuation.
    pub keep_alive: Duration,
}

impl ScrollCursor {
    fn next_request(&self) -> ScrollRequest {
        ScrollRequest {
            scroll_id: self.scroll_id.clone(),
            scroll: self.keep_alive,
        }
    }
}

/// Running state of one enumeration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrollProgress {
    /// Ids collected so far, in engine order.
    pub collected_ids: Vec<String>,
    /// Total hit count, read once from the first response.
    pub known_total: u64,
    /// Set when the engine returned an empty batch before the total was reached.
    pub exhausted: bool,
}

impl ScrollProgress {
    /// Whether another round-trip is needed.
    pub fn needs_more(&self) -> bool {
        !self.exhausted && (self.collected_ids.len() as u64) < self.known_total
    }

    fn record_batch(&mut self, ids: Vec<String>) {
        if ids.is_empty() {
            self.exhausted = true;
        } else {
            self.collected_ids.extend(ids);
        }
    }
}

/// Body used when the caller gives none: every document, no source.
pub fn default_scan_body() -> Value {
    json!({
        "query": { "match_all": {} },
        "_source": false
    })
}

/// Collects the id of every document matching `body` (or every document in
/// `index` when `body` is `None`), in scan order.
///
/// The cursor is cleared once the run ends, whether it succeeded or not.
/// A cursor that expires mid-run fails the whole run with
/// [`StoreError::StaleCursor`].
pub async fn find_all_ids<C: SearchClient + ?Sized>(
    client: &C,
    index: &str,
    body: Option<Value>,
    options: &ScrollOptions,
) -> StoreResult<Vec<String>> {
    let mut cursor: Option<ScrollCursor> = None;
    let result = scan(client, index, body, options, &mut cursor).await;

    if let Some(cursor) = cursor {
        if let Err(e) = client.clear_scroll(&cursor.scroll_id).await {
            warn!(index = %index, error = %e, "Failed to release scroll cursor");
        }
    }

    result.map(|progress| progress.collected_ids)
}

async fn scan<C: SearchClient + ?Sized>(
    client: &C,
    index: &str,
    body: Option<Value>,
    options: &ScrollOptions,
    cursor: &mut Option<ScrollCursor>,
) -> StoreResult<ScrollProgress> {
    let mut body = body.unwrap_or_else(default_scan_body);
    if let Some(obj) = body.as_object_mut() {
        obj.insert("track_total_hits".to_string(), Value::Bool(true));
    }

    let request = SearchRequest::new(index, body)
        .with_size(options.batch_size)
        .with_scroll(options.keep_alive)
        .with_sort("_doc");

    let response = client.search(request).await?;
    track_cursor(&response, options.keep_alive, cursor);

    let mut progress = ScrollProgress {
        known_total: read_total(&response)?,
        ..ScrollProgress::default()
    };
    progress.record_batch(read_ids(&response)?);

    debug!(
        index = %index,
        total = progress.known_total,
        collected = progress.collected_ids.len(),
        "Opened scroll cursor"
    );

    while progress.needs_more() {
        let request = cursor
            .as_ref()
            .map(ScrollCursor::next_request)
            .ok_or_else(|| StoreError::malformed("response is missing _scroll_id"))?;

        let response = client.scroll(request).await?;
        track_cursor(&response, options.keep_alive, cursor);
        progress.record_batch(read_ids(&response)?);

        debug!(
            index = %index,
            collected = progress.collected_ids.len(),
            total = progress.known_total,
            "Fetched scroll batch"
        );
    }

    if progress.exhausted && (progress.collected_ids.len() as u64) < progress.known_total {
        warn!(
            index = %index,
            collected = progress.collected_ids.len(),
            total = progress.known_total,
            "Scroll ended before the reported total was reached"
        );
    }

    Ok(progress)
}

/// Keeps the most recent cursor token; engines may rotate it between batches.
fn track_cursor(response: &Value, keep_alive: Duration, cursor: &mut Option<ScrollCursor>) {
    if let Some(scroll_id) = response.get("_scroll_id").and_then(Value::as_str) {
        *cursor = Some(ScrollCursor {
            scroll_id: scroll_id.to_string(),
            keep_alive,
        });
    }
}

/// Reads `hits.total`, either a bare count or `{"value": n}`.
pub(crate) fn read_total(response: &Value) -> StoreResult<u64> {
    let total = response
        .get("hits")
        .and_then(|h| h.get("total"))
        .ok_or_else(|| StoreError::malformed("response is missing hits.total"))?;

    total
        .as_u64()
        .or_else(|| total.get("value").and_then(Value::as_u64))
        .ok_or_else(|| StoreError::malformed(format!("unexpected hits.total: {}", total)))
}

fn read_ids(response: &Value) -> StoreResult<Vec<String>> {
    let hits = response
        .get("hits")
        .and_then(|h| h.get("hits"))
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::malformed("response is missing hits.hits"))?;

    hits.iter()
        .map(|hit| {
            hit.get("_id")
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| StoreError::malformed("hit is missing _id"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_options_defaults() {
        let options = ScrollOptions::default();
        assert_eq!(options.batch_size, 100);
        assert_eq!(options.keep_alive, Duration::from_secs(60));
    }

    #[test]
    fn test_scroll_options_from_config() {
        let mut config = ElasticStoreConfig::new("jobs");
        config.scroll_batch_size = 2;
        config.scroll_keep_alive = "30s".to_string();

        let options = ScrollOptions::from_config(&config).unwrap();
        assert_eq!(options.batch_size, 2);
        assert_eq!(options.keep_alive, Duration::from_secs(30));
    }

    #[test]
    fn test_read_total_variants() {
        let legacy = json!({ "hits": { "total": 7, "hits": [] } });
        let modern = json!({ "hits": { "total": { "value": 7, "relation": "eq" }, "hits": [] } });
        assert_eq!(read_total(&legacy).unwrap(), 7);
        assert_eq!(read_total(&modern).unwrap(), 7);

        let missing = json!({ "hits": { "hits": [] } });
        assert!(matches!(
            read_total(&missing),
            Err(StoreError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn test_read_ids() {
        let response = json!({
            "hits": { "total": 2, "hits": [ { "_id": "a" }, { "_id": "b" } ] }
        });
        assert_eq!(read_ids(&response).unwrap(), vec!["a", "b"]);

        let bad = json!({ "hits": { "total": 1, "hits": [ { "_source": {} } ] } });
        assert!(read_ids(&bad).is_err());
    }

    #[test]
    fn test_progress_needs_more() {
        let mut progress = ScrollProgress {
            known_total: 3,
            ..ScrollProgress::default()
        };
        assert!(progress.needs_more());

        progress.record_batch(vec!["a".to_string(), "b".to_string()]);
        assert!(progress.needs_more());

        progress.record_batch(Vec::new());
        assert!(progress.exhausted);
        assert!(!progress.needs_more());
    }

    #[test]
    fn test_track_cursor_keeps_previous_token() {
        let mut cursor = None;
        track_cursor(
            &json!({ "_scroll_id": "c1" }),
            DEFAULT_SCROLL_KEEP_ALIVE,
            &mut cursor,
        );
        track_cursor(&json!({}), DEFAULT_SCROLL_KEEP_ALIVE, &mut cursor);
        assert_eq!(cursor.map(|c| c.scroll_id), Some("c1".to_string()));
    }
}
