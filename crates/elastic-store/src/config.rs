//! Store configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{StoreResult, ValidationError};

/// Default page size for bounded searches.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Credentials sent with every request.
///
/// Serialized with a `type` tag, e.g.
/// `{"type": "basic", "username": "elastic", "password": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElasticsearchAuth {
    /// HTTP basic auth against a native or file realm user.
    Basic {
        /// Realm user name.
        username: String,
        /// Realm password.
        password: String,
    },
    /// `Authorization: Bearer` with a service account or OAuth token.
    Bearer {
        /// Token value, without the `Bearer ` prefix.
        token: String,
    },
}

/// Configuration for an [`ElasticStore`](crate::ElasticStore).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticStoreConfig {
    /// Node URLs (e.g., `["http://localhost:9200"]`).
    /// Currently uses the first node (single-node connection pool).
    #[serde(default = "default_nodes")]
    pub nodes: Vec<String>,

    /// Index the store reads and writes.
    pub index: String,

    /// Request timeout in milliseconds (default: 30000).
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Optional authentication.
    #[serde(default)]
    pub auth: Option<ElasticsearchAuth>,

    /// Whether to disable certificate validation (default: false).
    /// Only use for development/testing.
    #[serde(default)]
    pub disable_certificate_validation: bool,

    /// Page size for `search` when the caller gives none (default: 20).
    #[serde(default = "default_page_size")]
    pub default_page_size: u64,

    /// Batch size for each scroll round-trip in `find_all_ids` (default: 100).
    #[serde(default = "default_scroll_batch_size")]
    pub scroll_batch_size: u64,

    /// Scroll cursor retention between round-trips, as a human-readable
    /// duration (default: `"1m"`).
    #[serde(default = "default_scroll_keep_alive")]
    pub scroll_keep_alive: String,
}

fn default_nodes() -> Vec<String> {
    vec!["http://localhost:9200".to_string()]
}

fn default_request_timeout_ms() -> u64 {
    30000
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

fn default_scroll_batch_size() -> u64 {
    100
}

fn default_scroll_keep_alive() -> String {
    "1m".to_string()
}

impl ElasticStoreConfig {
    /// Creates a configuration for `index` with every other setting defaulted.
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            nodes: default_nodes(),
            index: index.into(),
            request_timeout_ms: default_request_timeout_ms(),
            auth: None,
            disable_certificate_validation: false,
            default_page_size: default_page_size(),
            scroll_batch_size: default_scroll_batch_size(),
            scroll_keep_alive: default_scroll_keep_alive(),
        }
    }

    /// Parses [`scroll_keep_alive`](Self::scroll_keep_alive).
    pub fn scroll_keep_alive_duration(&self) -> StoreResult<Duration> {
        humantime::parse_duration(&self.scroll_keep_alive).map_err(|e| {
            ValidationError::InvalidKeepAlive {
                value: self.scroll_keep_alive.clone(),
                message: e.to_string(),
            }
            .into()
        })
    }
}
