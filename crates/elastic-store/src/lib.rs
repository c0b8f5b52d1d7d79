//! Elastic Store
//!
//! Query construction and result pagination in front of an Elasticsearch
//! cluster. Callers declare filters, boosted multi-field text matching, sort
//! strategies and derived geo-distance fields on a [`QueryBuilder`], compile them
//! into one query document, and hand it to an [`ElasticStore`] bound to an index.
//! Beyond a single page, [`ElasticStore::find_all_ids`] walks a server-side scroll
//! cursor until every matching id has been collected.
//!
//! # Features
//!
//! - `elasticsearch` - implements [`SearchClient`] for the official
//!   `elasticsearch::Elasticsearch` client and adds
//!   [`build_client`](client::build_client). Enabled by default.
//!
//! Without it, any type implementing [`SearchClient`] can back a store.
//!
//! # Architecture
//!
//! - [`query`] - clause constructors, sort strategies and the query builder
//! - [`client`] - the [`SearchClient`] seam over the search engine
//! - [`scroll`] - full id enumeration over a scroll cursor
//! - [`store`] - document and index operations bound to one index
//! - [`config`] - store configuration
//! - [`error`] - error types for all operations
//!
//! # Quick Start
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use elastic_store::{QueryBuilder, SortDescriptor, TextSearchOptions};
//! use serde_json::json;
//!
//! let boosts = BTreeMap::from([("title", 3.0), ("description", 1.0)]);
//!
//! let sort: SortDescriptor = serde_json::from_value(json!({
//!     "sortType": "FieldOrder",
//!     "sortParams": { "sortField": "posted", "sortAscending": false }
//! }))
//! .unwrap();
//!
//! let compiled = QueryBuilder::new()
//!     .multi_field_text_search_with_boost("night shift", boosts, TextSearchOptions::default())
//!     .filter_exact("status", "open")
//!     .filter_by_distance("location", [-0.12, 51.5], 5000.0)
//!     .sort_by(&sort)
//!     .build()
//!     .unwrap();
//!
//! let body = compiled.to_body();
//! assert_eq!(body["sort"], json!([{ "posted": "desc" }]));
//! assert!(body["query"]["bool"]["filter"].is_array());
//! ```
//!
//! # Logging
//!
//! The crate emits `tracing` events and installs no subscriber.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod scroll;
pub mod store;

// Re-export commonly used types at crate root
pub use client::{ScrollRequest, SearchClient, SearchRequest};
pub use config::{DEFAULT_PAGE_SIZE, ElasticStoreConfig, ElasticsearchAuth};
pub use error::{StoreError, StoreResult, TransportError, ValidationError};
pub use query::{
    Clause, CompiledQuery, Fuzziness, GeoPoint, MatchGroup, QueryBuilder, SortDescriptor,
    SortParams, SortSpec, TextSearchOptions,
};
pub use scroll::{ScrollOptions, find_all_ids};
pub use store::{ElasticStore, SearchOptions, SearchPage, consolidate_hit};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
