//! Official-client integration tests.
//!
//! None of these need a running Elasticsearch instance.
//!
//! Run with: `cargo test -p elastic-store --features elasticsearch --test es_client_tests`

#![cfg(feature = "elasticsearch")]

use elastic_store::client::build_client;
use elastic_store::{ElasticStore, ElasticStoreConfig, ElasticsearchAuth, StoreError};

// ============================================================================
// Client construction
// ============================================================================

#[test]
fn test_store_over_official_client() {
    let config = ElasticStoreConfig::new("jobs");
    let client = build_client(&config).unwrap();
    let store = ElasticStore::new(client, config);
    assert_eq!(store.config().index, "jobs");
}

#[test]
fn test_build_client_with_auth() {
    let mut config = ElasticStoreConfig::new("jobs");
    config.auth = Some(ElasticsearchAuth::Basic {
        username: "elastic".to_string(),
        password: "changeme".to_string(),
    });
    config.disable_certificate_validation = true;
    assert!(build_client(&config).is_ok());

    config.auth = Some(ElasticsearchAuth::Bearer {
        token: "abc".to_string(),
    });
    assert!(build_client(&config).is_ok());
}

// ============================================================================
// Transport failures
// ============================================================================

#[tokio::test]
async fn test_unreachable_node_is_a_transport_error() {
    let mut config = ElasticStoreConfig::new("jobs");
    config.nodes = vec!["http://127.0.0.1:1".to_string()];
    config.request_timeout_ms = 2_000;
    let store = ElasticStore::new(build_client(&config).unwrap(), config);

    let err = store.index_exists().await.unwrap_err();
    assert!(matches!(err, StoreError::Transport(_)), "got {:?}", err);
}
