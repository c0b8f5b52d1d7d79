//! Document and index operations bound to a single index.

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::client::{SearchClient, SearchRequest};
use crate::config::ElasticStoreConfig;
use crate::error::{StoreError, StoreResult, ValidationError};
use crate::query::CompiledQuery;
use crate::scroll::{self, ScrollOptions};

/// A bounded search request.
///
/// `from` defaults to 0 and `size` to the store's configured page size.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Request body, usually [`CompiledQuery::to_body`].
    pub body: Value,
    /// Offset of the first hit.
    pub from: Option<u64>,
    /// Page size.
    pub size: Option<u64>,
}

impl SearchOptions {
    /// Wraps a request body with default bounds.
    pub fn new(body: Value) -> Self {
        Self {
            body,
            from: None,
            size: None,
        }
    }

    /// Sets the offset.
    pub fn with_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    /// Sets the page size.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

impl From<&CompiledQuery> for SearchOptions {
    fn from(query: &CompiledQuery) -> Self {
        Self::new(query.to_body())
    }
}

/// One page of consolidated hits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchPage {
    /// Hits flattened by [`consolidate_hit`].
    pub data: Vec<Value>,
    /// Total number of matching documents, not just this page.
    pub total: u64,
}

/// Store over one index of the search engine.
pub struct ElasticStore<C: SearchClient> {
    client: C,
    config: ElasticStoreConfig,
}

impl<C: SearchClient> ElasticStore<C> {
    /// Binds a client to the index named in `config`.
    pub fn new(client: C, config: ElasticStoreConfig) -> Self {
        Self { client, config }
    }

    /// Returns the search engine client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the store configuration.
    pub fn config(&self) -> &ElasticStoreConfig {
        &self.config
    }

    fn index_name(&self) -> StoreResult<&str> {
        if self.config.index.is_empty() {
            return Err(ValidationError::EmptyIndexName.into());
        }
        Ok(&self.config.index)
    }

    // ========================================================================
    // Index administration
    // ========================================================================

    /// Creates the index, optionally with settings and mappings.
    pub async fn create_index(&self, mappings: Option<Value>) -> StoreResult<Value> {
        let index = self.index_name()?;
        let response = self.client.create_index(index, mappings).await?;
        info!(index = %index, "Created index");
        Ok(response)
    }

    /// Deletes the index.
    pub async fn delete_index(&self) -> StoreResult<Value> {
        let index = self.index_name()?;
        let response = self.client.delete_index(index).await?;
        info!(index = %index, "Deleted index");
        Ok(response)
    }

    /// Whether the index exists.
    pub async fn index_exists(&self) -> StoreResult<bool> {
        let index = self.index_name()?;
        self.client.index_exists(index).await
    }

    /// Puts a field mapping on the index.
    pub async fn update_mapping(&self, mapping: Value) -> StoreResult<Value> {
        let index = self.index_name()?;
        self.client.put_mapping(index, mapping).await
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Indexes `doc` under the id carried in its `_id` field.
    ///
    /// `_id` is removed from the stored body. Numeric ids are accepted and
    /// stored as their decimal string.
    pub async fn index(&self, doc: Value) -> StoreResult<Value> {
        let index = self.index_name()?;
        let (id, body) = split_document_id(doc)?;
        self.client.index_document(index, &id, body).await
    }

    /// Sends an update request (`{"doc": ...}`, `{"script": ...}`) for one document.
    pub async fn update(&self, id: &str, body: Value) -> StoreResult<Value> {
        let index = self.index_name()?;
        self.client.update_document(index, id, body).await
    }

    /// Merges `properties` into the stored document.
    pub async fn update_properties(&self, id: &str, properties: Value) -> StoreResult<Value> {
        self.update(id, json!({ "doc": properties })).await
    }

    /// Removes one document. Removing an absent document succeeds with
    /// `"result": "not_found"`.
    pub async fn unindex(&self, id: &str) -> StoreResult<Value> {
        let index = self.index_name()?;
        self.client.delete_document(index, id).await
    }

    /// Whether a document with `id` exists.
    pub async fn exists(&self, id: &str) -> StoreResult<bool> {
        let index = self.index_name()?;
        self.client.document_exists(index, id).await
    }

    /// Fetches one document, flattened with its `_id`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<Value>> {
        let index = self.index_name()?;
        let doc = self.client.get_document(index, id).await?;

        // a get answer for a missing document may still be 200 with found=false
        Ok(doc
            .filter(|d| d.get("found").and_then(Value::as_bool) != Some(false))
            .map(|d| consolidate_hit(&d)))
    }

    /// Sends bulk action/source lines against the index.
    pub async fn bulk(&self, operations: Vec<Value>) -> StoreResult<Value> {
        let index = self.index_name()?;
        self.client.bulk(index, operations).await
    }

    // ========================================================================
    // Search
    // ========================================================================

    /// Runs a bounded search and consolidates each hit.
    pub async fn search(&self, options: SearchOptions) -> StoreResult<SearchPage> {
        let response = self.raw_search(options).await?;

        let data = response
            .get("hits")
            .and_then(|h| h.get("hits"))
            .and_then(Value::as_array)
            .ok_or_else(|| StoreError::malformed("response is missing hits.hits"))?
            .iter()
            .map(consolidate_hit)
            .collect::<Vec<_>>();
        let total = scroll::read_total(&response)?;

        debug!(index = %self.config.index, returned = data.len(), total, "Search completed");

        Ok(SearchPage { data, total })
    }

    /// Runs a bounded search and returns the engine's response untouched.
    pub async fn raw_search(&self, options: SearchOptions) -> StoreResult<Value> {
        let index = self.index_name()?;
        let request = SearchRequest::new(index, options.body)
            .with_from(options.from.unwrap_or(0))
            .with_size(options.size.unwrap_or(self.config.default_page_size));
        self.client.search(request).await
    }

    /// Collects the id of every document matching `body`, or of every
    /// document in the index when `body` is `None`.
    pub async fn find_all_ids(&self, body: Option<Value>) -> StoreResult<Vec<String>> {
        let index = self.index_name()?;
        let options = ScrollOptions::from_config(&self.config)?;
        scroll::find_all_ids(&self.client, index, body, &options).await
    }

    /// Returns true when `err` means the engine could not be reached.
    pub fn is_connection_error(&self, err: &StoreError) -> bool {
        err.is_connection_error()
    }
}

/// Flattens a hit into its source plus `_id`, derived `fields`, `_sort` and
/// `_score`.
pub fn consolidate_hit(hit: &Value) -> Value {
    let mut consolidated = hit
        .get("_source")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    if let Some(id) = hit.get("_id") {
        consolidated.insert("_id".to_string(), id.clone());
    }

    if let Some(fields) = hit.get("fields").and_then(Value::as_object) {
        for (name, value) in fields {
            consolidated.insert(name.clone(), value.clone());
        }
    }

    if let Some(sort) = hit.get("sort") {
        consolidated.insert("_sort".to_string(), sort.clone());
    }

    if let Some(score) = hit.get("_score").filter(|s| !s.is_null()) {
        consolidated.insert("_score".to_string(), score.clone());
    }

    Value::Object(consolidated)
}

fn split_document_id(doc: Value) -> StoreResult<(String, Value)> {
    let Value::Object(mut body) = doc else {
        return Err(ValidationError::MissingDocumentId.into());
    };

    let id = match body.remove("_id") {
        Some(Value::String(id)) if !id.is_empty() => id,
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(ValidationError::MissingDocumentId.into()),
    };

    Ok((id, Value::Object(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consolidate_hit_merges_everything() {
        let hit = json!({
            "_id": "u1",
            "_score": 1.5,
            "_source": { "name": "Ada", "city": "London" },
            "fields": { "distance": [1200.0] },
            "sort": [1200.0]
        });

        assert_eq!(
            consolidate_hit(&hit),
            json!({
                "_id": "u1",
                "name": "Ada",
                "city": "London",
                "distance": [1200.0],
                "_sort": [1200.0],
                "_score": 1.5
            })
        );
    }

    #[test]
    fn test_consolidate_hit_skips_null_score() {
        let hit = json!({ "_id": "u1", "_score": null, "_source": { "name": "Ada" } });
        assert_eq!(consolidate_hit(&hit), json!({ "_id": "u1", "name": "Ada" }));
    }

    #[test]
    fn test_consolidate_hit_without_source() {
        let hit = json!({ "_id": "u1" });
        assert_eq!(consolidate_hit(&hit), json!({ "_id": "u1" }));
    }

    #[test]
    fn test_split_document_id() {
        let doc = json!({ "_id": "j1", "title": "Welder" });
        let (id, body) = split_document_id(doc).unwrap();
        assert_eq!(id, "j1");
        assert_eq!(body, json!({ "title": "Welder" }));

        let (id, _) = split_document_id(json!({ "_id": 42 })).unwrap();
        assert_eq!(id, "42");
    }

    #[test]
    fn test_split_document_id_missing() {
        let docs = [
            json!({ "title": "Welder" }),
            json!({ "_id": "" }),
            json!("j1"),
        ];
        for doc in docs {
            let err = split_document_id(doc).unwrap_err();
            assert!(matches!(
                err,
                StoreError::Validation(ValidationError::MissingDocumentId)
            ));
        }
    }

    #[test]
    fn test_search_options_from_compiled_query() {
        let compiled = crate::query::QueryBuilder::new().build().unwrap();
        let options = SearchOptions::from(&compiled).with_size(5);
        assert_eq!(options.body, json!({ "query": { "match_all": {} } }));
        assert_eq!(options.size, Some(5));
        assert_eq!(options.from, None);
    }
}
