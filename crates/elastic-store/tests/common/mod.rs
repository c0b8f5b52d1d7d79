//! Test infrastructure for the store.
//!
//! [`MockClient`] is an in-memory [`SearchClient`] that records every request
//! it receives. Documents live in a map per index; scroll runs page through a
//! scripted list of ids so cursor behavior can be asserted round-trip by
//! round-trip.

#![allow(dead_code)]

use std::collections::BTreeMap;

use async_trait::async_trait;
use elastic_store::{
    ScrollRequest, SearchClient, SearchRequest, StoreError, StoreResult, TransportError,
};
use parking_lot::Mutex;
use serde_json::{Value, json};

/// A request as the mock received it.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    CreateIndex { index: String, body: Option<Value> },
    DeleteIndex { index: String },
    IndexExists { index: String },
    PutMapping { index: String, mapping: Value },
    IndexDocument { index: String, id: String, body: Value },
    UpdateDocument { index: String, id: String, body: Value },
    DeleteDocument { index: String, id: String },
    DocumentExists { index: String, id: String },
    GetDocument { index: String, id: String },
    Search(SearchRequest),
    Scroll(ScrollRequest),
    ClearScroll(String),
    Bulk { index: String, operations: Vec<Value> },
}

#[derive(Debug, Default)]
struct MockState {
    indices: BTreeMap<String, Option<Value>>,
    docs: BTreeMap<String, BTreeMap<String, Value>>,
    calls: Vec<RecordedCall>,

    scan_ids: Vec<String>,
    reported_total: Option<u64>,
    scan_position: usize,
    scan_batch: usize,
    cursor_generation: u64,
    omit_scroll_id: bool,
    expire_cursor_after: Option<usize>,
    fail_clear_scroll: bool,

    search_response: Option<Value>,
    unreachable: bool,
}

/// In-memory search client.
#[derive(Debug, Default)]
pub struct MockClient {
    state: Mutex<MockState>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids returned, in order, by scroll runs.
    pub fn with_scan_ids<I, S>(self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.lock().scan_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Overrides the `hits.total` reported by scroll runs.
    pub fn with_reported_total(self, total: u64) -> Self {
        self.state.lock().reported_total = Some(total);
        self
    }

    /// Leaves `_scroll_id` out of every search response.
    pub fn without_scroll_id(self) -> Self {
        self.state.lock().omit_scroll_id = true;
        self
    }

    /// Lets `continuations` scroll calls succeed, then answers with an expired cursor.
    pub fn expiring_cursor_after(self, continuations: usize) -> Self {
        self.state.lock().expire_cursor_after = Some(continuations);
        self
    }

    pub fn failing_clear_scroll(self) -> Self {
        self.state.lock().fail_clear_scroll = true;
        self
    }

    /// Answers every non-scroll search with `response`.
    pub fn with_search_response(self, response: Value) -> Self {
        self.state.lock().search_response = Some(response);
        self
    }

    /// Makes every call fail as if no node could be reached.
    pub fn unreachable(self) -> Self {
        self.state.lock().unreachable = true;
        self
    }

    pub fn insert_document(&self, index: &str, id: &str, source: Value) {
        self.state
            .lock()
            .docs
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), source);
    }

    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        self.state
            .lock()
            .docs
            .get(index)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    pub fn search_requests(&self) -> Vec<SearchRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Search(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn scroll_requests(&self) -> Vec<ScrollRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::Scroll(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn cleared_cursors(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RecordedCall::ClearScroll(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Search plus scroll calls.
    pub fn round_trips(&self) -> usize {
        self.search_requests().len() + self.scroll_requests().len()
    }

    fn record(&self, call: RecordedCall) -> StoreResult<()> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.unreachable {
            return Err(TransportError::NoConnections {
                message: "mock cluster is unreachable".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl MockState {
    fn next_scan_page(&mut self) -> Value {
        let end = (self.scan_position + self.scan_batch).min(self.scan_ids.len());
        let hits: Vec<Value> = self.scan_ids[self.scan_position..end]
            .iter()
            .map(|id| json!({ "_index": "scan", "_id": id, "_score": null }))
            .collect();
        self.scan_position = end;
        self.cursor_generation += 1;

        let total = self
            .reported_total
            .unwrap_or(self.scan_ids.len() as u64);
        let mut response = json!({
            "hits": {
                "total": { "value": total, "relation": "eq" },
                "hits": hits
            }
        });
        if !self.omit_scroll_id {
            response["_scroll_id"] = json!(self.current_cursor());
        }
        response
    }

    fn current_cursor(&self) -> String {
        format!("cursor-{}", self.cursor_generation)
    }

    fn index_hits(&self, request: &SearchRequest) -> Value {
        let docs = self.docs.get(&request.index).cloned().unwrap_or_default();
        let from = request.from.unwrap_or(0) as usize;
        let size = request.size.unwrap_or(10) as usize;
        let hits: Vec<Value> = docs
            .iter()
            .skip(from)
            .take(size)
            .map(|(id, source)| json!({ "_id": id, "_score": 1.0, "_source": source }))
            .collect();
        json!({
            "hits": {
                "total": { "value": docs.len(), "relation": "eq" },
                "hits": hits
            }
        })
    }
}

#[async_trait]
impl SearchClient for MockClient {
    async fn create_index(&self, index: &str, body: Option<Value>) -> StoreResult<Value> {
        self.record(RecordedCall::CreateIndex {
            index: index.to_string(),
            body: body.clone(),
        })?;
        let mut state = self.state.lock();
        if state.indices.contains_key(index) {
            return Err(StoreError::Response {
                status: 400,
                body: "resource_already_exists_exception".to_string(),
            });
        }
        state.indices.insert(index.to_string(), body);
        Ok(json!({ "acknowledged": true, "index": index }))
    }

    async fn delete_index(&self, index: &str) -> StoreResult<Value> {
        self.record(RecordedCall::DeleteIndex {
            index: index.to_string(),
        })?;
        let mut state = self.state.lock();
        if state.indices.remove(index).is_none() {
            return Err(StoreError::Response {
                status: 404,
                body: "index_not_found_exception".to_string(),
            });
        }
        state.docs.remove(index);
        Ok(json!({ "acknowledged": true }))
    }

    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        self.record(RecordedCall::IndexExists {
            index: index.to_string(),
        })?;
        Ok(self.state.lock().indices.contains_key(index))
    }

    async fn put_mapping(&self, index: &str, mapping: Value) -> StoreResult<Value> {
        self.record(RecordedCall::PutMapping {
            index: index.to_string(),
            mapping: mapping.clone(),
        })?;
        self.state
            .lock()
            .indices
            .insert(index.to_string(), Some(mapping));
        Ok(json!({ "acknowledged": true }))
    }

    async fn index_document(&self, index: &str, id: &str, body: Value) -> StoreResult<Value> {
        self.record(RecordedCall::IndexDocument {
            index: index.to_string(),
            id: id.to_string(),
            body: body.clone(),
        })?;
        self.insert_document(index, id, body);
        Ok(json!({ "_index": index, "_id": id, "result": "created" }))
    }

    async fn update_document(&self, index: &str, id: &str, body: Value) -> StoreResult<Value> {
        self.record(RecordedCall::UpdateDocument {
            index: index.to_string(),
            id: id.to_string(),
            body: body.clone(),
        })?;
        let mut state = self.state.lock();
        let Some(existing) = state.docs.get_mut(index).and_then(|docs| docs.get_mut(id)) else {
            return Err(StoreError::Response {
                status: 404,
                body: "document_missing_exception".to_string(),
            });
        };
        if let (Some(target), Some(patch)) = (
            existing.as_object_mut(),
            body.get("doc").and_then(Value::as_object),
        ) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(json!({ "_index": index, "_id": id, "result": "updated" }))
    }

    async fn delete_document(&self, index: &str, id: &str) -> StoreResult<Value> {
        self.record(RecordedCall::DeleteDocument {
            index: index.to_string(),
            id: id.to_string(),
        })?;
        let removed = self
            .state
            .lock()
            .docs
            .get_mut(index)
            .and_then(|docs| docs.remove(id));
        let result = if removed.is_some() { "deleted" } else { "not_found" };
        Ok(json!({ "_index": index, "_id": id, "result": result }))
    }

    async fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool> {
        self.record(RecordedCall::DocumentExists {
            index: index.to_string(),
            id: id.to_string(),
        })?;
        Ok(self.document(index, id).is_some())
    }

    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Option<Value>> {
        self.record(RecordedCall::GetDocument {
            index: index.to_string(),
            id: id.to_string(),
        })?;
        Ok(self.document(index, id).map(|source| {
            json!({ "_index": index, "_id": id, "found": true, "_source": source })
        }))
    }

    async fn search(&self, request: SearchRequest) -> StoreResult<Value> {
        self.record(RecordedCall::Search(request.clone()))?;
        let mut state = self.state.lock();

        if request.scroll.is_some() {
            state.scan_position = 0;
            state.scan_batch = request.size.unwrap_or(10) as usize;
            return Ok(state.next_scan_page());
        }

        Ok(state
            .search_response
            .clone()
            .unwrap_or_else(|| state.index_hits(&request)))
    }

    async fn scroll(&self, request: ScrollRequest) -> StoreResult<Value> {
        self.record(RecordedCall::Scroll(request.clone()))?;
        let mut state = self.state.lock();

        let continuations = state
            .calls
            .iter()
            .filter(|call| matches!(call, RecordedCall::Scroll(_)))
            .count();
        let expired = state
            .expire_cursor_after
            .is_some_and(|limit| continuations > limit);
        if expired || request.scroll_id != state.current_cursor() {
            return Err(StoreError::StaleCursor {
                scroll_id: request.scroll_id,
            });
        }
        Ok(state.next_scan_page())
    }

    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        self.record(RecordedCall::ClearScroll(scroll_id.to_string()))?;
        if self.state.lock().fail_clear_scroll {
            return Err(StoreError::Response {
                status: 500,
                body: "clear scroll failed".to_string(),
            });
        }
        Ok(())
    }

    async fn bulk(&self, index: &str, operations: Vec<Value>) -> StoreResult<Value> {
        self.record(RecordedCall::Bulk {
            index: index.to_string(),
            operations: operations.clone(),
        })?;
        Ok(json!({ "took": 1, "errors": false, "items": [] }))
    }
}
