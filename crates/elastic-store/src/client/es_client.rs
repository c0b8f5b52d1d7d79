//! [`SearchClient`] over the official Elasticsearch client.

use std::error::Error;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use elasticsearch::auth::Credentials;
use elasticsearch::cert::CertificateValidation;
use elasticsearch::http::request::JsonBody;
use elasticsearch::http::response::Response;
use elasticsearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use elasticsearch::indices::{
    IndicesCreateParts, IndicesDeleteParts, IndicesExistsParts, IndicesPutMappingParts,
};
use elasticsearch::{
    BulkParts, ClearScrollParts, DeleteParts, Elasticsearch, ExistsParts, GetParts, IndexParts,
    ScrollParts, SearchParts, UpdateParts,
};
use serde_json::{Value, json};

use crate::config::{ElasticStoreConfig, ElasticsearchAuth};
use crate::error::{StoreError, StoreResult, TransportError};

use super::{ScrollRequest, SearchClient, SearchRequest, keep_alive_param};

/// Builds an Elasticsearch client from configuration.
pub fn build_client(config: &ElasticStoreConfig) -> StoreResult<Elasticsearch> {
    let url = config.nodes.first().ok_or_else(|| TransportError::NoConnections {
        message: "no nodes configured".to_string(),
    })?;

    let parsed_url: elasticsearch::http::Url =
        url.parse().map_err(|e| TransportError::Other {
            message: format!("Invalid URL {}: {}", url, e),
        })?;

    let conn_pool = SingleNodeConnectionPool::new(parsed_url);

    let mut builder = TransportBuilder::new(conn_pool)
        .timeout(Duration::from_millis(config.request_timeout_ms));

    if config.disable_certificate_validation {
        builder = builder.cert_validation(CertificateValidation::None);
    }

    if let Some(ref auth) = config.auth {
        builder = match auth {
            ElasticsearchAuth::Basic { username, password } => {
                builder.auth(Credentials::Basic(username.clone(), password.clone()))
            }
            ElasticsearchAuth::Bearer { token } => {
                builder.auth(Credentials::Bearer(token.clone()))
            }
        };
    }

    let transport = builder.build().map_err(|e| TransportError::Other {
        message: format!("Failed to build transport: {}", e),
    })?;

    Ok(Elasticsearch::new(transport))
}

/// Classifies a client failure.
fn transport_error(err: elasticsearch::Error) -> StoreError {
    let message = err.to_string();
    if err.is_timeout() {
        TransportError::RequestTimeout { message }.into()
    } else if err.is_json() {
        StoreError::Serialization { message }
    } else if is_connect_failure(&err) {
        TransportError::ConnectionFault { message }.into()
    } else {
        TransportError::Other { message }.into()
    }
}

/// Walks the source chain looking for a socket-level failure.
fn is_connect_failure(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(io) = e.downcast_ref::<io::Error>() {
            return matches!(
                io.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::AddrNotAvailable
                    | io::ErrorKind::UnexpectedEof
            );
        }
        current = e.source();
    }
    false
}

/// Returns the parsed body of a successful response, or the engine's error.
async fn read_json(response: Response) -> StoreResult<Value> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Response {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| StoreError::malformed(format!("Failed to parse response: {}", e)))
}

/// True for a delete answer naming a missing document rather than a missing index.
fn is_document_not_found(body: &Value) -> bool {
    body.get("result").and_then(Value::as_str) == Some("not_found")
}

/// Maps a HEAD-style response onto existence.
async fn read_exists(response: Response) -> StoreResult<bool> {
    let status = response.status_code();
    if status.is_success() {
        return Ok(true);
    }
    if status.as_u16() == 404 {
        return Ok(false);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Response {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl SearchClient for Elasticsearch {
    async fn create_index(&self, index: &str, body: Option<Value>) -> StoreResult<Value> {
        let indices = self.indices();
        let create = indices.create(IndicesCreateParts::Index(index));
        let response = match body {
            Some(body) => create.body(body).send().await,
            None => create.send().await,
        }
        .map_err(transport_error)?;
        read_json(response).await
    }

    async fn delete_index(&self, index: &str) -> StoreResult<Value> {
        let response = self
            .indices()
            .delete(IndicesDeleteParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn index_exists(&self, index: &str) -> StoreResult<bool> {
        let response = self
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(transport_error)?;
        read_exists(response).await
    }

    async fn put_mapping(&self, index: &str, mapping: Value) -> StoreResult<Value> {
        let response = self
            .indices()
            .put_mapping(IndicesPutMappingParts::Index(&[index]))
            .body(mapping)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn index_document(&self, index: &str, id: &str, body: Value) -> StoreResult<Value> {
        let response = self
            .index(IndexParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn update_document(&self, index: &str, id: &str, body: Value) -> StoreResult<Value> {
        let response = self
            .update(UpdateParts::IndexId(index, id))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }

    async fn delete_document(&self, index: &str, id: &str) -> StoreResult<Value> {
        let response = self
            .delete(DeleteParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() != 404 {
            return read_json(response).await;
        }

        // deleting an absent document is not an error; a missing index still is
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<Value>(&body) {
            Ok(value) if is_document_not_found(&value) => Ok(value),
            _ => Err(StoreError::Response { status: 404, body }),
        }
    }

    async fn document_exists(&self, index: &str, id: &str) -> StoreResult<bool> {
        let response = self
            .exists(ExistsParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;
        read_exists(response).await
    }

    async fn get_document(&self, index: &str, id: &str) -> StoreResult<Option<Value>> {
        let response = self
            .get(GetParts::IndexId(index, id))
            .send()
            .await
            .map_err(transport_error)?;

        if response.status_code().as_u16() == 404 {
            return Ok(None);
        }
        read_json(response).await.map(Some)
    }

    async fn search(&self, request: SearchRequest) -> StoreResult<Value> {
        let SearchRequest {
            index,
            body,
            from,
            size,
            scroll,
            sort,
        } = request;
        let indices = [index.as_str()];
        let keep_alive = scroll.map(keep_alive_param);
        let sort: Vec<&str> = sort.iter().map(String::as_str).collect();

        let mut search = self.search(SearchParts::Index(&indices)).body(body);
        if let Some(from) = from {
            search = search.from(from as i64);
        }
        if let Some(size) = size {
            search = search.size(size as i64);
        }
        if let Some(ref keep_alive) = keep_alive {
            search = search.scroll(keep_alive);
        }
        if !sort.is_empty() {
            search = search.sort(&sort);
        }

        let response = search.send().await.map_err(transport_error)?;
        read_json(response).await
    }

    async fn scroll(&self, request: ScrollRequest) -> StoreResult<Value> {
        let response = self
            .scroll(ScrollParts::None)
            .body(json!({
                "scroll": keep_alive_param(request.scroll),
                "scroll_id": request.scroll_id
            }))
            .send()
            .await
            .map_err(transport_error)?;

        // an expired or unknown context answers 404 (search_context_missing_exception)
        if response.status_code().as_u16() == 404 {
            return Err(StoreError::StaleCursor {
                scroll_id: request.scroll_id,
            });
        }
        read_json(response).await
    }

    async fn clear_scroll(&self, scroll_id: &str) -> StoreResult<()> {
        let response = self
            .clear_scroll(ClearScrollParts::None)
            .body(json!({ "scroll_id": [scroll_id] }))
            .send()
            .await
            .map_err(transport_error)?;

        // 404 means the cursor is already gone
        let status = response.status_code();
        if status.is_success() || status.as_u16() == 404 {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Response {
            status: status.as_u16(),
            body,
        })
    }

    async fn bulk(&self, index: &str, operations: Vec<Value>) -> StoreResult<Value> {
        let body: Vec<JsonBody<Value>> = operations.into_iter().map(JsonBody::new).collect();
        let response = self
            .bulk(BulkParts::Index(index))
            .body(body)
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await
    }
}
