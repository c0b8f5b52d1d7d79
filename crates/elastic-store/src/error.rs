//! Error types for the store.
//!
//! Builder misuse surfaces as [`ValidationError`] before any request is sent.
//! Failures reported by the search engine client are split into transport
//! problems ([`TransportError`]), rejected requests, expired scroll cursors and
//! responses that do not have the expected shape.

use thiserror::Error;

/// The primary error type for all store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Malformed caller input
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Network/connection failures from the search engine client
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A scroll continuation against an expired or unknown cursor.
    #[error("scroll cursor expired or invalid: {scroll_id}")]
    StaleCursor {
        /// The token the engine no longer recognizes.
        scroll_id: String,
    },

    /// The search engine answered with a non-success status.
    #[error("search engine rejected request (status {status}): {body}")]
    Response {
        /// HTTP status code.
        status: u16,
        /// Raw response body, usually the engine's error document.
        body: String,
    },

    /// The response did not have the expected shape.
    #[error("malformed search engine response: {message}")]
    MalformedResponse {
        /// What was missing or unexpected.
        message: String,
    },

    /// Serialization/deserialization error.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying serde error.
        message: String,
    },
}

/// Errors caused by malformed builder or façade input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A field-order sort was declared without a field.
    #[error("field order sort requires a non-empty sort field")]
    MissingSortField,

    /// The store was asked to operate on an unnamed index.
    #[error("index name must be a non-empty string")]
    EmptyIndexName,

    /// A document was submitted for indexing without an `_id`.
    #[error("document is missing its _id")]
    MissingDocumentId,

    /// The scroll keep-alive could not be parsed as a duration.
    #[error("invalid scroll keep-alive '{value}': {message}")]
    InvalidKeepAlive {
        /// The configured string.
        value: String,
        /// Parser error.
        message: String,
    },
}

/// Errors raised by the transport underneath the search engine client.
#[derive(Error, Debug)]
pub enum TransportError {
    /// No node could be reached.
    #[error("no living connections: {message}")]
    NoConnections {
        /// Client error text.
        message: String,
    },

    /// The connection broke while the request was in flight.
    #[error("connection fault: {message}")]
    ConnectionFault {
        /// Client error text.
        message: String,
    },

    /// The request did not complete within the client timeout.
    #[error("request timeout: {message}")]
    RequestTimeout {
        /// Client error text.
        message: String,
    },

    /// Any other client-side failure (bad URL, transport setup, ...).
    #[error("transport error: {message}")]
    Other {
        /// Client error text.
        message: String,
    },
}

impl TransportError {
    /// Returns true for failures that mean the engine could not be talked to.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TransportError::NoConnections { .. }
                | TransportError::ConnectionFault { .. }
                | TransportError::RequestTimeout { .. }
        )
    }
}

impl StoreError {
    /// Classifies the error as a connection problem (no connections,
    /// connection fault, or request timeout).
    pub fn is_connection_error(&self) -> bool {
        match self {
            StoreError::Transport(err) => err.is_connection_error(),
            _ => false,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        StoreError::MalformedResponse {
            message: message.into(),
        }
    }
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization {
            message: err.to_string(),
        }
    }
}
