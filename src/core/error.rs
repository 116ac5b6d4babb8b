//! Typed error handling for collection-rest
//!
//! Errors are split along the three outcomes a request can end in besides
//! success:
//!
//! - [`ErrorKind::Validation`]: the `validate` hook said no. This is not an
//!   error value at all, only a negative boolean; it appears here so that
//!   envelopes can label it.
//! - [`StoreError`]: the collection reported a failure for an otherwise
//!   well-formed operation.
//! - [`InternalError`]: the payload could not be decoded, a filter could not be
//!   built, or a hook failed.
//!
//! [`RestError`] wraps the last two and is what the `error` and
//! `internalError` hooks receive.
//!
//! # Example
//!
//! ```rust,ignore
//! match pipeline_error {
//!     RestError::Store(StoreError::DuplicateId { id }) => {
//!         tracing::warn!(%id, "duplicate insert");
//!     }
//!     err => tracing::error!(kind = err.kind().as_str(), "{err}"),
//! }
//! ```

use crate::config::Method;
use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;

/// The main error type flowing through the hook pipeline
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The collection rejected or failed the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Decoding, query building or hook failure
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl RestError {
    /// Which error hook is responsible for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RestError::Store(_) => ErrorKind::Store,
            RestError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status used by the default hooks
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Category of a failed request, as labelled in verbose envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "validation error")]
    Validation,
    #[serde(rename = "store error")]
    Store,
    #[serde(rename = "internal error")]
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation error",
            ErrorKind::Store => "store error",
            ErrorKind::Internal => "internal error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Store Errors
// =============================================================================

/// Failures reported by a [`Collection`](crate::core::collection::Collection)
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A document with the same `_id` is already stored
    #[error("document with _id '{id}' already exists")]
    DuplicateId { id: String },

    /// The projection cannot be applied to a stored document
    #[error("invalid projection: {message}")]
    InvalidProjection { message: String },

    /// The update document cannot be applied
    #[error("invalid update: {message}")]
    InvalidUpdate { message: String },

    /// The filter uses something the store does not understand
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The backend could not be reached or its state is unusable
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// Backend-specific failure
    #[error("{operation} failed: {message}")]
    OperationFailed { operation: String, message: String },
}

impl StoreError {
    pub fn invalid_update(message: impl Into<String>) -> Self {
        StoreError::InvalidUpdate {
            message: message.into(),
        }
    }

    pub fn operation(operation: &str, err: impl fmt::Display) -> Self {
        StoreError::OperationFailed {
            operation: operation.to_string(),
            message: err.to_string(),
        }
    }
}

/// A specialized Result type for collection operations
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Internal Errors
// =============================================================================

/// Faults raised while translating, validating or building a query
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    /// The encoded `json` field could not be decoded
    #[error("failed to decode request payload: {message}")]
    Decode { message: String },

    /// A `$regex` value is not a string or does not compile
    #[error("invalid pattern for field '{field}': {message}")]
    InvalidPattern { field: String, message: String },

    /// The filter document is not shaped like a filter
    #[error("invalid filter: {message}")]
    InvalidFilter { message: String },

    /// A document or update argument is missing or not an object
    #[error("invalid {argument}: {message}")]
    InvalidArgument { argument: String, message: String },

    /// The `validate` hook failed instead of answering
    #[error("validate hook failed: {0}")]
    Hook(#[source] anyhow::Error),
}

impl InternalError {
    pub fn decode(err: impl fmt::Display) -> Self {
        InternalError::Decode {
            message: err.to_string(),
        }
    }

    pub fn invalid_filter(message: impl Into<String>) -> Self {
        InternalError::InvalidFilter {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for InternalError {
    fn from(err: serde_json::Error) -> Self {
        InternalError::decode(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors raised while loading resource options
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The document could not be parsed
    #[error("failed to parse resource options: {message}")]
    Parse { message: String },

    /// The options parsed but violate a constraint
    #[error("invalid resource options: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    /// The options file could not be read
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// =============================================================================
// Error envelope
// =============================================================================

/// JSON body written by the default error and rejection hooks
///
/// Non-debug envelopes carry only a fixed message; debug envelopes add the
/// method and the error category next to the detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorEnvelope {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Method>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

impl ErrorEnvelope {
    /// `{ "error": "internal error" }`
    pub fn generic() -> Self {
        Self {
            error: ErrorKind::Internal.as_str().to_string(),
            method: None,
            kind: None,
        }
    }

    /// `{ "error": "bad request" }` or, in debug mode, `{ "error": "validation error" }`
    pub fn rejected(debug: bool) -> Self {
        let error = if debug {
            ErrorKind::Validation.as_str()
        } else {
            "bad request"
        };
        Self {
            error: error.to_string(),
            method: None,
            kind: None,
        }
    }

    /// `{ "error": <detail>, "method": <method>, "type": <kind> }`
    pub fn verbose(method: Method, err: &RestError) -> Self {
        Self {
            error: err.to_string(),
            method: Some(method),
            kind: Some(err.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_error_kind() {
        let err: RestError = StoreError::DuplicateId {
            id: "abc".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Store);

        let err: RestError = InternalError::decode("eof").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::DuplicateId {
            id: "abc".to_string(),
        };
        assert!(err.to_string().contains("abc"));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_generic_envelope_serialization() {
        let body = serde_json::to_value(ErrorEnvelope::generic()).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "internal error" }));
    }

    #[test]
    fn test_rejected_envelope() {
        let body = serde_json::to_value(ErrorEnvelope::rejected(false)).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "bad request" }));

        let body = serde_json::to_value(ErrorEnvelope::rejected(true)).unwrap();
        assert_eq!(body, serde_json::json!({ "error": "validation error" }));
    }

    #[test]
    fn test_verbose_envelope_labels_store_errors() {
        let err = RestError::Store(StoreError::invalid_update("cannot mix"));
        let body = serde_json::to_value(ErrorEnvelope::verbose(Method::Put, &err)).unwrap();
        assert_eq!(body["method"], "put");
        assert_eq!(body["type"], "store error");
        assert!(body["error"].as_str().unwrap().contains("cannot mix"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: InternalError = json_err.into();
        assert!(matches!(err, InternalError::Decode { .. }));
    }
}
