//! Typed error handling for resource dispatch
//!
//! Every error raised while serving a request is terminal for that request.
//! The job of this module is to classify it into a status code and a body.
//!
//! # Error Categories
//!
//! - [`ResourceError`]: what a verb handler can fail with, mapped to HTTP
//! - [`KeyError`]: the key could not be extracted from the request
//! - [`StoreError`]: typed failures raised by [`DataAccess`](crate::core::DataAccess)
//!   implementations, carried inside `anyhow::Error`
//!
//! # Example
//!
//! ```rust,ignore
//! use keyed_rest::prelude::*;
//!
//! match store.create(user).await {
//!     Err(e) if StoreError::is_already_exists(&e) => println!("duplicate"),
//!     Err(e) => eprintln!("backend failure: {}", e),
//!     Ok(user) => println!("created {:?}", user),
//! }
//! ```

use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// The error type returned by the verb handlers
#[derive(Debug, Error)]
pub enum ResourceError {
    /// The request body does not match the expected shape
    #[error("invalid payload: {0}")]
    Decode(String),

    /// The key could not be extracted or converted
    #[error("invalid key: {0}")]
    KeyParse(#[from] KeyError),

    /// The addressed entity does not exist
    #[error("not found")]
    NotFound,

    /// Duplicate create, only produced when conflicts are enabled on the resource
    #[error("{0}")]
    Conflict(String),

    /// Any other failure reported by the data access layer
    #[error("{0}")]
    Backend(anyhow::Error),

    /// The success value could not be encoded for the wire
    #[error("{0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResourceError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResourceError::Decode(_) => StatusCode::BAD_REQUEST,
            ResourceError::KeyParse(_) => StatusCode::BAD_REQUEST,
            ResourceError::NotFound => StatusCode::NOT_FOUND,
            ResourceError::Conflict(_) => StatusCode::CONFLICT,
            ResourceError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ResourceError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error, used as a structured log field
    pub fn error_code(&self) -> &'static str {
        match self {
            ResourceError::Decode(_) => "INVALID_PAYLOAD",
            ResourceError::KeyParse(_) => "INVALID_KEY",
            ResourceError::NotFound => "NOT_FOUND",
            ResourceError::Conflict(_) => "ALREADY_EXISTS",
            ResourceError::Backend(_) => "BACKEND_ERROR",
            ResourceError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the client caused this error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

impl IntoResponse for ResourceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if matches!(self, ResourceError::NotFound) {
            return status.into_response();
        }

        // Raw message, no sanitization at this layer
        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}

// =============================================================================
// Key Errors
// =============================================================================

/// Errors raised by [`KeyParser`](crate::core::KeyParser) implementations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// The named path parameter is not present on the route
    #[error("missing path parameter '{0}'")]
    MissingParameter(String),

    /// The named header is absent or not valid UTF-8
    #[error("missing header '{0}'")]
    MissingHeader(String),

    /// The path parameters could not be decoded
    #[error("malformed path: {0}")]
    MalformedPath(String),

    /// The raw value could not be converted to the key type
    #[error("'{value}' is not a valid {name}: {message}")]
    Invalid {
        name: String,
        value: String,
        message: String,
    },

    /// The payload identifies a different entity than the request key
    #[error("payload key {payload} does not match request key {request}")]
    Mismatch { request: String, payload: String },
}

// =============================================================================
// Store Errors
// =============================================================================

/// Typed failures raised by data access implementations
///
/// Stores return `anyhow::Result`, so these travel as `anyhow::Error` and are
/// recovered with [`StoreError::find`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// An entity with the same key is already stored
    #[error("entity '{key}' already exists")]
    AlreadyExists { key: String },

    /// The backing store could not be reached
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A stored record could not be decoded back into an entity
    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Find a `StoreError` anywhere in an error chain
    pub fn find(err: &anyhow::Error) -> Option<&StoreError> {
        err.chain().find_map(|cause| cause.downcast_ref::<StoreError>())
    }

    /// Whether the error chain contains a duplicate-key failure
    pub fn is_already_exists(err: &anyhow::Error) -> bool {
        matches!(Self::find(err), Some(StoreError::AlreadyExists { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_client_errors_map_to_400() {
        let decode = ResourceError::Decode("expected value".to_string());
        assert_eq!(decode.status_code(), StatusCode::BAD_REQUEST);
        assert!(decode.is_client_error());

        let key = ResourceError::from(KeyError::MissingParameter("id".to_string()));
        assert_eq!(key.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(key.error_code(), "INVALID_KEY");
    }

    #[test]
    fn test_backend_error_maps_to_500() {
        let err = ResourceError::Backend(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "connection refused");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_decode_message_includes_cause() {
        let err = ResourceError::Decode("EOF while parsing".to_string());
        assert_eq!(err.to_string(), "invalid payload: EOF while parsing");
    }

    #[test]
    fn test_not_found_has_empty_body() {
        let response = ResourceError::NotFound.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().get(header::CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_error_response_is_plain_text() {
        let response = ResourceError::Conflict("entity 'brad' already exists".to_string())
            .into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
    }

    #[test]
    fn test_store_error_found_through_context() {
        let err = anyhow::Error::new(StoreError::AlreadyExists {
            key: "brad".to_string(),
        })
        .context("create user");

        assert!(StoreError::is_already_exists(&err));
        assert!(!StoreError::is_already_exists(&anyhow::anyhow!("boom")));
    }

    #[test]
    fn test_store_error_find_with_result_context() {
        let result: anyhow::Result<()> = Err(StoreError::Connection("refused".to_string()))
            .context("open pool");
        let err = result.unwrap_err();
        assert!(matches!(
            StoreError::find(&err),
            Some(StoreError::Connection(_))
        ));
    }

    #[test]
    fn test_key_error_messages() {
        let err = KeyError::Invalid {
            name: "id".to_string(),
            value: "abc".to_string(),
            message: "invalid digit found in string".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "'abc' is not a valid id: invalid digit found in string"
        );

        let err = ResourceError::from(KeyError::Mismatch {
            request: "\"brad\"".to_string(),
            payload: "\"ana\"".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            r#"invalid key: payload key "ana" does not match request key "brad""#
        );
    }
}
