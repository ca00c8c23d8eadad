//! Request body decoding
//!
//! This module provides:
//! - [`decode_body`]: buffers a request body, decodes it and puts the original
//!   bytes back so the same request can be decoded again
//! - [`Payload`]: an axum extractor with the same 400 policy
//! - [`CreateRequest`] and [`DeleteOptions`]: the shapes the dispatcher decodes,
//!   with the auxiliary flags folded into a single decode

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::core::error::ResourceError;

/// Largest body the decoder will buffer
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Decode the body of `request` into `T`
///
/// Once the body has been read it is put back, whether or not it decodes,
/// so a later decode sees the original payload. A body that cannot be read
/// (larger than [`MAX_BODY_BYTES`], or a failing stream) is a decode error
/// and leaves the request with an empty body.
pub async fn decode_body<T>(request: &mut Request) -> Result<T, ResourceError>
where
    T: DeserializeOwned,
{
    let bytes = buffer_body(request).await?;
    decode_bytes(&bytes)
}

/// Decode an optional body of `request`, see [`decode_optional`]
///
/// Buffers and restores the body like [`decode_body`].
pub async fn decode_optional_body<T>(request: &mut Request) -> Result<T, ResourceError>
where
    T: DeserializeOwned + Default,
{
    let bytes = buffer_body(request).await?;
    decode_optional(&bytes)
}

/// Read the whole body and put the bytes back into the request
async fn buffer_body(request: &mut Request) -> Result<Bytes, ResourceError> {
    let body = std::mem::take(request.body_mut());
    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| ResourceError::Decode(e.to_string()))?;

    *request.body_mut() = Body::from(bytes.clone());
    Ok(bytes)
}

/// Decode raw bytes into `T`
pub fn decode_bytes<T>(bytes: &[u8]) -> Result<T, ResourceError>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(|e| ResourceError::Decode(e.to_string()))
}

/// Decode an optional body
///
/// An empty body or a JSON `null` yields `T::default()`.
pub fn decode_optional<T>(bytes: &[u8]) -> Result<T, ResourceError>
where
    T: DeserializeOwned + Default,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }

    decode_bytes::<Option<T>>(bytes).map(Option::unwrap_or_default)
}

/// Extractor decoding the JSON body into `T`
///
/// Unlike `axum::Json` it does not look at the content type, and it rejects
/// with a plain-text 400 carrying the parse failure.
///
/// ```rust,ignore
/// async fn handler(Payload(user): Payload<User>) -> impl IntoResponse {
///     // user is decoded
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ResourceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ResourceError::Decode(e.body_text()))?;

        decode_bytes(&bytes).map(Payload)
    }
}

/// Create payload: the entity fields plus the `useExisting` flag
#[derive(Debug, Deserialize)]
pub struct CreateRequest<T> {
    #[serde(flatten)]
    pub entity: T,

    /// Return the stored entity instead of failing on a duplicate
    #[serde(default, rename = "useExisting")]
    pub use_existing: bool,
}

/// Optional delete payload
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct DeleteOptions {
    /// Answer 204 without touching the store
    #[serde(default, rename = "skipDestroy")]
    pub skip_destroy: bool,
}
