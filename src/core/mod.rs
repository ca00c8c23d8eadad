//! Core traits and types: store capabilities, key parsing, body decoding and errors

pub mod access;
pub mod decode;
pub mod error;
pub mod key;

pub use access::{DataAccess, Entity, Keyed, ParseKey};
pub use decode::{CreateRequest, DeleteOptions, Payload, decode_body, decode_optional_body};
pub use error::{KeyError, ResourceError, StoreError};
pub use key::{HeaderKey, KeyParser, KeySource, PathKey, StoreKey};
