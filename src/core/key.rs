//! Key extraction from requests
//!
//! A [`KeyParser`] turns a request into the typed key of a resource. It is
//! decoupled from the store so that keys can come from any part of the
//! request: a path placeholder ([`PathKey`]), a header ([`HeaderKey`]), a
//! closure, or the store itself ([`StoreKey`]).

use axum::http::HeaderMap;
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::access::ParseKey;
use crate::core::error::KeyError;

/// The parts of a request a key can be read from
#[derive(Debug, Clone, Copy)]
pub struct KeySource<'a> {
    params: &'a HashMap<String, String>,
    headers: &'a HeaderMap,
}

impl<'a> KeySource<'a> {
    pub fn new(params: &'a HashMap<String, String>, headers: &'a HeaderMap) -> Self {
        Self { params, headers }
    }

    /// Get a named path parameter
    pub fn param(&self, name: &str) -> Result<&'a str, KeyError> {
        self.params
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| KeyError::MissingParameter(name.to_string()))
    }

    /// Get a header value as UTF-8
    pub fn header(&self, name: &str) -> Result<&'a str, KeyError> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| KeyError::MissingHeader(name.to_string()))
    }
}

/// Yields the typed key of a resource from a request
pub trait KeyParser<K>: Send + Sync {
    fn parse_key(&self, source: &KeySource<'_>) -> Result<K, KeyError>;
}

impl<K, F> KeyParser<K> for F
where
    F: Fn(&KeySource<'_>) -> Result<K, KeyError> + Send + Sync,
{
    fn parse_key(&self, source: &KeySource<'_>) -> Result<K, KeyError> {
        self(source)
    }
}

/// Convert a raw string into `K` with `FromStr`
fn convert<K>(name: &str, raw: &str) -> Result<K, KeyError>
where
    K: FromStr,
    K::Err: Display,
{
    raw.parse::<K>().map_err(|e| KeyError::Invalid {
        name: name.to_string(),
        value: raw.to_string(),
        message: e.to_string(),
    })
}

/// Key read from a named path placeholder, e.g. `{id}`
///
/// `PathKey::<String>::new("name")` hands the segment through untouched and
/// only fails when the placeholder is missing from the route.
#[derive(Debug, Clone)]
pub struct PathKey<K> {
    param: String,
    _marker: PhantomData<fn() -> K>,
}

impl<K> PathKey<K> {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            _marker: PhantomData,
        }
    }

    /// Name of the path placeholder
    pub fn param(&self) -> &str {
        &self.param
    }
}

impl<K> KeyParser<K> for PathKey<K>
where
    K: FromStr,
    K::Err: Display,
{
    fn parse_key(&self, source: &KeySource<'_>) -> Result<K, KeyError> {
        let raw = source.param(&self.param)?;
        convert(&self.param, raw)
    }
}

/// Key read from a request header
#[derive(Debug, Clone)]
pub struct HeaderKey<K> {
    header: String,
    _marker: PhantomData<fn() -> K>,
}

impl<K> HeaderKey<K> {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            _marker: PhantomData,
        }
    }
}

impl<K> KeyParser<K> for HeaderKey<K>
where
    K: FromStr,
    K::Err: Display,
{
    fn parse_key(&self, source: &KeySource<'_>) -> Result<K, KeyError> {
        let raw = source.header(&self.header)?;
        convert(&self.header, raw)
    }
}

/// Key parsing delegated to the store
///
/// Reads the raw path parameter and lets a [`ParseKey`] implementation
/// (usually the resource's own store) convert it.
pub struct StoreKey<K> {
    param: String,
    store: Arc<dyn ParseKey<K>>,
}

impl<K> StoreKey<K> {
    pub fn new(param: impl Into<String>, store: Arc<dyn ParseKey<K>>) -> Self {
        Self {
            param: param.into(),
            store,
        }
    }
}

impl<K> KeyParser<K> for StoreKey<K> {
    fn parse_key(&self, source: &KeySource<'_>) -> Result<K, KeyError> {
        let raw = source.param(&self.param)?;
        self.store.parse_key(raw)
    }
}
