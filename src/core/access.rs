//! Data access traits: the pluggable store contract behind a resource

use anyhow::Result;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use crate::core::error::KeyError;

/// Capability trait for entities addressable by a key of type `K`
///
/// This is the only structural requirement the dispatcher puts on an entity,
/// beyond being serializable.
///
/// ```rust,ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct User {
///     name: String,
/// }
///
/// impl Keyed<String> for User {
///     fn key(&self) -> String {
///         self.name.clone()
///     }
/// }
/// ```
pub trait Keyed<K> {
    /// Derive the key identifying this entity in its store
    fn key(&self) -> K;
}

/// Marker for types that can be served as a resource
pub trait Entity<K>: Keyed<K> + Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<K, T> Entity<K> for T where T: Keyed<K> + Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Store contract for entities of type `T` keyed by `K`
///
/// Implementations are shared across all concurrent requests of a resource
/// and own their synchronization. Errors are terminal for the request; use
/// [`StoreError`](crate::core::StoreError) for failures the dispatcher should
/// be able to tell apart.
#[async_trait]
pub trait DataAccess<K, T>: Send + Sync {
    /// Whether an entity with the same identity as `entity` is stored
    async fn exists(&self, entity: &T) -> Result<bool>;

    /// Store a new entity, failing if its key is already taken
    async fn create(&self, entity: T) -> Result<T>;

    /// Store the entity if its key is free, otherwise return the stored one
    async fn ensure(&self, entity: T) -> Result<T>;

    /// Get an entity by key, `None` when absent
    async fn read(&self, key: &K) -> Result<Option<T>>;

    /// Overwrite the entity stored at `key`
    ///
    /// This does not check that `key` is present; callers wanting
    /// update-must-not-create semantics check [`exists`](Self::exists) first.
    async fn update(&self, key: &K, entity: T) -> Result<T>;

    /// Remove the entity at `key`, reporting whether it was present
    async fn remove(&self, key: &K) -> Result<bool>;
}

/// Stores that know how to turn the raw request string into their key type
///
/// Plugged into a resource through [`StoreKey`](crate::core::key::StoreKey).
pub trait ParseKey<K>: Send + Sync {
    fn parse_key(&self, raw: &str) -> Result<K, KeyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Sensor {
        serial: u32,
        label: String,
    }

    impl Keyed<u32> for Sensor {
        fn key(&self) -> u32 {
            self.serial
        }
    }

    fn assert_entity<K, T: Entity<K>>() {}

    #[test]
    fn test_keyed_types_are_entities() {
        assert_entity::<u32, Sensor>();
    }

    #[test]
    fn test_key_derived_from_entity() {
        let sensor = Sensor {
            serial: 42,
            label: "kitchen".to_string(),
        };
        assert_eq!(sensor.key(), 42);
    }

    // The trait can be used behind a pointer in generic contexts
    #[allow(dead_code)]
    async fn generic_read<S>(store: &S, key: u32) -> Result<Option<Sensor>>
    where
        S: DataAccess<u32, Sensor> + ?Sized,
    {
        store.read(&key).await
    }
}
