//! In-memory implementation of DataAccess for testing and development

use crate::core::{DataAccess, Keyed, ParseKey, StoreError, error::KeyError};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

/// In-memory data store
///
/// `InMemoryStore::default()` is immediately usable. Clones share the same
/// map, so a clone kept by a test sees what the resource wrote. Uses RwLock
/// for thread-safe access; check-and-insert runs under a single write lock.
pub struct InMemoryStore<K, T> {
    entities: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> InMemoryStore<K, T> {
    /// Create a new empty store
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored entities
    pub fn len(&self) -> usize {
        match self.entities.read() {
            Ok(map) => map.len(),
            // a panicked writer leaves the map itself intact
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, T> Clone for InMemoryStore<K, T> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
        }
    }
}

impl<K, T> Default for InMemoryStore<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, T> DataAccess<K, T> for InMemoryStore<K, T>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    T: Keyed<K> + Clone + Send + Sync + 'static,
{
    async fn exists(&self, entity: &T) -> Result<bool> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.contains_key(&entity.key()))
    }

    async fn create(&self, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let key = entity.key();
        if entities.contains_key(&key) {
            return Err(StoreError::AlreadyExists {
                key: format!("{:?}", key),
            }
            .into());
        }

        entities.insert(key, entity.clone());

        Ok(entity)
    }

    async fn ensure(&self, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        let stored = entities.entry(entity.key()).or_insert(entity);

        Ok(stored.clone())
    }

    async fn read(&self, key: &K) -> Result<Option<T>> {
        let entities = self
            .entities
            .read()
            .map_err(|e| anyhow!("Failed to acquire read lock: {}", e))?;

        Ok(entities.get(key).cloned())
    }

    async fn update(&self, key: &K, entity: T) -> Result<T> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        entities.insert(key.clone(), entity.clone());

        Ok(entity)
    }

    async fn remove(&self, key: &K) -> Result<bool> {
        let mut entities = self
            .entities
            .write()
            .map_err(|e| anyhow!("Failed to acquire write lock: {}", e))?;

        Ok(entities.remove(key).is_some())
    }
}

impl<K, T> ParseKey<K> for InMemoryStore<K, T>
where
    K: FromStr + Send + Sync,
    K::Err: Display,
    T: Send + Sync,
{
    fn parse_key(&self, raw: &str) -> Result<K, KeyError> {
        raw.parse().map_err(|e: K::Err| KeyError::Invalid {
            name: "key".to_string(),
            value: raw.to_string(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        name: String,
        #[serde(default)]
        email: String,
    }

    impl Keyed<String> for User {
        fn key(&self) -> String {
            self.name.clone()
        }
    }

    fn user(name: &str, email: &str) -> User {
        User {
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[tokio::test]
    async fn test_default_store_is_usable() {
        let store = InMemoryStore::<String, User>::default();

        assert!(store.is_empty());
        assert_eq!(store.read(&"brad".to_string()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_and_read() {
        let store = InMemoryStore::<String, User>::new();

        let created = store.create(user("brad", "b@x.io")).await.unwrap();
        assert_eq!(created, user("brad", "b@x.io"));

        let read = store.read(&"brad".to_string()).await.unwrap();
        assert_eq!(read, Some(user("brad", "b@x.io")));
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let store = InMemoryStore::<String, User>::new();
        store.create(user("brad", "")).await.unwrap();

        let err = store.create(user("brad", "other")).await.unwrap_err();

        assert!(StoreError::is_already_exists(&err));
        assert!(err.to_string().contains("exists"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_returns_existing_unchanged() {
        let store = InMemoryStore::<String, User>::new();
        store.create(user("brad", "first")).await.unwrap();

        let ensured = store.ensure(user("brad", "second")).await.unwrap();

        assert_eq!(ensured.email, "first");
        let read = store.read(&"brad".to_string()).await.unwrap().unwrap();
        assert_eq!(read.email, "first");
    }

    #[tokio::test]
    async fn test_ensure_creates_when_absent() {
        let store = InMemoryStore::<String, User>::new();

        let ensured = store.ensure(user("ana", "a@x.io")).await.unwrap();

        assert_eq!(ensured, user("ana", "a@x.io"));
        assert!(store.exists(&user("ana", "")).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_overwrites() {
        let store = InMemoryStore::<String, User>::new();
        store.create(user("brad", "old")).await.unwrap();

        store
            .update(&"brad".to_string(), user("brad", "new"))
            .await
            .unwrap();

        let read = store.read(&"brad".to_string()).await.unwrap().unwrap();
        assert_eq!(read.email, "new");
    }

    #[tokio::test]
    async fn test_drop_reports_presence() {
        let store = InMemoryStore::<String, User>::new();
        store.create(user("brad", "")).await.unwrap();

        assert!(store.remove(&"brad".to_string()).await.unwrap());
        assert!(!store.remove(&"brad".to_string()).await.unwrap());
        assert!(!store.exists(&user("brad", "")).await.unwrap());
    }

    #[tokio::test]
    async fn test_clones_share_entities() {
        let store = InMemoryStore::<String, User>::new();
        let observer = store.clone();

        store.create(user("brad", "")).await.unwrap();

        assert_eq!(observer.len(), 1);
    }

    #[tokio::test]
    async fn test_len_counts_entities_after_poisoned_lock() {
        let store = InMemoryStore::<String, User>::new();
        store.create(user("brad", "")).await.unwrap();

        let entities = Arc::clone(&store.entities);
        let writer = std::thread::spawn(move || {
            let _guard = entities.write().unwrap();
            panic!("writer died holding the lock");
        });
        assert!(writer.join().is_err());

        assert!(store.entities.is_poisoned());
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
    }

    #[test]
    fn test_parse_key_from_str() {
        let store = InMemoryStore::<u64, u64>::new();

        assert_eq!(ParseKey::parse_key(&store, "7").unwrap(), 7);
        assert!(ParseKey::parse_key(&store, "seven").is_err());
    }
}
