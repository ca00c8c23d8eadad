//! PostgreSQL storage backend using sqlx.
//!
//! Provides `PostgresStore<K, T>`, a [`DataAccess`] implementation backed by
//! a PostgreSQL database via `sqlx::PgPool`.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! keyed-rest = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! # Schema
//!
//! Each store owns one table holding the string form of the key and the
//! entity as a JSONB document:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS users (
//!     key  TEXT PRIMARY KEY,
//!     body JSONB NOT NULL
//! )
//! ```

use crate::core::{DataAccess, Keyed, ParseKey, StoreError, error::KeyError};
use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::PgPool;
use std::fmt::Display;
use std::marker::PhantomData;
use std::str::FromStr;

/// Generic data store backed by a PostgreSQL table
#[derive(Debug)]
pub struct PostgresStore<K, T> {
    pool: PgPool,
    table: String,
    _marker: PhantomData<fn() -> (K, T)>,
}

impl<K, T> Clone for PostgresStore<K, T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            table: self.table.clone(),
            _marker: PhantomData,
        }
    }
}

impl<K, T> PostgresStore<K, T> {
    /// Create a store over `table`
    ///
    /// The table name is interpolated into SQL, so only ASCII letters,
    /// digits and underscores are accepted.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        let valid = !table.is_empty()
            && !table.starts_with(|c: char| c.is_ascii_digit())
            && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            bail!("Invalid table name '{}'", table);
        }

        Ok(Self {
            pool,
            table,
            _marker: PhantomData,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the backing table (idempotent)
    ///
    /// Safe to call on every startup.
    pub async fn ensure_schema(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (key TEXT PRIMARY KEY, body JSONB NOT NULL)",
            self.table
        );

        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| anyhow!("Failed to create table {}: {}", self.table, e))?;

        Ok(())
    }

    fn encode(entity: &T) -> Result<serde_json::Value>
    where
        T: Serialize,
    {
        serde_json::to_value(entity).map_err(|e| anyhow!("Failed to encode entity: {}", e))
    }

    fn decode(body: serde_json::Value) -> Result<T>
    where
        T: DeserializeOwned,
    {
        serde_json::from_value(body).map_err(|e| StoreError::Corrupt(e.to_string()).into())
    }

    async fn fetch(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let sql = format!("SELECT body FROM {} WHERE key = $1", self.table);

        let row = sqlx::query_as::<_, (serde_json::Value,)>(&sql)
            .bind(key)
            .fetch_one(&self.pool)
            .await;

        match row {
            Ok((body,)) => Self::decode(body).map(Some),
            Err(sqlx::Error::RowNotFound) => Ok(None),
            Err(e) => Err(connection_error("Failed to read entity", e)),
        }
    }
}

/// Map a driver failure, keeping pool and I/O failures recognizable
fn connection_error(context: &str, err: sqlx::Error) -> anyhow::Error {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            StoreError::Connection(err.to_string()).into()
        }
        other => anyhow!("{}: {}", context, other),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl<K, T> DataAccess<K, T> for PostgresStore<K, T>
where
    K: Display + Send + Sync + 'static,
    T: Keyed<K> + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    async fn exists(&self, entity: &T) -> Result<bool> {
        let sql = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE key = $1)", self.table);

        let (found,) = sqlx::query_as::<_, (bool,)>(&sql)
            .bind(entity.key().to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| connection_error("Failed to check entity", e))?;

        Ok(found)
    }

    async fn create(&self, entity: T) -> Result<T> {
        let key = entity.key().to_string();
        let sql = format!("INSERT INTO {} (key, body) VALUES ($1, $2)", self.table);

        match sqlx::query(&sql)
            .bind(&key)
            .bind(Self::encode(&entity)?)
            .execute(&self.pool)
            .await
        {
            Ok(_) => Ok(entity),
            Err(e) if is_unique_violation(&e) => Err(StoreError::AlreadyExists { key }.into()),
            Err(e) => Err(connection_error("Failed to create entity", e)),
        }
    }

    async fn ensure(&self, entity: T) -> Result<T> {
        let key = entity.key().to_string();
        let sql = format!(
            "INSERT INTO {} (key, body) VALUES ($1, $2) ON CONFLICT (key) DO NOTHING",
            self.table
        );

        sqlx::query(&sql)
            .bind(&key)
            .bind(Self::encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| connection_error("Failed to ensure entity", e))?;

        self.fetch(&key)
            .await?
            .ok_or_else(|| anyhow!("Entity '{}' vanished after insert", key))
    }

    async fn read(&self, key: &K) -> Result<Option<T>> {
        self.fetch(&key.to_string()).await
    }

    async fn update(&self, key: &K, entity: T) -> Result<T> {
        let sql = format!(
            "INSERT INTO {} (key, body) VALUES ($1, $2) \
             ON CONFLICT (key) DO UPDATE SET body = EXCLUDED.body",
            self.table
        );

        sqlx::query(&sql)
            .bind(key.to_string())
            .bind(Self::encode(&entity)?)
            .execute(&self.pool)
            .await
            .map_err(|e| connection_error("Failed to update entity", e))?;

        Ok(entity)
    }

    async fn remove(&self, key: &K) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE key = $1", self.table);

        let result = sqlx::query(&sql)
            .bind(key.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| connection_error("Failed to delete entity", e))?;

        Ok(result.rows_affected() > 0)
    }
}

impl<K, T> ParseKey<K> for PostgresStore<K, T>
where
    K: FromStr,
    K::Err: Display,
{
    fn parse_key(&self, raw: &str) -> Result<K, KeyError> {
        raw.parse().map_err(|e: K::Err| KeyError::Invalid {
            name: format!("{} key", self.table),
            value: raw.to_string(),
            message: e.to_string(),
        })
    }
}
