//! # keyed-rest
//!
//! Generic CRUD dispatch for keyed entities over axum.
//!
//! ## Features
//!
//! - **One dispatcher, any entity**: a [`Resource`](server::Resource) serves
//!   create, read, update and delete for any type implementing
//!   [`Keyed`](core::Keyed)
//! - **Pluggable stores**: anything implementing [`DataAccess`](core::DataAccess),
//!   with an in-memory store built in and PostgreSQL behind the `postgres` feature
//! - **Pluggable keys**: path placeholders, headers, closures, or the store itself
//! - **Uniform status codes**: 400 for bad input, 404 for absent entities,
//!   204 for deletes, 500 for store failures
//! - **Configuration-Based**: resources, bind address and logging from YAML
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use keyed_rest::prelude::*;
//! use keyed_rest::storage::InMemoryStore;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct User {
//!     name: String,
//! }
//!
//! impl Keyed<String> for User {
//!     fn key(&self) -> String {
//!         self.name.clone()
//!     }
//! }
//!
//! let users = Resource::new("users", InMemoryStore::<String, User>::new(), PathKey::new("name"));
//!
//! ServerBuilder::new()
//!     .register_resource(users, "/users", "/users/{name}")
//!     .serve()
//!     .await?;
//! ```

pub mod config;
pub mod core;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        DataAccess, Entity, HeaderKey, KeyError, KeyParser, KeySource, Keyed, ParseKey, PathKey,
        ResourceError, StoreError, StoreKey,
    };

    // === Server ===
    pub use crate::server::{
        PreExec, Resource, ResourceDescriptor, ServerBuilder, Verb, init_tracing,
    };

    // === Config ===
    pub use crate::config::{LogConfig, ResourceConfig, ServerConfig};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
    pub use serde::{Deserialize, Serialize};

    // === Axum ===
    pub use axum::Router;
}
