//! Resource registry for collecting resource route families

use axum::Router;
use std::collections::HashMap;

/// Trait that describes how to build routes for a resource
///
/// [`ResourceRoutes`](crate::server::ResourceRoutes) implements it for any
/// [`Resource`](crate::server::Resource); implement it directly for route
/// families that are not built from a `Resource`.
pub trait ResourceDescriptor: Send + Sync {
    /// The resource name (e.g., "users")
    fn name(&self) -> &str;

    /// Build the routes for this resource
    fn build_routes(&self) -> Router;
}

/// Registry for all resources in the application
#[derive(Default)]
pub struct ResourceRegistry {
    descriptors: HashMap<String, Box<dyn ResourceDescriptor>>,
}

impl ResourceRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            descriptors: HashMap::new(),
        }
    }

    /// Register a resource descriptor
    ///
    /// The resource name is used as the key; registering a name twice
    /// replaces the earlier descriptor.
    pub fn register(&mut self, descriptor: Box<dyn ResourceDescriptor>) {
        let name = descriptor.name().to_string();
        if self.descriptors.insert(name.clone(), descriptor).is_some() {
            tracing::warn!(resource = %name, "resource registered twice, replacing");
        }
    }

    /// Build a router with all registered resource routes
    pub fn build_routes(&self) -> Router {
        let mut router = Router::new();

        for descriptor in self.descriptors.values() {
            router = router.merge(descriptor.build_routes());
        }

        router
    }

    /// Get all registered resource names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.descriptors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}
