//! Server module for exposing keyed resources over HTTP
//!
//! A [`Resource`] answers create, read, update and delete for one entity
//! type. Resources are collected in a [`ResourceRegistry`] and served by the
//! [`ServerBuilder`], which adds health routes and request tracing.

pub mod builder;
pub mod registry;
pub mod resource;
pub mod telemetry;

pub use builder::ServerBuilder;
pub use registry::{ResourceDescriptor, ResourceRegistry};
pub use resource::{PreExec, Resource, ResourceRoutes, Verb};
pub use telemetry::init_tracing;
