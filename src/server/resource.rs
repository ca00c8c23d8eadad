//! Generic CRUD dispatch for a keyed entity
//!
//! A [`Resource`] binds a [`DataAccess`] store, a [`KeyParser`] and an optional
//! [`PreExec`] hook into four axum handlers. Every verb runs the same pipeline:
//!
//! ```text
//! decode body -> parse key -> pre-exec hook -> store call -> respond
//! ```
//!
//! and every store outcome goes through [`Resource::respond`], so the status
//! code policy is the same for all verbs:
//!
//! | outcome                        | response                    |
//! |--------------------------------|-----------------------------|
//! | store error                    | 500, error text             |
//! | duplicate, conflicts enabled   | 409, error text             |
//! | nothing found                  | 404, empty                  |
//! | success on DELETE              | 204, empty                  |
//! | success on other verbs         | 200, JSON entity            |
//! | entity fails to serialize      | 500, serialization error    |
//!
//! Decode and key failures answer 400 before the store is touched. On Update
//! the payload must identify the entity addressed by the request key once the
//! hook has run; a mismatch is a key failure.

use axum::{
    Router,
    extract::{FromRequestParts, Path, Request, State, rejection::PathRejection},
    http::{StatusCode, header, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;
use std::sync::Arc;

use crate::config::ResourceConfig;
use crate::core::decode::{
    CreateRequest, DeleteOptions, Payload, decode_body, decode_optional_body,
};
use crate::core::error::{KeyError, ResourceError, StoreError};
use crate::core::key::{KeyParser, KeySource, PathKey};
use crate::core::{DataAccess, Entity, Keyed};
use crate::server::registry::ResourceDescriptor;

/// The four verbs a resource answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Delete => "delete",
        }
    }
}

impl Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hook run on the decoded payload right before it reaches the store
///
/// Runs on Create (no key) and Update (with the parsed key), e.g. to inject
/// the path key or derived fields into the entity.
pub trait PreExec<K, T>: Send + Sync {
    fn apply(&self, verb: Verb, key: Option<&K>, entity: &mut T);
}

impl<K, T, F> PreExec<K, T> for F
where
    F: Fn(Verb, Option<&K>, &mut T) + Send + Sync,
{
    fn apply(&self, verb: Verb, key: Option<&K>, entity: &mut T) {
        self(verb, key, entity)
    }
}

/// A keyed entity type bound to its store, exposed over HTTP
///
/// Built once at route registration and shared read-only by all requests.
///
/// # Example
///
/// ```rust,ignore
/// let users = Resource::new("users", InMemoryStore::<String, User>::new(), PathKey::new("name"))
///     .with_pre_exec(|_verb, key: Option<&String>, user: &mut User| {
///         if let Some(name) = key {
///             user.name = name.clone();
///         }
///     });
///
/// let app = users.into_router("/users", "/users/{name}");
/// ```
pub struct Resource<K, T> {
    name: String,
    store: Arc<dyn DataAccess<K, T>>,
    key_parser: Arc<dyn KeyParser<K>>,
    pre_exec: Option<Arc<dyn PreExec<K, T>>>,
    update_requires_existing: bool,
    conflict_on_duplicate: bool,
}

impl<K, T> Resource<K, T>
where
    K: PartialEq + Debug + Send + Sync + 'static,
    T: Entity<K>,
{
    /// Bind `store` and `key_parser` under `name`
    pub fn new(
        name: impl Into<String>,
        store: impl DataAccess<K, T> + 'static,
        key_parser: impl KeyParser<K> + 'static,
    ) -> Self {
        Self::with_store(name, Arc::new(store), key_parser)
    }

    /// Bind an already shared store
    ///
    /// Use this when the store also owns key parsing through
    /// [`StoreKey`](crate::core::key::StoreKey).
    pub fn with_store(
        name: impl Into<String>,
        store: Arc<dyn DataAccess<K, T>>,
        key_parser: impl KeyParser<K> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            store,
            key_parser: Arc::new(key_parser),
            pre_exec: None,
            update_requires_existing: true,
            conflict_on_duplicate: false,
        }
    }

    /// Set the hook run on Create and Update payloads
    pub fn with_pre_exec(mut self, hook: impl PreExec<K, T> + 'static) -> Self {
        self.pre_exec = Some(Arc::new(hook));
        self
    }

    /// Answer 404 on Update when the entity does not exist (default: true)
    ///
    /// When disabled, Update writes unconditionally and may create.
    pub fn update_requires_existing(mut self, enabled: bool) -> Self {
        self.update_requires_existing = enabled;
        self
    }

    /// Answer 409 instead of 500 on duplicate Create (default: false)
    pub fn conflict_on_duplicate(mut self, enabled: bool) -> Self {
        self.conflict_on_duplicate = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build the routes of this resource
    ///
    /// - `POST {collection_path}` creates
    /// - `GET {item_path}` reads
    /// - `PUT {item_path}` updates
    /// - `DELETE {item_path}` deletes
    pub fn routes(self: &Arc<Self>, collection_path: &str, item_path: &str) -> Router {
        Router::new()
            .route(collection_path, post(Self::create))
            .route(
                item_path,
                get(Self::read).put(Self::update).delete(Self::delete),
            )
            .with_state(Arc::clone(self))
    }

    /// Consume the resource into its router
    pub fn into_router(self, collection_path: &str, item_path: &str) -> Router {
        Arc::new(self).routes(collection_path, item_path)
    }

    /// Wrap the resource with its paths for a [`ResourceRegistry`](crate::server::ResourceRegistry)
    pub fn mount(
        self,
        collection_path: impl Into<String>,
        item_path: impl Into<String>,
    ) -> ResourceRoutes<K, T> {
        ResourceRoutes {
            resource: Arc::new(self),
            collection_path: collection_path.into(),
            item_path: item_path.into(),
        }
    }

    // === Handlers ===

    /// POST: decode entity and `useExisting`, hook, then ensure or create
    pub async fn create(
        State(resource): State<Arc<Self>>,
        payload: Result<Payload<CreateRequest<T>>, ResourceError>,
    ) -> Response {
        match payload {
            Ok(Payload(request)) => resource.handle_create(request).await,
            Err(err) => resource.reject(Verb::Create, err),
        }
    }

    /// GET: parse key, then read
    pub async fn read(State(resource): State<Arc<Self>>, request: Request) -> Response {
        match resource.handle_read(request).await {
            Ok(response) => response,
            Err(err) => resource.reject(Verb::Read, err),
        }
    }

    /// PUT: decode entity, parse key, hook, key match, optional existence check, then update
    pub async fn update(State(resource): State<Arc<Self>>, request: Request) -> Response {
        match resource.handle_update(request).await {
            Ok(response) => response,
            Err(err) => resource.reject(Verb::Update, err),
        }
    }

    /// DELETE: decode `skipDestroy`, parse key, then remove
    pub async fn delete(State(resource): State<Arc<Self>>, request: Request) -> Response {
        match resource.handle_delete(request).await {
            Ok(response) => response,
            Err(err) => resource.reject(Verb::Delete, err),
        }
    }

    async fn handle_create(&self, request: CreateRequest<T>) -> Response {
        let CreateRequest {
            mut entity,
            use_existing,
        } = request;

        self.run_pre_exec(Verb::Create, None, &mut entity);

        tracing::debug!(resource = %self.name, use_existing, "creating entity");
        let outcome = if use_existing {
            self.store.ensure(entity).await
        } else {
            self.store.create(entity).await
        };

        self.respond(Verb::Create, outcome.map(Some))
    }

    async fn handle_read(&self, request: Request) -> Result<Response, ResourceError> {
        let (mut parts, _body) = request.into_parts();
        let key = self.parse_key(&mut parts).await?;

        tracing::debug!(resource = %self.name, key = ?key, "reading entity");
        let outcome = self.store.read(&key).await;

        Ok(self.respond(Verb::Read, outcome))
    }

    async fn handle_update(&self, mut request: Request) -> Result<Response, ResourceError> {
        let mut entity = decode_body::<T>(&mut request).await?;
        let (mut parts, _body) = request.into_parts();
        let key = self.parse_key(&mut parts).await?;

        self.run_pre_exec(Verb::Update, Some(&key), &mut entity);

        let payload_key = entity.key();
        if payload_key != key {
            return Err(KeyError::Mismatch {
                request: format!("{:?}", key),
                payload: format!("{:?}", payload_key),
            }
            .into());
        }

        tracing::debug!(resource = %self.name, key = ?key, "updating entity");
        let outcome = self.update_existing(&key, entity).await;

        Ok(self.respond(Verb::Update, outcome))
    }

    async fn handle_delete(&self, mut request: Request) -> Result<Response, ResourceError> {
        let options = decode_optional_body::<DeleteOptions>(&mut request).await?;
        if options.skip_destroy {
            tracing::debug!(resource = %self.name, "skipping destroy");
            return Ok(self.respond(Verb::Delete, Ok(Some(()))));
        }

        let (mut parts, _body) = request.into_parts();
        let key = self.parse_key(&mut parts).await?;

        tracing::debug!(resource = %self.name, key = ?key, "removing entity");
        let outcome = self.store.remove(&key).await;

        Ok(self.respond(Verb::Delete, outcome.map(|existed| existed.then_some(()))))
    }

    /// `entity` is known to carry `key`, so `exists` checks the addressed entity
    async fn update_existing(&self, key: &K, entity: T) -> anyhow::Result<Option<T>> {
        if self.update_requires_existing && !self.store.exists(&entity).await? {
            return Ok(None);
        }

        self.store.update(key, entity).await.map(Some)
    }

    fn run_pre_exec(&self, verb: Verb, key: Option<&K>, entity: &mut T) {
        if let Some(hook) = &self.pre_exec {
            hook.apply(verb, key, entity);
        }
    }

    async fn parse_key(&self, parts: &mut Parts) -> Result<K, ResourceError> {
        let params = match Path::<HashMap<String, String>>::from_request_parts(parts, &()).await {
            Ok(Path(params)) => params,
            Err(PathRejection::MissingPathParams(_)) => HashMap::new(),
            Err(rejection) => return Err(KeyError::MalformedPath(rejection.body_text()).into()),
        };

        let source = KeySource::new(&params, &parts.headers);
        Ok(self.key_parser.parse_key(&source)?)
    }

    /// Map a store outcome to the HTTP response
    ///
    /// Shared by all verbs. `None` means not found.
    pub fn respond<R>(&self, verb: Verb, outcome: anyhow::Result<Option<R>>) -> Response
    where
        R: Serialize,
    {
        let result = match outcome {
            Err(err) if self.conflict_on_duplicate && StoreError::is_already_exists(&err) => {
                Err(ResourceError::Conflict(err.to_string()))
            }
            Err(err) => Err(ResourceError::Backend(err)),
            Ok(None) => Err(ResourceError::NotFound),
            Ok(Some(_)) if verb == Verb::Delete => Ok(StatusCode::NO_CONTENT.into_response()),
            Ok(Some(value)) => serde_json::to_vec(&value)
                .map(|body| {
                    (
                        StatusCode::OK,
                        [(header::CONTENT_TYPE, "application/json")],
                        body,
                    )
                        .into_response()
                })
                .map_err(ResourceError::from),
        };

        match result {
            Ok(response) => response,
            Err(err) => self.reject(verb, err),
        }
    }

    fn reject(&self, verb: Verb, err: ResourceError) -> Response {
        if err.is_client_error() {
            tracing::debug!(
                resource = %self.name,
                verb = %verb,
                code = err.error_code(),
                error = %err,
                "request rejected"
            );
        } else {
            tracing::error!(
                resource = %self.name,
                verb = %verb,
                code = err.error_code(),
                error = %err,
                "request failed"
            );
        }

        err.into_response()
    }
}

impl<K, T> Resource<K, T>
where
    K: FromStr + PartialEq + Debug + Send + Sync + 'static,
    K::Err: Display,
    T: Entity<K>,
{
    /// Build a resource from its configuration, keyed by the configured path parameter
    pub fn from_config(config: &ResourceConfig, store: impl DataAccess<K, T> + 'static) -> Self {
        Self::new(
            config.name.clone(),
            store,
            PathKey::<K>::new(config.key_param.clone()),
        )
        .update_requires_existing(config.update_requires_existing)
        .conflict_on_duplicate(config.conflict_on_duplicate)
    }
}

/// A resource together with the paths it is served on
pub struct ResourceRoutes<K, T> {
    resource: Arc<Resource<K, T>>,
    collection_path: String,
    item_path: String,
}

impl<K, T> ResourceDescriptor for ResourceRoutes<K, T>
where
    K: PartialEq + Debug + Send + Sync + 'static,
    T: Entity<K>,
{
    fn name(&self) -> &str {
        self.resource.name()
    }

    fn build_routes(&self) -> Router {
        self.resource
            .routes(&self.collection_path, &self.item_path)
    }
}
