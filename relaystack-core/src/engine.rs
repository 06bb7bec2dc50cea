//! Engine - trait abstracting the external provisioning engine
//!
//! The engine is the collaborator that turns Effects into real resource
//! operations. It is external to this project: implementations bind a plan
//! to whatever materializes it (a cloud deployment pipeline, a recorded
//! handoff, a test double). Provider-side rejections (quota, permissions,
//! naming conflicts) surface as `EngineError` and are reported, not retried.

use std::future::Future;
use std::pin::Pin;

use crate::resource::{PermissionGrant, Resource, ResourceId, State};

/// Error type for engine operations
#[derive(Debug)]
pub struct EngineError {
    pub message: String,
    pub resource_id: Option<ResourceId>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: ResourceId) -> Self {
        self.resource_id = Some(id);
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Return type for async operations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The provisioning engine boundary.
///
/// All operations are async and side-effecting. The plan's effect order
/// already encodes the dependency partial order; implementations may rely
/// on being called in that order.
pub trait Engine: Send + Sync {
    /// Name of this engine binding (e.g., "handoff")
    fn name(&self) -> &'static str;

    /// Get the current state of a resource.
    ///
    /// Returns `State::not_found()` if the resource does not exist.
    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, EngineResult<State>>;

    /// Create a resource, returning its state with the engine-assigned
    /// identifier set.
    fn create(&self, resource: &Resource) -> BoxFuture<'_, EngineResult<State>>;

    /// Reconcile an existing resource toward its desired attributes
    fn update(
        &self,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, EngineResult<State>>;

    /// Delete a resource
    fn delete(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, EngineResult<()>>;

    /// Extend the principal's execution identity with the granted capability,
    /// scoped to exactly the target resource.
    fn grant(&self, grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>>;

    /// Remove a previously granted capability
    fn revoke(&self, grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>>;
}

/// Engine implementation for Box<dyn Engine>, enabling dynamic dispatch
impl Engine for Box<dyn Engine> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, EngineResult<State>> {
        (**self).read(id, identifier)
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, EngineResult<State>> {
        (**self).create(resource)
    }

    fn update(
        &self,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, EngineResult<State>> {
        (**self).update(id, from, to)
    }

    fn delete(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, EngineResult<()>> {
        (**self).delete(id, identifier)
    }

    fn grant(&self, grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>> {
        (**self).grant(grant)
    }

    fn revoke(&self, grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>> {
        (**self).revoke(grant)
    }
}
