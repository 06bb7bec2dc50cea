//! Handoff engine
//!
//! The provisioning engine itself is external; this binding materializes a
//! plan by recording what was handed off and assigning deterministic
//! placeholder identifiers. Applying through it keeps recorded state in
//! step with the declared graph while the real engine consumes the
//! manifest out-of-band.

use std::sync::{Mutex, PoisonError};

use relaystack_core::engine::{BoxFuture, Engine, EngineResult};
use relaystack_core::resource::{PermissionGrant, Resource, ResourceId, State};

/// Engine binding that records the handoff instead of calling cloud APIs
#[derive(Default)]
pub struct HandoffEngine {
    log: Mutex<Vec<String>>,
}

impl HandoffEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations recorded so far, in execution order
    pub fn applied(&self) -> Vec<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<String>> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, entry: String) {
        self.lock().push(entry);
    }
}

fn placeholder(id: &ResourceId) -> String {
    format!("handoff:{}/{}", id.kind, id.name)
}

impl Engine for HandoffEngine {
    fn name(&self) -> &'static str {
        "handoff"
    }

    fn read(
        &self,
        id: &ResourceId,
        _identifier: Option<&str>,
    ) -> BoxFuture<'_, EngineResult<State>> {
        let state = State::existing(id.clone(), Default::default())
            .with_identifier(placeholder(id));
        self.record(format!("read {}", id));
        Box::pin(async move { Ok(state) })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, EngineResult<State>> {
        let state = State::existing(resource.id.clone(), resource.attributes.clone())
            .with_identifier(placeholder(&resource.id));
        self.record(format!("create {}", resource.id));
        Box::pin(async move { Ok(state) })
    }

    fn update(
        &self,
        id: &ResourceId,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, EngineResult<State>> {
        let identifier = from
            .identifier
            .clone()
            .unwrap_or_else(|| placeholder(id));
        let state = State::existing(id.clone(), to.attributes.clone()).with_identifier(identifier);
        self.record(format!("update {}", id));
        Box::pin(async move { Ok(state) })
    }

    fn delete(
        &self,
        id: &ResourceId,
        _identifier: Option<&str>,
    ) -> BoxFuture<'_, EngineResult<()>> {
        self.record(format!("delete {}", id));
        Box::pin(async { Ok(()) })
    }

    fn grant(&self, grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>> {
        self.record(format!("grant {}", grant));
        Box::pin(async { Ok(()) })
    }

    fn revoke(&self, grant: &PermissionGrant) -> BoxFuture<'_, EngineResult<()>> {
        self.record(format!("revoke {}", grant));
        Box::pin(async { Ok(()) })
    }
}
