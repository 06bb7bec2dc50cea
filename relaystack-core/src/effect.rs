//! Effect - operations the provisioning engine performs during materialization
//!
//! Effects are values. Building a plan produces effects without executing
//! them; nothing touches the engine until the interpreter runs.

use crate::resource::{PermissionGrant, Resource, ResourceId, State};

/// A single operation against the provisioning engine
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Look up a data source (read-only, never mutates)
    Read(Resource),
    /// Create a resource that does not exist yet
    Create(Resource),
    /// Reconcile an existing resource toward its desired attributes
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
    },
    /// Delete a resource (only emitted when its removal policy allows it)
    Delete(ResourceId),
    /// Extend a principal's identity with a capability on a target
    Grant(PermissionGrant),
    /// Remove a previously granted capability
    Revoke(PermissionGrant),
}

impl Effect {
    /// Whether executing this effect changes infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    /// Short one-line description used in plan output
    pub fn describe(&self) -> String {
        match self {
            Effect::Read(r) => format!("? {}", r.id),
            Effect::Create(r) => format!("+ {}", r.id),
            Effect::Update { id, .. } => format!("~ {}", id),
            Effect::Delete(id) => format!("- {}", id),
            Effect::Grant(grant) => format!("> grant {}", grant),
            Effect::Revoke(grant) => format!("< revoke {}", grant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Access;

    #[test]
    fn read_is_not_mutating() {
        let effect = Effect::Read(Resource::new("certificate", "relay-cert"));
        assert!(!effect.is_mutating());
    }

    #[test]
    fn grant_is_mutating() {
        let effect = Effect::Grant(PermissionGrant::new(
            "relay-service",
            "flags-table",
            Access::ReadWrite,
        ));
        assert!(effect.is_mutating());
        assert!(effect.describe().contains("grant"));
    }
}
