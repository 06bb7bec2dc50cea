//! Differ - compare the declared topology with recorded state to produce a Plan
//!
//! Reconciliation is idempotent: the same graph diffed against the state it
//! produced yields an empty plan. Deltas become Effects ordered so that the
//! dependency partial order always holds (resources in build order, grants
//! after every resource, revokes and deletes at the end).

use std::collections::HashMap;

use tracing::warn;

use crate::effect::Effect;
use crate::graph::{GraphError, ResourceGraph};
use crate::plan::Plan;
use crate::resource::{PermissionGrant, RemovalPolicy, Resource, ResourceId, State, Value};

/// Result of a diff operation for a single resource
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Data source -> needs a read-only lookup
    Read(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare a desired resource with its current state
pub fn diff(desired: &Resource, current: &State) -> Diff {
    if desired.is_data_source() {
        // Data sources are looked up, never reconciled.
        return if current.exists {
            Diff::NoChange(desired.id.clone())
        } else {
            Diff::Read(desired.clone())
        };
    }

    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes);

    if changed.is_empty() {
        Diff::NoChange(desired.id.clone())
    } else {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    }
}

/// Find desired attributes that differ from the current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        match current.get(key) {
            Some(current_value) if current_value == desired_value => {}
            _ => changed.push(key.clone()),
        }
    }

    changed.sort();
    changed
}

/// Compute the reconciliation plan for a graph against recorded state.
///
/// References are resolved before comparison, so a recorded state written
/// after a previous apply compares clean against the same declaration.
pub fn create_plan(
    graph: &ResourceGraph,
    current_states: &HashMap<ResourceId, State>,
    recorded_grants: &[PermissionGrant],
) -> Result<Plan, GraphError> {
    let mut plan = Plan::new();
    let desired = graph.resolved()?;

    for resource in &desired {
        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Read(r) => plan.add(Effect::Read(r)),
            Diff::Update { id, from, to, .. } => plan.add(Effect::Update { id, from, to }),
            Diff::NoChange(_) => {}
        }
    }

    // Grants come after every resource effect; both endpoints are
    // materialized before any capability is extended.
    for grant in graph.grants() {
        if !recorded_grants.contains(grant) {
            plan.add(Effect::Grant(grant.clone()));
        }
    }
    for grant in recorded_grants {
        if !graph.grants().contains(grant) {
            plan.add(Effect::Revoke(grant.clone()));
        }
    }

    // Recorded resources no longer declared are deleted last, after any
    // revokes that might reference them.
    let mut orphaned: Vec<&ResourceId> = current_states
        .keys()
        .filter(|id| graph.get(&id.name).is_none())
        .collect();
    orphaned.sort_by(|a, b| (&a.kind, &a.name).cmp(&(&b.kind, &b.name)));
    for id in orphaned {
        plan.add(Effect::Delete(id.clone()));
    }

    Ok(plan)
}

/// Compute the teardown plan: grants revoked first, then resources in the
/// reverse of the build order. Resources whose removal policy is `Retain`
/// are reported and skipped; data sources have nothing to tear down.
pub fn destroy_plan(
    graph: &ResourceGraph,
    current_states: &HashMap<ResourceId, State>,
    recorded_grants: &[PermissionGrant],
) -> Plan {
    let mut plan = Plan::new();

    for grant in recorded_grants {
        plan.add(Effect::Revoke(grant.clone()));
    }

    for resource in graph.destroy_order() {
        if resource.is_data_source() {
            continue;
        }
        let exists = current_states
            .get(&resource.id)
            .map(|s| s.exists)
            .unwrap_or(false);
        if !exists {
            continue;
        }
        if resource.removal == RemovalPolicy::Retain {
            warn!(resource = %resource.id, "removal policy is retain; leaving in place");
            continue;
        }
        plan.add(Effect::Delete(resource.id.clone()));
    }

    plan
}
