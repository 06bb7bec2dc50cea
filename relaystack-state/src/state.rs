//! State file structures for persisting the materialized topology

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use relaystack_core::resource::{Access, PermissionGrant, ResourceId, State, Value};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental
    /// overwrites from another stack's state)
    pub lineage: String,
    /// Version of relaystack that last modified this state
    pub tool_version: String,
    /// All materialized resources and their recorded state
    pub resources: Vec<ResourceState>,
    /// All granted capabilities
    #[serde(default)]
    pub grants: Vec<GrantState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
            grants: Vec::new(),
        }
    }

    /// Create a new state file with a specific lineage
    pub fn with_lineage(lineage: String) -> Self {
        Self {
            lineage,
            ..Self::new()
        }
    }

    /// Increment serial and stamp the tool version for a new state write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Find a resource by kind and name
    pub fn find_resource(&self, kind: &str, name: &str) -> Option<&ResourceState> {
        self.resources
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Find a resource mutably by kind and name
    pub fn find_resource_mut(&mut self, kind: &str, name: &str) -> Option<&mut ResourceState> {
        self.resources
            .iter_mut()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Add or update a resource in the state
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        if let Some(existing) = self.find_resource_mut(&resource.kind, &resource.name) {
            *existing = resource;
        } else {
            self.resources.push(resource);
        }
    }

    /// Remove a resource from the state
    pub fn remove_resource(&mut self, kind: &str, name: &str) -> Option<ResourceState> {
        let pos = self
            .resources
            .iter()
            .position(|r| r.kind == kind && r.name == name)?;
        Some(self.resources.remove(pos))
    }

    /// Record a grant if an identical one is not already present
    pub fn upsert_grant(&mut self, grant: GrantState) {
        if !self.grants.contains(&grant) {
            self.grants.push(grant);
        }
    }

    /// Remove a recorded grant
    pub fn remove_grant(&mut self, principal: &str, target: &str) -> Option<GrantState> {
        let pos = self
            .grants
            .iter()
            .position(|g| g.principal == principal && g.target == target)?;
        Some(self.grants.remove(pos))
    }

    /// Recorded resource states keyed by resource id, in core form
    pub fn states_by_id(&self) -> HashMap<ResourceId, State> {
        self.resources
            .iter()
            .map(|r| (ResourceId::new(&r.kind, &r.name), r.to_state()))
            .collect()
    }

    /// Recorded grants in core form; entries with an unknown access level
    /// are skipped.
    pub fn recorded_grants(&self) -> Vec<PermissionGrant> {
        self.grants.iter().filter_map(GrantState::to_grant).collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Recorded state of a single materialized resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource kind (e.g., "network", "table")
    pub kind: String,
    /// Logical binding name within the topology
    pub name: String,
    /// Engine-assigned identifier
    pub identifier: Option<String>,
    /// All attributes of the resource as JSON values
    pub attributes: HashMap<String, serde_json::Value>,
    /// Removal policy recorded at materialization time
    #[serde(default = "default_removal_policy")]
    pub removal_policy: String,
}

fn default_removal_policy() -> String {
    "retain".to_string()
}

impl ResourceState {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            identifier: None,
            attributes: HashMap::new(),
            removal_policy: default_removal_policy(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_removal_policy(mut self, policy: impl Into<String>) -> Self {
        self.removal_policy = policy.into();
        self
    }

    /// Convert to the core state form used by the differ. Attributes that
    /// have no core representation (JSON null) are dropped.
    pub fn to_state(&self) -> State {
        let attributes: HashMap<String, Value> = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|value| (k.clone(), value)))
            .collect();

        let mut state = State::existing(ResourceId::new(&self.kind, &self.name), attributes);
        if let Some(identifier) = &self.identifier {
            state = state.with_identifier(identifier.clone());
        }
        state
    }
}

/// Recorded capability grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantState {
    pub principal: String,
    pub target: String,
    pub access: String,
}

impl GrantState {
    pub fn from_grant(grant: &PermissionGrant) -> Self {
        Self {
            principal: grant.principal.clone(),
            target: grant.target.clone(),
            access: grant.access.as_str().to_string(),
        }
    }

    pub fn to_grant(&self) -> Option<PermissionGrant> {
        let access: Access = self.access.parse().ok()?;
        Some(PermissionGrant::new(&self.principal, &self.target, access))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_file_new() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
        assert!(state.grants.is_empty());
    }

    #[test]
    fn state_file_with_lineage() {
        let state = StateFile::with_lineage("fixed-lineage".to_string());
        assert_eq!(state.lineage, "fixed-lineage");
        assert_eq!(state.serial, 0);
    }

    #[test]
    fn state_file_increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn state_file_upsert_resource() {
        let mut state = StateFile::new();

        let first = ResourceState::new("table", "flags-table")
            .with_attribute("table_name", serde_json::json!("ld-relay-flags"));
        state.upsert_resource(first);
        assert_eq!(state.resources.len(), 1);

        let updated = ResourceState::new("table", "flags-table")
            .with_attribute("table_name", serde_json::json!("other-flags"));
        state.upsert_resource(updated);
        assert_eq!(state.resources.len(), 1);
        assert_eq!(
            state.resources[0].attributes.get("table_name"),
            Some(&serde_json::json!("other-flags"))
        );
    }

    #[test]
    fn state_file_remove_resource() {
        let mut state = StateFile::new();
        state.upsert_resource(ResourceState::new("table", "flags-table"));

        assert!(state.remove_resource("table", "flags-table").is_some());
        assert!(state.resources.is_empty());
        assert!(state.remove_resource("table", "flags-table").is_none());
    }

    #[test]
    fn grants_deduplicate() {
        let mut state = StateFile::new();
        let grant = GrantState {
            principal: "relay-service".to_string(),
            target: "flags-table".to_string(),
            access: "read-write".to_string(),
        };
        state.upsert_grant(grant.clone());
        state.upsert_grant(grant);
        assert_eq!(state.grants.len(), 1);

        assert!(state.remove_grant("relay-service", "flags-table").is_some());
        assert!(state.grants.is_empty());
    }

    #[test]
    fn grant_round_trips_through_core_form() {
        let grant = PermissionGrant::new("relay-service", "flags-table", Access::ReadWrite);
        let recorded = GrantState::from_grant(&grant);
        assert_eq!(recorded.to_grant(), Some(grant));
    }

    #[test]
    fn resource_state_converts_to_core_state() {
        let recorded = ResourceState::new("table", "flags-table")
            .with_identifier("handoff:table/flags-table")
            .with_attribute("table_name", serde_json::json!("ld-relay-flags"))
            .with_attribute("billing_mode", serde_json::json!("pay_per_request"));

        let state = recorded.to_state();
        assert!(state.exists);
        assert_eq!(
            state.identifier.as_deref(),
            Some("handoff:table/flags-table")
        );
        assert_eq!(
            state.attributes.get("table_name"),
            Some(&Value::string("ld-relay-flags"))
        );
    }

    #[test]
    fn state_file_serialization() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("table", "flags-table")
                .with_attribute("table_name", serde_json::json!("ld-relay-flags"))
                .with_removal_policy("destroy"),
        );
        state.upsert_grant(GrantState {
            principal: "relay-service".to_string(),
            target: "flags-table".to_string(),
            access: "read-write".to_string(),
        });

        let json = serde_json::to_string_pretty(&state).unwrap();
        let deserialized: StateFile = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.version, state.version);
        assert_eq!(deserialized.lineage, state.lineage);
        assert_eq!(deserialized.resources.len(), 1);
        assert_eq!(deserialized.resources[0].removal_policy, "destroy");
        assert_eq!(deserialized.grants.len(), 1);
    }
}
