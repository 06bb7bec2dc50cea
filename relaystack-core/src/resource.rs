//! Resource - deployment-time resource descriptors and engine-reported state

use std::collections::HashMap;

/// Unique identifier for a node in the topology
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    /// Resource kind (e.g., "network", "table", "service")
    pub kind: String,
    /// Logical name within the topology
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// What happens to a resource when its topology is torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemovalPolicy {
    /// Leave the underlying resource in place on destroy
    #[default]
    Retain,
    /// Delete the underlying resource on destroy (data loss for stores)
    Destroy,
}

impl RemovalPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalPolicy::Retain => "retain",
            RemovalPolicy::Destroy => "destroy",
        }
    }
}

impl std::str::FromStr for RemovalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retain" => Ok(RemovalPolicy::Retain),
            "destroy" => Ok(RemovalPolicy::Destroy),
            other => Err(format!("unknown removal policy '{}'", other)),
        }
    }
}

/// Attribute value of a resource descriptor
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another resource's attribute (binding name, attribute
    /// name). References produce dependency edges and are resolved against
    /// the graph before the descriptor leaves the builder.
    Ref {
        binding: String,
        attribute: String,
    },
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    pub fn reference(binding: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::Ref {
            binding: binding.into(),
            attribute: attribute.into(),
        }
    }

    /// Collect every reference reachable from this value, including nested
    /// lists and maps.
    pub fn collect_refs<'a>(&'a self, out: &mut Vec<(&'a str, &'a str)>) {
        match self {
            Value::Ref { binding, attribute } => out.push((binding, attribute)),
            Value::List(items) => {
                for item in items {
                    item.collect_refs(out);
                }
            }
            Value::Map(map) => {
                for value in map.values() {
                    value.collect_refs(out);
                }
            }
            _ => {}
        }
    }

    /// Convert to a JSON value. References must be resolved first; an
    /// unresolved reference renders as `${binding.attribute}` so it is
    /// visible rather than silently dropped.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => {
                let mut object = serde_json::Map::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    object.insert(key.clone(), map[key].to_json());
                }
                serde_json::Value::Object(object)
            }
            Value::Ref { binding, attribute } => {
                serde_json::Value::String(format!("${{{}.{}}}", binding, attribute))
            }
        }
    }

    /// Convert from a JSON value (used when loading recorded state).
    pub fn from_json(value: &serde_json::Value) -> Option<Value> {
        match value {
            serde_json::Value::String(s) => Some(Value::String(s.clone())),
            serde_json::Value::Number(n) => n.as_i64().map(Value::Int),
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Array(items) => {
                let converted: Option<Vec<Value>> = items.iter().map(Value::from_json).collect();
                converted.map(Value::List)
            }
            serde_json::Value::Object(object) => {
                let mut map = HashMap::new();
                for (key, value) in object {
                    map.insert(key.clone(), Value::from_json(value)?);
                }
                Some(Value::Map(map))
            }
            serde_json::Value::Null => None,
        }
    }
}

/// Desired state of a single resource, declared by the topology builder
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub attributes: HashMap<String, Value>,
    /// If true, this is a data source (read-only lookup) that is never
    /// created or modified, only read.
    pub read_only: bool,
    /// Behavior when the topology is destroyed.
    pub removal: RemovalPolicy,
}

impl Resource {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(kind, name),
            attributes: HashMap::new(),
            read_only: false,
            removal: RemovalPolicy::default(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_removal(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    /// Returns true if this resource is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// Current state of a resource as reported by the provisioning engine
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub id: ResourceId,
    /// Engine-side identifier (e.g., vpc-xxx), assigned at materialization
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether this state exists
    pub exists: bool,
}

impl State {
    pub fn not_found(id: ResourceId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: ResourceId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}

/// Access level carried by a permission grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
    ReadWrite,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Read => "read",
            Access::Write => "write",
            Access::ReadWrite => "read-write",
        }
    }
}

impl std::str::FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Access::Read),
            "write" => Ok(Access::Write),
            "read-write" => Ok(Access::ReadWrite),
            other => Err(format!("unknown access level '{}'", other)),
        }
    }
}

/// A capability edge from one resource's execution identity to another
/// resource. Not a resource itself: it is a side-effecting operation that can
/// only be performed after both endpoints exist.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionGrant {
    /// Binding name of the resource whose identity receives the capability
    pub principal: String,
    /// Binding name of the resource the capability is scoped to
    pub target: String,
    pub access: Access,
}

impl PermissionGrant {
    pub fn new(principal: impl Into<String>, target: impl Into<String>, access: Access) -> Self {
        Self {
            principal: principal.into(),
            target: target.into(),
            access,
        }
    }
}

impl std::fmt::Display for PermissionGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.principal,
            self.target,
            self.access.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_refs_finds_nested_references() {
        let value = Value::Map(HashMap::from([
            (
                "DYNAMODB_TABLE".to_string(),
                Value::reference("flags-table", "table_name"),
            ),
            ("USE_DYNAMODB".to_string(), Value::string("true")),
        ]));

        let mut refs = Vec::new();
        value.collect_refs(&mut refs);
        assert_eq!(refs, vec![("flags-table", "table_name")]);
    }

    #[test]
    fn json_round_trip() {
        let value = Value::Map(HashMap::from([
            ("port".to_string(), Value::Int(8030)),
            ("logging".to_string(), Value::Bool(true)),
            (
                "zones".to_string(),
                Value::List(vec![Value::string("a"), Value::string("b")]),
            ),
        ]));

        let json = value.to_json();
        let back = Value::from_json(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn unresolved_ref_is_visible_in_json() {
        let value = Value::reference("flags-table", "table_name");
        assert_eq!(
            value.to_json(),
            serde_json::Value::String("${flags-table.table_name}".to_string())
        );
    }

    #[test]
    fn removal_policy_defaults_to_retain() {
        let resource = Resource::new("network", "relay-network");
        assert_eq!(resource.removal, RemovalPolicy::Retain);
        assert!(!resource.is_data_source());
    }
}
