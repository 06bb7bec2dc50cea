//! Graph - the declarative resource graph and its dependency analysis
//!
//! The graph is the whole program: resources and grants are declared once,
//! references between them become dependency edges, and the build order
//! derived here is the contract the external provisioning engine relies on
//! to sequence operations.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::resource::{PermissionGrant, Resource, Value};

/// Dependency between resources
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    /// Target resource binding name
    pub target: String,
    /// Referenced attribute (e.g., "table_name")
    pub attribute: String,
    /// Where this reference is used (e.g., "environment")
    pub used_in: String,
}

/// Dependency edges between resource bindings
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Resource binding name -> list of dependencies
    pub edges: HashMap<String, Vec<Dependency>>,
    /// Reverse edges: target -> list of resources that depend on it
    pub reverse_edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency edge
    pub fn add_edge(&mut self, from: String, dependency: Dependency) {
        let target = dependency.target.clone();
        self.edges.entry(from.clone()).or_default().push(dependency);
        self.reverse_edges.entry(target).or_default().push(from);
    }

    /// Get direct dependencies of a resource
    pub fn dependencies_of(&self, resource: &str) -> &[Dependency] {
        self.edges.get(resource).map_or(&[], |v| v.as_slice())
    }

    /// Get resources that depend on this resource
    pub fn dependents_of(&self, resource: &str) -> &[String] {
        self.reverse_edges
            .get(resource)
            .map_or(&[], |v| v.as_slice())
    }

    /// Check if the graph has any cycles
    pub fn has_cycle(&self) -> bool {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();

        for node in self.edges.keys() {
            if self.has_cycle_util(node, &mut visited, &mut rec_stack) {
                return true;
            }
        }
        false
    }

    fn has_cycle_util(
        &self,
        node: &str,
        visited: &mut HashSet<String>,
        rec_stack: &mut HashSet<String>,
    ) -> bool {
        if rec_stack.contains(node) {
            return true;
        }
        if visited.contains(node) {
            return false;
        }

        visited.insert(node.to_string());
        rec_stack.insert(node.to_string());

        if let Some(deps) = self.edges.get(node) {
            for dep in deps {
                if self.has_cycle_util(&dep.target, visited, rec_stack) {
                    return true;
                }
            }
        }

        rec_stack.remove(node);
        false
    }
}

/// Errors raised while building or querying a resource graph.
///
/// Every variant is a build-time failure: a graph that constructs
/// successfully is internally consistent and safe to hand to the engine.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("duplicate resource binding '{0}'")]
    DuplicateBinding(String),

    #[error("resource '{binding}' references unknown resource '{target}' in attribute '{used_in}'")]
    UnknownReference {
        binding: String,
        target: String,
        used_in: String,
    },

    #[error("grant '{grant}' declared before its {role} '{binding}' exists in the graph")]
    GrantBeforeEndpoint {
        grant: String,
        role: &'static str,
        binding: String,
    },

    #[error("reference '{binding}.{attribute}' cannot be resolved: {reason}")]
    UnresolvedReference {
        binding: String,
        attribute: String,
        reason: String,
    },
}

/// The declared topology: resources in declaration order, permission grants,
/// and the dependency edges derived from attribute references.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    resources: Vec<Resource>,
    grants: Vec<PermissionGrant>,
    deps: DependencyGraph,
}

impl ResourceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a resource to the graph.
    ///
    /// Binding names must be unique, and every reference in the resource's
    /// attributes must name a resource that is already in the graph. The
    /// construction sequence therefore declares leaves first, which is
    /// exactly the partial order the provisioning engine needs.
    pub fn add_resource(&mut self, resource: Resource) -> Result<(), GraphError> {
        if self.get(&resource.id.name).is_some() {
            return Err(GraphError::DuplicateBinding(resource.id.name.clone()));
        }

        for (attr_key, value) in &resource.attributes {
            let mut refs = Vec::new();
            value.collect_refs(&mut refs);
            for (target, attribute) in refs {
                if self.get(target).is_none() {
                    return Err(GraphError::UnknownReference {
                        binding: resource.id.name.clone(),
                        target: target.to_string(),
                        used_in: attr_key.clone(),
                    });
                }
                self.deps.add_edge(
                    resource.id.name.clone(),
                    Dependency {
                        target: target.to_string(),
                        attribute: attribute.to_string(),
                        used_in: attr_key.clone(),
                    },
                );
            }
        }

        debug!(resource = %resource.id, "added to graph");
        self.resources.push(resource);
        Ok(())
    }

    /// Add a permission grant.
    ///
    /// Both the principal and the target must already exist in the graph;
    /// granting a capability to or on a resource that has not been declared
    /// is rejected here, at graph-build time, never silently reordered.
    pub fn add_grant(&mut self, grant: PermissionGrant) -> Result<(), GraphError> {
        for (role, binding) in [("principal", &grant.principal), ("target", &grant.target)] {
            if self.get(binding).is_none() {
                return Err(GraphError::GrantBeforeEndpoint {
                    grant: grant.to_string(),
                    role,
                    binding: binding.clone(),
                });
            }
        }

        debug!(%grant, "grant added to graph");
        self.grants.push(grant);
        Ok(())
    }

    /// Look up a resource by binding name
    pub fn get(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id.name == name)
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn grants(&self) -> &[PermissionGrant] {
        &self.grants
    }

    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.deps
    }

    /// Topological build order (leaves first), deterministic: ties are broken
    /// by declaration order. Grants are not part of this order; they always
    /// come after every resource effect in a plan.
    pub fn build_order(&self) -> Vec<&Resource> {
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut order = Vec::with_capacity(self.resources.len());

        while order.len() < self.resources.len() {
            let before = order.len();
            for resource in &self.resources {
                if emitted.contains(resource.id.name.as_str()) {
                    continue;
                }
                let ready = self
                    .deps
                    .dependencies_of(&resource.id.name)
                    .iter()
                    .all(|dep| emitted.contains(dep.target.as_str()));
                if ready {
                    emitted.insert(&resource.id.name);
                    order.push(resource);
                }
            }
            // References can only name already-declared resources, so the
            // graph is acyclic and every pass makes progress.
            debug_assert!(order.len() > before, "cycle in acyclic-by-construction graph");
            if order.len() == before {
                break;
            }
        }

        order
    }

    /// Teardown order: exact reverse of the build order
    pub fn destroy_order(&self) -> Vec<&Resource> {
        let mut order = self.build_order();
        order.reverse();
        order
    }

    /// Resolve every reference in a value against the graph
    pub fn resolve(&self, value: &Value) -> Result<Value, GraphError> {
        match value {
            Value::Ref { binding, attribute } => {
                let target = self.get(binding).ok_or_else(|| GraphError::UnresolvedReference {
                    binding: binding.clone(),
                    attribute: attribute.clone(),
                    reason: "no such resource".to_string(),
                })?;
                let referenced = target.attributes.get(attribute).ok_or_else(|| {
                    GraphError::UnresolvedReference {
                        binding: binding.clone(),
                        attribute: attribute.clone(),
                        reason: "resource has no such attribute".to_string(),
                    }
                })?;
                // The referenced value may itself contain references to
                // earlier declarations; recursion terminates because edges
                // only point backwards.
                self.resolve(referenced)
            }
            Value::List(items) => {
                let resolved: Result<Vec<Value>, GraphError> =
                    items.iter().map(|item| self.resolve(item)).collect();
                Ok(Value::List(resolved?))
            }
            Value::Map(map) => {
                let mut resolved = HashMap::new();
                for (key, inner) in map {
                    resolved.insert(key.clone(), self.resolve(inner)?);
                }
                Ok(Value::Map(resolved))
            }
            other => Ok(other.clone()),
        }
    }

    /// A resource's attributes with every reference resolved
    pub fn resolved_attributes(
        &self,
        resource: &Resource,
    ) -> Result<HashMap<String, Value>, GraphError> {
        let mut attributes = HashMap::new();
        for (key, value) in &resource.attributes {
            attributes.insert(key.clone(), self.resolve(value)?);
        }
        Ok(attributes)
    }

    /// All resources in build order with references resolved
    pub fn resolved(&self) -> Result<Vec<Resource>, GraphError> {
        self.build_order()
            .into_iter()
            .map(|resource| {
                Ok(Resource {
                    id: resource.id.clone(),
                    attributes: self.resolved_attributes(resource)?,
                    read_only: resource.read_only,
                    removal: resource.removal,
                })
            })
            .collect()
    }

}
