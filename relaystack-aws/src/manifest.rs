//! Manifest - the serialized deployment graph handed to the provisioning engine
//!
//! The manifest is the full description of the topology: every resource in
//! build order with resolved attributes and dependency edges, grants last.
//! The external engine sequences its operations from `depends_on`.

use serde::Serialize;

use relaystack_core::graph::{GraphError, ResourceGraph};
use relaystack_core::resource::Value;

use crate::config::DeployConfig;

/// Manifest document format version
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub format_version: u32,
    pub stack: String,
    pub region: String,
    pub resources: Vec<ManifestResource>,
    pub grants: Vec<ManifestGrant>,
}

#[derive(Debug, Serialize)]
pub struct ManifestResource {
    pub kind: String,
    pub name: String,
    pub attributes: serde_json::Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub data_source: bool,
    pub removal_policy: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ManifestGrant {
    pub principal: String,
    pub target: String,
    pub access: String,
    pub depends_on: Vec<String>,
}

impl Manifest {
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Render a graph into its manifest. Every reference is resolved; an
/// unresolvable reference fails the render rather than leaking a
/// placeholder to the engine.
pub fn render(graph: &ResourceGraph, config: &DeployConfig) -> Result<Manifest, GraphError> {
    let mut resources = Vec::new();

    for resource in graph.build_order() {
        let attributes = graph.resolved_attributes(resource)?;

        let mut depends_on: Vec<String> = graph
            .dependency_graph()
            .dependencies_of(&resource.id.name)
            .iter()
            .map(|dep| dep.target.clone())
            .collect();
        depends_on.sort();
        depends_on.dedup();

        resources.push(ManifestResource {
            kind: resource.id.kind.clone(),
            name: resource.id.name.clone(),
            attributes: Value::Map(attributes).to_json(),
            data_source: resource.read_only,
            removal_policy: resource.removal.as_str().to_string(),
            depends_on,
        });
    }

    let grants = graph
        .grants()
        .iter()
        .map(|grant| ManifestGrant {
            principal: grant.principal.clone(),
            target: grant.target.clone(),
            access: grant.access.as_str().to_string(),
            depends_on: vec![grant.principal.clone(), grant.target.clone()],
        })
        .collect();

    Ok(Manifest {
        format_version: FORMAT_VERSION,
        stack: config.stack_name.clone(),
        region: config.region.clone(),
        resources,
        grants,
    })
}
