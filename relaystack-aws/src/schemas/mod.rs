//! Attribute schemas for the topology's resource kinds

pub mod certificate;
pub mod cluster;
pub mod network;
pub mod service;
pub mod table;

use relaystack_core::resource::Resource;
use relaystack_core::schema::ResourceSchema;

/// Returns all schemas known to this provider
pub fn all_schemas() -> Vec<ResourceSchema> {
    vec![
        network::network_schema(),
        certificate::certificate_schema(),
        cluster::cluster_schema(),
        table::table_schema(),
        service::service_schema(),
    ]
}

/// Look up the schema for a resource kind
pub fn schema_for(kind: &str) -> Option<ResourceSchema> {
    all_schemas().into_iter().find(|s| s.kind == kind)
}

/// Validate resources against their kind schemas, collecting every error
pub fn validate_resources(resources: &[Resource]) -> Result<(), Vec<String>> {
    let mut all_errors = Vec::new();

    for resource in resources {
        if let Some(schema) = schema_for(&resource.id.kind)
            && let Err(errors) = schema.validate(&resource.attributes)
        {
            for error in errors {
                all_errors.push(format!("{}: {}", resource.id, error));
            }
        }
    }

    if all_errors.is_empty() {
        Ok(())
    } else {
        Err(all_errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_schema() {
        for kind in ["network", "certificate", "cluster", "table", "service"] {
            assert!(schema_for(kind).is_some(), "missing schema for {}", kind);
        }
        assert!(schema_for("queue").is_none());
    }
}
