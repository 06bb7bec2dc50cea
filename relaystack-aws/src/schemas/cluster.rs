//! Cluster resource schema

use relaystack_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Returns the schema for the container cluster
pub fn cluster_schema() -> ResourceSchema {
    ResourceSchema::new("cluster")
        .with_description("A container cluster placed inside the network")
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("network", AttributeType::String)
                .required()
                .with_description("Binding of the network the cluster is placed in"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaystack_core::resource::Value;
    use std::collections::HashMap;

    #[test]
    fn valid_cluster() {
        let schema = cluster_schema();
        let attrs = HashMap::from([
            ("name".to_string(), Value::string("ld-relay-cluster")),
            (
                "network".to_string(),
                Value::reference("relay-network", "name"),
            ),
        ]);
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn cluster_requires_network() {
        let schema = cluster_schema();
        let attrs = HashMap::from([("name".to_string(), Value::string("ld-relay-cluster"))]);
        assert!(schema.validate(&attrs).is_err());
    }
}
