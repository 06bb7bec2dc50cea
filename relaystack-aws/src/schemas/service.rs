//! Load-balanced container service schema

use relaystack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::types as aws_types;

/// Returns the schema for the replicated relay service.
///
/// The environment map is the integration contract with the relay image:
/// its keys must be reproduced exactly for the image to find its backing
/// store and upstream environments.
pub fn service_schema() -> ResourceSchema {
    ResourceSchema::new("service")
        .with_description("Load-balanced, auto-replicated container service")
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("image", AttributeType::String)
                .required()
                .with_description("Registry reference of the prebuilt relay image"),
        )
        .attribute(
            AttributeSchema::new("cluster", AttributeType::String)
                .required()
                .with_description("Binding of the cluster the service runs in"),
        )
        .attribute(
            AttributeSchema::new("certificate_arn", aws_types::arn()).with_description(
                "TLS certificate for the load balancer; absent on HTTP-only deployments",
            ),
        )
        .attribute(
            AttributeSchema::new("container_port", aws_types::port_number())
                .required()
                .with_description("Port the image listens on"),
        )
        .attribute(
            AttributeSchema::new("desired_count", types::positive_int())
                .required()
                .with_description("Number of concurrently running replicas"),
        )
        .attribute(
            AttributeSchema::new("cpu_units", types::positive_int())
                .required()
                .with_description("Per-replica CPU reservation"),
        )
        .attribute(
            AttributeSchema::new("memory_mib", types::positive_int())
                .required()
                .with_description("Per-replica memory reservation in MiB"),
        )
        .attribute(
            AttributeSchema::new("environment", types::string_map())
                .required()
                .with_description("Key-value pairs injected into every replica"),
        )
        .attribute(
            AttributeSchema::new("enable_logging", AttributeType::Bool)
                .with_description("Ship replica stdout/stderr to the log sink"),
        )
        .attribute(
            AttributeSchema::new("redirect_http", AttributeType::Bool)
                .with_description("Redirect plaintext traffic to the secure listener"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaystack_core::resource::Value;
    use std::collections::HashMap;

    #[test]
    fn valid_service() {
        let schema = service_schema();
        let attrs = HashMap::from([
            ("name".to_string(), Value::string("ld-relay-service")),
            ("image".to_string(), Value::string("launchdarkly/ld-relay:8")),
            (
                "cluster".to_string(),
                Value::reference("relay-cluster", "name"),
            ),
            ("container_port".to_string(), Value::Int(8030)),
            ("desired_count".to_string(), Value::Int(3)),
            ("cpu_units".to_string(), Value::Int(4096)),
            ("memory_mib".to_string(), Value::Int(16384)),
            (
                "environment".to_string(),
                Value::Map(HashMap::from([(
                    "USE_DYNAMODB".to_string(),
                    Value::string("true"),
                )])),
            ),
            ("enable_logging".to_string(), Value::Bool(true)),
            ("redirect_http".to_string(), Value::Bool(true)),
        ]);
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn replica_count_must_be_positive() {
        let schema = service_schema();
        let attrs = HashMap::from([
            ("name".to_string(), Value::string("ld-relay-service")),
            ("image".to_string(), Value::string("launchdarkly/ld-relay:8")),
            ("cluster".to_string(), Value::string("relay-cluster")),
            ("container_port".to_string(), Value::Int(8030)),
            ("desired_count".to_string(), Value::Int(0)),
            ("cpu_units".to_string(), Value::Int(4096)),
            ("memory_mib".to_string(), Value::Int(16384)),
            ("environment".to_string(), Value::Map(HashMap::new())),
        ]);
        assert!(schema.validate(&attrs).is_err());
    }
}
