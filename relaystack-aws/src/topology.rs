//! Topology - the relay deployment's resource graph
//!
//! One linear construction sequence, leaves first: network, certificate
//! lookup (HTTPS only), cluster, table, service, permission grant. The
//! result is a validated `ResourceGraph` ready to diff, render, or apply.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{info, warn};

use relaystack_core::graph::{GraphError, ResourceGraph};
use relaystack_core::resource::{Access, PermissionGrant, Resource, Value};

use crate::config::{self, ConfigError, DeployConfig, HttpsMode, RelayEnv};
use crate::naming;
use crate::schemas;
use crate::schemas::table::{BILLING_MODE, KEY_TYPE, PARTITION_KEY_NAME, SORT_KEY_NAME};
use crate::types;

/// Binding names of the topology's nodes
pub const NETWORK: &str = "relay-network";
pub const CERTIFICATE: &str = "relay-cert";
pub const CLUSTER: &str = "relay-cluster";
pub const TABLE: &str = "flags-table";
pub const SERVICE: &str = "relay-service";

/// The prebuilt relay image, pinned to a published tag
pub const RELAY_IMAGE: &str = "launchdarkly/ld-relay:8";

/// Container environment keys computed here rather than read from process
/// configuration
pub const ENV_DYNAMODB_TABLE: &str = "DYNAMODB_TABLE";
pub const ENV_USE_DYNAMODB: &str = "USE_DYNAMODB";

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("schema validation failed:\n{}", .0.join("\n"))]
    Schema(Vec<String>),
}

/// The environment mapping injected into every service replica.
///
/// This is the integration contract with the relay image and must be
/// reproduced key-for-key. Unset inputs stay as empty strings, which the
/// image tolerates, and the table name is a reference resolved against the
/// graph, so it can never drift from the table's generated name.
pub fn container_environment(relay: &RelayEnv) -> HashMap<String, Value> {
    HashMap::from([
        (
            config::ENV_CLIENT_SIDE_ID_PROD.to_string(),
            Value::string(&relay.client_side_id_prod),
        ),
        (
            config::ENV_CLIENT_SIDE_ID_STAGING.to_string(),
            Value::string(&relay.client_side_id_staging),
        ),
        (
            config::ENV_LD_ENV_STAGING.to_string(),
            Value::string(&relay.env_staging),
        ),
        (
            config::ENV_LD_ENV_PROD.to_string(),
            Value::string(&relay.env_prod),
        ),
        (
            ENV_DYNAMODB_TABLE.to_string(),
            Value::reference(TABLE, "table_name"),
        ),
        (ENV_USE_DYNAMODB.to_string(), Value::string("true")),
        (
            config::ENV_LD_PREFIX_STAGING.to_string(),
            Value::string(&relay.prefix_staging),
        ),
        (
            config::ENV_LD_PREFIX_PROD.to_string(),
            Value::string(&relay.prefix_prod),
        ),
    ])
}

/// Build the deployment topology from an explicit configuration.
///
/// Configuration problems fail here, at build time. Warnings (an empty relay
/// configuration, a missing key prefix) are logged and the build proceeds.
pub fn build_topology(config: &DeployConfig) -> Result<ResourceGraph, TopologyError> {
    for warning in config.validate()? {
        warn!(%warning, "configuration warning");
    }

    let region_zones = types::zone_count(&config.region)
        .ok_or_else(|| ConfigError::UnknownRegion(config.region.clone()))?;
    let zone_count = (config.max_availability_zones as usize).min(region_zones);

    let stack = &config.stack_name;
    let mut graph = ResourceGraph::new();

    graph.add_resource(
        Resource::new("network", NETWORK)
            .with_attribute("name", Value::string(naming::physical_name(stack, "network")))
            .with_attribute("region", Value::string(&config.region))
            .with_attribute(
                "max_availability_zones",
                Value::Int(config.max_availability_zones as i64),
            )
            .with_attribute("zone_count", Value::Int(zone_count as i64)),
    )?;

    if let HttpsMode::Enabled { certificate_arn } = &config.https {
        graph.add_resource(
            Resource::new("certificate", CERTIFICATE)
                .with_attribute("arn", Value::string(certificate_arn))
                .with_read_only(true),
        )?;
    }

    graph.add_resource(
        Resource::new("cluster", CLUSTER)
            .with_attribute("name", Value::string(naming::physical_name(stack, "cluster")))
            .with_attribute("network", Value::reference(NETWORK, "name")),
    )?;

    graph.add_resource(
        Resource::new("table", TABLE)
            .with_attribute("table_name", Value::string(naming::table_name(stack)))
            .with_attribute("partition_key_name", Value::string(PARTITION_KEY_NAME))
            .with_attribute("partition_key_type", Value::string(KEY_TYPE))
            .with_attribute("sort_key_name", Value::string(SORT_KEY_NAME))
            .with_attribute("sort_key_type", Value::string(KEY_TYPE))
            .with_attribute("billing_mode", Value::string(BILLING_MODE))
            .with_removal(config.table_removal),
    )?;

    let mut service = Resource::new("service", SERVICE)
        .with_attribute("name", Value::string(naming::physical_name(stack, "service")))
        .with_attribute("image", Value::string(RELAY_IMAGE))
        .with_attribute("cluster", Value::reference(CLUSTER, "name"))
        .with_attribute("container_port", Value::Int(config.container_port as i64))
        .with_attribute("desired_count", Value::Int(config.desired_count as i64))
        .with_attribute("cpu_units", Value::Int(config.cpu_units as i64))
        .with_attribute("memory_mib", Value::Int(config.memory_mib as i64))
        .with_attribute(
            "environment",
            Value::Map(container_environment(&config.relay)),
        )
        .with_attribute("enable_logging", Value::Bool(config.enable_logging))
        .with_attribute("redirect_http", Value::Bool(config.redirect_http));
    if matches!(config.https, HttpsMode::Enabled { .. }) {
        service = service.with_attribute("certificate_arn", Value::reference(CERTIFICATE, "arn"));
    }
    graph.add_resource(service)?;

    graph.add_grant(PermissionGrant::new(SERVICE, TABLE, Access::ReadWrite))?;

    schemas::validate_resources(&graph.resolved()?).map_err(TopologyError::Schema)?;

    info!(
        stack = %config.stack_name,
        resources = graph.resources().len(),
        grants = graph.grants().len(),
        zone_count,
        "topology built"
    );

    Ok(graph)
}
