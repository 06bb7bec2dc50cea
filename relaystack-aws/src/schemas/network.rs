//! Network resource schema

use relaystack_core::schema::{AttributeSchema, AttributeType, ResourceSchema, types};

use crate::types as aws_types;

/// Returns the schema for the isolated virtual network.
///
/// The network is a leaf: it depends on nothing, and the cluster is placed
/// inside it. `zone_count` is the resolved span, already capped by the
/// zones the region offers.
pub fn network_schema() -> ResourceSchema {
    ResourceSchema::new("network")
        .with_description("An isolated virtual network spanning availability zones")
        .attribute(AttributeSchema::new("name", AttributeType::String).required())
        .attribute(
            AttributeSchema::new("region", aws_types::aws_region())
                .with_description("The AWS region the network lives in"),
        )
        .attribute(
            AttributeSchema::new("max_availability_zones", types::positive_int())
                .required()
                .with_description("Requested upper bound on the zones to span"),
        )
        .attribute(
            AttributeSchema::new("zone_count", types::positive_int())
                .with_description("Resolved zone span: min(requested, zones in region)"),
        )
}
