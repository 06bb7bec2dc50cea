//! Flag-store table schema
//!
//! The relay image's data-access layer depends on the exact two-part key
//! scheme below. The schema pins the key names and types as single-variant
//! enums: they are an invariant of the store, never a configuration surface.

use relaystack_core::schema::{AttributeSchema, AttributeType, ResourceSchema};

/// Partition key attribute name, fixed by the relay's storage layout
pub const PARTITION_KEY_NAME: &str = "namespace";
/// Sort key attribute name, fixed by the relay's storage layout
pub const SORT_KEY_NAME: &str = "key";
/// Both key attributes are strings
pub const KEY_TYPE: &str = "string";
/// On-demand billing: no capacity to size or autoscale
pub const BILLING_MODE: &str = "pay_per_request";

/// Returns the schema for the managed key-value table
pub fn table_schema() -> ResourceSchema {
    ResourceSchema::new("table")
        .with_description("Managed key-sorted store backing the relay's flag cache")
        .attribute(AttributeSchema::new("table_name", AttributeType::String).required())
        .attribute(
            AttributeSchema::new(
                "partition_key_name",
                AttributeType::Enum(vec![PARTITION_KEY_NAME.to_string()]),
            )
            .required(),
        )
        .attribute(
            AttributeSchema::new(
                "partition_key_type",
                AttributeType::Enum(vec![KEY_TYPE.to_string()]),
            )
            .required(),
        )
        .attribute(
            AttributeSchema::new(
                "sort_key_name",
                AttributeType::Enum(vec![SORT_KEY_NAME.to_string()]),
            )
            .required(),
        )
        .attribute(
            AttributeSchema::new(
                "sort_key_type",
                AttributeType::Enum(vec![KEY_TYPE.to_string()]),
            )
            .required(),
        )
        .attribute(
            AttributeSchema::new(
                "billing_mode",
                AttributeType::Enum(vec![BILLING_MODE.to_string()]),
            )
            .required(),
        )
}
