//! Certificate reference schema

use relaystack_core::schema::{AttributeSchema, ResourceSchema};

use crate::types as aws_types;

/// Returns the schema for the TLS certificate reference.
///
/// The certificate is issued elsewhere; this is a read-only lookup by ARN.
pub fn certificate_schema() -> ResourceSchema {
    ResourceSchema::new("certificate")
        .with_description("Reference to an externally issued TLS certificate")
        .attribute(
            AttributeSchema::new("arn", aws_types::arn())
                .required()
                .with_description("ARN of the pre-existing certificate"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaystack_core::resource::Value;
    use std::collections::HashMap;

    #[test]
    fn valid_certificate_reference() {
        let schema = certificate_schema();
        let attrs = HashMap::from([(
            "arn".to_string(),
            Value::string("arn:aws:acm:us-east-1:123456789012:certificate/abc-123"),
        )]);
        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn malformed_arn_rejected() {
        let schema = certificate_schema();
        let attrs = HashMap::from([("arn".to_string(), Value::string("certificate-abc"))]);
        assert!(schema.validate(&attrs).is_err());
    }
}
