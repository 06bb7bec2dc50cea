//! AWS-specific attribute types

use relaystack_core::resource::Value;
use relaystack_core::schema::AttributeType;

/// Supported AWS regions and the number of availability zones each exposes
/// to a default account. The zone counts bound how wide a network can span.
const REGIONS: &[(&str, usize)] = &[
    ("ap-northeast-1", 3),
    ("ap-northeast-2", 4),
    ("ap-northeast-3", 3),
    ("ap-southeast-1", 3),
    ("ap-southeast-2", 3),
    ("ap-south-1", 3),
    ("us-east-1", 6),
    ("us-east-2", 3),
    ("us-west-1", 2),
    ("us-west-2", 4),
    ("eu-west-1", 3),
    ("eu-west-2", 3),
    ("eu-west-3", 3),
    ("eu-central-1", 3),
    ("eu-north-1", 3),
    ("ca-central-1", 3),
    ("sa-east-1", 3),
];

/// Number of availability zones in a region, if the region is known
pub fn zone_count(region: &str) -> Option<usize> {
    REGIONS
        .iter()
        .find(|(name, _)| *name == region)
        .map(|(_, zones)| *zones)
}

/// Whether a region name is recognized
pub fn is_valid_region(region: &str) -> bool {
    zone_count(region).is_some()
}

/// AWS region type with custom validation
pub fn aws_region() -> AttributeType {
    AttributeType::Custom {
        name: "Region".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            if let Value::String(s) = value {
                if is_valid_region(s) {
                    Ok(())
                } else {
                    Err(format!(
                        "Invalid region '{}', expected one of: {}",
                        s,
                        REGIONS
                            .iter()
                            .map(|(name, _)| *name)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                }
            } else {
                Err("Expected string".to_string())
            }
        },
    }
}

/// Whether a string is a structurally valid ARN
/// (arn:partition:service:region:account:resource)
pub fn is_valid_arn(arn: &str) -> bool {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    parts.len() == 6
        && parts[0] == "arn"
        && !parts[1].is_empty()
        && !parts[2].is_empty()
        && !parts[5].is_empty()
}

/// ARN type. An empty string is accepted here: whether an empty reference is
/// legal depends on the deployment's HTTPS intent, which the configuration
/// layer checks; the schema only rejects malformed non-empty values.
pub fn arn() -> AttributeType {
    AttributeType::Custom {
        name: "Arn".to_string(),
        base: Box::new(AttributeType::String),
        validate: |value| {
            if let Value::String(s) = value {
                if s.is_empty() || is_valid_arn(s) {
                    Ok(())
                } else {
                    Err(format!("'{}' is not a valid ARN", s))
                }
            } else {
                Err("Expected string".to_string())
            }
        },
    }
}

/// Port number type (with validation)
pub fn port_number() -> AttributeType {
    AttributeType::Custom {
        name: "PortNumber".to_string(),
        base: Box::new(AttributeType::Int),
        validate: |value| {
            if let Value::Int(n) = value {
                if *n >= 0 && *n <= 65535 {
                    Ok(())
                } else {
                    Err("Port number must be between 0 and 65535".to_string())
                }
            } else {
                Err("Expected integer".to_string())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zone_count_for_known_regions() {
        assert_eq!(zone_count("us-east-1"), Some(6));
        assert_eq!(zone_count("us-west-1"), Some(2));
        assert_eq!(zone_count("eu-central-1"), Some(3));
        assert_eq!(zone_count("mars-north-1"), None);
    }

    #[test]
    fn region_accepts_known_region() {
        let region_type = aws_region();
        assert!(region_type.validate(&Value::string("ap-northeast-1")).is_ok());
    }

    #[test]
    fn region_rejects_unknown_region() {
        let region_type = aws_region();
        let result = region_type.validate(&Value::string("invalid-region"));
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid region"));
        assert!(err.contains("us-east-1"));
    }

    #[test]
    fn arn_format_check() {
        assert!(is_valid_arn(
            "arn:aws:acm:us-east-1:123456789012:certificate/abc-123"
        ));
        assert!(!is_valid_arn("arn:aws:acm"));
        assert!(!is_valid_arn("not-an-arn"));
        assert!(!is_valid_arn(""));
    }

    #[test]
    fn arn_type_accepts_empty_string() {
        let arn_type = arn();
        assert!(arn_type.validate(&Value::string("")).is_ok());
        assert!(
            arn_type
                .validate(&Value::string(
                    "arn:aws:acm:us-east-1:123456789012:certificate/abc-123"
                ))
                .is_ok()
        );
        assert!(arn_type.validate(&Value::string("garbage")).is_err());
    }

    #[test]
    fn port_number_bounds() {
        let port = port_number();
        assert!(port.validate(&Value::Int(8030)).is_ok());
        assert!(port.validate(&Value::Int(0)).is_ok());
        assert!(port.validate(&Value::Int(65535)).is_ok());
        assert!(port.validate(&Value::Int(65536)).is_err());
        assert!(port.validate(&Value::Int(-1)).is_err());
    }
}
