//! Physical name generation
//!
//! Physical names are derived deterministically from the stack name, so a
//! rebuilt graph produces the same names and reconciliation stays stable.

/// Whether a stack name is usable as a physical-name prefix:
/// lowercase alphanumeric and hyphens, starting with a letter or digit.
pub fn is_valid_stack_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 40
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Physical name for a resource within a stack
pub fn physical_name(stack: &str, suffix: &str) -> String {
    format!("{}-{}", stack, suffix)
}

/// Generated name of the flag-store table
pub fn table_name(stack: &str) -> String {
    physical_name(stack, "flags")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_name_validation() {
        assert!(is_valid_stack_name("ld-relay"));
        assert!(is_valid_stack_name("relay2"));
        assert!(!is_valid_stack_name(""));
        assert!(!is_valid_stack_name("Relay"));
        assert!(!is_valid_stack_name("-relay"));
        assert!(!is_valid_stack_name("relay-"));
        assert!(!is_valid_stack_name("relay_proxy"));
    }

    #[test]
    fn table_name_is_deterministic() {
        assert_eq!(table_name("ld-relay"), "ld-relay-flags");
        assert_eq!(table_name("ld-relay"), table_name("ld-relay"));
    }
}
