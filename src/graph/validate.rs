//! Logical name validation
//!
//! Names of resources, lookups, bindings, watches and exports:
//! - Start with an ASCII letter
//! - Continue with letters, digits, underscores or dashes
//!
//! Dots are reserved for output paths (`metadata.name`).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::SkyError;

static NODE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").unwrap());

/// Longest logical name accepted (physical names add a suffix on top)
pub const MAX_NAME_LEN: usize = 63;

pub fn validate_node_name(name: &str) -> Result<(), SkyError> {
    let invalid = |reason: &str| SkyError::InvalidNodeName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("longer than 63 characters"));
    }
    if !NODE_NAME.is_match(name) {
        return Err(invalid(
            "must start with a letter, then letters, digits, '_' or '-'",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_stack_names() {
        for name in [
            "resource_group",
            "userAssignedIdentity",
            "managed_cluster",
            "nginx-html",
            "nginx-lb",
            "frontend_IP",
            "a",
        ] {
            assert!(validate_node_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_empty() {
        let err = validate_node_name("").unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn rejects_leading_digit_or_symbol() {
        assert!(validate_node_name("1cluster").is_err());
        assert!(validate_node_name("_private").is_err());
        assert!(validate_node_name("-lb").is_err());
    }

    #[test]
    fn rejects_dots_and_spaces() {
        assert!(validate_node_name("nginx.lb").is_err());
        assert!(validate_node_name("nginx lb").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        let err = validate_node_name(&long).unwrap_err();
        assert_eq!(err.code(), "SKY-010");
        assert!(validate_node_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
    }
}
