//! Scheduling tag validation.
//!
//! Tags follow Kubernetes label syntax: a key is an optional DNS-subdomain
//! prefix plus a name segment, a value is a name segment or empty. Syntax
//! is checked here; whether any node actually carries the label is the
//! scheduler's concern.

use crate::{Namespace, ValidationError};
use regex_lite::Regex;

const MAX_PREFIX_LEN: usize = 253;
const MAX_SEGMENT_LEN: usize = 63;

fn reject(key: &str, value: &str, detail: &str) -> ValidationError {
    ValidationError::new(
        Namespace::Tags,
        key,
        format!("{}. Addition of {}={} is the cause", detail, key, value),
    )
}

fn is_name_segment(s: &str) -> bool {
    let re = Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9._-]*[A-Za-z0-9])?$").unwrap();
    s.len() <= MAX_SEGMENT_LEN && re.is_match(s)
}

fn is_prefix(s: &str) -> bool {
    let re = Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
        .unwrap();
    s.len() <= MAX_PREFIX_LEN && re.is_match(s)
}

pub(crate) fn validate(key: &str, value: &str) -> Result<(), ValidationError> {
    let name = match key.split_once('/') {
        Some((prefix, name)) => {
            if !is_prefix(prefix) {
                return Err(reject(
                    key,
                    value,
                    "Tag key prefixes must be DNS subdomains no longer than 253 characters",
                ));
            }
            name
        }
        None => key,
    };
    if !is_name_segment(name) {
        return Err(reject(
            key,
            value,
            "Tag keys must be alphanumeric or _.- no longer than 63 characters, bounded by alphanumerics",
        ));
    }
    if !value.is_empty() && !is_name_segment(value) {
        return Err(reject(
            key,
            value,
            "Tag values must be alphanumeric or _.- no longer than 63 characters, bounded by alphanumerics",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_tags() {
        assert!(validate("environ", "dev").is_ok());
        assert!(validate("rack", "1").is_ok());
        assert!(validate("is.valid", "is-also_valid").is_ok());
    }

    #[test]
    fn test_accepts_prefixed_keys() {
        assert!(validate("kubernetes.io/hostname", "172.17.8.100").is_ok());
        assert!(validate("host.the-name.com/is.valid", "valid").is_ok());
        // Syntactically fine even if nothing in the cluster matches it.
        assert!(validate("host.the-name.com/does.no.exist", "valid").is_ok());
    }

    #[test]
    fn test_accepts_empty_value() {
        assert!(validate("dedicated", "").is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(validate("valid", "in\nvalid").is_err());
        assert!(validate("valid", "invalid.").is_err());
        assert!(validate("valid", ".invalid").is_err());
        assert!(validate("valid", &"a".repeat(64)).is_err());
    }

    #[test]
    fn test_rejects_bad_names() {
        assert!(validate("host.name.com/notvalid-", "valid").is_err());
        assert!(validate("host.name.com/,not.valid", "valid").is_err());
        assert!(validate("in valid", "a").is_err());
        assert!(validate("", "a").is_err());
        assert!(validate(&format!("prefix.com/{}", "n".repeat(64)), "a").is_err());
    }

    #[test]
    fn test_rejects_bad_prefixes() {
        assert!(validate(&format!("{}/valid", "a".repeat(300)), "valid").is_err());
        assert!(validate("this&foo.com/not.valid", "valid").is_err());
        assert!(validate("Upper.Case/name", "valid").is_err());
        assert!(validate("-leading.dash/name", "valid").is_err());
    }

    #[test]
    fn test_extra_slash_lands_in_name_segment() {
        assert!(validate("a.com/b/c", "valid").is_err());
    }

    #[test]
    fn test_message_names_the_pair() {
        let err = validate("valid", "invalid.").unwrap_err();
        assert!(err.reason.contains("Addition of valid=invalid. is the cause"));
        let err = validate("host.name.com/notvalid-", "v").unwrap_err();
        assert!(err
            .reason
            .contains("Addition of host.name.com/notvalid-=v is the cause"));
    }
}
