//! Environment variable validation, including the healthcheck keys.

use crate::{Namespace, ValidationError};
use regex_lite::Regex;

/// Keys whose values must be non-negative integer strings.
const NUMERIC_KEYS: &[&str] = &["HEALTHCHECK_INITIAL_DELAY", "HEALTHCHECK_TIMEOUT"];

/// The healthcheck probe target. Must be a bare URL path.
const URL_KEY: &str = "HEALTHCHECK_URL";

/// The container port. Must fit the TCP port range.
const PORT_KEY: &str = "PORT";

pub(crate) fn validate(key: &str, value: &str) -> Result<(), ValidationError> {
    let key_re = Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").unwrap();
    if !key_re.is_match(key) {
        return Err(ValidationError::new(
            Namespace::Values,
            key,
            format!("{} is not a valid environment variable name", key),
        ));
    }
    if key == PORT_KEY {
        return validate_port(value);
    }
    if NUMERIC_KEYS.contains(&key) {
        return validate_numeric(key, value);
    }
    if key == URL_KEY {
        return validate_url_path(value);
    }
    // Any other value is taken verbatim, unicode included.
    Ok(())
}

fn validate_port(value: &str) -> Result<(), ValidationError> {
    let ok = !value.is_empty()
        && value.bytes().all(|b| b.is_ascii_digit())
        && value
            .parse::<u32>()
            .map(|n| (1..=65535).contains(&n))
            .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(
            Namespace::Values,
            PORT_KEY,
            "PORT can only be an integer between 1 and 65535",
        ))
    }
}

fn validate_numeric(key: &str, value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new(
            Namespace::Values,
            key,
            format!("{} can only be a numeric value", key),
        ))
    }
}

fn validate_url_path(value: &str) -> Result<(), ValidationError> {
    let ok = value.starts_with('/')
        && !value.contains('?')
        && !value.contains('#')
        && !value.chars().any(|c| c.is_whitespace());
    if ok {
        Ok(())
    } else {
        Err(ValidationError::new(
            Namespace::Values,
            URL_KEY,
            "HEALTHCHECK_URL can only be a URL path without query or fragment",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_conventional_keys() {
        for key in ["FOO", "_foo", "f001", "FOO_BAR_BAZ_"] {
            assert!(validate(key, "anything").is_ok(), "{} should be valid", key);
        }
    }

    #[test]
    fn test_rejects_malformed_keys() {
        for key in ["123", "../../foo", "FOO/", "FOO-BAR", ""] {
            assert!(validate(key, "anything").is_err(), "{} should be invalid", key);
        }
    }

    #[test]
    fn test_values_accept_unicode() {
        assert!(validate("POWERED_BY", "暴走合金属").is_ok());
        assert!(validate("GREETING", "hûllo wörld").is_ok());
    }

    #[test]
    fn test_port_range() {
        assert!(validate("PORT", "1").is_ok());
        assert!(validate("PORT", "5000").is_ok());
        assert!(validate("PORT", "65535").is_ok());
        assert!(validate("PORT", "0").is_err());
        assert!(validate("PORT", "65536").is_err());
        assert!(validate("PORT", "99999").is_err());
        assert!(validate("PORT", "dog").is_err());
        assert!(validate("PORT", "-1").is_err());
        assert!(validate("PORT", "").is_err());
    }

    #[test]
    fn test_healthcheck_delay_numeric() {
        assert!(validate("HEALTHCHECK_INITIAL_DELAY", "25").is_ok());
        assert!(validate("HEALTHCHECK_INITIAL_DELAY", "0").is_ok());
        assert!(validate("HEALTHCHECK_INITIAL_DELAY", "horse").is_err());
        assert!(validate("HEALTHCHECK_TIMEOUT", "5").is_ok());
        assert!(validate("HEALTHCHECK_TIMEOUT", "5s").is_err());
    }

    #[test]
    fn test_healthcheck_url_path_only() {
        assert!(validate("HEALTHCHECK_URL", "/health").is_ok());
        assert!(validate("HEALTHCHECK_URL", "/health/db").is_ok());
        assert!(validate("HEALTHCHECK_URL", "/health?testing=0").is_err());
        assert!(validate("HEALTHCHECK_URL", "/health#db").is_err());
        assert!(validate("HEALTHCHECK_URL", "http://someurl.com/health/").is_err());
        assert!(validate("HEALTHCHECK_URL", "http://someurl.com").is_err());
        assert!(validate("HEALTHCHECK_URL", "/health check").is_err());
    }

    #[test]
    fn test_non_special_values_unrestricted() {
        assert!(validate("DATABASE_URL", "postgres://u:p@host:5432/db?ssl=true").is_ok());
        assert!(validate("EMPTY", "").is_ok());
    }
}
