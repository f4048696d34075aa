//! Registry credential validation.
//!
//! Keys are case-insensitive (stored lower-case via
//! [`Namespace::canonical_key`](crate::Namespace::canonical_key)); values
//! are opaque credential material and unrestricted.

use crate::{Namespace, ValidationError};
use regex_lite::Regex;

pub(crate) fn validate(key: &str, _value: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
    if re.is_match(key) {
        Ok(())
    } else {
        Err(ValidationError::new(
            Namespace::Registry,
            key,
            format!("{} is not a valid registry key", key),
        ))
    }
}
