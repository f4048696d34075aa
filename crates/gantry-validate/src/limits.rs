//! Resource limit validation for the memory and cpu namespaces.
//!
//! Keys in both namespaces are process-type labels. Memory values carry a
//! binary unit suffix; cpu values are whole shares or millicores.

use crate::{Namespace, ValidationError};
use regex_lite::Regex;

fn check_process_type(ns: Namespace, key: &str) -> Result<(), ValidationError> {
    let re = Regex::new(r"^[a-zA-Z0-9_]+$").unwrap();
    if re.is_match(key) {
        Ok(())
    } else {
        Err(ValidationError::new(
            ns,
            key,
            format!("{} is not a valid process type", key),
        ))
    }
}

pub(crate) fn validate_memory(key: &str, value: &str) -> Result<(), ValidationError> {
    check_process_type(Namespace::Memory, key)?;
    let re = Regex::new(r"^[0-9]+[MG]$").unwrap();
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            Namespace::Memory,
            key,
            "Memory limit format: <number><unit>, where unit = M or G",
        ))
    }
}

pub(crate) fn validate_cpu(key: &str, value: &str) -> Result<(), ValidationError> {
    check_process_type(Namespace::Cpu, key)?;
    let re = Regex::new(r"^([0-9]+|[0-9]+m)$").unwrap();
    if re.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            Namespace::Cpu,
            key,
            "CPU shares must be a numeric value, whole shares or millicores",
        ))
    }
}
