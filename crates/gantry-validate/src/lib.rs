//! Namespace validators for Gantry application configuration.
//!
//! Each configuration namespace (values, memory, cpu, tags, registry)
//! carries its own key and value grammar. Validators are pure: they accept
//! or reject a single entry and never consult platform state. Anything not
//! explicitly matched by a grammar is rejected.

mod error;
mod limits;
mod registry;
mod tags;
mod values;

pub use error::ValidationError;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Configuration namespaces, in canonical serialization order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    Values,
    Memory,
    Cpu,
    Tags,
    Registry,
}

impl Namespace {
    /// All namespaces, in canonical order.
    pub const ALL: [Namespace; 5] = [
        Namespace::Values,
        Namespace::Memory,
        Namespace::Cpu,
        Namespace::Tags,
        Namespace::Registry,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Values => "values",
            Namespace::Memory => "memory",
            Namespace::Cpu => "cpu",
            Namespace::Tags => "tags",
            Namespace::Registry => "registry",
        }
    }

    /// Parse a namespace name as it appears on the wire.
    pub fn parse(s: &str) -> Option<Namespace> {
        match s {
            "values" => Some(Namespace::Values),
            "memory" => Some(Namespace::Memory),
            "cpu" => Some(Namespace::Cpu),
            "tags" => Some(Namespace::Tags),
            "registry" => Some(Namespace::Registry),
            _ => None,
        }
    }

    /// Canonical storage form of a key. Registry keys are case-insensitive
    /// and stored lower-case; every other namespace stores keys verbatim.
    pub fn canonical_key(&self, key: &str) -> String {
        match self {
            Namespace::Registry => key.to_lowercase(),
            _ => key.to_string(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a single key/value pair against its namespace grammar.
///
/// Removal of a key is always legal and must not be routed through here;
/// only values being set are validated.
pub fn validate_entry(ns: Namespace, key: &str, value: &str) -> Result<(), ValidationError> {
    match ns {
        Namespace::Values => values::validate(key, value),
        Namespace::Memory => limits::validate_memory(key, value),
        Namespace::Cpu => limits::validate_cpu(key, value),
        Namespace::Tags => tags::validate(key, value),
        Namespace::Registry => registry::validate(key, value),
    }
}

/// Validate a whole namespace map, returning the accepted form with keys
/// canonicalized. Used when replaying stored state that may predate the
/// current grammars.
pub fn validate_map(
    ns: Namespace,
    map: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, ValidationError> {
    let mut accepted = BTreeMap::new();
    for (key, value) in map {
        validate_entry(ns, key, value)?;
        accepted.insert(ns.canonical_key(key), value.clone());
    }
    Ok(accepted)
}
