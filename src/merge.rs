//! Namespace merge.
//!
//! Merging is namespace-local: each namespace in a patch is applied over
//! the previous version's map for that namespace only. Set operations are
//! validated before they land; unset operations always succeed so a bad
//! stored value can be removed under any grammar.

use crate::patch::{NamespacePatch, PatchOp};
use crate::snapshot::NamespaceMap;
use gantry_validate::{validate_entry, Namespace, ValidationError};

/// Apply one namespace's patch over its previous map, producing the merged
/// map. The inputs are untouched; a validation failure leaves no partial
/// result behind.
pub fn apply(
    ns: Namespace,
    current: &NamespaceMap,
    patch: &NamespacePatch,
) -> Result<NamespaceMap, ValidationError> {
    let mut merged = current.clone();
    for (key, op) in patch {
        match op {
            PatchOp::Unset => {
                merged.remove(&ns.canonical_key(key));
            }
            PatchOp::Set(value) => {
                validate_entry(ns, key, value)?;
                merged.insert(ns.canonical_key(key), value.clone());
            }
        }
    }
    Ok(merged)
}
