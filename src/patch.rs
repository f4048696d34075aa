//! Patch model and request body decoding.
//!
//! A patch names, per namespace, the keys to set and the keys to unset.
//! Anything the patch does not mention is untouched by the merge.

use gantry_validate::Namespace;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// One operation on a single key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOp {
    /// Set the key to this value (validated before merge).
    Set(String),
    /// Remove the key. Always legal, even for values that would no longer
    /// validate.
    Unset,
}

/// Operations for one namespace, keyed as submitted by the caller.
pub type NamespacePatch = BTreeMap<String, PatchOp>;

/// A decoded config patch. `None` means the namespace was absent from the
/// request body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigPatch {
    pub values: Option<NamespacePatch>,
    pub memory: Option<NamespacePatch>,
    pub cpu: Option<NamespacePatch>,
    pub tags: Option<NamespacePatch>,
    pub registry: Option<NamespacePatch>,
}

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("request body must be a JSON object")]
    BodyNotObject,
    #[error("{namespace} must be a JSON object of key/value pairs")]
    NamespaceNotObject { namespace: Namespace },
    #[error("{namespace} is not valid JSON: {detail}")]
    NamespaceNotJson { namespace: Namespace, detail: String },
    #[error("{namespace}.{key} must be a string, number, boolean or null")]
    UnsupportedValue { namespace: Namespace, key: String },
}

impl ConfigPatch {
    /// Decode a request body.
    ///
    /// Each namespace may appear as a JSON object or as a JSON string
    /// containing an object (the form legacy clients send). Inside a
    /// namespace, `null` unsets a key; strings are taken verbatim; numbers
    /// and booleans are coerced to strings because env vars and limits are
    /// textual end to end. Unknown top-level keys are ignored.
    pub fn from_body(body: &Value) -> Result<Self, PatchError> {
        let mut patch = ConfigPatch::default();
        let object = match body {
            Value::Object(map) => map,
            // Absent body means an empty patch, which commits as a no-op.
            Value::Null => return Ok(patch),
            _ => return Err(PatchError::BodyNotObject),
        };
        for ns in Namespace::ALL {
            let Some(raw) = object.get(ns.as_str()) else {
                continue;
            };
            match raw {
                Value::Null => continue,
                Value::Object(entries) => {
                    *patch.namespace_mut(ns) = Some(decode_entries(ns, entries)?);
                }
                Value::String(embedded) => {
                    let parsed: Value = serde_json::from_str(embedded).map_err(|e| {
                        PatchError::NamespaceNotJson {
                            namespace: ns,
                            detail: e.to_string(),
                        }
                    })?;
                    let Value::Object(entries) = parsed else {
                        return Err(PatchError::NamespaceNotObject { namespace: ns });
                    };
                    *patch.namespace_mut(ns) = Some(decode_entries(ns, &entries)?);
                }
                _ => return Err(PatchError::NamespaceNotObject { namespace: ns }),
            }
        }
        Ok(patch)
    }

    pub fn get(&self, ns: Namespace) -> Option<&NamespacePatch> {
        match ns {
            Namespace::Values => self.values.as_ref(),
            Namespace::Memory => self.memory.as_ref(),
            Namespace::Cpu => self.cpu.as_ref(),
            Namespace::Tags => self.tags.as_ref(),
            Namespace::Registry => self.registry.as_ref(),
        }
    }

    fn namespace_mut(&mut self, ns: Namespace) -> &mut Option<NamespacePatch> {
        match ns {
            Namespace::Values => &mut self.values,
            Namespace::Memory => &mut self.memory,
            Namespace::Cpu => &mut self.cpu,
            Namespace::Tags => &mut self.tags,
            Namespace::Registry => &mut self.registry,
        }
    }

    /// The namespaces this patch touches, in canonical order.
    pub fn namespaces(&self) -> Vec<(Namespace, &NamespacePatch)> {
        Namespace::ALL
            .iter()
            .filter_map(|ns| self.get(*ns).map(|ops| (*ns, ops)))
            .collect()
    }

    /// True when no namespace carries any operation.
    pub fn is_empty(&self) -> bool {
        self.namespaces().iter().all(|(_, ops)| ops.is_empty())
    }

    /// Add a set operation (test and CLI convenience).
    pub fn set(&mut self, ns: Namespace, key: impl Into<String>, value: impl Into<String>) {
        self.namespace_mut(ns)
            .get_or_insert_with(NamespacePatch::new)
            .insert(key.into(), PatchOp::Set(value.into()));
    }

    /// Add an unset operation.
    pub fn unset(&mut self, ns: Namespace, key: impl Into<String>) {
        self.namespace_mut(ns)
            .get_or_insert_with(NamespacePatch::new)
            .insert(key.into(), PatchOp::Unset);
    }
}

fn decode_entries(
    ns: Namespace,
    entries: &serde_json::Map<String, Value>,
) -> Result<NamespacePatch, PatchError> {
    let mut ops = NamespacePatch::new();
    for (key, value) in entries {
        let op = match value {
            Value::Null => PatchOp::Unset,
            Value::String(s) => PatchOp::Set(s.clone()),
            Value::Number(n) => PatchOp::Set(n.to_string()),
            Value::Bool(b) => PatchOp::Set(b.to_string()),
            _ => {
                return Err(PatchError::UnsupportedValue {
                    namespace: ns,
                    key: key.clone(),
                })
            }
        };
        ops.insert(key.clone(), op);
    }
    Ok(ops)
}
