//! JSON patch operations produced by the defaulters.
//!
//! Operations serialize as RFC 6902 entries (`{"op": "add", "path": ..., "value": ...}`)
//! so the dispatcher can return them verbatim. [`apply_patches`] applies them
//! to a typed resource, which callers use to preview the mutated object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Patch operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// Set a field that is currently absent
    Add,
    /// Overwrite a field that is currently present
    Replace,
}

/// One field-level patch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    /// JSON pointer to the field, e.g. `/spec/tasks/0/name`
    pub path: String,
    pub value: Value,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn replace(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: value.into(),
        }
    }
}

/// Escape a map key for use as one JSON pointer segment
pub fn escape_pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

fn unescape_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Apply patches in order to a copy of `resource`
pub fn apply_patches<K>(resource: &K, patches: &[PatchOperation]) -> Result<K>
where
    K: Serialize + DeserializeOwned,
{
    let mut document = serde_json::to_value(resource)?;
    for patch in patches {
        apply_one(&mut document, patch)?;
    }
    Ok(serde_json::from_value(document)?)
}

fn apply_one(document: &mut Value, patch: &PatchOperation) -> Result<()> {
    let Some((parent_pointer, token)) = patch.path.rsplit_once('/') else {
        return Err(Error::Patch(format!(
            "path '{}' is not a JSON pointer",
            patch.path
        )));
    };
    let key = unescape_pointer_segment(token);

    let Some(parent) = document.pointer_mut(parent_pointer) else {
        return Err(Error::Patch(format!(
            "parent of '{}' does not exist",
            patch.path
        )));
    };

    match (parent, patch.op) {
        (Value::Object(map), PatchOp::Add) => {
            map.insert(key, patch.value.clone());
        }
        (Value::Object(map), PatchOp::Replace) => match map.get_mut(&key) {
            Some(slot) => *slot = patch.value.clone(),
            None => {
                return Err(Error::Patch(format!(
                    "cannot replace missing field '{}'",
                    patch.path
                )));
            }
        },
        (Value::Array(items), op) => {
            let index = if key == "-" && op == PatchOp::Add {
                items.len()
            } else {
                key.parse::<usize>().map_err(|_| {
                    Error::Patch(format!("invalid array index in '{}'", patch.path))
                })?
            };
            match op {
                PatchOp::Add if index <= items.len() => items.insert(index, patch.value.clone()),
                PatchOp::Replace => match items.get_mut(index) {
                    Some(slot) => *slot = patch.value.clone(),
                    None => {
                        return Err(Error::Patch(format!(
                            "array index out of bounds in '{}'",
                            patch.path
                        )));
                    }
                },
                PatchOp::Add => {
                    return Err(Error::Patch(format!(
                        "array index out of bounds in '{}'",
                        patch.path
                    )));
                }
            }
        }
        _ => {
            return Err(Error::Patch(format!(
                "parent of '{}' is not a container",
                patch.path
            )));
        }
    }
    Ok(())
}
