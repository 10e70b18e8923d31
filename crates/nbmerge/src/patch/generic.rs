//! Structural patching of JSON values.

use serde_json::{Map, Value};

use super::string::patch_string;
use crate::diff::{validate_object_diff, validate_sequence_op, DiffEntry, DiffOp, PatchError, ValueList};

pub(crate) fn atomic_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn array_values(valuelist: &ValueList) -> Result<&[Value], PatchError> {
    match valuelist {
        ValueList::Values(v) => Ok(v),
        ValueList::Text(_) => Err(PatchError::KeyType("array addrange needs a list of values".into())),
    }
}

/// Apply `diff` to `base`, returning a new value.
///
/// Strings are patched line by line, arrays and objects structurally.
/// Numbers, booleans and null cannot be patched.
pub fn patch(base: &Value, diff: &[DiffEntry]) -> Result<Value, PatchError> {
    match base {
        Value::String(s) => Ok(Value::String(patch_string(s, diff)?)),
        Value::Array(arr) => Ok(Value::Array(patch_sequence(arr, diff)?)),
        Value::Object(obj) => Ok(Value::Object(patch_object(obj, diff)?)),
        other => Err(PatchError::Atomic(atomic_kind(other))),
    }
}

/// Patch the value of a `patch` entry; a null diff leaves it unchanged.
pub(crate) fn patch_child(base: &Value, diff: Option<&[DiffEntry]>) -> Result<Value, PatchError> {
    match diff {
        Some(d) => patch(base, d),
        None => Ok(base.clone()),
    }
}

fn patch_sequence(base: &[Value], diff: &[DiffEntry]) -> Result<Vec<Value>, PatchError> {
    let mut patched = Vec::with_capacity(base.len());
    let mut take = 0;
    for e in diff {
        validate_sequence_op(base, e)?;
        let index = e.key.as_index().unwrap_or_default();
        if take < index {
            patched.extend_from_slice(&base[take..index]);
        }
        let skip = match &e.op {
            DiffOp::AddRange { valuelist } => {
                patched.extend_from_slice(array_values(valuelist)?);
                0
            }
            DiffOp::RemoveRange { length } => *length,
            DiffOp::Patch { diff } => {
                patched.push(patch_child(&base[index], diff.as_deref())?);
                1
            }
            // Rejected by the validator.
            _ => 0,
        };
        take = take.max(index + skip);
    }
    if take < base.len() {
        patched.extend_from_slice(&base[take..]);
    }
    Ok(patched)
}

fn patch_object(base: &Map<String, Value>, diff: &[DiffEntry]) -> Result<Map<String, Value>, PatchError> {
    let keys_to_copy = validate_object_diff(base.keys(), diff)?;
    let mut changed = Map::new();
    for e in diff {
        let key = e.key.as_name().unwrap_or_default();
        match &e.op {
            DiffOp::Add { value } | DiffOp::Replace { value } => {
                changed.insert(key.to_owned(), value.clone());
            }
            DiffOp::Patch { diff } => {
                changed.insert(key.to_owned(), patch_child(&base[key], diff.as_deref())?);
            }
            _ => {}
        }
    }

    // Base order first, then fields the diff added.
    let mut patched = Map::new();
    for (k, v) in base {
        if let Some(nv) = changed.remove(k) {
            patched.insert(k.clone(), nv);
        } else if keys_to_copy.contains(k) {
            patched.insert(k.clone(), v.clone());
        }
    }
    patched.extend(changed);
    Ok(patched)
}
