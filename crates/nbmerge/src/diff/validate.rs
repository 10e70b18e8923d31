//! Diff entry validators.
//!
//! Each validator checks that applying one entry to a concrete base is
//! well defined. They never touch the base.

use indexmap::IndexSet;

use super::types::{DiffEntry, DiffOp, Key, PatchError};

fn index_key(entry: &DiffEntry) -> Result<usize, PatchError> {
    entry.key.as_index().ok_or_else(|| {
        PatchError::KeyType(format!(
            "sequence op \"{}\" needs an integer key, got \"{}\"",
            entry.op_name(),
            entry.key
        ))
    })
}

/// Validate a sequence op (`addrange`, `removerange` or `patch`) against a
/// base sequence: an array, or the lines of a string.
pub fn validate_sequence_op<T>(base: &[T], entry: &DiffEntry) -> Result<(), PatchError> {
    let key = index_key(entry)?;
    let len = base.len();
    match &entry.op {
        DiffOp::AddRange { .. } => {
            if key > len {
                return Err(PatchError::OutOfRange(format!(
                    "addrange at {key} on a sequence of length {len}"
                )));
            }
        }
        DiffOp::RemoveRange { length } => {
            if key.saturating_add(*length) > len {
                return Err(PatchError::OutOfRange(format!(
                    "removerange of {length} at {key} on a sequence of length {len}"
                )));
            }
        }
        DiffOp::Patch { .. } => {
            if key >= len {
                return Err(PatchError::OutOfRange(format!(
                    "patch at {key} on a sequence of length {len}"
                )));
            }
        }
        DiffOp::Add { .. } | DiffOp::Remove | DiffOp::Replace { .. } => {
            return Err(PatchError::InvalidOp(format!(
                "\"{}\" is not a sequence op",
                entry.op_name()
            )));
        }
    }
    Ok(())
}

/// Validate an object op against the keys of the base that are still
/// present at this point of the diff.
///
/// `add` needs the key absent; `remove`, `replace` and `patch` need it
/// present. Callers shrink `keys` as entries consume fields, which is what
/// lets a `remove` followed by an `add` of the same key act as a replace.
pub fn validate_object_op(entry: &DiffEntry, keys: &IndexSet<String>) -> Result<(), PatchError> {
    let key = match &entry.key {
        Key::Name(k) => k,
        Key::Index(i) => {
            return Err(PatchError::KeyType(format!(
                "object op \"{}\" needs a string key, got {i}",
                entry.op_name()
            )));
        }
    };
    match &entry.op {
        DiffOp::Add { .. } => {
            if keys.contains(key) {
                return Err(PatchError::InvalidOp(format!(
                    "invalid add: key \"{key}\" already present"
                )));
            }
        }
        DiffOp::Remove | DiffOp::Replace { .. } | DiffOp::Patch { .. } => {
            if !keys.contains(key) {
                return Err(PatchError::InvalidOp(format!(
                    "invalid {}: key \"{key}\" not present",
                    entry.op_name()
                )));
            }
        }
        DiffOp::AddRange { .. } | DiffOp::RemoveRange { .. } => {
            return Err(PatchError::InvalidOp(format!(
                "\"{}\" is not an object op",
                entry.op_name()
            )));
        }
    }
    Ok(())
}

/// Validate a whole object diff against the keys of its base, entry by
/// entry, and return the base keys no entry consumed.
pub fn validate_object_diff<'a, I>(base_keys: I, diff: &[DiffEntry]) -> Result<IndexSet<String>, PatchError>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut live: IndexSet<String> = base_keys.into_iter().cloned().collect();
    let mut untouched = live.clone();
    for e in diff {
        validate_object_op(e, &live)?;
        let key = e.key.as_name().unwrap_or_default();
        match e.op {
            DiffOp::Add { .. } => {
                live.insert(key.to_owned());
            }
            _ => {
                live.shift_remove(key);
                untouched.shift_remove(key);
            }
        }
    }
    Ok(untouched)
}
