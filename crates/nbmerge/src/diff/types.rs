//! Core types for the diff module.
//!
//! A diff is an ordered list of [`DiffEntry`] values, each one edit against
//! a single key of a JSON-like value (an array index, an object field, or a
//! line of a string).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────

/// Raised when a diff entry cannot be applied to the value it targets.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Index outside the bounds of the target sequence.
    #[error("OUT_OF_RANGE: {0}")]
    OutOfRange(String),
    /// Key (or payload) of the wrong kind for the target.
    #[error("KEY_TYPE: {0}")]
    KeyType(String),
    /// Unknown op for the target, or a presence/absence precondition
    /// on an object key is violated.
    #[error("INVALID_OP: {0}")]
    InvalidOp(String),
    /// Numbers, booleans and null have no inner structure to patch.
    #[error("ATOMIC: cannot patch an atomic value ({0})")]
    Atomic(&'static str),
}

// ── Keys ──────────────────────────────────────────────────────────────────

/// Position a diff entry or path segment refers to.
///
/// Sequence positions (array indices, string line numbers) sort before
/// object field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl Key {
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Key::Index(_) => None,
            Key::Name(n) => Some(n),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(i) => write!(f, "{i}"),
            Key::Name(n) => f.write_str(n),
        }
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

// ── Value lists ───────────────────────────────────────────────────────────

/// Payload of an `addrange` entry.
///
/// Array and line diffs carry a list of values; character diffs inside a
/// line patch may carry the inserted text as one string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueList {
    Text(String),
    Values(Vec<Value>),
}

impl ValueList {
    /// Number of sequence elements inserted (characters for `Text`).
    pub fn len(&self) -> usize {
        match self {
            ValueList::Text(s) => s.chars().count(),
            ValueList::Values(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ValueList::Text(s) => s.is_empty(),
            ValueList::Values(v) => v.is_empty(),
        }
    }

    /// Concatenated text of the inserted elements, or `None` when one of
    /// them is not a string.
    pub fn joined_text(&self) -> Option<String> {
        match self {
            ValueList::Text(s) => Some(s.clone()),
            ValueList::Values(v) => v.iter().map(|x| x.as_str()).collect(),
        }
    }
}

impl From<Vec<Value>> for ValueList {
    fn from(v: Vec<Value>) -> Self {
        ValueList::Values(v)
    }
}

impl From<&str> for ValueList {
    fn from(s: &str) -> Self {
        ValueList::Text(s.to_owned())
    }
}

// ── Provenance ────────────────────────────────────────────────────────────

/// Which side of a merge decision produced an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceAction {
    Local,
    Remote,
    Custom,
    Either,
}

/// Provenance of a diff entry: the decision (by its index in the list the
/// diff was built from) and the side it came from.
///
/// Local bookkeeping only; never serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkSource {
    pub decision: usize,
    pub action: SourceAction,
}

// ── Entries ───────────────────────────────────────────────────────────────

/// The operation part of a [`DiffEntry`], tagged by `op` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DiffOp {
    /// Insert values before index `key` of a sequence.
    AddRange { valuelist: ValueList },
    /// Remove `length` elements starting at index `key`.
    RemoveRange { length: usize },
    /// Insert object field `key`.
    Add { value: Value },
    /// Delete object field `key`.
    Remove,
    /// Overwrite object field `key`.
    Replace { value: Value },
    /// Recurse into the child at `key`.
    Patch { diff: Option<Vec<DiffEntry>> },
}

/// One atomic edit against a position of a JSON-like value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub key: Key,
    #[serde(flatten)]
    pub op: DiffOp,
    #[serde(skip)]
    pub source: Option<ChunkSource>,
}

impl DiffEntry {
    pub fn new(key: impl Into<Key>, op: DiffOp) -> Self {
        Self { key: key.into(), op, source: None }
    }

    pub fn add_range(key: usize, valuelist: impl Into<ValueList>) -> Self {
        Self::new(key, DiffOp::AddRange { valuelist: valuelist.into() })
    }

    pub fn remove_range(key: usize, length: usize) -> Self {
        Self::new(key, DiffOp::RemoveRange { length })
    }

    pub fn add(key: impl Into<Key>, value: Value) -> Self {
        Self::new(key, DiffOp::Add { value })
    }

    pub fn remove(key: impl Into<Key>) -> Self {
        Self::new(key, DiffOp::Remove)
    }

    pub fn replace(key: impl Into<Key>, value: Value) -> Self {
        Self::new(key, DiffOp::Replace { value })
    }

    pub fn patch(key: impl Into<Key>, diff: Vec<DiffEntry>) -> Self {
        Self::new(key, DiffOp::Patch { diff: Some(diff) })
    }

    pub fn with_source(mut self, source: ChunkSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns the wire name of the operation.
    pub fn op_name(&self) -> &'static str {
        match self.op {
            DiffOp::AddRange { .. } => "addrange",
            DiffOp::RemoveRange { .. } => "removerange",
            DiffOp::Add { .. } => "add",
            DiffOp::Remove => "remove",
            DiffOp::Replace { .. } => "replace",
            DiffOp::Patch { .. } => "patch",
        }
    }

    /// Nested diff of a `patch` entry (`None` for other ops or a null diff).
    pub fn sub_diff(&self) -> Option<&[DiffEntry]> {
        match &self.op {
            DiffOp::Patch { diff } => diff.as_deref(),
            _ => None,
        }
    }

    /// True for `addrange`, the only op that does not consume base elements.
    pub fn is_insertion(&self) -> bool {
        matches!(self.op, DiffOp::AddRange { .. })
    }
}
