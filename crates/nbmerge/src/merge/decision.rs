//! The merge decision model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::diff::{DiffEntry, Key, PatchError};

// ── Errors ────────────────────────────────────────────────────────────────

/// A decision list that cannot be resolved.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MergeError {
    /// The decision's diffs cannot be resolved under its action, or the
    /// decision list breaks an ordering precondition.
    #[error("INVALID_DECISION: {0}")]
    InvalidDecision(String),
    /// A decision path does not resolve in the document.
    #[error("INVALID_PATH: {0}")]
    Path(String),
    #[error(transparent)]
    Patch(#[from] PatchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        })
    }
}

/// A valid outcome that a user interface should surface.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{severity}: {message}")]
pub struct NotifyUserError {
    pub message: String,
    pub severity: Severity,
}

impl NotifyUserError {
    pub fn error(message: impl Into<String>) -> Self {
        Self { message: message.into(), severity: Severity::Error }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { message: message.into(), severity: Severity::Warning }
    }
}

// ── Decisions ─────────────────────────────────────────────────────────────

/// How a decision is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    #[default]
    Base,
    Local,
    Remote,
    LocalThenRemote,
    RemoteThenLocal,
    Custom,
    Clear,
    ClearParent,
    Either,
}

/// Keys from the document root to a decision's subject.
pub type DecisionPath = Vec<Key>;

/// Up to three diffs of one decision: local, remote and, when present,
/// custom.
pub type DiffCollection = Vec<Option<Vec<DiffEntry>>>;

/// One unit of three-way merge resolution.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MergeDecision {
    #[serde(rename = "common_path", default)]
    pub path: DecisionPath,
    #[serde(default)]
    pub local_diff: Option<Vec<DiffEntry>>,
    #[serde(default)]
    pub remote_diff: Option<Vec<DiffEntry>>,
    #[serde(default)]
    pub action: Action,
    #[serde(default)]
    pub conflict: bool,
    #[serde(default)]
    pub custom_diff: Option<Vec<DiffEntry>>,
    /// Leading path segments already consumed by an enclosing scope.
    #[serde(skip)]
    pub level: usize,
}

impl MergeDecision {
    pub fn new(
        path: DecisionPath,
        local_diff: Option<Vec<DiffEntry>>,
        remote_diff: Option<Vec<DiffEntry>>,
        action: Action,
        conflict: bool,
    ) -> Self {
        Self { path, local_diff, remote_diff, action, conflict, ..Self::default() }
    }

    /// Decode one decision from its wire form.
    pub fn from_wire(value: Value) -> Result<Self, MergeError> {
        serde_json::from_value(value).map_err(|e| MergeError::InvalidDecision(e.to_string()))
    }

    /// Decode a decision list from its wire form.
    pub fn list_from_wire(value: Value) -> Result<Vec<Self>, MergeError> {
        serde_json::from_value(value).map_err(|e| MergeError::InvalidDecision(e.to_string()))
    }

    /// Wire form; provenance tags are dropped.
    pub fn to_wire(&self) -> Result<Value, MergeError> {
        serde_json::to_value(self).map_err(|e| MergeError::InvalidDecision(e.to_string()))
    }

    /// The part of `path` below the enclosing scope.
    pub fn local_path(&self) -> &[Key] {
        &self.path[self.level.min(self.path.len())..]
    }

    /// Smallest key touched by the local or remote diff.
    pub fn first_key(&self) -> Option<&Key> {
        [&self.local_diff, &self.remote_diff]
            .into_iter()
            .flatten()
            .filter_map(|d| d.first().map(|e| &e.key))
            .min()
    }

    pub fn diffs(&self) -> DiffCollection {
        let mut diffs = vec![self.local_diff.clone(), self.remote_diff.clone()];
        if self.custom_diff.is_some() {
            diffs.push(self.custom_diff.clone());
        }
        diffs
    }

    pub fn set_diffs(&mut self, diffs: DiffCollection) {
        let mut it = diffs.into_iter();
        self.local_diff = it.next().flatten();
        self.remote_diff = it.next().flatten();
        self.custom_diff = it.next().flatten();
    }

    /// Record a manual resolution.
    pub fn resolve(&mut self, action: Action) {
        self.action = action;
        self.conflict = false;
    }
}

// ── Scoped views ──────────────────────────────────────────────────────────

/// Read access to a decision together with the scope level its path is
/// interpreted at.
pub trait DecisionRef {
    fn decision(&self) -> &MergeDecision;

    fn level(&self) -> usize;

    fn local_path(&self) -> &[Key] {
        let path = &self.decision().path;
        &path[self.level().min(path.len())..]
    }
}

impl DecisionRef for MergeDecision {
    fn decision(&self) -> &MergeDecision {
        self
    }

    fn level(&self) -> usize {
        self.level
    }
}

impl<D: DecisionRef + ?Sized> DecisionRef for &D {
    fn decision(&self) -> &MergeDecision {
        (**self).decision()
    }

    fn level(&self) -> usize {
        (**self).level()
    }
}

/// A decision seen from a subtree: the first `level` path segments lead to
/// the subtree root.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScopedDecision<'a> {
    pub inner: &'a MergeDecision,
    pub level: usize,
}

impl DecisionRef for ScopedDecision<'_> {
    fn decision(&self) -> &MergeDecision {
        self.inner
    }

    fn level(&self) -> usize {
        self.level
    }
}
