//! nbmerge: structural diff application and three-way merge resolution for
//! notebook documents modeled as JSON.
//!
//! The engine applies diffs that were computed elsewhere; it never computes
//! a diff between two documents.
//!
//! - [`diff`]: the diff entry model and its validators.
//! - [`patch`]: applying diffs to values, and to their rendered text with
//!   added/removed ranges.
//! - [`chunking`]: grouping those ranges into aligned display chunks.
//! - [`merge`]: merge decisions, their resolution, and splitting them on
//!   chunk boundaries.

// Leaf modules
pub mod diff;
pub mod json_stable;

pub mod patch;
pub mod chunking;
pub mod merge;

pub mod cli;

pub use chunking::{feed_ranges, line_to_normal_chunks, Chunk, ChunkStrategy, Chunker};
pub use diff::{ChunkSource, DiffEntry, DiffOp, DiffRange, DiffRangePos, Key, PatchError, SourceAction, ValueList};
pub use merge::{
    apply_decisions, split_merge_decisions_on_chunks, Action, DecisionRef, MergeDecision, MergeError,
    NotifyUserError, ScopedDecision, Severity,
};
pub use patch::{patch, patch_stringified, StringifiedPatch};
