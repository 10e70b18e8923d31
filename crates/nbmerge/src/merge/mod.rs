//! Three-way merge decisions.
//!
//! # Wire format
//!
//! ```text
//! {
//!   "common_path": [<string|int>, ...],
//!   "local_diff": [<DiffEntry>...] | null,
//!   "remote_diff": [<DiffEntry>...] | null,
//!   "action": "base" | "local" | "remote" | "local_then_remote" | "remote_then_local"
//!           | "custom" | "clear" | "clear_parent" | "either",
//!   "conflict": <bool>,
//!   "custom_diff": [<DiffEntry>...] | null
//! }
//! ```

pub mod chunking;
pub mod decision;
pub mod decisions;

pub use chunking::split_merge_decisions_on_chunks;
pub use decision::{
    Action, DecisionPath, DecisionRef, DiffCollection, MergeDecision, MergeError, NotifyUserError,
    ScopedDecision, Severity,
};
pub use decisions::{
    add_sorted, apply_decisions, build_diffs, clear_all, decision_path_sort_key, empty_like,
    filter_decisions, pop_path, push_patch_decision, push_path, resolve_action, resolve_common_paths,
    sort_decisions, value_at, verify_merged_text, DiffSide,
};
