//! Diff model: entries, validators, text ranges and list helpers.
//!
//! # Wire format
//!
//! ```text
//! {"key": <int>, "op": "addrange", "valuelist": [...]}
//! {"key": <int>, "op": "removerange", "length": <int>}
//! {"key": <string>, "op": "add", "value": <any>}
//! {"key": <string>, "op": "remove"}
//! {"key": <string>, "op": "replace", "value": <any>}
//! {"key": <string|int>, "op": "patch", "diff": [...] | null}
//! ```

pub mod range;
pub mod types;
pub mod util;
pub mod validate;

pub use range::{raw_to_pos, shift_ranges, DiffRange, DiffRangePos, Pos};
pub use types::{ChunkSource, DiffEntry, DiffOp, Key, PatchError, SourceAction, ValueList};
pub use util::{
    combine_diffs, get_diff_entry_by_key, get_sub_diff_by_key, has_entries, label_source,
    sort_by_key, strip_source,
};
pub use validate::{validate_object_diff, validate_object_op, validate_sequence_op};
