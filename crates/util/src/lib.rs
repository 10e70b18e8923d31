//! nbmerge-util - leaf helpers shared by the nbmerge engine.
//!
//! JSON string escaping (and the per-character expansion table the
//! position tracking relies on), line splitting that keeps terminators,
//! and a stable insertion sort.

pub mod sort;
pub mod strings;

pub use sort::insertion_sort_by;
pub use strings::{escape, escape_char, escape_deltas, line_offsets, split_lines};
