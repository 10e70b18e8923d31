//! String utilities: JSON escaping and line handling.

mod escape;
mod lines;

pub use escape::{escape, escape_char, escape_deltas};
pub use lines::{line_offsets, split_lines};
