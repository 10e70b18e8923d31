//! Sorting utilities.

mod insertion;

pub use insertion::insertion_sort_by;
