//! Diff application.
//!
//! [`patch`] builds the patched value. [`patch_stringified`] builds its
//! rendering together with the byte ranges that were added and removed,
//! which is what the chunker consumes.

pub mod escapes;
pub mod generic;
pub mod string;
pub mod stringified;

pub use escapes::{shift_for_escapes, EscapeMap};
pub use generic::patch;
pub use string::{flatten_string_diff, patch_string, patch_text, TextPatch};
pub use stringified::{patch_stringified, patch_stringified_with, StringifiedPatch};
