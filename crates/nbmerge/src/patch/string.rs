//! Line based string patching.
//!
//! A diff on a string is keyed by line number. Its `patch` entries carry a
//! character level diff keyed by code point index within the line.
//! [`flatten_string_diff`] turns both levels into a single diff keyed by
//! byte offset into the whole string, which [`patch_text`] then applies.

use nbmerge_util::insertion_sort_by;
use nbmerge_util::strings::{line_offsets, split_lines};

use crate::diff::{validate_sequence_op, DiffEntry, DiffOp, DiffRange, PatchError, ValueList};

/// Result of patching raw text: the new text plus what was inserted (into
/// the new text) and removed (from the old text).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextPatch {
    pub text: String,
    pub additions: Vec<DiffRange>,
    pub deletions: Vec<DiffRange>,
}

fn inserted_text(valuelist: &ValueList) -> Result<String, PatchError> {
    valuelist
        .joined_text()
        .ok_or_else(|| PatchError::KeyType("string addrange needs string values".into()))
}

// Byte offset of code point `ch` in `line`; `ch == char count` is the end.
fn char_to_byte(line: &str, ch: usize) -> Result<usize, PatchError> {
    if ch == 0 {
        return Ok(0);
    }
    match line.char_indices().nth(ch) {
        Some((b, _)) => Ok(b),
        None if line.chars().count() == ch => Ok(line.len()),
        None => Err(PatchError::OutOfRange(format!(
            "character {ch} on a line of {} characters",
            line.chars().count()
        ))),
    }
}

fn flatten_line_patch(
    line: &str,
    line_start: usize,
    diff: &[DiffEntry],
    parent: &DiffEntry,
    out: &mut Vec<DiffEntry>,
) -> Result<(), PatchError> {
    let chars: Vec<char> = line.chars().collect();
    for e in diff {
        validate_sequence_op(&chars, e)?;
        let ch = e.key.as_index().unwrap_or_default();
        let from = char_to_byte(line, ch)?;
        let op = match &e.op {
            DiffOp::AddRange { valuelist } => DiffOp::AddRange { valuelist: ValueList::Text(inserted_text(valuelist)?) },
            DiffOp::RemoveRange { length } => {
                let to = char_to_byte(line, ch + length)?;
                DiffOp::RemoveRange { length: to - from }
            }
            _ => {
                return Err(PatchError::InvalidOp(format!(
                    "\"{}\" inside a line patch",
                    e.op_name()
                )))
            }
        };
        out.push(DiffEntry {
            key: (line_start + from).into(),
            op,
            source: e.source.or(parent.source),
        });
    }
    Ok(())
}

/// Convert a line keyed diff on `base` into a byte keyed one.
///
/// `addrange` entries become a single text insertion at the start of the
/// line, `removerange` entries cover the removed lines' bytes, and `patch`
/// entries are replaced by their character edits shifted to the line's
/// offset. Character edits without a source take the source of the line
/// patch that holds them.
pub fn flatten_string_diff(base: &str, diff: &[DiffEntry]) -> Result<Vec<DiffEntry>, PatchError> {
    let lines = split_lines(base);
    let offsets = line_offsets(&lines);
    let mut flat = Vec::with_capacity(diff.len());
    for e in diff {
        validate_sequence_op(&lines, e)?;
        let line = e.key.as_index().unwrap_or_default();
        let start = offsets[line];
        match &e.op {
            DiffOp::AddRange { valuelist } => flat.push(DiffEntry {
                key: start.into(),
                op: DiffOp::AddRange { valuelist: ValueList::Text(inserted_text(valuelist)?) },
                source: e.source,
            }),
            DiffOp::RemoveRange { length } => flat.push(DiffEntry {
                key: start.into(),
                op: DiffOp::RemoveRange { length: offsets[line + length] - start },
                source: e.source,
            }),
            DiffOp::Patch { diff } => {
                flatten_line_patch(lines[line], start, diff.as_deref().unwrap_or_default(), e, &mut flat)?
            }
            // Rejected by the validator.
            _ => {}
        }
    }
    insertion_sort_by(&mut flat, |a, b| a.key.cmp(&b.key));
    Ok(flat)
}

/// Apply a byte keyed diff (as produced by [`flatten_string_diff`]) to
/// `base`, recording the inserted and removed spans.
pub fn patch_text(base: &str, flat: &[DiffEntry]) -> Result<TextPatch, PatchError> {
    let mut out = TextPatch { text: String::with_capacity(base.len()), ..Default::default() };
    let mut take = 0;
    for e in flat {
        let index = e.key.as_index().ok_or_else(|| {
            PatchError::KeyType(format!("text op \"{}\" needs an integer key", e.op_name()))
        })?;
        if index > base.len() || !base.is_char_boundary(index) {
            return Err(PatchError::OutOfRange(format!("offset {index} in a text of {} bytes", base.len())));
        }
        if take < index {
            out.text.push_str(&base[take..index]);
        }
        let skip = match &e.op {
            DiffOp::AddRange { valuelist } => {
                let text = inserted_text(valuelist)?;
                if !text.is_empty() {
                    out.additions.push(DiffRange::new(out.text.len(), text.len(), e.source));
                    out.text.push_str(&text);
                }
                0
            }
            DiffOp::RemoveRange { length } => {
                let end = index + length;
                if end > base.len() || !base.is_char_boundary(end) {
                    return Err(PatchError::OutOfRange(format!(
                        "removal of {length} bytes at {index} in a text of {} bytes",
                        base.len()
                    )));
                }
                let start = take.max(index);
                if end > start {
                    out.deletions.push(DiffRange { from: start, to: end, source: e.source });
                }
                *length
            }
            _ => {
                return Err(PatchError::InvalidOp(format!("\"{}\" is not a text op", e.op_name())));
            }
        };
        take = take.max(index + skip);
    }
    if take < base.len() {
        out.text.push_str(&base[take..]);
    }
    Ok(out)
}

/// Patch a string with a line keyed diff.
pub fn patch_string(base: &str, diff: &[DiffEntry]) -> Result<String, PatchError> {
    let flat = flatten_string_diff(base, diff)?;
    Ok(patch_text(base, &flat)?.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_line_ops() {
        let base = "one\ntwo\nthree\n";
        let diff = vec![
            DiffEntry::add_range(1, vec![json!("new\n")]),
            DiffEntry::remove_range(1, 1),
        ];
        let flat = flatten_string_diff(base, &diff).unwrap();
        assert_eq!(flat[0], DiffEntry::add_range(4, "new\n"));
        assert_eq!(flat[1], DiffEntry::remove_range(4, 4));
    }

    #[test]
    fn flatten_char_patch_uses_code_points() {
        let base = "ab\néx\n";
        let diff = vec![DiffEntry::patch(1, vec![DiffEntry::remove_range(1, 1)])];
        let flat = flatten_string_diff(base, &diff).unwrap();
        // "é" is two bytes, so character 1 of line 1 is at byte 3 + 2.
        assert_eq!(flat, vec![DiffEntry::remove_range(5, 1)]);
    }

    #[test]
    fn patch_lines() {
        let base = "a\nb\nc\n";
        let diff = vec![
            DiffEntry::remove_range(1, 1),
            DiffEntry::add_range(1, vec![json!("x\n"), json!("y\n")]),
        ];
        assert_eq!(patch_string(base, &diff).unwrap(), "a\nx\ny\nc\n");
    }

    #[test]
    fn patch_characters_within_line() {
        let base = "hello\nworld";
        let diff = vec![DiffEntry::patch(
            1,
            vec![DiffEntry::remove_range(0, 1), DiffEntry::add_range(0, "W")],
        )];
        assert_eq!(patch_string(base, &diff).unwrap(), "hello\nWorld");
    }

    #[test]
    fn ranges_point_at_changed_text() {
        let base = "a\nb\nc\n";
        let flat = flatten_string_diff(
            base,
            &[DiffEntry::remove_range(1, 1), DiffEntry::add_range(1, vec![json!("x\n")])],
        )
        .unwrap();
        let res = patch_text(base, &flat).unwrap();
        assert_eq!(res.text, "a\nx\nc\n");
        assert_eq!(res.deletions[0].slice(base), "b\n");
        assert_eq!(res.additions[0].slice(&res.text), "x\n");
    }

    #[test]
    fn append_after_last_line() {
        let base = "a\n";
        let res = patch_string(base, &[DiffEntry::add_range(1, vec![json!("b")])]).unwrap();
        assert_eq!(res, "a\nb");
    }

    #[test]
    fn rejects_out_of_range_line() {
        let r = patch_string("a\n", &[DiffEntry::remove_range(1, 1)]);
        assert!(matches!(r, Err(PatchError::OutOfRange(_))));
    }

    #[test]
    fn rejects_non_string_lines() {
        let r = patch_string("a\n", &[DiffEntry::add_range(0, vec![json!(1)])]);
        assert!(matches!(r, Err(PatchError::KeyType(_))));
    }
}
