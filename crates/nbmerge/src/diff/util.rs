//! Helpers over diff lists.

use nbmerge_util::insertion_sort_by;

use super::types::{ChunkSource, DiffEntry, DiffOp, Key};

/// True when `diff` is present and holds at least one entry.
pub fn has_entries(diff: Option<&[DiffEntry]>) -> bool {
    diff.is_some_and(|d| !d.is_empty())
}

/// First entry of `diff` whose key is `key`.
pub fn get_diff_entry_by_key<'a>(diff: &'a [DiffEntry], key: &Key) -> Option<&'a DiffEntry> {
    diff.iter().find(|e| &e.key == key)
}

/// Nested diff of the `patch` entry at `key`, if there is one.
pub fn get_sub_diff_by_key<'a>(diff: &'a [DiffEntry], key: &Key) -> Option<&'a [DiffEntry]> {
    diff.iter().filter(|e| &e.key == key).find_map(DiffEntry::sub_diff)
}

/// Tag every top-level entry that has no source yet.
///
/// Nested entries are left alone: ranges produced below a `patch` entry
/// inherit its source.
pub fn label_source(diff: &mut [DiffEntry], source: ChunkSource) {
    for e in diff.iter_mut() {
        if e.source.is_none() {
            e.source = Some(source);
        }
    }
}

/// Copy of `diff` with every provenance tag removed, recursively.
pub fn strip_source(diff: &[DiffEntry]) -> Vec<DiffEntry> {
    diff.iter()
        .map(|e| {
            let op = match &e.op {
                DiffOp::Patch { diff } => DiffOp::Patch { diff: diff.as_deref().map(strip_source) },
                other => other.clone(),
            };
            DiffEntry { key: e.key.clone(), op, source: None }
        })
        .collect()
}

/// Stable sort by key; entries sharing a key keep their relative order.
pub fn sort_by_key(diff: &mut [DiffEntry]) {
    insertion_sort_by(diff, |a, b| a.key.cmp(&b.key));
}

/// Concatenate `extra` onto `diff`, folding `patch` entries that share a
/// key into a single `patch`, then re-sort by key.
///
/// Entries of a folded nested diff take the source of the `patch` they came
/// from, so provenance survives the fold.
pub fn combine_diffs(diff: &mut Vec<DiffEntry>, extra: Vec<DiffEntry>) {
    for e in extra {
        let existing = diff.iter_mut().find(|d| d.key == e.key && matches!(d.op, DiffOp::Patch { .. }));
        match (existing, e.op) {
            (Some(target), DiffOp::Patch { diff: sub }) => {
                let target_source = target.source;
                if let DiffOp::Patch { diff: inner } = &mut target.op {
                    let mut merged = inner.take().unwrap_or_default();
                    let mut sub = sub.unwrap_or_default();
                    if target_source != e.source {
                        if let Some(src) = target_source {
                            label_source(&mut merged, src);
                        }
                        if let Some(src) = e.source {
                            label_source(&mut sub, src);
                        }
                    }
                    combine_diffs(&mut merged, sub);
                    *inner = Some(merged);
                }
            }
            (_, op) => diff.push(DiffEntry { key: e.key, op, source: e.source }),
        }
    }
    sort_by_key(diff);
}
