//! Patching with a position annotated rendering of the result.
//!
//! [`patch_stringified`] renders the patched value the way
//! [`json_stable::stringify`](crate::json_stable::stringify) would, and
//! reports which byte spans of that text were added, and which spans of the
//! rendering of the base were removed.
//!
//! Containers are laid out as a list of items (array elements or object
//! members). Each diff entry marks a contiguous run of items as changed;
//! the run's range is widened to take in exactly one `,\n` separator so the
//! text outside the deletions of the base lines up with the text outside the
//! additions of the result.

use serde_json::{Map, Value};

use super::escapes::shift_for_escapes;
use super::generic::{array_values, atomic_kind, patch_child};
use super::string::{flatten_string_diff, patch_text};
use crate::diff::{
    validate_object_diff, validate_sequence_op, ChunkSource, DiffEntry, DiffOp, DiffRange, PatchError,
};
use crate::json_stable::{join_items, member_prefix, member_text, sorted_keys, stringify_with, StringifyOptions};

const SEPARATOR: usize = ",\n".len();

/// Rendering of a patched value with the spans that changed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StringifiedPatch {
    /// Rendering of the patched value.
    pub text: String,
    /// Ranges into `text`.
    pub additions: Vec<DiffRange>,
    /// Ranges into the rendering of the base at the same level.
    pub deletions: Vec<DiffRange>,
}

/// Patch `base` and render the result at `level`, with default options.
pub fn patch_stringified(base: &Value, diff: &[DiffEntry], level: usize) -> Result<StringifiedPatch, PatchError> {
    patch_stringified_with(base, diff, level, &StringifyOptions::default())
}

pub fn patch_stringified_with(
    base: &Value,
    diff: &[DiffEntry],
    level: usize,
    opts: &StringifyOptions,
) -> Result<StringifiedPatch, PatchError> {
    match base {
        Value::String(s) => patch_string_rendered(s, diff, level, opts),
        Value::Array(arr) => {
            let (old, new) = sequence_items(arr, diff, level, opts)?;
            Ok(assemble(&old, &new, '[', ']', level, opts))
        }
        Value::Object(obj) => {
            let (old, new) = object_items(obj, diff, level, opts)?;
            Ok(assemble(&old, &new, '{', '}', level, opts))
        }
        other => Err(PatchError::Atomic(atomic_kind(other))),
    }
}

fn patch_string_rendered(
    base: &str,
    diff: &[DiffEntry],
    level: usize,
    opts: &StringifyOptions,
) -> Result<StringifiedPatch, PatchError> {
    let flat = flatten_string_diff(base, diff)?;
    let raw = patch_text(base, &flat)?;
    if level == 0 {
        return Ok(StringifiedPatch { text: raw.text, additions: raw.additions, deletions: raw.deletions });
    }

    let mut additions = raw.additions;
    let mut deletions = raw.deletions;
    shift_for_escapes(&mut additions, &raw.text);
    shift_for_escapes(&mut deletions, base);
    let text = stringify_with(&Value::String(raw.text), level, opts);
    // Indentation plus the opening quote.
    let offset = opts.indent.len() * level + 1;
    for r in additions.iter_mut().chain(deletions.iter_mut()) {
        r.shift(offset);
    }
    Ok(StringifiedPatch { text, additions, deletions })
}

// ── Item layout ───────────────────────────────────────────────────────────

/// One array element or object member in one of the two renderings.
#[derive(Debug, Clone, Default)]
struct Item {
    text: String,
    /// Index of the diff entry that changed this item; `None` when the item
    /// is present in both renderings.
    run: Option<usize>,
    source: Option<ChunkSource>,
    /// Ranges inside `text` reported by a nested patch.
    inner: Vec<DiffRange>,
    /// Offset in `text` of a replaced member's value. Only the value is
    /// reported as changed.
    value_from: Option<usize>,
}

impl Item {
    fn kept(text: String) -> Self {
        Self { text, ..Default::default() }
    }

    fn changed(text: String, run: usize, source: Option<ChunkSource>) -> Self {
        Self { text, run: Some(run), source, ..Default::default() }
    }

    fn patched(text: String, inner: Vec<DiffRange>) -> Self {
        Self { text, inner, ..Default::default() }
    }

    fn replaced(text: String, value_from: usize, run: usize, source: Option<ChunkSource>) -> Self {
        Self { text, run: Some(run), source, value_from: Some(value_from), ..Default::default() }
    }
}

fn inherit_source(ranges: &mut [DiffRange], source: Option<ChunkSource>) {
    for r in ranges.iter_mut() {
        if r.source.is_none() {
            r.source = source;
        }
    }
}

type ItemPair = (Vec<Item>, Vec<Item>);

fn sequence_items(
    base: &[Value],
    diff: &[DiffEntry],
    level: usize,
    opts: &StringifyOptions,
) -> Result<ItemPair, PatchError> {
    let render = |v: &Value| stringify_with(v, level + 1, opts);
    let mut old = Vec::with_capacity(base.len());
    let mut new = Vec::with_capacity(base.len());
    let mut take = 0;
    for (run, e) in diff.iter().enumerate() {
        validate_sequence_op(base, e)?;
        let index = e.key.as_index().unwrap_or_default();
        for v in base.get(take..index).unwrap_or_default() {
            old.push(Item::kept(render(v)));
            new.push(Item::kept(render(v)));
        }
        let skip = match &e.op {
            DiffOp::AddRange { valuelist } => {
                for v in array_values(valuelist)? {
                    new.push(Item::changed(render(v), run, e.source));
                }
                0
            }
            DiffOp::RemoveRange { length } => {
                for v in base.get(take.max(index)..index + length).unwrap_or_default() {
                    old.push(Item::changed(render(v), run, e.source));
                }
                *length
            }
            DiffOp::Patch { diff } => {
                let child = &base[index];
                let nested = patch_stringified_with(child, diff.as_deref().unwrap_or_default(), level + 1, opts)?;
                let StringifiedPatch { text, mut additions, mut deletions } = nested;
                inherit_source(&mut additions, e.source);
                inherit_source(&mut deletions, e.source);
                old.push(Item::patched(render(child), deletions));
                new.push(Item::patched(text, additions));
                1
            }
            _ => 0,
        };
        take = take.max(index + skip);
    }
    for v in base.get(take..).unwrap_or_default() {
        old.push(Item::kept(render(v)));
        new.push(Item::kept(render(v)));
    }
    Ok((old, new))
}

fn object_items(
    base: &Map<String, Value>,
    diff: &[DiffEntry],
    level: usize,
    opts: &StringifyOptions,
) -> Result<ItemPair, PatchError> {
    let child_level = level + 1;
    let member = |k: &str, v: &Value| member_text(k, &stringify_with(v, child_level, opts), child_level, opts);

    validate_object_diff(base.keys(), diff)?;

    let mut all_keys: Vec<&str> = sorted_keys(base);
    for e in diff {
        let key = e.key.as_name().unwrap_or_default();
        if !all_keys.contains(&key) {
            all_keys.push(key);
        }
    }
    nbmerge_util::insertion_sort_by(&mut all_keys, |a, b| a.cmp(b));

    let mut old = Vec::new();
    let mut new = Vec::new();
    for key in all_keys {
        let entries: Vec<(usize, &DiffEntry)> =
            diff.iter().enumerate().filter(|(_, e)| e.key.as_name() == Some(key)).collect();
        if entries.is_empty() {
            // Untouched, so it is in base.
            let text = member(key, &base[key]);
            old.push(Item::kept(text.clone()));
            new.push(Item::kept(text));
            continue;
        }
        for (run, e) in entries {
            match &e.op {
                DiffOp::Add { value } => new.push(Item::changed(member(key, value), run, e.source)),
                DiffOp::Remove => old.push(Item::changed(member(key, &base[key]), run, e.source)),
                DiffOp::Replace { value } => {
                    let value_from = member_prefix(key, child_level, opts).len();
                    old.push(Item::replaced(member(key, &base[key]), value_from, run, e.source));
                    new.push(Item::replaced(member(key, value), value_from, run, e.source));
                }
                DiffOp::Patch { diff } => {
                    let child = &base[key];
                    let nested =
                        patch_stringified_with(child, diff.as_deref().unwrap_or_default(), child_level, opts)?;
                    let StringifiedPatch { text, mut additions, mut deletions } = nested;
                    // The value starts after the key, minus the indentation
                    // the nested rendering already carries.
                    let shift = member_prefix(key, child_level, opts).len() - opts.indent.len() * child_level;
                    for r in additions.iter_mut().chain(deletions.iter_mut()) {
                        r.shift(shift);
                    }
                    inherit_source(&mut additions, e.source);
                    inherit_source(&mut deletions, e.source);
                    old.push(Item::patched(member(key, child), deletions));
                    new.push(Item::patched(member_text(key, &text, child_level, opts), additions));
                }
                _ => {}
            }
        }
    }
    Ok((old, new))
}

// ── Assembly ──────────────────────────────────────────────────────────────

fn assemble(
    old: &[Item],
    new: &[Item],
    open: char,
    close: char,
    level: usize,
    opts: &StringifyOptions,
) -> StringifiedPatch {
    let (_, deletions) = render_items(old, open, close, level, opts);
    let (text, additions) = render_items(new, open, close, level, opts);
    StringifiedPatch { text, additions, deletions }
}

fn render_items(
    items: &[Item],
    open: char,
    close: char,
    level: usize,
    opts: &StringifyOptions,
) -> (String, Vec<DiffRange>) {
    let texts: Vec<&str> = items.iter().map(|it| it.text.as_str()).collect();
    let text = join_items(&texts, open, close, level, opts);
    if items.is_empty() {
        return (text, Vec::new());
    }

    // Start of each item: past the indentation, the bracket and its newline.
    let mut starts = Vec::with_capacity(items.len());
    let mut pos = opts.indent.len() * level + open.len_utf8() + 1;
    for it in items {
        starts.push(pos);
        pos += it.text.len() + SEPARATOR;
    }
    let end_of = |i: usize| starts[i] + items[i].text.len();
    let is_kept = |i: usize| items.get(i).is_some_and(|it| it.run.is_none());

    let mut ranges = Vec::new();
    let mut i = 0;
    while i < items.len() {
        let item = &items[i];
        for r in &item.inner {
            let mut r = *r;
            r.shift(starts[i]);
            ranges.push(r);
        }
        let Some(run) = item.run else {
            i += 1;
            continue;
        };
        if let Some(value_from) = item.value_from {
            ranges.push(DiffRange { from: starts[i] + value_from, to: end_of(i), source: item.source });
            i += 1;
            continue;
        }
        let mut j = i;
        while j + 1 < items.len() && items[j + 1].run == Some(run) {
            j += 1;
        }
        let last = items.len() - 1;
        let (from, to) = if j < last && is_kept(j + 1) {
            (starts[i], starts[j + 1])
        } else if i > 0 && is_kept(i - 1) {
            (end_of(i - 1), end_of(j))
        } else if j < last {
            (starts[i], starts[j + 1])
        } else {
            (starts[i], end_of(j))
        };
        ranges.push(DiffRange { from, to, source: item.source });
        i = j + 1;
    }
    nbmerge_util::insertion_sort_by(&mut ranges, |a, b| a.from.cmp(&b.from));
    (text, ranges)
}
