//! Splitting decisions along chunk boundaries.
//!
//! A decision on a sequence (an array, or the lines of a string) may carry
//! several independent edits. Displayed chunk by chunk, each chunk must be
//! resolvable on its own, so such a decision is split into one decision per
//! chunk the line chunker draws over its local and remote diffs.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::decision::{DecisionRef, MergeDecision, MergeError};
use super::decisions::{build_diffs, value_at, DiffSide};
use crate::chunking::{feed_ranges, Chunk, Chunker};
use crate::diff::{raw_to_pos, strip_source, ChunkSource, DiffEntry, SourceAction};
use crate::json_stable::stringify;
use crate::patch::patch_stringified;

// Copy of `diff` where each entry's source carries its own index in place
// of a decision index, so chunks can be traced back to entries.
fn tag_entries(diff: Option<&[DiffEntry]>, action: SourceAction) -> Option<Vec<DiffEntry>> {
    diff.map(|d| {
        let mut tagged = strip_source(d);
        for (i, e) in tagged.iter_mut().enumerate() {
            e.source = Some(ChunkSource { decision: i, action });
        }
        tagged
    })
}

// Line chunks of one side of `tagged`, applied on its own to `subject`.
fn side_chunks(subject: &Value, tagged: &MergeDecision, side: DiffSide) -> Result<Vec<Chunk>, MergeError> {
    let diff = build_diffs(subject, std::slice::from_ref(tagged), side)?;
    let res = patch_stringified(subject, &diff, 0)?;
    let base_text = stringify(subject, 0);
    let mut chunker = Chunker::line_based();
    feed_ranges(&mut chunker, &raw_to_pos(&res.additions, &res.text), &raw_to_pos(&res.deletions, &base_text));
    Ok(chunker.finish())
}

// Chunks of the two sides belong together when their base spans overlap,
// or touch unless both are pure deletions.
fn touches(a: &Chunk, b: &Chunk) -> bool {
    let (x, y) = if a.base_from <= b.base_from { (a, b) } else { (b, a) };
    y.base_from < x.base_to || (y.base_from == x.base_to && !(x.is_pure_deletion() && y.is_pure_deletion()))
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

fn union(parent: &mut [usize], a: usize, b: usize) {
    let (ra, rb) = (find(parent, a), find(parent, b));
    if ra != rb {
        parent[ra.max(rb)] = ra.min(rb);
    }
}

/// Chunk groups of one decision, ordered by base line, and the group each
/// tagged entry falls in.
struct Layout {
    groups: usize,
    entry_group: HashMap<(SourceAction, usize), usize>,
}

fn layout(local: Vec<Chunk>, remote: Vec<Chunk>) -> Layout {
    let nodes: Vec<(SourceAction, Chunk)> = local
        .into_iter()
        .map(|c| (SourceAction::Local, c))
        .chain(remote.into_iter().map(|c| (SourceAction::Remote, c)))
        .collect();
    let mut parent: Vec<usize> = (0..nodes.len()).collect();

    for i in 0..nodes.len() {
        for j in i + 1..nodes.len() {
            if nodes[i].0 != nodes[j].0 && touches(&nodes[i].1, &nodes[j].1) {
                union(&mut parent, i, j);
            }
        }
    }
    // An entry spread over several chunks holds them together.
    let mut first_node: HashMap<(SourceAction, usize), usize> = HashMap::new();
    for (i, (_, chunk)) in nodes.iter().enumerate() {
        for s in &chunk.sources {
            match first_node.get(&(s.action, s.decision)) {
                Some(&j) => union(&mut parent, i, j),
                None => {
                    first_node.insert((s.action, s.decision), i);
                }
            }
        }
    }

    // Number the groups by their first base line.
    let mut roots: Vec<(usize, usize)> = Vec::new();
    for i in 0..nodes.len() {
        let root = find(&mut parent, i);
        match roots.iter_mut().find(|(r, _)| *r == root) {
            Some(entry) => entry.1 = entry.1.min(nodes[i].1.base_from),
            None => roots.push((root, nodes[i].1.base_from)),
        }
    }
    nbmerge_util::insertion_sort_by(&mut roots, |a, b| a.1.cmp(&b.1));

    let mut entry_group = HashMap::with_capacity(first_node.len());
    for (entry, node) in first_node {
        let root = find(&mut parent, node);
        if let Some(g) = roots.iter().position(|(r, _)| *r == root) {
            entry_group.insert(entry, g);
        }
    }
    Layout { groups: roots.len(), entry_group }
}

// Group of a sequence key: the last group starting at or before it.
fn group_of(starts: &[Option<usize>], key: usize) -> usize {
    starts.iter().rposition(|s| s.is_some_and(|s| s <= key)).unwrap_or(0)
}

fn split_one(base: &Value, md: &MergeDecision) -> Option<Vec<MergeDecision>> {
    let subject = value_at(base, md.local_path()).ok()?;
    if !(subject.is_array() || subject.is_string()) {
        return None;
    }

    let mut tagged = md.clone();
    tagged.local_diff = tag_entries(md.local_diff.as_deref(), SourceAction::Local);
    tagged.remote_diff = tag_entries(md.remote_diff.as_deref(), SourceAction::Remote);
    tagged.level = tagged.path.len();
    let local = side_chunks(subject, &tagged, DiffSide::Local).ok()?;
    let remote = side_chunks(subject, &tagged, DiffSide::Remote).ok()?;
    let layout = layout(local, remote);
    if layout.groups < 2 {
        return None;
    }

    // Entries are assigned by the chunks they produced; the few that
    // produce no text, and custom entries, go by their key.
    let sides = [
        (SourceAction::Local, md.local_diff.as_deref().unwrap_or_default()),
        (SourceAction::Remote, md.remote_diff.as_deref().unwrap_or_default()),
    ];
    let mut starts: Vec<Option<usize>> = vec![None; layout.groups];
    for (action, diff) in sides {
        for (i, e) in diff.iter().enumerate() {
            if let (Some(&g), Some(k)) = (layout.entry_group.get(&(action, i)), e.key.as_index()) {
                starts[g] = Some(starts[g].map_or(k, |s| s.min(k)));
            }
        }
    }
    let place = |action: SourceAction, i: usize, e: &DiffEntry| {
        layout
            .entry_group
            .get(&(action, i))
            .copied()
            .unwrap_or_else(|| group_of(&starts, e.key.as_index().unwrap_or_default()))
    };

    let mut out: Vec<MergeDecision> = (0..layout.groups)
        .map(|_| MergeDecision { local_diff: None, remote_diff: None, custom_diff: None, ..md.clone() })
        .collect();
    for (action, diff) in sides {
        for (i, e) in diff.iter().enumerate() {
            let dec = &mut out[place(action, i, e)];
            let slot = match action {
                SourceAction::Local => &mut dec.local_diff,
                _ => &mut dec.remote_diff,
            };
            slot.get_or_insert_with(Vec::new).push(e.clone());
        }
    }
    for e in md.custom_diff.as_deref().unwrap_or_default() {
        let g = group_of(&starts, e.key.as_index().unwrap_or_default());
        out[g].custom_diff.get_or_insert_with(Vec::new).push(e.clone());
    }
    debug!(path = ?md.path, chunks = layout.groups, "splitting decision");
    Some(out)
}

/// Split every decision whose edits fall into more than one display chunk
/// into one decision per chunk, keeping its action and conflict flag.
///
/// Chunks are drawn by the line chunker over the local and remote diffs of
/// the decision applied on its own; chunks of the two sides that meet are
/// one chunk. Custom diffs are split on the chunk start keys. Decisions
/// whose subject is not a sequence, or whose edits form a single chunk,
/// pass through unchanged.
pub fn split_merge_decisions_on_chunks<D: DecisionRef>(base: &Value, decisions: &[D]) -> Vec<MergeDecision> {
    let mut out = Vec::with_capacity(decisions.len());
    for d in decisions {
        let mut md = d.decision().clone();
        md.level = d.level();
        match split_one(base, &md) {
            Some(parts) => out.extend(parts),
            None => out.push(md),
        }
    }
    out
}
