//! Operations over merge decision lists: path normalization, filtering,
//! ordering, application and diff extraction.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use nbmerge_util::insertion_sort_by;
use nbmerge_util::strings::split_lines;
use serde_json::Value;
use tracing::{debug, trace};

use super::decision::{
    Action, DecisionRef, DiffCollection, MergeDecision, MergeError, NotifyUserError, ScopedDecision,
};
use crate::diff::{combine_diffs, label_source, sort_by_key, ChunkSource, DiffEntry, DiffOp, Key, PatchError, SourceAction};
use crate::json_stable::{sorted_keys, stringify};
use crate::patch::generic::atomic_kind;
use crate::patch::patch;

// ── Paths ─────────────────────────────────────────────────────────────────

fn step<'a>(value: &'a Value, key: &Key) -> Option<&'a Value> {
    match (value, key) {
        (Value::Array(a), Key::Index(i)) => a.get(*i),
        (Value::Object(o), Key::Name(n)) => o.get(n),
        _ => None,
    }
}

fn path_error(path: &[Key]) -> MergeError {
    let shown: Vec<String> = path.iter().map(Key::to_string).collect();
    MergeError::Path(format!("no value at /{}", shown.join("/")))
}

/// The value at `path` below `root`.
pub fn value_at<'a>(root: &'a Value, path: &[Key]) -> Result<&'a Value, MergeError> {
    path.iter().try_fold(root, |v, k| step(v, k)).ok_or_else(|| path_error(path))
}

fn value_at_mut<'a>(root: &'a mut Value, path: &[Key]) -> Result<&'a mut Value, MergeError> {
    let mut cur = root;
    for k in path {
        cur = match (cur, k) {
            (Value::Array(a), Key::Index(i)) => a.get_mut(*i),
            (Value::Object(o), Key::Name(n)) => o.get_mut(n),
            _ => None,
        }
        .ok_or_else(|| path_error(path))?;
    }
    Ok(cur)
}

// Number of leading segments of `path` that address JSON values: the walk
// stops once it reaches a string, whose remaining keys index lines.
fn structural_len(root: &Value, path: &[Key]) -> usize {
    let mut cur = root;
    for (i, k) in path.iter().enumerate() {
        if cur.is_string() {
            return i;
        }
        match step(cur, k) {
            Some(v) => cur = v,
            None => break,
        }
    }
    path.len()
}

// Scope `d` to a path that ends at a JSON value, folding any line keys back
// into the diffs.
fn scoped<D: DecisionRef>(root: &Value, d: &D) -> Result<(Vec<Key>, MergeDecision), MergeError> {
    let local = d.local_path();
    let keep = structural_len(root, local);
    if keep < local.len() {
        let dec = push_patch_decision(d.decision(), &local[keep..])?;
        Ok((local[..keep].to_vec(), dec))
    } else {
        Ok((local.to_vec(), d.decision().clone()))
    }
}

/// If every non-empty diff is a single `patch` of the same key, strip that
/// wrapper and return the key with the inner diffs.
///
/// Unless `pop_inner` is set, each inner diff must itself hold exactly one
/// entry.
pub fn pop_path(diffs: &DiffCollection, pop_inner: bool) -> Option<(Key, DiffCollection)> {
    let mut present = diffs.iter().flatten().filter(|d| !d.is_empty());
    let key = present.next()?.first()?.key.clone();
    for d in diffs.iter().flatten().filter(|d| !d.is_empty()) {
        let e = &d[0];
        if d.len() != 1 || e.key != key || !matches!(e.op, DiffOp::Patch { .. }) {
            return None;
        }
        if !pop_inner && e.sub_diff().map_or(true, |s| s.len() != 1) {
            return None;
        }
    }
    let inner = diffs
        .iter()
        .map(|d| match d {
            Some(d) if !d.is_empty() => d[0].sub_diff().map(<[DiffEntry]>::to_vec),
            _ => None,
        })
        .collect();
    Some((key, inner))
}

/// Wrap each present diff in `patch` entries for `prefix`, outermost first.
pub fn push_path(diffs: DiffCollection, prefix: &[Key]) -> DiffCollection {
    prefix.iter().rev().fold(diffs, |acc, key| {
        acc.into_iter().map(|d| d.map(|d| vec![DiffEntry::patch(key.clone(), d)])).collect()
    })
}

/// Move single-`patch` wrappers from the diffs into each decision's path,
/// as far as they go.
pub fn resolve_common_paths(decisions: &mut [MergeDecision]) {
    for md in decisions.iter_mut() {
        let mut diffs = md.diffs();
        let mut popped = Vec::new();
        while let Some((key, inner)) = pop_path(&diffs, false) {
            popped.push(key);
            diffs = inner;
        }
        if !popped.is_empty() {
            trace!(path = ?md.path, ?popped, "folded patch wrappers into path");
            md.path.extend(popped);
            md.set_diffs(diffs);
        }
    }
}

/// Copy of `decision` with the trailing `prefix` of its path moved back
/// into its diffs as `patch` wrappers.
pub fn push_patch_decision(decision: &MergeDecision, prefix: &[Key]) -> Result<MergeDecision, MergeError> {
    let mut dec = decision.clone();
    let mut diffs = dec.diffs();
    for key in prefix.iter().rev() {
        let popped = dec
            .path
            .pop()
            .ok_or_else(|| MergeError::Path(format!("cannot remove key {key} from an empty decision path")))?;
        if &popped != key {
            return Err(MergeError::Path(format!("cannot push patch decision: {popped} != {key}")));
        }
        diffs = push_path(diffs, std::slice::from_ref(key));
    }
    dec.set_diffs(diffs);
    dec.level = dec.level.min(dec.path.len());
    Ok(dec)
}

// ── Filtering and order ───────────────────────────────────────────────────

/// Decisions whose path, after `skip_levels` segments, starts with `path`,
/// scoped to the matched subtree. `max_length` bounds the full path length.
pub fn filter_decisions<'a>(
    decisions: &'a [MergeDecision],
    path: &[Key],
    skip_levels: usize,
    max_length: Option<usize>,
) -> Vec<ScopedDecision<'a>> {
    let level = skip_levels + path.len();
    decisions
        .iter()
        .filter(|md| md.path.len() >= level && md.path[skip_levels..level] == *path)
        .filter(|md| max_length.map_or(true, |m| md.path.len() <= m))
        .map(|md| ScopedDecision { inner: md, level })
        .collect()
}

/// Deeper paths first; paths of equal depth in key order.
pub fn decision_path_sort_key(a: &MergeDecision, b: &MergeDecision) -> Ordering {
    b.path.len().cmp(&a.path.len()).then_with(|| a.path.cmp(&b.path))
}

/// Stable sort by [`decision_path_sort_key`].
pub fn sort_decisions(decisions: &mut [MergeDecision]) {
    insertion_sort_by(decisions, decision_path_sort_key);
}

/// Insert `to_add` at its sorted position. Among decisions on the same
/// path, `first_key` (the smallest key `to_add` touches) orders it; another
/// decision on that same key is an error.
pub fn add_sorted(
    decisions: &mut Vec<MergeDecision>,
    to_add: MergeDecision,
    first_key: Option<&Key>,
) -> Result<(), MergeError> {
    let mut idx = 0;
    while idx < decisions.len() {
        match decision_path_sort_key(&decisions[idx], &to_add) {
            Ordering::Greater => break,
            Ordering::Equal => {
                if let (Some(fk), Some(k)) = (first_key, decisions[idx].first_key()) {
                    match k.cmp(fk) {
                        Ordering::Equal => {
                            return Err(MergeError::InvalidDecision(format!(
                                "multiple decisions on key {fk}"
                            )));
                        }
                        Ordering::Greater => break,
                        Ordering::Less => {}
                    }
                }
            }
            Ordering::Less => {}
        }
        idx += 1;
    }
    decisions.insert(idx, to_add);
    Ok(())
}

// ── Resolution ────────────────────────────────────────────────────────────

/// Empty value of the same kind: `[]`, `""`, `{}`, or null.
pub fn empty_like(value: &Value) -> Value {
    match value {
        Value::Array(_) => Value::Array(Vec::new()),
        Value::String(_) => Value::String(String::new()),
        Value::Object(_) => Value::Object(Default::default()),
        _ => Value::Null,
    }
}

fn clear_conflict(subject: &Value, decision: &MergeDecision) -> Result<Vec<DiffEntry>, MergeError> {
    let entries: Vec<&DiffEntry> = [&decision.local_diff, &decision.remote_diff]
        .into_iter()
        .flatten()
        .flatten()
        .collect();
    let Some(first) = entries.first() else {
        return Ok(Vec::new());
    };
    let key = &first.key;
    if entries.iter().any(|e| &e.key != key) {
        return Err(MergeError::InvalidDecision("cannot clear a decision touching several keys".into()));
    }
    match key {
        Key::Name(name) => {
            let obj = subject
                .as_object()
                .ok_or_else(|| MergeError::InvalidDecision(format!("key \"{name}\" on a non-object")))?;
            let entry = match obj.get(name) {
                Some(v) => DiffEntry::replace(name.as_str(), empty_like(v)),
                None => {
                    let added = entries.iter().find_map(|e| match &e.op {
                        DiffOp::Add { value } => Some(value),
                        _ => None,
                    });
                    DiffEntry::add(name.as_str(), added.map_or(Value::Null, empty_like))
                }
            };
            Ok(vec![entry])
        }
        Key::Index(i) => {
            if entries.iter().all(|e| e.is_insertion()) {
                return Ok(Vec::new());
            }
            match subject {
                Value::Array(arr) => {
                    let elem = arr.get(*i).ok_or_else(|| {
                        PatchError::OutOfRange(format!("clear at {i} on an array of length {}", arr.len()))
                    })?;
                    Ok(vec![DiffEntry::remove_range(*i, 1), DiffEntry::add_range(*i, vec![empty_like(elem)])])
                }
                Value::String(_) => Ok(vec![DiffEntry::remove_range(*i, 1)]),
                other => Err(PatchError::Atomic(atomic_kind(other)).into()),
            }
        }
    }
}

/// A diff removing everything `subject` holds.
pub fn clear_all(subject: &Value) -> Result<Vec<DiffEntry>, MergeError> {
    let diff = match subject {
        Value::Array(a) if a.is_empty() => Vec::new(),
        Value::Array(a) => vec![DiffEntry::remove_range(0, a.len())],
        Value::String(s) => match split_lines(s).len() {
            0 => Vec::new(),
            n => vec![DiffEntry::remove_range(0, n)],
        },
        Value::Object(o) => sorted_keys(o).into_iter().map(DiffEntry::remove).collect(),
        other => return Err(PatchError::Atomic(atomic_kind(other)).into()),
    };
    Ok(diff)
}

// `first` followed by `second`, with `patch` entries on the same key folded
// into one.
fn combined(mut first: Vec<DiffEntry>, second: Vec<DiffEntry>) -> Vec<DiffEntry> {
    combine_diffs(&mut first, second);
    first
}

/// The concrete diff `decision` stands for, given the value at its path.
pub fn resolve_action(subject: &Value, decision: &MergeDecision) -> Result<Vec<DiffEntry>, MergeError> {
    let side = |d: &Option<Vec<DiffEntry>>| d.clone().unwrap_or_default();
    let diff = match decision.action {
        Action::Base => Vec::new(),
        Action::Local | Action::Either => side(&decision.local_diff),
        Action::Remote => side(&decision.remote_diff),
        Action::LocalThenRemote => combined(side(&decision.local_diff), side(&decision.remote_diff)),
        Action::RemoteThenLocal => combined(side(&decision.remote_diff), side(&decision.local_diff)),
        Action::Custom => side(&decision.custom_diff),
        Action::Clear => clear_conflict(subject, decision)?,
        Action::ClearParent => clear_all(subject)?,
    };
    Ok(diff)
}

// ── Application ───────────────────────────────────────────────────────────

struct Group {
    path: Vec<Key>,
    diff: Vec<DiffEntry>,
    cleared: bool,
}

impl Group {
    fn new(path: Vec<Key>) -> Self {
        Self { path, diff: Vec::new(), cleared: false }
    }

    fn flush(mut self, merged: &mut Value) -> Result<(), MergeError> {
        if self.diff.is_empty() {
            return Ok(());
        }
        sort_by_key(&mut self.diff);
        let target = value_at_mut(merged, &self.path)?;
        *target = patch(target, &self.diff)?;
        debug!(path = ?self.path, entries = self.diff.len(), cleared = self.cleared, "applied decisions");
        Ok(())
    }
}

/// Apply `decisions` to `base`.
///
/// Consecutive decisions with the same local path are resolved into one
/// diff, which is patched into the value at that path. A `clear_parent`
/// decision replaces whatever its group accumulated, and the rest of the
/// group is ignored.
pub fn apply_decisions<D: DecisionRef>(base: &Value, decisions: &[D]) -> Result<Value, MergeError> {
    let mut merged = base.clone();
    let mut current: Option<Group> = None;
    for d in decisions {
        let (path, dec) = scoped(&merged, d)?;
        let mut group = match current.take() {
            Some(g) if g.path == path => g,
            Some(g) => {
                g.flush(&mut merged)?;
                Group::new(path)
            }
            None => Group::new(path),
        };
        let subject = value_at(&merged, &group.path)?;
        if dec.action == Action::ClearParent {
            group.diff = clear_all(subject)?;
            group.cleared = true;
        } else if !group.cleared {
            let resolved = resolve_action(subject, &dec)?;
            combine_diffs(&mut group.diff, resolved);
        }
        current = Some(group);
    }
    if let Some(g) = current {
        g.flush(&mut merged)?;
    }
    Ok(merged)
}

/// Which diff [`build_diffs`] reconstructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffSide {
    Local,
    Remote,
    Merged,
}

#[derive(Debug, Default)]
struct DiffTree {
    diffs: Vec<DiffEntry>,
    cleared: bool,
    children: BTreeMap<Key, DiffTree>,
}

impl DiffTree {
    fn node_mut(&mut self, path: &[Key]) -> &mut DiffTree {
        path.iter().fold(self, |node, k| node.children.entry(k.clone()).or_default())
    }

    fn fold(self) -> Vec<DiffEntry> {
        let mut out = self.diffs;
        if !self.cleared {
            for (key, child) in self.children {
                let sub = child.fold();
                if !sub.is_empty() {
                    combine_diffs(&mut out, vec![DiffEntry::patch(key, sub)]);
                }
            }
        }
        sort_by_key(&mut out);
        out
    }
}

fn labeled(diff: &Option<Vec<DiffEntry>>, decision: usize, action: SourceAction) -> Vec<DiffEntry> {
    let mut d = diff.clone().unwrap_or_default();
    label_source(&mut d, ChunkSource { decision, action });
    d
}

/// Rebuild one diff against the root of `base` equivalent to `decisions`:
/// the local or remote side of every decision, or the merged result.
///
/// Top-level entries are tagged with the index of the decision they came
/// from.
pub fn build_diffs<D: DecisionRef>(base: &Value, decisions: &[D], which: DiffSide) -> Result<Vec<DiffEntry>, MergeError> {
    let mut tree = DiffTree::default();
    for (idx, d) in decisions.iter().enumerate() {
        let (path, dec) = scoped(base, d)?;
        let diff = match which {
            DiffSide::Local => labeled(&dec.local_diff, idx, SourceAction::Local),
            DiffSide::Remote => labeled(&dec.remote_diff, idx, SourceAction::Remote),
            DiffSide::Merged => match dec.action {
                Action::LocalThenRemote => combined(
                    labeled(&dec.local_diff, idx, SourceAction::Local),
                    labeled(&dec.remote_diff, idx, SourceAction::Remote),
                ),
                Action::RemoteThenLocal => combined(
                    labeled(&dec.remote_diff, idx, SourceAction::Remote),
                    labeled(&dec.local_diff, idx, SourceAction::Local),
                ),
                action => {
                    let mut diff = resolve_action(value_at(base, &path)?, &dec)?;
                    let side = match action {
                        Action::Local => SourceAction::Local,
                        Action::Remote => SourceAction::Remote,
                        Action::Either => SourceAction::Either,
                        _ => SourceAction::Custom,
                    };
                    label_source(&mut diff, ChunkSource { decision: idx, action: side });
                    diff
                }
            },
        };
        let node = tree.node_mut(&path);
        if which == DiffSide::Merged && dec.action == Action::ClearParent {
            node.diffs = diff;
            node.cleared = true;
            node.children.clear();
        } else if !node.cleared {
            combine_diffs(&mut node.diffs, diff);
        }
    }
    let diff = tree.fold();
    debug!(?which, decisions = decisions.len(), entries = diff.len(), "built diff");
    Ok(diff)
}

/// Compare the merged text at `path` with what an editor currently holds.
///
/// Returns a warning when they differ, so the caller can tell the user the
/// editor is out of sync with the decisions.
pub fn verify_merged_text<D: DecisionRef>(
    base: &Value,
    decisions: &[D],
    path: &[Key],
    editor_text: &str,
) -> Result<Option<NotifyUserError>, MergeError> {
    let merged = apply_decisions(base, decisions)?;
    let value = value_at(&merged, path)?;
    let text = match value {
        Value::String(s) => s.clone(),
        other => stringify(other, 0),
    };
    if text == editor_text {
        return Ok(None);
    }
    let shown: Vec<String> = path.iter().map(Key::to_string).collect();
    Ok(Some(NotifyUserError::warning(format!(
        "merged text at /{} differs from the editor contents",
        shown.join("/")
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::decision::Severity;
    use serde_json::json;

    fn decision(path: Vec<Key>, local: Option<Vec<DiffEntry>>, remote: Option<Vec<DiffEntry>>, action: Action) -> MergeDecision {
        MergeDecision::new(path, local, remote, action, false)
    }

    fn ins(key: usize, v: Value) -> Vec<DiffEntry> {
        vec![DiffEntry::add_range(key, vec![v])]
    }

    // ── paths ──

    #[test]
    fn pop_and_push_are_inverse() {
        let diffs: DiffCollection = vec![
            Some(vec![DiffEntry::patch("a", vec![DiffEntry::remove("x")])]),
            Some(vec![DiffEntry::patch("a", vec![DiffEntry::replace("x", json!(1))])]),
        ];
        let (key, inner) = pop_path(&diffs, false).unwrap();
        assert_eq!(key, Key::from("a"));
        assert_eq!(inner[0], Some(vec![DiffEntry::remove("x")]));
        assert_eq!(push_path(inner, &[key]), diffs);
    }

    #[test]
    fn pop_requires_matching_keys() {
        let diffs: DiffCollection = vec![
            Some(vec![DiffEntry::patch("a", vec![DiffEntry::remove("x")])]),
            Some(vec![DiffEntry::patch("b", vec![DiffEntry::remove("x")])]),
        ];
        assert!(pop_path(&diffs, false).is_none());
        assert!(pop_path(&vec![None, Some(vec![])], false).is_none());
    }

    #[test]
    fn pop_inner_allows_wider_sub_diffs() {
        let diffs: DiffCollection = vec![
            Some(vec![DiffEntry::patch("a", vec![DiffEntry::remove("x"), DiffEntry::remove("y")])]),
            None,
        ];
        assert!(pop_path(&diffs, false).is_none());
        let (_, inner) = pop_path(&diffs, true).unwrap();
        assert_eq!(inner[0].as_ref().map(Vec::len), Some(2));
        assert_eq!(inner[1], None);
    }

    #[test]
    fn common_paths_are_folded() {
        let mut decisions = vec![decision(
            vec!["cells".into()],
            Some(vec![DiffEntry::patch(0, vec![DiffEntry::patch("source", vec![DiffEntry::remove_range(1, 1)])])]),
            Some(vec![DiffEntry::patch(0, vec![DiffEntry::patch("source", vec![DiffEntry::add_range(1, vec![json!("x\n")])])])]),
            Action::Base,
        )];
        resolve_common_paths(&mut decisions);
        let md = &decisions[0];
        assert_eq!(md.path, vec![Key::from("cells"), Key::from(0), Key::from("source")]);
        assert_eq!(md.local_diff, Some(vec![DiffEntry::remove_range(1, 1)]));
    }

    #[test]
    fn push_patch_decision_checks_segments() {
        let md = decision(vec!["a".into(), "b".into()], Some(vec![DiffEntry::remove("c")]), None, Action::Local);
        let pushed = push_patch_decision(&md, &["b".into()]).unwrap();
        assert_eq!(pushed.path, vec![Key::from("a")]);
        assert_eq!(pushed.local_diff, Some(vec![DiffEntry::patch("b", vec![DiffEntry::remove("c")])]));
        assert_eq!(pushed.remote_diff, None);
        assert!(matches!(push_patch_decision(&md, &["x".into()]), Err(MergeError::Path(_))));
        assert!(matches!(
            push_patch_decision(&md, &["x".into(), "a".into(), "b".into()]),
            Err(MergeError::Path(_))
        ));
    }

    // ── filtering and order ──

    #[test]
    fn filter_scopes_without_mutating() {
        let decisions = vec![
            decision(vec!["cells".into(), 0.into()], None, None, Action::Base),
            decision(vec!["cells".into(), 1.into(), "source".into()], None, None, Action::Base),
            decision(vec!["metadata".into()], None, None, Action::Base),
        ];
        let scoped = filter_decisions(&decisions, &["cells".into()], 0, None);
        assert_eq!(scoped.len(), 2);
        assert_eq!(scoped[1].local_path(), &[Key::from(1), Key::from("source")]);
        assert!(decisions.iter().all(|d| d.level == 0));

        let short = filter_decisions(&decisions, &["cells".into()], 0, Some(2));
        assert_eq!(short.len(), 1);

        let skipped = filter_decisions(&decisions, &[1.into()], 1, None);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].level, 2);
    }

    #[test]
    fn deeper_paths_sort_first() {
        let a = decision(vec!["a".into()], None, None, Action::Base);
        let ab = decision(vec!["a".into(), "b".into()], None, None, Action::Base);
        let b = decision(vec!["b".into()], None, None, Action::Base);
        assert_eq!(decision_path_sort_key(&ab, &a), Ordering::Less);
        assert_eq!(decision_path_sort_key(&a, &b), Ordering::Less);
        assert_eq!(decision_path_sort_key(&a, &a), Ordering::Equal);

        let mut all = vec![b.clone(), a.clone(), ab.clone()];
        sort_decisions(&mut all);
        assert_eq!(all, vec![ab, a, b]);
    }

    #[test]
    fn add_sorted_orders_by_first_key() {
        let at = |k: usize| decision(vec!["cells".into()], Some(ins(k, json!(k))), None, Action::Local);
        let mut list = vec![at(0), at(4)];
        add_sorted(&mut list, at(2), Some(&Key::Index(2))).unwrap();
        let keys: Vec<_> = list.iter().map(|d| d.first_key().cloned()).collect();
        assert_eq!(keys, vec![Some(Key::Index(0)), Some(Key::Index(2)), Some(Key::Index(4))]);

        let r = add_sorted(&mut list, at(4), Some(&Key::Index(4)));
        assert!(matches!(r, Err(MergeError::InvalidDecision(_))));

        let deeper = decision(vec!["cells".into(), 0.into()], None, None, Action::Base);
        add_sorted(&mut list, deeper, None).unwrap();
        assert_eq!(list[0].path.len(), 2);
    }

    // ── resolution ──

    #[test]
    fn actions_pick_sides() {
        let md = |action| decision(vec![], Some(ins(0, json!("L"))), Some(ins(0, json!("R"))), action);
        let base = json!(["a"]);
        assert!(resolve_action(&base, &md(Action::Base)).unwrap().is_empty());
        assert_eq!(resolve_action(&base, &md(Action::Local)).unwrap(), ins(0, json!("L")));
        assert_eq!(resolve_action(&base, &md(Action::Either)).unwrap(), ins(0, json!("L")));
        assert_eq!(resolve_action(&base, &md(Action::Remote)).unwrap(), ins(0, json!("R")));
        assert_eq!(
            resolve_action(&base, &md(Action::RemoteThenLocal)).unwrap(),
            [ins(0, json!("R")), ins(0, json!("L"))].concat()
        );
        let mut custom = md(Action::Custom);
        custom.custom_diff = Some(ins(1, json!("C")));
        assert_eq!(resolve_action(&base, &custom).unwrap(), ins(1, json!("C")));
    }

    #[test]
    fn clear_replaces_with_empty_value() {
        let base = json!({"out": [1, 2], "s": "text"});
        let md = decision(
            vec![],
            Some(vec![DiffEntry::replace("out", json!([3]))]),
            Some(vec![DiffEntry::replace("out", json!([4]))]),
            Action::Clear,
        );
        assert_eq!(resolve_action(&base, &md).unwrap(), vec![DiffEntry::replace("out", json!([]))]);
        assert_eq!(apply_decisions(&base, &[md]).unwrap(), json!({"out": [], "s": "text"}));
    }

    #[test]
    fn clear_of_two_added_fields() {
        let md = decision(
            vec![],
            Some(vec![DiffEntry::add("k", json!("a"))]),
            Some(vec![DiffEntry::add("k", json!("b"))]),
            Action::Clear,
        );
        assert_eq!(resolve_action(&json!({}), &md).unwrap(), vec![DiffEntry::add("k", json!(""))]);
    }

    #[test]
    fn clear_on_sequence_index() {
        let base = json!([{"x": 1}, 2]);
        let md = decision(
            vec![],
            Some(vec![DiffEntry::patch(0, vec![DiffEntry::remove("x")])]),
            Some(vec![DiffEntry::patch(0, vec![DiffEntry::replace("x", json!(5))])]),
            Action::Clear,
        );
        assert_eq!(apply_decisions(&base, &[md]).unwrap(), json!([{}, 2]));

        let inserts = decision(vec![], Some(ins(1, json!("L"))), Some(ins(1, json!("R"))), Action::Clear);
        assert!(resolve_action(&base, &inserts).unwrap().is_empty());
    }

    #[test]
    fn clear_rejects_different_keys() {
        let md = decision(
            vec![],
            Some(vec![DiffEntry::remove("a")]),
            Some(vec![DiffEntry::remove("b")]),
            Action::Clear,
        );
        let r = resolve_action(&json!({"a": 1, "b": 2}), &md);
        assert!(matches!(r, Err(MergeError::InvalidDecision(_))));
    }

    #[test]
    fn clear_parent_empties_containers() {
        assert_eq!(clear_all(&json!([1, 2, 3])).unwrap(), vec![DiffEntry::remove_range(0, 3)]);
        assert_eq!(clear_all(&json!("a\nb")).unwrap(), vec![DiffEntry::remove_range(0, 2)]);
        assert_eq!(
            clear_all(&json!({"b": 1, "a": 2})).unwrap(),
            vec![DiffEntry::remove("a"), DiffEntry::remove("b")]
        );
        assert_eq!(clear_all(&json!(1)), Err(MergeError::Patch(PatchError::Atomic("number"))));
    }

    // ── application ──

    #[test]
    fn local_then_remote_inserts_in_order() {
        let md = decision(vec![], Some(ins(0, json!("L"))), Some(ins(0, json!("R"))), Action::LocalThenRemote);
        let merged = apply_decisions(&json!(["a", "b"]), &[md]).unwrap();
        assert_eq!(merged, json!(["L", "R", "a", "b"]));
    }

    #[test]
    fn both_sides_patching_one_element_fold() {
        let base = json!([{"x": 1}, "tail"]);
        let md = decision(
            vec![],
            Some(vec![DiffEntry::patch(0, vec![DiffEntry::add("y", json!(2))])]),
            Some(vec![DiffEntry::patch(0, vec![DiffEntry::add("z", json!(3))])]),
            Action::LocalThenRemote,
        );
        let expected = json!([{"x": 1, "y": 2, "z": 3}, "tail"]);
        let decisions = [md];
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), expected);
        let merged = build_diffs(&base, &decisions, DiffSide::Merged).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(patch(&base, &merged).unwrap(), expected);
    }

    #[test]
    fn both_sides_patching_one_field_fold() {
        let base = json!({"meta": {"a": 1}, "b": 0});
        let md = decision(
            vec![],
            Some(vec![
                DiffEntry::replace("b", json!(1)),
                DiffEntry::patch("meta", vec![DiffEntry::add("l", json!(true))]),
            ]),
            Some(vec![DiffEntry::patch("meta", vec![DiffEntry::remove("a")])]),
            Action::RemoteThenLocal,
        );
        let expected = json!({"meta": {"l": true}, "b": 1});
        let decisions = [md];
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), expected);
        let merged = build_diffs(&base, &decisions, DiffSide::Merged).unwrap();
        assert_eq!(patch(&base, &merged).unwrap(), expected);
    }

    #[test]
    fn decisions_on_one_path_fold_their_patches() {
        let base = json!({"cells": [{"n": 1}]});
        let path = vec![Key::from("cells")];
        let decisions = vec![
            decision(path.clone(), Some(vec![DiffEntry::patch(0, vec![DiffEntry::add("a", json!(1))])]), None, Action::Local),
            decision(path, None, Some(vec![DiffEntry::patch(0, vec![DiffEntry::add("b", json!(2))])]), Action::Remote),
        ];
        let expected = json!({"cells": [{"n": 1, "a": 1, "b": 2}]});
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), expected);
        let merged = build_diffs(&base, &decisions, DiffSide::Merged).unwrap();
        assert_eq!(patch(&base, &merged).unwrap(), expected);
    }

    #[test]
    fn all_base_is_identity() {
        let base = json!({"cells": [{"source": "x\n"}], "n": 1});
        let decisions = vec![
            decision(vec!["cells".into(), 0.into(), "source".into()], Some(ins(0, json!("y\n"))), None, Action::Base),
            decision(vec!["n".into()], None, None, Action::Base),
        ];
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), base);
    }

    #[test]
    fn clear_parent_overrides_its_group() {
        let base = json!({"outputs": [1, 2]});
        let path = vec![Key::from("outputs")];
        let decisions = vec![
            decision(path.clone(), Some(ins(0, json!(0))), None, Action::Local),
            decision(path.clone(), None, None, Action::ClearParent),
            decision(path, Some(ins(2, json!(3))), None, Action::Local),
        ];
        assert_eq!(apply_decisions(&base, &decisions).unwrap(), json!({"outputs": []}));
    }

    #[test]
    fn path_into_string_is_normalized() {
        let base = json!({"src": "a\nb\n"});
        let md = decision(
            vec!["src".into(), 1.into()],
            Some(vec![DiffEntry::add_range(0, "X")]),
            None,
            Action::Local,
        );
        assert_eq!(apply_decisions(&base, &[md]).unwrap(), json!({"src": "a\nXb\n"}));
    }

    #[test]
    fn scoped_decisions_apply_to_subtree() {
        let doc = json!({"cells": [["a"], ["b"]]});
        let decisions = vec![decision(vec!["cells".into(), 1.into()], Some(ins(1, json!("c"))), None, Action::Local)];
        let scoped = filter_decisions(&decisions, &["cells".into()], 0, None);
        let merged = apply_decisions(&doc["cells"], &scoped).unwrap();
        assert_eq!(merged, json!([["a"], ["b", "c"]]));
    }

    #[test]
    fn missing_path_is_reported() {
        let md = decision(vec!["nope".into()], Some(ins(0, json!(1))), None, Action::Local);
        assert!(matches!(apply_decisions(&json!({}), &[md]), Err(MergeError::Path(_))));
    }

    // ── diff extraction ──

    #[test]
    fn build_diffs_nests_and_labels() {
        let base = json!({"a": {"x": [1]}, "b": 2});
        let decisions = vec![
            decision(vec!["a".into(), "x".into()], Some(ins(1, json!(2))), Some(ins(0, json!(0))), Action::LocalThenRemote),
            decision(vec![], Some(vec![DiffEntry::replace("b", json!(3))]), None, Action::Local),
        ];
        let local = build_diffs(&base, &decisions, DiffSide::Local).unwrap();
        assert_eq!(
            crate::diff::strip_source(&local),
            vec![
                DiffEntry::patch("a", vec![DiffEntry::patch("x", ins(1, json!(2)))]),
                DiffEntry::replace("b", json!(3)),
            ]
        );
        assert_eq!(local[1].source, Some(ChunkSource { decision: 1, action: SourceAction::Local }));

        let merged = build_diffs(&base, &decisions, DiffSide::Merged).unwrap();
        let inner = merged[0].sub_diff().and_then(|d| d[0].sub_diff()).unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner[0].source.map(|s| s.action), Some(SourceAction::Remote));
        assert_eq!(inner[1].source.map(|s| s.action), Some(SourceAction::Local));
        assert_eq!(patch(&base, &merged).unwrap(), apply_decisions(&base, &decisions).unwrap());
    }

    #[test]
    fn build_diffs_clear_parent_drops_children() {
        let base = json!({"o": [[1], 2]});
        let decisions = vec![
            decision(vec!["o".into(), 0.into()], Some(ins(0, json!(0))), None, Action::Local),
            decision(vec!["o".into()], None, None, Action::ClearParent),
        ];
        let merged = build_diffs(&base, &decisions, DiffSide::Merged).unwrap();
        assert_eq!(crate::diff::strip_source(&merged), vec![DiffEntry::patch("o", vec![DiffEntry::remove_range(0, 2)])]);
    }

    #[test]
    fn verify_detects_drift() {
        let base = json!({"src": "a\n"});
        let decisions = vec![decision(vec!["src".into()], Some(ins(1, json!("b\n"))), None, Action::Local)];
        let path = [Key::from("src")];
        assert_eq!(verify_merged_text(&base, &decisions, &path, "a\nb\n").unwrap(), None);
        let warn = verify_merged_text(&base, &decisions, &path, "a\n").unwrap().unwrap();
        assert_eq!(warn.severity, Severity::Warning);
    }
}
