//! Logic behind the `nbmerge-apply` binary.
//!
//! Input is one JSON object read from stdin, either
//! `{"base": <value>, "diff": [<DiffEntry>...]}` or
//! `{"base": <value>, "decisions": [<MergeDecision>...]}`.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::info;

use crate::diff::{DiffEntry, DiffRange, PatchError};
use crate::json_stable::pretty;
use crate::merge::{apply_decisions, MergeDecision, MergeError};
use crate::patch::{patch, patch_stringified};

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Patch(#[from] PatchError),
    #[error("{0}")]
    Merge(#[from] MergeError),
    #[error("input needs a \"diff\" or a \"decisions\" field")]
    MissingInput,
    #[error("--stringified needs a \"diff\" field")]
    StringifiedDecisions,
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
}

/// Command line options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyOptions {
    /// Print the stringified patch (text and ranges) instead of the value.
    pub stringified: bool,
}

impl ApplyOptions {
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Self, CliError> {
        let mut opts = Self::default();
        for arg in args {
            match arg.as_str() {
                "--stringified" | "-s" => opts.stringified = true,
                other => return Err(CliError::UnknownArgument(other.to_owned())),
            }
        }
        Ok(opts)
    }
}

#[derive(Debug, Deserialize)]
struct Input {
    base: Value,
    #[serde(default)]
    diff: Option<Vec<DiffEntry>>,
    #[serde(default)]
    decisions: Option<Vec<MergeDecision>>,
}

fn ranges_json(ranges: &[DiffRange]) -> Value {
    Value::Array(ranges.iter().map(|r| json!([r.from, r.to])).collect())
}

/// Run one `nbmerge-apply` invocation on `input`, returning what to print.
pub fn run_apply(input: &str, opts: &ApplyOptions) -> Result<String, CliError> {
    let input: Input = serde_json::from_str(input)?;
    match (input.diff, input.decisions) {
        (Some(diff), _) if opts.stringified => {
            let res = patch_stringified(&input.base, &diff, 0)?;
            info!(additions = res.additions.len(), deletions = res.deletions.len(), "stringified patch");
            let out = json!({
                "text": res.text,
                "additions": ranges_json(&res.additions),
                "deletions": ranges_json(&res.deletions),
            });
            Ok(pretty(&out, 0))
        }
        (Some(diff), _) => {
            info!(entries = diff.len(), "applying diff");
            Ok(pretty(&patch(&input.base, &diff)?, 0))
        }
        (None, Some(_)) if opts.stringified => Err(CliError::StringifiedDecisions),
        (None, Some(decisions)) => {
            info!(decisions = decisions.len(), "applying decisions");
            Ok(pretty(&apply_decisions(&input.base, &decisions)?, 0))
        }
        (None, None) => Err(CliError::MissingInput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_diff() {
        let input = r#"{"base": ["a", "b", "c"], "diff": [
            {"key": 1, "op": "removerange", "length": 1},
            {"key": 1, "op": "addrange", "valuelist": ["x", "y"]}
        ]}"#;
        let out = run_apply(input, &ApplyOptions::default()).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v, json!(["a", "x", "y", "c"]));
    }

    #[test]
    fn applies_decisions() {
        let input = r#"{"base": {"out": [1]}, "decisions": [
            {"common_path": [], "action": "clear", "conflict": false,
             "local_diff": [{"key": "out", "op": "replace", "value": [2]}],
             "remote_diff": [{"key": "out", "op": "replace", "value": [3]}]}
        ]}"#;
        let out = run_apply(input, &ApplyOptions::default()).unwrap();
        assert_eq!(out, "{\n  \"out\": []\n}");
    }

    #[test]
    fn stringified_output() {
        let input = r#"{"base": {"m": 1}, "diff": [{"key": "m", "op": "replace", "value": 2}]}"#;
        let out = run_apply(input, &ApplyOptions { stringified: true }).unwrap();
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["text"], json!("{\n  \"m\": 2\n}"));
        assert_eq!(v["additions"], json!([[9, 10]]));
        assert_eq!(v["deletions"], json!([[9, 10]]));
    }

    #[test]
    fn missing_input() {
        assert!(matches!(run_apply(r#"{"base": 1}"#, &ApplyOptions::default()), Err(CliError::MissingInput)));
    }

    #[test]
    fn patch_errors_surface() {
        let r = run_apply(r#"{"base": 1, "diff": []}"#, &ApplyOptions::default());
        assert!(matches!(r, Err(CliError::Patch(PatchError::Atomic(_)))));
    }

    #[test]
    fn argument_parsing() {
        assert!(ApplyOptions::from_args(vec!["--stringified".to_owned()]).unwrap().stringified);
        assert!(matches!(
            ApplyOptions::from_args(vec!["--nope".to_owned()]),
            Err(CliError::UnknownArgument(_))
        ));
    }
}
