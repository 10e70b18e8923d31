use nbmerge::{Action, DiffEntry, MergeDecision};
use serde_json::{json, Value};

/// Parse a diff from its wire form.
pub fn diff(value: Value) -> Vec<DiffEntry> {
    serde_json::from_value(value).expect("diff fixture")
}

/// Parse decisions from their wire form.
pub fn decisions(value: Value) -> Vec<MergeDecision> {
    MergeDecision::list_from_wire(value).expect("decision fixture")
}

pub fn insert(key: usize, values: Vec<Value>) -> DiffEntry {
    DiffEntry::add_range(key, values)
}

pub fn decision(path: Value, local: Vec<DiffEntry>, remote: Vec<DiffEntry>, action: Action) -> MergeDecision {
    let path = serde_json::from_value(path).expect("path fixture");
    MergeDecision::new(path, Some(local), Some(remote), action, false)
}

/// A small notebook with one code cell whose source is three lines.
pub fn notebook() -> Value {
    json!({
        "cells": [
            {
                "cell_type": "code",
                "execution_count": 1,
                "metadata": {},
                "outputs": [{"output_type": "stream", "name": "stdout", "text": "hi\n"}],
                "source": "l0\nl1\nl2\n"
            },
            {
                "cell_type": "markdown",
                "metadata": {},
                "source": "# Title\n"
            }
        ],
        "metadata": {"kernelspec": {"name": "python3"}},
        "nbformat": 4,
        "nbformat_minor": 5
    })
}
