//! json-stable: deterministic pretty printing with sorted object keys.
//!
//! The stringified patcher reports byte ranges into this rendering, so every
//! layout decision here (indent unit, separators, empty containers) is part
//! of the range contract.

use nbmerge_util::insertion_sort_by;
use nbmerge_util::strings::escape;
use serde_json::{Map, Value};

/// Default indentation unit.
pub const JSON_INDENT: &str = "  ";

/// Rendering options shared by the pretty printer and the stringified
/// patcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringifyOptions {
    /// One level of indentation.
    pub indent: &'static str,
}

impl Default for StringifyOptions {
    fn default() -> Self {
        Self { indent: JSON_INDENT }
    }
}

impl StringifyOptions {
    /// Leading whitespace for `level`.
    pub fn indent_for(&self, level: usize) -> String {
        self.indent.repeat(level)
    }
}

/// Object keys in rendering order.
pub fn sorted_keys(obj: &Map<String, Value>) -> Vec<&str> {
    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    insertion_sort_by(&mut keys, |a, b| a.cmp(b));
    keys
}

/// Text in front of an object member's value: indentation, quoted key and
/// `": "`.
pub fn member_prefix(key: &str, level: usize, opts: &StringifyOptions) -> String {
    format!("{}\"{}\": ", opts.indent_for(level), escape(key))
}

/// Pretty print `value` as if it sat `level` levels deep. The first line is
/// indented as well.
pub fn pretty(value: &Value, level: usize) -> String {
    pretty_with(value, level, &StringifyOptions::default())
}

pub fn pretty_with(value: &Value, level: usize, opts: &StringifyOptions) -> String {
    let mut out = opts.indent_for(level);
    write_value(&mut out, value, level, opts);
    out
}

/// Render `value` for display: a string at the root renders as its raw
/// text, everything else as pretty JSON.
pub fn stringify(value: &Value, level: usize) -> String {
    stringify_with(value, level, &StringifyOptions::default())
}

pub fn stringify_with(value: &Value, level: usize, opts: &StringifyOptions) -> String {
    match value {
        Value::String(s) if level == 0 => s.clone(),
        _ => pretty_with(value, level, opts),
    }
}

/// Object member as one item of its parent: `member_prefix` followed by the
/// value rendered at `level` without its leading indentation.
pub fn member_text(key: &str, value_text: &str, level: usize, opts: &StringifyOptions) -> String {
    let indent_len = opts.indent.len() * level;
    let mut out = member_prefix(key, level, opts);
    out.push_str(&value_text[indent_len.min(value_text.len())..]);
    out
}

/// Join already rendered items into a container at `level`.
pub fn join_items(items: &[&str], open: char, close: char, level: usize, opts: &StringifyOptions) -> String {
    let indent = opts.indent_for(level);
    if items.is_empty() {
        return format!("{indent}{open}{close}");
    }
    let mut out = format!("{indent}{open}\n");
    out.push_str(&items.join(",\n"));
    out.push('\n');
    out.push_str(&indent);
    out.push(close);
    out
}

// Writes without the first line's indentation.
fn write_value(out: &mut String, value: &Value, level: usize, opts: &StringifyOptions) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => {
            out.push('"');
            out.push_str(&escape(s));
            out.push('"');
        }
        Value::Array(arr) => {
            let items: Vec<String> = arr.iter().map(|v| pretty_with(v, level + 1, opts)).collect();
            let refs: Vec<&str> = items.iter().map(String::as_str).collect();
            out.push_str(join_items(&refs, '[', ']', level, opts).trim_start());
        }
        Value::Object(obj) => {
            let items: Vec<String> = sorted_keys(obj)
                .into_iter()
                .map(|k| member_text(k, &pretty_with(&obj[k], level + 1, opts), level + 1, opts))
                .collect();
            let refs: Vec<&str> = items.iter().map(String::as_str).collect();
            out.push_str(join_items(&refs, '{', '}', level, opts).trim_start());
        }
    }
}
