/// Returns the JSON escape sequence for `ch`, or `None` when the character
/// is written literally inside a JSON string.
///
/// Control characters (0x00-0x1F), the double quote and the backslash are
/// escaped. Everything else, including non-ASCII text, is kept as is.
pub fn escape_char(ch: char) -> Option<&'static str> {
    let esc = match ch {
        '\u{0000}' => "\\u0000",
        '\u{0001}' => "\\u0001",
        '\u{0002}' => "\\u0002",
        '\u{0003}' => "\\u0003",
        '\u{0004}' => "\\u0004",
        '\u{0005}' => "\\u0005",
        '\u{0006}' => "\\u0006",
        '\u{0007}' => "\\u0007",
        '\u{0008}' => "\\b",
        '\t' => "\\t",
        '\n' => "\\n",
        '\u{000B}' => "\\u000b",
        '\u{000C}' => "\\f",
        '\r' => "\\r",
        '\u{000E}' => "\\u000e",
        '\u{000F}' => "\\u000f",
        '\u{0010}' => "\\u0010",
        '\u{0011}' => "\\u0011",
        '\u{0012}' => "\\u0012",
        '\u{0013}' => "\\u0013",
        '\u{0014}' => "\\u0014",
        '\u{0015}' => "\\u0015",
        '\u{0016}' => "\\u0016",
        '\u{0017}' => "\\u0017",
        '\u{0018}' => "\\u0018",
        '\u{0019}' => "\\u0019",
        '\u{001A}' => "\\u001a",
        '\u{001B}' => "\\u001b",
        '\u{001C}' => "\\u001c",
        '\u{001D}' => "\\u001d",
        '\u{001E}' => "\\u001e",
        '\u{001F}' => "\\u001f",
        '"' => "\\\"",
        '\\' => "\\\\",
        _ => return None,
    };
    Some(esc)
}

/// Escape special characters in a string for JSON serialization.
///
/// # Examples
///
/// ```
/// use nbmerge_util::strings::escape;
///
/// assert_eq!(escape("hello"), "hello");
/// assert_eq!(escape("say \"hi\""), "say \\\"hi\\\"");
/// assert_eq!(escape("line1\nline2"), "line1\\nline2");
/// ```
pub fn escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for (i, ch) in s.char_indices() {
        if let Some(esc) = escape_char(ch) {
            result.push_str(&s[last..i]);
            result.push_str(esc);
            last = i + ch.len_utf8();
        }
    }

    result.push_str(&s[last..]);
    result
}

/// Lists every character of `s` that grows when escaped, as
/// `(byte offset in s, extra bytes in the escaped form)`.
///
/// Offsets are ascending. A `"` contributes 1 (`\"`), a NUL contributes 5
/// (`\u0000`).
///
/// ```
/// use nbmerge_util::strings::escape_deltas;
///
/// assert_eq!(escape_deltas("a\"b\u{1}"), vec![(1, 1), (3, 5)]);
/// ```
pub fn escape_deltas(s: &str) -> Vec<(usize, usize)> {
    s.char_indices()
        .filter_map(|(i, ch)| escape_char(ch).map(|esc| (i, esc.len() - ch.len_utf8())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_simple() {
        assert_eq!(escape("hello"), "hello");
    }

    #[test]
    fn test_escape_empty() {
        assert_eq!(escape(""), "");
    }

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape("say \"hi\""), "say \\\"hi\\\"");
    }

    #[test]
    fn test_escape_backslash() {
        assert_eq!(escape("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn test_escape_newline() {
        assert_eq!(escape("line1\nline2"), "line1\\nline2");
    }

    #[test]
    fn test_escape_control() {
        assert_eq!(escape("back\x08space"), "back\\bspace");
        assert_eq!(escape("form\x0cfeed"), "form\\ffeed");
        assert_eq!(escape("null\0byte"), "null\\u0000byte");
    }

    #[test]
    fn test_escape_unicode() {
        assert_eq!(escape("hello 日本語"), "hello 日本語");
    }

    #[test]
    fn deltas_match_escaped_length() {
        let samples = ["", "plain", "a\"b", "tab\there\n", "\u{1}\u{1f}\\", "日本\n語"];
        for s in samples {
            let extra: usize = escape_deltas(s).iter().map(|(_, d)| d).sum();
            assert_eq!(escape(s).len(), s.len() + extra, "sample {s:?}");
        }
    }

    #[test]
    fn deltas_use_byte_offsets() {
        // "é" is two bytes, so the quote sits at byte 2.
        assert_eq!(escape_deltas("é\""), vec![(2, 1)]);
    }
}
