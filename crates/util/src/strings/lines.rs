/// Splits `s` into lines, keeping each line's `\n` terminator.
///
/// The last line has no terminator when `s` does not end with a newline.
/// An empty string has no lines.
///
/// ```
/// use nbmerge_util::strings::split_lines;
///
/// assert_eq!(split_lines("a\nb"), vec!["a\n", "b"]);
/// assert_eq!(split_lines("a\n"), vec!["a\n"]);
/// assert!(split_lines("").is_empty());
/// ```
pub fn split_lines(s: &str) -> Vec<&str> {
    s.split_inclusive('\n').collect()
}

/// Byte offset at which each line starts, plus one trailing entry equal to
/// the total length.
///
/// `line_offsets(&lines)[i]` is where line `i` begins; the extra entry lets
/// callers address the position just past the last line.
pub fn line_offsets(lines: &[&str]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(lines.len() + 1);
    let mut acc = 0;
    offsets.push(acc);
    for line in lines {
        acc += line.len();
        offsets.push(acc);
    }
    offsets
}
