//! Escape correction for ranges computed on raw string text.
//!
//! When a string is rendered as a JSON string literal, every character that
//! needs escaping grows. Ranges found on the raw text are mapped onto the
//! escaped text here, in one pass over the finished range list.

use nbmerge_util::strings::escape_deltas;

use crate::diff::DiffRange;

/// Maps raw byte offsets of one string onto its escaped rendering.
#[derive(Debug, Clone, Default)]
pub struct EscapeMap {
    // Raw offset of each escaped character, and the cumulative growth up
    // to and including it.
    positions: Vec<usize>,
    growth: Vec<usize>,
}

impl EscapeMap {
    pub fn new(raw: &str) -> Self {
        let mut map = Self::default();
        let mut acc = 0;
        for (pos, delta) in escape_deltas(raw) {
            acc += delta;
            map.positions.push(pos);
            map.growth.push(acc);
        }
        map
    }

    /// Offset in the escaped text of raw offset `i`.
    pub fn map(&self, i: usize) -> usize {
        match self.positions.partition_point(|&p| p < i) {
            0 => i,
            n => i + self.growth[n - 1],
        }
    }
}

/// Move `ranges` (offsets into `raw`) onto the escaped form of `raw`.
pub fn shift_for_escapes(ranges: &mut [DiffRange], raw: &str) {
    let map = EscapeMap::new(raw);
    if map.positions.is_empty() {
        return;
    }
    for r in ranges.iter_mut() {
        r.from = map.map(r.from);
        r.to = map.map(r.to);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nbmerge_util::strings::escape;

    fn range(from: usize, to: usize) -> DiffRange {
        DiffRange { from, to, source: None }
    }

    #[test]
    fn escape_table() {
        // (raw, raw range, expected escaped slice)
        let table: &[(&str, (usize, usize), &str)] = &[
            ("plain", (1, 3), "la"),
            ("a\"b", (2, 3), "b"),
            ("a\"b", (1, 2), "\\\""),
            ("x\\y", (0, 3), "x\\\\y"),
            ("l1\nl2", (3, 5), "l2"),
            ("l1\nl2", (0, 3), "l1\\n"),
            ("\t\r\u{8}\u{c}z", (4, 5), "z"),
            ("\u{1}q", (1, 2), "q"),
            ("\u{1}q", (0, 1), "\\u0001"),
            ("é\"é", (3, 5), "é"),
        ];
        for (raw, (from, to), expected) in table {
            let mut ranges = [range(*from, *to)];
            shift_for_escapes(&mut ranges, raw);
            let escaped = escape(raw);
            assert_eq!(ranges[0].slice(&escaped), *expected, "raw {raw:?}");
        }
    }

    #[test]
    fn map_sums_prior_growth() {
        let map = EscapeMap::new("\"\"a\u{0}b");
        assert_eq!(map.map(0), 0);
        assert_eq!(map.map(1), 2);
        assert_eq!(map.map(2), 4);
        assert_eq!(map.map(4), 11);
    }
}
