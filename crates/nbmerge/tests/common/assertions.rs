use nbmerge::DiffRange;

/// Texts covered by `ranges`.
pub fn slices<'a>(text: &'a str, ranges: &[DiffRange]) -> Vec<&'a str> {
    ranges.iter().map(|r| r.slice(text)).collect()
}

/// `text` with every range in `ranges` cut out. Ranges must be sorted and
/// disjoint.
pub fn outside(text: &str, ranges: &[DiffRange]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at = 0;
    for r in ranges {
        out.push_str(&text[at..r.from]);
        at = r.to;
    }
    out.push_str(&text[at..]);
    out
}

pub fn assert_sorted_disjoint(ranges: &[DiffRange]) {
    for w in ranges.windows(2) {
        assert!(w[0].to <= w[1].from, "ranges overlap or are unsorted: {ranges:?}");
    }
}
