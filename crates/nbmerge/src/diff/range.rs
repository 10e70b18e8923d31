//! Text ranges describing what a patch added or removed.
//!
//! [`DiffRange`] is a half-open byte interval into a rendered text;
//! [`DiffRangePos`] is the same interval resolved to line/column positions
//! plus the hints the chunker needs.

use super::types::ChunkSource;

/// Half-open byte interval `[from, to)` into a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRange {
    pub from: usize,
    pub to: usize,
    pub source: Option<ChunkSource>,
}

impl DiffRange {
    pub fn new(from: usize, length: usize, source: Option<ChunkSource>) -> Self {
        Self { from, to: from + length, source }
    }

    pub fn len(&self) -> usize {
        self.to - self.from
    }

    pub fn is_empty(&self) -> bool {
        self.to == self.from
    }

    /// Moves the range `by` bytes towards the end of the text.
    pub fn shift(&mut self, by: usize) {
        self.from += by;
        self.to += by;
    }

    /// The covered substring of `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.from..self.to]
    }
}

/// Shift every range of every list by `by` bytes.
pub fn shift_ranges(by: usize, lists: &mut [&mut Vec<DiffRange>]) {
    for list in lists.iter_mut() {
        for r in list.iter_mut() {
            r.shift(by);
        }
    }
}

/// Zero-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
    pub line: usize,
    pub ch: usize,
}

impl Pos {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }
}

/// A [`DiffRange`] resolved against the text it indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffRangePos {
    pub from: Pos,
    /// Position of the exclusive end.
    pub to: Pos,
    /// The line holding `from` belongs to the chunk. False when the range
    /// starts on the newline that ends a line, so its content begins on
    /// the next line.
    pub chunk_start_line: bool,
    /// The last byte of the range is a newline.
    pub ends_on_newline: bool,
    pub source: Option<ChunkSource>,
}

impl DiffRangePos {
    /// Number of newlines crossed by the range.
    pub fn line_span(&self) -> usize {
        self.to.line - self.from.line
    }

    /// Half-open line interval covered on the range's own side.
    pub fn lines(&self) -> (usize, usize) {
        let start = self.from.line + usize::from(!self.chunk_start_line);
        let end = if self.ends_on_newline { self.to.line } else { self.to.line + 1 };
        (start, end.max(start))
    }
}

fn locate(newlines: &[usize], index: usize) -> Pos {
    // A newline belongs to the line it terminates.
    let line = newlines.partition_point(|&nl| nl < index);
    let line_start = if line > 0 { newlines[line - 1] + 1 } else { 0 };
    Pos::new(line, index - line_start)
}

/// Resolve byte ranges into line/column ranges over `text`.
pub fn raw_to_pos(ranges: &[DiffRange], text: &str) -> Vec<DiffRangePos> {
    let bytes = text.as_bytes();
    let newlines: Vec<usize> =
        bytes.iter().enumerate().filter(|(_, b)| **b == b'\n').map(|(i, _)| i).collect();
    let is_newline = |i: usize| bytes.get(i) == Some(&b'\n');

    ranges
        .iter()
        .map(|r| {
            let from = locate(&newlines, r.from);
            let to = locate(&newlines, r.to);
            let ends_on_newline = r.to > r.from && is_newline(r.to - 1);
            let starts_on_newline = is_newline(r.from);
            let first_line_new = from.ch == 0 && to.line > from.line;
            DiffRangePos {
                from,
                to,
                chunk_start_line: first_line_new || !starts_on_newline,
                ends_on_newline,
                source: r.source,
            }
        })
        .collect()
}
