//! Grouping of added and removed line ranges into aligned chunks.
//!
//! Ranges are fed in text order. A range that overlaps the last chunk on
//! its own side (the edited side for an addition, the base side for a
//! deletion) extends that chunk; any other range opens a new one. A running
//! `edit_offset` (base line = edited line + offset) projects lines from one
//! side to the other.

use tracing::trace;

use crate::diff::{ChunkSource, DiffRangePos};

/// Corresponding half-open line spans of the base and the edited text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Chunk {
    pub base_from: usize,
    pub base_to: usize,
    pub remote_from: usize,
    pub remote_to: usize,
    /// Decisions that contributed to the chunk. Empty for an alignment
    /// chunk with no changes.
    pub sources: Vec<ChunkSource>,
}

impl Chunk {
    pub fn new(base_from: usize, base_to: usize, remote_from: usize, remote_to: usize) -> Self {
        Self { base_from, base_to, remote_from, remote_to, sources: Vec::new() }
    }

    /// Whether `line` touches the base span. The end is inclusive so a
    /// range starting right after the chunk is folded in.
    pub fn in_base(&self, line: usize) -> bool {
        self.base_from <= line && line <= self.base_to
    }

    /// Whether `line` touches the edited span, end inclusive.
    pub fn in_edit(&self, line: usize) -> bool {
        self.remote_from <= line && line <= self.remote_to
    }

    /// Lines were added but none removed.
    pub fn is_pure_insertion(&self) -> bool {
        self.base_from == self.base_to
    }

    /// Lines were removed but none added.
    pub fn is_pure_deletion(&self) -> bool {
        self.remote_from == self.remote_to
    }

    pub fn add_source(&mut self, source: Option<ChunkSource>) {
        if let Some(s) = source {
            if !self.sources.contains(&s) {
                self.sources.push(s);
            }
        }
    }

    fn add_sources(&mut self, sources: &[ChunkSource]) {
        for s in sources {
            self.add_source(Some(*s));
        }
    }
}

/// Overlap rule used by a [`Chunker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkStrategy {
    /// Merge any range that touches the current chunk.
    #[default]
    Default,
    /// Keep insertions (or deletions) on consecutive lines apart so each
    /// line stays independently pickable.
    Line,
}

fn to_line(x: isize) -> usize {
    usize::try_from(x).unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct Chunker {
    strategy: ChunkStrategy,
    chunks: Vec<Chunk>,
    edit_offset: isize,
    current_ghost: Option<usize>,
}

impl Chunker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_based() -> Self {
        Self::with_strategy(ChunkStrategy::Line)
    }

    pub fn with_strategy(strategy: ChunkStrategy) -> Self {
        Self { strategy, ..Self::default() }
    }

    pub fn strategy(&self) -> ChunkStrategy {
        self.strategy
    }

    /// Base line minus edited line after everything fed so far.
    pub fn edit_offset(&self) -> isize {
        self.edit_offset
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    // The last real chunk, unless a ghost was added since.
    fn current(&mut self) -> Option<usize> {
        if self.current_ghost.take().is_some() {
            return None;
        }
        self.chunks.len().checked_sub(1)
    }

    fn overlaps(&self, chunk: &Chunk, line: usize, is_addition: bool) -> bool {
        let nudge = match self.strategy {
            ChunkStrategy::Default => false,
            ChunkStrategy::Line => {
                (is_addition && chunk.is_pure_insertion()) || (!is_addition && chunk.is_pure_deletion())
            }
        };
        let line = line + usize::from(nudge);
        if is_addition {
            chunk.in_edit(line)
        } else {
            chunk.in_base(line)
        }
    }

    /// Feed one added (edited side) or removed (base side) range.
    pub fn add_diff(&mut self, range: &DiffRangePos, is_addition: bool) {
        let (start, end) = range.lines();
        let linediff = range.line_span() as isize;
        let offset = self.edit_offset;
        let current = self.current().filter(|&i| self.overlaps(&self.chunks[i], start, is_addition));

        match current {
            Some(i) => {
                let chunk = &mut self.chunks[i];
                if is_addition {
                    chunk.remote_to = chunk.remote_to.max(end);
                    self.edit_offset = offset - linediff;
                    chunk.base_to = chunk.base_to.max(to_line(chunk.remote_to as isize + self.edit_offset));
                } else {
                    chunk.base_to = chunk.base_to.max(end);
                    self.edit_offset = offset + linediff;
                    chunk.remote_to = chunk.remote_to.max(to_line(chunk.base_to as isize - self.edit_offset));
                }
                chunk.add_source(range.source);
            }
            None => {
                let mut chunk = if is_addition {
                    self.edit_offset = offset - linediff;
                    let base_from = to_line(start as isize + offset);
                    let base_to = to_line(end as isize + self.edit_offset).max(base_from);
                    Chunk::new(base_from, base_to, start, end)
                } else {
                    self.edit_offset = offset + linediff;
                    let remote_from = to_line(start as isize - offset);
                    let remote_to = to_line(end as isize - self.edit_offset).max(remote_from);
                    Chunk::new(start, end, remote_from, remote_to)
                };
                chunk.add_source(range.source);
                trace!(?chunk, is_addition, "new chunk");
                self.chunks.push(chunk);
            }
        }
    }

    /// Feed a range of a diff that has not been applied. Ghost chunks map
    /// lines one to one, with the other side displaced by `offset`, and
    /// never merge with real chunks.
    pub fn add_ghost(&mut self, range: &DiffRangePos, is_addition: bool, offset: isize) {
        let (start, end) = range.lines();
        let other = |line: usize| if is_addition { to_line(line as isize + offset) } else { to_line(line as isize - offset) };

        if let Some(i) = self.current_ghost {
            let chunk = &mut self.chunks[i];
            let hit = if is_addition { chunk.in_edit(start) } else { chunk.in_base(start) };
            if hit {
                if is_addition {
                    chunk.remote_to = chunk.remote_to.max(end);
                    chunk.base_to = chunk.base_to.max(other(chunk.remote_to));
                } else {
                    chunk.base_to = chunk.base_to.max(end);
                    chunk.remote_to = chunk.remote_to.max(other(chunk.base_to));
                }
                chunk.add_source(range.source);
                return;
            }
        }

        let mut chunk = if is_addition {
            Chunk::new(other(start), other(end), start, end)
        } else {
            Chunk::new(start, end, other(start), other(end))
        };
        chunk.add_source(range.source);
        trace!(?chunk, is_addition, "new ghost chunk");
        self.chunks.push(chunk);
        self.current_ghost = Some(self.chunks.len() - 1);
    }

    /// Chunks ordered by `base_from`; chunks starting on the same base line
    /// keep their creation order.
    pub fn finish(mut self) -> Vec<Chunk> {
        nbmerge_util::insertion_sort_by(&mut self.chunks, |a, b| a.base_from.cmp(&b.base_from));
        self.chunks
    }
}

/// Feed additions and deletions to `chunker` in line order. Each addition
/// is placed by its edited line, each deletion by its base line projected
/// onto the edited side; a deletion goes first when both land on the same
/// line.
pub fn feed_ranges(chunker: &mut Chunker, additions: &[DiffRangePos], deletions: &[DiffRangePos]) {
    let (mut a, mut d) = (0, 0);
    while a < additions.len() || d < deletions.len() {
        let take_deletion = match (additions.get(a), deletions.get(d)) {
            (Some(add), Some(del)) => {
                del.lines().0 as isize - chunker.edit_offset() <= add.lines().0 as isize
            }
            (None, Some(_)) => true,
            _ => false,
        };
        if take_deletion {
            chunker.add_diff(&deletions[d], false);
            d += 1;
        } else {
            chunker.add_diff(&additions[a], true);
            a += 1;
        }
    }
}

/// Coarsen chunks made by a line based chunker: a chunk whose edited span
/// starts inside the edited span of the previous one is merged into it.
pub fn line_to_normal_chunks(line_chunks: &[Chunk]) -> Vec<Chunk> {
    let mut out: Vec<Chunk> = Vec::with_capacity(line_chunks.len());
    for c in line_chunks {
        match out.last_mut() {
            Some(current) if current.in_edit(c.remote_from) => {
                current.base_to = current.base_to.max(c.base_to);
                current.remote_to = current.remote_to.max(c.remote_to);
                current.add_sources(&c.sources);
            }
            _ => out.push(c.clone()),
        }
    }
    out
}
