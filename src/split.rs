//! Side-by-side pairing of hunk lines.
//!
//! Lines are paired by position inside same-kind runs, never by textual
//! similarity: a deletion run and the addition run right after it are laid
//! next to each other row by row, and the shorter run leaves blank cells.
//! Every [`LineRef`] keeps the line's index within the hunk so selection
//! lookups work the same way in split and unified views.

use crate::diff::{DiffLine, LineKind};
use serde::Serialize;

/// A line of a hunk together with its index in that hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRef<'a> {
    pub index: usize,
    pub line: &'a DiffLine,
}

/// One row of the split view. Context rows have the same line on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinePair<'a> {
    pub left: Option<LineRef<'a>>,
    pub right: Option<LineRef<'a>>,
}

/// Pair the lines of one hunk for side-by-side display.
///
/// The number of rows is the number of context lines plus, for each
/// deletion run and the addition run following it, the longer of the two.
///
/// ```
/// use git_partial::diff::DiffLine;
/// use git_partial::split::pair_for_split;
///
/// let lines = vec![
///     DiffLine::deletion(4, "a"),
///     DiffLine::deletion(5, "b"),
///     DiffLine::addition(4, "A"),
/// ];
/// let pairs = pair_for_split(&lines);
/// assert_eq!(pairs.len(), 2);
/// assert!(pairs[1].right.is_none());
/// ```
#[must_use]
pub fn pair_for_split(lines: &[DiffLine]) -> Vec<LinePair<'_>> {
    let mut pairs = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        match lines[i].kind {
            LineKind::Context => {
                let line = Some(LineRef {
                    index: i,
                    line: &lines[i],
                });
                pairs.push(LinePair {
                    left: line,
                    right: line,
                });
                i += 1;
            }
            LineKind::Deletion | LineKind::Addition => {
                let deletions = run_of(lines, i, LineKind::Deletion);
                let additions = run_of(lines, deletions.end, LineKind::Addition);
                i = additions.end;

                let rows = deletions.len().max(additions.len());
                for row in 0..rows {
                    pairs.push(LinePair {
                        left: line_ref(lines, deletions.start + row, deletions.end),
                        right: line_ref(lines, additions.start + row, additions.end),
                    });
                }
            }
        }
    }

    pairs
}

/// The index range of consecutive `kind` lines starting at `start`
fn run_of(lines: &[DiffLine], start: usize, kind: LineKind) -> std::ops::Range<usize> {
    let len = lines[start..]
        .iter()
        .take_while(|line| line.kind == kind)
        .count();
    start..start + len
}

fn line_ref(lines: &[DiffLine], index: usize, end: usize) -> Option<LineRef<'_>> {
    (index < end).then(|| LineRef {
        index,
        line: &lines[index],
    })
}
