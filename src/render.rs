//! Plain-text and JSON views of a file diff for the command line.
//!
//! Every line row starts with its `hunk:line` key, the same reference the
//! `--lines` option accepts. Rows never carry trailing whitespace.

use crate::diff::{DiffLine, FileDiff};
use crate::selection::LineSelection;
use crate::split::{LinePair, LineRef, pair_for_split};
use serde::Serialize;
use std::fmt::Write;

/// Width of the text column on each side of the split view
pub const DEFAULT_SPLIT_WIDTH: usize = 40;

/// `path (status, +N -M)`
#[must_use]
pub fn summary_line(diff: &FileDiff) -> String {
    format!(
        "{} ({}, +{} -{})",
        diff.path(),
        diff.status,
        diff.additions,
        diff.deletions
    )
}

/// One row per line, old and new line numbers side by side.
///
/// Lines in `selection` are marked with `*` after the key.
#[must_use]
pub fn render_unified(diff: &FileDiff, selection: Option<&LineSelection>) -> String {
    let mut out = String::new();
    push_row(&mut out, &summary_line(diff));
    if diff.binary {
        push_row(&mut out, "Binary file not shown");
        return out;
    }

    for (h, hunk) in diff.hunks.iter().enumerate() {
        push_row(&mut out, &hunk.header);
        for (l, line) in hunk.lines.iter().enumerate() {
            let marked = selection.is_some_and(|s| s.is_line_selected(h, l));
            let row = format!(
                "{:<7}{} {:>5} {:>5} {}{}",
                format!("{h}:{l}"),
                if marked { '*' } else { ' ' },
                number(line.old_line),
                number(line.new_line),
                line.kind.prefix(),
                line.content
            );
            push_row(&mut out, &row);
        }
    }
    out
}

/// Old side on the left, new side on the right, paired with
/// [`pair_for_split`]. Text longer than `width` is cut off.
#[must_use]
pub fn render_split(diff: &FileDiff, width: usize) -> String {
    let mut out = String::new();
    push_row(&mut out, &summary_line(diff));
    if diff.binary {
        push_row(&mut out, "Binary file not shown");
        return out;
    }

    for (h, hunk) in diff.hunks.iter().enumerate() {
        push_row(&mut out, &hunk.header);
        for pair in pair_for_split(&hunk.lines) {
            let row = format!(
                "{} | {}",
                split_cell(h, pair.left, |line| line.old_line, width),
                split_cell(h, pair.right, |line| line.new_line, width)
            );
            push_row(&mut out, &row);
        }
    }
    out
}

fn split_cell(
    hunk: usize,
    cell: Option<LineRef<'_>>,
    line_number: impl Fn(&DiffLine) -> Option<u32>,
    width: usize,
) -> String {
    // key, number, prefix and text
    let blank_width = 7 + 6 + 1 + width;
    let Some(LineRef { index, line }) = cell else {
        return " ".repeat(blank_width);
    };
    let text: String = line
        .content
        .trim_end_matches('\r')
        .chars()
        .take(width)
        .collect();
    format!(
        "{:<7}{:>5} {}{:<width$}",
        format!("{hunk}:{index}"),
        number(line_number(line)),
        line.kind.prefix(),
        text
    )
}

fn number(line: Option<u32>) -> String {
    line.map(|n| n.to_string()).unwrap_or_default()
}

fn push_row(out: &mut String, row: &str) {
    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", row.trim_end());
}

/// JSON shape of the split view
#[derive(Debug, Serialize)]
pub struct SplitView<'a> {
    #[serde(flatten)]
    pub diff: SplitHeader<'a>,
    pub hunks: Vec<SplitHunk<'a>>,
}

/// File-level fields of [`SplitView`]
#[derive(Debug, Serialize)]
pub struct SplitHeader<'a> {
    pub old_path: Option<&'a str>,
    pub new_path: Option<&'a str>,
    pub status: crate::diff::FileStatus,
    pub additions: usize,
    pub deletions: usize,
    pub binary: bool,
}

/// One hunk of [`SplitView`]
#[derive(Debug, Serialize)]
pub struct SplitHunk<'a> {
    pub header: &'a str,
    pub rows: Vec<LinePair<'a>>,
}

impl<'a> SplitView<'a> {
    #[must_use]
    pub fn new(diff: &'a FileDiff) -> Self {
        Self {
            diff: SplitHeader {
                old_path: diff.old_path.as_deref(),
                new_path: diff.new_path.as_deref(),
                status: diff.status,
                additions: diff.additions,
                deletions: diff.deletions,
                binary: diff.binary,
            },
            hunks: diff
                .hunks
                .iter()
                .map(|hunk| SplitHunk {
                    header: &hunk.header,
                    rows: pair_for_split(&hunk.lines),
                })
                .collect(),
        }
    }
}

/// Serialize the diff as pretty JSON, unified or split
pub fn render_json(diff: &FileDiff, split: bool) -> Result<String, serde_json::Error> {
    if split {
        serde_json::to_string_pretty(&SplitView::new(diff))
    } else {
        serde_json::to_string_pretty(diff)
    }
}
