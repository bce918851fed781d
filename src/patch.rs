//! Patch text for whole hunks and for selected lines.
//!
//! Both generators are pure. Their output is a single-file unified diff that
//! `git apply` accepts on its own:
//!
//! ```text
//! diff --git a/<old> b/<new>
//! --- a/<old>
//! +++ b/<new>
//! @@ -<old start>,<old len> +<new start>,<new len> @@<label>
//!  <context>
//! -<deleted>
//! +<added>
//! ```
//!
//! Calling either generator on a binary diff, or with a hunk index the diff
//! does not have, is a bug in the caller and panics.

use crate::diff::{DiffLine, FileDiff, HunkHeader, LineKind};
use crate::selection::LineKey;
use std::collections::BTreeSet;
use std::fmt::Write;

const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Patch containing one complete hunk of `diff`.
///
/// The original header is reused as is, since every line of the hunk is
/// included.
///
/// # Panics
///
/// If `diff` is binary or has no hunk `hunk_index`.
#[must_use]
pub fn generate_hunk_patch(diff: &FileDiff, hunk_index: usize) -> String {
    assert!(
        !diff.binary,
        "cannot build a patch for binary file {}",
        diff.path()
    );
    assert!(
        hunk_index < diff.hunks.len(),
        "hunk {hunk_index} out of range for {} ({} hunks)",
        diff.path(),
        diff.hunks.len()
    );

    let hunk = &diff.hunks[hunk_index];
    let mut patch = file_header(diff);
    patch.push_str(hunk.header.trim_end_matches(['\r', '\n']));
    patch.push('\n');
    for line in &hunk.lines {
        push_line(&mut patch, line);
    }

    log::debug!(
        "hunk patch for {} hunk {hunk_index}: {} lines",
        diff.path(),
        hunk.lines.len()
    );
    patch
}

/// Patch containing only the selected additions and deletions of `diff`.
///
/// Every context line of an affected hunk is kept as an anchor, unselected
/// changes are left out entirely, and hunk headers are recomputed so the
/// patch applies on its own. Hunks without a selected change are skipped.
///
/// Returns `None` when nothing selected is a change line.
///
/// # Panics
///
/// If `diff` is binary or a key names a hunk the diff does not have.
#[must_use]
#[allow(clippy::panic)]
pub fn generate_partial_patch(diff: &FileDiff, selected: &BTreeSet<LineKey>) -> Option<String> {
    assert!(
        !diff.binary,
        "cannot build a patch for binary file {}",
        diff.path()
    );
    if let Some(key) = selected.iter().find(|key| key.hunk >= diff.hunks.len()) {
        panic!(
            "selected hunk {} out of range for {} ({} hunks)",
            key.hunk,
            diff.path(),
            diff.hunks.len()
        );
    }

    let mut body = String::new();
    let mut cumulative_offset: i64 = 0;

    for (hunk_index, hunk) in diff.hunks.iter().enumerate() {
        let is_selected = |line_index: usize| selected.contains(&LineKey::new(hunk_index, line_index));

        let kept: Vec<&DiffLine> = hunk
            .lines
            .iter()
            .enumerate()
            .filter(|(i, line)| match line.kind {
                LineKind::Context => true,
                LineKind::Addition | LineKind::Deletion => is_selected(*i),
            })
            .map(|(_, line)| line)
            .collect();

        let kept_context = kept.iter().filter(|l| l.kind == LineKind::Context).count();
        let kept_old = kept.iter().filter(|l| l.kind == LineKind::Deletion).count();
        let kept_new = kept.iter().filter(|l| l.kind == LineKind::Addition).count();
        if kept_old + kept_new == 0 {
            continue;
        }

        body.push_str(&recompute_hunk_header(
            &hunk.header,
            kept_context,
            kept_old,
            kept_new,
            cumulative_offset,
        ));
        body.push('\n');
        for line in kept {
            push_line(&mut body, line);
        }

        cumulative_offset += kept_new as i64 - kept_old as i64;
    }

    if body.is_empty() {
        return None;
    }

    log::debug!(
        "partial patch for {}: {} selected lines",
        diff.path(),
        selected.len()
    );
    let mut patch = file_header(diff);
    patch.push_str(&body);
    Some(patch)
}

/// Header for a hunk reduced to `kept_context` context lines, `kept_old`
/// deletions and `kept_new` additions.
///
/// The old start stays as in `original`. The new start is the old start
/// moved by `cumulative_offset`, the net line count added by hunks earlier
/// in the same patch. Following unified diff convention, an empty side
/// names the line before the change, so an empty old side puts the new
/// start one line later and an empty new side puts it one line earlier.
/// The label after the closing `@@` is preserved.
///
/// # Panics
///
/// If `original` is not a hunk header.
#[must_use]
#[allow(clippy::panic)]
pub fn recompute_hunk_header(
    original: &str,
    kept_context: usize,
    kept_old: usize,
    kept_new: usize,
    cumulative_offset: i64,
) -> String {
    let Some(header) = HunkHeader::parse(original) else {
        panic!("malformed hunk header {original:?}");
    };

    let old_len = kept_context + kept_old;
    let new_len = kept_context + kept_new;

    let mut new_start = i64::from(header.old_start) + cumulative_offset;
    if old_len == 0 && new_len > 0 {
        new_start += 1;
    } else if new_len == 0 && old_len > 0 {
        new_start -= 1;
    }

    HunkHeader {
        old_start: header.old_start,
        old_len: to_u32(old_len),
        new_start: u32::try_from(new_start.max(0)).unwrap_or(u32::MAX),
        new_len: to_u32(new_len),
        label: header.label,
    }
    .to_string()
}

fn to_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn file_header(diff: &FileDiff) -> String {
    let (old, new) = diff.patch_paths();
    let mut header = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(header, "diff --git a/{old} b/{new}");
    let _ = writeln!(header, "--- a/{old}");
    let _ = writeln!(header, "+++ b/{new}");
    header
}

fn push_line(patch: &mut String, line: &DiffLine) {
    patch.push(line.kind.prefix());
    patch.push_str(&line.content);
    patch.push('\n');
    if line.missing_final_newline {
        patch.push_str(NO_NEWLINE_MARKER);
        patch.push('\n');
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::{DiffHunk, FileStatus, parse_unified};
    use similar_asserts::assert_eq;

    fn modified(path: &str, hunks: Vec<DiffHunk>) -> FileDiff {
        FileDiff::new(
            Some(path.to_string()),
            Some(path.to_string()),
            FileStatus::Modified,
            hunks,
        )
    }

    fn scenario() -> FileDiff {
        modified(
            "src/lib.rs",
            vec![DiffHunk::new(
                "@@ -10,3 +10,4 @@",
                vec![
                    DiffLine::context(10, 10, "foo"),
                    DiffLine::deletion(11, "bar"),
                    DiffLine::addition(11, "baz"),
                    DiffLine::addition(12, "qux"),
                    DiffLine::context(12, 13, "end"),
                ],
            )],
        )
    }

    fn select(keys: &[(usize, usize)]) -> BTreeSet<LineKey> {
        keys.iter().map(|&(h, l)| LineKey::new(h, l)).collect()
    }

    #[test]
    fn hunk_patch_reproduces_the_hunk() {
        let patch = generate_hunk_patch(&scenario(), 0);
        assert_eq!(
            patch,
            "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -10,3 +10,4 @@\n foo\n-bar\n+baz\n+qux\n end\n"
        );
    }

    #[test]
    fn hunk_patch_normalizes_header_newline() {
        let diff = modified(
            "a.txt",
            vec![DiffHunk::new(
                "@@ -1,1 +1,1 @@ label\r\n",
                vec![DiffLine::deletion(1, "x"), DiffLine::addition(1, "y")],
            )],
        );
        insta::assert_snapshot!(generate_hunk_patch(&diff, 0), @r"
        diff --git a/a.txt b/a.txt
        --- a/a.txt
        +++ b/a.txt
        @@ -1,1 +1,1 @@ label
        -x
        +y
        ");
    }

    #[test]
    fn hunk_patch_keeps_carriage_returns() {
        let diff = modified(
            "dos.txt",
            vec![DiffHunk::new(
                "@@ -1,2 +1,2 @@",
                vec![
                    DiffLine::context(1, 1, "one\r"),
                    DiffLine::deletion(2, "two\r"),
                    DiffLine::addition(2, "TWO\r"),
                ],
            )],
        );
        let patch = generate_hunk_patch(&diff, 0);
        assert!(patch.ends_with("@@ -1,2 +1,2 @@\n one\r\n-two\r\n+TWO\r\n"));
        assert_eq!(parse_unified(&patch).unwrap()[0].hunks, diff.hunks);
    }

    #[test]
    fn hunk_patch_for_added_file_uses_new_path_on_both_sides() {
        let diff = FileDiff::new(
            None,
            Some("docs/new.md".to_string()),
            FileStatus::Added,
            vec![DiffHunk::new(
                "@@ -0,0 +1,1 @@",
                vec![DiffLine::addition(1, "hello")],
            )],
        );
        let patch = generate_hunk_patch(&diff, 0);
        assert!(patch.starts_with(
            "diff --git a/docs/new.md b/docs/new.md\n--- a/docs/new.md\n+++ b/docs/new.md\n"
        ));
    }

    #[test]
    fn hunk_patch_keeps_missing_newline_marker() {
        let diff = modified(
            "a.txt",
            vec![DiffHunk::new(
                "@@ -3 +3 @@",
                vec![
                    DiffLine::deletion(3, "old").without_final_newline(),
                    DiffLine::addition(3, "new"),
                ],
            )],
        );
        let patch = generate_hunk_patch(&diff, 0);
        assert!(patch.ends_with("@@ -3 +3 @@\n-old\n\\ No newline at end of file\n+new\n"));
    }

    #[test]
    #[should_panic(expected = "binary")]
    fn hunk_patch_rejects_binary_diff() {
        let diff = FileDiff::binary(None, Some("logo.png".to_string()), FileStatus::Added);
        let _ = generate_hunk_patch(&diff, 0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn hunk_patch_rejects_missing_hunk() {
        let _ = generate_hunk_patch(&scenario(), 1);
    }

    #[test]
    fn partial_patch_for_single_addition() {
        let patch = generate_partial_patch(&scenario(), &select(&[(0, 2)])).unwrap();
        assert_eq!(
            patch,
            "diff --git a/src/lib.rs b/src/lib.rs\n--- a/src/lib.rs\n+++ b/src/lib.rs\n@@ -10,2 +10,3 @@\n foo\n+baz\n end\n"
        );
    }

    #[test]
    fn partial_patch_drops_unselected_changes() {
        let diff = modified(
            "a.txt",
            vec![DiffHunk::new(
                "@@ -1,3 +1,3 @@",
                vec![
                    DiffLine::context(1, 1, "context"),
                    DiffLine::deletion(2, "A"),
                    DiffLine::deletion(3, "B"),
                    DiffLine::addition(2, "C"),
                    DiffLine::addition(3, "D"),
                ],
            )],
        );
        let patch = generate_partial_patch(&diff, &select(&[(0, 1), (0, 3)])).unwrap();
        let body: Vec<&str> = patch.lines().skip(4).collect();
        assert_eq!(body, vec![" context", "-A", "+C"]);
        assert!(patch.contains("@@ -1,2 +1,2 @@\n"));
    }

    #[test]
    fn partial_patch_with_empty_selection_is_none() {
        assert_eq!(generate_partial_patch(&scenario(), &BTreeSet::new()), None);
    }

    #[test]
    fn partial_patch_ignores_selected_context() {
        assert_eq!(generate_partial_patch(&scenario(), &select(&[(0, 0)])), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn partial_patch_rejects_missing_hunk() {
        let _ = generate_partial_patch(&scenario(), &select(&[(3, 0)]));
    }

    #[test]
    #[should_panic(expected = "binary")]
    fn partial_patch_rejects_binary_diff() {
        let diff = FileDiff::binary(Some("a.bin".to_string()), Some("a.bin".to_string()), FileStatus::Modified);
        let _ = generate_partial_patch(&diff, &select(&[(0, 0)]));
    }

    #[test]
    fn partial_patch_offsets_later_hunks() {
        // Hunk 0 adds two lines, hunk 1 adds two lines further down
        let diff = modified(
            "test.txt",
            vec![
                DiffHunk::new(
                    "@@ -3,1 +3,3 @@",
                    vec![
                        DiffLine::context(3, 3, "three"),
                        DiffLine::addition(4, "NEW 1"),
                        DiffLine::addition(5, "NEW 2"),
                    ],
                ),
                DiffHunk::new(
                    "@@ -7,1 +9,3 @@ tail",
                    vec![
                        DiffLine::context(7, 9, "seven"),
                        DiffLine::addition(10, "NEW 3"),
                        DiffLine::addition(11, "NEW 4"),
                    ],
                ),
            ],
        );

        let patch = generate_partial_patch(&diff, &select(&[(0, 1), (1, 1)])).unwrap();
        insta::assert_snapshot!(patch, @r"
        diff --git a/test.txt b/test.txt
        --- a/test.txt
        +++ b/test.txt
        @@ -3,1 +3,2 @@
         three
        +NEW 1
        @@ -7,1 +8,2 @@ tail
         seven
        +NEW 3
        ");
    }

    #[test]
    fn partial_patch_skipped_hunk_adds_no_offset() {
        let diff = modified(
            "test.txt",
            vec![
                DiffHunk::new(
                    "@@ -3,1 +3,2 @@",
                    vec![DiffLine::context(3, 3, "three"), DiffLine::addition(4, "NEW")],
                ),
                DiffHunk::new(
                    "@@ -7,2 +8,1 @@",
                    vec![DiffLine::context(7, 8, "seven"), DiffLine::deletion(8, "eight")],
                ),
            ],
        );

        let patch = generate_partial_patch(&diff, &select(&[(1, 1)])).unwrap();
        assert!(patch.ends_with("@@ -7,2 +7,1 @@\n seven\n-eight\n"));
    }

    #[test]
    fn recompute_keeps_old_start_and_label() {
        assert_eq!(
            recompute_hunk_header("@@ -10,3 +10,4 @@ fn main()", 2, 0, 1, 0),
            "@@ -10,2 +10,3 @@ fn main()"
        );
    }

    #[test]
    fn recompute_applies_cumulative_offset() {
        assert_eq!(recompute_hunk_header("@@ -40,5 +44,9 @@", 4, 1, 0, 3), "@@ -40,5 +43,4 @@");
        assert_eq!(recompute_hunk_header("@@ -40,5 +38,9 @@", 4, 0, 2, -2), "@@ -40,4 +38,6 @@");
    }

    #[test]
    fn recompute_pure_insertion_without_context() {
        assert_eq!(recompute_hunk_header("@@ -136,0 +137 @@", 0, 0, 1, 0), "@@ -136,0 +137,1 @@");
        assert_eq!(recompute_hunk_header("@@ -0,0 +1,3 @@", 0, 0, 2, 0), "@@ -0,0 +1,2 @@");
    }

    #[test]
    fn recompute_pure_deletion_without_context() {
        assert_eq!(recompute_hunk_header("@@ -15 +14,0 @@", 0, 1, 0, 0), "@@ -15,1 +14,0 @@");
        assert_eq!(recompute_hunk_header("@@ -1,2 +0,0 @@", 0, 2, 0, 0), "@@ -1,2 +0,0 @@");
    }

    #[test]
    fn recompute_never_goes_below_zero() {
        assert_eq!(recompute_hunk_header("@@ -1,1 +1,0 @@", 0, 1, 0, -5), "@@ -1,1 +0,0 @@");
    }

    #[test]
    #[should_panic(expected = "malformed hunk header")]
    fn recompute_rejects_malformed_header() {
        let _ = recompute_hunk_header("not a header", 1, 0, 0, 0);
    }
}
