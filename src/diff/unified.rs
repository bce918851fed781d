//! Reader for `git diff` output.
//!
//! Turns the unified diff text printed by `git diff` (any `-U` value) into
//! [`FileDiff`] values with numbered context, addition and deletion lines.
//! Hunk bodies are consumed by the counts in their header, so content that
//! happens to look like `--- a/...` or `@@` is never mistaken for structure.

use super::file::{FileDiff, FileStatus};
use super::hunk::{DiffHunk, HunkHeader};
use super::line::DiffLine;
use error_set::error_set;

error_set! {
    /// Errors from reading unified diff text
    ParseError := {
        /// Text is not empty but holds no `diff --git` section
        #[display("Diff output has no 'diff --git' header")]
        MissingFileHeader,
        /// A line where a hunk header was expected is not one
        #[display("Invalid hunk header '{line}'")]
        InvalidHunkHeader { line: String },
        /// The hunk body ended before its header's line counts were met
        #[display("Hunk '{header}' ends early")]
        TruncatedHunk { header: String },
        /// A hunk body line with an unknown prefix or beyond its counts
        #[display("Unexpected line in hunk '{header}': '{line}'")]
        UnexpectedLine { header: String, line: String },
    }
}

/// Parse complete `git diff` output into one [`FileDiff`] per file.
///
/// Empty output yields an empty list. Lines are split on `\n` only, so the
/// `\r` of a CRLF file stays part of the line content.
pub fn parse_unified(text: &str) -> Result<Vec<FileDiff>, ParseError> {
    let mut sections: Vec<Vec<&str>> = Vec::new();

    for line in text.split_terminator('\n') {
        if is_file_header(line) {
            sections.push(vec![line]);
        } else if let Some(section) = sections.last_mut() {
            section.push(line);
        } else if !line.trim().is_empty() {
            return Err(ParseError::MissingFileHeader);
        }
    }

    sections.iter().map(|lines| parse_file(lines)).collect()
}

fn is_file_header(line: &str) -> bool {
    line.starts_with("diff --git ")
        || line.starts_with("diff --cc ")
        || line.starts_with("diff --combined ")
}

/// Parse one file section, starting at its `diff ...` line
fn parse_file(lines: &[&str]) -> Result<FileDiff, ParseError> {
    let first = lines.first().copied().unwrap_or_default();

    // Unmerged paths come as combined diffs, which cannot be applied as patches
    if let Some(path) = first
        .strip_prefix("diff --cc ")
        .or_else(|| first.strip_prefix("diff --combined "))
    {
        let path = unquote(path.trim());
        return Ok(FileDiff::new(
            Some(path.clone()),
            Some(path),
            FileStatus::Conflicted,
            Vec::new(),
        ));
    }

    let (mut old_path, mut new_path) = paths_from_git_header(first);
    let mut status = FileStatus::Modified;
    let mut old_mode = None;
    let mut new_mode = None;
    let mut binary = false;

    let mut i = 1;
    while let Some(&line) = lines.get(i) {
        if line.starts_with("@@") {
            break;
        }
        if let Some(path) = line.strip_prefix("--- ") {
            old_path = side_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            new_path = side_path(path, "b/");
        } else if line.starts_with("new file mode") {
            status = FileStatus::Added;
            old_path = None;
        } else if line.starts_with("deleted file mode") {
            status = FileStatus::Deleted;
            new_path = None;
        } else if let Some(path) = line.strip_prefix("rename from ") {
            status = FileStatus::Renamed;
            old_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            new_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy from ") {
            status = FileStatus::Copied;
            old_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy to ") {
            new_path = Some(unquote(path));
        } else if let Some(mode) = line.strip_prefix("old mode ") {
            old_mode = Some(mode.trim());
        } else if let Some(mode) = line.strip_prefix("new mode ") {
            new_mode = Some(mode.trim());
        } else if line.starts_with("Binary files ") || line == "GIT binary patch" {
            binary = true;
        }
        i += 1;
    }

    if let (Some(old), Some(new)) = (old_mode, new_mode) {
        // The top three octal digits hold the object type (file, symlink, gitlink)
        if status == FileStatus::Modified && old.get(..3) != new.get(..3) {
            status = FileStatus::TypeChanged;
        }
    }

    if binary {
        return Ok(FileDiff::binary(old_path, new_path, status));
    }

    let mut hunks = Vec::new();
    while let Some(&line) = lines.get(i) {
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        let (hunk, next) = parse_hunk(lines, i)?;
        hunks.push(hunk);
        i = next;
    }

    Ok(FileDiff::new(old_path, new_path, status, hunks))
}

/// Parse the hunk whose header is at `lines[start]`.
///
/// Returns the hunk and the index of the first line after it.
fn parse_hunk(lines: &[&str], start: usize) -> Result<(DiffHunk, usize), ParseError> {
    let header_line = lines[start];
    let header = HunkHeader::parse(header_line).ok_or_else(|| ParseError::InvalidHunkHeader {
        line: header_line.to_string(),
    })?;

    let mut old_line = header.old_start;
    let mut new_line = header.new_start;
    let mut old_left = header.old_len;
    let mut new_left = header.new_len;
    let mut body: Vec<DiffLine> = Vec::new();
    let mut i = start + 1;

    let unexpected = |line: &str| ParseError::UnexpectedLine {
        header: header_line.to_string(),
        line: line.to_string(),
    };

    while old_left > 0 || new_left > 0 {
        let Some(&line) = lines.get(i) else {
            return Err(ParseError::TruncatedHunk {
                header: header_line.to_string(),
            });
        };
        i += 1;

        let mut chars = line.chars();
        let prefix = chars.next();
        let content = chars.as_str();

        match prefix {
            // Some tools strip the lone space of an empty context line
            Some(' ') | None if old_left > 0 && new_left > 0 => {
                body.push(DiffLine::context(old_line, new_line, content));
                old_line += 1;
                new_line += 1;
                old_left -= 1;
                new_left -= 1;
            }
            Some('-') if old_left > 0 => {
                body.push(DiffLine::deletion(old_line, content));
                old_line += 1;
                old_left -= 1;
            }
            Some('+') if new_left > 0 => {
                body.push(DiffLine::addition(new_line, content));
                new_line += 1;
                new_left -= 1;
            }
            Some('\\') => mark_missing_newline(&mut body),
            _ => return Err(unexpected(line)),
        }
    }

    // A marker for the final line comes after the counts are exhausted
    while let Some(&line) = lines.get(i) {
        if !line.starts_with('\\') {
            break;
        }
        mark_missing_newline(&mut body);
        i += 1;
    }

    Ok((DiffHunk::new(header_line, body), i))
}

fn mark_missing_newline(body: &mut [DiffLine]) {
    if let Some(last) = body.last_mut() {
        last.missing_final_newline = true;
    }
}

/// Extract both paths from `diff --git a/<old> b/<new>`
fn paths_from_git_header(line: &str) -> (Option<String>, Option<String>) {
    let Some(rest) = line.strip_prefix("diff --git ") else {
        return (None, None);
    };
    match rest.rfind(" b/").or_else(|| rest.rfind(" \"b/")) {
        Some(split) => (
            side_path(&rest[..split], "a/"),
            side_path(&rest[split + 1..], "b/"),
        ),
        None => (None, None),
    }
}

/// Path from a `---`/`+++` line or header half; `/dev/null` means no file
fn side_path(raw: &str, prefix: &str) -> Option<String> {
    let path = unquote(raw.trim_end_matches('\t'));
    if path == "/dev/null" {
        return None;
    }
    Some(path.strip_prefix(prefix).unwrap_or(path.as_str()).to_string())
}

/// Strip the C-style quotes git puts around unusual paths.
///
/// Non-ASCII bytes come as `\NNN` octal escapes (`core.quotePath`), so the
/// path is rebuilt from bytes.
fn unquote(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let mut out = Vec::with_capacity(inner.len());
    let mut bytes = inner.bytes().peekable();
    while let Some(b) = bytes.next() {
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let decoded = match bytes.next() {
            Some(b'a') => 0x07,
            Some(b'b') => 0x08,
            Some(b'f') => 0x0c,
            Some(b'n') => b'\n',
            Some(b'r') => b'\r',
            Some(b't') => b'\t',
            Some(b'v') => 0x0b,
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match bytes.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            bytes.next();
                        }
                        _ => break,
                    }
                }
                u8::try_from(value).unwrap_or(b'?')
            }
            Some(other) => other,
            None => b'\\',
        };
        out.push(decoded);
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::LineKind;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_empty_output() {
        assert_eq!(parse_unified("").unwrap(), vec![]);
    }

    #[test]
    fn parse_without_file_header() {
        let result = parse_unified("@@ -1 +1 @@\n-a\n+b\n");
        assert!(matches!(result, Err(ParseError::MissingFileHeader)));
    }

    #[test]
    fn parse_modified_file_with_context() {
        let text = r#"diff --git a/src/lib.rs b/src/lib.rs
index abc1234..def5678 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -10,3 +10,4 @@ fn main() {
 foo
-bar
+baz
+qux
 end
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files.len(), 1);

        let file = &files[0];
        assert_eq!(file.old_path.as_deref(), Some("src/lib.rs"));
        assert_eq!(file.new_path.as_deref(), Some("src/lib.rs"));
        assert_eq!(file.status, FileStatus::Modified);
        assert_eq!(file.additions, 2);
        assert_eq!(file.deletions, 1);
        assert_eq!(file.hunks.len(), 1);

        let hunk = &file.hunks[0];
        assert_eq!(hunk.header, "@@ -10,3 +10,4 @@ fn main() {");
        assert_eq!(
            hunk.lines,
            vec![
                DiffLine::context(10, 10, "foo"),
                DiffLine::deletion(11, "bar"),
                DiffLine::addition(11, "baz"),
                DiffLine::addition(12, "qux"),
                DiffLine::context(12, 13, "end"),
            ]
        );
    }

    #[test]
    fn parse_multiple_hunks_and_files() {
        let text = r#"diff --git a/config.nix b/config.nix
index fa2da6e..41114ff 100644
--- a/config.nix
+++ b/config.nix
@@ -2,0 +3 @@ line 2
+# FIRST INSERTION
@@ -8,0 +10 @@ line 8
+# SECOND INSERTION
diff --git a/zsh.nix b/zsh.nix
index 6f2e06d..110fff0 100644
--- a/zsh.nix
+++ b/zsh.nix
@@ -15 +14,0 @@ line 14
-      enableAutosuggestions = true;
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].hunks.len(), 2);
        assert_eq!(files[0].hunks[1].lines, vec![DiffLine::addition(10, "# SECOND INSERTION")]);
        assert_eq!(files[1].path(), "zsh.nix");
        assert_eq!(
            files[1].hunks[0].lines,
            vec![DiffLine::deletion(15, "      enableAutosuggestions = true;")]
        );
    }

    #[test]
    fn parse_content_that_looks_like_headers() {
        let text = r#"diff --git a/notes.md b/notes.md
index 1111111..2222222 100644
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,3 @@
--- a/not-a-header
+++ b/also-not-a-header
+@@ not a hunk
 tail
"#;
        let files = parse_unified(text).unwrap();
        let lines = &files[0].hunks[0].lines;
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], DiffLine::deletion(1, "-- a/not-a-header"));
        assert_eq!(lines[1], DiffLine::addition(1, "++ b/also-not-a-header"));
        assert_eq!(lines[2], DiffLine::addition(2, "@@ not a hunk"));
        assert_eq!(lines[3], DiffLine::context(2, 3, "tail"));
    }

    #[test]
    fn parse_missing_newline_markers() {
        let text = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -3 +3 @@\n-old version\n\\ No newline at end of file\n+new version\n\\ No newline at end of file\n";
        let files = parse_unified(text).unwrap();
        let lines = &files[0].hunks[0].lines;
        assert_eq!(
            lines,
            &vec![
                DiffLine::deletion(3, "old version").without_final_newline(),
                DiffLine::addition(3, "new version").without_final_newline(),
            ]
        );
    }

    #[test]
    fn parse_new_and_deleted_files() {
        let text = r#"diff --git a/fresh.txt b/fresh.txt
new file mode 100644
index 0000000..3b18e51
--- /dev/null
+++ b/fresh.txt
@@ -0,0 +1,2 @@
+hello
+world
diff --git a/gone.txt b/gone.txt
deleted file mode 100644
index 3b18e51..0000000
--- a/gone.txt
+++ /dev/null
@@ -1 +0,0 @@
-bye
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files[0].status, FileStatus::Added);
        assert_eq!(files[0].old_path, None);
        assert_eq!(files[0].new_path.as_deref(), Some("fresh.txt"));
        assert_eq!(files[0].hunks[0].lines[1], DiffLine::addition(2, "world"));

        assert_eq!(files[1].status, FileStatus::Deleted);
        assert_eq!(files[1].old_path.as_deref(), Some("gone.txt"));
        assert_eq!(files[1].new_path, None);
        assert_eq!(files[1].hunks[0].lines, vec![DiffLine::deletion(1, "bye")]);
    }

    #[test]
    fn parse_rename_without_content_change() {
        let text = r#"diff --git a/old name.txt b/new name.txt
similarity index 100%
rename from old name.txt
rename to new name.txt
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files[0].status, FileStatus::Renamed);
        assert_eq!(files[0].old_path.as_deref(), Some("old name.txt"));
        assert_eq!(files[0].new_path.as_deref(), Some("new name.txt"));
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn parse_binary_file() {
        let text = r#"diff --git a/logo.png b/logo.png
index 1111111..2222222 100644
Binary files a/logo.png and b/logo.png differ
"#;
        let files = parse_unified(text).unwrap();
        assert!(files[0].binary);
        assert!(files[0].hunks.is_empty());
        assert_eq!(files[0].path(), "logo.png");
    }

    #[test]
    fn parse_type_change() {
        let text = r#"diff --git a/link b/link
old mode 120000
new mode 100644
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files[0].status, FileStatus::TypeChanged);
    }

    #[test]
    fn parse_mode_change_only_is_modified() {
        let text = r#"diff --git a/run.sh b/run.sh
old mode 100644
new mode 100755
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files[0].status, FileStatus::Modified);
    }

    #[test]
    fn parse_conflicted_file() {
        let text = r#"diff --cc conflict.txt
index 1111111,2222222..0000000
--- a/conflict.txt
+++ b/conflict.txt
@@@ -1,1 -1,1 +1,5 @@@
++<<<<<<< HEAD
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files[0].status, FileStatus::Conflicted);
        assert!(files[0].hunks.is_empty());
    }

    #[test]
    fn parse_truncated_hunk() {
        let text = "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -1,3 +1,3 @@\n a\n";
        let result = parse_unified(text);
        assert!(matches!(result, Err(ParseError::TruncatedHunk { .. })));
    }

    #[test]
    fn parse_invalid_hunk_header() {
        let text = "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ nonsense @@\n";
        let result = parse_unified(text);
        assert!(matches!(result, Err(ParseError::InvalidHunkHeader { .. })));
    }

    #[test]
    fn parse_empty_context_line_without_space() {
        let text = "diff --git a/a b/a\n--- a/a\n+++ b/a\n@@ -1,2 +1,3 @@\n\n+x\n b\n";
        let files = parse_unified(text).unwrap();
        let kinds: Vec<_> = files[0].hunks[0].lines.iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LineKind::Context, LineKind::Addition, LineKind::Context]
        );
    }

    #[test]
    fn unquote_escaped_path() {
        assert_eq!(unquote("\"a/tab\\there\""), "a/tab\there");
        assert_eq!(unquote("\"a/say \\\"hi\\\" \\\\ bye\""), "a/say \"hi\" \\ bye");
        assert_eq!(unquote("plain/path"), "plain/path");
    }

    #[test]
    fn unquote_octal_escapes_as_utf8() {
        assert_eq!(unquote("\"b/caf\\303\\251.txt\""), "b/caf\u{e9}.txt");
        assert_eq!(unquote("\"\\346\\227\\245\\346\\234\\254\""), "\u{65e5}\u{672c}");
    }

    #[test]
    fn parse_quoted_non_ascii_paths() {
        let text = r#"diff --git "a/caf\303\251.txt" "b/caf\303\251.txt"
index 1111111..2222222 100644
--- "a/caf\303\251.txt"
+++ "b/caf\303\251.txt"
@@ -1 +1 @@
-old
+new
"#;
        let files = parse_unified(text).unwrap();
        assert_eq!(files[0].old_path.as_deref(), Some("caf\u{e9}.txt"));
        assert_eq!(files[0].new_path.as_deref(), Some("caf\u{e9}.txt"));
    }

    #[test]
    fn parse_keeps_carriage_returns_in_content() {
        let text = "diff --git a/dos.txt b/dos.txt\n--- a/dos.txt\n+++ b/dos.txt\n@@ -1,2 +1,2 @@\n one\r\n-two\r\n+TWO\r\n";
        let files = parse_unified(text).unwrap();
        assert_eq!(
            files[0].hunks[0].lines,
            vec![
                DiffLine::context(1, 1, "one\r"),
                DiffLine::deletion(2, "two\r"),
                DiffLine::addition(2, "TWO\r"),
            ]
        );
    }
}
