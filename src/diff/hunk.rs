use super::line::{DiffLine, LineKind};
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::u32 as line_number,
    combinator::{opt, rest},
    sequence::preceded,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The numeric part of a `@@ -a,b +c,d @@label` hunk header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_len: u32,
    pub new_start: u32,
    pub new_len: u32,
    /// Everything after the closing `@@`, including its leading space
    pub label: String,
}

impl HunkHeader {
    /// Parse a header line. A trailing newline is ignored.
    ///
    /// Returns `None` if the line is not a unified diff hunk header.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        header(line.trim_end_matches(['\r', '\n']))
            .ok()
            .map(|(_, header)| header)
    }
}

/// `start` or `start,len`; a missing length means one line
fn span(input: &str) -> IResult<&str, (u32, u32)> {
    (line_number, opt(preceded(tag(","), line_number)))
        .map(|(start, len)| (start, len.unwrap_or(1)))
        .parse(input)
}

fn header(input: &str) -> IResult<&str, HunkHeader> {
    (
        preceded(tag("@@ -"), span),
        preceded(tag(" +"), span),
        preceded(tag(" @@"), rest),
    )
        .map(
            |((old_start, old_len), (new_start, new_len), label): (_, _, &str)| HunkHeader {
                old_start,
                old_len,
                new_start,
                new_len,
                label: label.to_string(),
            },
        )
        .parse(input)
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@{}",
            self.old_start, self.old_len, self.new_start, self.new_len, self.label
        )
    }
}

/// A single hunk of a file diff.
///
/// The header is kept verbatim for display; its identity in the UI is the
/// hunk's index within the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub header: String,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    #[must_use]
    pub fn new(header: impl Into<String>, lines: Vec<DiffLine>) -> Self {
        Self {
            header: header.into(),
            lines,
        }
    }

    /// Parsed form of [`DiffHunk::header`]
    #[must_use]
    pub fn header_range(&self) -> Option<HunkHeader> {
        HunkHeader::parse(&self.header)
    }

    /// Number of lines of the given kind
    #[must_use]
    pub fn count(&self, kind: LineKind) -> usize {
        self.lines.iter().filter(|line| line.kind == kind).count()
    }

    /// True if the hunk has at least one addition or deletion
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|line| line.kind.is_change())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_full_header() {
        let header = HunkHeader::parse("@@ -10,3 +10,4 @@").unwrap();
        assert_eq!(
            header,
            HunkHeader {
                old_start: 10,
                old_len: 3,
                new_start: 10,
                new_len: 4,
                label: String::new(),
            }
        );
    }

    #[test]
    fn parse_header_with_label_and_newline() {
        let header = HunkHeader::parse("@@ -38,0 +39,5 @@ fn main() {\n").unwrap();
        assert_eq!(header.old_start, 38);
        assert_eq!(header.old_len, 0);
        assert_eq!(header.new_start, 39);
        assert_eq!(header.new_len, 5);
        assert_eq!(header.label, " fn main() {");
    }

    #[test]
    fn parse_header_with_implicit_lengths() {
        let header = HunkHeader::parse("@@ -15 +14,0 @@").unwrap();
        assert_eq!(header.old_start, 15);
        assert_eq!(header.old_len, 1);
        assert_eq!(header.new_start, 14);
        assert_eq!(header.new_len, 0);
    }

    #[test]
    fn parse_rejects_non_headers() {
        assert!(HunkHeader::parse("+++ b/file.rs").is_none());
        assert!(HunkHeader::parse("@@ -x,1 +1 @@").is_none());
        assert!(HunkHeader::parse("@@@ -1,2 -1,2 +1,3 @@@").is_none());
        assert!(HunkHeader::parse("").is_none());
    }

    #[test]
    fn render_always_spells_out_lengths() {
        let header = HunkHeader {
            old_start: 15,
            old_len: 1,
            new_start: 14,
            new_len: 0,
            label: " section".to_string(),
        };
        assert_eq!(header.to_string(), "@@ -15,1 +14,0 @@ section");
    }

    #[test]
    fn roundtrip_header_with_label() {
        let original = "@@ -136,7 +137,8 @@ impl Foo {";
        let header = HunkHeader::parse(original).unwrap();
        assert_eq!(header.to_string(), original);
    }

    #[test]
    fn count_by_kind() {
        let hunk = DiffHunk::new(
            "@@ -1,3 +1,3 @@",
            vec![
                DiffLine::context(1, 1, "a"),
                DiffLine::deletion(2, "b"),
                DiffLine::addition(2, "B"),
                DiffLine::context(3, 3, "c"),
            ],
        );
        assert_eq!(hunk.count(LineKind::Context), 2);
        assert_eq!(hunk.count(LineKind::Deletion), 1);
        assert_eq!(hunk.count(LineKind::Addition), 1);
        assert!(hunk.has_changes());
        assert_eq!(hunk.header_range().map(|h| (h.old_len, h.new_len)), Some((3, 3)));
        assert!(!DiffHunk::new("@@ -1 +1 @@", vec![DiffLine::context(1, 1, "a")]).has_changes());
    }
}
