use serde::{Deserialize, Serialize};

/// Kind of a single line inside a hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Unchanged line shown for orientation
    Context,
    /// Line present only in the new version
    Addition,
    /// Line present only in the old version
    Deletion,
}

impl LineKind {
    /// Prefix character used for this kind in unified diff text
    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Addition => '+',
            LineKind::Deletion => '-',
        }
    }

    /// True for additions and deletions
    #[must_use]
    pub fn is_change(self) -> bool {
        match self {
            LineKind::Context => false,
            LineKind::Addition | LineKind::Deletion => true,
        }
    }
}

/// A single line of a hunk.
///
/// Context lines carry both line numbers, additions only the new one and
/// deletions only the old one. Use the constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    pub kind: LineKind,
    /// Line text without the trailing newline
    pub content: String,
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
    /// Followed by `\ No newline at end of file` in the source diff
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub missing_final_newline: bool,
}

impl DiffLine {
    #[must_use]
    pub fn context(old_line: u32, new_line: u32, content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Context,
            content: content.into(),
            old_line: Some(old_line),
            new_line: Some(new_line),
            missing_final_newline: false,
        }
    }

    #[must_use]
    pub fn addition(new_line: u32, content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Addition,
            content: content.into(),
            old_line: None,
            new_line: Some(new_line),
            missing_final_newline: false,
        }
    }

    #[must_use]
    pub fn deletion(old_line: u32, content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Deletion,
            content: content.into(),
            old_line: Some(old_line),
            new_line: None,
            missing_final_newline: false,
        }
    }

    /// Mark this line as the last one of a file lacking a trailing newline
    #[must_use]
    pub fn without_final_newline(mut self) -> Self {
        self.missing_final_newline = true;
        self
    }

    /// Check the line-number invariant for this line's kind
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            LineKind::Context => self.old_line.is_some() && self.new_line.is_some(),
            LineKind::Addition => self.old_line.is_none() && self.new_line.is_some(),
            LineKind::Deletion => self.old_line.is_some() && self.new_line.is_none(),
        }
    }
}
