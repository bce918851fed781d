use super::hunk::DiffHunk;
use super::line::LineKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a file changed between the two sides of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
    Renamed,
    Copied,
    TypeChanged,
    Untracked,
    Conflicted,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FileStatus::Added => "added",
            FileStatus::Deleted => "deleted",
            FileStatus::Modified => "modified",
            FileStatus::Renamed => "renamed",
            FileStatus::Copied => "copied",
            FileStatus::TypeChanged => "type changed",
            FileStatus::Untracked => "untracked",
            FileStatus::Conflicted => "conflicted",
        })
    }
}

/// The complete change set of a single file.
///
/// Instances are replaced wholesale when the file is re-fetched; nothing in
/// this crate mutates one after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path before the change, absent for added files
    pub old_path: Option<String>,
    /// Path after the change, absent for deleted files
    pub new_path: Option<String>,
    pub status: FileStatus,
    pub additions: usize,
    pub deletions: usize,
    /// Binary files never carry hunks
    pub binary: bool,
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    /// Build a text diff, deriving the aggregate counts from the hunks
    #[must_use]
    pub fn new(
        old_path: Option<String>,
        new_path: Option<String>,
        status: FileStatus,
        hunks: Vec<DiffHunk>,
    ) -> Self {
        let additions = hunks.iter().map(|h| h.count(LineKind::Addition)).sum();
        let deletions = hunks.iter().map(|h| h.count(LineKind::Deletion)).sum();
        Self {
            old_path,
            new_path,
            status,
            additions,
            deletions,
            binary: false,
            hunks,
        }
    }

    /// Build a binary diff; it has no hunks and renders as a placeholder
    #[must_use]
    pub fn binary(old_path: Option<String>, new_path: Option<String>, status: FileStatus) -> Self {
        Self {
            old_path,
            new_path,
            status,
            additions: 0,
            deletions: 0,
            binary: true,
            hunks: Vec::new(),
        }
    }

    /// Path to show for this file: the new path, or the old one for deletions
    #[must_use]
    pub fn path(&self) -> &str {
        self.new_path
            .as_deref()
            .or(self.old_path.as_deref())
            .unwrap_or_default()
    }

    /// The `a/` and `b/` paths for patch headers.
    ///
    /// A missing side falls back to the other one, and separators are
    /// always forward slashes.
    #[must_use]
    pub fn patch_paths(&self) -> (String, String) {
        let old = self.old_path.as_deref().or(self.new_path.as_deref());
        let new = self.new_path.as_deref().or(self.old_path.as_deref());
        (
            old.map(forward_slashes).unwrap_or_default(),
            new.map(forward_slashes).unwrap_or_default(),
        )
    }
}

fn forward_slashes(path: &str) -> String {
    path.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::DiffLine;
    use similar_asserts::assert_eq;

    #[test]
    fn counts_are_derived_from_hunks() {
        let diff = FileDiff::new(
            Some("a.txt".to_string()),
            Some("a.txt".to_string()),
            FileStatus::Modified,
            vec![
                DiffHunk::new(
                    "@@ -1,2 +1,2 @@",
                    vec![DiffLine::deletion(1, "x"), DiffLine::addition(1, "y")],
                ),
                DiffHunk::new("@@ -9,0 +10,1 @@", vec![DiffLine::addition(10, "z")]),
            ],
        );
        assert_eq!(diff.additions, 2);
        assert_eq!(diff.deletions, 1);
        assert!(!diff.binary);
    }

    #[test]
    fn binary_diff_has_no_hunks() {
        let diff = FileDiff::binary(None, Some("logo.png".to_string()), FileStatus::Added);
        assert!(diff.binary);
        assert!(diff.hunks.is_empty());
        assert_eq!(diff.path(), "logo.png");
    }

    #[test]
    fn patch_paths_fall_back_to_the_other_side() {
        let added = FileDiff::new(None, Some("new.rs".to_string()), FileStatus::Added, vec![]);
        assert_eq!(
            added.patch_paths(),
            ("new.rs".to_string(), "new.rs".to_string())
        );

        let deleted = FileDiff::new(Some("old.rs".to_string()), None, FileStatus::Deleted, vec![]);
        assert_eq!(
            deleted.patch_paths(),
            ("old.rs".to_string(), "old.rs".to_string())
        );
        assert_eq!(deleted.path(), "old.rs");
    }

    #[test]
    fn patch_paths_use_forward_slashes() {
        let renamed = FileDiff::new(
            Some("src\\old.rs".to_string()),
            Some("src\\new.rs".to_string()),
            FileStatus::Renamed,
            vec![],
        );
        assert_eq!(
            renamed.patch_paths(),
            ("src/old.rs".to_string(), "src/new.rs".to_string())
        );
    }
}
