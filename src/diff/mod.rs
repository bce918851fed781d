//! The diff model: one file's hunks and lines, and a reader for `git diff`
//! output that produces it.

pub mod file;
pub mod hunk;
pub mod line;
pub mod unified;

pub use file::{FileDiff, FileStatus};
pub use hunk::{DiffHunk, HunkHeader};
pub use line::{DiffLine, LineKind};
pub use unified::{ParseError, parse_unified};
