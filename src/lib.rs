//! Side-by-side diff pairing and line-level patch generation for git.
//!
//! The crate takes one file's diff (hunks of context, addition and deletion
//! lines), pairs its lines for split display, tracks which lines the user
//! picked, and writes unified diff patches that stage, unstage or discard a
//! whole hunk or just the picked lines.
//!
//! ```
//! use git_partial::diff::{DiffHunk, DiffLine, FileDiff, FileStatus};
//! use git_partial::patch::generate_partial_patch;
//! use git_partial::selection::{LineSelection, SelectionMode, Toggle};
//!
//! let diff = FileDiff::new(
//!     Some("notes.txt".to_string()),
//!     Some("notes.txt".to_string()),
//!     FileStatus::Modified,
//!     vec![DiffHunk::new(
//!         "@@ -10,3 +10,4 @@",
//!         vec![
//!             DiffLine::context(10, 10, "foo"),
//!             DiffLine::deletion(11, "bar"),
//!             DiffLine::addition(11, "baz"),
//!             DiffLine::addition(12, "qux"),
//!             DiffLine::context(12, 13, "end"),
//!         ],
//!     )],
//! );
//!
//! let mut selection = LineSelection::new(diff.hunks.clone(), SelectionMode::Stage);
//! selection.toggle_line(0, 2, Toggle::Single);
//!
//! let patch = generate_partial_patch(&diff, selection.selected_lines()).unwrap();
//! assert!(patch.ends_with("@@ -10,2 +10,3 @@\n foo\n+baz\n end\n"));
//! ```

use error_set::error_set;

pub mod backend;
pub mod diff;
pub mod parse;
pub mod patch;
pub mod render;
pub mod selection;
pub mod session;
pub mod settings;
pub mod split;

pub use backend::{ApplyError, ApplyTarget, DiffBackend, FetchError, GitCli};
pub use diff::{DiffHunk, DiffLine, FileDiff, FileStatus, LineKind};
pub use parse::RefParseError;
pub use patch::{generate_hunk_patch, generate_partial_patch, recompute_hunk_header};
pub use selection::{LineKey, LineSelection, SelectionMode, Toggle};
pub use session::{ApplyOutcome, DiffSession, HunkGate};
pub use settings::{CompareMode, ContextLines, DiffSettings, SettingsError, WhitespaceMode};
pub use split::{LinePair, LineRef, pair_for_split};

error_set! {
    /// Top-level error for git-partial operations
    PartialError := {
        #[display("Hunk {index} does not exist ({count} hunks)")]
        NoSuchHunk { index: usize, count: usize },
        #[display("Cannot build a patch for binary file {path}")]
        BinaryFile { path: String },
        #[display("Hunk {index} is already being applied")]
        HunkBusy { index: usize },
        #[display("None of the referenced lines can be selected in {path}")]
        NothingSelected { path: String },
        #[display("Cannot {target} {view} changes")]
        TargetNotAvailable { target: String, view: String },
        RefParseError(RefParseError),
        SettingsError(SettingsError),
        FetchError(FetchError),
        ApplyError(ApplyError),
    }
}
