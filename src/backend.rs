//! The repository side: fetching a file's diff and applying patch text.
//!
//! [`DiffBackend`] is the seam the rest of the crate talks to. [`GitCli`]
//! implements it by running the `git` executable.

use crate::diff::{FileDiff, FileStatus, ParseError, parse_unified};
use crate::settings::DiffSettings;
use error_set::error_set;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

error_set! {
    /// Errors from fetching a file's diff
    FetchError := {
        #[display("Failed to run git diff: {message}")]
        DiffFailed { message: String },
        #[display("git diff failed: {stderr}")]
        DiffExitError { stderr: String },
        #[display("Invalid UTF-8 in git diff output: {message}")]
        InvalidUtf8 { message: String },
        #[display("git diff printed more than one file for {path}")]
        AmbiguousPath { path: String },
        ParseError(ParseError),
    }

    /// Errors from applying a patch
    ApplyError := {
        #[display("Failed to spawn git apply: {message}")]
        ApplySpawnFailed { message: String },
        #[display("Failed to get stdin handle for git apply")]
        ApplyStdinFailed,
        #[display("Failed to write patch to git apply: {message}")]
        ApplyWriteFailed { message: String },
        #[display("Failed to wait for git apply: {message}")]
        ApplyWaitFailed { message: String },
        #[display("git apply rejected the patch: {stderr}")]
        ApplyRejected { stderr: String },
        #[display("Failed to update the index entry of {path}: {stderr}")]
        IndexUpdateFailed { path: String, stderr: String },
    }
}

/// What applying a patch does to the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyTarget {
    /// Add working-tree changes to the index
    Stage,
    /// Take staged changes back out of the index
    Unstage,
    /// Revert working-tree changes
    Discard,
}

impl fmt::Display for ApplyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ApplyTarget::Stage => "stage",
            ApplyTarget::Unstage => "unstage",
            ApplyTarget::Discard => "discard",
        })
    }
}

/// A repository that can produce file diffs and apply patches
pub trait DiffBackend {
    /// Diff of `path`: staged changes if `staged`, otherwise working-tree
    /// changes. A file without changes yields a diff with no hunks.
    fn fetch_file_diff(
        &self,
        path: &str,
        staged: bool,
        settings: &DiffSettings,
    ) -> Result<FileDiff, FetchError>;

    /// Apply unified diff text to the index or the working tree.
    ///
    /// Staging a file git does not track yet adds it, and patches that
    /// empty a deleted or newly added file remove its index entry.
    fn apply_patch(&self, patch: &str, target: ApplyTarget) -> Result<(), ApplyError>;
}

/// [`DiffBackend`] backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_path: PathBuf,
}

impl GitCli {
    /// Create a backend for the repository at `repo_path`
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    #[must_use]
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    fn git(&self) -> Command {
        let mut command = Command::new("git");
        command.arg("-C").arg(&self.repo_path);
        command
    }

    /// True if git does not track `path` and does not ignore it either
    fn is_untracked(&self, path: &str) -> io::Result<bool> {
        let output = self
            .git()
            .args(["ls-files", "--others", "--exclude-standard", "--", path])
            .output()?;
        Ok(output.status.success() && !output.stdout.is_empty())
    }

    /// True if `<rev>:./<path>` names a blob; `rev` is empty for the index
    fn has_blob(&self, rev: &str, path: &str) -> io::Result<bool> {
        let status = self
            .git()
            .args(["cat-file", "-e", &format!("{rev}:./{path}")])
            .stderr(Stdio::null())
            .status()?;
        Ok(status.success())
    }

    /// True if the index holds `path` with no content
    fn is_empty_in_index(&self, path: &str) -> io::Result<bool> {
        let output = self
            .git()
            .args(["cat-file", "-s", &format!(":./{path}")])
            .stderr(Stdio::null())
            .output()?;
        Ok(output.status.success() && output.stdout.trim_ascii() == b"0")
    }

    fn update_index(&self, path: &str, args: &[&str]) -> Result<(), ApplyError> {
        log::debug!("git {} -- {path}", args.join(" "));
        let output = self
            .git()
            .args(args)
            .args(["--", path])
            .output()
            .map_err(|e| ApplyError::ApplySpawnFailed {
                message: e.to_string(),
            })?;
        if output.status.success() {
            Ok(())
        } else {
            Err(ApplyError::IndexUpdateFailed {
                path: path.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        }
    }

    /// Give untracked paths an empty index entry so `git apply --cached`
    /// can patch them. Returns the paths that got one.
    fn prepare_index(
        &self,
        paths: &[String],
        target: ApplyTarget,
    ) -> Result<Vec<String>, ApplyError> {
        if target != ApplyTarget::Stage {
            return Ok(Vec::new());
        }
        let mut added = Vec::new();
        for path in paths {
            let untracked = self
                .is_untracked(path)
                .map_err(|e| ApplyError::ApplySpawnFailed {
                    message: e.to_string(),
                })?;
            if untracked {
                self.update_index(path, &["add", "--intent-to-add"])?;
                added.push(path.clone());
            }
        }
        Ok(added)
    }

    /// Turn index entries emptied by a patch into real removals.
    ///
    /// Staging everything of a file deleted from the working tree removes it
    /// from the index, and unstaging everything of a file that `HEAD` does
    /// not have makes it untracked again.
    fn settle_index(&self, paths: &[String], target: ApplyTarget) -> Result<(), ApplyError> {
        let spawn_failed = |e: io::Error| ApplyError::ApplySpawnFailed {
            message: e.to_string(),
        };
        for path in paths {
            let gone = match target {
                ApplyTarget::Stage => self.repo_path.join(path).symlink_metadata().is_err(),
                ApplyTarget::Unstage => !self.has_blob("HEAD", path).map_err(spawn_failed)?,
                ApplyTarget::Discard => false,
            };
            if gone && self.is_empty_in_index(path).map_err(spawn_failed)? {
                self.update_index(path, &["update-index", "--force-remove"])?;
            }
        }
        Ok(())
    }

    fn run_apply(&self, patch: &str, target: ApplyTarget) -> Result<(), ApplyError> {
        let flags: &[&str] = match target {
            ApplyTarget::Stage => &["--cached"],
            ApplyTarget::Unstage => &["--cached", "--reverse"],
            ApplyTarget::Discard => &["--reverse"],
        };

        let mut child = self
            .git()
            .arg("apply")
            .args(flags)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ApplyError::ApplySpawnFailed {
                message: e.to_string(),
            })?;

        child
            .stdin
            .take()
            .ok_or(ApplyError::ApplyStdinFailed)?
            .write_all(patch.as_bytes())
            .map_err(|e| ApplyError::ApplyWriteFailed {
                message: e.to_string(),
            })?;

        let output = child
            .wait_with_output()
            .map_err(|e| ApplyError::ApplyWaitFailed {
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            log::warn!("git apply ({target}) rejected patch: {}", stderr.trim());
            return Err(ApplyError::ApplyRejected { stderr });
        }
        Ok(())
    }

    fn run_diff(&self, args: &[String], ok_codes: &[i32]) -> Result<String, FetchError> {
        log::debug!("git diff {}", args.join(" "));
        let output = self
            .git()
            .arg("diff")
            .args(args)
            .output()
            .map_err(|e| FetchError::DiffFailed {
                message: e.to_string(),
            })?;
        let output = check_exit(output, ok_codes)?;

        String::from_utf8(output.stdout).map_err(|e| FetchError::InvalidUtf8 {
            message: e.to_string(),
        })
    }
}

fn check_exit(output: Output, ok_codes: &[i32]) -> Result<Output, FetchError> {
    match output.status.code() {
        Some(code) if ok_codes.contains(&code) => Ok(output),
        _ => Err(FetchError::DiffExitError {
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
    }
}

impl DiffBackend for GitCli {
    fn fetch_file_diff(
        &self,
        path: &str,
        staged: bool,
        settings: &DiffSettings,
    ) -> Result<FileDiff, FetchError> {
        let mut args = vec!["--no-ext-diff".to_string(), "--no-color".to_string()];
        args.extend(settings.git_args());

        let untracked = !staged
            && self
                .is_untracked(path)
                .map_err(|e| FetchError::DiffFailed {
                    message: e.to_string(),
                })?;
        let text = if untracked {
            // `--no-index` exits with 1 when the files differ
            args.extend(["--no-index", "--", "/dev/null", path].map(String::from));
            self.run_diff(&args, &[0, 1])?
        } else {
            if staged {
                args.push("--cached".to_string());
            }
            args.extend(["--", path].map(String::from));
            self.run_diff(&args, &[0])?
        };

        let mut files = parse_unified(&text)?;
        if files.len() > 1 {
            return Err(FetchError::AmbiguousPath {
                path: path.to_string(),
            });
        }

        let diff = match files.pop() {
            Some(mut diff) => {
                if untracked {
                    diff.status = FileStatus::Untracked;
                }
                diff
            }
            None => FileDiff::new(
                Some(path.to_string()),
                Some(path.to_string()),
                FileStatus::Modified,
                Vec::new(),
            ),
        };

        log::debug!(
            "fetched {} diff for {path}: {} hunks, +{} -{}",
            if staged { "staged" } else { "unstaged" },
            diff.hunks.len(),
            diff.additions,
            diff.deletions
        );
        Ok(diff)
    }

    fn apply_patch(&self, patch: &str, target: ApplyTarget) -> Result<(), ApplyError> {
        let paths = patch_paths(patch);
        let prepared = self.prepare_index(&paths, target)?;

        if let Err(error) = self.run_apply(patch, target) {
            for path in &prepared {
                if let Err(undo) = self.update_index(path, &["update-index", "--force-remove"]) {
                    log::warn!("could not drop intent-to-add entry: {undo}");
                }
            }
            return Err(error);
        }
        self.settle_index(&paths, target)?;

        log::info!("applied patch ({target}, {} bytes)", patch.len());
        Ok(())
    }
}

/// Paths the patch touches, relative to the repository directory
fn patch_paths(patch: &str) -> Vec<String> {
    match parse_unified(patch) {
        Ok(files) => files.iter().map(|file| file.path().to_string()).collect(),
        Err(e) => {
            // git apply reports the malformed patch itself
            log::debug!("could not read paths from patch: {e}");
            Vec::new()
        }
    }
}
