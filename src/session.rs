//! The diff currently on screen and the actions taken on it.
//!
//! A [`DiffSession`] owns the fetched [`FileDiff`], the line selection and
//! the settings it was fetched with. After every apply, successful or not,
//! the diff is fetched again so the displayed state matches the repository.

use crate::PartialError;
use crate::backend::{ApplyTarget, DiffBackend};
use crate::diff::FileDiff;
use crate::patch::{generate_hunk_patch, generate_partial_patch};
use crate::selection::{LineSelection, SelectionMode};
use crate::settings::DiffSettings;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

/// Hunks with an apply in flight.
///
/// Clones share the same set, so a renderer can ask whether a hunk is busy
/// while another thread applies it.
#[derive(Debug, Clone, Default)]
pub struct HunkGate {
    busy: Arc<Mutex<BTreeSet<usize>>>,
}

impl HunkGate {
    /// Mark `hunk` busy, or `None` if it already is
    #[must_use]
    pub fn try_acquire(&self, hunk: usize) -> Option<HunkPermit> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        busy.insert(hunk).then(|| HunkPermit {
            gate: self.clone(),
            hunk,
        })
    }

    #[must_use]
    pub fn is_busy(&self, hunk: usize) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&hunk)
    }
}

/// Keeps a hunk busy until dropped
#[derive(Debug)]
pub struct HunkPermit {
    gate: HunkGate,
    hunk: usize,
}

impl Drop for HunkPermit {
    fn drop(&mut self) {
        self.gate
            .busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.hunk);
    }
}

/// Result of an apply request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The patch was handed to the backend and accepted
    Applied,
    /// Nothing was selected, so the backend was not called
    Skipped,
}

/// One file's diff as the user is viewing it
#[derive(Debug)]
pub struct DiffSession<B> {
    backend: B,
    path: String,
    staged: bool,
    settings: DiffSettings,
    diff: FileDiff,
    selection: LineSelection,
    gate: HunkGate,
}

impl<B: DiffBackend> DiffSession<B> {
    /// Fetch `path` and start viewing it with an empty selection
    pub fn open(
        backend: B,
        path: impl Into<String>,
        staged: bool,
        settings: DiffSettings,
    ) -> Result<Self, PartialError> {
        let path = path.into();
        let diff = backend.fetch_file_diff(&path, staged, &settings)?;
        let selection = LineSelection::new(diff.hunks.clone(), SelectionMode::for_view(staged));
        Ok(Self {
            backend,
            path,
            staged,
            settings,
            diff,
            selection,
            gate: HunkGate::default(),
        })
    }

    #[must_use]
    pub fn diff(&self) -> &FileDiff {
        &self.diff
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn is_staged(&self) -> bool {
        self.staged
    }

    #[must_use]
    pub fn settings(&self) -> &DiffSettings {
        &self.settings
    }

    #[must_use]
    pub fn selection(&self) -> &LineSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut LineSelection {
        &mut self.selection
    }

    #[must_use]
    pub fn gate(&self) -> &HunkGate {
        &self.gate
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Switch to another file. The selection always starts empty.
    pub fn open_file(&mut self, path: impl Into<String>, staged: bool) -> Result<(), PartialError> {
        self.path = path.into();
        self.staged = staged;
        self.selection.clear_selection();
        self.selection.set_mode(SelectionMode::for_view(staged));
        self.refresh()
    }

    /// Fetch the diff again with new settings; equal settings do nothing
    pub fn set_settings(&mut self, settings: DiffSettings) -> Result<(), PartialError> {
        if settings == self.settings {
            return Ok(());
        }
        log::debug!("diff settings changed to {settings:?}");
        self.settings = settings;
        self.refresh()
    }

    /// Replace the diff with a freshly fetched one
    pub fn refresh(&mut self) -> Result<(), PartialError> {
        let diff = self
            .backend
            .fetch_file_diff(&self.path, self.staged, &self.settings)?;
        self.selection.set_hunks(diff.hunks.clone());
        self.diff = diff;
        Ok(())
    }

    /// Check that `target` makes sense for the kind of diff being viewed
    fn check_target(&self, target: ApplyTarget) -> Result<(), PartialError> {
        let allowed = match target {
            ApplyTarget::Stage | ApplyTarget::Discard => !self.staged,
            ApplyTarget::Unstage => self.staged,
        };
        if !allowed {
            return Err(PartialError::TargetNotAvailable {
                target: target.to_string(),
                view: if self.staged { "staged" } else { "unstaged" }.to_string(),
            });
        }
        if self.diff.binary {
            return Err(PartialError::BinaryFile {
                path: self.diff.path().to_string(),
            });
        }
        Ok(())
    }

    /// Patch text that would apply one whole hunk to `target`
    pub fn hunk_patch(&self, hunk: usize, target: ApplyTarget) -> Result<String, PartialError> {
        self.check_target(target)?;
        if hunk >= self.diff.hunks.len() {
            return Err(PartialError::NoSuchHunk {
                index: hunk,
                count: self.diff.hunks.len(),
            });
        }
        Ok(generate_hunk_patch(&self.diff, hunk))
    }

    /// Patch text for the selected lines, `None` with nothing selected
    pub fn selection_patch(&self, target: ApplyTarget) -> Result<Option<String>, PartialError> {
        self.check_target(target)?;
        Ok(generate_partial_patch(
            &self.diff,
            self.selection.selected_lines(),
        ))
    }

    /// Apply one whole hunk without re-fetching.
    ///
    /// Fails with `HunkBusy` while another apply of the same hunk is in
    /// flight; other hunks can be applied at the same time. Callers must
    /// [`refresh`](Self::refresh) afterwards.
    pub fn apply_hunk(&self, hunk: usize, target: ApplyTarget) -> Result<(), PartialError> {
        let patch = self.hunk_patch(hunk, target)?;
        let Some(_permit) = self.gate.try_acquire(hunk) else {
            return Err(PartialError::HunkBusy { index: hunk });
        };
        self.backend.apply_patch(&patch, target)?;
        Ok(())
    }

    /// Apply one whole hunk, then re-fetch the diff.
    ///
    /// The diff is re-fetched even when the apply fails; the apply error
    /// takes precedence over a fetch error.
    pub fn apply_hunk_and_refresh(
        &mut self,
        hunk: usize,
        target: ApplyTarget,
    ) -> Result<(), PartialError> {
        let applied = self.apply_hunk(hunk, target);
        let refreshed = self.refresh();
        applied.and(refreshed)
    }

    /// Apply the selected lines, then re-fetch the diff.
    ///
    /// With nothing selected the backend is not called and the outcome is
    /// [`ApplyOutcome::Skipped`]. The selection is cleared after a
    /// successful apply and kept after a failed one, unless the re-fetched
    /// diff changed.
    pub fn apply_selection(&mut self, target: ApplyTarget) -> Result<ApplyOutcome, PartialError> {
        let Some(patch) = self.selection_patch(target)? else {
            log::debug!("nothing selected in {}, skipping apply", self.path);
            return Ok(ApplyOutcome::Skipped);
        };

        let applied = self.backend.apply_patch(&patch, target);
        if applied.is_ok() {
            self.selection.clear_selection();
        }
        let refreshed = self.refresh();
        applied?;
        refreshed?;
        Ok(ApplyOutcome::Applied)
    }
}
