//! Line selection for partial staging and unstaging.
//!
//! A [`LineSelection`] belongs to the diff currently on screen. It is reset
//! whenever it is pointed at different hunks, when its mode changes and when
//! line selection is switched off. While disabled it ignores every toggle.

use crate::diff::{DiffHunk, LineKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Position of a line in a file diff: hunk index, then index in that hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub hunk: usize,
    pub line: usize,
}

impl LineKey {
    #[must_use]
    pub fn new(hunk: usize, line: usize) -> Self {
        Self { hunk, line }
    }
}

/// Which side of the index the selection will be applied to.
///
/// Working-tree changes are staged, so only their additions can be picked;
/// staged changes are unstaged, so only their deletions can be picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionMode {
    Stage,
    Unstage,
}

impl SelectionMode {
    /// Mode for a diff of staged (`true`) or working-tree (`false`) changes
    #[must_use]
    pub fn for_view(staged: bool) -> Self {
        if staged {
            SelectionMode::Unstage
        } else {
            SelectionMode::Stage
        }
    }

    fn accepts(self, kind: LineKind) -> bool {
        match (self, kind) {
            (SelectionMode::Stage, LineKind::Addition) => true,
            (SelectionMode::Unstage, LineKind::Deletion) => true,
            (_, LineKind::Context | LineKind::Addition | LineKind::Deletion) => false,
        }
    }
}

/// How a click on a line changes the selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Toggle {
    /// Flip the line
    #[default]
    Single,
    /// Select every eligible line from the last toggled one to this one
    Extend,
}

/// Selected lines of the displayed file diff
#[derive(Debug, Clone)]
pub struct LineSelection {
    hunks: Vec<DiffHunk>,
    mode: SelectionMode,
    enabled: bool,
    selected: BTreeSet<LineKey>,
    anchor: Option<LineKey>,
}

impl LineSelection {
    /// An enabled, empty selection over `hunks`
    #[must_use]
    pub fn new(hunks: Vec<DiffHunk>, mode: SelectionMode) -> Self {
        Self {
            hunks,
            mode,
            enabled: true,
            selected: BTreeSet::new(),
            anchor: None,
        }
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Point the selection at a new set of hunks, clearing it if they differ
    pub fn set_hunks(&mut self, hunks: Vec<DiffHunk>) {
        if hunks != self.hunks {
            self.hunks = hunks;
            self.clear_selection();
        }
    }

    pub fn set_mode(&mut self, mode: SelectionMode) {
        if mode != self.mode {
            self.mode = mode;
            self.clear_selection();
        }
    }

    /// Turn line selection on or off. Turning it off drops the selection.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled && !enabled {
            self.clear_selection();
        }
        self.enabled = enabled;
    }

    /// Number of lines in `hunk`, zero if there is no such hunk
    #[must_use]
    pub fn line_count(&self, hunk: usize) -> usize {
        self.hunks.get(hunk).map_or(0, |h| h.lines.len())
    }

    /// True if the line exists and its kind can be picked in the current mode
    #[must_use]
    pub fn is_selectable(&self, hunk: usize, line: usize) -> bool {
        self.hunks
            .get(hunk)
            .and_then(|h| h.lines.get(line))
            .is_some_and(|l| self.mode.accepts(l.kind))
    }

    #[must_use]
    pub fn is_line_selected(&self, hunk: usize, line: usize) -> bool {
        self.enabled && self.selected.contains(&LineKey::new(hunk, line))
    }

    /// Toggle a line, or extend the selection up to it.
    ///
    /// Does nothing while disabled or when the target is not selectable.
    /// [`Toggle::Extend`] falls back to a single toggle when there is no
    /// previous line in the same hunk.
    pub fn toggle_line(&mut self, hunk: usize, line: usize, toggle: Toggle) {
        if !self.enabled || !self.is_selectable(hunk, line) {
            return;
        }

        let target = LineKey::new(hunk, line);
        match (toggle, self.anchor) {
            (Toggle::Extend, Some(anchor)) if anchor.hunk == hunk => {
                let (from, to) = if anchor.line <= line {
                    (anchor.line, line)
                } else {
                    (line, anchor.line)
                };
                for index in from..=to {
                    if self.is_selectable(hunk, index) {
                        self.selected.insert(LineKey::new(hunk, index));
                    }
                }
            }
            _ => {
                if !self.selected.remove(&target) {
                    self.selected.insert(target);
                }
            }
        }
        self.anchor = Some(target);
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.anchor = None;
    }

    #[must_use]
    pub fn selection_count(&self) -> usize {
        self.selected.len()
    }

    #[must_use]
    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    #[must_use]
    pub fn selected_lines(&self) -> &BTreeSet<LineKey> {
        &self.selected
    }
}
