//! Settings that decide which diff the backend is asked for.
//!
//! Changing a [`DiffSettings`] value means fetching a new diff; nothing here
//! rewrites a diff that was already fetched.

use error_set::error_set;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

error_set! {
    /// Errors from reading diff settings
    SettingsError := {
        /// Context line count outside the supported set
        #[display("Unsupported context line count {value}: expected one of 1, 3, 6, 12, 25, 50, 100")]
        UnsupportedContext { value: u32 },
        /// Text that is not a line count at all
        #[display("Invalid context line count '{value}'")]
        InvalidContext { value: String },
        #[display("Unknown whitespace mode '{value}': expected 'show' or 'ignore'")]
        UnknownWhitespaceMode { value: String },
        #[display("Unknown compare mode '{value}': expected 'parent' or 'merged'")]
        UnknownCompareMode { value: String },
    }
}

/// Whether whitespace-only changes show up in the diff
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum WhitespaceMode {
    #[default]
    Show,
    Ignore,
}

impl FromStr for WhitespaceMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "show" => Ok(WhitespaceMode::Show),
            "ignore" => Ok(WhitespaceMode::Ignore),
            _ => Err(SettingsError::UnknownWhitespaceMode {
                value: s.to_string(),
            }),
        }
    }
}

/// What a commit's changes are compared against
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// The commit's first parent
    #[default]
    Parent,
    /// The merge base with the target branch
    Merged,
}

impl FromStr for CompareMode {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parent" => Ok(CompareMode::Parent),
            "merged" => Ok(CompareMode::Merged),
            _ => Err(SettingsError::UnknownCompareMode {
                value: s.to_string(),
            }),
        }
    }
}

/// Number of unchanged lines shown around each change.
///
/// Only the values in [`ContextLines::ALL`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ContextLines(u32);

impl ContextLines {
    pub const ALL: [ContextLines; 7] = [
        ContextLines(1),
        ContextLines(3),
        ContextLines(6),
        ContextLines(12),
        ContextLines(25),
        ContextLines(50),
        ContextLines(100),
    ];

    #[must_use]
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for ContextLines {
    fn default() -> Self {
        ContextLines(3)
    }
}

impl TryFrom<u32> for ContextLines {
    type Error = SettingsError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|c| c.0 == value)
            .ok_or(SettingsError::UnsupportedContext { value })
    }
}

impl From<ContextLines> for u32 {
    fn from(value: ContextLines) -> Self {
        value.0
    }
}

impl FromStr for ContextLines {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<u32>()
            .map_err(|_| SettingsError::InvalidContext {
                value: s.to_string(),
            })?;
        Self::try_from(value)
    }
}

impl fmt::Display for ContextLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything that decides how the backend computes a file's diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DiffSettings {
    #[serde(default)]
    pub whitespace: WhitespaceMode,
    #[serde(default)]
    pub context_lines: ContextLines,
    #[serde(default)]
    pub compare: CompareMode,
}

impl DiffSettings {
    /// `git diff` flags for these settings.
    ///
    /// The compare mode has no flag: it only matters for commit diffs.
    #[must_use]
    pub fn git_args(&self) -> Vec<String> {
        let mut args = vec![format!("-U{}", self.context_lines)];
        match self.whitespace {
            WhitespaceMode::Show => {}
            WhitespaceMode::Ignore => args.push("--ignore-all-space".to_string()),
        }
        args
    }
}
