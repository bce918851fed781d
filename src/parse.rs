//! Parsing for `hunk:line` selection references.
//!
//! The command line names lines by their position in the displayed diff,
//! as printed by `git-partial show`: hunk index, colon, line index within
//! the hunk. Both are zero-based.
//!
//! # Syntax
//!
//! A comma-separated list of:
//! - `H:L` - line `L` of hunk `H`
//! - `H:L..M` - lines `L` through `M` of hunk `H` (inclusive)
//!
//! # Examples
//!
//! ```
//! use git_partial::parse::{parse_selection_refs, SelectionRef};
//!
//! let refs = parse_selection_refs("0:2,1:4..6").unwrap();
//! assert_eq!(refs, vec![
//!     SelectionRef::Line { hunk: 0, line: 2 },
//!     SelectionRef::Range { hunk: 1, start: 4, end: 6 },
//! ]);
//! ```

use crate::selection::{LineSelection, Toggle};
use error_set::error_set;

error_set! {
    /// Errors from parsing selection references
    RefParseError := {
        /// Reference does not contain a colon separator
        #[display("Invalid reference '{input}': expected 'hunk:line'")]
        InvalidFormat { input: String },
        /// No references in the input
        #[display("No line references provided")]
        EmptyRefs,
        /// Index could not be parsed as a non-negative number
        #[display("Invalid index '{value}'")]
        InvalidIndex { value: String },
        /// Range has start greater than end
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: usize, end: usize },
    }
}

/// A reference to one line or a run of lines in one hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionRef {
    Line { hunk: usize, line: usize },
    Range { hunk: usize, start: usize, end: usize },
}

impl SelectionRef {
    /// Select the referenced lines that the selection accepts.
    ///
    /// Lines of the wrong kind for the selection's mode are skipped, and
    /// lines that are already selected stay selected.
    pub fn select_into(&self, selection: &mut LineSelection) {
        let (hunk, start, end) = match *self {
            SelectionRef::Line { hunk, line } => (hunk, line, line),
            SelectionRef::Range { hunk, start, end } => (hunk, start, end),
        };
        let Some(last_line) = selection.line_count(hunk).checked_sub(1) else {
            return;
        };
        if start > last_line {
            return;
        }
        let end = end.min(last_line);

        let eligible: Vec<usize> = (start..=end)
            .filter(|&line| selection.is_selectable(hunk, line))
            .collect();
        let (Some(&first), Some(&last)) = (eligible.first(), eligible.last()) else {
            return;
        };

        if !selection.is_line_selected(hunk, first) {
            selection.toggle_line(hunk, first, Toggle::Single);
            if last != first {
                selection.toggle_line(hunk, last, Toggle::Extend);
            }
        } else {
            for line in eligible {
                if !selection.is_line_selected(hunk, line) {
                    selection.toggle_line(hunk, line, Toggle::Single);
                }
            }
        }
    }
}

/// Parse a comma-separated list of selection references.
///
/// # Errors
///
/// Returns [`RefParseError`] if:
/// - a reference has no `:` separator
/// - an index is not a number
/// - a range runs backwards
/// - no references are given
pub fn parse_selection_refs(input: &str) -> Result<Vec<SelectionRef>, RefParseError> {
    let refs: Vec<SelectionRef> = input
        .split(',')
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(parse_single_ref)
        .collect::<Result<Vec<_>, _>>()?;

    if refs.is_empty() {
        return Err(RefParseError::EmptyRefs);
    }

    Ok(refs)
}

/// Parse one `H:L` or `H:L..M` reference
fn parse_single_ref(input: &str) -> Result<SelectionRef, RefParseError> {
    let Some((hunk, lines)) = input.split_once(':') else {
        return Err(RefParseError::InvalidFormat {
            input: input.to_string(),
        });
    };
    let hunk = parse_index(hunk)?;

    if let Some((start, end)) = lines.split_once("..") {
        let start = parse_index(start)?;
        let end = parse_index(end)?;
        if start > end {
            return Err(RefParseError::InvalidRange { start, end });
        }
        Ok(SelectionRef::Range { hunk, start, end })
    } else {
        Ok(SelectionRef::Line {
            hunk,
            line: parse_index(lines)?,
        })
    }
}

fn parse_index(input: &str) -> Result<usize, RefParseError> {
    input
        .trim()
        .parse::<usize>()
        .map_err(|_| RefParseError::InvalidIndex {
            value: input.to_string(),
        })
}
