//! USER PREFERENCES section rendering and splicing
//!
//! The section lives inside a `step_info` fragment:
//!
//! ```text
//! ## USER PREFERENCES (Auto-Generated)
//!
//! - first preference
//! - second preference
//! ```
//!
//! It ends at the next blank-line-separated heading or capitalised paragraph,
//! or at the end of the fragment.

use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use crate::error::{SessionError, SessionResult};

/// Heading that marks the preferences section
pub const SECTION_HEADER: &str = "## USER PREFERENCES (Auto-Generated)";

/// Bullet rendered when there are no preferences
pub const EMPTY_MARKER: &str = "No preferences configured";

static SECTION_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\n(?:##|[A-Z])").expect("section end pattern is valid"));

/// Header line followed by the blank line
fn header_block() -> String {
    format!("{}\n\n", SECTION_HEADER)
}

/// Bullet lines joined by newlines
pub fn render_bullets<S: AsRef<str>>(preferences: &[S]) -> String {
    preferences
        .iter()
        .map(|p| format!("- {}", p.as_ref()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Size of the section as it is scored for the budget (characters)
///
/// An empty list scores as the bare header block.
pub fn section_size<S: AsRef<str>>(preferences: &[S]) -> usize {
    header_block().chars().count() + render_bullets(preferences).chars().count()
}

/// Render the full section, using the empty marker when there is nothing to list
pub fn render_section<S: AsRef<str>>(preferences: &[S]) -> String {
    debug!(count = preferences.len(), "render_section: called");
    if preferences.is_empty() {
        format!("{}- {}", header_block(), EMPTY_MARKER)
    } else {
        format!("{}{}", header_block(), render_bullets(preferences))
    }
}

/// Locate an existing section
///
/// Returns the byte range of the whole section and of its body.
fn locate(content: &str) -> Option<(Range<usize>, Range<usize>)> {
    let header = header_block();
    let start = content.find(&header)?;
    let body_start = start + header.len();
    let end = SECTION_END
        .find(&content[body_start..])
        .map(|m| body_start + m.start())
        .unwrap_or(content.len());
    Some((start..end, body_start..end))
}

/// Extract the preference strings from a fragment's existing section
pub fn parse_preferences(content: &str) -> Vec<String> {
    debug!(content_len = content.len(), "parse_preferences: called");
    let Some((_, body)) = locate(content) else {
        debug!("parse_preferences: no section found");
        return Vec::new();
    };

    content[body]
        .trim()
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix("- "))
        .filter(|pref| *pref != EMPTY_MARKER)
        .map(str::to_string)
        .collect()
}

/// Replace the existing section, or append one at the end of the fragment
pub fn splice_section<S: AsRef<str>>(content: &str, preferences: &[S]) -> String {
    debug!(count = preferences.len(), "splice_section: called");
    let section = render_section(preferences);
    match locate(content) {
        Some((range, _)) => {
            debug!(?range, "splice_section: replacing existing section");
            let mut updated = String::with_capacity(content.len() + section.len());
            updated.push_str(&content[..range.start]);
            updated.push_str(&section);
            if range.end == content.len() {
                // section ran to end of file; keep the final newline
                if content.ends_with('\n') {
                    updated.push('\n');
                }
            } else {
                updated.push_str(&content[range.end..]);
            }
            updated
        }
        None => {
            debug!("splice_section: appending new section");
            format!("{}\n\n{}\n", content.trim_end(), section)
        }
    }
}

fn read_fragment(path: &Path) -> SessionResult<String> {
    fs::read_to_string(path).map_err(|source| match source.kind() {
        ErrorKind::NotFound => SessionError::FragmentNotFound {
            path: path.to_path_buf(),
        },
        _ => SessionError::FragmentIo {
            path: path.to_path_buf(),
            source,
        },
    })
}

/// Read the preferences currently recorded in a fragment
pub fn read_preferences(path: &Path) -> SessionResult<Vec<String>> {
    debug!(?path, "read_preferences: called");
    Ok(parse_preferences(&read_fragment(path)?))
}

/// Write the preferences section into an existing fragment
pub fn write_preferences<S: AsRef<str>>(path: &Path, preferences: &[S]) -> SessionResult<()> {
    debug!(?path, count = preferences.len(), "write_preferences: called");
    let content = read_fragment(path)?;
    let updated = splice_section(&content, preferences);
    fs::write(path, updated).map_err(|source| SessionError::FragmentIo {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), count = preferences.len(), "Wrote preferences section");
    Ok(())
}
