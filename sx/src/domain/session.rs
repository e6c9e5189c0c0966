//! Session domain type
//!
//! The flat record persisted between invocations. Absence of the record means
//! there is no active session.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::step::{Slot, Step};
use crate::error::SessionResult;

/// Maximum length of a derived problem id
pub const MAX_PROBLEM_ID_LEN: usize = 30;

/// Fallback id for descriptions with no usable characters
const FALLBACK_PROBLEM_ID: &str = "untitled";

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Session is in progress
    #[default]
    Active,
    /// Final step finished; the session has been archived
    Complete,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Complete => write!(f, "COMPLETE"),
        }
    }
}

/// One end-to-end run of the workflow for a single problem description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Slug derived from the description
    pub problem_id: String,

    /// The original description text
    pub problem_description: String,

    /// Current step
    pub current_step: Step,

    /// Current phase within the step (1-indexed)
    pub current_phase: u32,

    /// When the session was started
    pub started: DateTime<Local>,

    /// Current status
    pub status: SessionStatus,

    /// Directory holding the session's artifacts
    pub problem_dir: PathBuf,
}

impl Session {
    /// Create a new session positioned at step 1, phase 1
    ///
    /// The session directory is `<active_dir>/<problem_id>`.
    pub fn new(description: impl Into<String>, active_dir: &Path) -> Self {
        let problem_description = description.into();
        debug!(%problem_description, ?active_dir, "Session::new: called");
        let problem_id = derive_problem_id(&problem_description);
        let problem_dir = active_dir.join(&problem_id);
        Self {
            problem_id,
            problem_description,
            current_step: Step::FIRST,
            current_phase: 1,
            started: Local::now(),
            status: SessionStatus::Active,
            problem_dir,
        }
    }

    /// The validated current position
    pub fn slot(&self) -> SessionResult<Slot> {
        Slot::new(self.current_step, self.current_phase)
    }

    /// Move to the given position
    pub fn move_to(&mut self, slot: Slot) {
        debug!(%self.problem_id, %slot, "Session::move_to: called");
        self.current_step = slot.step();
        self.current_phase = slot.phase();
    }

    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }

    /// Path of the human-readable status mirror
    pub fn mirror_path(&self) -> PathBuf {
        mirror_path_in(&self.problem_dir)
    }
}

/// Path of the status mirror inside a session directory
pub fn mirror_path_in(dir: &Path) -> PathBuf {
    dir.join("STATE.md")
}

/// Derive the problem id from a free-text description
///
/// Lowercases, turns spaces and hyphens into underscores, drops every other
/// non-alphanumeric character and keeps at most 30 characters.
pub fn derive_problem_id(description: &str) -> String {
    debug!(%description, "derive_problem_id: called");
    let id: String = description
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .take(MAX_PROBLEM_ID_LEN)
        .collect();

    if id.is_empty() {
        debug!("derive_problem_id: nothing usable, using fallback");
        FALLBACK_PROBLEM_ID.to_string()
    } else {
        id
    }
}
