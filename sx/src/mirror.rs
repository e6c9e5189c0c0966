//! STATE.md status mirror
//!
//! Human-readable companion to the session record. It is generated once when
//! a session starts and afterwards only edited line by line: advancing
//! rewrites the current step/phase lines, archival marks it complete.

use chrono::{DateTime, Local};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::domain::{Session, SessionStatus, Slot, Step};
use crate::error::{SessionError, SessionResult};

const STATUS_PREFIX: &str = "**Status**:";
const STEP_PREFIX: &str = "**Current Step**:";
const PHASE_PREFIX: &str = "**Current Phase**:";
const STARTED_PREFIX: &str = "**Started**:";
const COMPLETED_PREFIX: &str = "**Completed**:";

/// Timestamp format used in the mirror
const STAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Render the mirror for a freshly started session
pub fn render_initial(session: &Session) -> String {
    debug!(%session.problem_id, "render_initial: called");
    let checklist: Vec<String> = Step::ALL
        .iter()
        .map(|step| format!("- [ ] Step {}: {}", step.number(), step.name()))
        .collect();

    format!(
        "# Problem: {description}\n\
         {STATUS_PREFIX} {status}\n\
         {STEP_PREFIX} {step}\n\
         {PHASE_PREFIX} Phase {phase}\n\
         {STARTED_PREFIX} {started}\n\
         \n\
         ## Progress Overview\n\
         {checklist}\n\
         \n\
         ## Session Log\n\
         - {time} User: Started six-step framework for: {description}\n",
        description = session.problem_description,
        status = SessionStatus::Active,
        step = session.current_step.label(),
        phase = session.current_phase,
        started = session.started.format(STAMP_FORMAT),
        checklist = checklist.join("\n"),
        time = session.started.format("%H:%M"),
    )
}

/// Apply `f` to every line and normalise the trailing newline
fn rewrite_lines(content: &str, mut f: impl FnMut(&str) -> Vec<String>) -> String {
    let lines: Vec<String> = content.split('\n').flat_map(&mut f).collect();
    format!("{}\n", lines.join("\n").trim_end())
}

/// Rewrite only the current step and phase lines
pub fn rewrite_position(content: &str, slot: Slot) -> String {
    debug!(%slot, "rewrite_position: called");
    rewrite_lines(content, |line| {
        if line.starts_with(STEP_PREFIX) {
            vec![format!("{} {}", STEP_PREFIX, slot.step().label())]
        } else if line.starts_with(PHASE_PREFIX) {
            vec![format!("{} {}", PHASE_PREFIX, slot.phase_label())]
        } else {
            vec![line.to_string()]
        }
    })
}

/// Mark the mirror complete at its final slot
///
/// Sets the status, pins the position to `slot`, inserts a completion stamp
/// after the start stamp and ticks every checklist item.
pub fn mark_complete(content: &str, slot: Slot, completed_at: DateTime<Local>) -> String {
    debug!(%slot, "mark_complete: called");
    let stamp = completed_at.format(STAMP_FORMAT).to_string();
    rewrite_lines(content, |line| {
        if line.starts_with(STATUS_PREFIX) {
            vec![format!("{} {} ✅", STATUS_PREFIX, SessionStatus::Complete)]
        } else if line.starts_with(STEP_PREFIX) {
            vec![format!("{} {}", STEP_PREFIX, slot.step().label())]
        } else if line.starts_with(PHASE_PREFIX) {
            vec![format!("{} {}", PHASE_PREFIX, slot.phase_label())]
        } else if line.starts_with(COMPLETED_PREFIX) {
            // replaced by the stamp after the start line
            Vec::new()
        } else if line.starts_with(STARTED_PREFIX) {
            vec![line.to_string(), format!("{} {}", COMPLETED_PREFIX, stamp)]
        } else if let Some(rest) = line.strip_prefix("- [ ] Step ") {
            vec![format!("- [x] Step {}", rest)]
        } else {
            vec![line.to_string()]
        }
    })
}

fn mirror_error(path: &Path, source: std::io::Error) -> SessionError {
    SessionError::StatusMirror {
        path: path.to_path_buf(),
        source,
    }
}

/// Write a fresh mirror
pub fn write_initial(path: &Path, session: &Session) -> SessionResult<()> {
    debug!(?path, "write_initial: called");
    fs::write(path, render_initial(session)).map_err(|e| mirror_error(path, e))?;
    info!(path = %path.display(), "Created status mirror");
    Ok(())
}

/// Rewrite an existing mirror in place
///
/// A missing mirror is left alone; there is nothing to keep in sync.
pub fn update(path: &Path, f: impl FnOnce(&str) -> String) -> SessionResult<bool> {
    debug!(?path, "update: called");
    if !path.exists() {
        debug!("update: no mirror file, skipping");
        return Ok(false);
    }
    let content = fs::read_to_string(path).map_err(|e| mirror_error(path, e))?;
    fs::write(path, f(&content)).map_err(|e| mirror_error(path, e))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn session() -> Session {
        let mut session = Session::new("Reduce checkout latency", Path::new("/tmp/active"));
        session.started = Local.with_ymd_and_hms(2026, 3, 14, 9, 26, 0).unwrap();
        session
    }

    #[test]
    fn test_render_initial() {
        let rendered = render_initial(&session());
        assert!(rendered.starts_with("# Problem: Reduce checkout latency\n**Status**: ACTIVE\n"));
        assert!(rendered.contains("**Current Step**: 1 - Understanding Problem Statement\n"));
        assert!(rendered.contains("**Current Phase**: Phase 1\n"));
        assert!(rendered.contains("**Started**: 2026-03-14 09:26\n"));
        assert_eq!(rendered.matches("- [ ] Step ").count(), 6);
        assert!(rendered.contains("- [ ] Step 5: Testing & Optimization"));
        assert!(rendered.contains("- 09:26 User: Started six-step framework for: Reduce checkout latency"));
    }

    #[test]
    fn test_rewrite_position_touches_only_position_lines() {
        let original = render_initial(&session());
        let slot = Slot::new(Step::Brainstorming, 2).unwrap();
        let rewritten = rewrite_position(&original, slot);

        let before: Vec<&str> = original.lines().collect();
        let after: Vec<&str> = rewritten.lines().collect();
        assert_eq!(before.len(), after.len());
        for (b, a) in before.iter().zip(after.iter()) {
            if b.starts_with(STEP_PREFIX) {
                assert_eq!(*a, "**Current Step**: 3 - Brainstorming Session");
            } else if b.starts_with(PHASE_PREFIX) {
                assert_eq!(*a, "**Current Phase**: Phase 2");
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_rewrite_position_normalises_trailing_newline() {
        let rewritten = rewrite_position("**Current Step**: x\n\n\n", Slot::first());
        assert_eq!(rewritten, "**Current Step**: 1 - Understanding Problem Statement\n");
    }

    #[test]
    fn test_mark_complete() {
        let original = render_initial(&session());
        let done_at = Local.with_ymd_and_hms(2026, 3, 20, 17, 5, 0).unwrap();
        let completed = mark_complete(&original, Slot::last_of(Step::Insights), done_at);

        assert!(completed.contains("**Status**: COMPLETE ✅\n"));
        assert!(completed.contains("**Current Step**: 6 - Insights Extraction\n"));
        assert!(completed.contains("**Current Phase**: Phase 1\n"));
        assert!(completed.contains("**Started**: 2026-03-14 09:26\n**Completed**: 2026-03-20 17:05\n"));
        assert_eq!(completed.matches("- [x] Step ").count(), 6);
        assert!(!completed.contains("- [ ] Step "));
    }

    #[test]
    fn test_mark_complete_twice_keeps_one_stamp() {
        let original = render_initial(&session());
        let done_at = Local.with_ymd_and_hms(2026, 3, 20, 17, 5, 0).unwrap();
        let once = mark_complete(&original, Slot::last_of(Step::Insights), done_at);
        let twice = mark_complete(&once, Slot::last_of(Step::Insights), done_at);
        assert_eq!(twice.matches(COMPLETED_PREFIX).count(), 1);
    }

    #[test]
    fn test_mark_complete_ignores_started_text_in_description() {
        let mut session = session();
        session.problem_description = "Why does **Started**: break parsing".to_string();
        let done_at = Local.with_ymd_and_hms(2026, 3, 20, 17, 5, 0).unwrap();
        let completed = mark_complete(&render_initial(&session), Slot::last_of(Step::Insights), done_at);

        assert_eq!(completed.matches(COMPLETED_PREFIX).count(), 1);
        assert!(completed.contains("**Started**: 2026-03-14 09:26\n**Completed**: 2026-03-20 17:05\n"));
        assert!(completed.starts_with("# Problem: Why does **Started**: break parsing\n**Status**:"));
    }

    #[test]
    fn test_update_missing_file_is_noop() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("STATE.md");
        assert!(!update(&path, |c| c.to_string()).unwrap());
        assert!(!path.exists());
    }
}
