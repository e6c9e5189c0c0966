//! Session state persistence
//!
//! A single flat record describes the active session. There is at most one
//! writer at a time: callers serialize invocations, and no locking is done.
//! Each save replaces the whole record atomically (temp file + rename), so a
//! crash never leaves a half-written record behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::Session;
use crate::error::{SessionError, SessionResult};

/// Storage for the active session record
pub trait SessionStore {
    /// Load the active session, or None when there is none
    fn load(&self) -> SessionResult<Option<Session>>;

    /// Replace the stored record
    fn save(&self, session: &Session) -> SessionResult<()>;

    /// Remove the stored record; returns whether one existed
    fn clear(&self) -> SessionResult<bool>;
}

/// JSON file backed session store
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    /// Path of the state record
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        debug!(?path, "FileSessionStore::new: called");
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, source: std::io::Error) -> SessionError {
        SessionError::StatePersist {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> SessionResult<Option<Session>> {
        debug!(path = %self.path.display(), "FileSessionStore::load: called");
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("FileSessionStore::load: no state record");
                return Ok(None);
            }
            Err(e) => return Err(self.persist_error(e)),
        };

        let session: Session = serde_json::from_str(&content).map_err(|source| SessionError::CorruptState {
            path: self.path.clone(),
            source,
        })?;
        debug!(%session.problem_id, "FileSessionStore::load: loaded session");
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> SessionResult<()> {
        debug!(%session.problem_id, path = %self.path.display(), "FileSessionStore::save: called");
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
        }

        let json = serde_json::to_string_pretty(session).map_err(|e| self.persist_error(std::io::Error::other(e)))?;
        let temp = self.temp_path();
        fs::write(&temp, json).map_err(|e| self.persist_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.persist_error(e)
        })?;
        info!(%session.problem_id, step = %session.current_step, phase = session.current_phase, "Saved session state");
        Ok(())
    }

    fn clear(&self) -> SessionResult<bool> {
        debug!(path = %self.path.display(), "FileSessionStore::clear: called");
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Cleared session state");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.persist_error(e)),
        }
    }
}
