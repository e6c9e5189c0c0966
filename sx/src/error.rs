//! Session error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while driving a six-step session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active six-step session found")]
    NoActiveSession,

    #[error("Missing input component: {}", path.display())]
    MissingFragment { path: PathBuf },

    #[error("Fragment not found: {}", path.display())]
    FragmentNotFound { path: PathBuf },

    #[error("Failed to access fragment {}: {source}", path.display())]
    FragmentIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to persist session state to {}: {source}", path.display())]
    StatePersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session state at {} is unreadable: {source}", path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to archive {} to {}: {source}", from.display(), to.display())]
    Archival {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to update status mirror {}: {source}", path.display())]
    StatusMirror {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid phase {phase} for step {step}")]
    InvalidPhase { step: String, phase: u32 },

    #[error("'{value}' is not a step number (1-6)")]
    InvalidStep { value: String },

    #[error("No valid preferences provided")]
    NoPreferences,

    #[error("Failed to render prompt {name}: {message}")]
    Render { name: String, message: String },
}

impl SessionError {
    /// Check if this error is a normal "nothing to do" condition rather than a failure
    pub fn is_no_session(&self) -> bool {
        matches!(self, SessionError::NoActiveSession)
    }

    /// Check if this error signals broken configuration that retrying cannot fix
    pub fn is_fatal(&self) -> bool {
        match self {
            SessionError::InvalidPhase { .. } => true,
            SessionError::CorruptState { .. } => true,
            SessionError::FragmentNotFound { .. } => true,
            SessionError::Render { .. } => true,
            SessionError::NoActiveSession => false,
            SessionError::MissingFragment { .. } => false,
            SessionError::FragmentIo { .. } => false,
            SessionError::DirectoryCreation { .. } => false,
            SessionError::StatePersist { .. } => false,
            SessionError::Archival { .. } => false,
            SessionError::StatusMirror { .. } => false,
            SessionError::InvalidStep { .. } => false,
            SessionError::NoPreferences => false,
        }
    }
}

/// Result alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_no_session() {
        assert!(SessionError::NoActiveSession.is_no_session());
        assert!(!SessionError::NoPreferences.is_no_session());
    }

    #[test]
    fn test_is_fatal() {
        assert!(
            SessionError::InvalidPhase {
                step: "3".to_string(),
                phase: 3
            }
            .is_fatal()
        );
        assert!(!SessionError::NoActiveSession.is_fatal());
        assert!(
            !SessionError::InvalidStep {
                value: "7".to_string()
            }
            .is_fatal()
        );
        assert!(
            !SessionError::MissingFragment {
                path: PathBuf::from("step1/step_info.md")
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display_includes_paths() {
        let err = SessionError::Archival {
            from: PathBuf::from("active/fix_bug"),
            to: PathBuf::from("completed/fix_bug"),
            source: std::io::Error::other("disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("active/fix_bug"));
        assert!(msg.contains("completed/fix_bug"));
        assert!(msg.contains("disk full"));
    }
}
