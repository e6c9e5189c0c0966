//! Step/phase state machine
//!
//! Pure transition function over a [`Session`]. Persisting the result and
//! archiving a completed session are the orchestrator's job.

use tracing::{debug, info};

use crate::domain::{Session, Slot};
use crate::error::{SessionError, SessionResult};

/// Outcome of advancing a session
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// The session moved to a new (step, phase)
    Advanced {
        /// The updated session
        session: Session,
        /// Slot the session was in before advancing
        from: Slot,
        /// Human-readable summary of the move
        message: String,
    },
    /// The last phase of the last step is done; the session must be archived
    Completed {
        /// The session as it was at its final slot
        session: Session,
    },
}

/// Compute the next state of an active session
pub fn advance(session: &Session) -> SessionResult<Transition> {
    debug!(%session.problem_id, ?session.current_step, session.current_phase, "advance: called");
    if !session.is_active() {
        debug!(?session.status, "advance: session not active");
        return Err(SessionError::NoActiveSession);
    }

    let from = session.slot()?;
    match from.next() {
        Some(to) => {
            let mut next = session.clone();
            next.move_to(to);
            let message = format!(
                "Advanced to Step {}, {}: {}",
                to.step(),
                to.phase_label(),
                to.step().label()
            );
            info!(%session.problem_id, %from, %to, "Session advanced");
            Ok(Transition::Advanced {
                session: next,
                from,
                message,
            })
        }
        None => {
            info!(%session.problem_id, %from, "Final step finished, session complete");
            Ok(Transition::Completed {
                session: session.clone(),
            })
        }
    }
}
