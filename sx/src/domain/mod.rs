//! Domain types
//!
//! The step/phase table and the persisted session record.

mod session;
mod step;

pub use session::{MAX_PROBLEM_ID_LEN, Session, SessionStatus, derive_problem_id, mirror_path_in};
pub use step::{Slot, Step};
