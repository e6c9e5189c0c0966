//! sixstep - guided six-step problem-solving workflow
//!
//! Tracks which step and phase a problem-solving session is in, assembles
//! the prompt for the current position from per-step markdown fragments, and
//! folds user preferences back into those fragments under a dedup rule and a
//! size budget.
//!
//! # Steps
//!
//! ```text
//! 1 Understanding Problem Statement
//! 2 Current Situation Assessment
//! 3 Brainstorming Session          (phase 1: brainstorm, phase 2: task list)
//! 4 Implementation
//! 5 Testing & Optimization
//! 6 Insights Extraction            -> archived to completed/
//! ```
//!
//! # Example
//!
//! ```ignore
//! use sixstep::{Config, Orchestrator};
//!
//! let orchestrator = Orchestrator::open(&Config::load(None)?)?;
//! let session = orchestrator.start("Reduce checkout latency")?;
//! let prompt = orchestrator.compose("Where do we start?")?;
//! let outcome = orchestrator.step_done()?;
//! orchestrator.update_components("Ask clarifying questions first", None)?;
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fragments;
pub mod machine;
pub mod mirror;
pub mod orchestrator;
pub mod preferences;
pub mod prompts;
pub mod store;

pub use config::{Config, PreferencesConfig};
pub use domain::{Session, SessionStatus, Slot, Step};
pub use error::{SessionError, SessionResult};
pub use fragments::{FragmentKey, FragmentSet, FragmentStore, InputComponents, Role};
pub use machine::Transition;
pub use orchestrator::{AdvanceOutcome, Layout, Orchestrator, StepDoneOutcome, UpdateOutcome, resolve_update_target};
pub use preferences::{Consolidation, Consolidator, consolidate};
pub use store::{FileSessionStore, SessionStore};
