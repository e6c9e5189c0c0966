//! Session orchestrator
//!
//! Composes the store, the state machine, the status mirror, the fragment
//! store and the consolidator into the operations the CLI exposes.
//!
//! ```text
//! <root-dir>/
//! ├── current_state.json     # active session record
//! ├── input_components/      # fragment tree (configurable)
//! ├── active/<id>/           # STATE.md, user-review/, guide/, input_dump/
//! ├── meta/<id>/             # per-step interaction logs
//! └── completed/<id>[_<ts>]/ # archived sessions
//! ```

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::domain::{Session, Slot, Step, mirror_path_in};
use crate::error::{SessionError, SessionResult};
use crate::fragments::{FragmentKey, FragmentSet, FragmentStore, InputComponents};
use crate::machine::{self, Transition};
use crate::mirror;
use crate::preferences::{self, Consolidation, Consolidator};
use crate::prompts::{ComposeContext, PromptLoader, StepDoneContext};
use crate::store::{FileSessionStore, SessionStore};

/// Subdirectories created inside every session directory
pub const SESSION_SUBDIRS: [&str; 3] = ["user-review", "guide", "input_dump"];

/// File name of the active session record
pub const STATE_FILE: &str = "current_state.json";

/// Directory layout derived from the configured root
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub root: PathBuf,
    pub active: PathBuf,
    pub meta: PathBuf,
    pub completed: PathBuf,
    pub state_file: PathBuf,
    pub components: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, components: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            active: root.join("active"),
            meta: root.join("meta"),
            completed: root.join("completed"),
            state_file: root.join(STATE_FILE),
            components: components.into(),
            root,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.root_dir, config.components_dir())
    }

    /// Meta directory of one session
    pub fn meta_dir(&self, problem_id: &str) -> PathBuf {
        self.meta.join(problem_id)
    }

    /// Interaction log for a slot: `stepN.md`, or `stepN_phaseP.md` past phase 1
    pub fn meta_log(&self, problem_id: &str, slot: Slot) -> PathBuf {
        let name = if slot.phase() > 1 {
            format!("step{}_phase{}.md", slot.step(), slot.phase())
        } else {
            format!("step{}.md", slot.step())
        };
        self.meta_dir(problem_id).join(name)
    }
}

/// Result of `advance`
#[derive(Debug)]
pub enum AdvanceOutcome {
    /// Moved to the next slot and persisted
    Advanced {
        session: Session,
        /// The slot that was just finished
        from: Slot,
        message: String,
        /// Set when the record was saved but STATE.md could not be rewritten
        mirror_warning: Option<SessionError>,
    },
    /// Final step finished; the session was archived and the record cleared
    Completed {
        session: Session,
        /// Where the session directory was moved
        archive: PathBuf,
        message: String,
        /// Set when the archive was made but its STATE.md could not be updated
        mirror_warning: Option<SessionError>,
    },
}

impl AdvanceOutcome {
    pub fn message(&self) -> &str {
        match self {
            Self::Advanced { message, .. } | Self::Completed { message, .. } => message,
        }
    }

    pub fn mirror_warning(&self) -> Option<&SessionError> {
        match self {
            Self::Advanced { mirror_warning, .. } | Self::Completed { mirror_warning, .. } => mirror_warning.as_ref(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Result of `step_done`
#[derive(Debug)]
pub struct StepDoneOutcome {
    pub advance: AdvanceOutcome,
    /// Preference extraction prompt; None when the session completed
    pub prompt: Option<String>,
}

/// Result of `update_components`
#[derive(Debug)]
pub struct UpdateOutcome {
    /// Slot whose `step_info` fragment was rewritten
    pub target: Slot,
    /// The rewritten fragment
    pub path: PathBuf,
    /// Cleaned incoming preferences
    pub incoming: Vec<String>,
    /// Incoming preferences longer than the soft limit
    pub over_limit: Vec<String>,
    pub consolidation: Consolidation,
}

/// Pick the slot whose `step_info` receives new preferences
///
/// Without an explicit step this is the slot just finished (the predecessor
/// of `current`, or step 1 at the very start). An explicit step before the
/// current one means its last phase; the current step means the phase just
/// finished within it; a later step means its first phase.
pub fn resolve_update_target(current: Slot, requested: Option<Step>) -> Slot {
    debug!(%current, ?requested, "resolve_update_target: called");
    match requested {
        None => current.previous().unwrap_or_else(Slot::first),
        Some(step) if step < current.step() => Slot::last_of(step),
        Some(step) if step == current.step() => current
            .previous()
            .filter(|prev| prev.step() == step)
            .unwrap_or(current),
        Some(step) => Slot::first_of(step),
    }
}

/// Drives a six-step session over a [`SessionStore`]
pub struct Orchestrator<S: SessionStore = FileSessionStore> {
    layout: Layout,
    store: S,
    fragments: FragmentStore,
    prompts: PromptLoader,
    consolidator: Consolidator,
    soft_limit: usize,
}

impl Orchestrator<FileSessionStore> {
    /// Open the orchestrator with the JSON file store under the configured root
    pub fn open(config: &Config) -> SessionResult<Self> {
        let layout = Layout::from_config(config);
        let store = FileSessionStore::new(&layout.state_file);
        Self::with_store(config, store)
    }
}

impl<S: SessionStore> Orchestrator<S> {
    /// Open the orchestrator over a custom store
    ///
    /// Validates the fragment tree and creates the `active/` and `meta/`
    /// directories when missing.
    pub fn with_store(config: &Config, store: S) -> SessionResult<Self> {
        debug!(root = %config.root_dir.display(), "Orchestrator::with_store: called");
        let layout = Layout::from_config(config);
        let fragments = FragmentStore::new(&layout.components);
        fragments.validate()?;

        for dir in [&layout.active, &layout.meta] {
            create_dir(dir)?;
        }

        Ok(Self {
            prompts: PromptLoader::new(config.prompts_dir.clone()),
            consolidator: Consolidator::new(
                config.preferences.max_section_size,
                config.preferences.similarity_threshold,
            ),
            soft_limit: config.preferences.soft_limit,
            layout,
            store,
            fragments,
        })
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn fragments(&self) -> &FragmentStore {
        &self.fragments
    }

    /// The active session, if any
    pub fn status(&self) -> SessionResult<Option<Session>> {
        debug!("Orchestrator::status: called");
        self.store.load()
    }

    fn require_session(&self) -> SessionResult<Session> {
        self.store.load()?.ok_or(SessionError::NoActiveSession)
    }

    /// Start a new session, discarding any previous one
    pub fn start(&self, description: &str) -> SessionResult<Session> {
        debug!(%description, "Orchestrator::start: called");
        if self.store.clear()? {
            info!("Discarded previous session record");
        }

        let session = Session::new(description, &self.layout.active);
        let meta_dir = self.layout.meta_dir(&session.problem_id);
        let mut created = Vec::new();
        for root in [&session.problem_dir, &meta_dir] {
            if !root.exists() {
                created.push(root.clone());
            }
        }

        let result = self.initialise(&session, &meta_dir);
        if let Err(e) = result {
            warn!(%session.problem_id, error = %e, "Start failed, removing created directories");
            for dir in &created {
                if let Err(cleanup) = fs::remove_dir_all(dir) {
                    warn!(?dir, error = %cleanup, "Failed to remove directory");
                }
            }
            return Err(e);
        }

        info!(%session.problem_id, dir = %session.problem_dir.display(), "Started six-step session");
        Ok(session)
    }

    /// Create directories, then the mirror, then the record last
    fn initialise(&self, session: &Session, meta_dir: &Path) -> SessionResult<()> {
        for sub in SESSION_SUBDIRS {
            create_dir(&session.problem_dir.join(sub))?;
        }
        create_dir(meta_dir)?;
        mirror::write_initial(&session.mirror_path(), session)?;
        self.store.save(session)
    }

    /// Advance the active session by one phase
    pub fn advance(&self) -> SessionResult<AdvanceOutcome> {
        debug!("Orchestrator::advance: called");
        let session = self.require_session()?;
        match machine::advance(&session)? {
            Transition::Advanced { session, from, message } => {
                self.store.save(&session)?;
                let to = session.slot()?;
                let mirror_warning = mirror::update(&session.mirror_path(), |c| mirror::rewrite_position(c, to))
                    .err()
                    .inspect(|e| warn!(error = %e, "Status mirror not updated"));
                Ok(AdvanceOutcome::Advanced {
                    session,
                    from,
                    message,
                    mirror_warning,
                })
            }
            Transition::Completed { session } => self.archive(session),
        }
    }

    /// Move a finished session into `completed/` and clear the record
    fn archive(&self, session: Session) -> SessionResult<AdvanceOutcome> {
        debug!(%session.problem_id, "Orchestrator::archive: called");
        let now = Local::now();
        create_dir(&self.layout.completed)?;

        let target = archive_target(&self.layout.completed, &session.problem_id, now);
        fs::rename(&session.problem_dir, &target).map_err(|source| SessionError::Archival {
            from: session.problem_dir.clone(),
            to: target.clone(),
            source,
        })?;
        info!(%session.problem_id, archive = %target.display(), "Archived completed session");

        let final_slot = session.slot()?;
        let mirror_warning = mirror::update(&mirror_path_in(&target), |c| mirror::mark_complete(c, final_slot, now))
            .err()
            .inspect(|e| warn!(error = %e, "Archived status mirror not updated"));

        self.store.clear()?;
        let message = format!(
            "Framework session completed! Problem '{}' moved to completed directory and state reset.",
            session.problem_id
        );
        Ok(AdvanceOutcome::Completed {
            session,
            archive: target,
            message,
            mirror_warning,
        })
    }

    /// Components for the current slot, or None without an active session
    pub fn input_components(&self) -> SessionResult<Option<InputComponents>> {
        debug!("Orchestrator::input_components: called");
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };
        let slot = session.slot()?;
        self.fragments.resolve(FragmentSet::Step(slot), &session).map(Some)
    }

    /// Wrap a user question in the framework prompt for the current slot
    pub fn compose(&self, question: &str) -> SessionResult<Option<String>> {
        debug!(question_len = question.len(), "Orchestrator::compose: called");
        let Some(session) = self.store.load()? else {
            return Ok(None);
        };
        let slot = session.slot()?;
        let components = self.fragments.resolve(FragmentSet::Step(slot), &session)?;
        let context = ComposeContext::new(&components, slot.to_string(), &session.problem_dir, question);
        self.prompts.compose(&context).map(Some)
    }

    /// Advance, then build the prompt that extracts preferences from the finished slot
    pub fn step_done(&self) -> SessionResult<StepDoneOutcome> {
        debug!("Orchestrator::step_done: called");
        let advance = self.advance()?;
        let AdvanceOutcome::Advanced { session, from, .. } = &advance else {
            debug!("Orchestrator::step_done: session completed, no extraction prompt");
            return Ok(StepDoneOutcome { advance, prompt: None });
        };

        let components = self.fragments.resolve(FragmentSet::StepDone, session)?;
        let context = StepDoneContext {
            framework_info: &components.framework_info,
            step_info: &components.step_info,
            data_sources: &components.data_sources,
            output_requirements: &components.output_requirements,
            problem_id: &session.problem_id,
            completed_step: from.step().number(),
            completed_phase: from.phase(),
            step_info_path: self.fragments.path(FragmentKey::step_info(*from)).display().to_string(),
            meta_path: self.layout.meta_log(&session.problem_id, *from).display().to_string(),
            active_dir: session.problem_dir.display().to_string(),
        };
        let prompt = self.prompts.step_done(&context)?;
        Ok(StepDoneOutcome {
            advance,
            prompt: Some(prompt),
        })
    }

    /// Merge `|`-separated preferences into a slot's `step_info` fragment
    pub fn update_components(&self, prompts: &str, step: Option<Step>) -> SessionResult<UpdateOutcome> {
        debug!(%prompts, ?step, "Orchestrator::update_components: called");
        let session = self.require_session()?;
        let target = resolve_update_target(session.slot()?, step);
        let path = self.fragments.path(FragmentKey::step_info(target));
        info!(%target, path = %path.display(), "Updating preferences");

        let incoming = preferences::split_prompts(prompts);
        if incoming.is_empty() {
            return Err(SessionError::NoPreferences);
        }
        let over_limit: Vec<String> = preferences::over_soft_limit(&incoming, self.soft_limit)
            .into_iter()
            .map(str::to_string)
            .collect();
        for long in &over_limit {
            warn!(len = long.chars().count(), limit = self.soft_limit, "Preference exceeds soft limit");
        }

        let existing = preferences::read_preferences(&path)?;
        let consolidation = self.consolidator.consolidate(&existing, &incoming);
        preferences::write_preferences(&path, &consolidation.preferences)?;

        Ok(UpdateOutcome {
            target,
            path,
            incoming,
            over_limit,
            consolidation,
        })
    }
}

fn create_dir(path: &Path) -> SessionResult<()> {
    fs::create_dir_all(path).map_err(|source| SessionError::DirectoryCreation {
        path: path.to_path_buf(),
        source,
    })
}

/// First free archive path for `problem_id`
///
/// `<id>`, then `<id>_<YYYYmmdd_HHMMSS>`, then `<id>_<YYYYmmdd_HHMMSS>_<n>`.
fn archive_target(completed: &Path, problem_id: &str, now: chrono::DateTime<Local>) -> PathBuf {
    let plain = completed.join(problem_id);
    if !plain.exists() {
        return plain;
    }
    let stamped = format!("{}_{}", problem_id, now.format("%Y%m%d_%H%M%S"));
    let candidate = completed.join(&stamped);
    if !candidate.exists() {
        return candidate;
    }
    (2..)
        .map(|n| completed.join(format!("{}_{}", stamped, n)))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}
