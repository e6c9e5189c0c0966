//! Input component fragments
//!
//! Markdown fragments addressed by (slot, role). The mapping from slot to file
//! is a fixed table:
//!
//! ```text
//! input_components/
//! ├── framework_info.md              # shared by every workflow step
//! ├── step1/{role}.md
//! ├── step3/phase1_{role}.md         # step 3 is split by phase
//! ├── step3/phase2_{role}.md
//! └── step-done/{role}.md            # preference extraction flow
//! ```

use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::domain::{Session, Slot, Step};
use crate::error::{SessionError, SessionResult};

/// Shared framework description used by every workflow step
const FRAMEWORK_INFO_FILE: &str = "framework_info.md";

/// Part of a composed prompt a fragment supplies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    FrameworkInfo,
    StepInfo,
    DataSources,
    OutputRequirements,
}

impl Role {
    /// Roles stored per step slot
    pub const STEP_ROLES: [Role; 3] = [Role::StepInfo, Role::DataSources, Role::OutputRequirements];

    /// Every role, in prompt order
    pub const ALL: [Role; 4] = [
        Role::FrameworkInfo,
        Role::StepInfo,
        Role::DataSources,
        Role::OutputRequirements,
    ];

    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::FrameworkInfo => "framework_info",
            Self::StepInfo => "step_info",
            Self::DataSources => "data_sources",
            Self::OutputRequirements => "output_requirements",
        }
    }
}

/// Which set of fragments to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentSet {
    /// A workflow position
    Step(Slot),
    /// Preference extraction after finishing a step
    StepDone,
}

/// Address of a single fragment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FragmentKey {
    pub set: FragmentSet,
    pub role: Role,
}

impl FragmentKey {
    pub fn new(set: FragmentSet, role: Role) -> Self {
        Self { set, role }
    }

    /// The `step_info` fragment of a workflow slot
    pub fn step_info(slot: Slot) -> Self {
        Self::new(FragmentSet::Step(slot), Role::StepInfo)
    }

    /// Path relative to the components directory
    pub fn relative_path(&self) -> PathBuf {
        let stem = self.role.file_stem();
        match self.set {
            FragmentSet::Step(_) if self.role == Role::FrameworkInfo => PathBuf::from(FRAMEWORK_INFO_FILE),
            FragmentSet::Step(slot) if slot.step().phase_count() > 1 => {
                PathBuf::from(format!("step{}", slot.step())).join(format!("phase{}_{}.md", slot.phase(), stem))
            }
            FragmentSet::Step(slot) => PathBuf::from(format!("step{}", slot.step())).join(format!("{}.md", stem)),
            FragmentSet::StepDone => PathBuf::from("step-done").join(format!("{}.md", stem)),
        }
    }
}

/// Resolved text for one prompt, with visible placeholders for missing pieces
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InputComponents {
    pub framework_info: String,
    pub step_info: String,
    pub data_sources: String,
    pub output_requirements: String,
    pub problem_id: String,
    pub problem_description: String,
    /// Fragments that could not be read
    #[serde(skip)]
    pub missing: Vec<PathBuf>,
}

impl InputComponents {
    fn set(&mut self, role: Role, text: String) {
        match role {
            Role::FrameworkInfo => self.framework_info = text,
            Role::StepInfo => self.step_info = text,
            Role::DataSources => self.data_sources = text,
            Role::OutputRequirements => self.output_requirements = text,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Placeholder shown in place of a missing fragment
pub fn missing_placeholder(relative: &Path) -> String {
    format!("❌ Missing file: {}", relative.display())
}

/// Read-mostly store of input component fragments
#[derive(Debug, Clone)]
pub struct FragmentStore {
    /// Root of the fragment tree
    root: PathBuf,
}

impl FragmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(?root, "FragmentStore::new: called");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a fragment
    pub fn path(&self, key: FragmentKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Check the fragment tree is where the configuration says it is
    ///
    /// Requires the root directory plus the step 1 fragments and the step 2
    /// `step_info`, which every session reads first.
    pub fn validate(&self) -> SessionResult<()> {
        debug!(root = %self.root.display(), "FragmentStore::validate: called");
        if !self.root.is_dir() {
            return Err(SessionError::MissingFragment { path: self.root.clone() });
        }

        let first = Slot::first();
        let mut required: Vec<FragmentKey> = Role::STEP_ROLES
            .iter()
            .map(|role| FragmentKey::new(FragmentSet::Step(first), *role))
            .collect();
        required.push(FragmentKey::step_info(Slot::last_of(Step::Assessment)));

        for key in required {
            let path = self.path(key);
            if !path.is_file() {
                debug!(?path, "FragmentStore::validate: required fragment missing");
                return Err(SessionError::MissingFragment { path });
            }
        }
        Ok(())
    }

    /// Read one fragment, trimmed
    pub fn read(&self, key: FragmentKey) -> SessionResult<String> {
        let path = self.path(key);
        debug!(?path, "FragmentStore::read: called");
        match fs::read_to_string(&path) {
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(SessionError::MissingFragment { path }),
            Err(source) => Err(SessionError::FragmentIo { path, source }),
        }
    }

    /// Read a fragment, substituting a visible placeholder when it is missing
    fn read_or_placeholder(&self, key: FragmentKey, missing: &mut Vec<PathBuf>) -> SessionResult<String> {
        match self.read(key) {
            Ok(text) => Ok(text),
            Err(SessionError::MissingFragment { path }) => {
                warn!(path = %path.display(), "Input component missing, using placeholder");
                missing.push(path);
                Ok(missing_placeholder(&key.relative_path()))
            }
            Err(e) => Err(e),
        }
    }

    /// Resolve every fragment of a set for the given session
    pub fn resolve(&self, set: FragmentSet, session: &Session) -> SessionResult<InputComponents> {
        debug!(?set, %session.problem_id, "FragmentStore::resolve: called");
        let mut components = InputComponents {
            problem_id: session.problem_id.clone(),
            problem_description: session.problem_description.clone(),
            ..Default::default()
        };
        let mut missing = Vec::new();

        for role in Role::ALL {
            let text = self.read_or_placeholder(FragmentKey::new(set, role), &mut missing)?;
            components.set(role, text);
        }

        components.missing = missing;
        Ok(components)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn slot(step: Step, phase: u32) -> Slot {
        Slot::new(step, phase).unwrap()
    }

    #[test]
    fn test_relative_paths() {
        let cases = [
            (FragmentKey::step_info(slot(Step::Understanding, 1)), "step1/step_info.md"),
            (
                FragmentKey::new(FragmentSet::Step(slot(Step::Brainstorming, 1)), Role::DataSources),
                "step3/phase1_data_sources.md",
            ),
            (
                FragmentKey::new(FragmentSet::Step(slot(Step::Brainstorming, 2)), Role::OutputRequirements),
                "step3/phase2_output_requirements.md",
            ),
            (
                FragmentKey::new(FragmentSet::Step(slot(Step::Insights, 1)), Role::FrameworkInfo),
                "framework_info.md",
            ),
            (
                FragmentKey::new(FragmentSet::StepDone, Role::FrameworkInfo),
                "step-done/framework_info.md",
            ),
            (
                FragmentKey::new(FragmentSet::StepDone, Role::StepInfo),
                "step-done/step_info.md",
            ),
        ];
        for (key, expected) in cases {
            assert_eq!(key.relative_path(), PathBuf::from(expected));
        }
    }

    #[test]
    fn test_validate_requires_root_and_key_files() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::new(temp.path().join("input_components"));
        assert!(matches!(store.validate(), Err(SessionError::MissingFragment { .. })));

        fs::create_dir_all(store.root().join("step1")).unwrap();
        fs::create_dir_all(store.root().join("step2")).unwrap();
        for name in ["step1/step_info.md", "step1/data_sources.md", "step1/output_requirements.md"] {
            fs::write(store.root().join(name), "x").unwrap();
        }
        match store.validate() {
            Err(SessionError::MissingFragment { path }) => assert!(path.ends_with("step2/step_info.md")),
            other => panic!("expected missing step2 fragment, got {:?}", other),
        }

        fs::write(store.root().join("step2/step_info.md"), "x").unwrap();
        assert!(store.validate().is_ok());
    }

    #[test]
    fn test_resolve_uses_placeholders() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::new(temp.path());
        fs::create_dir_all(temp.path().join("step2")).unwrap();
        fs::write(temp.path().join("framework_info.md"), "  Six steps.\n").unwrap();
        fs::write(temp.path().join("step2/step_info.md"), "Assess.\n").unwrap();

        let mut session = Session::new("Fix Bug", &temp.path().join("active"));
        session.current_step = Step::Assessment;
        let components = store
            .resolve(FragmentSet::Step(session.slot().unwrap()), &session)
            .unwrap();

        assert_eq!(components.framework_info, "Six steps.");
        assert_eq!(components.step_info, "Assess.");
        assert_eq!(components.data_sources, "❌ Missing file: step2/data_sources.md");
        assert_eq!(components.problem_id, "fix_bug");
        assert_eq!(components.missing.len(), 2);
        assert!(!components.is_complete());
    }

    #[test]
    fn test_read_missing_is_explicit_error() {
        let temp = TempDir::new().unwrap();
        let store = FragmentStore::new(temp.path());
        let result = store.read(FragmentKey::new(FragmentSet::StepDone, Role::StepInfo));
        assert!(matches!(result, Err(SessionError::MissingFragment { .. })));
    }
}
