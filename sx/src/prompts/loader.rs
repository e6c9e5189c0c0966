//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to
//! embedded defaults.

use std::path::{Path, PathBuf};

use handlebars::Handlebars;
use serde::Serialize;
use tracing::{debug, info};

use super::embedded::{self, COMPOSE_NAME, STEP_DONE_NAME};
use crate::error::{SessionError, SessionResult};
use crate::fragments::InputComponents;

/// Context for the compose template
#[derive(Debug, Clone, Serialize)]
pub struct ComposeContext<'a> {
    pub framework_info: &'a str,
    pub step_info: &'a str,
    pub data_sources: &'a str,
    pub output_requirements: &'a str,
    pub problem_id: &'a str,
    pub problem_description: &'a str,
    /// e.g. "Step 3, Phase 2"
    pub position: String,
    /// Session artifact directory
    pub active_dir: String,
    /// The user's question, verbatim
    pub question: &'a str,
}

impl<'a> ComposeContext<'a> {
    pub fn new(components: &'a InputComponents, position: String, active_dir: &Path, question: &'a str) -> Self {
        debug!(%position, question_len = question.len(), "ComposeContext::new: called");
        Self {
            framework_info: &components.framework_info,
            step_info: &components.step_info,
            data_sources: &components.data_sources,
            output_requirements: &components.output_requirements,
            problem_id: &components.problem_id,
            problem_description: &components.problem_description,
            position,
            active_dir: active_dir.display().to_string(),
            question,
        }
    }
}

/// Context for the step-done template
#[derive(Debug, Clone, Serialize)]
pub struct StepDoneContext<'a> {
    pub framework_info: &'a str,
    pub step_info: &'a str,
    pub data_sources: &'a str,
    pub output_requirements: &'a str,
    pub problem_id: &'a str,
    /// Step that was just finished
    pub completed_step: u32,
    /// Phase that was just finished
    pub completed_phase: u32,
    /// The completed slot's `step_info` fragment, the one to update
    pub step_info_path: String,
    /// Interaction log of the completed slot
    pub meta_path: String,
    /// Session artifact directory
    pub active_dir: String,
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine
    hbs: Handlebars<'static>,
    /// User override directory
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that prefers templates from `override_dir`
    ///
    /// A directory that does not exist is ignored.
    pub fn new(override_dir: Option<PathBuf>) -> Self {
        debug!(?override_dir, "PromptLoader::new: called");
        let override_dir = override_dir.filter(|dir| {
            let exists = dir.is_dir();
            if !exists {
                debug!(?dir, "PromptLoader::new: override directory missing, ignoring");
            }
            exists
        });
        Self {
            hbs: Self::engine(),
            override_dir,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        // fragments are markdown, not HTML
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template by name
    ///
    /// Checks `<override_dir>/{name}.pmt` first, then the embedded defaults.
    fn load_template(&self, name: &str) -> SessionResult<String> {
        debug!(%name, "PromptLoader::load_template: called");
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load_template: found in override directory");
                return std::fs::read_to_string(&path).map_err(|e| SessionError::Render {
                    name: name.to_string(),
                    message: format!("failed to read {}: {}", path.display(), e),
                });
            }
            debug!(?path, "PromptLoader::load_template: not found in override directory");
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| SessionError::Render {
                name: name.to_string(),
                message: "template not found".to_string(),
            })
    }

    /// Render a template with the given context
    pub fn render<T: Serialize>(&self, name: &str, context: &T) -> SessionResult<String> {
        debug!(%name, "PromptLoader::render: called");
        let template = self.load_template(name)?;
        info!("Rendering template '{}'", name);
        let rendered = self
            .hbs
            .render_template(&template, context)
            .map_err(|e| SessionError::Render {
                name: name.to_string(),
                message: e.to_string(),
            })?;
        Ok(rendered.trim_end().to_string())
    }

    pub fn compose(&self, context: &ComposeContext<'_>) -> SessionResult<String> {
        self.render(COMPOSE_NAME, context)
    }

    pub fn step_done(&self, context: &StepDoneContext<'_>) -> SessionResult<String> {
        self.render(STEP_DONE_NAME, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn components() -> InputComponents {
        InputComponents {
            framework_info: "Six steps, in order.".to_string(),
            step_info: "Restate the problem & ask <why>.".to_string(),
            data_sources: "The ticket.".to_string(),
            output_requirements: "A one-paragraph statement.".to_string(),
            problem_id: "fix_bug".to_string(),
            problem_description: "Fix Bug".to_string(),
            missing: Vec::new(),
        }
    }

    #[test]
    fn test_compose_renders_without_escaping() {
        let loader = PromptLoader::new(None);
        let components = components();
        let context = ComposeContext::new(
            &components,
            "Step 1, Phase 1".to_string(),
            Path::new("/data/active/fix_bug"),
            "What's next?",
        );
        let prompt = loader.compose(&context).unwrap();

        assert!(prompt.starts_with("[SIX-STEP FRAMEWORK ACTIVE]"));
        assert!(prompt.contains("📍 CURRENT STEP/PHASE: Restate the problem & ask <why>."));
        assert!(prompt.contains("- Problem ID: fix_bug"));
        assert!(prompt.contains("- Active Directory: /data/active/fix_bug"));
        assert!(prompt.contains("[USER QUESTION]\nWhat's next?"));
        assert!(!prompt.ends_with('\n'));
    }

    #[test]
    fn test_step_done_names_files() {
        let loader = PromptLoader::new(None);
        let components = components();
        let context = StepDoneContext {
            framework_info: &components.framework_info,
            step_info: &components.step_info,
            data_sources: &components.data_sources,
            output_requirements: &components.output_requirements,
            problem_id: &components.problem_id,
            completed_step: 3,
            completed_phase: 2,
            step_info_path: "input_components/step3/phase2_step_info.md".to_string(),
            meta_path: "meta/fix_bug/step3_phase2.md".to_string(),
            active_dir: "active/fix_bug".to_string(),
        };
        let prompt = loader.step_done(&context).unwrap();

        assert!(prompt.contains("- Completed Step: 3 (Phase 2)"));
        assert!(prompt.contains("**FILE TO UPDATE**: input_components/step3/phase2_step_info.md"));
        assert!(prompt.contains("Meta File to Analyze: meta/fix_bug/step3_phase2.md"));
    }

    #[test]
    fn test_override_directory_wins() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("compose.pmt"), "Q: {{question}} ({{problem_id}})\n").unwrap();
        let loader = PromptLoader::new(Some(temp.path().to_path_buf()));
        let components = components();
        let context = ComposeContext::new(&components, String::new(), Path::new("x"), "why?");
        assert_eq!(loader.compose(&context).unwrap(), "Q: why? (fix_bug)");
    }

    #[test]
    fn test_missing_override_directory_falls_back() {
        let loader = PromptLoader::new(Some(PathBuf::from("/nonexistent/sixstep/prompts")));
        assert!(loader.override_dir.is_none());
        assert!(loader.load_template("step-done").is_ok());
    }

    #[test]
    fn test_unknown_template() {
        let loader = PromptLoader::new(None);
        let result = loader.render("plan", &serde_json::json!({}));
        assert!(matches!(result, Err(SessionError::Render { .. })));
    }
}
