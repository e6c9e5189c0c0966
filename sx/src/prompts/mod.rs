//! Prompt templates
//!
//! Renders `.pmt` (prompt template) files into the text handed to the
//! assistant for `compose` and `step-done`.
//!
//! Template loading chain:
//! 1. `<prompts-dir>/{name}.pmt` (user override, when configured)
//! 2. Embedded fallback in code
//!
//! Templates use Handlebars syntax for variable substitution. Output is not
//! HTML-escaped.

pub mod embedded;
mod loader;

pub use loader::{ComposeContext, PromptLoader, StepDoneContext};
