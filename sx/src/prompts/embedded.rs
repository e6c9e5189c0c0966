//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Name of the compose template
pub const COMPOSE_NAME: &str = "compose";

/// Name of the step-done template
pub const STEP_DONE_NAME: &str = "step-done";

/// Framework-active prompt wrapping a user question
pub const COMPOSE: &str = include_str!("../../prompts/compose.pmt");

/// Preference extraction prompt shown after a step is finished
pub const STEP_DONE: &str = include_str!("../../prompts/step-done.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        COMPOSE_NAME => Some(COMPOSE),
        STEP_DONE_NAME => Some(STEP_DONE),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_embedded_compose() {
        let compose = get_embedded("compose").unwrap();
        assert!(compose.starts_with("[SIX-STEP FRAMEWORK ACTIVE]"));
        assert!(compose.contains("{{question}}"));
        assert!(compose.contains("[FRAMEWORK INSTRUCTION]"));
    }

    #[test]
    fn test_get_embedded_step_done() {
        let step_done = get_embedded("step-done").unwrap();
        assert!(step_done.contains("Extract user preferences"));
        assert!(step_done.contains("{{step_info_path}}"));
        assert!(step_done.contains("{{meta_path}}"));
    }

    #[test]
    fn test_get_embedded_unknown() {
        assert!(get_embedded("plan").is_none());
    }
}
