//! CLI argument parsing for sx

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::Step;

/// sx - six-step problem-solving framework
#[derive(Parser, Debug)]
#[command(name = "sx")]
#[command(author, version, about = "Guided six-step problem-solving sessions", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new session, replacing any active one
    Start {
        /// Problem description
        #[arg(required = true)]
        description: Vec<String>,
    },

    /// Advance to the next step or phase
    Advance,

    /// Finish the current step and print the preference extraction prompt
    StepDone,

    /// Show the active session
    Status,

    /// Print the input components for the current step
    Components,

    /// Wrap a question in the framework prompt for the current step
    Compose {
        /// The question to ask
        #[arg(required = true)]
        question: Vec<String>,
    },

    /// Merge preferences into a step's input components
    Update {
        /// Preferences separated by '|', e.g. "Ask first | Work in phases"
        prompts: String,

        /// Target step (1-6); defaults to the step just completed
        #[arg(short, long, value_parser = parse_step)]
        step: Option<Step>,
    },
}

fn parse_step(value: &str) -> Result<Step, String> {
    value.parse::<Step>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_update_with_step() {
        let cli = Cli::try_parse_from(["sx", "update", "a | b", "--step", "3"]).unwrap();
        match cli.command {
            Command::Update { prompts, step } => {
                assert_eq!(prompts, "a | b");
                assert_eq!(step, Some(Step::Brainstorming));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_bad_step() {
        assert!(Cli::try_parse_from(["sx", "update", "a", "--step", "7"]).is_err());
        assert!(Cli::try_parse_from(["sx", "update", "a", "--step", "three"]).is_err());
    }

    #[test]
    fn test_parse_multiword_start_and_globals() {
        let cli = Cli::try_parse_from(["sx", "start", "Fix", "the", "bug", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Command::Start { description } => assert_eq!(description.join(" "), "Fix the bug"),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_start_requires_description() {
        assert!(Cli::try_parse_from(["sx", "start"]).is_err());
    }
}
