use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info};

use sixstep::cli::{Cli, Command};
use sixstep::config::Config;
use sixstep::{AdvanceOutcome, Orchestrator, Session, SessionResult, Step};

const NO_SESSION_HINT: &str = "No active six-step session. Use `sx start <description>` first.";

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sixstep")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("sixstep.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!("sx loaded config: root={}", config.root_dir.display());

    let orchestrator = Orchestrator::open(&config).context("Failed to open six-step workspace")?;

    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        Command::Start { description } => cmd_start(&orchestrator, &description.join(" ")),
        Command::Advance => cmd_advance(&orchestrator),
        Command::StepDone => cmd_step_done(&orchestrator),
        Command::Status => cmd_status(&orchestrator),
        Command::Components => cmd_components(&orchestrator),
        Command::Compose { question } => cmd_compose(&orchestrator, &question.join(" ")),
        Command::Update { prompts, step } => cmd_update(&orchestrator, &prompts, step),
    };

    match result {
        Err(e) if e.is_no_session() => {
            println!("{} {}", "❌".red(), NO_SESSION_HINT);
            Ok(())
        }
        other => other.context("Command failed"),
    }
}

fn print_position(session: &Session) {
    println!(
        "  Step:    {}",
        format!("{} - {}", session.current_step.number(), session.current_step.name()).cyan()
    );
    println!("  Phase:   {}", session.current_phase);
}

fn cmd_start(orchestrator: &Orchestrator, description: &str) -> SessionResult<()> {
    let session = orchestrator.start(description)?;
    println!("{} Started six-step framework for: {}", "✅".green(), description.bold());
    println!("  Problem: {}", session.problem_id.cyan());
    print_position(&session);
    println!("  Dir:     {}", session.problem_dir.display().to_string().dimmed());
    Ok(())
}

fn print_advance(outcome: &AdvanceOutcome) {
    match outcome {
        AdvanceOutcome::Advanced { message, .. } => println!("{} {}", "✅".green(), message),
        AdvanceOutcome::Completed { message, archive, .. } => {
            println!("{} {}", "✅".green(), message);
            println!("  Archive: {}", archive.display().to_string().dimmed());
        }
    }
    if let Some(warning) = outcome.mirror_warning() {
        println!("{} {}", "⚠️ ".yellow(), warning);
    }
}

fn cmd_advance(orchestrator: &Orchestrator) -> SessionResult<()> {
    let outcome = orchestrator.advance()?;
    print_advance(&outcome);
    Ok(())
}

fn cmd_step_done(orchestrator: &Orchestrator) -> SessionResult<()> {
    println!("🚀 Advancing framework step/phase...");
    let outcome = orchestrator.step_done()?;
    print_advance(&outcome.advance);

    if let Some(prompt) = outcome.prompt {
        println!("\n🔍 Extracting user preferences from completed step...");
        println!("{}", "=".repeat(60));
        println!("{}", prompt);
    }
    Ok(())
}

fn cmd_status(orchestrator: &Orchestrator) -> SessionResult<()> {
    match orchestrator.status()? {
        Some(session) => {
            println!("Problem: {}", session.problem_description.bold());
            println!("  Id:      {}", session.problem_id.cyan());
            println!("  Status:  {}", session.status.to_string().green());
            print_position(&session);
            println!("  Started: {}", session.started.format("%Y-%m-%d %H:%M"));
            println!("  Dir:     {}", session.problem_dir.display().to_string().dimmed());
        }
        None => println!("{}", NO_SESSION_HINT),
    }
    Ok(())
}

fn cmd_components(orchestrator: &Orchestrator) -> SessionResult<()> {
    let Some(components) = orchestrator.input_components()? else {
        println!("{}", NO_SESSION_HINT);
        return Ok(());
    };
    println!("{}\n{}\n", "FRAMEWORK INFO".bold(), components.framework_info);
    println!("{}\n{}\n", "STEP INFO".bold(), components.step_info);
    println!("{}\n{}\n", "DATA SOURCES".bold(), components.data_sources);
    println!("{}\n{}", "OUTPUT REQUIREMENTS".bold(), components.output_requirements);
    for path in &components.missing {
        eprintln!("{} Missing input component: {}", "⚠️ ".yellow(), path.display());
    }
    Ok(())
}

fn cmd_compose(orchestrator: &Orchestrator, question: &str) -> SessionResult<()> {
    match orchestrator.compose(question)? {
        Some(prompt) => println!("{}", prompt),
        None => println!("{} {}\n\nUser question: {}", "❌".red(), NO_SESSION_HINT, question),
    }
    Ok(())
}

fn cmd_update(orchestrator: &Orchestrator, prompts: &str, step: Option<Step>) -> SessionResult<()> {
    let outcome = orchestrator.update_components(prompts, step)?;
    println!("🎯 Target: {}", outcome.target.to_string().cyan());
    println!("📁 File:   {}", outcome.path.display());

    for long in &outcome.over_limit {
        let preview: String = long.chars().take(50).collect();
        println!("{} Prompt exceeds soft limit: '{}...'", "⚠️ ".yellow(), preview);
    }
    for duplicate in &outcome.consolidation.duplicates {
        println!(
            "{} Duplicate skipped: '{}' (similar to '{}')",
            "⚠️ ".yellow(),
            duplicate.incoming,
            duplicate.matched
        );
    }
    if outcome.consolidation.rebuilt {
        println!(
            "{} Size limit exceeded, dropped {} existing preference(s)",
            "⚠️ ".yellow(),
            outcome.consolidation.dropped.len()
        );
    }

    println!(
        "{} Updated with {} new prompt(s); {} preference(s), {} characters",
        "✅".green(),
        outcome.incoming.len(),
        outcome.consolidation.preferences.len(),
        outcome.consolidation.size()
    );
    for preference in &outcome.consolidation.preferences {
        println!("  - {}", preference);
    }
    Ok(())
}
