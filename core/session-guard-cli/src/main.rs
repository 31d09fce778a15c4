//! session-guard: drives the inactivity session guard from the command line.
//!
//! ## Subcommands
//!
//! - `simulate`: Replays a JSON timeline on a virtual clock, prints transitions
//! - `watch`: Runs a live guard, one command per stdin line
//! - `config`: Prints the effective configuration

mod logging;
mod scenario;
mod watch;

use clap::{Parser, Subcommand, ValueEnum};
use session_guard::{format_transition, load_config, GuardConfig, TransitionRecord};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "session-guard")]
#[command(about = "Inactivity session guard: idle warning and auto-logout")]
#[command(version)]
struct Cli {
    /// Guard config file (TOML). Falls back to SESSION_GUARD_CONFIG, then
    /// ~/.session-guard/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file against a virtual clock
    Simulate {
        /// JSON scenario with timed steps
        #[arg(value_name = "SCENARIO")]
        scenario: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },

    /// Run a live guard; reads commands from stdin
    Watch,

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

fn main() {
    let _logging_guard = logging::init();
    let cli = Cli::parse();

    let config = match load_config(resolve_config_path(cli.config)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load guard config");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Simulate { scenario, format } => simulate(&scenario, config, format),
        Commands::Watch => watch::run(config).map(|_| ()),
        Commands::Config => print_config(&config),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "session-guard failed");
        std::process::exit(1);
    }
}

fn resolve_config_path(flag: Option<PathBuf>) -> Option<PathBuf> {
    flag.or_else(|| {
        env::var_os("SESSION_GUARD_CONFIG")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
    })
}

fn simulate(path: &Path, config: GuardConfig, format: OutputFormat) -> Result<(), String> {
    let scenario = scenario::Scenario::load(path).map_err(|e| e.to_string())?;
    let report = scenario::run(&scenario, config).map_err(|e| e.to_string())?;

    for transition in &report.transitions {
        match format {
            OutputFormat::Json => {
                println!("{}", TransitionRecord::from_transition(transition).to_json_line()?)
            }
            OutputFormat::Text => println!("{}", format_transition(transition)),
        }
    }

    match format {
        OutputFormat::Json => {
            let summary = serde_json::json!({ "summary": report.summary });
            println!("{}", summary);
        }
        OutputFormat::Text => println!(
            "Summary ended_at={}ms final_state={} terminations={}",
            report.summary.ended_at_ms, report.summary.final_state, report.summary.terminations
        ),
    }
    Ok(())
}

fn print_config(config: &GuardConfig) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;
    println!("{}", content);
    Ok(())
}
