// Conflation CLI - replay reconciliation sessions headlessly

mod exit_codes;
mod replay;
mod script;
mod world;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use conflation_recon::ReconConfig;
use exit_codes::{EXIT_INVALID_CONFIG, EXIT_INVALID_SCRIPT, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "conflate")]
#[command(about = "Match-set reconciliation for conflating two feature layers")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scripted session against an in-memory dataset
    #[command(after_help = "\
Examples:
  conflate replay session.toml
  conflate replay session.toml --json
  conflate replay session.toml --config conflation.toml --output result.json")]
    Replay {
        /// Path to the session script
        script: PathBuf,

        /// Session/matching config (defaults apply when omitted)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Validate a config file without running anything
    #[command(after_help = "\
Examples:
  conflate validate conflation.toml")]
    Validate {
        /// Path to the config file
        config: PathBuf,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_CONFIG, message: msg.into(), hint: None }
    }

    pub fn script(msg: impl Into<String>) -> Self {
        Self { code: EXIT_INVALID_SCRIPT, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME, message: msg.into(), hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .target(env_logger::Target::Stderr)
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Replay { script, config, json, output } => cmd_replay(script, config, json, output),
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            log::debug!("exiting with {code} ({})", exit_codes::describe(code));
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn read_file(path: &Path, what: &str) -> Result<String, CliError> {
    std::fs::read_to_string(path)
        .map_err(|e| CliError::usage(format!("cannot read {what} {}: {e}", path.display())))
}

fn load_config(path: &Path) -> Result<ReconConfig, CliError> {
    let text = read_file(path, "config")?;
    ReconConfig::from_toml(&text).map_err(|e| CliError::config(e.to_string()))
}

fn cmd_replay(
    script_path: PathBuf,
    config_path: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config = match config_path {
        Some(ref path) => load_config(path)?,
        None => ReconConfig::default(),
    };

    let text = read_file(&script_path, "script")?;
    let script = script::Script::from_toml(&text).map_err(|e| {
        CliError::script(format!("{}: {e}", script_path.display()))
            .with_hint("steps use op = \"delete\" | \"undelete\" | \"bulk_restore\" | \"purge\" | \"select\" | \"select_matches\" | \"conflate\" | \"conflate_unmatched\" | \"remove_matches\" | \"remove_unmatched\" | \"undo\" | \"redo\"")
    })?;

    let name = script_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| script_path.display().to_string());
    let report = replay::run(&script, config, &name)?;

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::runtime(format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::runtime(format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    replay::print_summary(&report);
    Ok(())
}

fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    println!(
        "{}: ok (history_limit={}, purge_missing={}, show_match_layer={}, distance_threshold={})",
        config_path.display(),
        config.session.history_limit,
        config.session.purge_missing,
        config.session.show_match_layer,
        config.matching.distance_threshold
    );
    Ok(())
}
