//! Argument parsing, logging setup and command dispatch.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use peerlink_telemetry::{LogFormat, LoggingConfig, init_logging};
use serde_json::Value;

use crate::commands::run::handle_run;
use crate::commands::settings::{handle_defaults, handle_fingerprint};
use crate::error::{CliError, CliResult};

const DEFAULT_LOG_LEVEL: &str = "warn";
const DEFAULT_RUN_SECS: u64 = 10;

/// Parses CLI arguments, executes the requested command and returns the
/// process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&LoggingConfig {
        level: &cli.log_level,
        format: cli.log_format.map_or_else(LogFormat::infer, LogFormat::from),
        build_sha: option_env!("PEERLINK_BUILD_SHA").unwrap_or("dev"),
    }) {
        eprintln!("warning: {err}");
    }

    match dispatch(cli).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let overrides = cli.settings.as_deref().map(load_settings).transpose()?;

    match cli.command {
        Command::Defaults => handle_defaults(overrides.as_ref()),
        Command::Fingerprint(args) => handle_fingerprint(&args),
        Command::Run(args) => handle_run(overrides.as_ref(), args).await,
    }
}

/// Read a settings-override document.
pub(crate) fn load_settings(path: &Path) -> CliResult<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings file {}", path.display()))
        .map_err(CliError::failure)?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::validation(format!(
            "settings file {} is not valid JSON: {err}",
            path.display()
        ))
    })
}

#[derive(Parser)]
#[command(name = "peerlink", about = "Run and inspect a local peerlink session")]
struct Cli {
    #[arg(long, global = true, env = "PEERLINK_SETTINGS")]
    settings: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        env = "PEERLINK_LOG_LEVEL",
        default_value = DEFAULT_LOG_LEVEL
    )]
    log_level: String,
    #[arg(long, global = true, env = "PEERLINK_LOG_FORMAT", value_enum)]
    log_format: Option<LogFormatArg>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the effective settings a new session starts with.
    Defaults,
    /// Print the encoded peer id prefix for a client id and version.
    Fingerprint(FingerprintArgs),
    /// Run a session and stream its alert records as JSON lines.
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub(crate) struct FingerprintArgs {
    /// Two character client id.
    pub(crate) name: String,
    pub(crate) major: u8,
    pub(crate) minor: u8,
    pub(crate) revision: u8,
    pub(crate) tag: u8,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Magnet link to add; may be repeated.
    #[arg(long = "magnet")]
    pub(crate) magnets: Vec<String>,
    /// Directory torrents are saved under.
    #[arg(long, default_value = ".")]
    pub(crate) save_path: String,
    /// Seconds to stream alerts before shutting down.
    #[arg(long, default_value_t = DEFAULT_RUN_SECS)]
    pub(crate) duration_secs: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormatArg {
    Json,
    Pretty,
}

impl From<LogFormatArg> for LogFormat {
    fn from(value: LogFormatArg) -> Self {
        match value {
            LogFormatArg::Json => Self::Json,
            LogFormatArg::Pretty => Self::Pretty,
        }
    }
}
