// lfmembers - keep a landscape's member category in sync with the roster

mod exit_codes;
mod run;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "lfmembers")]
#[command(about = "Reconcile a landscape's member category against the membership roster")]
#[command(version, long_version = long_version())]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the roster into the directory and write the missing report
    #[command(after_help = "\
Examples:
  lfmembers run members.toml
  lfmembers run members.toml --dry-run --json
  lfmembers run members.toml --output result.json --fail-on-missing
  RUST_LOG=landscape_recon=debug lfmembers run members.toml")]
    Run {
        /// Path to the run config (TOML)
        config: PathBuf,

        /// Print the run result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the run result as JSON to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Reconcile and report, but leave the directory file untouched
        #[arg(long)]
        dry_run: bool,

        /// Exit 1 when any record ends up in the missing report
        #[arg(long)]
        fail_on_missing: bool,

        /// Keep remote logo URLs even when [logos] is configured
        #[arg(long)]
        no_logos: bool,
    },

    /// Validate a run config without running
    #[command(after_help = "\
Examples:
  lfmembers validate members.toml")]
    Validate {
        /// Path to the run config (TOML)
        config: PathBuf,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  landscape-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    // RUST_LOG wins unless a flag was given.
    let filter = if quiet || verbose > 0 {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };
    init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            dry_run,
            fail_on_missing,
            no_logos,
        } => run::cmd_run(run::RunOptions {
            config_path: config,
            json,
            output,
            dry_run,
            fail_on_missing,
            no_logos,
        }),
        Commands::Validate { config } => run::cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
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
