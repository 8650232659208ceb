// City2TABULA validation CLI - compare calculated building and surface
// attributes against thematic reference values.

mod exit_codes;
mod validate;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exit_codes::{validation_exit_code, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "c2t-validate")]
#[command(about = "Validate calculated City2TABULA attributes against reference data")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run validation from a TOML config file
    #[command(after_help = "\
Examples:
  c2t-validate run validation.toml
  c2t-validate run validation.toml --json
  c2t-validate run validation.toml --output report.json --out-dir results/
  c2t-validate run validation.toml --fail-on-flagged")]
    Run {
        /// Path to the validation config file
        config: PathBuf,

        /// Output the JSON report to stdout instead of a human summary
        #[arg(long)]
        json: bool,

        /// Write the JSON report to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write per-level validation and flagged CSVs into this directory
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Exit with code 5 when any record is flagged
        #[arg(long)]
        fail_on_flagged: bool,
    },

    /// Validate a config and print the resolved attribute mappings
    #[command(after_help = "\
Examples:
  c2t-validate check validation.toml")]
    Check {
        /// Path to the validation config file
        config: PathBuf,
    },

    /// Descriptive statistics of reference values in exported validation CSVs
    #[command(after_help = "\
Examples:
  c2t-validate describe results/building_validation.csv
  c2t-validate describe results/roof_validation.csv results/wall_validation.csv --json")]
    Describe {
        /// One or more validation CSVs written by `run --out-dir`
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  c2t-validation ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Run {
            config,
            json,
            output,
            out_dir,
            fail_on_flagged,
        } => validate::cmd_run(config, json, output, out_dir, fail_on_flagged),
        Commands::Check { config } => validate::cmd_check(config),
        Commands::Describe { files, json } => validate::cmd_describe(files, json),
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

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<c2t_validation::ValidationError> for CliError {
    fn from(err: c2t_validation::ValidationError) -> Self {
        Self::new(validation_exit_code(&err), err.to_string())
    }
}
