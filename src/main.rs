//! # Rika CLI (`rika`)
//!
//! Extracts text, metadata and language from documents and URLs.
//!
//! ## Usage
//!
//! ```bash
//! rika [options] <file, glob or url> [...]
//! ```
//!
//! ## Examples
//!
//! ```bash
//! # Metadata (pretty-printed) and text of one document
//! rika report.pdf
//!
//! # Every Word document under docs/, as one pretty JSON array
//! rika -f J -a 'docs/**/*.docx'
//!
//! # Metadata only, as YAML; text extraction is skipped entirely
//! rika -f y -t- https://example.com/paper.pdf
//!
//! # Persistent defaults
//! export RIKA_OPTIONS='-f J --no-source'
//! ```
//!
//! ## Exit codes
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | Success, or no valid targets |
//! | 1 | At least one target could not be processed |
//! | 2 | Invalid options |
//!
//! Logging goes to stderr and is off except for errors; set `RIKA_LOG`
//! (or `RUST_LOG`), e.g. `RIKA_LOG=debug`, to see more.

use anyhow::Context;
use clap::CommandFactory;
use std::io::Write;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use rika::config::{self, Cli, CliError, OPTIONS_ENV};
use rika::engine::{ExtractionEngine, NativeEngine};
use rika::run::Runner;

/// Exit code for invalid options; matches clap's usage-error code.
const CONFIG_ERROR_EXIT: u8 = 2;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("RIKA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("error"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn versions_string() -> String {
    format!(
        "Versions: Rika: {}, Engine: {}",
        env!("CARGO_PKG_VERSION"),
        NativeEngine.name()
    )
}

fn config_error(message: &dyn std::fmt::Display) -> ExitCode {
    eprintln!("{}\n", message);
    eprintln!("{}", Cli::command().render_help());
    ExitCode::from(CONFIG_ERROR_EXIT)
}

fn main() -> ExitCode {
    init_tracing();

    let env_options = std::env::var(OPTIONS_ENV).ok();
    let cli = match config::parse_args(std::env::args().collect(), env_options.as_deref()) {
        Ok(cli) => cli,
        Err(CliError::Usage(e)) => e.exit(),
        Err(CliError::Config(e)) => return config_error(&e),
    };
    if cli.version {
        println!("{}", versions_string());
        return ExitCode::SUCCESS;
    }
    let cfg = match config::load_config(cli, atty::is(atty::Stream::Stdout)) {
        Ok(cfg) => cfg,
        Err(e) => return config_error(&e),
    };

    match run(cfg) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cfg: config::Config) -> anyhow::Result<u8> {
    let runner = Runner::new(cfg.run, cfg.http_timeout);
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let report = runner.run(&cfg.targets, &mut out)?;
    out.flush().context("flushing standard output")?;

    let stderr = std::io::stderr();
    report
        .write_summary(&mut stderr.lock())
        .context("writing issue summary")?;

    Ok(report.exit_code())
}
