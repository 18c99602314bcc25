//! Strobe CLI: lists and runs verification scenarios.
//!
//! `strobe list` prints the scenario registry. `strobe run <scenario>` loads
//! `strobe.toml` (or the file given with `--config`), applies command-line
//! overrides, runs the scenario and prints its report.

#![warn(missing_docs)]

mod list;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use strobe_config::FifoMode;
use tracing_subscriber::EnvFilter;

/// Strobe: stream, reset and SPI verification harness.
#[derive(Parser, Debug)]
#[command(name = "strobe", version, about = "Strobe verification harness")]
pub struct Cli {
    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug-level logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a `strobe.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every scenario.
    List,
    /// Run one scenario.
    Run(RunArgs),
}

/// Arguments for `strobe run`.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Scenario name, as printed by `strobe list`.
    pub scenario: String,

    /// FIFO wiring, overriding `fifo.mode`.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// Seed, overriding `harness.seed`.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a VCD waveform of the run to this path.
    #[arg(long)]
    pub waveform: Option<PathBuf>,

    /// Report format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// FIFO wiring selected on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Independent clocks and resets.
    #[value(alias = "afifo")]
    Async,
    /// One shared clock and reset.
    #[value(alias = "sfifo")]
    Sync,
}

impl From<ModeArg> for FifoMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Async => FifoMode::Async,
            ModeArg::Sync => FifoMode::Sync,
        }
    }
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One human-readable line.
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        config: cli.config,
    };

    let result = match cli.command {
        Command::List => list::run(),
        Command::Run(ref args) => run::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
