//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Probetrace: instrument IR class files for fault-localization traces
#[derive(Parser, Debug)]
#[command(name = "probetrace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, value_enum, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Instrument the product and test classes of a project
    Instrument(InstrumentArgs),

    /// Run the test methods of instrumented classes and write the trace log
    Run(RunArgs),

    /// Count the records of a trace log by event kind
    CheckLog(CheckLogArgs),
}

/// Arguments for the instrument command
#[derive(Parser, Debug)]
pub struct InstrumentArgs {
    /// Project root; modules are subdirectories holding `src/` and `target/`
    pub project: PathBuf,

    /// Line selection file (`path/File:N[,N|N-M]*` per line)
    #[arg(long)]
    pub lines: PathBuf,

    /// Field selection file (`Class.field` per line)
    #[arg(long)]
    pub fields: PathBuf,

    /// Output form of instrumented classes
    #[arg(long, value_enum, default_value = "text")]
    pub mode: OutputMode,

    /// Instrumentation settings (JSON)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the instrumentation report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Module directories or directories of class files
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Trace log, appended to
    #[arg(long, default_value = probetrace::DEFAULT_LOG_PATH)]
    pub log: PathBuf,

    /// Batched records that trigger a flush
    #[arg(long, default_value_t = probetrace::DEFAULT_FLUSH_THRESHOLD)]
    pub flush_threshold: usize,

    /// Instrumentation settings (JSON), for the test naming rules
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Instruction budget per test
    #[arg(long, default_value_t = probetrace::interp::DEFAULT_STEP_LIMIT)]
    pub step_limit: usize,
}

/// Arguments for the check-log command
#[derive(Parser, Debug)]
pub struct CheckLogArgs {
    /// Trace log to read
    pub file: PathBuf,

    /// Print counts as JSON
    #[arg(long)]
    pub json: bool,
}

/// Output form of instrumented classes
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Textual IR in `ir-out/` and `ir-test-out/`
    #[default]
    Text,
    /// JSON IR in `instrumented-classes/` and `instrumented-test-classes/`
    Binary,
}

impl OutputMode {
    /// Output directories for product and test classes
    #[must_use]
    pub const fn dirs(self) -> (&'static str, &'static str) {
        match self {
            Self::Text => ("ir-out", "ir-test-out"),
            Self::Binary => ("instrumented-classes", "instrumented-test-classes"),
        }
    }

    /// File extension of written classes
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "ir",
            Self::Binary => "json",
        }
    }
}

/// Color argument
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
