//! Probetrace CLI Library
//!
//! Command-line surface over the `probetrace` library: instrument the class
//! files of a project, run their tests against the trace recorder, and
//! summarize the resulting trace log.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
pub mod handlers;
pub mod loader;
pub mod logging;
mod output;

pub use commands::{CheckLogArgs, Cli, ColorArg, Commands, InstrumentArgs, OutputMode, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use logging::init_logging;
pub use output::Reporter;
