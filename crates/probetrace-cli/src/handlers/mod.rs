//! Command handlers, one module per subcommand
//!
//! Each handler returns its result as data so tests can drive it without
//! going through `main`.

pub mod check_log;
pub mod instrument;
pub mod run;

pub use check_log::{execute_check_log, summarize_log, LogSummary};
pub use instrument::{execute_instrument, instrument_module};
pub use run::{class_dirs, execute_run};

use crate::config::CliConfig;
use crate::output::Reporter;

pub(crate) fn reporter_for(config: &CliConfig) -> Reporter {
    Reporter::new(config.color.should_color(), config.verbosity.is_quiet())
}
