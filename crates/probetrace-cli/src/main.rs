//! Probetrace CLI: instrument IR class files and collect execution traces
//!
//! ## Usage
//!
//! ```bash
//! probetrace instrument project/ --lines lines.txt --fields fields.txt --mode binary
//! probetrace run project/ --log coverage.log
//! probetrace check-log coverage.log
//! ```

use clap::Parser;
use probetrace_cli::{
    handlers::{execute_check_log, execute_instrument, execute_run},
    init_logging, Cli, CliConfig, CliResult, ColorChoice, Commands, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(config.verbosity);

    match cli.command {
        Commands::Instrument(args) => execute_instrument(&config, &args).map(|_| ()),
        Commands::Run(args) => execute_run(&config, &args).map(|_| ()),
        Commands::CheckLog(args) => execute_check_log(&config, &args).map(|_| ()),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.quiet, cli.verbose))
        .with_color(ColorChoice::from(cli.color))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_build_config_from_flags() {
        let cli = Cli::try_parse_from(["probetrace", "-q", "--color", "always", "check-log", "x"])
            .unwrap();
        let config = build_config(&cli);
        assert_eq!(config.verbosity, Verbosity::Quiet);
        assert_eq!(config.color, ColorChoice::Always);
    }
}
