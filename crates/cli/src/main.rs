//! llama - run work on remote compute, sharing data through an object store
//!
//! Parses the global flags, installs logging, and hands the rest of the
//! command line to the command dispatcher.

use clap::{CommandFactory, FromArgMatches};
use tracing::Instrument;

use llama_cli::commands::{self, Cli};
use llama_cli::exit_code::ExitCode;
use llama_cli::logging;
use llama_cli::output::Formatter;

#[tokio::main]
async fn main() {
    let exit_code = run().await;
    std::process::exit(exit_code.as_i32());
}

async fn run() -> ExitCode {
    let dispatcher = match commands::registry() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            Formatter::default().error(&e.to_string());
            return ExitCode::GeneralError;
        }
    };

    let matches = Cli::command().after_help(dispatcher.usage()).get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());
    let formatter = Formatter::new(cli.output_config());

    let trace = match logging::init(cli.debug, cli.debug_aws, cli.trace.as_deref()) {
        Ok(trace) => trace,
        Err(e) => {
            formatter.error(&e.to_string());
            return ExitCode::GeneralError;
        }
    };

    let exit_code = commands::execute(cli, &dispatcher)
        .instrument(tracing::info_span!("llama"))
        .await;

    if let Some(trace) = trace {
        if let Err(e) = trace.close() {
            formatter.error(&format!("Failed to close trace {}: {e}", trace.path().display()));
            if exit_code == ExitCode::Success {
                return ExitCode::GeneralError;
            }
        }
    }

    exit_code
}
