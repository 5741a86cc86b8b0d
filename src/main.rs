//! hotwire - restart a program whenever a file it loaded changes.

use std::process::ExitCode;

use clap::error::ErrorKind;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use hotwire::cli::{Cli, CliError};
use hotwire::display;
use hotwire::supervisor::{spawn_signal_listener, Supervisor};

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::parse_args(std::env::args()) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    init_tracing(cli.verbose);

    let working_dir = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            display::print_error(&format!("Cannot determine working directory: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let config = match cli
        .config_loader()
        .load()
        .map_err(CliError::from)
        .and_then(|file| cli.resolve(&file, working_dir))
    {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let cancel = CancellationToken::new();
    let listener = match spawn_signal_listener(cancel.clone()) {
        Ok(handle) => handle,
        Err(e) => {
            display::print_error(&format!("Cannot install signal handlers: {e}"));
            return ExitCode::FAILURE;
        }
    };

    let mut supervisor = Supervisor::new(config, cancel.clone());
    let result = supervisor.run().await;

    // Let the listener task finish
    cancel.cancel();
    let _ = listener.await;

    match result {
        Ok(outcome) => {
            tracing::debug!(
                generations = outcome.stats.generations,
                restarts = outcome.stats.restarts,
                "Supervisor finished"
            );
            ExitCode::from(u8::try_from(outcome.exit_code & 0xff).unwrap_or(1))
        }
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
