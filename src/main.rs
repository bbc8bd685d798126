use clap::Parser;
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keyval::platform::{is_broken_pipe_error, open_output, ExitCode, SignalHandler};
use keyval::readers::MultiFileReader;
use keyval::{run_pipeline, AppConfig, Cli, ConfigError};

/// Diagnostics go to stderr so stdout stays pure JSON lines
fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keyval=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal()),
        )
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli);

    // Keep the handler alive for the whole run
    let _signal_handler = match SignalHandler::new() {
        Ok(handler) => Some(handler),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install signal handlers");
            None
        }
    };

    let files = if config.files.is_empty() {
        vec!["-".to_string()]
    } else {
        config.files.clone()
    };
    let reader = MultiFileReader::new(files);

    let output = match open_output(config.output_file.as_deref()) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("keyval: {:#}", e);
            ExitCode::GeneralError.exit();
        }
    };

    match run_pipeline(&config, reader, output) {
        Ok(result) => {
            if config.stats {
                eprintln!("{}", result.stats.format_stats());
            }
            if result.interrupted() {
                SignalHandler::exit_code()
                    .unwrap_or(ExitCode::SignalInt)
                    .exit();
            }
            ExitCode::Success.exit();
        }
        // Downstream closed the pipe; exit quietly like other Unix filters
        Err(e) if is_broken_pipe_error(&e) => ExitCode::SignalPipe.exit(),
        Err(e) if e.downcast_ref::<ConfigError>().is_some() => {
            eprintln!("keyval: {:#}", e);
            ExitCode::InvalidUsage.exit();
        }
        Err(e) => {
            eprintln!("keyval: {:#}", e);
            ExitCode::GeneralError.exit();
        }
    }
}
