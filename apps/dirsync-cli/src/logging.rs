//! Structured logging setup using tracing.
//!
//! Logs go to stderr so stdout carries only command output (the run summary).

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` takes precedence; `config.filter` is the fallback directive.
pub fn init_logging(config: &LoggingConfig) {
    let filter_layer = match EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
    {
        Ok(f) => f,
        Err(e) => {
            eprintln!("FATAL: Failed to create log filter: {e}");
            std::process::exit(1);
        }
    };

    let registry = tracing_subscriber::registry().with(filter_layer);

    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .flatten_event(true),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .init(),
    }

    tracing::debug!(filter = %config.filter, "Logging initialized");
}
