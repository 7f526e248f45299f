use serde::Deserialize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Dependencies whose logs are capped at `warn`.
const QUIET_TARGETS: [&str; 8] = [
    "hyper",
    "hyper_util",
    "reqwest",
    "h2",
    "rustls",
    "alloy_rpc_client",
    "alloy_transport_http",
    "alloy_provider",
];

/// Format for log output.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable pretty-printed format.
    Pretty,
    /// JSON format for structured logging.
    Json,
    /// Single line per event, without targets.
    #[default]
    Minimal,
}

/// Builds the level filter from `RUST_LOG`, defaulting to `info`, with noisy dependencies
/// capped at `warn`.
fn filter() -> EnvFilter {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    QUIET_TARGETS.iter().fold(filter, |filter, target| {
        match format!("{target}=warn").parse() {
            Ok(directive) => filter.add_directive(directive),
            Err(_) => filter,
        }
    })
}

/// Initializes the logging system.
///
/// Events go to stderr so command output on stdout stays machine readable.
pub fn init_logger(log_format: LogFormat) {
    let base = tracing_subscriber::registry().with(filter());

    match log_format {
        LogFormat::Pretty => base
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr)
                    .with_file(false)
                    .with_target(false)
                    .with_line_number(false)
                    .with_thread_ids(false)
                    .with_thread_names(false),
            )
            .init(),
        LogFormat::Json => base.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Minimal => base
            .with(fmt::layer().compact().with_writer(std::io::stderr).with_target(false))
            .init(),
    }
}
