//! Tracing setup (SPEC_FULL §9.2), a deliberately small cousin of the
//! teacher's `graph::logging::{init_logger, LoggingArgs}`: env-filter driven,
//! ANSI on for terminals, ISO-8601 timestamps. No OTLP exporter — this
//! workspace only carries `tracing`/`tracing-subscriber`, not the
//! OpenTelemetry stack the teacher's webserver binary needs.

use std::io::IsTerminal as _;

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// `--log-level`/`RUST_LOG`-driven logging configuration.
#[derive(Debug, Clone, clap::Args)]
pub struct LoggingArgs {
    /// Log level filter, e.g. `info`, `replicator=debug`. Falls back to
    /// `RUST_LOG`, then to `info`.
    #[clap(long, global = true)]
    pub log_level: Option<String>,
}

/// Initializes the global `tracing` subscriber. Idempotent within a process —
/// the CLI calls this exactly once, from `main`.
pub fn init_logger(args: &LoggingArgs) {
    let filter = args.log_level.clone().map_or_else(
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        EnvFilter::new,
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .init();
}
