//! Logging setup for the binaries, powered by tracing-subscriber
//!
//! The library only emits `tracing` events; the binaries install the
//! subscriber, so applications embedding the crate keep their own.

use tracing_subscriber::EnvFilter;

/// Map the number of `-v` flags to a default level
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Build the filter from `RUST_LOG`, falling back to the verbosity level
fn build_env_filter(verbosity: u8) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    // Keep HTTP client internals quiet unless asked for explicitly
    let directives = format!(
        "{},hyper=warn,reqwest=warn",
        level_for_verbosity(verbosity)
    );
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", directives, e))
}

/// Install a stderr `fmt` subscriber
pub fn init_logging(verbosity: u8) -> anyhow::Result<()> {
    let filter = build_env_filter(verbosity)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}
