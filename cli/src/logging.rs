//! Logging initialization. stdout is reserved for the report, so logs never go there.
//!
//! - **RUST_LOG**: filter, e.g. `info`, `delve=debug`. Default: `info`.
//! - **LOG_FILE**: when set, logs are appended to this file (plain text, no ANSI).
//! - `--verbose`: without `LOG_FILE`, logs go to stderr.
//!
//! Otherwise logs are dropped.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::log_format::TextWithRunId;

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper_util=off"))
}

pub fn init(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(path) = std::env::var("LOG_FILE") {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        let file_layer = tracing_subscriber::fmt::layer()
            .event_format(TextWithRunId::new())
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_filter(filter());
        tracing_subscriber::registry().with(file_layer).try_init()?;
        tracing::info!(path = %path, "delve logging to file");
    } else if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .event_format(TextWithRunId::new())
            .with_writer(std::io::stderr)
            .with_filter(filter());
        tracing_subscriber::registry().with(stderr_layer).try_init()?;
    } else {
        let sink_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::sink)
            .with_filter(filter());
        tracing_subscriber::registry().with(sink_layer).try_init()?;
    }
    Ok(())
}
