//! deduplog Library
//!
//! A deduplicating decorator for structured log sinks: repeated messages are
//! dropped for a configurable retention window while the memory spent on
//! remembering them stays bounded.
//!
//! # Features
//!
//! - **Retention window**: a message seen within the window is suppressed
//! - **Bounded history**: a full history evicts the entry closest to expiry
//! - **Background sweeper**: expired entries are purged periodically
//! - **Severity bypass**: records above the dedup level always pass through
//! - **Isolated derivatives**: `with_fields` / `with_group` start a fresh history

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod dedup;
pub mod error;
pub mod sink;

pub use config::DedupConfig;
pub use dedup::{DedupSink, DedupStatsSnapshot};
pub use error::{Error, Result};
pub use sink::{Field, JsonSink, Level, Record, Sink, TracingSink};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
///
/// `RUST_LOG` overrides `level` when set. `format` of `Some("json")` selects
/// JSON output; anything else uses the human-readable formatter.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber.with(fmt::layer().json()).try_init(),
        _ => subscriber.with(fmt::layer()).try_init(),
    };

    installed.map_err(|e| Error::Config(format!("tracing already initialized: {e}")))
}
