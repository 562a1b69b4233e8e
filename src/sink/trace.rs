//! Sink forwarding records to the `tracing` ecosystem

use std::convert::Infallible;

use serde_json::Value;

use super::scope::Scope;
use super::{Field, Level, Record, Sink};

/// Emits every record as a `tracing` event with target `deduplog`.
///
/// Fixed and per-record fields are rendered as one JSON object in the
/// `fields` attribute; records without fields omit it.
#[derive(Debug, Clone, Default)]
pub struct TracingSink {
    scope: Scope,
}

impl TracingSink {
    /// Create a sink with no fixed fields
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

macro_rules! emit {
    ($lvl:expr, $fields:expr, $msg:expr) => {
        match $fields {
            Some(fields) => tracing::event!(target: "deduplog", $lvl, fields = %fields, "{}", $msg),
            None => tracing::event!(target: "deduplog", $lvl, "{}", $msg),
        }
    };
}

impl Sink for TracingSink {
    type Error = Infallible;

    fn enabled(&self, level: Level) -> bool {
        match level {
            Level::Trace => tracing::enabled!(target: "deduplog", tracing::Level::TRACE),
            Level::Debug => tracing::enabled!(target: "deduplog", tracing::Level::DEBUG),
            Level::Info => tracing::enabled!(target: "deduplog", tracing::Level::INFO),
            Level::Warn => tracing::enabled!(target: "deduplog", tracing::Level::WARN),
            Level::Error => tracing::enabled!(target: "deduplog", tracing::Level::ERROR),
        }
    }

    fn handle(&self, record: &Record) -> Result<(), Infallible> {
        let rendered = self.scope.render(record);
        let fields = (!rendered.is_empty()).then(|| Value::Object(rendered));
        let msg = record.message.as_str();
        match record.level {
            Level::Trace => emit!(tracing::Level::TRACE, fields, msg),
            Level::Debug => emit!(tracing::Level::DEBUG, fields, msg),
            Level::Info => emit!(tracing::Level::INFO, fields, msg),
            Level::Warn => emit!(tracing::Level::WARN, fields, msg),
            Level::Error => emit!(tracing::Level::ERROR, fields, msg),
        }
        Ok(())
    }

    fn with_fields(&self, fields: &[Field]) -> Self {
        Self {
            scope: self.scope.with_fields(fields),
        }
    }

    fn with_group(&self, name: &str) -> Self {
        Self {
            scope: self.scope.with_group(name),
        }
    }
}
