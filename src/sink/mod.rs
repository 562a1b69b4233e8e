//! Structured log sinks
//!
//! A [`Sink`] accepts [`Record`]s and reports whether it is enabled for a
//! given [`Level`]. Sinks can be contextualized with fixed fields or scoped
//! to a named group; each such operation yields a new sink.
//!
//! Two concrete sinks ship with the crate:
//!
//! - [`JsonSink`]: one JSON object per record, written to any [`std::io::Write`]
//! - [`TracingSink`]: forwards records as `tracing` events

mod json;
mod scope;
mod trace;

pub use self::json::JsonSink;
pub use self::trace::TracingSink;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;

// ── Level ─────────────────────────────────────────────────────────────────────

/// Record severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Very verbose diagnostics
    Trace,
    /// Debugging information
    Debug,
    /// Informational messages
    Info,
    /// Something unexpected but recoverable
    Warn,
    /// Failures
    Error,
}

impl Level {
    /// Upper-case name as rendered in log output
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(Error::config(format!("Unknown log level: {other}"))),
        }
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// A single structured key/value pair
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Field name
    pub key: String,
    /// Field value
    pub value: Value,
}

impl Field {
    /// Create a field from anything convertible to a JSON value
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A log record as handed to a [`Sink`]
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Severity
    pub level: Level,
    /// Message text
    pub message: String,
    /// Per-record fields
    pub fields: Vec<Field>,
}

impl Record {
    /// Create a record without fields
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Attach a field
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push(Field::new(key, value));
        self
    }
}

// ── Sink ──────────────────────────────────────────────────────────────────────

/// Capability accepting structured records.
///
/// `with_fields` and `with_group` return a new, independent sink; the
/// receiver is left untouched.
pub trait Sink: Send + Sync {
    /// Error produced when a record cannot be written
    type Error;

    /// Whether records at `level` would be written
    fn enabled(&self, level: Level) -> bool;

    /// Write a record
    fn handle(&self, record: &Record) -> Result<(), Self::Error>;

    /// Derive a sink that adds `fields` to every record
    #[must_use]
    fn with_fields(&self, fields: &[Field]) -> Self
    where
        Self: Sized;

    /// Derive a sink that nests subsequent fields under `name`
    #[must_use]
    fn with_group(&self, name: &str) -> Self
    where
        Self: Sized;
}
