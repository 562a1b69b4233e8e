//! JSON lines sink

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Map, Value};

use super::scope::Scope;
use super::{Field, Level, Record, Sink};

/// Writes each record as a single JSON object followed by a newline.
///
/// Output shape: `{"level":"INFO","msg":"...", <fixed fields>, <record fields>}`.
/// Derived sinks share the same writer.
pub struct JsonSink<W> {
    writer: Arc<Mutex<W>>,
    min_level: Level,
    scope: Scope,
}

impl<W: Write + Send> JsonSink<W> {
    /// Create a sink writing records at `Info` and above
    pub fn new(writer: W) -> Self {
        Self::with_level(writer, Level::Info)
    }

    /// Create a sink writing records at `min_level` and above
    pub fn with_level(writer: W, min_level: Level) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            min_level,
            scope: Scope::default(),
        }
    }

    /// Shared handle to the underlying writer
    pub fn writer(&self) -> Arc<Mutex<W>> {
        Arc::clone(&self.writer)
    }

    fn encode(&self, record: &Record) -> io::Result<Vec<u8>> {
        let mut object = Map::new();
        object.insert("level".to_string(), Value::from(record.level.as_str()));
        object.insert("msg".to_string(), Value::from(record.message.as_str()));
        for (key, value) in self.scope.render(record) {
            object.insert(key, value);
        }
        let mut line = serde_json::to_vec(&Value::Object(object))?;
        line.push(b'\n');
        Ok(line)
    }
}

impl<W: Write + Send> Sink for JsonSink<W> {
    type Error = io::Error;

    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    fn handle(&self, record: &Record) -> io::Result<()> {
        let line = self.encode(record)?;
        let mut writer = self.writer.lock();
        writer.write_all(&line)?;
        writer.flush()
    }

    fn with_fields(&self, fields: &[Field]) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            min_level: self.min_level,
            scope: self.scope.with_fields(fields),
        }
    }

    fn with_group(&self, name: &str) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            min_level: self.min_level,
            scope: self.scope.with_group(name),
        }
    }
}
