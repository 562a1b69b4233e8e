//! Deduplicating sink decorator
//!
//! [`DedupSink`] wraps any [`Sink`] and drops records whose message was
//! already forwarded within the retention window. Memory stays bounded two
//! ways: inserting into a full history evicts the entry closest to expiry,
//! and a background sweeper periodically purges stale entries.
//!
//! # Concurrency
//!
//! The duplicate check and the history update happen in one critical
//! section per instance, so concurrent callers emitting the same message
//! forward it once. The lock is released before the wrapped sink is
//! called; sink I/O never blocks other callers' bookkeeping.
//!
//! # Derived sinks
//!
//! [`Sink::with_fields`] and [`Sink::with_group`] build a new decorator
//! around the wrapped sink's own derivative. It keeps the configuration but
//! starts with an empty history and its own sweeper: a message suppressed
//! on the parent is still forwarded by the child, and vice versa.

mod history;
mod sweeper;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use self::history::{Claim, History};
use self::sweeper::Sweeper;
use crate::config::DedupConfig;
use crate::sink::{Field, Level, Record, Sink};
use crate::{Error, Result};

// ── Shared state ──────────────────────────────────────────────────────────────

/// Counters tracked atomically
#[derive(Debug, Default)]
struct DedupStats {
    forwarded: AtomicU64,
    suppressed: AtomicU64,
    evicted: AtomicU64,
    expired: AtomicU64,
}

/// Snapshot of decorator statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DedupStatsSnapshot {
    /// Records passed to the wrapped sink
    pub forwarded: u64,
    /// Records dropped as duplicates
    pub suppressed: u64,
    /// Entries evicted to respect the history cap
    pub evicted: u64,
    /// Entries purged by sweeps after expiring
    pub expired: u64,
    /// Currently tracked messages
    pub tracked: usize,
}

/// History and counters of one decorator instance
#[derive(Debug)]
pub(crate) struct Shared {
    history: Mutex<History>,
    stats: DedupStats,
}

impl Shared {
    fn new(config: &DedupConfig) -> Self {
        Self {
            history: Mutex::new(History::new(config.retention, config.max_history)),
            stats: DedupStats::default(),
        }
    }

    /// Purge expired entries under the history lock
    pub(crate) fn sweep(&self) -> usize {
        let (removed, remaining) = {
            let mut history = self.history.lock();
            let removed = history.purge_expired(Instant::now());
            (removed, history.len())
        };
        if removed > 0 {
            self.stats
                .expired
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!(removed, remaining, "Swept expired dedup history entries");
        }
        removed
    }
}

// ── DedupSink ─────────────────────────────────────────────────────────────────

/// Sink decorator suppressing repeated messages.
///
/// Records more severe than [`DedupConfig::dedup_level`] bypass
/// deduplication entirely and are always forwarded. Errors from the wrapped
/// sink are returned unchanged.
///
/// # Example
///
/// ```
/// use deduplog::{DedupConfig, DedupSink, JsonSink, Level, Record, Sink};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> deduplog::Result<()> {
/// let cancel = CancellationToken::new();
/// let sink = DedupSink::new(JsonSink::new(Vec::new()), DedupConfig::default(), cancel.clone())?;
///
/// sink.handle(&Record::new(Level::Info, "cache warmed")).unwrap();
/// sink.handle(&Record::new(Level::Info, "cache warmed")).unwrap(); // dropped
/// assert_eq!(sink.stats().forwarded, 1);
///
/// cancel.cancel();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DedupSink<S> {
    inner: S,
    config: DedupConfig,
    shared: Arc<Shared>,
    runtime: Handle,
    cancel: CancellationToken,
    sweeper: Sweeper,
}

impl<S: Sink> DedupSink<S> {
    /// Wrap `inner`, starting a sweeper that runs until `cancel` fires or
    /// the decorator is dropped.
    ///
    /// Must be called from within a tokio runtime, which hosts the sweeper.
    pub fn new(inner: S, config: DedupConfig, cancel: CancellationToken) -> Result<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            Error::Runtime(format!("dedup history sweeper needs a tokio runtime: {e}"))
        })?;
        Ok(Self::build(inner, config, runtime, cancel))
    }

    /// Wrap `inner` with the default configuration
    pub fn with_defaults(inner: S, cancel: CancellationToken) -> Result<Self> {
        Self::new(inner, DedupConfig::default(), cancel)
    }

    fn build(inner: S, config: DedupConfig, runtime: Handle, cancel: CancellationToken) -> Self {
        let shared = Arc::new(Shared::new(&config));
        let sweeper = Sweeper::spawn(
            &runtime,
            Arc::downgrade(&shared),
            config.sweep_interval,
            &cancel,
        );
        Self {
            inner,
            config,
            shared,
            runtime,
            cancel,
            sweeper,
        }
    }

    /// Fresh decorator around a derivative of the wrapped sink
    fn derive(&self, inner: S) -> Self {
        Self::build(
            inner,
            self.config.clone(),
            self.runtime.clone(),
            self.cancel.clone(),
        )
    }

    /// Configuration this decorator was built with
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// The wrapped sink
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Number of messages currently tracked
    pub fn history_len(&self) -> usize {
        self.shared.history.lock().len()
    }

    /// Whether the background sweeper is still running
    pub fn is_sweeping(&self) -> bool {
        !self.sweeper.is_finished()
    }

    /// Purge expired entries now, without waiting for the sweeper
    pub fn sweep_now(&self) -> usize {
        self.shared.sweep()
    }

    /// Current statistics
    pub fn stats(&self) -> DedupStatsSnapshot {
        let stats = &self.shared.stats;
        DedupStatsSnapshot {
            forwarded: stats.forwarded.load(Ordering::Relaxed),
            suppressed: stats.suppressed.load(Ordering::Relaxed),
            evicted: stats.evicted.load(Ordering::Relaxed),
            expired: stats.expired.load(Ordering::Relaxed),
            tracked: self.history_len(),
        }
    }

    fn forward(&self, record: &Record) -> std::result::Result<(), S::Error> {
        self.shared.stats.forwarded.fetch_add(1, Ordering::Relaxed);
        self.inner.handle(record)
    }
}

impl<S: Sink> Sink for DedupSink<S> {
    type Error = S::Error;

    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn handle(&self, record: &Record) -> std::result::Result<(), S::Error> {
        if record.level > self.config.dedup_level {
            return self.forward(record);
        }

        let claim = self
            .shared
            .history
            .lock()
            .claim(&record.message, Instant::now());

        match claim {
            Claim::Duplicate => {
                self.shared.stats.suppressed.fetch_add(1, Ordering::Relaxed);
                trace!(level = %record.level, "Suppressed duplicate log record");
                return Ok(());
            }
            Claim::Fresh { evicted: Some(_) } => {
                self.shared.stats.evicted.fetch_add(1, Ordering::Relaxed);
                debug!(
                    max_history = self.config.max_history,
                    "Dedup history full, evicted entry closest to expiry"
                );
            }
            Claim::Fresh { evicted: None } => {}
        }

        self.forward(record)
    }

    fn with_fields(&self, fields: &[Field]) -> Self {
        self.derive(self.inner.with_fields(fields))
    }

    fn with_group(&self, name: &str) -> Self {
        self.derive(self.inner.with_group(name))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
