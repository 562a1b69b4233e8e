//! Recently seen messages with their expiry instants

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Upper bound on slots reserved up front; larger histories grow on demand
const PREALLOCATED_ENTRIES: usize = 4096;

/// Expiry horizon used when `now + retention` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Outcome of claiming a message
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Claim {
    /// Seen within the retention window; the entry was left untouched.
    Duplicate,
    /// Not seen (or stale); the entry now expires one retention from now.
    Fresh {
        /// Message dropped to make room, if the table was full
        evicted: Option<String>,
    },
}

/// Message text mapped to the instant it stops suppressing repeats.
///
/// `live` is maintained alongside the map and must always equal its length.
#[derive(Debug)]
pub(crate) struct History {
    entries: HashMap<String, Instant>,
    live: usize,
    retention: Duration,
    capacity: usize,
}

impl History {
    pub(crate) fn new(retention: Duration, capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity.min(PREALLOCATED_ENTRIES)),
            live: 0,
            retention,
            capacity,
        }
    }

    /// Number of tracked messages, including stale ones not yet swept
    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// A present entry whose expiry has passed counts as absent.
    fn is_live(&self, message: &str, now: Instant) -> bool {
        self.entries.get(message).is_some_and(|expiry| now <= *expiry)
    }

    /// Check `message` and, unless it is a live duplicate, (re)arm its entry.
    ///
    /// A hit never refreshes the expiry, so a message repeating faster than
    /// the retention period is still re-emitted once per period.
    pub(crate) fn claim(&mut self, message: &str, now: Instant) -> Claim {
        if self.is_live(message, now) {
            return Claim::Duplicate;
        }

        let expiry = expiry_after(now, self.retention);
        if let Some(slot) = self.entries.get_mut(message) {
            *slot = expiry;
            return Claim::Fresh { evicted: None };
        }

        let evicted = (self.live >= self.capacity).then(|| self.evict_oldest());
        self.entries.insert(message.to_owned(), expiry);
        self.live += 1;
        Claim::Fresh { evicted }
    }

    /// Remove the entry with the earliest expiry. Ties are broken arbitrarily.
    ///
    /// # Panics
    ///
    /// Panics when the table is empty: reaching here with nothing to evict
    /// means the live count has drifted from the map.
    fn evict_oldest(&mut self) -> String {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, expiry)| **expiry)
            .map(|(message, _)| message.clone());

        let Some(message) = oldest else {
            panic!(
                "history eviction requested on an empty table (live count {})",
                self.live
            );
        };

        self.entries.remove(&message);
        self.live -= 1;
        message
    }

    /// Drop every entry whose expiry has passed; returns how many were removed.
    pub(crate) fn purge_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expiry| now <= *expiry);
        let removed = before - self.entries.len();
        self.live -= removed;
        self.assert_consistent();
        removed
    }

    fn assert_consistent(&self) {
        assert_eq!(
            self.live,
            self.entries.len(),
            "history live count desynchronized from tracked messages"
        );
    }
}

/// `now + retention`, saturating to a far-future instant on overflow
pub(crate) fn expiry_after(now: Instant, retention: Duration) -> Instant {
    now.checked_add(retention)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}
