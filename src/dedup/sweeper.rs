//! Periodic purge of expired history entries

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::Shared;
use super::history::expiry_after;

/// Owned handle to one decorator's sweeper task.
///
/// The task stops when the caller's token fires, when this handle is
/// dropped, or when the history it serves is gone.
#[derive(Debug)]
pub(crate) struct Sweeper {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl Sweeper {
    pub(crate) fn spawn(
        runtime: &Handle,
        shared: Weak<Shared>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let token = parent.child_token();
        let stop = token.clone();

        let task = runtime.spawn(async move {
            let start = expiry_after(Instant::now(), interval);
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = stop.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.sweep();
            }
            debug!("History sweeper stopped");
        });

        Self { token, task }
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::DedupConfig;

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_ends_task() {
        // GIVEN: a running sweeper holding a weak reference to its history
        // WHEN: the owning handle is dropped
        // THEN: the task exits and releases that reference; the parent token is untouched
        let shared = Arc::new(Shared::new(&DedupConfig::default()));
        let parent = CancellationToken::new();
        let sweeper = Sweeper::spawn(
            &Handle::current(),
            Arc::downgrade(&shared),
            Duration::from_secs(5),
            &parent,
        );
        tokio::task::yield_now().await;
        assert_eq!(Arc::weak_count(&shared), 1);
        assert!(!sweeper.is_finished());

        drop(sweeper);
        tokio::time::sleep(Duration::from_millis(1)).await;
        tokio::task::yield_now().await;

        assert_eq!(Arc::weak_count(&shared), 0);
        assert!(!parent.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_interval_does_not_panic() {
        let shared = Arc::new(Shared::new(&DedupConfig::default()));
        let sweeper = Sweeper::spawn(
            &Handle::current(),
            Arc::downgrade(&shared),
            Duration::MAX,
            &CancellationToken::new(),
        );
        tokio::task::yield_now().await;
        assert!(!sweeper.is_finished());
    }
}
