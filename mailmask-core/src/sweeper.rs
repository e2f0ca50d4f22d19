// mailmask-core/src/sweeper.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mask_store::{MappingStore, StoreError};
use tokio::sync::watch;

/// Mappings retired per page while draining the expirable set.
const SWEEP_PAGE_SIZE: u32 = 256;

/// Background pass that retires mappings past their expiry.
///
/// The sweep is bookkeeping, not enforcement: forwarding checks the expiry
/// timestamp itself, so nothing leaks between sweeps. That makes it safe to
/// run the sweep late, twice, or from a cold start after a crash.
pub struct Sweeper {
    store: Arc<dyn MappingStore>,
    interval: Duration,
}

impl Sweeper {
    pub fn new(store: Arc<dyn MappingStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// One full sweep at `now`. Drains the expirable set page by page,
    /// flipping each mapping to Expired; returns how many were flipped.
    /// Flipped mappings leave the set, so a rerun after an interrupted
    /// sweep simply picks up the remainder.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut swept = 0u64;
        loop {
            let page = self.store.list_expirable(now, SWEEP_PAGE_SIZE).await?;
            if page.is_empty() {
                break;
            }
            for mapping in &page {
                match self.store.expire(&mapping.masked_address).await {
                    Ok(()) => swept += 1,
                    // Lost a race with a forward-time expire; already done.
                    Err(StoreError::NotFound) => {}
                    Err(err) => return Err(err),
                }
            }
        }
        if swept > 0 {
            tracing::info!(swept, "expiry sweep retired mappings");
        }
        Ok(swept)
    }

    /// Sweep on a fixed cadence until `shutdown` signals. The first pass
    /// runs immediately, which clears any backlog accrued while the
    /// service was down.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.sweep_once(Utc::now()).await {
                        tracing::warn!(error = %err, "expiry sweep failed, retrying next tick");
                    }
                }
                _ = shutdown.changed() => {
                    tracing::debug!("sweeper stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use mask_store::{MappingStatus, MemoryStore, Plan};

    async fn store_with_backlog(expired: usize, live: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        for i in 0..expired {
            store
                .create(
                    &format!("old{i}@mask.test"),
                    "real@example.com",
                    Plan::Free,
                    now - ChronoDuration::hours(25),
                )
                .await
                .unwrap();
        }
        for i in 0..live {
            store
                .create(
                    &format!("live{i}@mask.test"),
                    "real@example.com",
                    Plan::Premium,
                    now,
                )
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_sweep_retires_only_due_mappings() {
        let store = store_with_backlog(3, 2).await;
        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));

        let swept = sweeper.sweep_once(Utc::now()).await.unwrap();
        assert_eq!(swept, 3);

        for i in 0..3 {
            let mapping = store
                .lookup(&format!("old{i}@mask.test"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(mapping.status, MappingStatus::Expired);
        }
        for i in 0..2 {
            let mapping = store
                .lookup(&format!("live{i}@mask.test"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(mapping.status, MappingStatus::Active);
        }
    }

    #[tokio::test]
    async fn test_sweep_twice_is_idempotent() {
        let store = store_with_backlog(2, 0).await;
        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));

        assert_eq!(sweeper.sweep_once(Utc::now()).await.unwrap(), 2);
        assert_eq!(sweeper.sweep_once(Utc::now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_interrupted_sweep_resumes_cleanly() {
        let store = store_with_backlog(4, 0).await;

        // Half the backlog was already flipped before the "crash".
        store.expire("old0@mask.test").await.unwrap();
        store.expire("old1@mask.test").await.unwrap();

        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));
        let swept = sweeper.sweep_once(Utc::now()).await.unwrap();
        assert_eq!(swept, 2);

        for i in 0..4 {
            let mapping = store
                .lookup(&format!("old{i}@mask.test"))
                .await
                .unwrap()
                .unwrap();
            assert_eq!(mapping.status, MappingStatus::Expired);
        }
    }

    #[tokio::test]
    async fn test_sweep_drains_past_one_page() {
        let count = (SWEEP_PAGE_SIZE + 50) as usize;
        let store = store_with_backlog(count, 0).await;
        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));

        let swept = sweeper.sweep_once(Utc::now()).await.unwrap();
        assert_eq!(swept, count as u64);
        assert!(sweeper.sweep_once(Utc::now()).await.unwrap() == 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_sweeps_at_startup_and_stops_on_signal() {
        let store = store_with_backlog(2, 1).await;
        let sweeper = Sweeper::new(store.clone(), Duration::from_secs(60));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(sweeper.run(rx));

        // First tick fires immediately; give the task a chance to run it.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let mapping = store.lookup("old0@mask.test").await.unwrap().unwrap();
        assert_eq!(mapping.status, MappingStatus::Expired);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
