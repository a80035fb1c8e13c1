//! Process-wide snapshot of the source feed with a freshness window.
//!
//! Sessions only read the snapshot. `invalidate()` (the refresh action) forces
//! the next read to fetch again. A failed fetch leaves the previous snapshot
//! in place.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::error::DashboardError;
use crate::types::Dataset;

#[derive(Debug)]
struct CacheEntry {
    dataset: Arc<Dataset>,
    fetched_at: Instant,
    /// Set by `invalidate()`; the entry is kept but never served as fresh.
    stale: bool,
}

#[derive(Debug)]
pub struct FeedCache {
    slot: Mutex<Option<CacheEntry>>,
    ttl: Duration,
}

impl FeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Return the cached snapshot if fresh, otherwise run `load` and cache it.
    ///
    /// The slot stays locked during `load` so concurrent readers wait for one
    /// fetch instead of starting their own.
    pub fn get_or_load<F>(&self, load: F) -> Result<Arc<Dataset>, DashboardError>
    where
        F: FnOnce() -> Result<Dataset, DashboardError>,
    {
        let mut guard = self.slot.lock();
        if let Some(entry) = guard.as_ref() {
            if !entry.stale && entry.fetched_at.elapsed() < self.ttl {
                log::debug!("Feed cache hit (age {}s)", entry.fetched_at.elapsed().as_secs());
                return Ok(entry.dataset.clone());
            }
        }

        log::debug!("Feed cache miss, fetching");
        let dataset = Arc::new(load()?);
        *guard = Some(CacheEntry {
            dataset: dataset.clone(),
            fetched_at: Instant::now(),
            stale: false,
        });
        Ok(dataset)
    }

    /// Mark the current snapshot stale so the next read fetches again.
    ///
    /// The snapshot itself stays until a fetch replaces it.
    pub fn invalidate(&self) {
        if let Some(entry) = self.slot.lock().as_mut() {
            entry.stale = true;
            log::info!("Feed cache invalidated");
        }
    }

    /// Age of the current snapshot, if any.
    pub fn age(&self) -> Option<Duration> {
        self.slot.lock().as_ref().map(|e| e.fetched_at.elapsed())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::types::Schema;

    fn dataset(rows: usize) -> Dataset {
        Dataset {
            headers: vec!["a".to_string()],
            schema: Schema::default(),
            records: vec![Default::default(); rows],
            dropped_rows: 0,
        }
    }

    #[test]
    fn test_fresh_snapshot_is_reused() {
        let cache = FeedCache::new(Duration::from_secs(600));
        let calls = Cell::new(0);
        for _ in 0..3 {
            let ds = cache
                .get_or_load(|| {
                    calls.set(calls.get() + 1);
                    Ok(dataset(2))
                })
                .unwrap();
            assert_eq!(ds.records.len(), 2);
        }
        assert_eq!(calls.get(), 1);
        assert!(cache.age().is_some());
    }

    #[test]
    fn test_invalidate_forces_refetch() {
        let cache = FeedCache::new(Duration::from_secs(600));
        cache.get_or_load(|| Ok(dataset(1))).unwrap();
        cache.invalidate();
        assert!(cache.age().is_some());
        let ds = cache.get_or_load(|| Ok(dataset(5))).unwrap();
        assert_eq!(ds.records.len(), 5);
        // Fresh again after the refetch.
        let ds = cache.get_or_load(|| Ok(dataset(9))).unwrap();
        assert_eq!(ds.records.len(), 5);
    }

    #[test]
    fn test_failed_refresh_keeps_snapshot_stale() {
        let cache = FeedCache::new(Duration::from_secs(600));
        cache.get_or_load(|| Ok(dataset(2))).unwrap();
        cache.invalidate();
        assert!(cache
            .get_or_load(|| Err(DashboardError::Fetch("timeout".into())))
            .is_err());
        assert!(cache.age().is_some());

        // Still stale, so the next read tries again.
        let ds = cache.get_or_load(|| Ok(dataset(7))).unwrap();
        assert_eq!(ds.records.len(), 7);
    }

    #[test]
    fn test_expired_snapshot_refetches() {
        let cache = FeedCache::new(Duration::ZERO);
        cache.get_or_load(|| Ok(dataset(1))).unwrap();
        let ds = cache.get_or_load(|| Ok(dataset(3))).unwrap();
        assert_eq!(ds.records.len(), 3);
    }

    #[test]
    fn test_failed_fetch_keeps_previous_snapshot() {
        let cache = FeedCache::new(Duration::ZERO);
        let first = cache.get_or_load(|| Ok(dataset(4))).unwrap();
        let err = cache
            .get_or_load(|| Err(DashboardError::Fetch("timeout".into())))
            .unwrap_err();
        assert!(matches!(err, DashboardError::Fetch(_)));
        assert!(cache.age().is_some());
        assert_eq!(first.records.len(), 4);
    }
}
