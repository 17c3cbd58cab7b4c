//! In-process load cache: the only shared mutable state in the process.
//!
//! Keyed by the closed [`ResourceKind`] enum rather than a string, so a
//! lookup for a resource that was never written is a type-level
//! impossibility rather than a runtime `CACHE_TYPE_MISMATCH`.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use thiserror::Error;

use crate::model::{ResourceKind, ResourceMap};

/// Cache holds at most four entries (one per [`ResourceKind`]) but is sized
/// generously above that so a future resource kind never evicts another.
const CACHE_CAPACITY: u64 = 2_000;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("no cached sample for {0} — refresh loop has not completed a successful tick yet")]
    Miss(ResourceKind),
}

/// TTL-bounded cache of the most recently refreshed sample per resource.
pub struct LoadCache {
    inner: Cache<ResourceKind, Arc<ResourceMap>>,
    last_committed: Mutex<Option<DateTime<Utc>>>,
}

impl LoadCache {
    pub fn new(ttl: Duration) -> Self {
        LoadCache {
            inner: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(ttl)
                .build(),
            last_committed: Mutex::new(None),
        }
    }

    /// Replaces the cached sample for `kind`.
    pub fn set(&self, kind: ResourceKind, sample: ResourceMap) {
        self.inner.insert(kind, Arc::new(sample));
        *self.last_committed.lock().expect("cache timestamp lock poisoned") = Some(Utc::now());
    }

    /// Wall-clock time of the most recent successful `set`, for the
    /// diagnostic endpoint's staleness reporting.
    pub fn last_committed(&self) -> Option<DateTime<Utc>> {
        *self.last_committed.lock().expect("cache timestamp lock poisoned")
    }

    /// Returns the cached sample for `kind`, or [`CacheError::Miss`] if the
    /// entry was never written or has expired.
    pub fn get(&self, kind: ResourceKind) -> Result<Arc<ResourceMap>, CacheError> {
        self.inner.get(&kind).ok_or(CacheError::Miss(kind))
    }

    /// Snapshot of every resource kind currently cached, for the diagnostic
    /// endpoint.
    pub fn snapshot(&self) -> Vec<(ResourceKind, Arc<ResourceMap>)> {
        ResourceKind::ALL
            .iter()
            .filter_map(|&kind| self.inner.get(&kind).map(|v| (kind, v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn sample(pairs: &[(&str, i64)]) -> ResourceMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect::<HashMap<_, _>>()
    }

    #[test]
    fn miss_before_any_write() {
        let cache = LoadCache::new(Duration::from_secs(60));
        assert!(matches!(cache.get(ResourceKind::Cpu), Err(CacheError::Miss(ResourceKind::Cpu))));
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = LoadCache::new(Duration::from_secs(60));
        cache.set(ResourceKind::Cpu, sample(&[("node1", 42)]));
        let got = cache.get(ResourceKind::Cpu).unwrap();
        assert_eq!(got.get("node1"), Some(&42));
    }

    #[test]
    fn kinds_are_independent() {
        let cache = LoadCache::new(Duration::from_secs(60));
        cache.set(ResourceKind::Cpu, sample(&[("node1", 1)]));
        assert!(matches!(cache.get(ResourceKind::Mem), Err(CacheError::Miss(ResourceKind::Mem))));
    }

    #[test]
    fn later_set_overwrites_earlier_value() {
        let cache = LoadCache::new(Duration::from_secs(60));
        cache.set(ResourceKind::NetIo, sample(&[("node1", 1)]));
        cache.set(ResourceKind::NetIo, sample(&[("node1", 2)]));
        assert_eq!(cache.get(ResourceKind::NetIo).unwrap().get("node1"), Some(&2));
    }

    #[test]
    fn snapshot_only_includes_written_kinds() {
        let cache = LoadCache::new(Duration::from_secs(60));
        cache.set(ResourceKind::DiskIo, sample(&[("node1", 5)]));
        let snap = cache.snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].0, ResourceKind::DiskIo);
    }

    #[test]
    fn last_committed_is_none_until_first_write() {
        let cache = LoadCache::new(Duration::from_secs(60));
        assert!(cache.last_committed().is_none());
        cache.set(ResourceKind::Cpu, sample(&[("node1", 1)]));
        assert!(cache.last_committed().is_some());
    }
}
