//! In-memory [`KvStore`] implementation.

use papaya::HashMap as PapayaHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::kv::{KvError, KvStore};

/// Default capacity ceiling, matching the usual per-origin browser quota.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// In-memory key-value store with byte-quota accounting.
///
/// Footprint is counted as key bytes + value bytes per entry. The quota
/// check-then-insert is not synchronized against concurrent writers; the
/// store is only ever mutated from one foreground context.
pub struct MemoryKvStore {
    data: PapayaHashMap<String, String>,
    used: AtomicUsize,
    limit: usize,
}

impl Default for MemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    pub fn with_quota(limit: usize) -> Self {
        Self {
            data: PapayaHashMap::new(),
            used: AtomicUsize::new(0),
            limit,
        }
    }

    /// Bytes currently accounted against the quota.
    pub fn used_bytes(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        let guard = self.data.pin();
        guard.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        let guard = self.data.pin();
        let old_footprint = guard.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
        let new_footprint = key.len() + value.len();
        let projected = self.used.load(Ordering::Relaxed) - old_footprint + new_footprint;
        if projected > self.limit {
            return Err(KvError::QuotaExceeded {
                used: projected,
                limit: self.limit,
            });
        }
        guard.insert(key.to_string(), value.to_string());
        self.used.store(projected, Ordering::Relaxed);
        Ok(())
    }

    fn remove(&self, key: &str) {
        let guard = self.data.pin();
        if let Some(old) = guard.remove(key) {
            self.used
                .fetch_sub(key.len() + old.len(), Ordering::Relaxed);
        }
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let guard = self.data.pin();
        guard
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_remove_round_trip() {
        let store = MemoryKvStore::new();
        store.set("freexp:profile:1", "{}").unwrap();
        assert_eq!(store.get("freexp:profile:1").as_deref(), Some("{}"));

        store.remove("freexp:profile:1");
        assert!(store.get("freexp:profile:1").is_none());
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn quota_is_enforced_and_overwrite_releases_old_bytes() {
        let store = MemoryKvStore::with_quota(32);
        store.set("k", "0123456789").unwrap();

        let result = store.set("other", "0123456789012345678901234567890");
        assert!(matches!(result, Err(KvError::QuotaExceeded { .. })));

        // Overwriting the same key only counts the delta.
        store.set("k", "01234567890123456789012345").unwrap();
        assert_eq!(store.used_bytes(), 27);
    }

    #[test]
    fn prefix_scan_only_returns_matching_keys() {
        let store = MemoryKvStore::new();
        store.set("freexp:project:1", "{}").unwrap();
        store.set("freexp:project:2", "{}").unwrap();
        store.set("freexp:profile:1", "{}").unwrap();

        let mut keys = store.keys_with_prefix("freexp:project:");
        keys.sort();
        assert_eq!(keys, vec!["freexp:project:1", "freexp:project:2"]);
    }
}
