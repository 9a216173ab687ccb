//! Time-bounded memoization for asynchronous reads, with prefix
//! invalidation and in-flight request coalescing.
//!
//! ## Design
//!
//! - **Cache key**: opaque string encoding entity type + id
//!   (`"profile:{id}"`, `"auth:session"`, ...)
//! - **Freshness**: a value younger than its TTL is returned without
//!   invoking the fetch; `force_refresh` bypasses this check only
//! - **Coalescing**: concurrent `get` calls for one key share a single
//!   underlying fetch and observe the same resolved value or the same
//!   error, including when they race with `force_refresh`
//! - **No negative caching**: a failed fetch evicts the key entirely
//!
//! Each fetch carries a generation number; a fetch that completes after
//! `invalidate` removed its entry finds a stale generation and does not
//! resurrect the value. The interior mutex is only ever held across map
//! operations, never across an await point.

use futures_util::FutureExt;
use futures_util::future::Shared;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::StorageResult;

/// Default time-to-live for cached reads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

type FetchFuture = Pin<Box<dyn Future<Output = StorageResult<Value>> + Send>>;
type SharedFetch = Shared<FetchFuture>;

struct CachedValue {
    value: Value,
    expires_at: Instant,
}

struct PendingFetch {
    generation: u64,
    future: SharedFetch,
}

#[derive(Default)]
struct CacheEntry {
    value: Option<CachedValue>,
    pending: Option<PendingFetch>,
}

/// Hit/miss/coalescing counters for diagnostics.
#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

/// A point-in-time snapshot of the cache counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Calls that joined an already in-flight fetch instead of starting
    /// their own.
    pub coalesced: u64,
}

/// Keyed async read cache with TTL, coalescing and prefix invalidation.
///
/// Construct one per [`crate::MarketStore`]; cloning is cheap and shares
/// state.
#[derive(Clone)]
pub struct AsyncCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    generation: Arc<AtomicU64>,
    counters: Arc<Counters>,
}

impl Default for AsyncCache {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Returns the cached value for `key`, or resolves it via `fetch`.
    ///
    /// A fresh cached value is returned without invoking `fetch` unless
    /// `force_refresh` is set. If a fetch for this key is already in
    /// flight, the call joins it — `force_refresh` does not start a second
    /// concurrent fetch. On fetch failure the key is evicted and the error
    /// is delivered to every waiter.
    pub async fn get<F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        force_refresh: bool,
        fetch: F,
    ) -> StorageResult<Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StorageResult<Value>> + Send + 'static,
    {
        debug_assert!(!key.is_empty(), "cache keys must be non-empty");

        enum FastPath {
            Hit(Value),
            Join(SharedFetch),
            Miss,
        }

        // Fast path under the lock: fresh value or in-flight fetch.
        let fast_path = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.to_string()).or_default();
            if let Some(pending) = &entry.pending {
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key, "joining in-flight fetch");
                FastPath::Join(pending.future.clone())
            } else {
                match &entry.value {
                    Some(cached) if !force_refresh && Instant::now() < cached.expires_at => {
                        self.counters.hits.fetch_add(1, Ordering::Relaxed);
                        FastPath::Hit(cached.value.clone())
                    }
                    _ => FastPath::Miss,
                }
            }
        };
        match fast_path {
            FastPath::Hit(value) => return Ok(value),
            FastPath::Join(shared) => return shared.await,
            FastPath::Miss => {}
        }

        // Miss: build the fetch outside the lock, then insert it unless a
        // racer got there first.
        let future = fetch();
        let shared = {
            let mut entries = self.lock_entries();
            let entry = entries.entry(key.to_string()).or_default();
            if let Some(pending) = &entry.pending {
                // Lost the race; the unpolled future we built is dropped.
                self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
                pending.future.clone()
            } else {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, force_refresh, "cache miss, starting fetch");
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let shared = self.wrap_fetch(key.to_string(), generation, ttl, future);
                entry.pending = Some(PendingFetch {
                    generation,
                    future: shared.clone(),
                });
                shared
            }
        };
        shared.await
    }

    /// Removes all entries whose key starts with `prefix`, or every entry
    /// when `prefix` is `None`. Idempotent. In-flight fetches for removed
    /// keys still complete for their waiters but no longer update the
    /// cache.
    pub fn invalidate(&self, prefix: Option<&str>) {
        let mut entries = self.lock_entries();
        match prefix {
            Some(prefix) => {
                entries.retain(|key, _| !key.starts_with(prefix));
                debug!(prefix, "invalidated cache prefix");
            }
            None => {
                entries.clear();
                debug!("cleared cache");
            }
        }
    }

    /// Current counter values.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
        }
    }

    /// Wraps a fetch so that exactly one execution records its outcome:
    /// success stores the value with a new expiry and clears the in-flight
    /// marker; failure evicts the key. A stale generation (the entry was
    /// invalidated or replaced while the fetch ran) records nothing.
    fn wrap_fetch<Fut>(
        &self,
        key: String,
        generation: u64,
        ttl: Duration,
        future: Fut,
    ) -> SharedFetch
    where
        Fut: Future<Output = StorageResult<Value>> + Send + 'static,
    {
        let entries = Arc::clone(&self.entries);
        let boxed: FetchFuture = Box::pin(async move {
            let result = future.await;
            let mut entries = entries
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let current = entries
                .get(&key)
                .and_then(|entry| entry.pending.as_ref())
                .map(|pending| pending.generation);
            if current == Some(generation) {
                match &result {
                    Ok(value) => {
                        if let Some(entry) = entries.get_mut(&key) {
                            entry.pending = None;
                            entry.value = Some(CachedValue {
                                value: value.clone(),
                                expires_at: Instant::now() + ttl,
                            });
                        }
                    }
                    Err(error) => {
                        debug!(key = %key, %error, "fetch failed, evicting key");
                        entries.remove(&key);
                    }
                }
            }
            result
        });
        boxed.shared()
    }

    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn counting_fetch(
        calls: &Arc<AtomicUsize>,
        value: Value,
    ) -> impl Future<Output = StorageResult<Value>> + Send + 'static {
        let calls = Arc::clone(calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(value)
        }
    }

    #[tokio::test]
    async fn fresh_value_skips_fetch() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get("profile:1", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("v1"))
            })
            .await
            .unwrap();
        let second = cache
            .get("profile:1", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("v2"))
            })
            .await
            .unwrap();

        assert_eq!(first, json!("v1"));
        assert_eq!(second, json!("v1"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn expired_value_refetches() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_millis(10);

        cache
            .get("profile:1", ttl, false, || {
                counting_fetch(&calls, json!("v1"))
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let second = cache
            .get("profile:1", ttl, false, || {
                counting_fetch(&calls, json!("v2"))
            })
            .await
            .unwrap();

        assert_eq!(second, json!("v2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_fresh_value() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .get("profile:1", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("v1"))
            })
            .await
            .unwrap();
        let refreshed = cache
            .get("profile:1", DEFAULT_TTL, true, || {
                counting_fetch(&calls, json!("v2"))
            })
            .await
            .unwrap();

        assert_eq!(refreshed, json!("v2"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_fetch() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let slow_fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!("shared"))
            }
        };

        let (a, b) = tokio::join!(
            cache.get("project:7", DEFAULT_TTL, false, slow_fetch),
            cache.get("project:7", DEFAULT_TTL, false, slow_fetch),
        );

        assert_eq!(a.unwrap(), json!("shared"));
        assert_eq!(b.unwrap(), json!("shared"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().coalesced, 1);
    }

    #[tokio::test]
    async fn racing_force_refreshes_coalesce() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .get("auth:session", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("old"))
            })
            .await
            .unwrap();

        let slow_fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(json!("new"))
            }
        };
        let (a, b) = tokio::join!(
            cache.get("auth:session", DEFAULT_TTL, true, slow_fetch),
            cache.get("auth:session", DEFAULT_TTL, true, slow_fetch),
        );

        assert_eq!(a.unwrap(), json!("new"));
        assert_eq!(b.unwrap(), json!("new"));
        assert_eq!(calls.load(Ordering::SeqCst), 2); // seed + one shared refresh
    }

    #[tokio::test]
    async fn concurrent_waiters_see_the_same_error() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let failing_fetch = || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Err(StorageError::transport("connection reset"))
            }
        };

        let (a, b) = tokio::join!(
            cache.get("profile:1", DEFAULT_TTL, false, failing_fetch),
            cache.get("profile:1", DEFAULT_TTL, false, failing_fetch),
        );

        assert!(matches!(a, Err(StorageError::TransportFailure { .. })));
        assert!(matches!(b, Err(StorageError::TransportFailure { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_negatively_cached() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .get("profile:1", DEFAULT_TTL, false, || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(StorageError::transport("boom"))
                }
            })
            .await;
        assert!(first.is_err());

        let second = cache
            .get("profile:1", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("recovered"))
            })
            .await
            .unwrap();
        assert_eq!(second, json!("recovered"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn prefix_invalidation_is_selective() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for key in ["auth:session", "profile:1"] {
            cache
                .get(key, DEFAULT_TTL, false, || {
                    counting_fetch(&calls, json!(key))
                })
                .await
                .unwrap();
        }
        cache.invalidate(Some("auth:"));

        cache
            .get("auth:session", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("refetched"))
            })
            .await
            .unwrap();
        cache
            .get("profile:1", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("should not run"))
            })
            .await
            .unwrap();

        // Two seeds plus one refetch for the invalidated key.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn invalidate_during_in_flight_fetch_does_not_resurrect_value() {
        let cache = AsyncCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let spawned_cache = cache.clone();
        let spawned_calls = Arc::clone(&calls);
        let handle = tokio::spawn(async move {
            spawned_cache
                .get("profile:1", DEFAULT_TTL, false, move || async move {
                    spawned_calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(30)).await;
                    Ok(json!("stale"))
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        cache.invalidate(None);

        // The in-flight waiter still gets its value...
        assert_eq!(handle.await.unwrap().unwrap(), json!("stale"));

        // ...but the cache did not keep it.
        let fresh = cache
            .get("profile:1", DEFAULT_TTL, false, || {
                counting_fetch(&calls, json!("fresh"))
            })
            .await
            .unwrap();
        assert_eq!(fresh, json!("fresh"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
