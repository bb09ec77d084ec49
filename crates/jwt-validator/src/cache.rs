//! An asynchronous single-flight cache.
//!
//! Deduplicates concurrent `get` calls for the same key so that at most one loader
//! invocation is in flight per key at a time. Modeled on this codebase's
//! `dashmap`/`once_cell`-backed JWKS cache, generalized with an explicit pending state
//! and an awaiter list so concurrent callers share one in-flight fetch instead of each
//! firing their own.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{oneshot, Mutex};

use crate::error::CacheError;
use crate::time::now_epoch_ms;

enum Entry<V, E> {
    Pending(Vec<oneshot::Sender<Result<V, E>>>),
    Present { value: V, expires_at_ms: u128 },
}

/// A deduplicated, expiry-aware cache of lazily-computed values.
///
/// `V` and `E` must be [`Clone`] because a single loader outcome is broadcast to every
/// awaiter that attached while the loader was in flight.
pub struct SingleFlightCache<K, V, E> {
    inner: Mutex<HashMap<K, Entry<V, E>>>,
    expiry_of: Arc<dyn Fn(&V) -> u128 + Send + Sync>,
}

impl<K, V, E> SingleFlightCache<K, V, E>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Builds an empty cache. `expiry_of` maps a successfully-loaded value to its
    /// absolute expiry in epoch-milliseconds.
    pub fn new(expiry_of: impl Fn(&V) -> u128 + Send + Sync + 'static) -> Self {
        SingleFlightCache {
            inner: Mutex::new(HashMap::new()),
            expiry_of: Arc::new(expiry_of),
        }
    }

    /// True iff the backing map holds an entry for `key` (pending or present, expired
    /// or not — this is a raw existence check, not a validity check).
    pub async fn contains(&self, key: &K) -> bool {
        self.inner.lock().await.contains_key(key)
    }

    /// Inserts `value` as an already-completed, present entry.
    ///
    /// `put` installs the supplied value directly, not an empty placeholder.
    pub async fn put(&self, key: K, value: V) {
        let expires_at_ms = (self.expiry_of)(&value);
        self.inner
            .lock()
            .await
            .insert(key, Entry::Present { value, expires_at_ms });
    }

    /// The canonical single-flight operation.
    ///
    /// `loader` is invoked at most once per key per expiry window, even under
    /// concurrent callers: the first caller to observe a miss installs a pending
    /// entry and runs `loader`; every other caller attaches an awaiter and is resolved
    /// with the same outcome once the loader completes. Failures are never cached.
    ///
    /// Returns [`CacheError::LoaderDropped`] if the caller that owned the in-flight
    /// loader was dropped (e.g. its task panicked) before resolving this awaiter.
    pub async fn get<F, Fut>(&self, key: K, loader: F) -> Result<V, CacheError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        enum Action<V, E> {
            Present(V),
            Await(oneshot::Receiver<Result<V, E>>),
            Load,
        }

        let action = {
            let mut map = self.inner.lock().await;
            match map.get_mut(&key) {
                Some(Entry::Present {
                    value,
                    expires_at_ms,
                }) => {
                    if now_epoch_ms() < *expires_at_ms {
                        tracing::trace!(key = ?key, "cache hit");
                        Action::Present(value.clone())
                    } else {
                        tracing::debug!(key = ?key, "cache entry expired, treating as miss");
                        map.remove(&key);
                        map.insert(key.clone(), Entry::Pending(Vec::new()));
                        Action::Load
                    }
                }
                Some(Entry::Pending(waiters)) => {
                    tracing::trace!(key = ?key, "attaching to in-flight loader");
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Action::Await(rx)
                }
                None => {
                    tracing::debug!(key = ?key, "cache miss, running loader");
                    map.insert(key.clone(), Entry::Pending(Vec::new()));
                    Action::Load
                }
            }
        };

        match action {
            Action::Present(value) => Ok(value),
            Action::Await(rx) => {
                let result = rx.await.map_err(|_| CacheError::LoaderDropped)?;
                result.map_err(CacheError::Loader)
            }
            Action::Load => self.run_loader(key, loader().await).await,
        }
    }

    async fn run_loader(&self, key: K, result: Result<V, E>) -> Result<V, CacheError<E>> {
        let waiters = {
            let mut map = self.inner.lock().await;
            let waiters = match map.remove(&key) {
                Some(Entry::Pending(waiters)) => waiters,
                _ => Vec::new(),
            };
            if let Ok(value) = &result {
                let expires_at_ms = (self.expiry_of)(value);
                map.insert(
                    key,
                    Entry::Present {
                        value: value.clone(),
                        expires_at_ms,
                    },
                );
            }
            waiters
        };
        for tx in waiters {
            let _ = tx.send(result.clone());
        }
        result.map_err(CacheError::Loader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn never_expires(_: &u32) -> u128 {
        u128::MAX
    }

    #[tokio::test]
    async fn put_then_get_skips_loader() {
        let cache: SingleFlightCache<&str, u32, String> = SingleFlightCache::new(never_expires);
        cache.put("k", 42).await;
        let calls = AtomicUsize::new(0);
        let v = cache
            .get("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(0)
            })
            .await
            .unwrap();
        assert_eq!(v, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn concurrent_awaiters_single_loader_call_same_outcome() {
        let cache: Arc<SingleFlightCache<&str, u32, String>> =
            Arc::new(SingleFlightCache::new(never_expires));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get("k", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, String>(7)
                    })
                    .await
            }));
        }

        let mut results = Vec::new();
        for h in handles {
            results.push(h.await.unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for r in results {
            assert_eq!(r.unwrap(), 7);
        }
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let cache: SingleFlightCache<&str, u32, String> = SingleFlightCache::new(never_expires);
        let calls = AtomicUsize::new(0);

        let first = cache
            .get("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>("boom".to_string())
            })
            .await;
        assert!(first.is_err());

        let second = cache
            .get("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(99)
            })
            .await;
        assert_eq!(second.unwrap(), 99);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_treated_as_miss() {
        let cache: SingleFlightCache<&str, u32, String> = SingleFlightCache::new(|_| 0);
        cache.put("k", 1).await;
        // expiry_of always returns 0, so the entry is immediately stale.
        let v = cache
            .get("k", || async { Ok::<_, String>(2) })
            .await
            .unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn contains_reflects_install_without_requiring_validity() {
        let cache: SingleFlightCache<&str, u32, String> = SingleFlightCache::new(never_expires);
        assert!(!cache.contains(&"k").await);
        cache.put("k", 1).await;
        assert!(cache.contains(&"k").await);
    }
}
