// ── Keyed query cache ──
//
// Concurrent map of `QueryKey` -> cached read. Reads of the same key
// share one in-flight request; invalidation marks a whole namespace
// stale so the next read refetches. Nothing is ever patched in place.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures_util::FutureExt;
use tokio::sync::broadcast;
use tracing::{debug, trace};

use super::entry::{CacheEntry, CachedValue, FetchTicket};
use crate::error::CoreError;
use crate::keys::QueryKey;

const EVENT_CHANNEL_SIZE: usize = 64;

/// Change notifications emitted by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A fresh value was stored under this key.
    Updated(QueryKey),
    /// Every key under this prefix was marked stale.
    Invalidated(QueryKey),
    /// Every key under this prefix was dropped.
    Removed(QueryKey),
    /// The whole cache was emptied.
    Cleared,
}

/// Shared cache for API reads.
///
/// Thread-safe: entries live in a `DashMap`, and no shard lock is held
/// across an `.await`. Notifications go out on a `broadcast` channel.
pub struct QueryCache {
    entries: DashMap<QueryKey, CacheEntry>,
    events: broadcast::Sender<CacheEvent>,
    /// Source of fetch tickets. Outlives every entry, so a fetch started
    /// before `clear()` or `remove()` cannot claim a recreated entry.
    next_ticket: AtomicU64,
}

impl QueryCache {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            entries: DashMap::new(),
            events,
            next_ticket: AtomicU64::new(0),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Return the cached value for `key`, or run `fetcher` to produce it.
    ///
    /// A fresh value is returned without calling `fetcher`. If another
    /// caller is already fetching this key, this call awaits that request
    /// instead of starting a second one. Failures are returned but never
    /// cached.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, CoreError>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CoreError>> + Send + 'static,
    {
        if key.is_disabled() {
            return Err(CoreError::Internal(
                "disabled query key cannot be fetched".into(),
            ));
        }

        let (ticket, fetch) = {
            let mut entry = self.entries.entry(key.clone()).or_default();

            if let Some(value) = entry.fresh_value() {
                trace!(%key, "cache hit");
                return downcast(&key, value);
            }

            if let Some((ticket, fetch)) = &entry.in_flight {
                trace!(%key, "joining in-flight fetch");
                (*ticket, fetch.clone())
            } else {
                debug!(%key, "fetching");
                let fetch = fetcher()
                    .map(|result| result.map(|value| Arc::new(value) as CachedValue))
                    .boxed()
                    .shared();
                let ticket: FetchTicket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                entry.in_flight = Some((ticket, fetch.clone()));
                (ticket, fetch)
            }
        };

        let result = fetch.await;

        let stored = self
            .entries
            .get_mut(&key)
            .is_some_and(|mut entry| entry.settle(ticket, &result));
        if stored {
            trace!(%key, "stored");
            let _ = self.events.send(CacheEvent::Updated(key.clone()));
        }

        result.and_then(|value| downcast(&key, value))
    }

    /// The last stored value for `key`, fresh or stale.
    pub fn get<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let value = self.entries.get(key)?.value.clone()?;
        value.downcast::<T>().ok()
    }

    /// `true` if the next [`fetch`](Self::fetch) of `key` will hit the network.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        self.entries
            .get(key)
            .is_none_or(|entry| entry.fresh_value().is_none())
    }

    /// When `key` last received a fresh value.
    pub fn updated_at(&self, key: &QueryKey) -> Option<DateTime<Utc>> {
        self.entries.get(key)?.updated_at
    }

    // ── Invalidation ─────────────────────────────────────────────────

    /// Mark every entry under `prefix` stale. Returns how many were marked.
    ///
    /// Idempotent: invalidating twice before the next read still costs
    /// exactly one refetch. Fetches already in flight keep answering their
    /// callers but can no longer refresh the entry.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut marked = 0;
        for mut entry in self.entries.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.value_mut().mark_stale();
                marked += 1;
            }
        }
        debug!(%prefix, marked, "invalidated");
        let _ = self.events.send(CacheEvent::Invalidated(prefix.clone()));
        marked
    }

    /// Drop every entry under `prefix`.
    ///
    /// Fetches already in flight for dropped keys still answer their
    /// callers but never store.
    pub fn remove(&self, prefix: &QueryKey) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before.saturating_sub(self.entries.len());
        debug!(%prefix, removed, "removed");
        let _ = self.events.send(CacheEvent::Removed(prefix.clone()));
        removed
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.entries.clear();
        debug!("cache cleared");
        let _ = self.events.send(CacheEvent::Cleared);
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

fn downcast<T: Send + Sync + 'static>(key: &QueryKey, value: CachedValue) -> Result<Arc<T>, CoreError> {
    value
        .downcast::<T>()
        .map_err(|_| CoreError::Internal(format!("cached value under {key} has an unexpected type")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;
    use crate::keys::{entity_keys, invitation_keys};

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> futures_util::future::BoxFuture<'static, Result<u32, CoreError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn second_read_hits_cache() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let a = cache
            .fetch(entity_keys::list(), counting_fetcher(&calls, 1))
            .await
            .unwrap();
        let b = cache
            .fetch(entity_keys::list(), counting_fetcher(&calls, 2))
            .await
            .unwrap();

        assert_eq!((*a, *b), (1, 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_reads_share_one_request() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch(invitation_keys::my(), counting_fetcher(&calls, 5)),
            cache.fetch(invitation_keys::my(), counting_fetcher(&calls, 6)),
        );

        assert_eq!(*a.unwrap(), 5);
        assert_eq!(*b.unwrap(), 5);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn double_invalidation_costs_one_refetch() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        cache
            .fetch(entity_keys::list(), counting_fetcher(&calls, 1))
            .await
            .unwrap();

        assert_eq!(cache.invalidate(&entity_keys::all()), 1);
        assert_eq!(cache.invalidate(&entity_keys::all()), 1);
        assert!(cache.is_stale(&entity_keys::list()));

        let v = cache
            .fetch(entity_keys::list(), counting_fetcher(&calls, 2))
            .await
            .unwrap();
        let again = cache
            .fetch(entity_keys::list(), counting_fetcher(&calls, 3))
            .await
            .unwrap();

        assert_eq!((*v, *again), (2, 2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidation_is_scoped_to_namespace() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for key in [
            entity_keys::members("acme"),
            entity_keys::members("globex"),
            invitation_keys::my(),
        ] {
            cache.fetch(key, counting_fetcher(&calls, 0)).await.unwrap();
        }

        assert_eq!(cache.invalidate(&entity_keys::detail("acme")), 1);
        assert!(cache.is_stale(&entity_keys::members("acme")));
        assert!(!cache.is_stale(&entity_keys::members("globex")));
        assert!(!cache.is_stale(&invitation_keys::my()));
        // Stale values stay readable until the refetch lands.
        assert_eq!(*cache.get::<u32>(&entity_keys::members("acme")).unwrap(), 0);
    }

    fn gated_fetcher(
        gate: oneshot::Receiver<u32>,
    ) -> impl FnOnce() -> futures_util::future::BoxFuture<'static, Result<u32, CoreError>> {
        move || {
            async move {
                gate.await
                    .map_err(|_| CoreError::Internal("gate dropped".into()))
            }
            .boxed()
        }
    }

    async fn wait_for_entry(cache: &QueryCache) {
        while cache.is_empty() {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn fetch_started_before_clear_does_not_overwrite_newer_fetch() {
        let cache = Arc::new(QueryCache::new());
        let (open_old, old_gate) = oneshot::channel();
        let (open_new, new_gate) = oneshot::channel();

        let old = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.fetch(entity_keys::list(), gated_fetcher(old_gate)).await }
        });
        wait_for_entry(&cache).await;

        cache.clear();

        let new = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.fetch(entity_keys::list(), gated_fetcher(new_gate)).await }
        });
        wait_for_entry(&cache).await;

        open_old.send(1).unwrap();
        assert_eq!(*old.await.unwrap().unwrap(), 1);
        // The new fetch still owns the entry.
        assert!(cache.is_stale(&entity_keys::list()));
        assert!(cache.get::<u32>(&entity_keys::list()).is_none());

        open_new.send(2).unwrap();
        assert_eq!(*new.await.unwrap().unwrap(), 2);
        assert_eq!(*cache.get::<u32>(&entity_keys::list()).unwrap(), 2);
        assert!(!cache.is_stale(&entity_keys::list()));
    }

    #[tokio::test]
    async fn fetch_started_before_remove_does_not_store() {
        let cache = Arc::new(QueryCache::new());
        let (open, gate) = oneshot::channel();

        let pending = tokio::spawn({
            let cache = Arc::clone(&cache);
            async move { cache.fetch(entity_keys::members("acme"), gated_fetcher(gate)).await }
        });
        wait_for_entry(&cache).await;

        assert_eq!(cache.remove(&entity_keys::detail("acme")), 1);
        open.send(9).unwrap();

        assert_eq!(*pending.await.unwrap().unwrap(), 9);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn failures_are_returned_not_cached() {
        let cache = QueryCache::new();
        let err = cache
            .fetch(entity_keys::list(), || async {
                Err::<u32, _>(CoreError::Api {
                    message: "Server exploded".into(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Server exploded");
        assert!(cache.is_stale(&entity_keys::list()));
        assert!(cache.get::<u32>(&entity_keys::list()).is_none());
    }

    #[tokio::test]
    async fn disabled_key_is_rejected() {
        let cache = QueryCache::new();
        let result = cache
            .fetch(QueryKey::disabled(), || async { Ok(1_u32) })
            .await;
        assert!(matches!(result, Err(CoreError::Internal(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn events_are_broadcast() {
        let cache = QueryCache::new();
        let mut rx = cache.subscribe();

        cache
            .fetch(entity_keys::list(), || async { Ok(1_u32) })
            .await
            .unwrap();
        cache.invalidate(&entity_keys::all());
        cache.remove(&entity_keys::all());
        cache.clear();

        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Updated(entity_keys::list()));
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Invalidated(entity_keys::all()));
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Removed(entity_keys::all()));
        assert_eq!(rx.recv().await.unwrap(), CacheEvent::Cleared);
    }
}
