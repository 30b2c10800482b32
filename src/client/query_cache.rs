use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

use super::ClientError;

/// One segment of a hierarchical cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyPart {
    Name(String),
    Id(i64),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Hierarchical key, e.g. `watchlist/7/stats`. A key invalidates every key it prefixes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<KeyPart>);

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

fn name(value: &str) -> KeyPart {
    KeyPart::Name(value.to_string())
}

impl QueryKey {
    #[must_use]
    pub fn films() -> Self {
        Self(vec![name("films")])
    }

    #[must_use]
    pub fn film(id: i32) -> Self {
        Self(vec![name("films"), KeyPart::Id(id.into())])
    }

    #[must_use]
    pub fn film_details(imdb_id: &str) -> Self {
        Self(vec![name("films"), name("details"), name(imdb_id)])
    }

    #[must_use]
    pub fn search(query: &str, page: u64) -> Self {
        Self(vec![
            name("films"),
            name("search"),
            name(query),
            KeyPart::Id(i64::try_from(page).unwrap_or(i64::MAX)),
        ])
    }

    #[must_use]
    pub fn popular(limit: u64) -> Self {
        Self(vec![
            name("films"),
            name("popular"),
            KeyPart::Id(i64::try_from(limit).unwrap_or(i64::MAX)),
        ])
    }

    #[must_use]
    pub fn trending(window: &str) -> Self {
        Self(vec![name("films"), name("trending"), name(window)])
    }

    #[must_use]
    pub fn recommendations(user_id: i32) -> Self {
        Self(vec![
            name("films"),
            name("recommendations"),
            KeyPart::Id(user_id.into()),
        ])
    }

    #[must_use]
    pub fn watchlist(user_id: i32) -> Self {
        Self(vec![name("watchlist"), KeyPart::Id(user_id.into())])
    }

    /// Listing filtered by status; `all` when unfiltered.
    #[must_use]
    pub fn watchlist_list(user_id: i32, status: Option<&str>) -> Self {
        let mut key = Self::watchlist(user_id);
        key.0.push(name("list"));
        key.0.push(name(status.unwrap_or("all")));
        key
    }

    #[must_use]
    pub fn watchlist_entry(user_id: i32, film_id: i32) -> Self {
        let mut key = Self::watchlist(user_id);
        key.0.push(KeyPart::Id(film_id.into()));
        key
    }

    #[must_use]
    pub fn watchlist_stats(user_id: i32) -> Self {
        let mut key = Self::watchlist(user_id);
        key.0.push(name("stats"));
        key
    }

    #[must_use]
    pub fn watchlist_recent(user_id: i32, limit: u64) -> Self {
        let mut key = Self::watchlist(user_id);
        key.0.push(name("recent"));
        key.0.push(KeyPart::Id(i64::try_from(limit).unwrap_or(i64::MAX)));
        key
    }

    #[must_use]
    pub fn user(id: i32) -> Self {
        Self(vec![name("user"), KeyPart::Id(id.into())])
    }

    #[must_use]
    pub fn starts_with(&self, prefix: &Self) -> bool {
        self.0.starts_with(&prefix.0)
    }

    fn is_film_list(&self, list: &str) -> bool {
        matches!(
            self.0.as_slice(),
            [KeyPart::Name(root), KeyPart::Name(kind), ..] if root == "films" && kind == list
        )
    }
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    pub search_stale_time: Duration,
    pub popular_stale_time: Duration,
    pub recommendations_stale_time: Duration,
    pub default_stale_time: Duration,
    /// Entries untouched for this long are dropped.
    pub gc_time: Duration,
    pub query_retries: u32,
    pub mutation_retries: u32,
    /// First retry delay; doubles per attempt up to 30 s.
    pub retry_delay: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            search_stale_time: Duration::from_secs(5 * 60),
            popular_stale_time: Duration::from_secs(30 * 60),
            recommendations_stale_time: Duration::from_secs(15 * 60),
            default_stale_time: Duration::from_secs(5 * 60),
            gc_time: Duration::from_secs(10 * 60),
            query_retries: 2,
            mutation_retries: 1,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl CachePolicy {
    #[must_use]
    pub fn stale_time(&self, key: &QueryKey) -> Duration {
        if key.is_film_list("search") {
            self.search_stale_time
        } else if key.is_film_list("popular") {
            self.popular_stale_time
        } else if key.is_film_list("recommendations") {
            self.recommendations_stale_time
        } else {
            self.default_stale_time
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay
            .saturating_mul(factor)
            .min(Duration::from_secs(30))
    }
}

type CachedValue = Arc<dyn Any + Send + Sync>;
type InFlight = Shared<BoxFuture<'static, Result<CachedValue, ClientError>>>;

struct Entry {
    value: CachedValue,
    fetched_at: Instant,
    last_access: Instant,
    invalidated: bool,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<QueryKey, Entry>,
    in_flight: HashMap<QueryKey, InFlight>,
}

/// Keyed cache of query results with stale-while-valid semantics.
///
/// Concurrent reads of the same key share one request. Reads retry up to
/// `query_retries` times and mutations `mutation_retries` times; a 401 is
/// never retried.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Mutex<Inner>>,
    policy: Arc<CachePolicy>,
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}

fn downcast<T: Clone + 'static>(value: &CachedValue) -> Result<T, ClientError> {
    value
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| ClientError::Decode("cached value has an unexpected type".to_string()))
}

async fn with_retry<T, F, Fut>(
    policy: &CachePolicy,
    retries: u32,
    mut operation: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_unauthorized() || attempt >= retries => return Err(err),
            Err(err) => {
                attempt += 1;
                debug!(attempt, error = %err, "Retrying request");
                tokio::time::sleep(policy.backoff(attempt)).await;
            }
        }
    }
}

impl QueryCache {
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            inner: Arc::default(),
            policy: Arc::new(policy),
        }
    }

    #[must_use]
    pub fn policy(&self) -> &CachePolicy {
        &self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached value when fresh, otherwise runs `fetcher` (once
    /// across concurrent callers) and caches the result.
    pub async fn fetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<T, ClientError>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let request = {
            let mut inner = self.lock();
            let now = Instant::now();
            Self::collect(&mut inner, now, self.policy.gc_time);

            let stale_time = self.policy.stale_time(&key);
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.last_access = now;
                if !entry.invalidated && now.duration_since(entry.fetched_at) < stale_time {
                    return downcast(&entry.value);
                }
            }

            if let Some(pending) = inner.in_flight.get(&key) {
                pending.clone()
            } else {
                debug!(key = %key, "Fetching query");
                let policy = Arc::clone(&self.policy);
                let request: InFlight = async move {
                    let value = with_retry(&policy, policy.query_retries, &fetcher).await?;
                    Ok(Arc::new(value) as CachedValue)
                }
                .boxed()
                .shared();
                inner.in_flight.insert(key.clone(), request.clone());
                request
            }
        };

        let result = request.clone().await;

        {
            let mut inner = self.lock();
            let owns_request = inner
                .in_flight
                .get(&key)
                .is_some_and(|pending| pending.ptr_eq(&request));
            if owns_request {
                inner.in_flight.remove(&key);
                if let Ok(value) = &result {
                    let now = Instant::now();
                    inner.entries.insert(
                        key,
                        Entry {
                            value: Arc::clone(value),
                            fetched_at: now,
                            last_access: now,
                            invalidated: false,
                        },
                    );
                }
            }
        }

        result.and_then(|value| downcast(&value))
    }

    /// Runs a mutation with the mutation retry budget. Nothing is cached.
    pub async fn mutate<T, F, Fut>(&self, operation: F) -> Result<T, ClientError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        with_retry(&self.policy, self.policy.mutation_retries, operation).await
    }

    /// Cached value regardless of staleness.
    #[must_use]
    pub fn get<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        let inner = self.lock();
        inner
            .entries
            .get(key)
            .and_then(|entry| entry.value.downcast_ref::<T>().cloned())
    }

    pub fn set<T: Send + Sync + 'static>(&self, key: QueryKey, value: T) {
        let now = Instant::now();
        self.lock().entries.insert(
            key,
            Entry {
                value: Arc::new(value),
                fetched_at: now,
                last_access: now,
                invalidated: false,
            },
        );
    }

    /// `true` when absent, invalidated, or older than its stale time.
    #[must_use]
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        let inner = self.lock();
        inner.entries.get(key).is_none_or(|entry| {
            entry.invalidated || entry.fetched_at.elapsed() >= self.policy.stale_time(key)
        })
    }

    /// Drops every entry under `prefix` and forgets matching in-flight reads.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        inner.in_flight.retain(|key, _| !key.starts_with(prefix));
        let removed = before - inner.entries.len();
        debug!(prefix = %prefix, removed, "Invalidated queries");
        removed
    }

    /// Marks every entry stale so the next read refetches.
    pub fn on_reconnect(&self) -> usize {
        let mut inner = self.lock();
        for entry in inner.entries.values_mut() {
            entry.invalidated = true;
        }
        inner.entries.len()
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.in_flight.clear();
    }

    /// Drops entries not read within the gc window.
    pub fn collect_garbage(&self) -> usize {
        let mut inner = self.lock();
        Self::collect(&mut inner, Instant::now(), self.policy.gc_time)
    }

    fn collect(inner: &mut Inner, now: Instant, gc_time: Duration) -> usize {
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, entry| now.duration_since(entry.last_access) < gc_time);
        before - inner.entries.len()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_policy() -> CachePolicy {
        CachePolicy {
            retry_delay: Duration::ZERO,
            ..CachePolicy::default()
        }
    }

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl Fn() -> BoxFuture<'static, Result<u32, ClientError>> + Send + Sync + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Ok(value) }.boxed()
        }
    }

    #[test]
    fn test_stale_times_by_resource() {
        let policy = CachePolicy::default();
        assert_eq!(
            policy.stale_time(&QueryKey::search("matrix", 1)),
            Duration::from_secs(300)
        );
        assert_eq!(
            policy.stale_time(&QueryKey::popular(20)),
            Duration::from_secs(1800)
        );
        assert_eq!(
            policy.stale_time(&QueryKey::recommendations(1)),
            Duration::from_secs(900)
        );
        assert_eq!(
            policy.stale_time(&QueryKey::watchlist(1)),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_key_prefixes() {
        let user = QueryKey::watchlist(7);
        assert!(QueryKey::watchlist_stats(7).starts_with(&user));
        assert!(QueryKey::watchlist_entry(7, 3).starts_with(&user));
        assert!(QueryKey::watchlist_list(7, None).starts_with(&user));
        assert!(!QueryKey::watchlist_stats(8).starts_with(&user));
        assert!(QueryKey::popular(10).starts_with(&QueryKey::films()));
        assert_eq!(QueryKey::watchlist_stats(7).to_string(), "watchlist/7/stats");
    }

    #[tokio::test]
    async fn test_fresh_entry_is_served_from_cache() {
        let cache = QueryCache::new(fast_policy());
        let calls = Arc::new(AtomicUsize::new(0));

        let first = cache
            .fetch(QueryKey::popular(20), counting_fetcher(&calls, 1))
            .await
            .unwrap();
        let second = cache
            .fetch(QueryKey::popular(20), counting_fetcher(&calls, 2))
            .await
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_stale_time_refetches() {
        let cache = QueryCache::new(CachePolicy {
            default_stale_time: Duration::ZERO,
            ..fast_policy()
        });
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(QueryKey::film(1), counting_fetcher(&calls, 1))
            .await
            .unwrap();
        let value = cache
            .fetch(QueryKey::film(1), counting_fetcher(&calls, 2))
            .await
            .unwrap();

        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_one_request() {
        let cache = QueryCache::new(fast_policy());
        let calls = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let gate = rx.shared();

        let fetcher = {
            let calls = Arc::clone(&calls);
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                let gate = gate.clone();
                async move {
                    let _ = gate.await;
                    Ok::<_, ClientError>(42u32)
                }
            }
        };

        let first = tokio::spawn({
            let cache = cache.clone();
            let fetcher = fetcher.clone();
            async move { cache.fetch(QueryKey::search("dune", 1), fetcher).await }
        });
        let second = tokio::spawn({
            let cache = cache.clone();
            async move { cache.fetch(QueryKey::search("dune", 1), fetcher).await }
        });

        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        tx.send(()).unwrap();

        assert_eq!(first.await.unwrap().unwrap(), 42);
        assert_eq!(second.await.unwrap().unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reads_retry_twice_then_fail() {
        let cache = QueryCache::new(fast_policy());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = cache
            .fetch(QueryKey::films(), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ClientError::Network("down".to_string())) }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let cache = QueryCache::new(fast_policy());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = cache
            .fetch(QueryKey::watchlist(1), move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ClientError::Unauthorized("expired".to_string())) }
            })
            .await;

        assert!(result.unwrap_err().is_unauthorized());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_mutations_retry_once() {
        let cache = QueryCache::new(fast_policy());
        let calls = AtomicUsize::new(0);

        let result: Result<(), _> = cache
            .mutate(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ClientError::Api {
                        status: 500,
                        message: "boom".to_string(),
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_drops_prefix_only() {
        let cache = QueryCache::new(fast_policy());
        cache.set(QueryKey::watchlist_list(1, None), 1u32);
        cache.set(QueryKey::watchlist_stats(1), 2u32);
        cache.set(QueryKey::watchlist_stats(2), 3u32);
        cache.set(QueryKey::popular(20), 4u32);

        assert_eq!(cache.invalidate(&QueryKey::watchlist(1)), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get::<u32>(&QueryKey::watchlist_stats(2)), Some(3));
        assert_eq!(cache.get::<u32>(&QueryKey::popular(20)), Some(4));
    }

    #[tokio::test]
    async fn test_reconnect_marks_entries_stale() {
        let cache = QueryCache::new(fast_policy());
        let calls = Arc::new(AtomicUsize::new(0));

        cache
            .fetch(QueryKey::popular(20), counting_fetcher(&calls, 1))
            .await
            .unwrap();
        assert!(!cache.is_stale(&QueryKey::popular(20)));

        assert_eq!(cache.on_reconnect(), 1);
        assert!(cache.is_stale(&QueryKey::popular(20)));
        assert_eq!(cache.get::<u32>(&QueryKey::popular(20)), Some(1));

        let value = cache
            .fetch(QueryKey::popular(20), counting_fetcher(&calls, 2))
            .await
            .unwrap();
        assert_eq!(value, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_garbage_collection_and_clear() {
        let cache = QueryCache::new(CachePolicy {
            gc_time: Duration::ZERO,
            ..fast_policy()
        });
        cache.set(QueryKey::film(1), 1u32);
        assert_eq!(cache.collect_garbage(), 1);
        assert!(cache.is_empty());

        let cache = QueryCache::new(fast_policy());
        cache.set(QueryKey::film(1), 1u32);
        assert_eq!(cache.collect_garbage(), 0);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_type_mismatch_is_not_returned() {
        let cache = QueryCache::new(fast_policy());
        cache.set(QueryKey::film(1), 1u32);
        assert_eq!(cache.get::<String>(&QueryKey::film(1)), None);
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = CachePolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(10), Duration::from_secs(30));
    }
}
