//! Single-flight loading cache.
//!
//! Concurrent lookups of a cold key share one in-flight loader; the first
//! caller runs it and everyone else awaits the same result.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use moka::future::Cache;
use moka::policy::EvictionPolicy;

use super::CacheConfig;

pub struct LoadingCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Cache<K, V>,
    name: Arc<str>,
}

impl<K, V> Clone for LoadingCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> LoadingCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Cache with Moka's default admission policy (TinyLFU).
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        Self::build(name, config, EvictionPolicy::tiny_lfu())
    }

    /// Cache that evicts the least recently used entry when full.
    pub fn lru(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        Self::build(name, config, EvictionPolicy::lru())
    }

    fn build(name: impl Into<Arc<str>>, config: CacheConfig, policy: EvictionPolicy) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_capacity)
            .eviction_policy(policy);

        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        if let Some(tti) = config.tti {
            builder = builder.time_to_idle(tti);
        }

        Self {
            inner: builder.build(),
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the cached value or run `load` once for all concurrent callers.
    ///
    /// Errors are not cached; the next call retries the loader.
    pub async fn get_or_load<F, E>(&self, key: K, load: F) -> Result<V, Arc<E>>
    where
        F: Future<Output = Result<V, E>>,
        E: Send + Sync + 'static,
    {
        self.inner.try_get_with(key, load).await
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value).await;
    }

    pub async fn invalidate(&self, key: &K) {
        self.inner.invalidate(key).await;
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub async fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks().await;
    }

    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_loads_share_one_call() {
        let cache: LoadingCache<i64, u32> = LoadingCache::new("test", CacheConfig::default());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_load(1, async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, std::io::Error>(42)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let cache: LoadingCache<i64, u32> = LoadingCache::new("test", CacheConfig::default());

        let first = cache
            .get_or_load(7, async { Err::<u32, _>(std::io::Error::other("down")) })
            .await;
        assert!(first.is_err());

        let second = cache.get_or_load(7, async { Ok::<_, std::io::Error>(3) }).await;
        assert_eq!(second.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let cache: LoadingCache<i64, u32> = LoadingCache::new("test", CacheConfig::default());
        cache.insert(1, 10).await;
        cache.invalidate(&1).await;

        let value = cache.get_or_load(1, async { Ok::<_, std::io::Error>(11) }).await;
        assert_eq!(value.unwrap(), 11);
    }
}
