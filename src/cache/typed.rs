//! Read-through cache in front of the persistent store.

use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;

use moka::sync::Cache;
use tracing::trace;

use super::CacheConfig;

/// Named Moka cache holding store records.
///
/// Repositories write through it and read with [`TypedCache::get_or_load`];
/// clones share the same entries.
pub struct TypedCache<K, V> {
    inner: Cache<K, V>,
    name: Arc<str>,
}

impl<K, V> Clone for TypedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            name: Arc::clone(&self.name),
        }
    }
}

impl<K, V> TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Arc<str>>, config: CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
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

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key)
    }

    pub fn insert(&self, key: K, value: V) {
        self.inner.insert(key, value);
    }

    pub fn invalidate(&self, key: &K) {
        self.inner.invalidate(key);
    }

    /// Cached value for `key`, otherwise the result of `load`, which is
    /// cached on success. Concurrent misses may both load; the last write
    /// wins, which is fine for records the store owns.
    pub async fn get_or_load<E, F, Fut>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.inner.get(&key) {
            return Ok(value);
        }
        trace!(cache = %self.name, "miss");
        let value = load().await?;
        self.inner.insert(key, value.clone());
        Ok(value)
    }

    /// May lag behind concurrent writes until maintenance runs.
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_load_caches_success_only() {
        let cache: TypedCache<i64, String> = TypedCache::new("settings", CacheConfig::chat_settings());

        let failed: Result<String, &str> = cache.get_or_load(1, || async { Err("down") }).await;
        assert!(failed.is_err());
        assert!(cache.get(&1).is_none());

        let loaded: Result<String, &str> =
            cache.get_or_load(1, || async { Ok("stored".to_string()) }).await;
        assert_eq!(loaded.as_deref(), Ok("stored"));

        // served from cache, loader not consulted
        let cached: Result<String, &str> = cache.get_or_load(1, || async { Err("unused") }).await;
        assert_eq!(cached.as_deref(), Ok("stored"));
    }
}
