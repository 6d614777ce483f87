//! Cache registry - Central management for all caches.

use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, error, info};

use super::{CacheConfig, TypedCache};

/// Type-erased view over a registered cache.
trait RegisteredCache: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn run_pending_tasks(&self);
    fn entry_count(&self) -> u64;
    fn type_name(&self) -> &'static str;
}

impl<K, V> RegisteredCache for TypedCache<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn run_pending_tasks(&self) {
        TypedCache::run_pending_tasks(self);
    }

    fn entry_count(&self) -> u64 {
        TypedCache::entry_count(self)
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Central registry of named caches.
///
/// Repositories obtain their caches by name, so two repositories asking for
/// the same name share one cache. The registry also drives periodic
/// maintenance of every cache it knows about.
#[derive(Clone, Default)]
pub struct CacheRegistry {
    caches: Arc<RwLock<HashMap<String, Box<dyn RegisteredCache>>>>,
}

impl CacheRegistry {
    pub fn new() -> Self {
        info!("Cache registry initialized");
        Self::default()
    }

    /// Get an existing cache or create a new one if it doesn't exist.
    ///
    /// A name already registered with different key/value types yields a
    /// detached cache and an error log instead of sharing the wrong type.
    pub fn get_or_create<K, V>(&self, name: &str, config: CacheConfig) -> TypedCache<K, V>
    where
        K: Hash + Eq + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        if let Some(existing) = self.caches.read().get(name) {
            return match existing.as_any().downcast_ref::<TypedCache<K, V>>() {
                Some(cache) => cache.clone(),
                None => {
                    error!(
                        "Cache '{}' already registered as {}, creating detached {}",
                        name,
                        existing.type_name(),
                        std::any::type_name::<TypedCache<K, V>>()
                    );
                    TypedCache::new(name, config)
                }
            };
        }

        let mut caches = self.caches.write();
        if let Some(cache) = caches
            .get(name)
            .and_then(|c| c.as_any().downcast_ref::<TypedCache<K, V>>())
        {
            return cache.clone();
        }

        debug!("Creating cache: {}", name);
        let cache = TypedCache::<K, V>::new(name, config);
        caches.insert(name.to_string(), Box::new(cache.clone()));
        cache
    }

    /// Run eviction maintenance on every registered cache.
    pub fn run_pending_tasks(&self) {
        for cache in self.caches.read().values() {
            cache.run_pending_tasks();
        }
    }

    /// Total entries across all caches, keyed by cache name.
    pub fn entry_counts(&self) -> Vec<(String, u64)> {
        let mut counts: Vec<_> = self
            .caches
            .read()
            .iter()
            .map(|(name, cache)| (name.clone(), cache.entry_count()))
            .collect();
        counts.sort();
        counts
    }
}

impl std::fmt::Debug for CacheRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let caches = self.caches.read();
        f.debug_struct("CacheRegistry")
            .field("cache_count", &caches.len())
            .field("cache_names", &caches.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_name_shares_cache() {
        let registry = CacheRegistry::new();
        let a: TypedCache<i64, String> = registry.get_or_create("names", CacheConfig::default());
        let b: TypedCache<i64, String> = registry.get_or_create("names", CacheConfig::default());

        a.insert(1, "one".to_string());
        assert_eq!(b.get(&1).as_deref(), Some("one"));
    }

    #[test]
    fn test_type_mismatch_is_detached() {
        let registry = CacheRegistry::new();
        let a: TypedCache<i64, String> = registry.get_or_create("mixed", CacheConfig::default());
        let b: TypedCache<i64, u32> = registry.get_or_create("mixed", CacheConfig::default());

        a.insert(1, "one".to_string());
        b.insert(1, 1);
        assert_eq!(a.get(&1).as_deref(), Some("one"));
        assert_eq!(registry.entry_counts().len(), 1);
    }
}
