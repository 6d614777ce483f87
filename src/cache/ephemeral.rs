//! Short-lived pending state with per-entry TTL.
//!
//! Pending joins, captcha refresh cooldowns and confirmation markers all live
//! here under typed namespaces instead of ad-hoc global maps.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::sync::Cache;

/// A typed partition of the store. Values put under a namespace can only be
/// read back as the same type.
pub struct Namespace<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Namespace<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Clone)]
struct Slot {
    value: Arc<dyn Any + Send + Sync>,
    ttl: Duration,
}

struct SlotExpiry;

impl Expiry<(&'static str, String), Slot> for SlotExpiry {
    fn expire_after_create(
        &self,
        _key: &(&'static str, String),
        value: &Slot,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &(&'static str, String),
        value: &Slot,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct EphemeralStore {
    inner: Cache<(&'static str, String), Slot>,
}

impl EphemeralStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .expire_after(SlotExpiry)
                .build(),
        }
    }

    pub fn get<T>(&self, ns: &Namespace<T>, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner
            .get(&(ns.name, key.to_string()))
            .and_then(|slot| slot.value.downcast_ref::<T>().cloned())
    }

    pub fn contains<T>(&self, ns: &Namespace<T>, key: &str) -> bool {
        self.inner.contains_key(&(ns.name, key.to_string()))
    }

    pub fn put<T>(&self, ns: &Namespace<T>, key: &str, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        self.inner.insert(
            (ns.name, key.to_string()),
            Slot {
                value: Arc::new(value),
                ttl,
            },
        );
    }

    /// Returns the removed value, if it was still live.
    pub fn delete<T>(&self, ns: &Namespace<T>, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.inner
            .remove(&(ns.name, key.to_string()))
            .and_then(|slot| slot.value.downcast_ref::<T>().cloned())
    }

    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }
}

impl std::fmt::Debug for EphemeralStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralStore")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKERS: Namespace<u32> = Namespace::new("markers");
    const LABELS: Namespace<String> = Namespace::new("labels");

    #[test]
    fn test_put_get_delete() {
        let store = EphemeralStore::new(100);
        store.put(&MARKERS, "a", 7, Duration::from_secs(60));

        assert_eq!(store.get(&MARKERS, "a"), Some(7));
        assert_eq!(store.delete(&MARKERS, "a"), Some(7));
        assert_eq!(store.get(&MARKERS, "a"), None);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let store = EphemeralStore::new(100);
        store.put(&MARKERS, "k", 1, Duration::from_secs(60));
        store.put(&LABELS, "k", "x".to_string(), Duration::from_secs(60));

        assert_eq!(store.get(&MARKERS, "k"), Some(1));
        assert_eq!(store.get(&LABELS, "k").as_deref(), Some("x"));
    }

    #[test]
    fn test_entries_expire() {
        let store = EphemeralStore::new(100);
        store.put(&MARKERS, "short", 1, Duration::from_millis(30));
        store.put(&MARKERS, "long", 2, Duration::from_secs(60));

        std::thread::sleep(Duration::from_millis(80));
        assert_eq!(store.get(&MARKERS, "short"), None);
        assert_eq!(store.get(&MARKERS, "long"), Some(2));
    }
}
