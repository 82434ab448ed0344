use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tracing::trace;

use crate::{CacheBackend, CacheEntry, CacheError, CacheResult};

/// Process-local in-memory cache client.
///
/// Stores `serde_json::Value`s so it can hold whatever an application puts in
/// a dynamic cache. Entries expire after their timeout (or the configured
/// default) and are dropped lazily on access. With an entry limit, the least
/// recently used entry is evicted to make room.
///
/// # Thread Safety
///
/// The map and the recency queue live behind one `parking_lot::Mutex`, so
/// reads that bump recency and writes never interleave.
///
/// # Examples
///
/// ```
/// use cache_panel_core::{CacheBackend, LocMemCache};
/// use serde_json::json;
/// use std::time::Duration;
///
/// let cache = LocMemCache::builder()
///     .default_timeout(Duration::from_secs(300))
///     .max_entries(2)
///     .build();
///
/// cache.set("a", json!(1), None).unwrap();
/// cache.set("b", json!(2), None).unwrap();
/// cache.get("a", None).unwrap();           // "a" is now most recent
/// cache.set("c", json!(3), None).unwrap(); // evicts "b"
///
/// assert!(cache.has_key("a").unwrap());
/// assert!(!cache.has_key("b").unwrap());
/// assert_eq!(cache.incr("c", 4).unwrap(), 7);
/// ```
#[derive(Debug, Default)]
pub struct LocMemCache {
    store: Mutex<Store>,
    default_timeout: Option<Duration>,
    max_entries: Option<usize>,
}

#[derive(Debug, Default)]
struct Store {
    map: HashMap<String, CacheEntry<Value>>,
    order: VecDeque<String>,
}

/// Options for [`LocMemCache`].
#[derive(Debug, Default, Clone)]
pub struct LocMemBuilder {
    default_timeout: Option<Duration>,
    max_entries: Option<usize>,
}

impl LocMemBuilder {
    /// Expiry applied when a call passes no timeout.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Maximum number of stored entries; the least recently used one is
    /// evicted to make room. A limit of `0` stores nothing.
    pub fn max_entries(mut self, limit: usize) -> Self {
        self.max_entries = Some(limit);
        self
    }

    /// Creates the configured cache.
    pub fn build(self) -> LocMemCache {
        LocMemCache {
            store: Mutex::new(Store::default()),
            default_timeout: self.default_timeout,
            max_entries: self.max_entries,
        }
    }
}

impl Store {
    /// Live entry for `key`, purging it first if it has expired.
    fn live(&mut self, key: &str) -> Option<&mut CacheEntry<Value>> {
        if self.map.get(key).is_some_and(CacheEntry::is_expired) {
            trace!(key, "dropping expired entry");
            self.remove(key);
        }
        self.map.get_mut(key)
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
            self.order.push_back(key.to_string());
        }
    }

    fn remove(&mut self, key: &str) -> bool {
        if let Some(pos) = self.order.iter().position(|k| k == key) {
            self.order.remove(pos);
        }
        self.map.remove(key).is_some()
    }

    /// Stores `entry`, evicting to stay within `limit`. Returns whether it
    /// was stored.
    fn insert(&mut self, key: &str, entry: CacheEntry<Value>, limit: Option<usize>) -> bool {
        if self.map.contains_key(key) {
            self.map.insert(key.to_string(), entry);
            self.touch(key);
            return true;
        }

        if let Some(limit) = limit {
            while self.map.len() >= limit {
                match self.order.pop_front() {
                    // skip keys already gone from the map
                    Some(evicted) => {
                        if self.map.remove(&evicted).is_some() {
                            trace!(key = %evicted, "evicting least recently used entry");
                        }
                    }
                    None => break,
                }
            }
            if limit == 0 {
                trace!(key, "entry limit is zero, not storing");
                return false;
            }
        }

        self.map.insert(key.to_string(), entry);
        self.order.push_back(key.to_string());
        true
    }
}

impl LocMemCache {
    /// Creates an unbounded cache whose entries never expire by default.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_panel_core::LocMemCache;
    ///
    /// let cache = LocMemCache::new();
    /// assert!(cache.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts configuring a cache with a default timeout or an entry limit.
    ///
    /// # Examples
    ///
    /// ```
    /// use cache_panel_core::LocMemCache;
    /// use std::time::Duration;
    ///
    /// let cache = LocMemCache::builder()
    ///     .default_timeout(Duration::from_secs(60))
    ///     .max_entries(1000)
    ///     .build();
    /// assert_eq!(cache.len(), 0);
    /// ```
    pub fn builder() -> LocMemBuilder {
        LocMemBuilder::default()
    }

    /// Number of stored entries, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.store.lock().map.len()
    }

    /// Returns `true` when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, value: Value, timeout: Option<Duration>) -> CacheEntry<Value> {
        CacheEntry::new(value, timeout.or(self.default_timeout))
    }

    fn adjust(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let mut store = self.store.lock();
        let entry = store
            .live(key)
            .ok_or_else(|| CacheError::KeyNotFound(key.to_string()))?;
        let current = entry
            .value
            .as_i64()
            .ok_or_else(|| CacheError::NotAnInteger(key.to_string()))?;
        let updated = current
            .checked_add(delta)
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        entry.replace(Value::from(updated));
        store.touch(key);
        Ok(updated)
    }
}

impl CacheBackend for LocMemCache {
    type Value = Value;

    fn add(&self, key: &str, value: Value, timeout: Option<Duration>) -> CacheResult<bool> {
        let mut store = self.store.lock();
        if store.live(key).is_some() {
            return Ok(false);
        }
        Ok(store.insert(key, self.entry(value, timeout), self.max_entries))
    }

    fn get(&self, key: &str, default: Option<Value>) -> CacheResult<Option<Value>> {
        let mut store = self.store.lock();
        let found = store.live(key).map(|entry| entry.value.clone());
        match found {
            Some(value) => {
                store.touch(key);
                Ok(Some(value))
            }
            None => Ok(default),
        }
    }

    fn set(&self, key: &str, value: Value, timeout: Option<Duration>) -> CacheResult<()> {
        let entry = self.entry(value, timeout);
        self.store.lock().insert(key, entry, self.max_entries);
        Ok(())
    }

    fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut store = self.store.lock();
        let existed = store.live(key).is_some();
        store.remove(key);
        Ok(existed)
    }

    fn get_many(&self, keys: &[&str]) -> CacheResult<BTreeMap<String, Value>> {
        let mut store = self.store.lock();
        let mut found = BTreeMap::new();
        for &key in keys {
            if let Some(entry) = store.live(key) {
                found.insert(key.to_string(), entry.value.clone());
                store.touch(key);
            }
        }
        Ok(found)
    }

    fn set_many(
        &self,
        entries: BTreeMap<String, Value>,
        timeout: Option<Duration>,
    ) -> CacheResult<Vec<String>> {
        let mut store = self.store.lock();
        let mut rejected = Vec::new();
        for (key, value) in entries {
            let entry = self.entry(value, timeout);
            if !store.insert(&key, entry, self.max_entries) {
                rejected.push(key);
            }
        }
        Ok(rejected)
    }

    fn delete_many(&self, keys: &[&str]) -> CacheResult<()> {
        let mut store = self.store.lock();
        for &key in keys {
            store.remove(key);
        }
        Ok(())
    }

    fn incr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        self.adjust(key, delta)
    }

    fn decr(&self, key: &str, delta: i64) -> CacheResult<i64> {
        let delta = delta
            .checked_neg()
            .ok_or_else(|| CacheError::Overflow(key.to_string()))?;
        self.adjust(key, delta)
    }

    fn has_key(&self, key: &str) -> CacheResult<bool> {
        Ok(self.store.lock().live(key).is_some())
    }

    fn clear(&self) -> CacheResult<()> {
        let mut store = self.store.lock();
        store.map.clear();
        store.order.clear();
        Ok(())
    }
}
