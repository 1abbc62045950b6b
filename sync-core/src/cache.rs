//! Resource cache for ordsync.
//!
//! This module provides a per-location store of entries that:
//! - Keeps device order through a monotonic index per entry
//! - Hands out deep copies, so callers cannot corrupt cached state
//! - Comes in two interchangeable strategies ([`LocationCache`] and
//!   [`NoOpCache`]) behind the [`CacheManager`] trait
//!
//! # Synchronization
//!
//! Nothing in here locks. The owner wraps the cache in a single mutex and
//! holds it across every check-then-act sequence ("is it initialized? then
//! get, then maybe put").

use ordsync_types::NamedEntity;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use thiserror::Error;

/// Error type for cache operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The normalizer did not yield exactly one copy of the entry.
    ///
    /// This points at a broken normalizer, not at a transient fault.
    #[error("deep copy of {name} produced {produced} entries instead of one")]
    DeepCopyFailed {
        /// Name of the entry being copied.
        name: String,
        /// How many entries the round trip produced.
        produced: usize,
    },

    /// The normalizer failed to serialize or deserialize the entry.
    #[error("deep copy of {name} failed: {reason}")]
    Normalization {
        /// Name of the entry being copied.
        name: String,
        /// Underlying serializer message.
        reason: String,
    },
}

/// Produces detached copies of entries for the cache's read path.
///
/// A normalizer serializes an entry and reads it back, yielding every entry
/// the round trip produced. Anything other than exactly one entry is a
/// [`CacheError::DeepCopyFailed`].
pub trait Normalizer<E>: Send + Sync {
    /// Round-trip `entry` into fresh values.
    fn normalize(&self, entry: &E) -> Result<Vec<E>, CacheError>;
}

/// Copies entries with their `Clone` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CloneNormalizer;

impl<E: Clone> Normalizer<E> for CloneNormalizer {
    fn normalize(&self, entry: &E) -> Result<Vec<E>, CacheError> {
        Ok(vec![entry.clone()])
    }
}

/// Copies entries through a JSON serialize/deserialize round trip.
///
/// Slower than [`CloneNormalizer`], but guarantees no shared state survives
/// even for entries holding reference-counted internals.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonNormalizer;

impl<E: NamedEntity + Serialize + DeserializeOwned> Normalizer<E> for JsonNormalizer {
    fn normalize(&self, entry: &E) -> Result<Vec<E>, CacheError> {
        let failed = |e: serde_json::Error| CacheError::Normalization {
            name: entry.name().to_string(),
            reason: e.to_string(),
        };
        let value = serde_json::to_value([entry]).map_err(failed)?;
        serde_json::from_value(value).map_err(failed)
    }
}

/// A cached entry tagged with its position in device order.
#[derive(Debug, Clone)]
pub struct CachedEntry<E> {
    /// The stored entry.
    pub entry: E,
    /// Position in device order; unique within a location.
    pub state_idx: usize,
}

/// Everything cached for one location.
#[derive(Debug, Clone)]
pub struct LocationCacheEntry<E> {
    entries: HashMap<String, CachedEntry<E>>,
    initialized: bool,
    next_idx: usize,
}

impl<E> Default for LocationCacheEntry<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            initialized: false,
            next_idx: 0,
        }
    }
}

impl<E> LocationCacheEntry<E> {
    /// Whether the full entry set for this location has been stored.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is cached for this location.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Common interface of the caching strategies.
///
/// Callers synchronize; implementations never lock.
pub trait CacheManager<E>: Send {
    /// Whether this strategy actually stores anything.
    fn is_caching_enabled(&self) -> bool;

    /// Whether `location` holds a complete entry set.
    fn is_initialized(&self, location: &str) -> bool;

    /// Store the complete entry set for `location`, in device order.
    ///
    /// Replaces whatever was cached for the location before.
    fn set_initialized(&mut self, location: &str, entries: Vec<E>) -> Result<(), CacheError>;

    /// Copy of one cached entry.
    fn get(&self, location: &str, name: &str) -> Result<Option<E>, CacheError>;

    /// Copies of every cached entry in device order.
    ///
    /// Returns `None` unless the location is initialized.
    fn get_all(&self, location: &str) -> Result<Option<Vec<E>>, CacheError>;

    /// Insert or replace one entry.
    ///
    /// New names go to the end of device order; known names keep their slot.
    fn put(&mut self, location: &str, entry: E) -> Result<(), CacheError>;

    /// Drop one entry, leaving the rest of the location intact.
    fn delete(&mut self, location: &str, name: &str);

    /// Drop everything cached for `location`.
    fn invalidate(&mut self, location: &str);

    /// Drop the whole cache.
    fn clear(&mut self);
}

/// Caching strategy that keeps entries per location.
pub struct LocationCache<E, N = CloneNormalizer> {
    locations: HashMap<String, LocationCacheEntry<E>>,
    normalizer: N,
}

impl<E> LocationCache<E, CloneNormalizer> {
    /// Create an empty cache that copies with `Clone`.
    pub fn new() -> Self {
        Self::with_normalizer(CloneNormalizer)
    }
}

impl<E> Default for LocationCache<E, CloneNormalizer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E, N> LocationCache<E, N> {
    /// Create an empty cache that copies through `normalizer`.
    pub fn with_normalizer(normalizer: N) -> Self {
        Self {
            locations: HashMap::new(),
            normalizer,
        }
    }

    /// Raw view of a location, for diagnostics.
    pub fn location(&self, location: &str) -> Option<&LocationCacheEntry<E>> {
        self.locations.get(location)
    }
}

impl<E: NamedEntity, N: Normalizer<E>> LocationCache<E, N> {
    fn copy(&self, entry: &E) -> Result<E, CacheError> {
        let mut copies = self.normalizer.normalize(entry)?;
        if copies.len() != 1 {
            return Err(CacheError::DeepCopyFailed {
                name: entry.name().to_string(),
                produced: copies.len(),
            });
        }
        Ok(copies.remove(0))
    }
}

impl<E, N> CacheManager<E> for LocationCache<E, N>
where
    E: NamedEntity + Send,
    N: Normalizer<E>,
{
    fn is_caching_enabled(&self) -> bool {
        true
    }

    fn is_initialized(&self, location: &str) -> bool {
        self.locations
            .get(location)
            .is_some_and(|loc| loc.initialized)
    }

    fn set_initialized(&mut self, location: &str, entries: Vec<E>) -> Result<(), CacheError> {
        let mut loc = LocationCacheEntry::default();
        for (state_idx, entry) in entries.into_iter().enumerate() {
            loc.entries
                .insert(entry.name().to_string(), CachedEntry { entry, state_idx });
        }
        loc.next_idx = loc
            .entries
            .values()
            .map(|c| c.state_idx + 1)
            .max()
            .unwrap_or(0);
        loc.initialized = true;
        self.locations.insert(location.to_string(), loc);
        Ok(())
    }

    fn get(&self, location: &str, name: &str) -> Result<Option<E>, CacheError> {
        match self
            .locations
            .get(location)
            .and_then(|loc| loc.entries.get(name))
        {
            Some(cached) => self.copy(&cached.entry).map(Some),
            None => Ok(None),
        }
    }

    fn get_all(&self, location: &str) -> Result<Option<Vec<E>>, CacheError> {
        let Some(loc) = self.locations.get(location) else {
            return Ok(None);
        };
        if !loc.initialized {
            return Ok(None);
        }

        let mut cached: Vec<&CachedEntry<E>> = loc.entries.values().collect();
        cached.sort_by_key(|c| c.state_idx);
        cached
            .into_iter()
            .map(|c| self.copy(&c.entry))
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    fn put(&mut self, location: &str, entry: E) -> Result<(), CacheError> {
        let loc = self.locations.entry(location.to_string()).or_default();
        let name = entry.name().to_string();
        match loc.entries.get_mut(&name) {
            Some(cached) => cached.entry = entry,
            None => {
                let state_idx = loc.next_idx;
                loc.next_idx += 1;
                loc.entries.insert(name, CachedEntry { entry, state_idx });
            }
        }
        Ok(())
    }

    fn delete(&mut self, location: &str, name: &str) {
        if let Some(loc) = self.locations.get_mut(location) {
            loc.entries.remove(name);
        }
    }

    fn invalidate(&mut self, location: &str) {
        self.locations.remove(location);
    }

    fn clear(&mut self) {
        self.locations.clear();
    }
}

/// Caching strategy that stores nothing.
///
/// Lets callers stay agnostic of whether caching is switched on.
pub struct NoOpCache<E> {
    _entry: PhantomData<fn() -> E>,
}

impl<E> NoOpCache<E> {
    /// Create the passthrough cache.
    pub fn new() -> Self {
        Self {
            _entry: PhantomData,
        }
    }
}

impl<E> Default for NoOpCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> CacheManager<E> for NoOpCache<E> {
    fn is_caching_enabled(&self) -> bool {
        false
    }

    fn is_initialized(&self, _location: &str) -> bool {
        false
    }

    fn set_initialized(&mut self, _location: &str, _entries: Vec<E>) -> Result<(), CacheError> {
        Ok(())
    }

    fn get(&self, _location: &str, _name: &str) -> Result<Option<E>, CacheError> {
        Ok(None)
    }

    fn get_all(&self, _location: &str) -> Result<Option<Vec<E>>, CacheError> {
        Ok(None)
    }

    fn put(&mut self, _location: &str, _entry: E) -> Result<(), CacheError> {
        Ok(())
    }

    fn delete(&mut self, _location: &str, _name: &str) {}

    fn invalidate(&mut self, _location: &str) {}

    fn clear(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Address {
        name: String,
        value: String,
    }

    impl NamedEntity for Address {
        fn name(&self) -> &str {
            &self.name
        }
    }

    fn addr(name: &str, value: &str) -> Address {
        Address {
            name: name.into(),
            value: value.into(),
        }
    }

    fn names(entries: &[Address]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    const LOC: &str = "fw1:/config/address";

    // ===========================================
    // Initialization and ordering
    // ===========================================

    #[test]
    fn starts_uninitialized() {
        let cache: LocationCache<Address> = LocationCache::new();
        assert!(cache.is_caching_enabled());
        assert!(!cache.is_initialized(LOC));
        assert_eq!(cache.get_all(LOC).unwrap(), None);
    }

    #[test]
    fn get_all_keeps_device_order() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache
            .set_initialized(LOC, vec![addr("c", "3"), addr("a", "1"), addr("b", "2")])
            .unwrap();

        assert!(cache.is_initialized(LOC));
        let all = cache.get_all(LOC).unwrap().unwrap();
        assert_eq!(names(&all), ["c", "a", "b"]);
    }

    #[test]
    fn put_new_name_appends() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache
            .set_initialized(LOC, vec![addr("c", "3"), addr("a", "1")])
            .unwrap();
        cache.put(LOC, addr("0-first-alphabetically", "0")).unwrap();

        let all = cache.get_all(LOC).unwrap().unwrap();
        assert_eq!(names(&all), ["c", "a", "0-first-alphabetically"]);
    }

    #[test]
    fn put_known_name_keeps_slot() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache
            .set_initialized(LOC, vec![addr("c", "3"), addr("a", "1"), addr("b", "2")])
            .unwrap();
        cache.put(LOC, addr("c", "33")).unwrap();

        let all = cache.get_all(LOC).unwrap().unwrap();
        assert_eq!(names(&all), ["c", "a", "b"]);
        assert_eq!(all[0].value, "33");
    }

    #[test]
    fn put_after_delete_does_not_reuse_index() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache
            .set_initialized(LOC, vec![addr("a", "1"), addr("b", "2")])
            .unwrap();
        cache.delete(LOC, "b");
        cache.put(LOC, addr("c", "3")).unwrap();
        cache.put(LOC, addr("b", "2")).unwrap();

        let all = cache.get_all(LOC).unwrap().unwrap();
        assert_eq!(names(&all), ["a", "c", "b"]);
    }

    #[test]
    fn put_creates_location_lazily_but_uninitialized() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache.put(LOC, addr("a", "1")).unwrap();

        assert!(!cache.is_initialized(LOC));
        assert_eq!(cache.get(LOC, "a").unwrap(), Some(addr("a", "1")));
        assert_eq!(cache.get_all(LOC).unwrap(), None);
        assert_eq!(cache.location(LOC).map(|l| l.len()), Some(1));
    }

    // ===========================================
    // Isolation
    // ===========================================

    #[test]
    fn mutating_a_fetched_entry_does_not_leak() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();

        let mut fetched = cache.get(LOC, "a").unwrap().unwrap();
        fetched.value = "tampered".into();

        assert_eq!(cache.get(LOC, "a").unwrap().unwrap().value, "1");
    }

    #[test]
    fn mutating_get_all_result_does_not_leak() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();

        let mut all = cache.get_all(LOC).unwrap().unwrap();
        all[0].value = "tampered".into();

        assert_eq!(cache.get(LOC, "a").unwrap().unwrap().value, "1");
    }

    #[test]
    fn json_normalizer_copies() {
        let mut cache: LocationCache<Address, _> = LocationCache::with_normalizer(JsonNormalizer);
        cache
            .set_initialized(LOC, vec![addr("b", "2"), addr("a", "1")])
            .unwrap();

        let all = cache.get_all(LOC).unwrap().unwrap();
        assert_eq!(all, vec![addr("b", "2"), addr("a", "1")]);
    }

    struct Duplicating;

    impl Normalizer<Address> for Duplicating {
        fn normalize(&self, entry: &Address) -> Result<Vec<Address>, CacheError> {
            Ok(vec![entry.clone(), entry.clone()])
        }
    }

    #[test]
    fn broken_normalizer_is_a_hard_error() {
        let mut cache: LocationCache<Address, _> = LocationCache::with_normalizer(Duplicating);
        cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();

        let err = cache.get(LOC, "a").unwrap_err();
        assert_eq!(
            err,
            CacheError::DeepCopyFailed {
                name: "a".into(),
                produced: 2
            }
        );
        assert!(cache.get_all(LOC).is_err());
    }

    // ===========================================
    // Lifecycle
    // ===========================================

    #[test]
    fn invalidate_drops_only_that_location() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();
        cache.set_initialized("other", vec![addr("b", "2")]).unwrap();

        cache.invalidate(LOC);

        assert!(!cache.is_initialized(LOC));
        assert_eq!(cache.get(LOC, "a").unwrap(), None);
        assert!(cache.is_initialized("other"));
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();
        cache.set_initialized("other", vec![addr("b", "2")]).unwrap();

        cache.clear();

        assert!(!cache.is_initialized(LOC));
        assert!(!cache.is_initialized("other"));
    }

    #[test]
    fn set_initialized_replaces_previous_contents() {
        let mut cache: LocationCache<Address> = LocationCache::new();
        cache
            .set_initialized(LOC, vec![addr("a", "1"), addr("b", "2")])
            .unwrap();
        cache.set_initialized(LOC, vec![addr("c", "3")]).unwrap();

        let all = cache.get_all(LOC).unwrap().unwrap();
        assert_eq!(names(&all), ["c"]);
    }

    // ===========================================
    // Passthrough strategy
    // ===========================================

    #[test]
    fn noop_cache_never_hits() {
        let mut cache: NoOpCache<Address> = NoOpCache::new();
        assert!(!cache.is_caching_enabled());

        cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();
        cache.put(LOC, addr("b", "2")).unwrap();

        assert!(!cache.is_initialized(LOC));
        assert_eq!(cache.get(LOC, "a").unwrap(), None);
        assert_eq!(cache.get_all(LOC).unwrap(), None);
    }

    #[test]
    fn strategies_are_interchangeable_behind_the_trait() {
        let strategies: Vec<Box<dyn CacheManager<Address>>> =
            vec![Box::new(LocationCache::new()), Box::new(NoOpCache::new())];
        for mut cache in strategies {
            cache.set_initialized(LOC, vec![addr("a", "1")]).unwrap();
            let hit = cache.get(LOC, "a").unwrap().is_some();
            assert_eq!(hit, cache.is_caching_enabled());
        }
    }
}
