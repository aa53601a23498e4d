// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use crate::object_store::ObjectStore;
use mudpie_common::model::{WorldError, WorldObject};
use mudpie_common::{DbRef, NOTHING};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::trace;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// An object together with a snapshot of its resolved adjacencies. Relations are held as dbref
/// edges and dereferenced back through the cache on access; compositions never nest, which is
/// what keeps A-contains-B-contains-A from recursing.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposedObject {
    pub object: WorldObject,
    pub location: DbRef,
    pub contents: Vec<DbRef>,
    pub parent: DbRef,
    /// Every referenced relation resolved at composition time. Only perfect compositions are
    /// admitted to the cache; partial ones are handed back to the caller uncached.
    pub perfect: bool,
}

impl ComposedObject {
    pub fn dbref(&self) -> DbRef {
        self.object.dbref()
    }
}

struct CacheEntry {
    composed: Arc<ComposedObject>,
    last_access: Instant,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<DbRef, CacheEntry>,
    in_flight: HashSet<DbRef>,
}

/// A bounded, sliding-expiration map of composed objects. Not authoritative: the backing store
/// is ground truth, this is a view over it.
pub struct ComposedCache {
    inner: Mutex<CacheInner>,
    settled: Condvar,
    ttl: Duration,
    capacity: usize,
}

impl Default for ComposedCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposedCache {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_CACHE_TTL, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
            settled: Condvar::new(),
            ttl,
            capacity,
        }
    }

    /// Cache hit or compose-and-admit. Sentinel references short-circuit to `None`, as does a
    /// reference no type-set claims. At most one composition per ref runs at a time; other
    /// callers wait for it and then take the cached entry.
    pub fn lookup_or_retrieve(
        &self,
        store: &ObjectStore,
        dbref: DbRef,
    ) -> Result<Option<Arc<ComposedObject>>, WorldError> {
        if !dbref.is_real() {
            return Ok(None);
        }

        {
            let mut inner = self.inner.lock().unwrap();
            loop {
                if let Some(entry) = inner.entries.get_mut(&dbref) {
                    if entry.last_access.elapsed() < self.ttl {
                        entry.last_access = Instant::now();
                        return Ok(Some(entry.composed.clone()));
                    }
                    trace!(?dbref, "composed entry expired");
                    inner.entries.remove(&dbref);
                }
                if inner.in_flight.insert(dbref) {
                    break;
                }
                inner = self.settled.wait(inner).unwrap();
            }
        }

        let result = compose(store, dbref);

        let mut inner = self.inner.lock().unwrap();
        inner.in_flight.remove(&dbref);
        self.settled.notify_all();

        if let Ok(Some(composed)) = &result
            && composed.perfect
        {
            inner.entries.insert(
                dbref,
                CacheEntry {
                    composed: composed.clone(),
                    last_access: Instant::now(),
                },
            );
            while inner.entries.len() > self.capacity {
                let Some(oldest) = inner
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.last_access)
                    .map(|(r, _)| *r)
                else {
                    break;
                };
                inner.entries.remove(&oldest);
            }
        }
        result
    }

    /// Write path: drop whatever is cached for the object and recompose from the store.
    pub fn update(&self, store: &ObjectStore, dbref: DbRef) -> Result<(), WorldError> {
        self.evict(dbref);
        self.lookup_or_retrieve(store, dbref)?;
        Ok(())
    }

    pub fn evict(&self, dbref: DbRef) {
        self.inner.lock().unwrap().entries.remove(&dbref);
    }

    #[cfg(test)]
    fn cached(&self, dbref: DbRef) -> bool {
        self.inner.lock().unwrap().entries.contains_key(&dbref)
    }
}

/// Compose a single object: load its record, probe each adjacency for existence. `NOTHING`
/// relations are vacuously resolved (an unplaced object composes perfectly).
fn compose(store: &ObjectStore, dbref: DbRef) -> Result<Option<Arc<ComposedObject>>, WorldError> {
    let object = match store.get(dbref) {
        Ok(object) => object,
        Err(WorldError::ObjectNotFound(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    let base = object.base();
    let location = base.location;
    let parent = base.parent;
    let contents: Vec<DbRef> = base.contents.iter().copied().collect();

    let mut perfect = true;
    for relation in [location, parent] {
        if relation != NOTHING && !store.exists(relation)? {
            perfect = false;
        }
    }
    for item in &contents {
        if !store.exists(*item)? {
            perfect = false;
        }
    }

    Ok(Some(Arc::new(ComposedObject {
        object,
        location,
        contents,
        parent,
        perfect,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transient::TransientStore;
    use mudpie_common::model::{ObjectCommon, Room, Thing};
    use mudpie_common::{AMBIGUOUS, FAILED_MATCH};

    fn store() -> ObjectStore {
        ObjectStore::new(Arc::new(TransientStore::new()))
    }

    fn put_room(store: &ObjectStore, name: &str) -> DbRef {
        let dbref = store.next_dbref().unwrap();
        store
            .put(&WorldObject::Room(Room {
                base: ObjectCommon::new(dbref, name, DbRef::mk(99)),
            }))
            .unwrap();
        dbref
    }

    fn put_thing_in(store: &ObjectStore, name: &str, location: DbRef) -> DbRef {
        let dbref = store.next_dbref().unwrap();
        let mut base = ObjectCommon::new(dbref, name, DbRef::mk(99));
        base.location = location;
        store.put(&WorldObject::Thing(Thing { base })).unwrap();
        let mut room = store.get(location).unwrap();
        room.base_mut().contents.insert(dbref);
        store.put(&room).unwrap();
        dbref
    }

    #[test]
    fn test_sentinels_short_circuit() {
        let store = store();
        let cache = ComposedCache::new();
        for r in [NOTHING, AMBIGUOUS, FAILED_MATCH] {
            assert!(cache.lookup_or_retrieve(&store, r).unwrap().is_none());
        }
    }

    #[test]
    fn test_perfect_composition_is_admitted() {
        let store = store();
        let cache = ComposedCache::new();
        let room = put_room(&store, "hall");
        let thing = put_thing_in(&store, "pebble", room);

        let composed = cache.lookup_or_retrieve(&store, room).unwrap().unwrap();
        assert!(composed.perfect);
        assert_eq!(composed.contents, vec![thing]);
        assert!(cache.cached(room));
    }

    #[test]
    fn test_partial_composition_is_returned_but_not_cached() {
        let store = store();
        let cache = ComposedCache::new();
        let room = put_room(&store, "hall");
        // A dangling reference in contents makes the composition imperfect.
        let mut obj = store.get(room).unwrap();
        obj.base_mut().contents.insert(DbRef::mk(999));
        store.put(&obj).unwrap();

        let composed = cache.lookup_or_retrieve(&store, room).unwrap().unwrap();
        assert!(!composed.perfect);
        assert!(!cache.cached(room));
    }

    #[test]
    fn test_unknown_ref_is_none() {
        let store = store();
        let cache = ComposedCache::new();
        assert!(
            cache
                .lookup_or_retrieve(&store, DbRef::mk(123))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_update_refreshes_view() {
        let store = store();
        let cache = ComposedCache::new();
        let room = put_room(&store, "hall");
        let composed = cache.lookup_or_retrieve(&store, room).unwrap().unwrap();
        assert_eq!(composed.object.name(), "hall");

        let mut obj = store.get(room).unwrap();
        obj.base_mut().name = "atrium".to_string();
        store.put(&obj).unwrap();
        // Stale until updated.
        let stale = cache.lookup_or_retrieve(&store, room).unwrap().unwrap();
        assert_eq!(stale.object.name(), "hall");
        cache.update(&store, room).unwrap();
        let fresh = cache.lookup_or_retrieve(&store, room).unwrap().unwrap();
        assert_eq!(fresh.object.name(), "atrium");
    }

    #[test]
    fn test_capacity_bound() {
        let store = store();
        let cache = ComposedCache::with_settings(DEFAULT_CACHE_TTL, 2);
        let a = put_room(&store, "a");
        let b = put_room(&store, "b");
        let c = put_room(&store, "c");
        for r in [a, b, c] {
            cache.lookup_or_retrieve(&store, r).unwrap();
        }
        let held = [a, b, c].iter().filter(|r| cache.cached(**r)).count();
        assert_eq!(held, 2);
    }
}
