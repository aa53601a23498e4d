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

use crate::kv::{KeyValueStore, StoreError};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

/// An in-memory store with no durability. Used by tests and `--transient` runs.
#[derive(Default)]
pub struct TransientStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    kv: HashMap<String, String>,
    sets: HashMap<String, BTreeSet<String>>,
    hashes: HashMap<String, HashMap<String, String>>,
    counters: HashMap<String, i64>,
}

impl TransientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for TransientStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.lock().unwrap().kv.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .kv
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn insert(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.kv.contains_key(key) {
            return Ok(false);
        }
        inner.kv.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn replace(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.kv.contains_key(key) {
            return Ok(false);
        }
        inner.kv.insert(key.to_string(), value.to_string());
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.inner.lock().unwrap().kv.remove(key).is_some())
    }

    fn set_add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    fn set_remove(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sets
            .get_mut(set)
            .is_some_and(|s| s.remove(member)))
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sets
            .get(set)
            .is_some_and(|s| s.contains(member)))
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .sets
            .get(set)
            .map_or_else(Vec::new, |s| s.iter().cloned().collect()))
    }

    fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .hashes
            .get(hash)
            .and_then(|h| h.get(field).cloned()))
    }

    fn hash_put(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .hashes
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    fn hash_remove(&self, hash: &str, field: &str) -> Result<bool, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .hashes
            .get_mut(hash)
            .is_some_and(|h| h.remove(field).is_some()))
    }

    fn incr(&self, counter: &str) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let value = inner.counters.entry(counter.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }
}
