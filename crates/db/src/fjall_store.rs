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
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

/// Separator for composite keys in the sets and hashes partitions. Logical keys never contain
/// NUL, so `set\0member` prefix scans are unambiguous.
const SEP: u8 = 0;

/// A store backed by a Fjall keyspace, one partition per concern.
pub struct FjallStore {
    _keyspace: Keyspace,
    kv: PartitionHandle,
    sets: PartitionHandle,
    hashes: PartitionHandle,
    counters: PartitionHandle,
    // Fjall has no atomic read-modify-write, so counter bumps serialize here.
    counter_lock: Mutex<()>,
}

fn storage_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::StorageFailure(e.to_string())
}

fn retrieval_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::RetrievalFailure(e.to_string())
}

fn composite(key: &str, member: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1 + member.len());
    out.extend_from_slice(key.as_bytes());
    out.push(SEP);
    out.extend_from_slice(member.as_bytes());
    out
}

fn composite_prefix(key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 1);
    out.extend_from_slice(key.as_bytes());
    out.push(SEP);
    out
}

impl FjallStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        info!("Opening world database at {:?}", path);
        let keyspace = Config::new(path).open().map_err(storage_err)?;
        let kv = keyspace
            .open_partition("kv", PartitionCreateOptions::default())
            .map_err(storage_err)?;
        let sets = keyspace
            .open_partition("sets", PartitionCreateOptions::default())
            .map_err(storage_err)?;
        let hashes = keyspace
            .open_partition("hashes", PartitionCreateOptions::default())
            .map_err(storage_err)?;
        let counters = keyspace
            .open_partition("counters", PartitionCreateOptions::default())
            .map_err(storage_err)?;
        Ok(Self {
            _keyspace: keyspace,
            kv,
            sets,
            hashes,
            counters,
            counter_lock: Mutex::new(()),
        })
    }

    fn get_str(partition: &PartitionHandle, key: &[u8]) -> Result<Option<String>, StoreError> {
        let Some(value) = partition.get(key).map_err(retrieval_err)? else {
            return Ok(None);
        };
        let s = std::str::from_utf8(&value)
            .map_err(|e| StoreError::EncodingFailure(e.to_string()))?;
        Ok(Some(s.to_string()))
    }
}

impl KeyValueStore for FjallStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Self::get_str(&self.kv, key.as_bytes())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.kv.insert(key, value).map_err(storage_err)
    }

    fn insert(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        if self.kv.get(key).map_err(retrieval_err)?.is_some() {
            return Ok(false);
        }
        self.kv.insert(key, value).map_err(storage_err)?;
        Ok(true)
    }

    fn replace(&self, key: &str, value: &str) -> Result<bool, StoreError> {
        if self.kv.get(key).map_err(retrieval_err)?.is_none() {
            return Ok(false);
        }
        self.kv.insert(key, value).map_err(storage_err)?;
        Ok(true)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let present = self.kv.get(key).map_err(retrieval_err)?.is_some();
        if present {
            self.kv.remove(key).map_err(storage_err)?;
        }
        Ok(present)
    }

    fn set_add(&self, set: &str, member: &str) -> Result<(), StoreError> {
        self.sets
            .insert(composite(set, member), "")
            .map_err(storage_err)
    }

    fn set_remove(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        let key = composite(set, member);
        let present = self.sets.get(&key).map_err(retrieval_err)?.is_some();
        if present {
            self.sets.remove(key).map_err(storage_err)?;
        }
        Ok(present)
    }

    fn set_contains(&self, set: &str, member: &str) -> Result<bool, StoreError> {
        Ok(self
            .sets
            .get(composite(set, member))
            .map_err(retrieval_err)?
            .is_some())
    }

    fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError> {
        let prefix = composite_prefix(set);
        let mut members = Vec::new();
        for entry in self.sets.prefix(&prefix) {
            let (key, _) = entry.map_err(retrieval_err)?;
            let member = std::str::from_utf8(&key[prefix.len()..])
                .map_err(|e| StoreError::EncodingFailure(e.to_string()))?;
            members.push(member.to_string());
        }
        Ok(members)
    }

    fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError> {
        Self::get_str(&self.hashes, &composite(hash, field))
    }

    fn hash_put(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.hashes
            .insert(composite(hash, field), value)
            .map_err(storage_err)
    }

    fn hash_remove(&self, hash: &str, field: &str) -> Result<bool, StoreError> {
        let key = composite(hash, field);
        let present = self.hashes.get(&key).map_err(retrieval_err)?.is_some();
        if present {
            self.hashes.remove(key).map_err(storage_err)?;
        }
        Ok(present)
    }

    fn incr(&self, counter: &str) -> Result<i64, StoreError> {
        let _guard = self.counter_lock.lock().unwrap();
        let current = match self.counters.get(counter).map_err(retrieval_err)? {
            Some(bytes) => {
                let raw: [u8; 8] = bytes[0..8]
                    .try_into()
                    .map_err(|_| StoreError::EncodingFailure("bad counter record".into()))?;
                i64::from_le_bytes(raw)
            }
            None => 0,
        };
        let next = current + 1;
        self.counters
            .insert(counter, next.to_le_bytes())
            .map_err(storage_err)?;
        Ok(next)
    }
}
