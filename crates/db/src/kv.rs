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

use mudpie_common::model::WorldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage failure: {0}")]
    StorageFailure(String),
    #[error("Retrieval failure: {0}")]
    RetrievalFailure(String),
    #[error("Encoding failure: {0}")]
    EncodingFailure(String),
}

impl From<StoreError> for WorldError {
    fn from(e: StoreError) -> Self {
        WorldError::Database(e.to_string())
    }
}

/// The minimum capabilities the persistence backend must provide: plain values, membership
/// sets, hash fields, and an atomically incremented counter, all keyed by logical paths. The
/// backend is ground truth; everything above it is a view.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set the value at `key`, creating or overwriting.
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Add a value only if `key` is absent; `false` when it already exists.
    fn insert(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    /// Overwrite only if `key` is present; `false` when it does not exist.
    fn replace(&self, key: &str, value: &str) -> Result<bool, StoreError>;

    fn remove(&self, key: &str) -> Result<bool, StoreError>;

    fn set_add(&self, set: &str, member: &str) -> Result<(), StoreError>;
    fn set_remove(&self, set: &str, member: &str) -> Result<bool, StoreError>;
    fn set_contains(&self, set: &str, member: &str) -> Result<bool, StoreError>;
    fn set_members(&self, set: &str) -> Result<Vec<String>, StoreError>;

    fn hash_get(&self, hash: &str, field: &str) -> Result<Option<String>, StoreError>;
    fn hash_put(&self, hash: &str, field: &str, value: &str) -> Result<(), StoreError>;
    fn hash_remove(&self, hash: &str, field: &str) -> Result<bool, StoreError>;

    /// Increment and return the named counter; the first increment yields 1.
    fn incr(&self, counter: &str) -> Result<i64, StoreError>;
}
