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

use crate::kv::KeyValueStore;
use mudpie_common::DbRef;
use mudpie_common::model::{ObjectKind, WorldError, WorldObject};
use std::sync::Arc;
use strum::IntoEnumIterator;

/// Namespace prefix for every key this application owns in the backend.
pub const NAMESPACE: &str = "mudpie";

/// Typed CRUD over the KV backend: per-object records, per-type membership sets, the dbref
/// counter and the username hash. Key naming follows the `<app>::<type>:<dbref>` convention.
#[derive(Clone)]
pub struct ObjectStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ObjectStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    fn record_key(kind: ObjectKind, dbref: DbRef) -> String {
        format!("{NAMESPACE}::{}:{}", kind.record_segment(), dbref.to_literal())
    }

    fn set_key(kind: ObjectKind) -> String {
        format!("{NAMESPACE}::{}", kind.set_segment())
    }

    fn counter_key() -> String {
        format!("{NAMESPACE}::dbref:counter")
    }

    fn usernames_key() -> String {
        format!("{NAMESPACE}::usernames")
    }

    /// Allocate the next reference from the persistent counter. Strictly monotonic across
    /// concurrent callers.
    pub fn next_dbref(&self) -> Result<DbRef, WorldError> {
        Ok(DbRef::mk(self.kv.incr(&Self::counter_key())?))
    }

    /// Which type-set claims the reference, if any. Retrieval dispatches on the first set that
    /// claims it.
    pub fn kind_of(&self, dbref: DbRef) -> Result<Option<ObjectKind>, WorldError> {
        if !dbref.is_real() {
            return Ok(None);
        }
        let literal = dbref.to_literal();
        for kind in ObjectKind::iter() {
            if self.kv.set_contains(&Self::set_key(kind), &literal)? {
                return Ok(Some(kind));
            }
        }
        Ok(None)
    }

    pub fn exists(&self, dbref: DbRef) -> Result<bool, WorldError> {
        Ok(self.kind_of(dbref)?.is_some())
    }

    /// Polymorphic load.
    pub fn get(&self, dbref: DbRef) -> Result<WorldObject, WorldError> {
        let kind = self
            .kind_of(dbref)?
            .ok_or(WorldError::ObjectNotFound(dbref))?;
        let json = self
            .kv
            .get(&Self::record_key(kind, dbref))?
            .ok_or(WorldError::ObjectNotFound(dbref))?;
        serde_json::from_str(&json).map_err(|e| {
            WorldError::Database(format!("corrupt record for {}: {e}", dbref.to_literal()))
        })
    }

    /// Per-type write: membership set, record, and for players the username mapping. Idempotent.
    pub fn put(&self, obj: &WorldObject) -> Result<(), WorldError> {
        let kind = obj.kind();
        let dbref = obj.dbref();
        let json = serde_json::to_string(obj).map_err(|e| {
            WorldError::Database(format!("could not encode {}: {e}", dbref.to_literal()))
        })?;
        self.kv.set_add(&Self::set_key(kind), &dbref.to_literal())?;
        self.kv.put(&Self::record_key(kind, dbref), &json)?;
        if let WorldObject::Player(player) = obj {
            self.kv.hash_put(
                &Self::usernames_key(),
                &player.username.to_lowercase(),
                &dbref.to_literal(),
            )?;
        }
        Ok(())
    }

    /// Look a player reference up by (case-insensitive) username.
    pub fn player_dbref(&self, username: &str) -> Result<Option<DbRef>, WorldError> {
        let Some(literal) = self
            .kv
            .hash_get(&Self::usernames_key(), &username.to_lowercase())?
        else {
            return Ok(None);
        };
        literal
            .parse::<DbRef>()
            .map(Some)
            .map_err(|e| WorldError::Database(format!("corrupt username mapping: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transient::TransientStore;
    use mudpie_common::model::{ObjectCommon, Player, Thing};
    use pretty_assertions::assert_eq;

    fn store() -> ObjectStore {
        ObjectStore::new(Arc::new(TransientStore::new()))
    }

    fn new_thing(store: &ObjectStore, name: &str) -> WorldObject {
        let dbref = store.next_dbref().unwrap();
        WorldObject::Thing(Thing {
            base: ObjectCommon::new(dbref, name, DbRef::mk(99)),
        })
    }

    #[test]
    fn test_save_then_get_round_trips() {
        let store = store();
        let thing = new_thing(&store, "pebble");
        store.put(&thing).unwrap();
        assert_eq!(store.get(thing.dbref()).unwrap(), thing);
    }

    #[test]
    fn test_counter_monotonic() {
        let store = store();
        let a = store.next_dbref().unwrap();
        let b = store.next_dbref().unwrap();
        assert_eq!(a.num() + 1, b.num());
    }

    #[test]
    fn test_exists_in_exactly_one_set() {
        let store = store();
        let thing = new_thing(&store, "pebble");
        store.put(&thing).unwrap();
        let claims: Vec<ObjectKind> = ObjectKind::iter()
            .filter(|kind| {
                store
                    .kv
                    .set_contains(
                        &ObjectStore::set_key(*kind),
                        &thing.dbref().to_literal(),
                    )
                    .unwrap()
            })
            .collect();
        assert_eq!(claims, vec![ObjectKind::Thing]);
        assert!(store.exists(thing.dbref()).unwrap());
        assert_eq!(store.kind_of(thing.dbref()).unwrap(), Some(ObjectKind::Thing));
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = store();
        assert_eq!(
            store.get(DbRef::mk(42)),
            Err(WorldError::ObjectNotFound(DbRef::mk(42)))
        );
        assert!(!store.exists(DbRef::mk(42)).unwrap());
    }

    #[test]
    fn test_player_username_mapping() {
        let store = store();
        let dbref = store.next_dbref().unwrap();
        let player = WorldObject::Player(Player {
            base: ObjectCommon::new(dbref, "Professor Faulkin", dbref),
            username: "God".into(),
            password_hash: "h".into(),
            password_salt: "s".into(),
            last_login: None,
        });
        store.put(&player).unwrap();
        assert_eq!(store.player_dbref("god").unwrap(), Some(dbref));
        assert_eq!(store.player_dbref("GOD").unwrap(), Some(dbref));
        assert_eq!(store.player_dbref("nobody").unwrap(), None);
    }
}
