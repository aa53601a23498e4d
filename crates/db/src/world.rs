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

use crate::composed::{ComposedCache, ComposedObject};
use crate::kv::KeyValueStore;
use crate::object_store::ObjectStore;
use mudpie_common::matching::MatchEnvironment;
use mudpie_common::model::{
    Link, ObjectCommon, ObjectKind, Player, Program, Room, Thing, WorldError, WorldObject,
};
use mudpie_common::{DbRef, NOTHING};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// The facade the rest of the system reads and mutates the world through: typed CRUD plus the
/// composed view. All mutators write the store and refresh the cache together, so readers of
/// the view never trail a save for long.
pub struct WorldState {
    store: ObjectStore,
    cache: ComposedCache,
}

impl WorldState {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: ObjectStore::new(kv),
            cache: ComposedCache::new(),
        }
    }

    pub fn with_cache(kv: Arc<dyn KeyValueStore>, cache: ComposedCache) -> Self {
        Self {
            store: ObjectStore::new(kv),
            cache,
        }
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn get(&self, dbref: DbRef) -> Result<WorldObject, WorldError> {
        self.store.get(dbref)
    }

    pub fn exists(&self, dbref: DbRef) -> Result<bool, WorldError> {
        self.store.exists(dbref)
    }

    pub fn kind_of(&self, dbref: DbRef) -> Result<Option<ObjectKind>, WorldError> {
        self.store.kind_of(dbref)
    }

    /// The composed view of an object, through the cache.
    pub fn compose(&self, dbref: DbRef) -> Result<Option<Arc<ComposedObject>>, WorldError> {
        self.cache.lookup_or_retrieve(&self.store, dbref)
    }

    /// Write-through save; always refreshes the composed view.
    pub fn save(&self, obj: &WorldObject) -> Result<(), WorldError> {
        self.store.put(obj)?;
        self.cache.update(&self.store, obj.dbref())
    }

    pub fn create_room(&self, name: &str, owner: DbRef) -> Result<Room, WorldError> {
        let room = Room {
            base: ObjectCommon::new(self.store.next_dbref()?, name, owner),
        };
        self.save(&WorldObject::Room(room.clone()))?;
        Ok(room)
    }

    pub fn create_thing(&self, name: &str, owner: DbRef) -> Result<Thing, WorldError> {
        let thing = Thing {
            base: ObjectCommon::new(self.store.next_dbref()?, name, owner),
        };
        self.save(&WorldObject::Thing(thing.clone()))?;
        Ok(thing)
    }

    pub fn create_link(
        &self,
        name: &str,
        owner: DbRef,
        target: DbRef,
    ) -> Result<Link, WorldError> {
        let link = Link {
            base: ObjectCommon::new(self.store.next_dbref()?, name, owner),
            target,
        };
        self.save(&WorldObject::Link(link.clone()))?;
        Ok(link)
    }

    pub fn create_program(
        &self,
        name: &str,
        owner: DbRef,
        source: String,
        interactive: bool,
        unauthenticated: bool,
    ) -> Result<Program, WorldError> {
        let program = Program {
            base: ObjectCommon::new(self.store.next_dbref()?, name, owner),
            source,
            interactive,
            unauthenticated,
        };
        self.save(&WorldObject::Program(program.clone()))?;
        Ok(program)
    }

    /// Create a player; usernames are unique, compared case-insensitively.
    pub fn create_player(
        &self,
        name: &str,
        username: &str,
        password_hash: String,
        password_salt: String,
    ) -> Result<Player, WorldError> {
        if self.store.player_dbref(username)?.is_some() {
            return Err(WorldError::DuplicateUsername(username.to_string()));
        }
        let dbref = self.store.next_dbref()?;
        let player = Player {
            base: ObjectCommon::new(dbref, name, dbref),
            username: username.to_string(),
            password_hash,
            password_salt,
            last_login: None,
        };
        self.save(&WorldObject::Player(player.clone()))?;
        Ok(player)
    }

    pub fn player_by_username(&self, username: &str) -> Result<Option<Player>, WorldError> {
        let Some(dbref) = self.store.player_dbref(username)? else {
            return Ok(None);
        };
        match self.get(dbref)? {
            WorldObject::Player(player) => Ok(Some(player)),
            other => Err(WorldError::Database(format!(
                "username mapping points at a {}",
                other.kind()
            ))),
        }
    }

    /// The atomic triple: remove from the old container's contents, add to the new one's,
    /// update the object's own location. No-op when already there.
    pub fn move_object(&self, dbref: DbRef, new_location: DbRef) -> Result<(), WorldError> {
        let mut obj = self.get(dbref)?;
        let old_location = obj.base().location;
        if old_location == new_location {
            return Ok(());
        }
        debug!(?dbref, ?old_location, ?new_location, "moving object");

        if old_location.is_real()
            && let Ok(mut old) = self.get(old_location)
        {
            old.base_mut().contents.remove(&dbref);
            self.save(&old)?;
        }
        if new_location.is_real() {
            let mut new = self.get(new_location)?;
            new.base_mut().contents.insert(dbref);
            self.save(&new)?;
        }
        obj.base_mut().location = new_location;
        self.save(&obj)
    }

    /// Pointer update; the chain from the new parent must not lead back to the object.
    pub fn reparent(&self, dbref: DbRef, new_parent: DbRef) -> Result<(), WorldError> {
        let mut seen = HashSet::new();
        let mut cursor = new_parent;
        while cursor != NOTHING {
            if cursor == dbref || !seen.insert(cursor) {
                return Err(WorldError::RecursiveParent(dbref, new_parent));
            }
            cursor = self.get(cursor)?.base().parent;
        }
        let mut obj = self.get(dbref)?;
        obj.base_mut().parent = new_parent;
        self.save(&obj)
    }
}

// The matcher reads its scope through the composed view.
impl MatchEnvironment for WorldState {
    fn obj_valid(&self, oid: DbRef) -> Result<bool, WorldError> {
        self.exists(oid)
    }

    fn names_of(&self, oid: DbRef) -> Result<(String, Vec<String>), WorldError> {
        let composed = self
            .compose(oid)?
            .ok_or(WorldError::ObjectNotFound(oid))?;
        let base = composed.object.base();
        Ok((base.name.clone(), base.aliases.iter().cloned().collect()))
    }

    fn contents_of(&self, oid: DbRef) -> Result<Vec<DbRef>, WorldError> {
        Ok(self
            .compose(oid)?
            .map_or_else(Vec::new, |c| c.contents.clone()))
    }

    fn is_link(&self, oid: DbRef) -> Result<bool, WorldError> {
        Ok(self.kind_of(oid)? == Some(ObjectKind::Link))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transient::TransientStore;
    use mudpie_common::matching::DefaultObjectMatcher;
    use mudpie_common::AMBIGUOUS;
    use pretty_assertions::assert_eq;

    fn world() -> WorldState {
        WorldState::new(Arc::new(TransientStore::new()))
    }

    #[test]
    fn test_create_allocates_sequential_refs() {
        let world = world();
        let a = world.create_room("a", NOTHING).unwrap();
        let b = world.create_room("b", NOTHING).unwrap();
        assert_eq!(a.base.dbref.num() + 1, b.base.dbref.num());
    }

    #[test]
    fn test_move_maintains_containment_invariant() {
        let world = world();
        let room_a = world.create_room("a", NOTHING).unwrap().base.dbref;
        let room_b = world.create_room("b", NOTHING).unwrap().base.dbref;
        let thing = world.create_thing("pebble", NOTHING).unwrap().base.dbref;

        world.move_object(thing, room_a).unwrap();
        assert_eq!(world.get(thing).unwrap().base().location, room_a);
        assert!(world.get(room_a).unwrap().base().contents.contains(&thing));

        world.move_object(thing, room_b).unwrap();
        assert!(!world.get(room_a).unwrap().base().contents.contains(&thing));
        assert!(world.get(room_b).unwrap().base().contents.contains(&thing));
        assert_eq!(world.get(thing).unwrap().base().location, room_b);

        // There and back again restores both contents sets.
        world.move_object(thing, room_a).unwrap();
        assert!(world.get(room_a).unwrap().base().contents.contains(&thing));
        assert!(!world.get(room_b).unwrap().base().contents.contains(&thing));
    }

    #[test]
    fn test_move_to_same_location_is_noop() {
        let world = world();
        let room = world.create_room("a", NOTHING).unwrap().base.dbref;
        let thing = world.create_thing("pebble", NOTHING).unwrap().base.dbref;
        world.move_object(thing, room).unwrap();
        world.move_object(thing, room).unwrap();
        assert_eq!(world.get(thing).unwrap().base().location, room);
    }

    #[test]
    fn test_reparent_rejects_cycles() {
        let world = world();
        let a = world.create_thing("a", NOTHING).unwrap().base.dbref;
        let b = world.create_thing("b", NOTHING).unwrap().base.dbref;
        let c = world.create_thing("c", NOTHING).unwrap().base.dbref;
        world.reparent(b, a).unwrap();
        world.reparent(c, b).unwrap();
        assert!(matches!(
            world.reparent(a, c),
            Err(WorldError::RecursiveParent(_, _))
        ));
        // The legitimate chain still terminates at NOTHING.
        assert_eq!(world.get(a).unwrap().base().parent, NOTHING);
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let world = world();
        world
            .create_player("One", "bob", "h".into(), "s".into())
            .unwrap();
        assert!(matches!(
            world.create_player("Two", "BOB", "h".into(), "s".into()),
            Err(WorldError::DuplicateUsername(_))
        ));
    }

    #[test]
    fn test_match_through_world_state() {
        let world = world();
        let room = world.create_room("hall", NOTHING).unwrap().base.dbref;
        let player_dbref = world
            .create_player("Porcupine", "porc", "h".into(), "s".into())
            .unwrap()
            .base
            .dbref;
        world.move_object(player_dbref, room).unwrap();
        let ball1 = world.create_thing("ball", NOTHING).unwrap().base.dbref;
        let ball2 = world.create_thing("ball", NOTHING).unwrap().base.dbref;
        world.move_object(ball1, room).unwrap();
        world.move_object(ball2, room).unwrap();

        let matcher = DefaultObjectMatcher::new(&world, Some(player_dbref), room);
        assert_eq!(matcher.resolve("ball").unwrap(), AMBIGUOUS);
        assert_eq!(matcher.resolve("porcupine").unwrap(), player_dbref);
        assert_eq!(matcher.resolve("here").unwrap(), room);
    }
}
