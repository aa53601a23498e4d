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

use mudpie_common::DbRef;
use mudpie_common::model::{WorldError, WorldObject};
use mudpie_db::{ComposedObject, WorldState};
use std::sync::Arc;

/// The world-state capability handed to programs. Deliberately narrow: programs get these
/// operations and nothing else of the store.
#[derive(Clone)]
pub struct DatabaseLibrary {
    world: Arc<WorldState>,
}

impl DatabaseLibrary {
    pub fn new(world: Arc<WorldState>) -> Self {
        Self { world }
    }

    pub fn create_room(&self, name: &str, owner: DbRef) -> Result<DbRef, WorldError> {
        Ok(self.world.create_room(name, owner)?.base.dbref)
    }

    pub fn rename(&self, dbref: DbRef, name: &str) -> Result<(), WorldError> {
        let mut obj = self.world.get(dbref)?;
        obj.base_mut().name = name.to_string();
        self.world.save(&obj)
    }

    pub fn get_property(&self, dbref: DbRef, name: &str) -> Result<Option<String>, WorldError> {
        let obj = self.world.get(dbref)?;
        Ok(obj.base().property(name).map(|p| p.value.clone()))
    }

    pub fn set_property(
        &self,
        dbref: DbRef,
        name: &str,
        value: &str,
        owner: DbRef,
    ) -> Result<(), WorldError> {
        let mut obj = self.world.get(dbref)?;
        obj.base_mut().set_property(name, value, owner);
        self.world.save(&obj)
    }
}

/// The well-known bag of named values the engine hands a program before execution begins.
/// Objects cross the boundary sanitized; I/O travels separately in `ScriptIo`.
#[derive(Clone)]
pub struct Globals {
    /// The authenticated player, or `None` for an anonymous session.
    pub player: Option<WorldObject>,
    /// Composed location of the player (the session location for anonymous callers).
    pub player_location: Option<ComposedObject>,
    /// The object the invoked verb was found on.
    pub this: Option<WorldObject>,
    /// The object whose verb called the running verb; equals `player` on the first frame.
    pub caller: Option<WorldObject>,

    pub verb: String,
    pub argstr: String,
    pub args: Vec<String>,

    pub dobj: Option<DbRef>,
    pub dobjstr: Option<String>,
    pub prepstr: Option<String>,
    pub iobj: Option<DbRef>,
    pub iobjstr: Option<String>,

    pub db: DatabaseLibrary,
}
