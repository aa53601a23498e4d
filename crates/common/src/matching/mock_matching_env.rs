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

use std::collections::HashMap;

use crate::matching::match_env::MatchEnvironment;
use crate::model::WorldError;
use crate::{DbRef, NOTHING};

pub const MOCK_ROOM1: DbRef = DbRef::mk(1);
pub const MOCK_ROOM2: DbRef = DbRef::mk(2);
pub const MOCK_PLAYER: DbRef = DbRef::mk(3);
pub const MOCK_THING1: DbRef = DbRef::mk(4);
pub const MOCK_THING2: DbRef = DbRef::mk(5);
pub const MOCK_BALL1: DbRef = DbRef::mk(6);
pub const MOCK_BALL2: DbRef = DbRef::mk(7);
pub const MOCK_LOOK_LINK: DbRef = DbRef::mk(8);
pub const MOCK_RUB_LINK: DbRef = DbRef::mk(9);

pub struct MockObject {
    pub location: DbRef,
    pub contents: Vec<DbRef>,
    pub name: String,
    pub aliases: Vec<String>,
    pub is_link: bool,
}

#[derive(Default)]
pub struct MockMatchEnv {
    objects: HashMap<DbRef, MockObject>,
}

impl MockMatchEnv {
    pub fn new(objects: HashMap<DbRef, MockObject>) -> Self {
        MockMatchEnv { objects }
    }
}

impl MatchEnvironment for MockMatchEnv {
    fn obj_valid(&self, oid: DbRef) -> Result<bool, WorldError> {
        Ok(self.objects.contains_key(&oid))
    }

    fn names_of(&self, oid: DbRef) -> Result<(String, Vec<String>), WorldError> {
        let obj = self
            .objects
            .get(&oid)
            .ok_or(WorldError::ObjectNotFound(oid))?;
        Ok((obj.name.clone(), obj.aliases.clone()))
    }

    fn contents_of(&self, oid: DbRef) -> Result<Vec<DbRef>, WorldError> {
        Ok(self
            .objects
            .get(&oid)
            .map_or_else(Vec::new, |o| o.contents.clone()))
    }

    fn is_link(&self, oid: DbRef) -> Result<bool, WorldError> {
        Ok(self.objects.get(&oid).is_some_and(|o| o.is_link))
    }
}

fn mock(name: &str, aliases: &[&str], location: DbRef, contents: &[DbRef]) -> MockObject {
    MockObject {
        location,
        contents: contents.to_vec(),
        name: name.to_string(),
        aliases: aliases.iter().map(|s| s.to_string()).collect(),
        is_link: false,
    }
}

/// A small fixed environment: a player carrying one thing, standing in a room holding a glowing
/// thing, two identically-named balls (one hiding a "rub" link), and a "look" link.
pub fn setup_mock_environment() -> MockMatchEnv {
    let mut objects = HashMap::new();
    objects.insert(
        MOCK_ROOM1,
        mock(
            "Room1",
            &["r1"],
            NOTHING,
            &[MOCK_PLAYER, MOCK_THING2, MOCK_BALL1, MOCK_BALL2, MOCK_LOOK_LINK],
        ),
    );
    objects.insert(MOCK_ROOM2, mock("Room2", &["r2"], NOTHING, &[]));
    objects.insert(
        MOCK_PLAYER,
        mock("Porcupine", &[], MOCK_ROOM1, &[MOCK_THING1]),
    );
    objects.insert(MOCK_THING1, mock("thing1", &["t1"], MOCK_PLAYER, &[]));
    objects.insert(MOCK_THING2, mock("glow*", &["t2"], MOCK_ROOM1, &[]));
    objects.insert(MOCK_BALL1, mock("ball", &[], MOCK_ROOM1, &[MOCK_RUB_LINK]));
    objects.insert(MOCK_BALL2, mock("ball", &[], MOCK_ROOM1, &[]));

    let mut look = mock("look", &[], MOCK_ROOM1, &[]);
    look.is_link = true;
    objects.insert(MOCK_LOOK_LINK, look);

    let mut rub = mock("rub", &[], MOCK_BALL1, &[]);
    rub.is_link = true;
    objects.insert(MOCK_RUB_LINK, rub);

    MockMatchEnv::new(objects)
}
