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

use crate::model::props::{PropPerms, Property};
use crate::{DbRef, NOTHING};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum::{Display, EnumIter};

/// The closed set of object kinds. Per-kind behaviour (persist keys, load/save dispatch) hangs
/// off this tag rather than a virtual hierarchy, which keeps the serialisation schemata closed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Room,
    Thing,
    Player,
    Link,
    Program,
}

impl ObjectKind {
    /// Segment used in per-object record keys, e.g. `link` in `mudpie::link:#000123`.
    pub fn record_segment(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Thing => "thing",
            Self::Player => "player",
            Self::Link => "link",
            Self::Program => "program",
        }
    }

    /// Segment naming the type's membership set, e.g. `links` in `mudpie::links`.
    pub fn set_segment(&self) -> &'static str {
        match self {
            Self::Room => "rooms",
            Self::Thing => "things",
            Self::Player => "players",
            Self::Link => "links",
            Self::Program => "programs",
        }
    }
}

/// Attributes common to every object in the world.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ObjectCommon {
    pub dbref: DbRef,
    pub name: String,
    #[serde(default)]
    pub aliases: BTreeSet<String>,
    pub owner: DbRef,
    pub location: DbRef,
    #[serde(default)]
    pub contents: BTreeSet<DbRef>,
    pub parent: DbRef,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ObjectCommon {
    pub fn new(dbref: DbRef, name: impl Into<String>, owner: DbRef) -> Self {
        Self {
            dbref,
            name: name.into(),
            aliases: BTreeSet::new(),
            owner,
            location: NOTHING,
            contents: BTreeSet::new(),
            parent: NOTHING,
            properties: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Upsert a property, preserving permissions on overwrite.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>, owner: DbRef) {
        if let Some(existing) = self.properties.iter_mut().find(|p| p.name == name) {
            existing.value = value.into();
            return;
        }
        self.properties.push(Property {
            name: name.to_string(),
            value: value.into(),
            owner,
            perms: PropPerms::public(),
        });
    }

    /// Does `candidate` equal the name or any alias, case-insensitively?
    pub fn answers_to(&self, candidate: &str) -> bool {
        let candidate = candidate.to_lowercase();
        self.name.to_lowercase() == candidate
            || self.aliases.iter().any(|a| a.to_lowercase() == candidate)
    }
}

/// A container for other objects; not itself movable.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub base: ObjectCommon,
}

/// A movable generic object.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub base: ObjectCommon,
}

/// An authenticated identity in the world.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub base: ObjectCommon,
    pub username: String,
    pub password_hash: String,
    pub password_salt: String,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

// Player identity is its dbref; credentials and login bookkeeping don't participate.
impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.base.dbref == other.base.dbref
    }
}

impl Eq for Player {}

/// An exit or action: when named as a verb, control transfers to `target` (a program to run, or
/// a room the traveller is transferred to).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Link {
    pub base: ObjectCommon,
    pub target: DbRef,
}

/// Persisted script source plus execution flags. The compiled artifact is memoised by the
/// engine, never persisted.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub base: ObjectCommon,
    pub source: String,
    /// May the program read player input?
    #[serde(default)]
    pub interactive: bool,
    /// May an anonymous session invoke it?
    #[serde(default)]
    pub unauthenticated: bool,
}

/// Any object in the world, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorldObject {
    Room(Room),
    Thing(Thing),
    Player(Player),
    Link(Link),
    Program(Program),
}

impl WorldObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Room(_) => ObjectKind::Room,
            Self::Thing(_) => ObjectKind::Thing,
            Self::Player(_) => ObjectKind::Player,
            Self::Link(_) => ObjectKind::Link,
            Self::Program(_) => ObjectKind::Program,
        }
    }

    pub fn base(&self) -> &ObjectCommon {
        match self {
            Self::Room(o) => &o.base,
            Self::Thing(o) => &o.base,
            Self::Player(o) => &o.base,
            Self::Link(o) => &o.base,
            Self::Program(o) => &o.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut ObjectCommon {
        match self {
            Self::Room(o) => &mut o.base,
            Self::Thing(o) => &mut o.base,
            Self::Player(o) => &mut o.base,
            Self::Link(o) => &mut o.base,
            Self::Program(o) => &mut o.base,
        }
    }

    pub fn dbref(&self) -> DbRef {
        self.base().dbref
    }

    pub fn name(&self) -> &str {
        &self.base().name
    }

    pub fn as_player(&self) -> Option<&Player> {
        match self {
            Self::Player(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_link(&self) -> Option<&Link> {
        match self {
            Self::Link(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_program(&self) -> Option<&Program> {
        match self {
            Self::Program(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_room(&self) -> Option<&Room> {
        match self {
            Self::Room(r) => Some(r),
            _ => None,
        }
    }

    /// A shallow projection safe to hand across the program boundary: credentials blanked,
    /// non-publicly-readable properties dropped.
    #[must_use]
    pub fn sanitize(&self) -> WorldObject {
        let mut scrubbed = self.clone();
        if let WorldObject::Player(p) = &mut scrubbed {
            p.password_hash.clear();
            p.password_salt.clear();
        }
        scrubbed
            .base_mut()
            .properties
            .retain(|p| p.perms.public_read);
        scrubbed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thing(id: i64, name: &str, aliases: &[&str]) -> WorldObject {
        let mut base = ObjectCommon::new(DbRef::mk(id), name, DbRef::mk(99));
        base.aliases = aliases.iter().map(|s| s.to_string()).collect();
        WorldObject::Thing(Thing { base })
    }

    #[test]
    fn test_aliases_deduplicate() {
        let t = thing(4, "Brass Lantern", &["lamp", "light", "lamp"]);
        assert_eq!(t.base().aliases.len(), 2);
    }

    #[test]
    fn test_answers_to_is_case_insensitive() {
        let t = thing(4, "Brass Lantern", &["lamp", "Lantern"]);
        assert!(t.base().answers_to("brass lantern"));
        assert!(t.base().answers_to("LAMP"));
        assert!(!t.base().answers_to("brass"));
    }

    #[test]
    fn test_player_equality_on_dbref() {
        let base = ObjectCommon::new(DbRef::mk(2), "Wizard", DbRef::mk(2));
        let a = Player {
            base: base.clone(),
            username: "wizard".into(),
            password_hash: "h1".into(),
            password_salt: "s1".into(),
            last_login: None,
        };
        let mut b = a.clone();
        b.password_hash = "h2".into();
        assert_eq!(a, b);
    }

    #[test]
    fn test_sanitize_blanks_credentials() {
        let mut base = ObjectCommon::new(DbRef::mk(2), "Wizard", DbRef::mk(2));
        base.properties.push(Property {
            name: "_/secret".into(),
            value: "hidden".into(),
            owner: DbRef::mk(2),
            perms: PropPerms::default(),
        });
        base.set_property("_/de", "A wizened figure.", DbRef::mk(2));
        let p = WorldObject::Player(Player {
            base,
            username: "wizard".into(),
            password_hash: "hash".into(),
            password_salt: "salt".into(),
            last_login: None,
        });
        let clean = p.sanitize();
        let WorldObject::Player(clean) = &clean else {
            panic!("kind changed by sanitize");
        };
        assert!(clean.password_hash.is_empty());
        assert!(clean.password_salt.is_empty());
        assert!(clean.base.property("_/secret").is_none());
        assert!(clean.base.property("_/de").is_some());
    }

    #[test]
    fn test_record_round_trip() {
        let t = thing(7, "ball", &["sphere"]);
        let json = serde_json::to_string(&t).unwrap();
        let back: WorldObject = serde_json::from_str(&json).unwrap();
        assert_eq!(t, back);
    }
}
