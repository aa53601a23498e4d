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

mod objects;
mod props;

use crate::DbRef;
use thiserror::Error;

pub use objects::{Link, ObjectCommon, ObjectKind, Player, Program, Room, Thing, WorldObject};
pub use props::{DESCRIPTION_PROP, PropPerms, Property};

/// Errors raised by world-state operations, matching included.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorldError {
    #[error("Object not found: {0}")]
    ObjectNotFound(DbRef),
    #[error("Property not found: {1} on {0}")]
    PropertyNotFound(DbRef, String),
    #[error("Player not found: {0}")]
    PlayerNotFound(String),
    #[error("Duplicate username: {0}")]
    DuplicateUsername(String),
    #[error("Reparenting {0} to {1} would create a cycle")]
    RecursiveParent(DbRef, DbRef),
    #[error("Invalid object reference: {0}")]
    InvalidRef(String),
    #[error("Database error: {0}")]
    Database(String),
}
