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

use crate::DbRef;
use serde::{Deserialize, Serialize};

/// The path-like name of the description property every object may carry.
pub const DESCRIPTION_PROP: &str = "_/de";

/// Access flags on a property.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PropPerms {
    /// Anyone may read the value.
    pub public_read: bool,
    /// Anyone may overwrite the value.
    pub public_write: bool,
    /// Ownership follows the object down the inheritance chain.
    pub chown_inherit: bool,
}

impl PropPerms {
    pub fn public() -> Self {
        Self {
            public_read: true,
            public_write: false,
            chown_inherit: false,
        }
    }
}

/// A named value hung off an object, keyed by a path-like name (e.g. `_/de`).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: String,
    pub owner: DbRef,
    #[serde(default)]
    pub perms: PropPerms,
}
