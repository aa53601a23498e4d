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

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::ops::Add;
use std::str::FromStr;

/// Used throughout to refer to a missing object value.
pub const NOTHING: DbRef = DbRef::mk(0);
/// Used in matching to indicate that the match was ambiguous on multiple objects in the
/// environment.
pub const AMBIGUOUS: DbRef = DbRef::mk(-1);
/// Used in matching to indicate that the match failed to find any objects in the environment.
pub const FAILED_MATCH: DbRef = DbRef::mk(-2);
/// The bootstrap room: carries the seed links and programs available to every session before a
/// player is anywhere else.
pub const VOID: DbRef = DbRef::mk(1);

/// A reference to an object. Positive values are real database identities, allocated from the
/// persistent counter; zero and the two negative sentinels are reserved for matching. All other
/// negatives are invalid and never minted.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DbRef(i64);

impl DbRef {
    pub const fn mk(id: i64) -> Self {
        Self(id)
    }

    pub fn num(&self) -> i64 {
        self.0
    }

    /// A real, positive database identity (not a sentinel).
    pub fn is_real(&self) -> bool {
        self.0 > 0
    }

    pub fn is_nothing(&self) -> bool {
        *self == NOTHING
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(*self, NOTHING | AMBIGUOUS | FAILED_MATCH)
    }

    /// The canonical persisted literal: `#` plus a six-digit zero-padded decimal.
    #[must_use]
    pub fn to_literal(&self) -> String {
        if self.0 < 0 {
            format!("#-{:06}", -self.0)
        } else {
            format!("#{:06}", self.0)
        }
    }
}

/// The tie-breaking sum the matcher folds candidates with. Conflicting real references promote
/// to `AMBIGUOUS`; `NOTHING` is the identity; `FAILED_MATCH` loses to anything real.
impl Add for DbRef {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        if self == AMBIGUOUS || rhs == AMBIGUOUS {
            return AMBIGUOUS;
        }
        if self == FAILED_MATCH && rhs == FAILED_MATCH {
            return FAILED_MATCH;
        }
        if self == NOTHING {
            return rhs;
        }
        if rhs == NOTHING {
            return self;
        }
        if self == FAILED_MATCH {
            return rhs;
        }
        if rhs == FAILED_MATCH {
            return self;
        }
        if self == rhs { self } else { AMBIGUOUS }
    }
}

impl Debug for DbRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            NOTHING => f.write_str("DbRef(NOTHING)"),
            AMBIGUOUS => f.write_str("DbRef(AMBIGUOUS)"),
            FAILED_MATCH => f.write_str("DbRef(FAILED_MATCH)"),
            _ => f.write_fmt(format_args!("DbRef(#{})", self.0)),
        }
    }
}

impl Display for DbRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<i64> for DbRef {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<DbRef> for i64 {
    fn from(value: DbRef) -> Self {
        value.0
    }
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("could not parse reference: {0}")]
pub struct RefParseError(pub String);

impl FromStr for DbRef {
    type Err = RefParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some(stripped) = value.strip_prefix('#') else {
            return Err(RefParseError(format!(
                "expected reference to start with '#', got {value}"
            )));
        };
        let id = stripped
            .parse::<i64>()
            .map_err(|e| RefParseError(format!("bad reference number {stripped}: {e}")))?;
        Ok(Self(id))
    }
}

impl TryFrom<&str> for DbRef {
    type Error = RefParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Serialize for DbRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_literal())
    }
}

struct DbRefVisitor;

impl Visitor<'_> for DbRefVisitor {
    type Value = DbRef;

    fn expecting(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str("a '#'-prefixed object reference literal")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        v.parse().map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for DbRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(DbRefVisitor)
    }
}
