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

use crate::matching::ObjectNameMatcher;
use crate::model::WorldError;
use crate::util::glob_name_match;
use crate::{DbRef, FAILED_MATCH};

// This is the interface the matching code needs to be able to call into the world state.
// Separated out so it can be more easily mocked.
pub trait MatchEnvironment {
    // Test whether a given object is valid in this environment.
    fn obj_valid(&self, oid: DbRef) -> Result<bool, WorldError>;

    // The primary name and the aliases of an object. Exact matching considers both; glob
    // matching considers the name only.
    fn names_of(&self, oid: DbRef) -> Result<(String, Vec<String>), WorldError>;

    // The contents of an object, read through the composed view.
    fn contents_of(&self, oid: DbRef) -> Result<Vec<DbRef>, WorldError>;

    // Whether the object is a link (the only kind verbs resolve to).
    fn is_link(&self, oid: DbRef) -> Result<bool, WorldError>;
}

/// The two-pass name/alias matcher over the invoker's reachable scope: what the invoker
/// carries, then what is in the room with them. Anonymous sessions match against the session
/// location alone.
pub struct DefaultObjectMatcher<'a, M: MatchEnvironment> {
    pub env: &'a M,
    pub player: Option<DbRef>,
    pub location: DbRef,
}

impl<'a, M: MatchEnvironment> DefaultObjectMatcher<'a, M> {
    pub fn new(env: &'a M, player: Option<DbRef>, location: DbRef) -> Self {
        Self {
            env,
            player,
            location,
        }
    }

    fn scope(&self) -> Result<Vec<DbRef>, WorldError> {
        let mut scope = Vec::new();
        if let Some(player) = self.player {
            scope.extend(self.env.contents_of(player)?);
        }
        if self.location.is_real() {
            scope.extend(self.env.contents_of(self.location)?);
        }
        Ok(scope)
    }

    /// Fold candidates into exact/partial accumulators with the reference sum, which promotes
    /// conflicts to `AMBIGUOUS` without branching.
    fn fold_candidates(
        &self,
        candidates: &[DbRef],
        text: &str,
        links_only: bool,
    ) -> Result<DbRef, WorldError> {
        let text_lc = text.to_lowercase();
        let mut exact = FAILED_MATCH;
        let mut partial = FAILED_MATCH;

        for &oid in candidates {
            if !self.env.obj_valid(oid)? {
                continue;
            }
            if links_only && !self.env.is_link(oid)? {
                continue;
            }
            let (name, aliases) = self.env.names_of(oid)?;
            let is_exact = name.to_lowercase() == text_lc
                || aliases.iter().any(|a| a.to_lowercase() == text_lc);
            if is_exact {
                exact = exact + oid;
            } else if glob_name_match(&name, text) {
                partial = partial + oid;
            }
        }

        // An ambiguous exact result propagates; only a failed exact pass falls back to the
        // partial accumulator.
        if exact == FAILED_MATCH {
            Ok(partial)
        } else {
            Ok(exact)
        }
    }

    /// Resolve an object name: `#n` literals, the `me`/`here` pronouns, then the two-pass scan
    /// over scope. Sentinels encode failure and ambiguity.
    pub fn resolve(&self, text: &str) -> Result<DbRef, WorldError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(FAILED_MATCH);
        }

        if let Ok(r) = text.parse::<DbRef>()
            && r.is_real()
            && self.env.obj_valid(r)?
        {
            return Ok(r);
        }

        if text.eq_ignore_ascii_case("me")
            && let Some(player) = self.player
        {
            return Ok(player);
        }

        if text.eq_ignore_ascii_case("here") {
            return Ok(self.location);
        }

        self.fold_candidates(&self.scope()?, text, false)
    }

    /// Resolve a verb to a link. When nothing in scope matches, the search extends to the
    /// contents of the direct object, then of the indirect object, so a verb may live on the
    /// object it acts on.
    pub fn resolve_verb(
        &self,
        verb: &str,
        dobj: Option<DbRef>,
        iobj: Option<DbRef>,
    ) -> Result<DbRef, WorldError> {
        let result = self.fold_candidates(&self.scope()?, verb, true)?;
        if result != FAILED_MATCH {
            return Ok(result);
        }
        for extension in [dobj, iobj].into_iter().flatten() {
            if !extension.is_real() || !self.env.obj_valid(extension)? {
                continue;
            }
            let result =
                self.fold_candidates(&self.env.contents_of(extension)?, verb, true)?;
            if result != FAILED_MATCH {
                return Ok(result);
            }
        }
        Ok(FAILED_MATCH)
    }
}

impl<M: MatchEnvironment> ObjectNameMatcher for DefaultObjectMatcher<'_, M> {
    fn match_object(&self, name: &str) -> Result<Option<DbRef>, WorldError> {
        if name.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.resolve(name)?))
    }
}
