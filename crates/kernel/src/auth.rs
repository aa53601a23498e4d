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

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;
use chrono::Utc;
use mudpie_common::model::{Player, WorldError, WorldObject};
use mudpie_db::WorldState;
use tracing::{debug, warn};

/// Hash a password with a freshly generated salt. Returns `(hash, salt)` as stored on the
/// player record.
pub fn hash_password(password: &str) -> Result<(String, String), WorldError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| WorldError::Database(format!("could not hash password: {e}")))?;
    Ok((hash.to_string(), salt.to_string()))
}

pub fn verify_password(stored_hash: &str, password: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Authenticate a `CONNECT <user> <pass>` attempt. Username compare is case-insensitive. On
/// success the player's `last_login` is stamped and saved; `None` means bad user or password
/// (indistinguishable to the caller on purpose).
pub fn authenticate(
    world: &WorldState,
    username: &str,
    password: &str,
) -> Result<Option<Player>, WorldError> {
    let Some(mut player) = world.player_by_username(username)? else {
        debug!(username, "login attempt for unknown username");
        return Ok(None);
    };
    if !verify_password(&player.password_hash, password) {
        warn!(username, "failed login attempt");
        return Ok(None);
    }
    player.last_login = Some(Utc::now());
    world.save(&WorldObject::Player(player.clone()))?;
    Ok(Some(player))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mudpie_db::TransientStore;
    use std::sync::Arc;

    #[test]
    fn test_hash_and_verify() {
        let (hash, salt) = hash_password("sekrit").unwrap();
        assert!(!salt.is_empty());
        assert!(verify_password(&hash, "sekrit"));
        assert!(!verify_password(&hash, "not sekrit"));
        assert!(!verify_password("garbage", "sekrit"));
    }

    #[test]
    fn test_authenticate_case_insensitive_username() {
        let world = WorldState::new(Arc::new(TransientStore::new()));
        let (hash, salt) = hash_password("god").unwrap();
        world
            .create_player("Professor Faulkin", "god", hash, salt)
            .unwrap();

        let found = authenticate(&world, "GoD", "god").unwrap().unwrap();
        assert_eq!(found.base.name, "Professor Faulkin");
        assert!(found.last_login.is_some());

        assert!(authenticate(&world, "god", "wrong").unwrap().is_none());
        assert!(authenticate(&world, "nobody", "god").unwrap().is_none());
    }
}
