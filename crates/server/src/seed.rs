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

//! First-boot world seeding: the Void, the god player, and one program + Void link per `*.msc`
//! source file found in the configured program directories.

use mudpie_common::model::{DESCRIPTION_PROP, WorldError};
use mudpie_common::{DbRef, NOTHING, VOID};
use mudpie_db::WorldState;
use mudpie_kernel::auth;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const VOID_NAME: &str = "The Void";
pub const VOID_DESCRIPTION: &str = "You stand at the edge of everything and nothing at all.";
pub const GOD_NAME: &str = "Professor Faulkin";
pub const GOD_USERNAME: &str = "god";
/// Default credentials for the seeded administrator; change them on first login.
pub const GOD_PASSWORD: &str = "god";

/// Build the bootstrap world if it is not already there. Idempotent: the presence of the Void
/// means a seeded store.
pub fn ensure_seeded(world: &WorldState, program_dirs: &[PathBuf]) -> Result<(), WorldError> {
    if world.exists(VOID)? {
        debug!("world already seeded");
        return Ok(());
    }
    info!("Seeding a fresh world");

    let void = world.create_room(VOID_NAME, NOTHING)?;
    if void.base.dbref != VOID {
        warn!(dbref = %void.base.dbref, "bootstrap room did not land on the Void reference");
    }
    let mut void_obj = world.get(void.base.dbref)?;
    void_obj
        .base_mut()
        .set_property(DESCRIPTION_PROP, VOID_DESCRIPTION, NOTHING);
    world.save(&void_obj)?;

    let (hash, salt) = auth::hash_password(GOD_PASSWORD)?;
    let god = world.create_player(GOD_NAME, GOD_USERNAME, hash, salt)?;
    world.move_object(god.base.dbref, void.base.dbref)?;

    for dir in program_dirs {
        load_program_dir(world, god.base.dbref, dir)?;
    }
    Ok(())
}

/// Create a Program plus a same-named Void link for every `*.msc` file in `dir`. The file stem
/// names the program (lowercased); `@interactive` / `@unauthenticated` pragma lines in the
/// source set the execution flags.
fn load_program_dir(world: &WorldState, owner: DbRef, dir: &Path) -> Result<(), WorldError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read program directory");
            return Ok(());
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_msc = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("msc"));
        if !is_msc {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        let name = stem.to_lowercase();
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot read program source");
                continue;
            }
        };
        let (interactive, unauthenticated) = parse_pragmas(&source);
        let program = world.create_program(&name, owner, source, interactive, unauthenticated)?;
        let link = world.create_link(&name, owner, program.base.dbref)?;
        world.move_object(link.base.dbref, VOID)?;
        info!(name, interactive, unauthenticated, "seeded program");
    }
    Ok(())
}

fn parse_pragmas(source: &str) -> (bool, bool) {
    let mut interactive = false;
    let mut unauthenticated = false;
    for line in source.lines() {
        match line.trim() {
            "@interactive" => interactive = true,
            "@unauthenticated" => unauthenticated = true,
            _ => {}
        }
    }
    (interactive, unauthenticated)
}
