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

//! A directive-per-line stand-in runtime behind the `ScriptRuntime` port. Enough to run the
//! seed content and the test suite; a full script language plugs in behind the same traits
//! without touching the engine.

use crate::globals::Globals;
use crate::io::ScriptIo;
use crate::runtime::{CompileError, CompiledScript, ScriptError, ScriptRuntime};
use mudpie_common::model::DESCRIPTION_PROP;
use std::sync::Arc;

/// Source directives, one per line:
///
/// - `emit <text>` — write a line to the player
/// - `room` — describe the player's location (name, reference, description)
/// - `echo` — read one line of player input and write it back
/// - `return <text>` — terminate with a return value
/// - `fail <text>` — terminate with a runtime error
///
/// Blank lines and `#` comments are skipped. Lines starting with `@` are flag pragmas consumed
/// by the seed loader and ignored here.
pub struct ScriptedRuntime;

#[derive(Clone, Debug, Eq, PartialEq)]
enum Directive {
    Emit(String),
    Room,
    Echo,
    Return(String),
    Fail(String),
}

#[derive(Debug)]
pub struct ScriptedProgram {
    directives: Vec<Directive>,
}

impl ScriptRuntime for ScriptedRuntime {
    type Value = String;
    type Compiled = ScriptedProgram;

    fn compile(&self, name: &str, source: &str) -> Result<Arc<Self::Compiled>, CompileError> {
        let mut directives = Vec::new();
        for (lineno, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
                continue;
            }
            let (word, rest) = match line.split_once(' ') {
                Some((word, rest)) => (word, rest.trim()),
                None => (line, ""),
            };
            let directive = match word {
                "emit" => Directive::Emit(rest.to_string()),
                "room" => Directive::Room,
                "echo" => Directive::Echo,
                "return" => Directive::Return(rest.to_string()),
                "fail" => Directive::Fail(rest.to_string()),
                other => {
                    return Err(CompileError {
                        name: name.to_string(),
                        message: format!("unknown directive `{other}` on line {}", lineno + 1),
                    });
                }
            };
            directives.push(directive);
        }
        Ok(Arc::new(ScriptedProgram { directives }))
    }
}

impl CompiledScript for ScriptedProgram {
    type Value = String;

    fn run(&self, globals: &Globals, io: &ScriptIo) -> Result<Option<String>, ScriptError> {
        for directive in &self.directives {
            match directive {
                Directive::Emit(text) => io.output.write_line(text),
                Directive::Room => {
                    let Some(location) = &globals.player_location else {
                        io.output.write_line("You are nowhere at all.");
                        continue;
                    };
                    let base = location.object.base();
                    io.output
                        .write_line(&format!("{} ({})", base.name, base.dbref.to_literal()));
                    if let Some(description) = base.property(DESCRIPTION_PROP) {
                        io.output.write_line(&description.value);
                    }
                }
                Directive::Echo => {
                    let line = io.read_line()?;
                    io.output.write_line(&line);
                }
                Directive::Return(value) => return Ok(Some(value.clone())),
                Directive::Fail(message) => {
                    return Err(ScriptError::Runtime(message.clone()));
                }
            }
        }
        Ok(None)
    }
}
