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

use crate::globals::Globals;
use crate::io::ScriptIo;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

/// A compile failure. Reported on the error channel of the execution context; never poisons the
/// stored program record.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("compile error in {name}: {message}")]
pub struct CompileError {
    pub name: String,
    pub message: String,
}

/// An error raised while a compiled script runs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("{0}")]
    Runtime(String),
    /// The input side of an interactive program went away mid-read.
    #[error("input stream closed")]
    InputClosed,
}

/// The seam to the embedded script language. The engine stores, loads, compiles and invokes
/// programs through this pair of traits and knows nothing else about the language.
pub trait ScriptRuntime: Send + Sync + 'static {
    /// The type a program evaluates to.
    type Value: Clone + Debug + Send + Sync + 'static;
    type Compiled: CompiledScript<Value = Self::Value> + 'static;

    fn compile(&self, name: &str, source: &str) -> Result<Arc<Self::Compiled>, CompileError>;
}

/// A compiled artifact, reusable across invocations. Runs synchronously on a blocking thread;
/// reads on the program's input source may block until the owning session supplies a line.
pub trait CompiledScript: Send + Sync {
    type Value;

    fn run(&self, globals: &Globals, io: &ScriptIo) -> Result<Option<Self::Value>, ScriptError>;
}
