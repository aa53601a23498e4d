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

pub mod auth;
pub mod context;
pub mod engine;
pub mod globals;
pub mod io;
pub mod runtime;
pub mod scripted;

pub use context::{ContextError, ExecutionContext, TaskState};
pub use engine::{Invocation, ProgramHandle, ScriptEngine};
pub use globals::{DatabaseLibrary, Globals};
pub use io::{InputSource, OutputSink, ScriptIo};
pub use runtime::{CompileError, CompiledScript, ScriptError, ScriptRuntime};
pub use scripted::ScriptedRuntime;
