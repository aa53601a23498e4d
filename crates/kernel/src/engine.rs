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

use crate::context::{ContextError, ExecutionContext, TaskState};
use crate::globals::{DatabaseLibrary, Globals};
use crate::io::{InputSource, OutputSink, ScriptIo};
use crate::runtime::{CompileError, CompiledScript, ScriptError, ScriptRuntime};
use mudpie_common::matching::ParsedCommand;
use mudpie_common::model::{Program, WorldError, WorldObject};
use mudpie_common::{DbRef, NOTHING};
use mudpie_db::WorldState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// How often the bridge flushes the program's output sink toward the session.
pub const BRIDGE_INTERVAL: Duration = Duration::from_millis(100);
/// How often a running execution glances at the kill switch.
const KILL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Everything the engine needs to know about who invoked a program and with what command.
#[derive(Clone, Debug)]
pub struct Invocation {
    /// The authenticated player, or `None` for an anonymous session.
    pub player: Option<DbRef>,
    /// The session's location (the player's location, or the bootstrap room before login).
    pub location: DbRef,
    /// The link the verb resolved to.
    pub this: DbRef,
    pub command: ParsedCommand,
}

/// A running (or already-terminal) program invocation. The connection keeps this to route
/// interactive input, and awaits it to learn the outcome without blocking command dispatch.
pub struct ProgramHandle<V> {
    pub program_name: String,
    /// Present for interactive programs; the session feeds inbound lines here while in
    /// interactive-program mode.
    pub input: Option<flume::Sender<String>>,
    context: Arc<Mutex<ExecutionContext<V>>>,
    join: Option<tokio::task::JoinHandle<()>>,
}

impl<V: Clone> ProgramHandle<V> {
    fn finished(context: ExecutionContext<V>) -> Self {
        Self {
            program_name: context.program_name.clone(),
            input: None,
            context: Arc::new(Mutex::new(context)),
            join: None,
        }
    }

    pub fn is_interactive(&self) -> bool {
        self.input.is_some()
    }

    pub fn snapshot(&self) -> ExecutionContext<V> {
        self.context.lock().unwrap().clone()
    }

    /// Wait for termination and hand back the final context.
    pub async fn wait(mut self) -> ExecutionContext<V> {
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
        self.context.lock().unwrap().clone()
    }
}

/// The scripting engine: loads programs by reference, memoises their compiled artifacts, and
/// schedules executions with their output bridges.
pub struct ScriptEngine<R: ScriptRuntime> {
    runtime: Arc<R>,
    world: Arc<WorldState>,
    compile_cache: Mutex<HashMap<DbRef, Arc<R::Compiled>>>,
}

impl<R: ScriptRuntime> ScriptEngine<R> {
    pub fn new(runtime: Arc<R>, world: Arc<WorldState>) -> Self {
        Self {
            runtime,
            world,
            compile_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn world(&self) -> &Arc<WorldState> {
        &self.world
    }

    pub fn load_program(&self, dbref: DbRef) -> Result<Program, WorldError> {
        match self.world.get(dbref)? {
            WorldObject::Program(program) => Ok(program),
            _ => Err(WorldError::ObjectNotFound(dbref)),
        }
    }

    /// Compile a program, reusing the memoised artifact when present. Failures are reported to
    /// the caller and nothing is cached, so a later fix to the source takes effect.
    pub fn compile(&self, program: &Program) -> Result<Arc<R::Compiled>, CompileError> {
        let dbref = program.base.dbref;
        if let Some(hit) = self.compile_cache.lock().unwrap().get(&dbref) {
            return Ok(hit.clone());
        }
        let compiled = self.runtime.compile(&program.base.name, &program.source)?;
        self.compile_cache
            .lock()
            .unwrap()
            .insert(dbref, compiled.clone());
        trace!(name = %program.base.name, dbref = %dbref, "compiled program");
        Ok(compiled)
    }

    /// Drop the memoised artifact for a program whose source changed.
    pub fn invalidate(&self, dbref: DbRef) {
        self.compile_cache.lock().unwrap().remove(&dbref);
    }

    /// Check preconditions, compile, wire streams, and schedule execution. Never blocks on the
    /// program itself: precondition failures come back as an already-terminal handle, anything
    /// else runs in its own task.
    pub fn run_program(
        &self,
        program_ref: DbRef,
        invocation: Invocation,
        conn_out: mpsc::Sender<String>,
        kill_switch: Arc<AtomicBool>,
    ) -> ProgramHandle<R::Value> {
        if program_ref == NOTHING {
            return ProgramHandle::finished(ExecutionContext::error(
                "",
                ContextError::ProgramNotSpecified,
                "no program specified",
            ));
        }
        let program = match self.load_program(program_ref) {
            Ok(program) => program,
            Err(e) => {
                debug!(program = %program_ref, error = %e, "program not loadable");
                return ProgramHandle::finished(ExecutionContext::error(
                    program_ref.to_literal(),
                    ContextError::ProgramNotFound,
                    format!("could not load program {program_ref}: {e}"),
                ));
            }
        };
        if invocation.player.is_none() && !program.unauthenticated {
            return ProgramHandle::finished(ExecutionContext::error(
                program.base.name.clone(),
                ContextError::AuthenticationRequired,
                "anonymous sessions may not invoke this program",
            ));
        }

        let name = program.base.name.clone();
        let compiled = match self.compile(&program) {
            Ok(compiled) => compiled,
            Err(e) => {
                let mut ctx = ExecutionContext::new(name);
                ctx.state = TaskState::Errored;
                ctx.error_message = Some(e.to_string());
                return ProgramHandle::finished(ctx);
            }
        };
        let globals = match self.build_globals(&invocation) {
            Ok(globals) => globals,
            Err(e) => {
                let mut ctx = ExecutionContext::new(name);
                ctx.state = TaskState::Errored;
                ctx.error_message = Some(e.to_string());
                return ProgramHandle::finished(ctx);
            }
        };

        let sink = OutputSink::new();
        let (input_tx, input_src) = if program.interactive {
            let (tx, rx) = flume::unbounded();
            (Some(tx), Some(InputSource::new(rx)))
        } else {
            (None, None)
        };
        let io = ScriptIo {
            output: sink.clone(),
            input: input_src,
        };

        let context = Arc::new(Mutex::new(ExecutionContext::new(name.clone())));
        let join = tokio::spawn(run_task(
            name,
            compiled,
            globals,
            io,
            sink,
            context.clone(),
            conn_out,
            kill_switch,
        ));

        let program_name = context.lock().unwrap().program_name.clone();
        ProgramHandle {
            program_name,
            input: input_tx,
            context,
            join: Some(join),
        }
    }

    fn build_globals(&self, invocation: &Invocation) -> Result<Globals, WorldError> {
        let player = invocation
            .player
            .map(|p| self.world.get(p))
            .transpose()?
            .map(|o| o.sanitize());
        let player_location = self.world.compose(invocation.location)?.map(|c| {
            let mut c = (*c).clone();
            c.object = c.object.sanitize();
            c
        });
        let this = if invocation.this.is_real() {
            Some(self.world.get(invocation.this)?.sanitize())
        } else {
            None
        };
        let caller = player.clone();
        let command = &invocation.command;
        Ok(Globals {
            player,
            player_location,
            this,
            caller,
            verb: command.verb.clone(),
            argstr: command.argstr.clone(),
            args: command.args.clone(),
            dobj: command.dobj,
            dobjstr: command.dobjstr.clone(),
            prepstr: command.prepstr.clone(),
            iobj: command.iobj,
            iobjstr: command.iobjstr.clone(),
            db: DatabaseLibrary::new(self.world.clone()),
        })
    }
}

/// One program execution: run the compiled script on the blocking pool, bridge its output sink
/// toward the session every tick, watch the kill switch, and record the terminal state.
#[allow(clippy::too_many_arguments)]
async fn run_task<C, V>(
    name: String,
    compiled: Arc<C>,
    globals: Globals,
    io: ScriptIo,
    sink: OutputSink,
    context: Arc<Mutex<ExecutionContext<V>>>,
    conn_out: mpsc::Sender<String>,
    kill_switch: Arc<AtomicBool>,
) where
    C: CompiledScript<Value = V> + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    context.lock().unwrap().state = TaskState::Running;

    let bridge_sink = sink.clone();
    let bridge_context = context.clone();
    let bridge_out = conn_out.clone();
    let bridge = tokio::spawn(async move {
        let mut ticks = tokio::time::interval(BRIDGE_INTERVAL);
        loop {
            ticks.tick().await;
            for line in bridge_sink.drain() {
                bridge_context.lock().unwrap().push_output(line.clone());
                if bridge_out.send(line).await.is_err() {
                    trace!("session gone; feedback retained in context only");
                }
            }
        }
    });

    let mut execution =
        tokio::task::spawn_blocking(move || compiled.run(&globals, &io));

    let result = loop {
        select! {
            result = &mut execution => break Some(result),
            _ = tokio::time::sleep(KILL_POLL_INTERVAL) => {
                if kill_switch.load(Ordering::Relaxed) {
                    break None;
                }
            }
        }
    };

    // The bridge stops first; one final drain picks up anything it missed.
    bridge.abort();
    let _ = bridge.await;
    for line in sink.drain_final() {
        context.lock().unwrap().push_output(line.clone());
        let _ = conn_out.send(line).await;
    }

    let mut ctx = context.lock().unwrap();
    match result {
        None => {
            debug!(program = %name, "execution aborted by kill switch");
            ctx.state = TaskState::Aborted;
        }
        Some(Ok(Ok(value))) => {
            trace!(program = %name, "execution completed");
            ctx.state = TaskState::Completed;
            ctx.return_value = value;
        }
        Some(Ok(Err(ScriptError::InputClosed))) => {
            // The session went away mid-read; that is a cancellation, not a program bug.
            ctx.state = TaskState::Aborted;
        }
        Some(Ok(Err(ScriptError::Runtime(message)))) => {
            if kill_switch.load(Ordering::Relaxed) {
                ctx.state = TaskState::Aborted;
            } else {
                ctx.state = TaskState::Errored;
                ctx.error_message = Some(message);
            }
        }
        Some(Err(join_error)) => {
            warn!(program = %name, error = %join_error, "execution task died");
            ctx.state = TaskState::Killed;
            ctx.error_message = Some(join_error.to_string());
        }
    }
}
