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

use crate::connection_codec::{ConnectionCodec, ConnectionCodecError};
use crate::listen::ConnectionRegistry;
use eyre::eyre;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use mudpie_common::matching::{DefaultObjectMatcher, ParseCommandError, parse_command};
use mudpie_common::model::{ObjectKind, WorldObject};
use mudpie_common::util::parse_into_words;
use mudpie_common::{AMBIGUOUS, DbRef, FAILED_MATCH, VOID};
use mudpie_db::WorldState;
use mudpie_kernel::{
    ContextError, ExecutionContext, Invocation, ScriptEngine, ScriptRuntime, TaskState, auth,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::select;
use tokio::sync::{mpsc, watch};
use tokio_util::codec::Framed;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

pub const GREETING: &str = "200 Service available, posting allowed";
pub const FAREWELL: &str = "GOODBYE!";
const UNKNOWN_BUILTIN: &str = "500 Unknown command";
const SPACE_TIME_RIP: &str = "You peer closer and notice a rip in the space-time continuum...";
const AUTH_REQUIRED: &str = "You must be logged in to use that command.";
const LOGIN_FAILED: &str = "Either that player does not exist, or has a different password.";

/// The input modes a session can be in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LineMode {
    /// Typical command input mode.
    Command,
    /// Inbound lines are diverted to a running interactive program.
    InteractiveProgram,
}

/// Notice from a program watcher back to its owning session.
struct ProgramEnd {
    was_interactive: bool,
    outcome: Option<String>,
}

enum SessionEvent {
    Inbound(Option<Result<String, ConnectionCodecError>>),
    ProgramOutput(Option<String>),
    ProgramEnded(Option<ProgramEnd>),
    Terminate,
    Tick,
}

enum Disposition {
    Continue,
    Disconnect,
}

pub(crate) struct Connection<R: ScriptRuntime> {
    client_id: Uuid,
    peer_addr: SocketAddr,
    world: Arc<WorldState>,
    engine: Arc<ScriptEngine<R>>,
    registry: Arc<ConnectionRegistry>,
    kill_switch: Arc<AtomicBool>,

    write: SplitSink<Framed<TcpStream, ConnectionCodec>, String>,
    read: SplitStream<Framed<TcpStream, ConnectionCodec>>,

    /// Program bridges feed this; the run loop forwards to the socket in queue order.
    outbound_tx: mpsc::Sender<String>,
    outbound_rx: mpsc::Receiver<String>,
    events_tx: mpsc::Sender<ProgramEnd>,
    events_rx: mpsc::Receiver<ProgramEnd>,
    terminate_rx: watch::Receiver<bool>,

    /// The authenticated player, if any.
    identity: Option<DbRef>,
    /// Where the session "is": the player's location once logged in, the Void before that.
    location: DbRef,
    mode: LineMode,
    /// Input redirection installed while an interactive program runs.
    program_input: Option<flume::Sender<String>>,
}

impl<R: ScriptRuntime> Connection<R> {
    pub(crate) fn new(
        stream: TcpStream,
        peer_addr: SocketAddr,
        world: Arc<WorldState>,
        engine: Arc<ScriptEngine<R>>,
        registry: Arc<ConnectionRegistry>,
        kill_switch: Arc<AtomicBool>,
    ) -> Self {
        let client_id = Uuid::new_v4();
        let framed = Framed::new(stream, ConnectionCodec::new());
        let (write, read) = framed.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(64);
        let (events_tx, events_rx) = mpsc::channel(16);
        let (terminate_tx, terminate_rx) = watch::channel(false);
        registry.register(client_id, terminate_tx);
        Self {
            client_id,
            peer_addr,
            world,
            engine,
            registry,
            kill_switch,
            write,
            read,
            outbound_tx,
            outbound_rx,
            events_tx,
            events_rx,
            terminate_rx,
            identity: None,
            location: VOID,
            mode: LineMode::Command,
            program_input: None,
        }
    }

    pub(crate) async fn run(mut self) {
        info!(client_id = ?self.client_id, peer_addr = ?self.peer_addr, "Connection established");

        if self.send(GREETING).await.is_err() {
            self.registry.deregister(self.client_id);
            return;
        }

        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        let mut farewell = true;
        loop {
            let event = select! {
                item = self.read.next() => SessionEvent::Inbound(item),
                line = self.outbound_rx.recv() => SessionEvent::ProgramOutput(line),
                end = self.events_rx.recv() => SessionEvent::ProgramEnded(end),
                _ = self.terminate_rx.changed() => SessionEvent::Terminate,
                _ = ticker.tick() => SessionEvent::Tick,
            };
            match event {
                SessionEvent::Inbound(None) => {
                    debug!(client_id = ?self.client_id, "Client went away");
                    farewell = false;
                    break;
                }
                SessionEvent::Inbound(Some(Err(ConnectionCodecError::Io(e)))) => {
                    debug!(client_id = ?self.client_id, error = ?e, "Transport error");
                    farewell = false;
                    break;
                }
                SessionEvent::Inbound(Some(Err(e))) => {
                    // Malformed input: tell the session, keep the connection.
                    debug!(client_id = ?self.client_id, error = %e, "Bad input chunk");
                    if self.send("What?").await.is_err() {
                        farewell = false;
                        break;
                    }
                }
                SessionEvent::Inbound(Some(Ok(line))) => match self.process_line(line).await {
                    Ok(Disposition::Continue) => {}
                    Ok(Disposition::Disconnect) => {
                        farewell = false;
                        break;
                    }
                    Err(e) => {
                        debug!(client_id = ?self.client_id, error = %e, "Write failed");
                        farewell = false;
                        break;
                    }
                },
                SessionEvent::ProgramOutput(Some(line)) => {
                    if self.send(line).await.is_err() {
                        farewell = false;
                        break;
                    }
                }
                SessionEvent::ProgramOutput(None) | SessionEvent::ProgramEnded(None) => {}
                SessionEvent::ProgramEnded(Some(end)) => {
                    if end.was_interactive {
                        self.mode = LineMode::Command;
                        self.program_input = None;
                    }
                    if let Some(line) = end.outcome {
                        if self.send(line).await.is_err() {
                            farewell = false;
                            break;
                        }
                    }
                }
                SessionEvent::Terminate => break,
                SessionEvent::Tick => {
                    if self.kill_switch.load(Ordering::Relaxed) {
                        break;
                    }
                }
            }
        }

        self.shutdown(farewell).await;
    }

    /// Farewell, close both halves, deregister.
    async fn shutdown(mut self, farewell: bool) {
        if farewell {
            let _ = self.write.send(FAREWELL.to_string()).await;
        }
        let _ = self.write.close().await;
        self.registry.deregister(self.client_id);
        info!(client_id = ?self.client_id, "Connection closed");
    }

    async fn send(&mut self, line: impl Into<String>) -> eyre::Result<()> {
        self.write
            .send(line.into())
            .await
            .map_err(|e| eyre!("unable to write to client: {e}"))
    }

    async fn process_line(&mut self, line: String) -> eyre::Result<Disposition> {
        trace!(client_id = ?self.client_id, line = %line, "<<");

        // A running interactive program owns the input stream.
        if self.mode == LineMode::InteractiveProgram {
            if let Some(input) = &self.program_input
                && input.send(line.clone()).is_ok()
            {
                return Ok(Disposition::Continue);
            }
            // The program is gone; fall back to command handling.
            self.mode = LineMode::Command;
            self.program_input = None;
        }

        let words = parse_into_words(&line);
        let Some(first) = words.first() else {
            self.send("What?").await?;
            return Ok(Disposition::Continue);
        };
        match first.to_uppercase().as_str() {
            "CONNECT" => {
                self.builtin_connect(&words).await?;
                return Ok(Disposition::Continue);
            }
            "QUIT" => {
                let _ = self.write.send(FAREWELL.to_string()).await;
                return Ok(Disposition::Disconnect);
            }
            _ => {}
        }

        self.dispatch_command(&line).await?;
        Ok(Disposition::Continue)
    }

    /// `CONNECT <username> <password>`.
    async fn builtin_connect(&mut self, words: &[String]) -> eyre::Result<()> {
        if words.len() != 3 {
            return self.send(UNKNOWN_BUILTIN).await;
        }
        match auth::authenticate(&self.world, &words[1], &words[2]) {
            Ok(Some(player)) => {
                let dbref = player.base.dbref;
                self.identity = Some(dbref);
                if player.base.location.is_real() {
                    self.location = player.base.location;
                } else {
                    // First login: the player materialises in the Void.
                    if let Err(e) = self.world.move_object(dbref, VOID) {
                        warn!(error = %e, "could not place player in the Void");
                    }
                    self.location = VOID;
                }
                info!(client_id = ?self.client_id, player = %dbref, "Login successful");
                self.send(format!("Greetings, {}", player.base.name)).await
            }
            Ok(None) => self.send(LOGIN_FAILED).await,
            Err(e) => {
                warn!(error = %e, "authentication failed against the store");
                self.send(LOGIN_FAILED).await
            }
        }
    }

    /// parse → match → resolve verb link → fetch target → spawn engine task (not awaited).
    async fn dispatch_command(&mut self, line: &str) -> eyre::Result<()> {
        let world = self.world.clone();
        let matcher = DefaultObjectMatcher::new(world.as_ref(), self.identity, self.location);

        let parsed = match parse_command(line, &matcher) {
            Ok(parsed) => parsed,
            Err(ParseCommandError::EmptyCommand) => {
                return self.send("What?").await;
            }
            Err(ParseCommandError::ErrorDuringMatch(e)) => {
                warn!(error = %e, "object match failed against the store");
                return self.send("What?").await;
            }
        };

        if parsed.dobj == Some(AMBIGUOUS) || parsed.iobj == Some(AMBIGUOUS) {
            return self.send("Which one?").await;
        }
        if parsed.dobj == Some(FAILED_MATCH) || parsed.iobj == Some(FAILED_MATCH) {
            return self.send("Er?").await;
        }

        let verb_ref = match matcher.resolve_verb(&parsed.verb, parsed.dobj, parsed.iobj) {
            Ok(verb_ref) => verb_ref,
            Err(e) => {
                warn!(error = %e, "verb match failed against the store");
                return self.send("Er?").await;
            }
        };
        if verb_ref == AMBIGUOUS {
            return self.send("Which one?").await;
        }
        if !verb_ref.is_real() {
            return self.send("Er?").await;
        }

        let link = match world.get(verb_ref) {
            Ok(WorldObject::Link(link)) => link,
            _ => return self.send("Er?").await,
        };

        // A named target that no type-set claims is a hole in the world.
        let target = link.target;
        if target.is_real() {
            match world.exists(target) {
                Ok(true) => {}
                Ok(false) => return self.send(SPACE_TIME_RIP).await,
                Err(e) => {
                    warn!(error = %e, "target probe failed");
                    return self.send(SPACE_TIME_RIP).await;
                }
            }
        }

        // Travel half of link semantics: a room target transfers the traveller.
        if target.is_real() && world.kind_of(target).ok().flatten() == Some(ObjectKind::Room) {
            let Some(player) = self.identity else {
                return self.send(AUTH_REQUIRED).await;
            };
            return match world.move_object(player, target) {
                Ok(()) => {
                    self.location = target;
                    let name = world.get(target).map(|r| r.name().to_string());
                    self.send(name.unwrap_or_else(|_| "Elsewhere".to_string()))
                        .await
                }
                Err(e) => {
                    warn!(error = %e, "travel failed");
                    self.send("Er?").await
                }
            };
        }

        let invocation = Invocation {
            player: self.identity,
            location: self.location,
            this: verb_ref,
            command: parsed,
        };
        let handle = self.engine.run_program(
            target,
            invocation,
            self.outbound_tx.clone(),
            self.kill_switch.clone(),
        );
        let was_interactive = handle.is_interactive();
        if let Some(input) = handle.input.clone() {
            self.mode = LineMode::InteractiveProgram;
            self.program_input = Some(input);
        }

        // Outcome reporting must not block command dispatch; a watcher task relays it.
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let ctx = handle.wait().await;
            let outcome = outcome_line(&ctx);
            let _ = events_tx
                .send(ProgramEnd {
                    was_interactive,
                    outcome,
                })
                .await;
        });
        Ok(())
    }
}

/// The user-visible line for a terminal (or stuck) context, chosen by state and error
/// category. Completion is quiet: it only leaves a trace entry.
fn outcome_line<V>(ctx: &ExecutionContext<V>) -> Option<String> {
    match ctx.state {
        TaskState::Errored => match ctx.error {
            Some(ContextError::ProgramNotFound) | Some(ContextError::ProgramNotSpecified) => {
                Some("Huh?".to_string())
            }
            Some(ContextError::AuthenticationRequired) => Some(AUTH_REQUIRED.to_string()),
            None => Some(format!(
                "ERROR: {}",
                ctx.error_message.as_deref().unwrap_or("unknown error")
            )),
        },
        TaskState::Aborted => Some("Aborted.".to_string()),
        TaskState::Killed => Some(format!(
            "KILLED: {}",
            ctx.error_message.as_deref().unwrap_or("unknown cause")
        )),
        TaskState::Loaded => Some(format!(
            "STUCK: {} loaded but not completed.",
            ctx.program_name
        )),
        TaskState::Paused => Some(format!("Paused: {}.", ctx.program_name)),
        TaskState::Running => Some(format!("Running... {}.", ctx.program_name)),
        TaskState::Completed => {
            trace!(program = %ctx.program_name, "program completed");
            None
        }
    }
}
