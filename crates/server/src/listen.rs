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

use crate::config::ServerConfig;
use crate::connection::Connection;
use eyre::bail;
use mudpie_common::VOID;
use mudpie_common::model::WorldObject;
use mudpie_db::WorldState;
use mudpie_kernel::{ScriptEngine, ScriptRuntime};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpSocket};
use tokio::select;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pending-connection backlog on each listening socket.
const ACCEPT_BACKLOG: u32 = 100;
/// The start-time precompile phase must finish within this, or the server refuses to listen.
pub const PRECOMPILE_DEADLINE: Duration = Duration::from_secs(60);

/// Live sessions, by client id. Holds the terminate handle each connection watches.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, client_id: Uuid, terminate: watch::Sender<bool>) {
        self.inner.lock().unwrap().insert(client_id, terminate);
    }

    pub(crate) fn deregister(&self, client_id: Uuid) {
        self.inner.lock().unwrap().remove(&client_id);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ask every live session to shut itself down.
    pub(crate) fn drain(&self) {
        let mut inner = self.inner.lock().unwrap();
        for (client_id, terminate) in inner.drain() {
            debug!(?client_id, "draining connection");
            let _ = terminate.send(true);
        }
    }
}

struct ListenerHandle {
    addr: SocketAddr,
    terminate: watch::Sender<bool>,
    join: JoinHandle<()>,
}

struct ServerState {
    kill_switch: Arc<AtomicBool>,
    listeners: Vec<ListenerHandle>,
}

/// The listener set and its lifecycle: precompile, bind/accept, stop/drain.
pub struct Server<R: ScriptRuntime> {
    world: Arc<WorldState>,
    engine: Arc<ScriptEngine<R>>,
    config: ServerConfig,
    connections: Arc<ConnectionRegistry>,
    state: tokio::sync::Mutex<ServerState>,
}

impl<R: ScriptRuntime> Server<R> {
    pub fn new(world: Arc<WorldState>, engine: Arc<ScriptEngine<R>>, config: ServerConfig) -> Self {
        Self {
            world,
            engine,
            config,
            connections: Arc::new(ConnectionRegistry::new()),
            state: tokio::sync::Mutex::new(ServerState {
                kill_switch: Arc::new(AtomicBool::new(false)),
                listeners: Vec::new(),
            }),
        }
    }

    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Precompile the seed programs, then open every configured listener. Returns the bound
    /// addresses (useful when a listener was configured on port 0).
    pub async fn start(&self) -> eyre::Result<Vec<SocketAddr>> {
        let mut state = self.state.lock().await;
        if !state.listeners.is_empty() {
            bail!("server already started");
        }

        let world = self.world.clone();
        let engine = self.engine.clone();
        let precompile = tokio::task::spawn_blocking(move || precompile_void(&world, &engine));
        match tokio::time::timeout(PRECOMPILE_DEADLINE, precompile).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(error = %e, "precompile task died; not listening");
                bail!("precompile task died: {e}");
            }
            Err(_) => {
                warn!(
                    deadline = ?PRECOMPILE_DEADLINE,
                    "precompile did not finish within the deadline; not listening"
                );
                bail!("precompile deadline exceeded");
            }
        }

        let mut bound = Vec::new();
        for listener_config in &self.config.listeners {
            let addr = listener_config.socket_addr()?;
            let listener = bind_listener(addr)?;
            let local_addr = listener.local_addr()?;

            let (terminate_tx, mut terminate_rx) = watch::channel(false);
            let world = self.world.clone();
            let engine = self.engine.clone();
            let registry = self.connections.clone();
            let kill_switch = state.kill_switch.clone();

            // One task per listener.
            let join = tokio::spawn(async move {
                loop {
                    select! {
                        _ = terminate_rx.changed() => {
                            info!(?local_addr, "Listener terminated, stopping...");
                            break;
                        }
                        result = listener.accept() => {
                            match result {
                                Ok((stream, peer_addr)) => {
                                    if kill_switch.load(Ordering::Relaxed) {
                                        break;
                                    }
                                    info!(?peer_addr, "Accepted connection for listener");
                                    let connection = Connection::new(
                                        stream,
                                        peer_addr,
                                        world.clone(),
                                        engine.clone(),
                                        registry.clone(),
                                        kill_switch.clone(),
                                    );
                                    tokio::spawn(connection.run());
                                }
                                Err(e) => {
                                    warn!(?e, "Accept failed, can't handle connection");
                                    break;
                                }
                            }
                        }
                    }
                }
            });

            info!(?local_addr, "Listening");
            state.listeners.push(ListenerHandle {
                addr: local_addr,
                terminate: terminate_tx,
                join,
            });
            bound.push(local_addr);
        }
        Ok(bound)
    }

    pub async fn listener_addrs(&self) -> Vec<SocketAddr> {
        self.state
            .lock()
            .await
            .listeners
            .iter()
            .map(|l| l.addr)
            .collect()
    }

    /// Trip the root cancellation, stop the listeners, drain connections, and install a fresh
    /// cancellation source for the next start.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        state.kill_switch.store(true, Ordering::SeqCst);
        for listener in state.listeners.drain(..) {
            let _ = listener.terminate.send(true);
            listener.join.abort();
        }
        self.connections.drain();
        state.kill_switch = Arc::new(AtomicBool::new(false));
        info!("Server stopped");
    }
}

/// Bind with an explicit accept backlog.
fn bind_listener(addr: SocketAddr) -> eyre::Result<TcpListener> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(socket.listen(ACCEPT_BACKLOG)?)
}

/// Walk the Void's contents and force compilation of every link's target program. Individual
/// failures are logged, never fatal; only the deadline stops the server from coming up.
fn precompile_void<R: ScriptRuntime>(world: &WorldState, engine: &ScriptEngine<R>) {
    let void = match world.compose(VOID) {
        Ok(Some(void)) => void,
        Ok(None) => {
            warn!("no Void room; nothing to precompile");
            return;
        }
        Err(e) => {
            warn!(error = %e, "could not compose the Void for precompile");
            return;
        }
    };
    let mut compiled = 0usize;
    for item in &void.contents {
        let Ok(WorldObject::Link(link)) = world.get(*item) else {
            continue;
        };
        let program = match engine.load_program(link.target) {
            Ok(program) => program,
            Err(e) => {
                debug!(link = %link.base.name, error = %e, "link target is not a loadable program");
                continue;
            }
        };
        match engine.compile(&program) {
            Ok(_) => compiled += 1,
            Err(e) => warn!(program = %program.base.name, error = %e, "precompile failed"),
        }
    }
    info!(compiled, "Precompile phase complete");
}
