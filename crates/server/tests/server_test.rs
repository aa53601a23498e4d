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

//! End-to-end tests: a real server on an ephemeral port, driven over a plain TCP socket.

use mudpie_common::model::DESCRIPTION_PROP;
use mudpie_common::{DbRef, NOTHING, VOID};
use mudpie_db::{TransientStore, WorldState};
use mudpie_kernel::{ScriptEngine, ScriptedRuntime, auth};
use mudpie_server::config::{ListenerConfig, Protocol, ServerConfig};
use mudpie_server::Server;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

const VOID_DESCRIPTION: &str = "You stand at the edge of everything and nothing at all.";

/// Build a seeded world directly: the Void, the god player, a handful of programs and links,
/// and two identically-named balls for the ambiguity case.
fn build_world() -> Arc<WorldState> {
    let world = Arc::new(WorldState::new(Arc::new(TransientStore::new())));

    let void = world.create_room("The Void", NOTHING).unwrap();
    assert_eq!(void.base.dbref, VOID);
    let mut void_obj = world.get(VOID).unwrap();
    void_obj
        .base_mut()
        .set_property(DESCRIPTION_PROP, VOID_DESCRIPTION, NOTHING);
    world.save(&void_obj).unwrap();

    let (hash, salt) = auth::hash_password("god").unwrap();
    let god = world
        .create_player("Professor Faulkin", "god", hash, salt)
        .unwrap();
    world.move_object(god.base.dbref, VOID).unwrap();
    let god = god.base.dbref;

    let mut seed_program = |name: &str, source: &str, interactive: bool, unauthenticated: bool| {
        let program = world
            .create_program(name, god, source.to_string(), interactive, unauthenticated)
            .unwrap();
        let link = world.create_link(name, god, program.base.dbref).unwrap();
        world.move_object(link.base.dbref, VOID).unwrap();
    };
    seed_program("look", "room", false, true);
    seed_program("echo", "echo", true, true);
    seed_program("secret", "emit the password is swordfish", false, false);

    // A link whose target reference resolves to nothing at all.
    let rip = world.create_link("rip", god, DbRef::mk(4242)).unwrap();
    world.move_object(rip.base.dbref, VOID).unwrap();

    // A link that names no target program.
    let noop = world.create_link("noop", god, NOTHING).unwrap();
    world.move_object(noop.base.dbref, VOID).unwrap();

    for _ in 0..2 {
        let ball = world.create_thing("ball", god).unwrap();
        world.move_object(ball.base.dbref, VOID).unwrap();
    }

    world
}

async fn start_server() -> (Arc<Server<ScriptedRuntime>>, SocketAddr) {
    let world = build_world();
    let engine = Arc::new(ScriptEngine::new(Arc::new(ScriptedRuntime), world.clone()));
    let config = ServerConfig {
        listeners: vec![ListenerConfig {
            protocol: Protocol::Tcp,
            address: "127.0.0.1".to_string(),
            port: 0,
        }],
        program_dirs: vec![],
    };
    let server = Arc::new(Server::new(world, engine, config));
    let bound = server.start().await.unwrap();
    (server, bound[0])
}

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        line.trim_end_matches(['\r', '\n']).to_string()
    }

    async fn expect(&mut self, wanted: &str) {
        assert_eq!(self.read_line().await, wanted);
    }
}

#[tokio::test]
async fn test_greeting_and_anonymous_look() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;

    client.expect("200 Service available, posting allowed").await;
    client.send("look").await;
    client
        .expect(&format!("The Void ({})", VOID.to_literal()))
        .await;
    client.expect(VOID_DESCRIPTION).await;

    server.stop().await;
}

#[tokio::test]
async fn test_ambiguous_direct_object() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("look ball").await;
    client.expect("Which one?").await;

    server.stop().await;
}

#[tokio::test]
async fn test_space_time_rip() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("rip").await;
    client
        .expect("You peer closer and notice a rip in the space-time continuum...")
        .await;

    server.stop().await;
}

#[tokio::test]
async fn test_link_without_target_is_huh() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("noop").await;
    client.expect("Huh?").await;

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_verb() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("xyzzy").await;
    client.expect("Er?").await;

    server.stop().await;
}

#[tokio::test]
async fn test_failed_direct_object_match() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    // The verb resolves, but the direct object matches nothing in scope: no program runs.
    client.send("look xyzzy").await;
    client.expect("Er?").await;

    // The very next output is the bare look, so nothing was spawned for the failed one.
    client.send("look").await;
    client
        .expect(&format!("The Void ({})", VOID.to_literal()))
        .await;
    client.expect(VOID_DESCRIPTION).await;

    server.stop().await;
}

#[tokio::test]
async fn test_connect_authentication() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    // Built-in and username are both case-insensitive.
    client.send("connect GOD god").await;
    client.expect("Greetings, Professor Faulkin").await;

    server.stop().await;
}

#[tokio::test]
async fn test_connect_rejects_bad_password() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("CONNECT god wrong").await;
    client
        .expect("Either that player does not exist, or has a different password.")
        .await;

    server.stop().await;
}

#[tokio::test]
async fn test_malformed_builtin_is_500() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("CONNECT god").await;
    client.expect("500 Unknown command").await;

    server.stop().await;
}

#[tokio::test]
async fn test_unauthenticated_program_requires_login() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("secret").await;
    client
        .expect("You must be logged in to use that command.")
        .await;

    // After login the same command runs.
    client.send("CONNECT god god").await;
    client.expect("Greetings, Professor Faulkin").await;
    client.send("secret").await;
    client.expect("the password is swordfish").await;

    server.stop().await;
}

#[tokio::test]
async fn test_interactive_echo_session() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    // The next inbound line is routed to the program, not parsed as a command.
    client.send("echo").await;
    client.send("hello sailor").await;
    client.expect("hello sailor").await;

    // The redirection is cleared once the program completes.
    client.send("look").await;
    client
        .expect(&format!("The Void ({})", VOID.to_literal()))
        .await;

    server.stop().await;
}

#[tokio::test]
async fn test_quit_says_goodbye() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    client.send("QUIT").await;
    client.expect("GOODBYE!").await;

    server.stop().await;
}

#[tokio::test]
async fn test_stop_drains_connections() {
    let (server, addr) = start_server().await;
    let mut client = Client::connect(addr).await;
    client.read_line().await;

    server.stop().await;
    client.expect("GOODBYE!").await;
}
