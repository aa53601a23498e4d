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

use clap::Parser;
use clap_derive::Parser;
use eyre::WrapErr;
use figment::Figment;
use figment::providers::{Format, Serialized, Yaml};
use mudpie_db::{FjallStore, KeyValueStore, TransientStore, WorldState};
use mudpie_kernel::{ScriptEngine, ScriptedRuntime};
use mudpie_server::config::{ListenerConfig, Protocol, ServerConfig};
use mudpie_server::{Server, seed};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::signal::unix::{SignalKind, signal};
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, value_name = "config", help = "Path to the yaml configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "data-dir",
        help = "Directory holding the world database",
        default_value = "mudpie-data"
    )]
    data_dir: PathBuf,

    #[arg(
        long,
        help = "Keep the world in memory only; nothing survives a restart",
        default_value = "false"
    )]
    transient: bool,

    #[arg(
        long,
        value_name = "port",
        help = "Listen port for a single TCP listener, overriding the configuration"
    )]
    port: Option<u16>,

    #[arg(long, help = "Enable debug logging", default_value = "false")]
    debug: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), eyre::Error> {
    color_eyre::install()?;
    let args: Args = Args::parse();

    let main_subscriber = tracing_subscriber::fmt()
        .compact()
        .with_ansi(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_names(true)
        .with_max_level(if args.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .finish();
    tracing::subscriber::set_global_default(main_subscriber)
        .expect("Unable to configure logging");

    let mut figment = Figment::from(Serialized::defaults(ServerConfig::default()));
    if let Some(path) = &args.config {
        figment = figment.merge(Yaml::file(path));
    }
    let mut config: ServerConfig = figment
        .extract()
        .wrap_err("Unable to load configuration")?;
    if let Some(port) = args.port {
        config.listeners = vec![ListenerConfig {
            protocol: Protocol::Tcp,
            address: "0.0.0.0".to_string(),
            port,
        }];
    }

    let store: Arc<dyn KeyValueStore> = if args.transient {
        info!("Using a transient in-memory world");
        Arc::new(TransientStore::new())
    } else {
        Arc::new(
            FjallStore::open(&args.data_dir)
                .wrap_err("Unable to open the world database")?,
        )
    };
    let world = Arc::new(WorldState::new(store));
    seed::ensure_seeded(&world, &config.program_dirs).wrap_err("Unable to seed the world")?;

    let engine = Arc::new(ScriptEngine::new(Arc::new(ScriptedRuntime), world.clone()));
    let server = Server::new(world, engine, config);
    server.start().await?;

    let mut hup_signal =
        signal(SignalKind::hangup()).expect("Unable to register HUP signal handler");
    let mut stop_signal =
        signal(SignalKind::interrupt()).expect("Unable to register STOP signal handler");
    select! {
        _ = hup_signal.recv() => {
            info!("HUP received, stopping...");
        },
        _ = stop_signal.recv() => {
            info!("STOP received, stopping...");
        }
    }
    server.stop().await;
    info!("Done.");

    Ok(())
}
