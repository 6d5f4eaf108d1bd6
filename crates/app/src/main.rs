//! Seatplan - shared seating board
//!
//! `seatplan` opens a board in the terminal, connected to the store server
//! named in the config or to a throwaway in-process store.
//! `seatplan serve [port]` runs the store server.

use std::net::SocketAddr;
use std::sync::Arc;

use seatplan_core::{
    DeleteRefusal, DocumentDatabase, Event, MemoryStore, PinnedSet, RemoteStore, ZoneTopology,
};
use seatplan_net::{Client, Error, Result, Server};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

mod config;
mod console;
mod runtime;
mod viewmodel;

use config::AppConfig;
use console::Command;
use runtime::{BoardRuntime, Notice};
use viewmodel::BoardView;

const USAGE: &str = "Usage: seatplan [board | serve [port]]";

fn main() {
    // Initialize logging; stdout belongs to the console
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("Starting Seatplan");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");

    let result = runtime.block_on(async {
        match args.first().map(String::as_str) {
            None | Some("board") => board(&config).await,
            Some("serve") => serve(&config, args.get(1).map(String::as_str)).await,
            Some(_) => {
                eprintln!("{}", USAGE);
                std::process::exit(2);
            }
        }
    });

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// Run the store server until interrupted
async fn serve(config: &AppConfig, port: Option<&str>) -> Result<()> {
    let port = match port {
        Some(port) => port.parse().map_err(|_| {
            seatplan_core::Error::Config(format!("Invalid port: {}", port))
        })?,
        None => config.server.port,
    };

    let path = config.database_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = DocumentDatabase::open(&path)?;

    let server = Server::start(port, db).await?;
    info!(addr = %server.addr(), database = %path.display(), "Serving board documents");

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}

/// Open the board against the configured store
async fn board(config: &AppConfig) -> Result<()> {
    let topology = Arc::new(ZoneTopology::from_config(&config.board)?);
    let pinned = config.board.pinned.clone();

    match &config.remote.addr {
        Some(addr) => {
            let addr = resolve(addr).await?;
            let client = Client::connect(addr, Uuid::new_v4()).await?;
            run_board(Arc::new(client), topology, pinned).await
        }
        None => {
            warn!("No remote store configured, changes are kept for this session only");
            run_board(Arc::new(MemoryStore::new()), topology, pinned).await
        }
    }
}

async fn resolve(addr: &str) -> Result<SocketAddr> {
    tokio::net::lookup_host(addr)
        .await?
        .next()
        .ok_or_else(|| seatplan_core::Error::Config(format!("Cannot resolve {}", addr)).into())
}

/// Console loop: typed commands in, notices out
async fn run_board<S>(store: Arc<S>, topology: Arc<ZoneTopology>, pinned: PinnedSet) -> Result<()>
where
    S: RemoteStore,
    Error: From<S::Error>,
{
    let (runtime, handle, mut notices) = BoardRuntime::new(store, topology, pinned);
    let task = tokio::spawn(runtime.run());

    println!("{}", console::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut view: Option<BoardView> = None;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match console::parse(&line) {
                    None => {}
                    Some(Err(e)) => println!("{}", e),
                    Some(Ok(Command::Quit)) => break,
                    Some(Ok(Command::Help)) => println!("{}", console::HELP),
                    Some(Ok(Command::Show)) => match &view {
                        Some(view) => print!("{}", view.render()),
                        None => println!("Board not loaded yet"),
                    },
                    Some(Ok(Command::Board(event))) => {
                        handle.send(event);
                    }
                    Some(Ok(Command::Move { name, to })) => {
                        match view.as_ref().and_then(|v| v.locate(&name)) {
                            Some(from) => {
                                let from = from.to_string();
                                handle.send(Event::MoveGuest { name, from, to });
                            }
                            None => println!("Unknown guest: {}", name),
                        }
                    }
                }
            }
            notice = notices.recv() => {
                match notice {
                    Some(Notice::Board(board)) => {
                        println!("Seated: {}/{}", board.counters.placed, board.counters.total);
                        view = Some(board);
                    }
                    Some(Notice::MoveRejected { name, rejection }) => {
                        println!("Cannot move {}: {}", name, rejection);
                    }
                    Some(Notice::ConfirmationRequired { side, name }) => {
                        println!("Delete {} from {}? (yes/no)", name, side);
                    }
                    Some(Notice::DeleteRefused { name, reason }) => match reason {
                        DeleteRefusal::Pinned => println!("{} is pinned and cannot be deleted", name),
                        DeleteRefusal::UnknownGuest => println!("Unknown guest: {}", name),
                    },
                    None => break,
                }
            }
        }
    }

    handle.shutdown();
    match task.await {
        Ok(result) => result.map_err(Error::from),
        Err(e) => {
            warn!(error = %e, "Board runtime task failed");
            Ok(())
        }
    }
}
