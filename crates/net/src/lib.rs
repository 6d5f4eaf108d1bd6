//! Seatplan Network Library
//!
//! Shares the board documents between clients over TCP.
//!
//! # Architecture
//!
//! - **Server**: Keeps the documents in SQLite, pushes every change to subscribers
//! - **Client**: A [`RemoteStore`](seatplan_core::RemoteStore) backed by a server
//! - **Protocol**: Length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! // Serve the shared documents
//! let server = Server::start(DEFAULT_PORT, DocumentDatabase::open(path)?).await?;
//!
//! // Each board connects and subscribes
//! let client = Client::connect(addr, Uuid::new_v4()).await?;
//! client.subscribe(ResourceKey::SeatingPlan, callback).await?;
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, ConnectionState};
pub use error::{Error, Result};
pub use protocol::{DocumentSnapshot, Message};
pub use server::Server;

/// Default port for store servers
pub const DEFAULT_PORT: u16 = 7341;
