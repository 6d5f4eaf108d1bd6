//! TCP document store server
//!
//! Holds the shared roster and seating plan documents in SQLite. Clients
//! read, write and subscribe; every accepted write is pushed as a full
//! snapshot to each subscriber of that document, the writer included.
//! Writes are applied in arrival order and the last one wins.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError};

use chrono::Utc;
use seatplan_core::{DocumentDatabase, ResourceKey, StoredDocument};
use serde_json::Value;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{DocumentSnapshot, Message};

/// Maximum number of connected clients
const MAX_PEERS: usize = 32;

/// Outbound queue depth per client; a client that lets it fill is dropped
const PEER_QUEUE: usize = 64;

/// Connected client state
struct Peer {
    tx: mpsc::Sender<Message>,
    subscriptions: HashSet<ResourceKey>,
}

/// Server state shared across tasks
struct ServerState {
    /// Never held across an await
    db: StdMutex<DocumentDatabase>,
    peers: HashMap<Uuid, Peer>,
}

impl ServerState {
    fn db(&self) -> StdMutexGuard<'_, DocumentDatabase> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self, key: ResourceKey) -> Result<DocumentSnapshot> {
        let loaded = self.db().load(key)?;
        Ok(match loaded {
            Some(doc) => stored_snapshot(doc, None),
            None => DocumentSnapshot {
                key,
                body: None,
                revision: 0,
                updated_at: None,
                writer: None,
            },
        })
    }

    fn subscribers(&self, key: ResourceKey) -> Vec<Uuid> {
        self.peers
            .iter()
            .filter(|(_, p)| p.subscriptions.contains(&key))
            .map(|(id, _)| *id)
            .collect()
    }

    /// Queue a message for one client without waiting
    ///
    /// A full queue means the client stopped reading. It is dropped so the
    /// lock is never held waiting on it.
    fn queue(&mut self, client_id: Uuid, msg: Message) {
        let Some(peer) = self.peers.get(&client_id) else {
            return;
        };
        match peer.tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(client_id = %client_id, "Client is not keeping up, disconnecting");
                self.peers.remove(&client_id);
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client_id = %client_id, "Failed to queue message");
            }
        }
    }

    /// Remove the peer entry if it still belongs to the connection owning `own`
    fn remove_peer(&mut self, client_id: Uuid, own: &mpsc::WeakSender<Message>) {
        let Some(own) = own.upgrade() else {
            // Already dropped for falling behind
            return;
        };
        if self
            .peers
            .get(&client_id)
            .is_some_and(|p| p.tx.same_channel(&own))
        {
            self.peers.remove(&client_id);
        }
    }
}

fn stored_snapshot(doc: StoredDocument, writer: Option<Uuid>) -> DocumentSnapshot {
    DocumentSnapshot {
        key: doc.key,
        body: Some(doc.body),
        revision: doc.revision,
        updated_at: Some(doc.updated_at),
        writer,
    }
}

/// Document store server handle
pub struct Server {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Start serving `db` on the given port (0 picks a free port)
    pub async fn start(port: u16, db: DocumentDatabase) -> Result<Self> {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        let listener = TcpListener::bind(addr).await?;
        let bound_addr = listener.local_addr()?;

        info!(addr = %bound_addr, "Store server started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(Mutex::new(ServerState {
            db: StdMutex::new(db),
            peers: HashMap::new(),
        }));

        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(accept_loop(listener, state.clone(), shutdown_rx));

        Ok(Server {
            addr: bound_addr,
            state,
            shutdown_tx,
        })
    }

    /// Get the server's bound address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of connected clients
    pub async fn peer_count(&self) -> usize {
        self.state.lock().await.peers.len()
    }

    /// Shutdown the server
    pub async fn shutdown(&self) {
        let peers: Vec<_> = {
            let state = self.state.lock().await;
            state.peers.values().map(|p| p.tx.clone()).collect()
        };
        for tx in peers {
            let _ = tx.send(Message::ServerShutdown).await;
        }
        let _ = self.shutdown_tx.send(());
        info!("Server shutdown initiated");
    }
}

/// Accept incoming connections
async fn accept_loop(
    listener: TcpListener,
    state: Arc<Mutex<ServerState>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(stream, addr, state.clone()));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

/// Handle a single client connection
async fn handle_connection(stream: TcpStream, addr: SocketAddr, state: Arc<Mutex<ServerState>>) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    let (msg_tx, msg_rx) = mpsc::channel(PEER_QUEUE);
    let own = msg_tx.downgrade();
    let client_id = match handle_hello(&mut reader, &state, msg_tx).await {
        Ok(id) => id,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Handshake failed");
            let reason = e.to_string();
            let _ = write_frame(&mut writer, &Message::Rejected { reason }).await;
            return;
        }
    };

    info!(addr = %addr, client_id = %client_id, "Client connected");

    if let Err(e) = write_frame(
        &mut writer,
        &Message::Welcome {
            server_time: Utc::now(),
        },
    )
    .await
    {
        warn!(client_id = %client_id, error = %e, "Failed to send welcome");
        state.lock().await.remove_peer(client_id, &own);
        return;
    }

    let mut writer_handle = tokio::spawn(writer_task(writer, msg_rx));

    loop {
        tokio::select! {
            frame = read_frame(&mut reader) => match frame {
                Ok(msg) => handle_message(msg, client_id, &state).await,
                Err(Error::ConnectionClosed) => {
                    debug!(client_id = %client_id, "Connection closed");
                    break;
                }
                Err(e) => {
                    warn!(client_id = %client_id, error = %e, "Read error");
                    break;
                }
            },
            // Ends once the peer entry is dropped and the queue drains
            _ = &mut writer_handle => {
                debug!(client_id = %client_id, "Writer finished");
                break;
            }
        }
    }

    writer_handle.abort();
    state.lock().await.remove_peer(client_id, &own);
    info!(client_id = %client_id, "Client disconnected");
}

/// First message must be Hello
async fn handle_hello(
    reader: &mut ReadHalf<TcpStream>,
    state: &Arc<Mutex<ServerState>>,
    tx: mpsc::Sender<Message>,
) -> Result<Uuid> {
    match read_frame(reader).await? {
        Message::Hello { client_id } => {
            let mut s = state.lock().await;
            if s.peers.len() >= MAX_PEERS {
                return Err(Error::ServerFull);
            }
            if s.peers.contains_key(&client_id) {
                return Err(Error::Rejected("Already connected".into()));
            }
            s.peers.insert(
                client_id,
                Peer {
                    tx,
                    subscriptions: HashSet::new(),
                },
            );
            Ok(client_id)
        }
        _ => Err(Error::Protocol("Expected Hello".into())),
    }
}

/// Writer task - sends queued messages to the client
async fn writer_task(mut writer: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        if let Err(e) = write_frame(&mut writer, &msg).await {
            debug!(error = %e, "Write failed");
            break;
        }
    }
}

/// Handle an incoming message
async fn handle_message(msg: Message, sender_id: Uuid, state: &Arc<Mutex<ServerState>>) {
    match msg {
        Message::Read { request_id, key } => {
            let mut s = state.lock().await;
            let loaded = s.db().load(key);
            let reply = match loaded {
                Ok(doc) => Message::ReadResult {
                    request_id,
                    key,
                    body: doc.map(|d| d.body),
                },
                Err(e) => {
                    error!(key = %key, error = %e, "Read failed");
                    Message::RequestFailed {
                        request_id,
                        reason: e.to_string(),
                    }
                }
            };
            s.queue(sender_id, reply);
        }
        Message::Write {
            request_id,
            key,
            body,
        } => handle_write(request_id, key, body, sender_id, state).await,
        Message::Subscribe { key } => {
            let mut s = state.lock().await;
            if let Some(peer) = s.peers.get_mut(&sender_id) {
                peer.subscriptions.insert(key);
            }
            let snapshot = s.snapshot(key);
            match snapshot {
                Ok(snapshot) => s.queue(sender_id, Message::Snapshot(snapshot)),
                Err(e) => error!(key = %key, error = %e, "Failed to load snapshot"),
            }
            debug!(client_id = %sender_id, key = %key, "Subscribed");
        }
        Message::Ping => {
            state.lock().await.queue(sender_id, Message::Pong);
        }
        _ => {
            debug!(sender_id = %sender_id, "Ignoring unexpected message type");
        }
    }
}

/// Persist a write and fan the new value out to subscribers
///
/// Every subscriber is queued before the lock is released, so all clients
/// observe writes to a document in revision order. Queueing never waits.
async fn handle_write(
    request_id: u64,
    key: ResourceKey,
    body: Value,
    sender_id: Uuid,
    state: &Arc<Mutex<ServerState>>,
) {
    let mut s = state.lock().await;
    let saved = s.db().save(key, &body);
    let stored = match saved {
        Ok(stored) => stored,
        Err(e) => {
            error!(key = %key, error = %e, "Write failed");
            let reason = e.to_string();
            s.queue(sender_id, Message::RequestFailed { request_id, reason });
            return;
        }
    };

    let revision = stored.revision;
    info!(key = %key, revision, writer = %sender_id, "Document replaced");
    s.queue(sender_id, Message::WriteAck { request_id, revision });

    let snapshot = Message::Snapshot(stored_snapshot(stored, Some(sender_id)));
    for client_id in s.subscribers(key) {
        s.queue(client_id, snapshot.clone());
    }
}
