//! TCP client for a store server
//!
//! Implements [`RemoteStore`] over one connection. Reads and writes are
//! matched to their replies by request id; snapshots pushed by the server
//! are decoded and handed to every callback registered for that document.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use seatplan_core::{Document, RemoteStore, ResourceKey, SnapshotCallback};
use serde_json::Value;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{DocumentSnapshot, Message};

/// Outbound command queue depth
const COMMAND_QUEUE: usize = 64;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Answer to a read or write request
enum Reply {
    Read(Option<Document>),
    Written { revision: u64 },
}

enum ClientCommand {
    Send(Message),
    Disconnect,
}

struct ClientState {
    connection: ConnectionState,
    pending: HashMap<u64, oneshot::Sender<Result<Reply>>>,
    subscriptions: HashMap<ResourceKey, Vec<SnapshotCallback>>,
    /// Last value pushed for each subscribed document
    latest: HashMap<ResourceKey, Option<Document>>,
}

struct ClientInner {
    client_id: Uuid,
    cmd_tx: mpsc::Sender<ClientCommand>,
    state: Arc<RwLock<ClientState>>,
    next_request: AtomicU64,
}

/// Client handle for a store server, cheap to clone
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    /// Connect and complete the handshake
    pub async fn connect(addr: SocketAddr, client_id: Uuid) -> Result<Self> {
        info!(addr = %addr, client_id = %client_id, "Connecting to store server");

        let stream = TcpStream::connect(addr).await?;
        let (mut reader, mut writer) = tokio::io::split(stream);

        write_frame(&mut writer, &Message::Hello { client_id }).await?;
        match read_frame(&mut reader).await? {
            Message::Welcome { server_time } => {
                debug!(server_time = %server_time, "Handshake complete");
            }
            Message::Rejected { reason } => {
                warn!(reason = %reason, "Connection rejected");
                return Err(Error::Rejected(reason));
            }
            _ => return Err(Error::Protocol("Expected Welcome".into())),
        }

        let state = Arc::new(RwLock::new(ClientState {
            connection: ConnectionState::Connected,
            pending: HashMap::new(),
            subscriptions: HashMap::new(),
            latest: HashMap::new(),
        }));

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let reader_handle = tokio::spawn(reader_task(reader, state.clone()));
        tokio::spawn(connection_task(writer, reader_handle, state.clone(), cmd_rx));

        info!(addr = %addr, "Connected to store server");

        Ok(Client {
            inner: Arc::new(ClientInner {
                client_id,
                cmd_tx,
                state,
                next_request: AtomicU64::new(1),
            }),
        })
    }

    pub fn client_id(&self) -> Uuid {
        self.inner.client_id
    }

    /// Get current connection state
    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.state.read().await.connection
    }

    /// Send a ping
    pub async fn ping(&self) -> Result<()> {
        self.send(Message::Ping).await
    }

    /// Disconnect from the server
    pub async fn disconnect(&self) {
        let _ = self.inner.cmd_tx.send(ClientCommand::Disconnect).await;
    }

    async fn send(&self, msg: Message) -> Result<()> {
        self.inner
            .cmd_tx
            .send(ClientCommand::Send(msg))
            .await
            .map_err(|_| Error::NotConnected)
    }

    fn next_request_id(&self) -> u64 {
        self.inner.next_request.fetch_add(1, Ordering::Relaxed)
    }

    /// Send a request and wait for its reply
    async fn request(&self, request_id: u64, msg: Message) -> Result<Reply> {
        let (tx, rx) = oneshot::channel();
        {
            let mut s = self.inner.state.write().await;
            if s.connection != ConnectionState::Connected {
                return Err(Error::NotConnected);
            }
            s.pending.insert(request_id, tx);
        }

        if let Err(e) = self.send(msg).await {
            self.inner.state.write().await.pending.remove(&request_id);
            return Err(e);
        }

        rx.await.map_err(|_| Error::ConnectionClosed)?
    }
}

impl RemoteStore for Client {
    type Error = Error;

    async fn read(&self, key: ResourceKey) -> Result<Option<Document>> {
        let request_id = self.next_request_id();
        match self.request(request_id, Message::Read { request_id, key }).await? {
            Reply::Read(doc) => Ok(doc),
            Reply::Written { .. } => Err(Error::Protocol("Expected ReadResult".into())),
        }
    }

    async fn write(&self, document: Document) -> Result<()> {
        let key = document.key();
        let body = document.to_value()?;
        let request_id = self.next_request_id();
        match self
            .request(
                request_id,
                Message::Write {
                    request_id,
                    key,
                    body,
                },
            )
            .await?
        {
            Reply::Written { revision } => {
                debug!(key = %key, revision, "Write acknowledged");
                Ok(())
            }
            Reply::Read(_) => Err(Error::Protocol("Expected WriteAck".into())),
        }
    }

    async fn subscribe(&self, key: ResourceKey, callback: SnapshotCallback) -> Result<()> {
        let (first, cached) = {
            let mut s = self.inner.state.write().await;
            if s.connection != ConnectionState::Connected {
                return Err(Error::NotConnected);
            }
            let callbacks = s.subscriptions.entry(key).or_default();
            callbacks.push(callback.clone());
            let first = callbacks.len() == 1;
            (first, s.latest.get(&key).cloned())
        };

        if first {
            self.send(Message::Subscribe { key }).await?;
        } else if let Some(doc) = cached {
            // Already subscribed; the server will not resend the current value
            callback(key, doc);
        }
        Ok(())
    }
}

/// Drives outgoing commands until disconnect or until the reader stops
async fn connection_task(
    mut writer: WriteHalf<TcpStream>,
    mut reader_handle: JoinHandle<()>,
    state: Arc<RwLock<ClientState>>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Send(msg)) => {
                        if let Err(e) = write_frame(&mut writer, &msg).await {
                            warn!(error = %e, "Write error");
                            break;
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }
            _ = &mut reader_handle => {
                break;
            }
        }
    }

    reader_handle.abort();

    let pending = {
        let mut s = state.write().await;
        s.connection = ConnectionState::Disconnected;
        std::mem::take(&mut s.pending)
    };
    for (_, tx) in pending {
        let _ = tx.send(Err(Error::ConnectionClosed));
    }
    info!("Disconnected from store server");
}

/// Reads server messages until the connection ends
async fn reader_task(mut reader: ReadHalf<TcpStream>, state: Arc<RwLock<ClientState>>) {
    loop {
        match read_frame(&mut reader).await {
            Ok(Message::ServerShutdown) => {
                info!("Server shutting down");
                break;
            }
            Ok(msg) => handle_server_message(msg, &state).await,
            Err(Error::ConnectionClosed) => {
                debug!("Server closed connection");
                break;
            }
            Err(e) => {
                warn!(error = %e, "Read error");
                break;
            }
        }
    }
}

/// Handle a message from the server
async fn handle_server_message(msg: Message, state: &Arc<RwLock<ClientState>>) {
    match msg {
        Message::ReadResult {
            request_id,
            key,
            body,
        } => {
            let reply = decode_body(key, body).map(Reply::Read);
            resolve(state, request_id, reply).await;
        }
        Message::WriteAck {
            request_id,
            revision,
        } => resolve(state, request_id, Ok(Reply::Written { revision })).await,
        Message::RequestFailed { request_id, reason } => {
            resolve(state, request_id, Err(Error::RequestFailed(reason))).await;
        }
        Message::Snapshot(snapshot) => deliver_snapshot(snapshot, state).await,
        Message::Pong => {
            debug!("Received pong");
        }
        _ => {
            debug!("Ignoring unexpected message");
        }
    }
}

fn decode_body(key: ResourceKey, body: Option<Value>) -> Result<Option<Document>> {
    body.map(|value| Document::from_value(key, value))
        .transpose()
        .map_err(Error::from)
}

async fn resolve(state: &Arc<RwLock<ClientState>>, request_id: u64, reply: Result<Reply>) {
    let tx = state.write().await.pending.remove(&request_id);
    match tx {
        Some(tx) => {
            let _ = tx.send(reply);
        }
        None => debug!(request_id, "Reply for unknown request"),
    }
}

/// Record a pushed value and run the callbacks for its document
async fn deliver_snapshot(snapshot: DocumentSnapshot, state: &Arc<RwLock<ClientState>>) {
    let key = snapshot.key;
    let doc = match decode_body(key, snapshot.body) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(
                key = %key,
                revision = snapshot.revision,
                error = %e,
                "Malformed document, treating as absent"
            );
            None
        }
    };

    debug!(
        key = %key,
        revision = snapshot.revision,
        writer = ?snapshot.writer,
        "Snapshot received"
    );

    let callbacks = {
        let mut s = state.write().await;
        s.latest.insert(key, doc.clone());
        s.subscriptions.get(&key).cloned().unwrap_or_default()
    };

    for callback in callbacks {
        callback(key, doc.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Server;
    use seatplan_core::{DocumentDatabase, Side};
    use std::time::Duration;

    type Received = mpsc::UnboundedReceiver<(ResourceKey, Option<Document>)>;

    async fn start_server() -> Server {
        let db = DocumentDatabase::open_in_memory().unwrap();
        Server::start(0, db).await.unwrap()
    }

    fn local(server: &Server) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], server.addr().port()))
    }

    fn recorder() -> (SnapshotCallback, Received) {
        let (tx, rx) = mpsc::unbounded_channel();
        let callback: SnapshotCallback = Arc::new(move |key, doc| {
            let _ = tx.send((key, doc));
        });
        (callback, rx)
    }

    async fn next(rx: &mut Received) -> (ResourceKey, Option<Document>) {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("Timed out waiting for snapshot")
            .expect("Callback channel closed")
    }

    fn roster(side: Side, names: &[&str]) -> Document {
        Document::Roster {
            side,
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_client_connect() {
        let server = start_server().await;
        let client = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();

        assert_eq!(client.connection_state().await, ConnectionState::Connected);
        client.ping().await.unwrap();

        client.disconnect().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_read_absent_document() {
        let server = start_server().await;
        let client = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();

        assert!(client.read(ResourceKey::SeatingPlan).await.unwrap().is_none());
        assert!(client.read_roster(Side::Bride).await.unwrap().is_none());
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let server = start_server().await;
        let client = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();

        client
            .write_roster(Side::Groom, vec!["Alice".into(), "Zed".into()])
            .await
            .unwrap();
        assert_eq!(
            client.read_roster(Side::Groom).await.unwrap(),
            Some(vec!["Alice".to_string(), "Zed".to_string()])
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_sees_other_clients_write() {
        let server = start_server().await;
        let writer = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();
        let watcher = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();

        let key = ResourceKey::Roster(Side::Groom);
        let (callback, mut rx) = recorder();
        watcher.subscribe(key, callback).await.unwrap();
        assert_eq!(next(&mut rx).await, (key, None));

        writer.write(roster(Side::Groom, &["Alice"])).await.unwrap();
        assert_eq!(
            next(&mut rx).await,
            (key, Some(roster(Side::Groom, &["Alice"])))
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let server = start_server().await;
        let a = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();
        let b = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();

        a.write(roster(Side::Bride, &["Nadia"])).await.unwrap();
        b.write(roster(Side::Bride, &["Omar"])).await.unwrap();

        assert_eq!(
            a.read(ResourceKey::Roster(Side::Bride)).await.unwrap(),
            Some(roster(Side::Bride, &["Omar"]))
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_second_callback_gets_cached_value() {
        let server = start_server().await;
        let client = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();
        client.write(roster(Side::Groom, &["Alice"])).await.unwrap();

        let key = ResourceKey::Roster(Side::Groom);
        let (first, mut first_rx) = recorder();
        client.subscribe(key, first).await.unwrap();
        assert_eq!(
            next(&mut first_rx).await,
            (key, Some(roster(Side::Groom, &["Alice"])))
        );

        let (second, mut second_rx) = recorder();
        client.subscribe(key, second).await.unwrap();
        assert_eq!(
            next(&mut second_rx).await,
            (key, Some(roster(Side::Groom, &["Alice"])))
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_client_id_rejected() {
        let server = start_server().await;
        let id = Uuid::new_v4();
        let _first = Client::connect(local(&server), id).await.unwrap();

        let second = Client::connect(local(&server), id).await;
        assert!(matches!(second, Err(Error::Rejected(_))));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_requests_fail_after_disconnect() {
        let server = start_server().await;
        let client = Client::connect(local(&server), Uuid::new_v4())
            .await
            .unwrap();

        client.disconnect().await;
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.connection_state().await == ConnectionState::Connected {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert!(client.read(ResourceKey::SeatingPlan).await.is_err());
        server.shutdown().await;
    }
}
