//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! AMI test server
//!
//! The [`AmiTestServer`] owns the listening socket and the client registry. It accepts
//! connections, applies admission control and hands each admitted socket to its own
//! [`ConnectionWorker`].

use crate::admission;
use crate::connection::ClientConnection;
use crate::registry::{BroadcastResult, ClientRegistry};
use crate::worker::{ConnectionWorker, ControlMessage};
use crate::{
    AmiServerError, CallbackHandler, ClientInfo, ConnectionId, MetricsSnapshot, Result,
    ServerConfig, ServerHandler, ServerMetrics, ServerSnapshot,
};
use amitest_amicodec::{AmiCodec, AmiMessage};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// State shared between the server and its connection workers
pub(crate) struct ServerContext {
    pub(crate) config: ServerConfig,
    pub(crate) registry: ClientRegistry,
    pub(crate) metrics: ServerMetrics,
    pub(crate) handler: Arc<dyn ServerHandler>,
    /// Cancelled by `close`; aborts every worker, including ones blocked in a write
    pub(crate) shutdown: CancellationToken,
}

impl ServerContext {
    pub(crate) fn new(config: ServerConfig, handler: Arc<dyn ServerHandler>) -> Self {
        Self {
            config,
            registry: ClientRegistry::new(),
            metrics: ServerMetrics::new(),
            handler,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Asterisk Manager Interface test server
///
/// Each instance owns its own registry, so several servers can run side by side in
/// one test process.
///
/// # Example
///
/// ```no_run
/// use amitest_server::{AmiTestServer, ServerConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServerConfig::default().with_credentials("admin", "secret");
///     let server = AmiTestServer::new(config)?;
///
///     let addr = server.listen(5038).await?;
///     println!("AMI test server on {addr}");
///
///     server.broadcast("Event: TestEvent\r\n\r\n");
///
///     server.close().await;
///     Ok(())
/// }
/// ```
pub struct AmiTestServer {
    context: Arc<ServerContext>,
    /// Next connection ID, shared with the accept loop
    next_id: Arc<AtomicU64>,
    /// Actual bind address
    local_addr: OnceLock<SocketAddr>,
    /// Server creation time
    started_at: Instant,
    /// Set while the accept loop runs
    running: Arc<AtomicBool>,
    /// Set once `close` has run
    closed: AtomicBool,
    /// Shutdown notification
    shutdown_notify: Arc<Notify>,
    /// Accept loop task handle
    accept_handle: Mutex<Option<JoinHandle<()>>>,
}

impl AmiTestServer {
    /// Create a server that reports nothing to the embedding code
    pub fn new(config: ServerConfig) -> Result<Self> {
        Self::with_handler(config, Arc::new(CallbackHandler::default()))
    }

    /// Create a server that reports lifecycle notifications to `handler`
    pub fn with_handler(config: ServerConfig, handler: Arc<dyn ServerHandler>) -> Result<Self> {
        config.validate().map_err(AmiServerError::InvalidConfig)?;
        Ok(Self {
            context: Arc::new(ServerContext::new(config, handler)),
            next_id: Arc::new(AtomicU64::new(1)),
            local_addr: OnceLock::new(),
            started_at: Instant::now(),
            running: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
            shutdown_notify: Arc::new(Notify::new()),
            accept_handle: Mutex::new(None),
        })
    }

    /// Bind `port` on the configured host and start accepting connections.
    ///
    /// Port 0 picks an ephemeral port; the bound address is returned either way.
    pub async fn listen(&self, port: u16) -> Result<SocketAddr> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(AmiServerError::ServerClosed);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(AmiServerError::AlreadyListening);
        }

        let addr = SocketAddr::new(self.context.config.bind_host, port);
        let (listener, local_addr) = match bind(addr).await {
            Ok(bound) => bound,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        let _ = self.local_addr.set(local_addr);

        if self.context.config.silent {
            debug!("Asterisk AMI Test Server listening on port {}", local_addr.port());
        } else {
            info!("Asterisk AMI Test Server listening on port {}", local_addr.port());
        }

        let handle = self.spawn_accept_loop(listener);
        *self.accept_handle.lock().await = Some(handle);

        self.context.handler.on_listening(local_addr).await;
        Ok(local_addr)
    }

    fn spawn_accept_loop(&self, listener: TcpListener) -> JoinHandle<()> {
        let context = self.context.clone();
        let next_id = self.next_id.clone();
        let running = self.running.clone();
        let shutdown_notify = self.shutdown_notify.clone();

        tokio::spawn(async move {
            loop {
                if !running.load(Ordering::SeqCst) {
                    break;
                }

                let accepted = tokio::select! {
                    result = listener.accept() => result,
                    _ = shutdown_notify.notified() => break,
                };

                match accepted {
                    Ok((socket, peer_addr)) => admit(&context, &next_id, socket, peer_addr),
                    Err(e) => {
                        error!(error = %e, "Failed to accept connection");
                        // Back off on errors to avoid tight loop
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                }
            }

            debug!("Accept loop terminated");
        })
    }

    /// Stop listening and close every client connection.
    ///
    /// Idempotent. The `on_close` notification fires on the first call only.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.running.store(false, Ordering::SeqCst);
        self.shutdown_notify.notify_one();

        if let Some(handle) = self.accept_handle.lock().await.take() {
            if tokio::time::timeout(Duration::from_secs(5), handle).await.is_err() {
                warn!("Accept loop did not stop in time");
            }
        }

        let closed = self.close_clients();
        info!(clients = closed, "Asterisk AMI Test Server closed");
        self.context.handler.on_close().await;
    }

    fn close_clients(&self) -> usize {
        let clients = self.context.registry.clear();
        for (_, client) in &clients {
            let _ = client.control().send(ControlMessage::Close);
        }
        self.context.shutdown.cancel();
        clients.len()
    }

    /// Write `payload` unmodified to every authenticated client.
    ///
    /// Writes are queued on each client's worker; delivery is not awaited.
    pub fn broadcast(&self, payload: impl Into<Bytes>) -> BroadcastResult {
        let payload = payload.into();
        let result = self.context.registry.broadcast(&payload);
        debug!(
            bytes = payload.len(),
            targets = result.total,
            failed = result.failed,
            "Broadcast queued"
        );
        result
    }

    /// Encode and write a message to one client, authenticated or not
    pub fn send_to_client(&self, id: ConnectionId, message: AmiMessage) -> Result<()> {
        let control = self
            .context
            .registry
            .control(id)
            .ok_or(AmiServerError::ConnectionNotFound(id))?;
        control
            .send(ControlMessage::Send(message))
            .map_err(|_| AmiServerError::ConnectionClosed)
    }

    /// Clients that have logged in
    pub fn get_auth_clients(&self) -> Vec<ClientInfo> {
        self.context.registry.list_authenticated()
    }

    /// Clients still waiting to log in
    pub fn get_unauth_clients(&self) -> Vec<ClientInfo> {
        self.context.registry.list_unauthenticated()
    }

    /// Every client, authenticated ones first
    pub fn get_clients(&self) -> Vec<ClientInfo> {
        self.context.registry.list_all()
    }

    /// Bound address, while listening
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied().filter(|_| self.is_listening())
    }

    /// Check if the server is accepting connections
    pub fn is_listening(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get a snapshot of the server state
    pub fn snapshot(&self) -> ServerSnapshot {
        let authenticated = self.context.registry.authenticated_count();
        ServerSnapshot {
            local_addr: self.local_addr(),
            authenticated,
            unauthenticated: self.context.registry.count().saturating_sub(authenticated),
            total_accepted: self.context.metrics.total_accepted(),
            uptime: self.started_at.elapsed(),
        }
    }

    /// Get a snapshot of the server metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        self.context.metrics.snapshot()
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }
}

async fn bind(addr: SocketAddr) -> Result<(TcpListener, SocketAddr)> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| AmiServerError::Bind { addr, source })?;
    let local_addr = listener.local_addr()?;
    Ok((listener, local_addr))
}

/// Admission gate and worker spawn for one accepted socket
fn admit(context: &Arc<ServerContext>, next_id: &AtomicU64, socket: TcpStream, peer_addr: SocketAddr) {
    let current = context.registry.count();
    if !admission::is_allowed(current, context.config.max_connections) {
        warn!(
            peer_addr = %peer_addr,
            clients = current,
            max_connections = context.config.max_connections,
            "Connection limit reached, rejecting connection"
        );
        context.metrics.connection_rejected();
        drop(socket);
        return;
    }

    let id = ConnectionId::new(next_id.fetch_add(1, Ordering::SeqCst));
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    if !context.registry.register(id, peer_addr, control_tx) {
        error!(connection_id = %id, "Connection ID already registered");
        return;
    }
    context.metrics.connection_accepted();

    let codec = AmiCodec::new().with_max_message_length(context.config.max_message_length);
    let connection = ClientConnection::new(
        id,
        socket,
        peer_addr,
        codec,
        context.config.auth_timeout,
        context.config.write_timeout,
    );
    debug!(connection_id = %id, peer_addr = %peer_addr, "Accepted connection");
    tokio::spawn(ConnectionWorker::new(connection, context.clone(), control_rx).run());
}

impl std::fmt::Debug for AmiTestServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmiTestServer")
            .field("local_addr", &self.local_addr())
            .field("listening", &self.is_listening())
            .field("clients", &self.context.registry.count())
            .field("uptime", &self.started_at.elapsed())
            .finish()
    }
}

impl Drop for AmiTestServer {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            if self.running.swap(false, Ordering::SeqCst) {
                warn!("AmiTestServer dropped while still listening");
                self.shutdown_notify.notify_one();
            }
            self.close_clients();
        }
    }
}
