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

//! Connection worker implementation
//!
//! Each accepted connection is driven by one worker task. The worker owns the
//! [`ClientConnection`] and is the only place its authentication state changes:
//! - Inbound actions are dispatched strictly in arrival order
//! - The login deadline is polled in the same loop, so cancelling it is synchronous
//! - Outbound writes requested by the server arrive over the control channel
//! - Cleanup removes the registry entry exactly once

use crate::connection::{ClientConnection, Inbound};
use crate::dispatcher::{Outcome, dispatch, responses};
use crate::server::ServerContext;
use crate::{AmiServerError, AuthState, ConnectionId, Result};
use amitest_amicodec::{AmiMessage, CRLF};
use bytes::Bytes;
use std::sync::Arc;
use std::time::SystemTime;
use tokio::select;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, trace, warn};

/// Control messages for the worker
#[derive(Debug)]
pub enum ControlMessage {
    /// Encode and write a message
    Send(AmiMessage),
    /// Write a pre-formatted payload unmodified
    Raw(Bytes),
    /// Close the connection
    Close,
}

/// Why the event loop stopped
#[derive(Debug)]
enum Exit {
    PeerClosed,
    AuthTimeout,
    Shutdown,
    Failed(AmiServerError),
}

/// Connection worker that manages a single connection's lifecycle
pub struct ConnectionWorker {
    id: ConnectionId,
    connection: ClientConnection,
    state: AuthState,
    context: Arc<ServerContext>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
}

impl ConnectionWorker {
    /// Create a worker for a connection that is already registered as unauthenticated
    pub(crate) fn new(
        connection: ClientConnection,
        context: Arc<ServerContext>,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    ) -> Self {
        Self {
            id: connection.id(),
            connection,
            state: AuthState::Unauthenticated,
            context,
            control_rx,
        }
    }

    /// Run the worker until the connection closes
    #[instrument(
        name = "ami_connection",
        skip(self),
        fields(connection_id = %self.id, peer_addr = %self.connection.peer_addr())
    )]
    pub async fn run(mut self) {
        debug!(
            auth_pending = self.connection.is_auth_pending(),
            "Connection worker started"
        );
        let shutdown = self.context.shutdown.clone();
        // Server shutdown wins even over a write stuck on a peer that stopped reading
        let exit = select! {
            biased;

            () = shutdown.cancelled() => Exit::Shutdown,
            exit = self.event_loop() => exit,
        };
        match &exit {
            Exit::PeerClosed => debug!("Peer closed connection"),
            Exit::AuthTimeout => info!("Authentication timed out, closing connection"),
            Exit::Shutdown => debug!("Connection closed by server"),
            Exit::Failed(e) if e.is_connection_error() => debug!(error = %e, "Connection lost"),
            Exit::Failed(e) => warn!(error = %e, "Closing connection after error"),
        }
        self.cleanup(exit).await;
    }

    async fn event_loop(&mut self) -> Exit {
        loop {
            select! {
                biased;

                msg = self.control_rx.recv() => {
                    let written = match msg {
                        Some(ControlMessage::Send(message)) => self.connection.send(&message).await,
                        Some(ControlMessage::Raw(payload)) => self.connection.send_raw(payload).await,
                        // The registry entry owning the sender is gone
                        Some(ControlMessage::Close) | None => return Exit::Shutdown,
                    };
                    if let Err(e) = written {
                        return Exit::Failed(e);
                    }
                }

                inbound = self.connection.recv() => match inbound {
                    Inbound::Action(action) => {
                        if let Err(e) = self.handle_action(action).await {
                            return Exit::Failed(e);
                        }
                    }
                    Inbound::Error(e) => return Exit::Failed(e),
                    Inbound::Closed => return Exit::PeerClosed,
                    Inbound::AuthTimeout => return Exit::AuthTimeout,
                },
            }
        }
    }

    async fn handle_action(&mut self, action: AmiMessage) -> Result<()> {
        self.context.metrics.action_received();
        trace!(action = action.action_name().unwrap_or_default(), "Received action");

        let outcome = dispatch(
            &action,
            self.state,
            self.context.config.credentials.as_ref(),
            SystemTime::now(),
        );
        match outcome {
            Outcome::Reply(reply) => self.connection.send(&reply).await,
            Outcome::Goodbye(reply) => {
                self.connection.cancel_auth_timer();
                self.connection.send(&reply).await
            }
            Outcome::AuthFailed(reply) => {
                // Stays unauthenticated with no deadline until a later login succeeds
                self.connection.cancel_auth_timer();
                self.context.metrics.auth_failure();
                info!("Authentication failed");
                self.connection.send(&reply).await
            }
            Outcome::AuthAccepted(reply) => self.complete_login(reply).await,
            Outcome::Ignored => {
                debug!("Ignoring login from an authenticated client");
                Ok(())
            }
        }
    }

    async fn complete_login(&mut self, reply: AmiMessage) -> Result<()> {
        self.connection.cancel_auth_timer();
        self.state = AuthState::Authenticated;
        let promoted = self.context.registry.promote(self.id);
        self.context.metrics.auth_success();
        info!("Client authenticated");

        self.connection.feed(&reply).await?;
        self.connection.feed(&responses::fully_booted()).await?;
        if !self.context.config.hello_message.is_empty() {
            let banner = format!("{}{CRLF}", self.context.config.hello_message);
            self.connection.feed_raw(&banner).await?;
        }
        self.connection.flush().await?;

        if promoted {
            let authenticated = self.context.registry.authenticated_count();
            self.context.handler.on_connection(authenticated).await;
        }
        Ok(())
    }

    async fn cleanup(&mut self, exit: Exit) {
        self.connection.cancel_auth_timer();
        self.connection.close().await;
        self.state = AuthState::Closed;

        match exit {
            Exit::AuthTimeout => self.context.metrics.auth_timeout(),
            Exit::Failed(_) => self.context.metrics.connection_error(),
            Exit::PeerClosed | Exit::Shutdown => {}
        }
        self.context.metrics.connection_closed();

        self.control_rx.close();
        while self.control_rx.try_recv().is_ok() {}

        // Entries cleared by server shutdown are not reported individually
        if self.context.registry.remove(self.id).is_some() {
            self.context.handler.on_disconnect(self.id).await;
        }
        debug!(duration = ?self.connection.duration(), "Connection worker finished");
    }
}

impl std::fmt::Debug for ConnectionWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionWorker")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("peer_addr", &self.connection.peer_addr())
            .finish()
    }
}
