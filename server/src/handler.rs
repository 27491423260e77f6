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

//! Notification traits and implementations for the AMI test server

use crate::ConnectionId;
use async_trait::async_trait;
use std::net::SocketAddr;
use tokio::sync::mpsc;

/// Server notification handler trait
///
/// Implement this trait to observe the server's lifecycle from a test harness.
/// All methods are async and have default implementations that do nothing.
///
/// # Example
///
/// ```no_run
/// use amitest_server::ServerHandler;
/// use async_trait::async_trait;
///
/// struct MyHandler;
///
/// #[async_trait]
/// impl ServerHandler for MyHandler {
///     async fn on_connection(&self, authenticated: usize) {
///         println!("{authenticated} clients logged in");
///     }
/// }
/// ```
#[async_trait]
pub trait ServerHandler: Send + Sync + 'static {
    /// Called once the listening socket is bound
    async fn on_listening(&self, _addr: SocketAddr) {}

    /// Called after each successful login with the number of authenticated clients
    async fn on_connection(&self, _authenticated: usize) {}

    /// Called when a tracked connection closes on its own (peer close, error, auth timeout)
    async fn on_disconnect(&self, _id: ConnectionId) {}

    /// Called once when the server has shut down
    async fn on_close(&self) {}
}

/// Typed server notification, delivered through an event channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Listener bound to the given address
    Listening(SocketAddr),
    /// A client logged in; carries the authenticated client count
    Connection(usize),
    /// A tracked connection went away
    Disconnect(ConnectionId),
    /// Server shut down
    Close,
}

/// Forward every notification into an unbounded channel.
///
/// # Example
///
/// ```no_run
/// use amitest_server::{AmiTestServer, ServerConfig, ServerEvent};
/// use std::sync::Arc;
///
/// # async fn example() -> amitest_server::Result<()> {
/// let (tx, mut events) = tokio::sync::mpsc::unbounded_channel::<ServerEvent>();
/// let server = AmiTestServer::with_handler(ServerConfig::default(), Arc::new(tx))?;
/// server.listen(0).await?;
/// assert!(matches!(events.recv().await, Some(ServerEvent::Listening(_))));
/// # Ok(())
/// # }
/// ```
#[async_trait]
impl ServerHandler for mpsc::UnboundedSender<ServerEvent> {
    async fn on_listening(&self, addr: SocketAddr) {
        let _ = self.send(ServerEvent::Listening(addr));
    }

    async fn on_connection(&self, authenticated: usize) {
        let _ = self.send(ServerEvent::Connection(authenticated));
    }

    async fn on_disconnect(&self, id: ConnectionId) {
        let _ = self.send(ServerEvent::Disconnect(id));
    }

    async fn on_close(&self) {
        let _ = self.send(ServerEvent::Close);
    }
}

/// Callback-based handler implementation
///
/// This provides a flexible way to observe the server using closures instead
/// of implementing the `ServerHandler` trait. The default value ignores everything.
///
/// # Example
///
/// ```no_run
/// use amitest_server::CallbackHandler;
/// use std::sync::Arc;
///
/// let handler = Arc::new(CallbackHandler {
///     on_connection: Some(Box::new(|count: usize| {
///         println!("{count} clients authenticated");
///     })),
///     ..Default::default()
/// });
/// ```
#[derive(Default)]
pub struct CallbackHandler {
    /// Called when the listener is bound
    pub on_listening: Option<Box<dyn Fn(SocketAddr) + Send + Sync + 'static>>,
    /// Called after each successful login
    pub on_connection: Option<Box<dyn Fn(usize) + Send + Sync + 'static>>,
    /// Called when a tracked connection goes away
    pub on_disconnect: Option<Box<dyn Fn(ConnectionId) + Send + Sync + 'static>>,
    /// Called on server shutdown
    pub on_close: Option<Box<dyn Fn() + Send + Sync + 'static>>,
}

#[async_trait]
impl ServerHandler for CallbackHandler {
    async fn on_listening(&self, addr: SocketAddr) {
        if let Some(ref f) = self.on_listening {
            f(addr);
        }
    }

    async fn on_connection(&self, authenticated: usize) {
        if let Some(ref f) = self.on_connection {
            f(authenticated);
        }
    }

    async fn on_disconnect(&self, id: ConnectionId) {
        if let Some(ref f) = self.on_disconnect {
            f(id);
        }
    }

    async fn on_close(&self) {
        if let Some(ref f) = self.on_close {
            f();
        }
    }
}
