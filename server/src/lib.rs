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

//! Asterisk Manager Interface Test Server
//!
//! An in-process stand-in for an Asterisk PBX's manager port, for testing AMI client
//! libraries without a telephony server. It speaks enough of the protocol to log a
//! client in, answer `Ping` and `Logoff`, and push arbitrary events to logged in
//! clients:
//!
//! - Admission control by a total connection cap
//! - Static username/secret login with a per-connection deadline
//! - Targeted and broadcast writes to authenticated clients
//! - Lifecycle notifications through [`ServerHandler`] or a [`ServerEvent`] channel
//!
//! # Architecture
//!
//! ```text
//! AmiTestServer
//!     ↓ accept + admission
//! ClientRegistry ← ConnectionWorker → ClientConnection (Framed<TcpStream, AmiCodec>)
//!                        ↓
//!                    dispatch()
//! ```
//!
//! # Example
//!
//! ```no_run
//! use amitest_server::{AmiTestServer, ServerConfig, ServerEvent};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (events_tx, mut events) = tokio::sync::mpsc::unbounded_channel();
//!     let config = ServerConfig::default()
//!         .with_credentials("test", "test")
//!         .with_auth_timeout(Duration::from_secs(5));
//!     let server = AmiTestServer::with_handler(config, Arc::new(events_tx))?;
//!     server.listen(0).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         if let ServerEvent::Connection(count) = event {
//!             println!("{count} clients logged in");
//!             server.broadcast("Event: TestEvent\r\n\r\n");
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs, future_incompatible, rust_2018_idioms)]

pub mod admission;
pub mod auth;
mod config;
mod connection;
pub mod dispatcher;
mod error;
mod handler;
mod metrics;
mod registry;
mod server;
mod types;
mod worker;

pub use config::{Credentials, ServerConfig};
pub use connection::{ClientConnection, Inbound};
pub use error::{AmiServerError, Result};
pub use handler::{CallbackHandler, ServerEvent, ServerHandler};
pub use metrics::{MetricsSnapshot, ServerMetrics};
pub use registry::{BroadcastResult, ClientRegistry, RegisteredClient};
pub use server::AmiTestServer;
pub use types::{AuthState, ClientInfo, ConnectionId, ServerSnapshot};
pub use worker::{ConnectionWorker, ControlMessage};

pub use amitest_amicodec::{AmiCodec, AmiMessage};
