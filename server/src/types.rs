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

//! Core types for the AMI test server

use std::fmt;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Unique identifier for a connection (monotonically increasing, never reused)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a new connection ID
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the underlying u64 value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Authentication state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthState {
    /// Accepted, waiting for a valid `Login`
    Unauthenticated,
    /// Logged in; receives broadcasts
    Authenticated,
    /// Torn down
    Closed,
}

impl AuthState {
    /// Check if the connection has logged in
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Check if the connection is in a terminal state
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthenticated => write!(f, "unauthenticated"),
            Self::Authenticated => write!(f, "authenticated"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Client information snapshot (for non-blocking queries)
#[derive(Debug, Clone)]
pub struct ClientInfo {
    /// Connection ID
    pub id: ConnectionId,
    /// Authentication state at the time of the snapshot
    pub state: AuthState,
    /// Peer address
    pub peer_addr: SocketAddr,
    /// When the connection was accepted
    pub connected_at: Instant,
}

impl ClientInfo {
    /// Get the connection duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

/// Server snapshot for non-blocking debug information
#[derive(Debug, Clone)]
pub struct ServerSnapshot {
    /// Listening address, if the server is listening
    pub local_addr: Option<SocketAddr>,
    /// Number of authenticated clients
    pub authenticated: usize,
    /// Number of clients still waiting to log in
    pub unauthenticated: usize,
    /// Total connections accepted since the server was created
    pub total_accepted: u64,
    /// Time since the server was created
    pub uptime: Duration,
}

impl fmt::Display for ServerSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let addr = self
            .local_addr
            .map_or_else(|| "-".to_string(), |addr| addr.to_string());
        write!(
            f,
            "AmiTestServer {{ authenticated: {}, unauthenticated: {}, total: {}, addr: {}, uptime: {:?} }}",
            self.authenticated, self.unauthenticated, self.total_accepted, addr, self.uptime
        )
    }
}
