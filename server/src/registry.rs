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

//! Client registry
//!
//! Every live connection is tracked in a single concurrent map. Each entry carries
//! its [`AuthState`], so the authenticated and unauthenticated views are disjoint by
//! construction and promotion is a single in-place update under the shard lock.

use crate::worker::ControlMessage;
use crate::{AuthState, ClientInfo, ConnectionId};
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::net::SocketAddr;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Registry entry for one connection
#[derive(Debug, Clone)]
pub struct RegisteredClient {
    state: AuthState,
    peer_addr: SocketAddr,
    connected_at: Instant,
    control_tx: mpsc::UnboundedSender<ControlMessage>,
}

impl RegisteredClient {
    /// Current authentication state
    pub fn state(&self) -> AuthState {
        self.state
    }

    /// Channel to the connection's worker
    pub fn control(&self) -> &mpsc::UnboundedSender<ControlMessage> {
        &self.control_tx
    }

    fn info(&self, id: ConnectionId) -> ClientInfo {
        ClientInfo {
            id,
            state: self.state,
            peer_addr: self.peer_addr,
            connected_at: self.connected_at,
        }
    }
}

/// Result of a broadcast operation
#[derive(Debug, Clone, Default)]
pub struct BroadcastResult {
    /// Authenticated clients targeted
    pub total: usize,
    /// Clients whose worker accepted the payload
    pub succeeded: usize,
    /// Clients whose worker had already gone away
    pub failed: usize,
    /// IDs of the failed clients
    pub errors: Vec<ConnectionId>,
}

impl BroadcastResult {
    /// Check if every targeted client accepted the payload
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Concurrent registry of live client connections
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: DashMap<ConnectionId, RegisteredClient>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted connection as unauthenticated.
    ///
    /// Returns `false` if the ID is already present; the existing entry is left alone.
    pub fn register(
        &self,
        id: ConnectionId,
        peer_addr: SocketAddr,
        control_tx: mpsc::UnboundedSender<ControlMessage>,
    ) -> bool {
        match self.clients.entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RegisteredClient {
                    state: AuthState::Unauthenticated,
                    peer_addr,
                    connected_at: Instant::now(),
                    control_tx,
                });
                trace!(connection_id = %id, "Registered client");
                true
            }
        }
    }

    /// Move a connection from the unauthenticated view to the authenticated one.
    ///
    /// Returns `false` if the connection is not currently unauthenticated.
    pub fn promote(&self, id: ConnectionId) -> bool {
        match self.clients.get_mut(&id) {
            Some(mut client) if client.state == AuthState::Unauthenticated => {
                client.state = AuthState::Authenticated;
                debug!(connection_id = %id, "Client authenticated");
                true
            }
            _ => false,
        }
    }

    /// Stop tracking a connection. Idempotent.
    pub fn remove(&self, id: ConnectionId) -> Option<RegisteredClient> {
        self.clients.remove(&id).map(|(_, mut client)| {
            client.state = AuthState::Closed;
            client
        })
    }

    /// Look up the state of a connection
    pub fn state(&self, id: ConnectionId) -> Option<AuthState> {
        self.clients.get(&id).map(|client| client.state)
    }

    /// Channel to a connection's worker
    pub fn control(&self, id: ConnectionId) -> Option<mpsc::UnboundedSender<ControlMessage>> {
        self.clients.get(&id).map(|client| client.control_tx.clone())
    }

    fn list_by(&self, state: AuthState) -> Vec<ClientInfo> {
        self.clients
            .iter()
            .filter(|entry| entry.value().state == state)
            .map(|entry| entry.value().info(*entry.key()))
            .collect()
    }

    /// Snapshot of authenticated clients
    pub fn list_authenticated(&self) -> Vec<ClientInfo> {
        self.list_by(AuthState::Authenticated)
    }

    /// Snapshot of clients still waiting to log in
    pub fn list_unauthenticated(&self) -> Vec<ClientInfo> {
        self.list_by(AuthState::Unauthenticated)
    }

    /// Snapshot of every client, authenticated ones first
    pub fn list_all(&self) -> Vec<ClientInfo> {
        let mut all = self.list_authenticated();
        all.extend(self.list_unauthenticated());
        all
    }

    /// Total number of tracked clients
    pub fn count(&self) -> usize {
        self.clients.len()
    }

    /// Number of authenticated clients
    pub fn authenticated_count(&self) -> usize {
        self.clients
            .iter()
            .filter(|entry| entry.value().state.is_authenticated())
            .count()
    }

    /// Queue a raw payload for every authenticated client
    pub fn broadcast(&self, payload: &Bytes) -> BroadcastResult {
        let targets: Vec<(ConnectionId, mpsc::UnboundedSender<ControlMessage>)> = self
            .clients
            .iter()
            .filter(|entry| entry.value().state.is_authenticated())
            .map(|entry| (*entry.key(), entry.value().control_tx.clone()))
            .collect();

        let mut result = BroadcastResult {
            total: targets.len(),
            ..Default::default()
        };
        for (id, tx) in targets {
            if tx.send(ControlMessage::Raw(payload.clone())).is_ok() {
                result.succeeded += 1;
            } else {
                result.failed += 1;
                result.errors.push(id);
            }
        }
        result
    }

    /// Remove every client and return the removed entries
    pub fn clear(&self) -> Vec<(ConnectionId, RegisteredClient)> {
        let ids: Vec<ConnectionId> = self.clients.iter().map(|entry| *entry.key()).collect();
        ids.into_iter()
            .filter_map(|id| self.remove(id).map(|client| (id, client)))
            .collect()
    }
}
