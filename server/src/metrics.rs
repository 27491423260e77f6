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

//! Lock-free metrics for the AMI test server
//!
//! Every recording method updates both the in-process counters (readable through
//! [`ServerMetrics::snapshot`]) and the global `metrics` recorder, if one is installed.

use metrics::{counter, gauge};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Lock-free server metrics
#[derive(Debug)]
pub struct ServerMetrics {
    // Connection counts
    accepted: AtomicU64,
    rejected: AtomicU64,
    active: AtomicU64,

    // Authentication
    auth_success: AtomicU64,
    auth_failure: AtomicU64,
    auth_timeout: AtomicU64,

    // Traffic
    actions_received: AtomicU64,
    connection_errors: AtomicU64,

    started_at: Instant,
}

impl Default for ServerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerMetrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self {
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            active: AtomicU64::new(0),
            auth_success: AtomicU64::new(0),
            auth_failure: AtomicU64::new(0),
            auth_timeout: AtomicU64::new(0),
            actions_received: AtomicU64::new(0),
            connection_errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    // Connection tracking

    /// Record a connection passing admission control
    pub fn connection_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.connections.accepted").increment(1);
        gauge!("amitest.connections.active").increment(1.0);
    }

    /// Record a connection turned away by admission control
    pub fn connection_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.connections.rejected").increment(1);
    }

    /// Record a connection being torn down
    pub fn connection_closed(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        gauge!("amitest.connections.active").decrement(1.0);
    }

    /// Record a transport or framing error on a connection
    pub fn connection_error(&self) {
        self.connection_errors.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.connections.errors").increment(1);
    }

    // Authentication tracking

    /// Record a successful login
    pub fn auth_success(&self) {
        self.auth_success.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.auth.success").increment(1);
    }

    /// Record a rejected login
    pub fn auth_failure(&self) {
        self.auth_failure.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.auth.failure").increment(1);
    }

    /// Record a connection closed for not logging in in time
    pub fn auth_timeout(&self) {
        self.auth_timeout.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.auth.timeout").increment(1);
    }

    /// Record a decoded action
    pub fn action_received(&self) {
        self.actions_received.fetch_add(1, Ordering::Relaxed);
        counter!("amitest.actions.received").increment(1);
    }

    /// Get the total number of connections accepted
    pub fn total_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    /// Get the current number of open connections
    pub fn active_connections(&self) -> u64 {
        self.active.load(Ordering::Relaxed)
    }

    /// Get a snapshot of all metrics
    ///
    /// Counters are read individually, so the snapshot may be slightly skewed
    /// while connections are being processed.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            auth_success: self.auth_success.load(Ordering::Relaxed),
            auth_failure: self.auth_failure.load(Ordering::Relaxed),
            auth_timeout: self.auth_timeout.load(Ordering::Relaxed),
            actions_received: self.actions_received.load(Ordering::Relaxed),
            connection_errors: self.connection_errors.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

/// A snapshot of server metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Connections accepted since server creation
    pub accepted: u64,
    /// Connections rejected by admission control
    pub rejected: u64,
    /// Connections currently open
    pub active: u64,
    /// Successful logins
    pub auth_success: u64,
    /// Failed logins
    pub auth_failure: u64,
    /// Connections closed by the authentication deadline
    pub auth_timeout: u64,
    /// Actions decoded
    pub actions_received: u64,
    /// Connections torn down by transport or framing errors
    pub connection_errors: u64,
    /// Server uptime
    pub uptime: Duration,
}

impl MetricsSnapshot {
    /// Total login attempts
    pub fn auth_attempts(&self) -> u64 {
        self.auth_success + self.auth_failure
    }
}
