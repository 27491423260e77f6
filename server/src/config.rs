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

//! Server configuration

use amitest_amicodec::DEFAULT_MAX_MESSAGE_LENGTH;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Static username/secret pair a client must present in its `Login` action
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Expected `Username` field
    pub username: String,
    /// Expected `Secret` field
    pub secret: String,
}

impl Credentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Server configuration
///
/// This structure contains all configuration options for the AMI test server.
/// Use the builder pattern methods to customize the configuration.
///
/// # Example
///
/// ```
/// use amitest_server::ServerConfig;
/// use std::time::Duration;
///
/// let config = ServerConfig::default()
///     .with_credentials("admin", "secret")
///     .with_auth_timeout(Duration::from_secs(5))
///     .with_max_connections(10)
///     .with_silent(true);
/// ```
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Deadline for an unauthenticated connection to log in
    ///
    /// Connections that have not sent a valid `Login` within this duration are closed.
    pub auth_timeout: Duration,

    /// Credentials required by `Login`, `None` for an open server
    pub credentials: Option<Credentials>,

    /// Maximum number of concurrent connections, authenticated or not
    ///
    /// Zero rejects every connection.
    pub max_connections: usize,

    /// Suppress the startup line announcing the listening port
    pub silent: bool,

    /// Interface the listener binds to
    pub bind_host: IpAddr,

    /// Banner line written to a client after it logs in, empty to disable
    pub hello_message: String,

    /// Largest inbound message, in bytes, before the connection is dropped
    pub max_message_length: usize,

    /// Timeout for write operations
    ///
    /// A client that does not drain its socket within this duration is disconnected.
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            auth_timeout: Duration::from_secs(30),
            credentials: None,
            max_connections: 50,
            silent: false,
            bind_host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            hello_message: format!("Asterisk AMI Test Server {}", env!("CARGO_PKG_VERSION")),
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the authentication deadline
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Require the given username and secret on login
    pub fn with_credentials(mut self, username: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, secret));
        self
    }

    /// Accept any login
    pub fn without_credentials(mut self) -> Self {
        self.credentials = None;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn with_max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Enable or disable the startup line
    pub fn with_silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Set the interface to bind to
    pub fn with_bind_host(mut self, host: IpAddr) -> Self {
        self.bind_host = host;
        self
    }

    /// Set the banner written after a successful login
    pub fn with_hello_message(mut self, message: impl Into<String>) -> Self {
        self.hello_message = message.into();
        self
    }

    /// Set the inbound message size limit
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    /// Set the write timeout duration
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Validate the configuration
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_timeout.is_zero() {
            return Err("auth_timeout must be greater than 0".to_string());
        }

        if self.write_timeout.is_zero() {
            return Err("write_timeout must be greater than 0".to_string());
        }

        if self.max_message_length == 0 {
            return Err("max_message_length must be greater than 0".to_string());
        }

        Ok(())
    }
}
