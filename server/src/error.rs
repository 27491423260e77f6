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

//! Error types for the AMI test server

use crate::types::ConnectionId;
use amitest_amicodec::AmiCodecError;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type for operations
pub type Result<T> = std::result::Result<T, AmiServerError>;

/// AMI test server error types
#[derive(Debug, Error)]
pub enum AmiServerError {
    /// I/O error from the underlying TCP stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing error from the codec layer
    #[error("Codec error: {0}")]
    Codec(#[from] AmiCodecError),

    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        /// Address the bind was attempted on
        addr: SocketAddr,
        /// Underlying bind failure
        source: std::io::Error,
    },

    /// `listen` was called on a server that is already listening
    #[error("Server is already listening")]
    AlreadyListening,

    /// The server has been closed and cannot be restarted
    #[error("Server closed")]
    ServerClosed,

    /// Connection with the given ID was not found
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// Connection has been closed
    #[error("Connection closed")]
    ConnectionClosed,

    /// A write did not complete within the configured timeout
    #[error("Write timed out")]
    WriteTimeout,

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AmiServerError {
    /// Check if the error is recoverable
    ///
    /// Recoverable errors affect a single connection; the server keeps running.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AmiServerError::Io(_)
                | AmiServerError::Codec(_)
                | AmiServerError::ConnectionNotFound(_)
                | AmiServerError::ConnectionClosed
                | AmiServerError::WriteTimeout
        )
    }

    /// Check if the error is a connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            AmiServerError::ConnectionNotFound(_)
                | AmiServerError::ConnectionClosed
                | AmiServerError::WriteTimeout
                | AmiServerError::Io(_)
        )
    }
}
