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

//! AMI client connection
//!
//! Owns one accepted socket together with its codec state and login deadline.

use crate::auth::AuthTimer;
use crate::{AmiServerError, ConnectionId, Result};
use amitest_amicodec::{AmiCodec, AmiCodecError, AmiMessage};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{instrument, trace};

/// Something that happened on the socket side of a connection
#[derive(Debug)]
pub enum Inbound {
    /// A complete action was decoded
    Action(AmiMessage),
    /// The stream failed to read or decode
    Error(AmiServerError),
    /// The peer closed the stream
    Closed,
    /// The login deadline passed
    AuthTimeout,
}

/// One accepted AMI peer
#[derive(Debug)]
pub struct ClientConnection {
    id: ConnectionId,
    peer_addr: SocketAddr,
    connected_at: Instant,
    framed: Framed<TcpStream, AmiCodec>,
    auth_timer: AuthTimer,
    write_timeout: Duration,
}

impl ClientConnection {
    /// Wrap an accepted socket and arm its login deadline
    pub fn new(
        id: ConnectionId,
        socket: TcpStream,
        peer_addr: SocketAddr,
        codec: AmiCodec,
        auth_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            id,
            peer_addr,
            connected_at: Instant::now(),
            framed: Framed::new(socket, codec),
            auth_timer: AuthTimer::start(auth_timeout),
            write_timeout,
        }
    }

    /// Get the connection ID
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the peer address
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Get how long the connection has been open
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// Check if the login deadline is still pending
    pub fn is_auth_pending(&self) -> bool {
        self.auth_timer.is_armed()
    }

    /// Disarm the login deadline. Safe to call repeatedly.
    pub fn cancel_auth_timer(&mut self) {
        self.auth_timer.cancel();
    }

    /// Wait for the next inbound action or the login deadline, whichever comes first.
    ///
    /// Cancel safe: nothing is lost if the returned future is dropped before completion.
    pub async fn recv(&mut self) -> Inbound {
        let armed = self.auth_timer.is_armed();
        tokio::select! {
            biased;

            () = self.auth_timer.expired(), if armed => Inbound::AuthTimeout,

            item = self.framed.next() => match item {
                Some(Ok(action)) => Inbound::Action(action),
                Some(Err(e)) => Inbound::Error(e.into()),
                None => Inbound::Closed,
            },
        }
    }

    /// Encode and flush one message
    #[instrument(skip(self, message), fields(connection_id = %self.id))]
    pub async fn send(&mut self, message: &AmiMessage) -> Result<()> {
        trace!(fields = message.len(), "Sending message");
        within(self.write_timeout, self.framed.send(message)).await
    }

    /// Write a payload unmodified and flush
    #[instrument(skip(self, payload), fields(connection_id = %self.id, bytes = payload.len()))]
    pub async fn send_raw(&mut self, payload: Bytes) -> Result<()> {
        within(self.write_timeout, self.framed.send(payload)).await
    }

    /// Queue a message without flushing
    pub async fn feed(&mut self, message: &AmiMessage) -> Result<()> {
        within(self.write_timeout, self.framed.feed(message)).await
    }

    /// Queue raw text without flushing
    pub async fn feed_raw(&mut self, text: &str) -> Result<()> {
        within(self.write_timeout, self.framed.feed(text)).await
    }

    /// Flush everything queued by `feed`
    pub async fn flush(&mut self) -> Result<()> {
        within(
            self.write_timeout,
            SinkExt::<&AmiMessage>::flush(&mut self.framed),
        )
        .await
    }

    /// Shut down the write half of the socket. Errors are ignored; the peer may be gone.
    pub async fn close(&mut self) {
        self.auth_timer.cancel();
        let _ = tokio::time::timeout(self.write_timeout, self.framed.get_mut().shutdown()).await;
    }
}

async fn within<F>(limit: Duration, write: F) -> Result<()>
where
    F: Future<Output = std::result::Result<(), AmiCodecError>>,
{
    match tokio::time::timeout(limit, write).await {
        Ok(result) => result.map_err(AmiServerError::from),
        Err(_) => Err(AmiServerError::WriteTimeout),
    }
}
