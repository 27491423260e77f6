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

//! # Asterisk Manager Interface Codec
//!
//! This crate provides a stateful, byte-oriented codec for the Asterisk Manager
//! Interface (AMI) wire format. It is designed to sit underneath a Tokio
//! [`Framed`](tokio_util::codec::Framed) transport and turn a raw TCP byte stream into
//! discrete [`AmiMessage`] values and back.
//!
//! ## Wire Format
//!
//! AMI is a line oriented text protocol. Every message is a block of `Field: value`
//! lines, each terminated by CRLF, with one blank line closing the block:
//!
//! ```text
//! Action: Login\r\n
//! Username: admin\r\n
//! Secret: secret\r\n
//! \r\n
//! ```
//!
//! Field order is significant on the wire and is preserved by [`AmiMessage`] in both
//! directions.
//!
//! ## Usage Example
//!
//! ```rust
//! use amitest_amicodec::{AmiCodec, AmiMessage};
//! use bytes::BytesMut;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! # fn example() -> Result<(), amitest_amicodec::AmiCodecError> {
//! let mut codec = AmiCodec::new();
//!
//! // Decoding
//! let mut input = BytesMut::from(&b"Action: Ping\r\nActionID: 42\r\n\r\n"[..]);
//! let action = codec.decode(&mut input)?.expect("complete message");
//! assert_eq!(action.action_name(), Some("Ping"));
//! assert_eq!(action.action_id(), Some("42"));
//!
//! // Encoding
//! let mut output = BytesMut::new();
//! let reply = AmiMessage::new().with("Response", "Success").with("Ping", "Pong");
//! codec.encode(&reply, &mut output)?;
//! assert_eq!(&output[..], b"Response: Success\r\nPing: Pong\r\n\r\n");
//! # Ok(())
//! # }
//! ```
//!
//! ## Leniency
//!
//! The decoder accepts bare LF line endings as well as CRLF, ignores blank keep-alive
//! lines between messages and skips lines that carry no `:` separator. Oversized
//! messages are rejected with [`AmiCodecError::MessageTooLong`] so that a misbehaving
//! peer cannot grow the per-connection buffer without bound.
//!
//! ## Thread Safety
//!
//! `AmiCodec` keeps partial-message state and is meant to be owned by exactly one
//! connection.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod codec;
mod message;
mod result;

pub use self::codec::{AmiCodec, DEFAULT_MAX_MESSAGE_LENGTH};
pub use self::message::{AmiMessage, MessageKind};
pub use self::result::{AmiCodecError, AmiCodecResult};

/// Line terminator used by the AMI wire format
pub const CRLF: &str = "\r\n";
