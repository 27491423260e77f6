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

use crate::{AmiCodecError, AmiMessage, CRLF};
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

/// Default upper bound for a single decoded message, in bytes
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 64 * 1024;

/// A codec for the Asterisk Manager Interface, turning a byte stream into [`AmiMessage`]
/// blocks and serializing messages back into CRLF delimited text.
///
/// The decoder is stateful: fields of a message that has not yet seen its terminating
/// blank line are held between calls, so a message split across any number of reads
/// decodes the same as one delivered whole.
#[derive(Clone, Debug)]
pub struct AmiCodec {
    pending: AmiMessage,
    pending_len: usize,
    next_index: usize,
    max_message_length: usize,
}

impl AmiCodec {
    /// Creates a new `AmiCodec` with the default message length limit.
    ///
    /// # Example
    /// ```
    /// use amitest_amicodec::AmiCodec;
    ///
    /// let codec = AmiCodec::new();
    /// assert_eq!(codec.max_message_length(), amitest_amicodec::DEFAULT_MAX_MESSAGE_LENGTH);
    /// ```
    pub fn new() -> AmiCodec {
        AmiCodec::default()
    }

    /// Set the largest message, in bytes, the decoder will buffer before failing
    #[must_use]
    pub fn with_max_message_length(mut self, max: usize) -> Self {
        self.max_message_length = max;
        self
    }

    /// Largest message, in bytes, the decoder will buffer
    pub fn max_message_length(&self) -> usize {
        self.max_message_length
    }

    /// Check whether a partially received message is being held
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || self.next_index > 0
    }

    fn reset(&mut self) {
        self.pending = AmiMessage::new();
        self.pending_len = 0;
        self.next_index = 0;
    }

    fn check_length(&mut self, length: usize) -> Result<(), AmiCodecError> {
        if length > self.max_message_length {
            let max = self.max_message_length;
            self.reset();
            return Err(AmiCodecError::MessageTooLong { length, max });
        }
        Ok(())
    }
}

impl Default for AmiCodec {
    fn default() -> Self {
        AmiCodec {
            pending: AmiMessage::new(),
            pending_len: 0,
            next_index: 0,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}

impl Decoder for AmiCodec {
    type Item = AmiMessage;
    type Error = AmiCodecError;

    /// Decodes the next complete message from `src`.
    ///
    /// Lines are consumed one at a time. A `Field: value` line is split at its first
    /// colon with both sides trimmed, a line without a colon is skipped, and a blank
    /// line closes the pending message. Blank lines seen while no field is pending are
    /// keep-alives and never produce an empty message.
    ///
    /// Returns `Ok(None)` when `src` holds no complete message yet; the scan position is
    /// remembered so that the next call only inspects newly arrived bytes.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<AmiMessage>, Self::Error> {
        loop {
            let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
                self.next_index = src.len();
                self.check_length(self.pending_len + src.len())?;
                return Ok(None);
            };

            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;
            self.pending_len += line.len();
            self.check_length(self.pending_len)?;

            let mut content = &line[..line.len() - 1];
            if let [head @ .., b'\r'] = content {
                content = head;
            }

            if content.is_empty() {
                if self.pending.is_empty() {
                    self.pending_len = 0;
                    continue;
                }
                self.pending_len = 0;
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            let Ok(text) = std::str::from_utf8(content) else {
                self.reset();
                return Err(AmiCodecError::InvalidUtf8);
            };
            match text.split_once(':') {
                Some((field, value)) => self.pending.push(field.trim(), value.trim()),
                None => trace!(line = text, "Skipping AMI line without field separator"),
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<AmiMessage>, Self::Error> {
        if let Some(message) = self.decode(src)? {
            return Ok(Some(message));
        }
        if self.has_pending() || !src.is_empty() {
            trace!(
                fields = self.pending.len(),
                bytes = src.len(),
                "Discarding unterminated AMI message at end of stream"
            );
            src.clear();
            self.reset();
        }
        Ok(None)
    }
}

impl Encoder<&AmiMessage> for AmiCodec {
    type Error = AmiCodecError;

    fn encode(&mut self, item: &AmiMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.encoded_len());
        for (field, value) in item.iter() {
            dst.put_slice(field.as_bytes());
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(CRLF.as_bytes());
        }
        dst.put_slice(CRLF.as_bytes());
        Ok(())
    }
}

impl Encoder<AmiMessage> for AmiCodec {
    type Error = AmiCodecError;

    fn encode(&mut self, item: AmiMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(&item, dst)
    }
}

/// Raw text is written unmodified, for banner lines and pre-formatted payloads.
impl Encoder<&str> for AmiCodec {
    type Error = AmiCodecError;

    fn encode(&mut self, item: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}

impl Encoder<Bytes> for AmiCodec {
    type Error = AmiCodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.extend_from_slice(&item);
        Ok(())
    }
}
