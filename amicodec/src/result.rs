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

/// Result Type for Codec Operations
pub type AmiCodecResult<T> = Result<T, AmiCodecError>;

/// Represents possible errors that can occur while framing AMI messages.
#[derive(Debug, thiserror::Error)]
pub enum AmiCodecError {
    /// An I/O error occurred while reading from or writing to the underlying stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A single message grew past the configured limit before its terminating blank line.
    #[error("message length {length} exceeds maximum of {max} bytes")]
    MessageTooLong {
        /// Number of bytes buffered for the pending message
        length: usize,
        /// Configured maximum message length
        max: usize,
    },

    /// A line contained bytes that are not valid UTF-8.
    #[error("message line is not valid UTF-8")]
    InvalidUtf8,
}

impl AmiCodecError {
    /// Check if the error was raised by the peer's data rather than the transport
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            AmiCodecError::MessageTooLong { .. } | AmiCodecError::InvalidUtf8
        )
    }
}
