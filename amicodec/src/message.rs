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

use crate::CRLF;
use std::fmt;

/// Broad classification of an AMI message, decided by which header field it carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Client request, carries an `Action` field
    Action,
    /// Unsolicited notification, carries an `Event` field
    Event,
    /// Reply to an action, carries a `Response` field
    Response,
    /// None of the above
    Unknown,
}

/// A single AMI message: an ordered list of `Field: value` pairs.
///
/// Field names are case-sensitive and may repeat (AMI uses repeated `Variable`
/// fields, for instance). Insertion order is kept because it is part of the
/// observable wire format.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AmiMessage {
    fields: Vec<(String, String)>,
}

impl AmiMessage {
    /// Create an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field and return the message, for building replies inline.
    ///
    /// # Example
    /// ```
    /// use amitest_amicodec::AmiMessage;
    ///
    /// let reply = AmiMessage::new()
    ///     .with("Response", "Success")
    ///     .with("Timestamp", 1_700_000_000);
    /// assert_eq!(reply.get("Timestamp"), Some("1700000000"));
    /// ```
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl fmt::Display) -> Self {
        self.push(field, value);
        self
    }

    /// Append a field only when a value is present
    #[must_use]
    pub fn with_opt(self, field: impl Into<String>, value: Option<impl fmt::Display>) -> Self {
        match value {
            Some(value) => self.with(field, value),
            None => self,
        }
    }

    /// Append a field
    pub fn push(&mut self, field: impl Into<String>, value: impl fmt::Display) {
        self.fields.push((field.into(), value.to_string()));
    }

    /// Value of the first field with exactly this name
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Check whether a field with exactly this name is present
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == field)
    }

    /// Value of the `Action` field, possibly empty
    pub fn action_name(&self) -> Option<&str> {
        self.get("Action")
    }

    /// Value of the `ActionID` correlation field
    pub fn action_id(&self) -> Option<&str> {
        self.get("ActionID")
    }

    /// Classify the message by its leading header
    pub fn kind(&self) -> MessageKind {
        if self.contains("Action") {
            MessageKind::Action
        } else if self.contains("Event") {
            MessageKind::Event
        } else if self.contains("Response") {
            MessageKind::Response
        } else {
            MessageKind::Unknown
        }
    }

    /// Iterate over the fields in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the message carries no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of bytes this message occupies on the wire
    pub fn encoded_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(name, value)| name.len() + value.len() + 2 + CRLF.len())
            .sum::<usize>()
            + CRLF.len()
    }

    /// Render the message in wire format, including the terminating blank line
    pub fn to_wire(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AmiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.fields {
            write!(f, "{name}: {value}{CRLF}")?;
        }
        f.write_str(CRLF)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AmiMessage {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}
