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

//! Integration tests for amicodec
//!
//! These tests drive the codec through `Framed` transports and arbitrary read chunking.

use amitest_amicodec::{AmiCodec, AmiCodecError, AmiMessage};
use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use proptest::prelude::*;
use tokio::io::{AsyncWriteExt, duplex};
use tokio_util::codec::{Decoder, Framed, FramedRead};

// ============================================================================
// Helper Functions
// ============================================================================

fn decode_chunked(chunks: &[&[u8]]) -> Vec<AmiMessage> {
    let mut codec = AmiCodec::new();
    let mut buffer = BytesMut::new();
    let mut messages = Vec::new();
    for chunk in chunks {
        buffer.extend_from_slice(chunk);
        while let Some(message) = codec.decode(&mut buffer).unwrap() {
            messages.push(message);
        }
    }
    messages
}

// ============================================================================
// Framed Transport Tests
// ============================================================================

#[tokio::test]
async fn framed_peers_exchange_messages() {
    let (left, right) = duplex(1024);
    let mut client = Framed::new(left, AmiCodec::new());
    let mut server = Framed::new(right, AmiCodec::new());

    let login = AmiMessage::new()
        .with("Action", "Login")
        .with("Username", "test")
        .with("Secret", "test");
    client.send(&login).await.unwrap();

    let received = server.next().await.unwrap().unwrap();
    assert_eq!(received, login);

    server
        .send(AmiMessage::new().with("Response", "Success"))
        .await
        .unwrap();
    let reply = client.next().await.unwrap().unwrap();
    assert_eq!(reply.get("Response"), Some("Success"));
}

#[tokio::test]
async fn framed_read_ends_cleanly_on_truncated_input() {
    let (mut writer, reader) = duplex(1024);
    let mut framed = FramedRead::new(reader, AmiCodec::new());

    writer
        .write_all(b"Action: Ping\r\n\r\nAction: Logoff\r\n")
        .await
        .unwrap();
    drop(writer);

    let first = framed.next().await.unwrap().unwrap();
    assert_eq!(first.action_name(), Some("Ping"));
    assert!(framed.next().await.is_none());
}

#[tokio::test]
async fn framed_read_surfaces_oversized_message() {
    let (mut writer, reader) = duplex(4096);
    let mut framed = FramedRead::new(reader, AmiCodec::new().with_max_message_length(64));

    writer.write_all(&[b'x'; 128]).await.unwrap();

    let err = framed.next().await.unwrap().unwrap_err();
    assert!(matches!(err, AmiCodecError::MessageTooLong { max: 64, .. }));
}

// ============================================================================
// Chunking Tests
// ============================================================================

#[test]
fn byte_at_a_time_delivery() {
    let wire = b"Action: Ping\r\nActionID: testID\r\n\r\nAction: Logoff\r\n\r\n";
    let chunks: Vec<&[u8]> = wire.chunks(1).collect();

    let messages = decode_chunked(&chunks);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].action_id(), Some("testID"));
    assert_eq!(messages[1].action_name(), Some("Logoff"));
}

#[test]
fn crlf_split_between_reads() {
    let messages = decode_chunked(&[b"Action: Ping\r", b"\n\r", b"\n"]);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].action_name(), Some("Ping"));
}

fn message_strategy() -> impl Strategy<Value = AmiMessage> {
    prop::collection::vec(
        ("[A-Z][A-Za-z]{0,15}", "[A-Za-z0-9_.,/=-]{0,40}"),
        1..8,
    )
    .prop_map(|fields| fields.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn decoding_is_independent_of_chunking(
        messages in prop::collection::vec(message_strategy(), 1..6),
        chunk_size in 1usize..32,
    ) {
        let wire: String = messages.iter().map(AmiMessage::to_wire).collect();
        let chunks: Vec<&[u8]> = wire.as_bytes().chunks(chunk_size).collect();

        let decoded = decode_chunked(&chunks);
        prop_assert_eq!(decoded, messages);
    }
}
