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

//! AMI protocol conversations over real TCP connections

use amitest_server::{AmiMessage, AmiTestServer, ServerConfig, ServerEvent};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

const LOGIN: &[u8] = b"Action: Login\r\nUsername: test\r\nSecret: test\r\n\r\n";

fn test_config() -> ServerConfig {
    ServerConfig::default()
        .with_bind_host(IpAddr::V4(Ipv4Addr::LOCALHOST))
        .with_credentials("test", "test")
        .with_hello_message("Welcome")
        .with_silent(true)
}

async fn start(config: ServerConfig) -> (AmiTestServer, SocketAddr, mpsc::UnboundedReceiver<ServerEvent>) {
    let (tx, events) = mpsc::unbounded_channel();
    let server = AmiTestServer::with_handler(config, Arc::new(tx)).unwrap();
    let addr = server.listen(0).await.unwrap();
    (server, addr, events)
}

async fn read_until(stream: &mut TcpStream, needle: &str) -> String {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    while !String::from_utf8_lossy(&received).contains(needle) {
        let n = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut buf))
            .await
            .expect("timed out waiting for server")
            .unwrap();
        assert!(n > 0, "server closed the connection before sending {needle:?}");
        received.extend_from_slice(&buf[..n]);
    }
    String::from_utf8(received).unwrap()
}

async fn login(stream: &mut TcpStream) -> String {
    stream.write_all(LOGIN).await.unwrap();
    read_until(stream, "Welcome\r\n").await
}

async fn wait_for(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn test_login_success() {
    let (server, addr, mut events) = start(test_config()).await;
    events.recv().await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    let text = login(&mut client).await;
    assert_eq!(
        text,
        "Response: Success\r\nMessage: Authentication accepted\r\n\r\n\
         Event: FullyBooted\r\nPrivilege: system,all\r\nStatus: Fully Booted\r\n\r\n\
         Welcome\r\n"
    );

    assert_eq!(events.recv().await, Some(ServerEvent::Connection(1)));
    assert_eq!(server.get_auth_clients().len(), 1);
    assert!(server.get_unauth_clients().is_empty());
    server.close().await;
}

#[tokio::test]
async fn test_login_failure_keeps_connection_open() {
    let (server, addr, _events) = start(test_config()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"Action: Login\r\nUsername: test\r\nSecret: wrong\r\nActionID: a1\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert_eq!(
        text,
        "Response: Error\r\nMessage: Authentication failed\r\nActionID: a1\r\n\r\n"
    );
    assert_eq!(server.get_unauth_clients().len(), 1);
    assert!(server.get_auth_clients().is_empty());

    // A later valid login still works
    let text = login(&mut client).await;
    assert!(text.contains("Response: Success"));
    wait_for(|| server.get_auth_clients().len() == 1).await;
    server.close().await;
}

#[tokio::test]
async fn test_wrong_username_rejected() {
    let (server, addr, _events) = start(test_config()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"Action: Login\r\nUsername: admin\r\nSecret: test\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert!(text.contains("Response: Error"));
    server.close().await;
}

#[tokio::test]
async fn test_open_server_accepts_any_login() {
    let (server, addr, _events) = start(test_config().without_credentials()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"Action: login\r\nUsername: anyone\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "Welcome\r\n").await;
    assert!(text.starts_with("Response: Success\r\n"));
    server.close().await;
}

async fn ping(stream: &mut TcpStream) {
    stream
        .write_all(b"Action: Ping\r\nActionID: testID\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(stream, "\r\n\r\n").await;
    let lines: Vec<&str> = text.split("\r\n").collect();
    assert_eq!(lines[0], "Response: Success");
    assert_eq!(lines[1], "Ping: Pong");
    assert!(lines[2].starts_with("Timestamp: "));
    assert_eq!(lines[3], "ActionID: testID");
}

#[tokio::test]
async fn test_ping_before_and_after_login() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    ping(&mut client).await;
    login(&mut client).await;
    ping(&mut client).await;
    server.close().await;
}

#[tokio::test]
async fn test_logoff_reply() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    login(&mut client).await;

    client
        .write_all(b"Action: Logoff\r\nActionID: logoff_123\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert_eq!(
        text,
        "Response: Goodbye\r\nMessage: Thanks for all the fish.\r\nActionID: logoff_123\r\n\r\n"
    );

    // Logoff does not drop the client
    assert_eq!(server.get_auth_clients().len(), 1);
    server.close().await;
}

#[tokio::test]
async fn test_logoff_before_login_is_refused() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client.write_all(b"Action: Logoff\r\n\r\n").await.unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert_eq!(text, "Response: Error\r\nMessage: Authentication failed\r\n\r\n");
    server.close().await;
}

#[tokio::test]
async fn test_empty_action() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client
        .write_all(b"Action: \r\nActionID: empty\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert_eq!(
        text,
        "Response: Error\r\nMessage: Missing action in request\r\nActionID: empty\r\n\r\n"
    );
    server.close().await;
}

#[tokio::test]
async fn test_empty_action_id_is_omitted() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client
        .write_all(b"Action: Ping\r\nActionID: \r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert!(text.starts_with("Response: Success\r\nPing: Pong\r\nTimestamp: "));
    assert!(!text.contains("ActionID"));
    server.close().await;
}

#[tokio::test]
async fn test_unknown_action() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    login(&mut client).await;

    client
        .write_all(b"Action: Originate\r\nChannel: SIP/100\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert_eq!(text, "Response: Error\r\nMessage: Invalid/unknown command\r\n\r\n");
    server.close().await;
}

#[tokio::test]
async fn test_second_login_gets_no_reply() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    login(&mut client).await;

    client.write_all(LOGIN).await.unwrap();
    client
        .write_all(b"Action: Ping\r\nActionID: after\r\n\r\n")
        .await
        .unwrap();
    let text = read_until(&mut client, "ActionID: after\r\n\r\n").await;
    assert!(text.starts_with("Response: Success\r\nPing: Pong\r\n"));
    assert!(!text.contains("Authentication"));
    server.close().await;
}

#[tokio::test]
async fn test_pipelined_actions_answered_in_order() {
    let (server, addr, _events) = start(test_config()).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    client
        .write_all(
            b"Action: Ping\r\nActionID: 1\r\n\r\n\
              Action: Bogus\r\nActionID: 2\r\n\r\n\
              Action: Ping\r\nActionID: 3\r\n\r\n",
        )
        .await
        .unwrap();
    let text = read_until(&mut client, "ActionID: 3\r\n\r\n").await;
    let first = text.find("ActionID: 1").unwrap();
    let second = text.find("ActionID: 2").unwrap();
    let third = text.find("ActionID: 3").unwrap();
    assert!(first < second && second < third);
    server.close().await;
}

#[tokio::test]
async fn test_client_counts() {
    let (server, addr, _events) = start(test_config()).await;

    let mut authed = TcpStream::connect(addr).await.unwrap();
    let _waiting = TcpStream::connect(addr).await.unwrap();
    login(&mut authed).await;

    wait_for(|| server.get_clients().len() == 2).await;
    assert_eq!(server.get_auth_clients().len(), 1);
    assert_eq!(server.get_unauth_clients().len(), 1);

    let snapshot = server.snapshot();
    assert_eq!(snapshot.authenticated, 1);
    assert_eq!(snapshot.unauthenticated, 1);
    assert_eq!(snapshot.total_accepted, 2);
    server.close().await;
}

#[tokio::test]
async fn test_broadcast_only_reaches_authenticated_clients() {
    let (server, addr, _events) = start(test_config()).await;

    let mut authed = TcpStream::connect(addr).await.unwrap();
    let mut waiting = TcpStream::connect(addr).await.unwrap();
    login(&mut authed).await;
    wait_for(|| server.get_clients().len() == 2).await;

    let result = server.broadcast("Event: TestEvent\r\n\r\n");
    assert_eq!(result.total, 1);
    assert!(result.is_complete());

    let text = read_until(&mut authed, "\r\n\r\n").await;
    assert_eq!(text, "Event: TestEvent\r\n\r\n");

    let mut buf = [0u8; 64];
    let nothing = tokio::time::timeout(Duration::from_millis(200), waiting.read(&mut buf)).await;
    assert!(nothing.is_err(), "unauthenticated client received data");
    server.close().await;
}

#[tokio::test]
async fn test_send_to_single_client() {
    let (server, addr, _events) = start(test_config()).await;

    let mut client = TcpStream::connect(addr).await.unwrap();
    wait_for(|| server.get_clients().len() == 1).await;
    let id = server.get_clients()[0].id;

    server
        .send_to_client(
            id,
            AmiMessage::new()
                .with("Event", "Newchannel")
                .with("Channel", "SIP/100-0001"),
        )
        .unwrap();
    let text = read_until(&mut client, "\r\n\r\n").await;
    assert_eq!(text, "Event: Newchannel\r\nChannel: SIP/100-0001\r\n\r\n");
    server.close().await;
}
