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

//! Standalone AMI Test Server
//!
//! Runs the test server on a fixed port so an AMI client can be pointed at it by hand.
//! Every ten seconds a `TestEvent` is broadcast to logged in clients.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --example test_server -- 5038 admin secret
//! ```
//!
//! Then connect with:
//! ```bash
//! telnet localhost 5038
//! ```

use amitest_server::{AmiTestServer, CallbackHandler, ServerConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let port: u16 = args.next().map_or(Ok(5038), |p| p.parse())?;
    let mut config = ServerConfig::default();
    if let (Some(username), Some(secret)) = (args.next(), args.next()) {
        config = config.with_credentials(username, secret);
    }

    let handler = Arc::new(CallbackHandler {
        on_connection: Some(Box::new(|count: usize| {
            println!("Client logged in ({count} authenticated)");
        })),
        ..Default::default()
    });
    let server = AmiTestServer::with_handler(config, handler)?;
    server.listen(port).await?;
    println!("Press Ctrl+C to stop");

    let mut ticker = tokio::time::interval(Duration::from_secs(10));
    let mut sequence = 0u64;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sequence += 1;
                server.broadcast(format!("Event: TestEvent\r\nSequence: {sequence}\r\n\r\n"));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    server.close().await;
    Ok(())
}
