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

//! Login credential checks and the per-connection authentication deadline

use crate::Credentials;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Sleep, sleep};

/// Check a supplied username/secret pair against the configured credentials.
///
/// With no credentials, or an empty configured username, every login succeeds.
/// Otherwise both configured fields must be non-empty and equal to the supplied ones.
pub fn check_credentials(
    expected: Option<&Credentials>,
    username: Option<&str>,
    secret: Option<&str>,
) -> bool {
    match expected {
        None => true,
        Some(expected) if expected.username.is_empty() => true,
        Some(expected) => {
            !expected.secret.is_empty()
                && username == Some(expected.username.as_str())
                && secret == Some(expected.secret.as_str())
        }
    }
}

/// One-shot login deadline owned by a connection worker.
///
/// The timer lives inside the worker task, so [`cancel`](AuthTimer::cancel) takes
/// effect before the worker polls anything else: a cancelled timer never fires.
#[derive(Debug)]
pub struct AuthTimer {
    deadline: Option<Pin<Box<Sleep>>>,
}

impl AuthTimer {
    /// Arm a deadline `timeout` from now
    pub fn start(timeout: Duration) -> Self {
        Self {
            deadline: Some(Box::pin(sleep(timeout))),
        }
    }

    /// Disarm the timer. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// Check if the deadline is still pending
    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Wait for the deadline. Pends forever when disarmed.
    ///
    /// The timer disarms itself once it has fired.
    pub async fn expired(&mut self) {
        match self.deadline.as_mut() {
            Some(deadline) => {
                deadline.as_mut().await;
                self.deadline = None;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
