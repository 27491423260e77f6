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

//! Action classification
//!
//! [`dispatch`] is a pure function of the inbound action, the connection's
//! authentication state and the configured credentials. Side effects (timer
//! cancellation, registry promotion, writes) are left to the connection worker.

use crate::auth::check_credentials;
use crate::{AuthState, Credentials};
use amitest_amicodec::AmiMessage;
use std::time::SystemTime;

/// What the worker should do with an inbound action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Write the reply; no state change
    Reply(AmiMessage),
    /// Logoff from an authenticated client; write the reply and keep the connection
    Goodbye(AmiMessage),
    /// Login attempt refused; disarm the auth timer and write the reply
    AuthFailed(AmiMessage),
    /// Login accepted; disarm the timer, promote, then write the reply and banner
    AuthAccepted(AmiMessage),
    /// Nothing is written
    Ignored,
}

/// Canonical reply messages. Field order is part of the wire contract.
pub mod responses {
    use amitest_amicodec::AmiMessage;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn reply(response: &str, message: &str, action_id: Option<&str>) -> AmiMessage {
        AmiMessage::new()
            .with("Response", response)
            .with("Message", message)
            .with_opt("ActionID", action_id)
    }

    /// Reply to a refused login
    pub fn auth_failed(action_id: Option<&str>) -> AmiMessage {
        reply("Error", "Authentication failed", action_id)
    }

    /// Reply to an accepted login
    pub fn auth_accepted(action_id: Option<&str>) -> AmiMessage {
        reply("Success", "Authentication accepted", action_id)
    }

    /// Unsolicited event sent right after a successful login
    pub fn fully_booted() -> AmiMessage {
        AmiMessage::new()
            .with("Event", "FullyBooted")
            .with("Privilege", "system,all")
            .with("Status", "Fully Booted")
    }

    /// Reply to `Ping`; the timestamp is unix seconds with six fractional digits
    pub fn pong(now: SystemTime, action_id: Option<&str>) -> AmiMessage {
        let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
        AmiMessage::new()
            .with("Response", "Success")
            .with("Ping", "Pong")
            .with(
                "Timestamp",
                format!(
                    "{}.{:03}000",
                    since_epoch.as_secs(),
                    since_epoch.subsec_millis()
                ),
            )
            .with_opt("ActionID", action_id)
    }

    /// Reply to an action with no name
    pub fn missing_action(action_id: Option<&str>) -> AmiMessage {
        reply("Error", "Missing action in request", action_id)
    }

    /// Reply to an action name the server does not implement
    pub fn unknown_command(action_id: Option<&str>) -> AmiMessage {
        reply("Error", "Invalid/unknown command", action_id)
    }

    /// Reply to `Logoff`
    pub fn goodbye(action_id: Option<&str>) -> AmiMessage {
        reply("Goodbye", "Thanks for all the fish.", action_id)
    }
}

/// Classify an inbound action.
///
/// Checked in order: missing name, `Ping` (any state), names other than
/// `Login`/`Logoff`, then the login/logoff handling for the connection's state.
/// While unauthenticated, both `Login` and `Logoff` go through the login check,
/// so a `Logoff` there is always refused.
pub fn dispatch(
    action: &AmiMessage,
    state: AuthState,
    credentials: Option<&Credentials>,
    now: SystemTime,
) -> Outcome {
    // An empty ActionID is treated as absent and never echoed
    let action_id = action.action_id().filter(|id| !id.is_empty());
    let name = match action.action_name() {
        Some(name) if !name.is_empty() => name,
        _ => return Outcome::Reply(responses::missing_action(action_id)),
    };

    if name.eq_ignore_ascii_case("ping") {
        return Outcome::Reply(responses::pong(now, action_id));
    }

    let is_login = name.eq_ignore_ascii_case("login");
    if !is_login && !name.eq_ignore_ascii_case("logoff") {
        return Outcome::Reply(responses::unknown_command(action_id));
    }

    match state {
        AuthState::Authenticated if is_login => Outcome::Ignored,
        AuthState::Authenticated => Outcome::Goodbye(responses::goodbye(action_id)),
        AuthState::Unauthenticated => {
            let accepted = is_login
                && check_credentials(credentials, action.get("Username"), action.get("Secret"));
            if accepted {
                Outcome::AuthAccepted(responses::auth_accepted(action_id))
            } else {
                Outcome::AuthFailed(responses::auth_failed(action_id))
            }
        }
        AuthState::Closed => Outcome::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn action(fields: &[(&str, &str)]) -> AmiMessage {
        fields.iter().copied().collect()
    }

    fn at() -> SystemTime {
        UNIX_EPOCH + Duration::from_millis(1_700_000_000_123)
    }

    fn creds() -> Credentials {
        Credentials::new("test", "test")
    }

    #[test]
    fn test_missing_action_name() {
        let out = dispatch(
            &action(&[("Action", ""), ("ActionID", "1")]),
            AuthState::Unauthenticated,
            None,
            at(),
        );
        assert_eq!(
            out,
            Outcome::Reply(
                AmiMessage::new()
                    .with("Response", "Error")
                    .with("Message", "Missing action in request")
                    .with("ActionID", "1")
            )
        );

        let out = dispatch(&action(&[("Foo", "bar")]), AuthState::Authenticated, None, at());
        assert_eq!(out, Outcome::Reply(responses::missing_action(None)));
    }

    #[test]
    fn test_ping_in_any_state() {
        for state in [AuthState::Unauthenticated, AuthState::Authenticated] {
            let out = dispatch(
                &action(&[("Action", "PiNg"), ("ActionID", "testID")]),
                state,
                Some(&creds()),
                at(),
            );
            let Outcome::Reply(reply) = out else {
                panic!("ping should reply");
            };
            let fields: Vec<_> = reply.iter().collect();
            assert_eq!(
                fields,
                vec![
                    ("Response", "Success"),
                    ("Ping", "Pong"),
                    ("Timestamp", "1700000000.123000"),
                    ("ActionID", "testID"),
                ]
            );
        }
    }

    #[test]
    fn test_empty_action_id_is_not_echoed() {
        let out = dispatch(
            &action(&[("Action", "Ping"), ("ActionID", "")]),
            AuthState::Unauthenticated,
            None,
            at(),
        );
        let Outcome::Reply(reply) = out else {
            panic!("ping should reply");
        };
        assert_eq!(reply.get("ActionID"), None);
        assert!(!reply.to_wire().contains("ActionID"));

        let out = dispatch(
            &action(&[("Action", "Logoff"), ("ActionID", "")]),
            AuthState::Unauthenticated,
            None,
            at(),
        );
        assert_eq!(out, Outcome::AuthFailed(responses::auth_failed(None)));
    }

    #[test]
    fn test_unknown_command() {
        let out = dispatch(
            &action(&[("Action", "Originate")]),
            AuthState::Authenticated,
            None,
            at(),
        );
        assert_eq!(out, Outcome::Reply(responses::unknown_command(None)));
        assert_eq!(
            responses::unknown_command(None).to_wire(),
            "Response: Error\r\nMessage: Invalid/unknown command\r\n\r\n"
        );
    }

    #[test]
    fn test_login_with_credentials() {
        let good = action(&[("Action", "login"), ("Username", "test"), ("Secret", "test")]);
        let bad = action(&[("Action", "Login"), ("Username", "test"), ("Secret", "nope")]);

        assert_eq!(
            dispatch(&good, AuthState::Unauthenticated, Some(&creds()), at()),
            Outcome::AuthAccepted(responses::auth_accepted(None))
        );
        assert_eq!(
            dispatch(&bad, AuthState::Unauthenticated, Some(&creds()), at()),
            Outcome::AuthFailed(responses::auth_failed(None))
        );
        assert_eq!(
            dispatch(&bad, AuthState::Unauthenticated, None, at()),
            Outcome::AuthAccepted(responses::auth_accepted(None))
        );
    }

    #[test]
    fn test_logoff_while_unauthenticated_is_refused() {
        let out = dispatch(
            &action(&[("Action", "Logoff"), ("ActionID", "x")]),
            AuthState::Unauthenticated,
            None,
            at(),
        );
        assert_eq!(out, Outcome::AuthFailed(responses::auth_failed(Some("x"))));
    }

    #[test]
    fn test_logoff_after_login() {
        let out = dispatch(
            &action(&[("Action", "Logoff"), ("ActionID", "logoff_123")]),
            AuthState::Authenticated,
            None,
            at(),
        );
        let Outcome::Goodbye(reply) = out else {
            panic!("expected goodbye");
        };
        assert_eq!(
            reply.to_wire(),
            "Response: Goodbye\r\nMessage: Thanks for all the fish.\r\nActionID: logoff_123\r\n\r\n"
        );
    }

    #[test]
    fn test_second_login_is_ignored() {
        let out = dispatch(
            &action(&[("Action", "Login"), ("Username", "test"), ("Secret", "test")]),
            AuthState::Authenticated,
            Some(&creds()),
            at(),
        );
        assert_eq!(out, Outcome::Ignored);
    }

    #[test]
    fn test_fully_booted_fields() {
        assert_eq!(
            responses::fully_booted().to_wire(),
            "Event: FullyBooted\r\nPrivilege: system,all\r\nStatus: Fully Booted\r\n\r\n"
        );
    }
}
