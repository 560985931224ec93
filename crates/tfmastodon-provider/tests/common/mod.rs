//! Shared fixtures for Mastodon provider tests
//!
//! Every test runs against an `httpmock` server standing in for a Mastodon
//! instance. `PluginHarness` drives the real provider over an in-process
//! pipe, the same way the host drives the binary.

#![allow(dead_code)]

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{Value, json};
use std::sync::Arc;
use tfmastodon_core::Result;
use tfmastodon_core::server::protocol::{Request, Response};
use tfmastodon_core::serve_on;
use tfmastodon_provider::{MastodonClient, MastodonProvider};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

pub const ACCESS_TOKEN: &str = "test-access-token";

pub const BEARER: &str = "Bearer test-access-token";

/// Client authenticated with [`ACCESS_TOKEN`] against the mock server
pub fn client(server: &MockServer) -> Arc<MastodonClient> {
    Arc::new(
        MastodonClient::with_access_token(&server.base_url(), ACCESS_TOKEN, false)
            .expect("client builds"),
    )
}

/// Provider block pointing at the mock server
pub fn provider_config(server: &MockServer) -> Value {
    json!({
        "server": server.base_url(),
        "client_id": "test-client",
        "client_secret": "test-secret",
        "username": "admin@localhost",
        "password": "mastodonadmin",
    })
}

/// Successful password grant
pub fn mock_token(server: &MockServer) -> Mock<'_> {
    server.mock(|when, then| {
        when.method(POST)
            .path("/oauth/token")
            .body_contains("grant_type=password");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "scope": "read write follow",
                "created_at": 1700000000,
            }));
    })
}

pub fn account_json(id: &str, acct: &str) -> Value {
    json!({
        "id": id,
        "username": acct.split('@').next().unwrap_or(acct),
        "acct": acct,
        "display_name": "",
        "locked": false,
    })
}

pub fn relationship_json(id: &str, following: bool, requested: bool) -> Value {
    json!({
        "id": id,
        "following": following,
        "showing_reblogs": following,
        "notifying": false,
        "followed_by": false,
        "blocking": false,
        "blocked_by": false,
        "muting": false,
        "muting_notifications": false,
        "requested": requested,
        "domain_blocking": false,
        "endorsed": false,
        "note": "",
    })
}

/// Drives a `mastodon` provider server over an in-process pipe
pub struct PluginHarness {
    pub handshake: String,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    server: JoinHandle<Result<()>>,
    next_id: u64,
}

impl PluginHarness {
    pub async fn start() -> Self {
        let (host_io, plugin_io) = tokio::io::duplex(64 * 1024);
        let (plugin_read, plugin_write) = tokio::io::split(plugin_io);
        let server = tokio::spawn(serve_on(
            MastodonProvider::new("test"),
            plugin_read,
            plugin_write,
        ));

        let (host_read, writer) = tokio::io::split(host_io);
        let mut lines = BufReader::new(host_read).lines();
        let handshake = lines
            .next_line()
            .await
            .expect("handshake readable")
            .expect("handshake present");

        Self {
            handshake,
            lines,
            writer,
            server,
            next_id: 0,
        }
    }

    /// Call a method and return its response
    pub async fn call(&mut self, method: &str, params: Value) -> Response {
        self.next_id += 1;
        let request = Request::new(self.next_id, method, params);
        let line = serde_json::to_string(&request).unwrap();

        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();

        let response = self
            .lines
            .next_line()
            .await
            .expect("response readable")
            .expect("response present");
        let response: Response = serde_json::from_str(&response).expect("response is JSON");
        assert_eq!(response.id, json!(self.next_id), "response id echoes request id");
        response
    }

    /// Apply a change and return the new state
    pub async fn apply(&mut self, type_name: &str, prior: Value, planned: Value) -> Value {
        let response = self
            .call(
                "apply_resource_change",
                json!({ "type_name": type_name, "prior_state": prior, "planned_state": planned }),
            )
            .await;
        assert!(!response.has_error(), "{:?}", response.diagnostics);
        response.result.expect("result present")["new_state"].clone()
    }

    pub async fn stop(mut self) -> Result<()> {
        let response = self.call("stop_provider", Value::Null).await;
        assert!(!response.has_error());
        self.server.await.expect("server task joins")
    }
}
