//! Test doubles and common utilities for lifecycle contract tests
//!
//! This module provides a minimal in-memory provider ("test") with a single
//! resource type ("test_widget") and a harness that drives a server over an
//! in-process pipe, the same way the host drives the real binary.

#![allow(dead_code)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tfmastodon_core::error::{Error, Result};
use tfmastodon_core::schema::{Attribute, Schema};
use tfmastodon_core::server::protocol::{Request, Response};
use tfmastodon_core::traits::{Provider, Resource, ResourceFactory, ResourceHandler, boxed};
use tfmastodon_core::{ResourceRegistry, serve_on};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

/// In-memory remote API shared by the provider and the test
#[derive(Default)]
pub struct MockApi {
    widgets: Mutex<HashMap<String, String>>,
    next_id: AtomicUsize,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.lock().unwrap().len()
    }

    /// Remove a widget behind the provider's back
    pub fn forget(&self, id: &str) {
        self.widgets.lock().unwrap().remove(id);
    }

    fn insert(&self, name: &str) -> String {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("widget-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.widgets
            .lock()
            .unwrap()
            .insert(id.clone(), name.to_string());
        id
    }

    fn get(&self, id: &str) -> Option<String> {
        self.widgets.lock().unwrap().get(id).cloned()
    }

    fn find(&self, name: &str) -> Vec<String> {
        self.widgets
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, n)| n.as_str() == name)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn remove(&self, id: &str) {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.widgets.lock().unwrap().remove(id);
    }
}

/// Configured client handed to resources
pub struct MockClient {
    pub api: Arc<MockApi>,
    pub endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WidgetModel {
    pub name: String,
    pub id: Option<String>,
}

pub struct WidgetResource {
    client: Arc<MockClient>,
}

#[async_trait]
impl Resource for WidgetResource {
    type Model = WidgetModel;

    async fn create(&self, mut plan: WidgetModel) -> Result<WidgetModel> {
        if plan.name == "explode" {
            return Err(Error::client("create widget", "500 Internal Server Error"));
        }
        plan.id = Some(self.client.api.insert(&plan.name));
        Ok(plan)
    }

    async fn read(&self, state: WidgetModel) -> Result<Option<WidgetModel>> {
        let id = state.id.clone().unwrap_or_default();
        Ok(self.client.api.get(&id).map(|name| WidgetModel {
            name,
            id: Some(id),
        }))
    }

    async fn update(&self, _prior: WidgetModel, plan: WidgetModel) -> Result<WidgetModel> {
        Ok(plan)
    }

    async fn delete(&self, state: WidgetModel) -> Result<()> {
        if let Some(id) = state.id {
            self.client.api.remove(&id);
        }
        Ok(())
    }

    async fn import_state(&self, id: &str) -> Result<WidgetModel> {
        let matches = self.client.api.find(id);
        if matches.len() != 1 {
            return Err(Error::client(
                "find widget",
                format!("unable to find exact match, found {}", matches.len()),
            ));
        }
        Ok(WidgetModel {
            name: id.to_string(),
            id: matches.into_iter().next(),
        })
    }
}

pub struct WidgetResourceFactory;

impl ResourceFactory<MockClient> for WidgetResourceFactory {
    fn type_name(&self, provider_type_name: &str) -> String {
        format!("{}_widget", provider_type_name)
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_description("test_widget manages widgets.")
            .with_attribute("name", Attribute::required_string().requires_replace())
            .with_attribute("id", Attribute::computed_string())
    }

    fn create(&self, client: Arc<MockClient>) -> Box<dyn ResourceHandler> {
        boxed(WidgetResource { client })
    }
}

#[derive(Deserialize)]
struct MockProviderConfig {
    endpoint: String,
    #[serde(default)]
    reject: Option<bool>,
}

/// Provider "test" backed by [`MockApi`]
pub struct MockProvider {
    api: Arc<MockApi>,
}

impl MockProvider {
    pub fn new(api: Arc<MockApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Provider for MockProvider {
    type Client = MockClient;

    fn type_name(&self) -> &'static str {
        "test"
    }

    fn version(&self) -> &str {
        "test"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute("endpoint", Attribute::required_string())
            .with_attribute("reject", Attribute::optional_bool())
    }

    async fn configure(&self, config: Value) -> Result<MockClient> {
        let config: MockProviderConfig = serde_json::from_value(config)?;
        if config.reject.unwrap_or(false) {
            return Err(Error::auth("invalid_grant"));
        }
        Ok(MockClient {
            api: Arc::clone(&self.api),
            endpoint: config.endpoint,
        })
    }

    fn register_resources(&self, registry: &ResourceRegistry<MockClient>) {
        registry.register_resource(Box::new(WidgetResourceFactory));
    }
}

/// Drives a server over an in-process pipe
pub struct PluginHarness {
    pub handshake: String,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
    server: JoinHandle<Result<()>>,
    next_id: u64,
}

impl PluginHarness {
    /// Start a server for `MockProvider` and consume its handshake line
    pub async fn start(api: Arc<MockApi>) -> Self {
        let (host_io, plugin_io) = tokio::io::duplex(64 * 1024);
        let (plugin_read, plugin_write) = tokio::io::split(plugin_io);
        let server = tokio::spawn(serve_on(MockProvider::new(api), plugin_read, plugin_write));

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

    /// Send a raw line and read one response
    pub async fn send_raw(&mut self, line: &str) -> Response {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();

        let response = self
            .lines
            .next_line()
            .await
            .expect("response readable")
            .expect("response present");
        serde_json::from_str(&response).expect("response is JSON")
    }

    /// Call a method and return its response
    pub async fn call(&mut self, method: &str, params: Value) -> Response {
        self.next_id += 1;
        let request = Request::new(self.next_id, method, params);
        let response = self.send_raw(&serde_json::to_string(&request).unwrap()).await;
        assert_eq!(response.id, json!(self.next_id), "response id echoes request id");
        response
    }

    /// Configure the provider with a working endpoint
    pub async fn configure(&mut self) {
        let response = self
            .call(
                "configure_provider",
                json!({ "config": { "endpoint": "https://widgets.test" } }),
            )
            .await;
        assert!(!response.has_error(), "{:?}", response.diagnostics);
    }

    /// Stop the server and wait for it to exit
    pub async fn stop(mut self) -> Result<()> {
        let response = self.call("stop_provider", Value::Null).await;
        assert!(!response.has_error());
        self.server.await.expect("server task joins")
    }
}

/// Apply a create for `name` and return the new state
pub async fn create_widget(harness: &mut PluginHarness, name: &str) -> Value {
    let response = harness
        .call(
            "apply_resource_change",
            json!({
                "type_name": "test_widget",
                "prior_state": null,
                "planned_state": { "name": name, "id": null },
            }),
        )
        .await;
    assert!(!response.has_error(), "{:?}", response.diagnostics);
    response.result.expect("result present")["new_state"].clone()
}
