// # Mastodon Provider
//
// This crate implements the `mastodon` provider: configuration, an
// authenticated API client, and the resources built on top of it.
//
// ## Resources
//
// - `mastodon_domain_block`: a domain hidden for the user's account
// - `mastodon_follow`: the user following a local or remote account
//
// ## Behavior
//
// - One authenticated client per provider process, created by `configure`
// - Every remote failure surfaces as an error diagnostic, no retries
// - Remote objects that disappear are dropped from state on read
//
// ## Security Requirements
//
// - Client secret, password and access token NEVER appear in logs
// - Both secrets are marked sensitive in the provider schema
//
// ## API Reference
//
// - Mastodon REST API: https://docs.joinmastodon.org/api/

pub mod client;
pub mod config;
pub mod resources;

pub use client::MastodonClient;
pub use config::MastodonConfig;
pub use resources::{DomainBlockResourceFactory, FollowResourceFactory};

use async_trait::async_trait;
use serde_json::Value;
use tfmastodon_core::{Attribute, Provider, ResourceRegistry, Result, Schema};

/// Provider type name, the prefix of every resource type name
pub const PROVIDER_TYPE_NAME: &str = "mastodon";

/// The `mastodon` provider
#[derive(Debug, Clone)]
pub struct MastodonProvider {
    version: String,
}

impl MastodonProvider {
    /// Create a provider reporting `version` to the host
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }
}

#[async_trait]
impl Provider for MastodonProvider {
    type Client = MastodonClient;

    fn type_name(&self) -> &'static str {
        PROVIDER_TYPE_NAME
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn schema(&self) -> Schema {
        provider_schema()
    }

    async fn configure(&self, config: Value) -> Result<MastodonClient> {
        let config = MastodonConfig::from_value(config)?;
        config.validate()?;

        tracing::debug!("Configuring provider for {}", config.server);

        MastodonClient::connect(&config).await
    }

    fn register_resources(&self, registry: &ResourceRegistry<MastodonClient>) {
        register(registry);
    }
}

/// Schema of the `provider "mastodon"` block
pub fn provider_schema() -> Schema {
    Schema::v0()
        .with_description("Interact with a Mastodon server on behalf of a user.")
        .with_attribute(
            "server",
            Attribute::required_string().with_description("The server to connect to."),
        )
        .with_attribute(
            "client_id",
            Attribute::required_string().with_description("The client ID of the application."),
        )
        .with_attribute(
            "client_secret",
            Attribute::required_string()
                .with_description("The client secret of the application.")
                .sensitive(),
        )
        .with_attribute(
            "username",
            Attribute::required_string().with_description("The user with which to login."),
        )
        .with_attribute(
            "password",
            Attribute::required_string()
                .with_description("The password of the user.")
                .sensitive(),
        )
        .with_attribute(
            "allow_insecure",
            Attribute::optional_bool()
                .with_description("Allow invalid certificates on the Mastodon server."),
        )
}

/// Register the Mastodon resources with a registry
///
/// # Example
///
/// ```rust
/// use tfmastodon_core::ResourceRegistry;
/// use tfmastodon_provider::MastodonClient;
///
/// let registry = ResourceRegistry::<MastodonClient>::new("mastodon");
/// tfmastodon_provider::register(&registry);
/// assert!(registry.has_resource("mastodon_follow"));
/// ```
pub fn register(registry: &ResourceRegistry<MastodonClient>) {
    registry.register_resource(Box::new(DomainBlockResourceFactory));
    registry.register_resource(Box::new(FollowResourceFactory));
}
