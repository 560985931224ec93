// # Provider Trait
//
// Defines how a provider reads its configuration block, produces the client
// shared by its resources, and makes its resource types known.

use crate::error::Result;
use crate::registry::ResourceRegistry;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Name and version reported to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderMetadata {
    pub type_name: String,
    pub version: String,
}

/// Trait for provider implementations
///
/// # Lifecycle
///
/// 1. The server asks for [`Provider::schema`] and registers resources
/// 2. The host sends the provider block, which is validated against the schema
/// 3. [`Provider::configure`] turns it into a client
/// 4. Every resource operation gets a resource built from that client
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Client shared by all resources once configured
    type Client: Send + Sync + 'static;

    /// Provider type name, used as the prefix of every resource type name
    fn type_name(&self) -> &'static str;

    /// Provider version: the release version, "dev" for local builds, "test" in tests
    fn version(&self) -> &str;

    /// Schema of the provider configuration block
    fn schema(&self) -> Schema;

    /// Build an authenticated client from a validated provider block
    async fn configure(&self, config: Value) -> Result<Self::Client>;

    /// Register the factories of every resource type this provider serves
    fn register_resources(&self, registry: &ResourceRegistry<Self::Client>);

    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            type_name: self.type_name().to_string(),
            version: self.version().to_string(),
        }
    }
}
