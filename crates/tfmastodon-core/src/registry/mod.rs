//! Plugin-based resource registry
//!
//! The registry allows resource types to be registered dynamically at
//! startup, avoiding hardcoded match arms in the server.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tfmastodon_core::registry::ResourceRegistry;
//!
//! // Create a registry for provider "mastodon"
//! let registry = ResourceRegistry::<MastodonClient>::new("mastodon");
//!
//! // Register resources
//! registry.register_resource(Box::new(FollowResourceFactory));
//!
//! // Create a resource once the client exists
//! let resource = registry.create_resource("mastodon_follow", client)?;
//! ```

use crate::error::{Error, Result};
use crate::schema::Schema;
use crate::traits::{ResourceFactory, ResourceHandler};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Resource registry for plugin-based resource creation
///
/// The registry maintains a map of full resource type names to factory
/// objects, allowing resources to be instantiated per request from the
/// configured client.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
pub struct ResourceRegistry<C> {
    /// Provider type name used to build full resource type names
    provider_type_name: String,

    /// Registered resource factories
    resources: RwLock<BTreeMap<String, Arc<dyn ResourceFactory<C>>>>,
}

impl<C> ResourceRegistry<C> {
    /// Create a new empty registry
    pub fn new(provider_type_name: impl Into<String>) -> Self {
        Self {
            provider_type_name: provider_type_name.into(),
            resources: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn provider_type_name(&self) -> &str {
        &self.provider_type_name
    }

    /// Register a resource factory
    ///
    /// The factory is stored under its full type name. Registering the same
    /// type twice replaces the earlier factory.
    pub fn register_resource(&self, factory: Box<dyn ResourceFactory<C>>) {
        let name = factory.type_name(&self.provider_type_name);
        tracing::debug!("Registering resource type {}", name);

        let mut resources = self.resources.write().unwrap_or_else(|e| e.into_inner());
        resources.insert(name, Arc::from(factory));
    }

    fn factory(&self, type_name: &str) -> Result<Arc<dyn ResourceFactory<C>>> {
        let resources = self.resources.read().unwrap_or_else(|e| e.into_inner());
        resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| Error::UnknownResource(type_name.to_string()))
    }

    /// Create a resource bound to the configured client
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ResourceHandler>)`: Created resource instance
    /// - `Err(Error)`: If the resource type is not registered
    pub fn create_resource(&self, type_name: &str, client: Arc<C>) -> Result<Box<dyn ResourceHandler>> {
        Ok(self.factory(type_name)?.create(client))
    }

    /// Schema of a registered resource type
    pub fn schema(&self, type_name: &str) -> Result<Schema> {
        Ok(self.factory(type_name)?.schema())
    }

    /// Schemas of every registered resource type, keyed by type name
    pub fn schemas(&self) -> BTreeMap<String, Schema> {
        let resources = self.resources.read().unwrap_or_else(|e| e.into_inner());
        resources
            .iter()
            .map(|(name, factory)| (name.clone(), factory.schema()))
            .collect()
    }

    /// List all registered resource type names
    pub fn list_resources(&self) -> Vec<String> {
        let resources = self.resources.read().unwrap_or_else(|e| e.into_inner());
        resources.keys().cloned().collect()
    }

    /// Check if a resource type is registered
    pub fn has_resource(&self, type_name: &str) -> bool {
        let resources = self.resources.read().unwrap_or_else(|e| e.into_inner());
        resources.contains_key(type_name)
    }
}
