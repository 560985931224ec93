// # Resource Trait
//
// Defines the CRUD contract every resource type implements.
//
// ## Implementations
//
// - `mastodon_domain_block`: `tfmastodon-provider` crate
// - `mastodon_follow`: `tfmastodon-provider` crate
//
// ## Usage
//
// ```rust,ignore
// use tfmastodon_core::traits::{Resource, boxed};
//
// struct Widget { client: Arc<ApiClient> }
//
// #[async_trait]
// impl Resource for Widget {
//     type Model = WidgetModel;
//     // create/read/update/delete/import_state
// }
//
// let handler = boxed(Widget { client });
// let state = handler.create(planned_json).await?;
// ```

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::schema::Schema;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Trait for resource implementations
///
/// Each method maps the resource's model onto one or two remote calls.
/// Implementations own no state between calls; everything they need comes
/// in through the model and the shared client they were built with.
///
/// # Errors
///
/// Remote failures are returned as errors and surface verbatim as diagnostics.
/// No retries happen anywhere in the plugin.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Typed model matching the resource schema
    type Model: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Create the remote object described by the plan
    ///
    /// Returns the model to save, with computed attributes filled in.
    async fn create(&self, plan: Self::Model) -> Result<Self::Model>;

    /// Refresh the model from the remote server
    ///
    /// Returns `Ok(None)` when the remote object no longer exists, which
    /// removes the resource from state.
    async fn read(&self, state: Self::Model) -> Result<Option<Self::Model>>;

    /// Apply an in-place update
    async fn update(&self, prior: Self::Model, plan: Self::Model) -> Result<Self::Model>;

    /// Delete the remote object
    ///
    /// Deleting an object that is already gone succeeds.
    async fn delete(&self, state: Self::Model) -> Result<()>;

    /// Build a model from an import identifier
    async fn import_state(&self, id: &str) -> Result<Self::Model>;
}

/// Type-erased resource operating on JSON state
///
/// The server only ever talks to resources through this trait.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    async fn create(&self, planned: Value) -> std::result::Result<Value, Diagnostics>;

    async fn read(&self, current: Value) -> std::result::Result<Option<Value>, Diagnostics>;

    async fn update(&self, prior: Value, planned: Value)
    -> std::result::Result<Value, Diagnostics>;

    async fn delete(&self, current: Value) -> std::result::Result<(), Diagnostics>;

    async fn import_state(&self, id: &str) -> std::result::Result<Value, Diagnostics>;
}

/// Adapter from a typed [`Resource`] to a [`ResourceHandler`]
pub struct Typed<R>(pub R);

/// Box a typed resource as a handler
pub fn boxed<R: Resource + 'static>(resource: R) -> Box<dyn ResourceHandler> {
    Box::new(Typed(resource))
}

fn decode<M: DeserializeOwned>(value: Value, what: &str) -> std::result::Result<M, Diagnostics> {
    serde_json::from_value(value).map_err(|e| {
        Diagnostic::error(
            "Invalid Resource Data",
            format!("Unable to read {} into the resource model: {}", what, e),
        )
        .into()
    })
}

fn encode<M: Serialize>(model: &M) -> std::result::Result<Value, Diagnostics> {
    serde_json::to_value(model).map_err(|e| {
        Diagnostic::error(
            "Invalid Resource Data",
            format!("Unable to save the resource model into state: {}", e),
        )
        .into()
    })
}

#[async_trait]
impl<R: Resource> ResourceHandler for Typed<R> {
    async fn create(&self, planned: Value) -> std::result::Result<Value, Diagnostics> {
        let plan = decode(planned, "plan")?;
        let model = self.0.create(plan).await?;
        encode(&model)
    }

    async fn read(&self, current: Value) -> std::result::Result<Option<Value>, Diagnostics> {
        let state = decode(current, "prior state")?;
        match self.0.read(state).await? {
            Some(model) => Ok(Some(encode(&model)?)),
            None => Ok(None),
        }
    }

    async fn update(
        &self,
        prior: Value,
        planned: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let prior = decode(prior, "prior state")?;
        let plan = decode(planned, "plan")?;
        let model = self.0.update(prior, plan).await?;
        encode(&model)
    }

    async fn delete(&self, current: Value) -> std::result::Result<(), Diagnostics> {
        let state = decode(current, "prior state")?;
        self.0.delete(state).await?;
        Ok(())
    }

    async fn import_state(&self, id: &str) -> std::result::Result<Value, Diagnostics> {
        let model = self.0.import_state(id).await?;
        encode(&model)
    }
}

/// Helper trait for constructing resources from the configured client
///
/// Factories are registered before the provider is configured, so they also
/// carry the resource schema.
pub trait ResourceFactory<C>: Send + Sync {
    /// Full resource type name, e.g. `mastodon_follow` for provider `mastodon`
    fn type_name(&self, provider_type_name: &str) -> String;

    /// Schema of the resource type
    fn schema(&self) -> Schema;

    /// Create a resource bound to the configured client
    fn create(&self, client: Arc<C>) -> Box<dyn ResourceHandler>;
}
