//! Provider server
//!
//! The server drives a [`Provider`] and its resources through the resource
//! lifecycle requested by the host:
//!
//! ```text
//! host ── request line ──► ProviderServer ──► ResourceRegistry ──► Resource
//!      ◄─ response line ──                                          │
//!                                                                   ▼
//!                                                             remote API
//! ```
//!
//! Requests are handled strictly one at a time, in the order received.
//!
//! ## Lifecycle
//!
//! 1. `get_provider_schema` / `validate_provider_config`
//! 2. `configure_provider` builds the shared client
//! 3. `validate_resource_config`, `plan_resource_change`,
//!    `apply_resource_change`, `read_resource`, `import_resource_state`
//! 4. `stop_provider` or end of input stops the server

pub mod protocol;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{Error, Result};
use crate::plan::{PlannedChange, contains_unknown, plan_resource_change};
use crate::registry::ResourceRegistry;
use crate::traits::{Provider, ResourceHandler};
use protocol::{
    ApplyParams, ConfigParams, ImportParams, ImportedResource, PlanParams,
    ProviderSchemaResult, ReadParams, Request, ResourceConfigParams, Response, UpgradeParams,
    handshake_line, method,
};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tracing::{debug, info, trace, warn};

type OpResult<T> = std::result::Result<T, Diagnostics>;

/// Serve a provider over stdin/stdout
pub async fn serve<P: Provider>(provider: P) -> Result<()> {
    serve_on(provider, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Serve a provider over an arbitrary reader/writer pair
pub async fn serve_on<P, R, W>(provider: P, reader: R, writer: W) -> Result<()>
where
    P: Provider,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    ProviderServer::new(provider).run(reader, writer).await
}

/// Server state for one provider process
pub struct ProviderServer<P: Provider> {
    provider: P,

    /// Resource factories registered by the provider
    registry: ResourceRegistry<P::Client>,

    /// Client produced by `configure_provider`
    client: RwLock<Option<Arc<P::Client>>>,
}

impl<P: Provider> ProviderServer<P> {
    /// Create a server and register the provider's resources
    pub fn new(provider: P) -> Self {
        let registry = ResourceRegistry::new(provider.type_name());
        provider.register_resources(&registry);

        Self {
            provider,
            registry,
            client: RwLock::new(None),
        }
    }

    pub fn registry(&self) -> &ResourceRegistry<P::Client> {
        &self.registry
    }

    /// Run the request loop until end of input or `stop_provider`
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        writer.write_all(handshake_line().as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;

        info!(
            "Serving provider {} {}",
            self.provider.type_name(),
            self.provider.version()
        );

        let mut lines = LinesStream::new(BufReader::new(reader).lines());

        while let Some(line) = lines.next().await {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let (response, stop) = match serde_json::from_str::<Request>(&line) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    warn!("Discarding malformed request: {}", e);
                    let err = Error::protocol(format!("Malformed request: {}", e));
                    (Response::failed(Value::Null, Diagnostic::from(err)), false)
                }
            };

            let mut encoded = serde_json::to_vec(&response)?;
            encoded.push(b'\n');
            writer.write_all(&encoded).await?;
            writer.flush().await?;

            if stop {
                info!("Stop requested, shutting down");
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request
    ///
    /// Returns the response and whether the server should stop.
    pub async fn handle(&self, request: Request) -> (Response, bool) {
        let Request {
            id,
            method: name,
            params,
        } = request;
        debug!("Handling {}", name);

        let outcome = match name.as_str() {
            method::GET_PROVIDER_SCHEMA => Ok((to_json(&self.get_provider_schema()), Diagnostics::new())),
            method::VALIDATE_PROVIDER_CONFIG => decode::<ConfigParams>(params)
                .map(|p| (None, self.validate_provider_config(&p.config))),
            method::CONFIGURE_PROVIDER => match decode::<ConfigParams>(params) {
                Ok(p) => Ok((None, self.configure_provider(p.config).await)),
                Err(diags) => Err(diags),
            },
            method::VALIDATE_RESOURCE_CONFIG => decode::<ResourceConfigParams>(params)
                .map(|p| (None, self.validate_resource_config(&p.type_name, &p.config))),
            method::UPGRADE_RESOURCE_STATE => decode::<UpgradeParams>(params)
                .and_then(|p| self.upgrade_resource_state(&p.type_name, p.version, p.raw_state))
                .map(|state| (Some(json!({ "upgraded_state": state })), Diagnostics::new())),
            method::PLAN_RESOURCE_CHANGE => decode::<PlanParams>(params)
                .and_then(|p| self.plan_resource_change(&p))
                .map(|change| (to_json(&change), Diagnostics::new())),
            method::APPLY_RESOURCE_CHANGE => match decode::<ApplyParams>(params) {
                Ok(p) => self
                    .apply_resource_change(&p.type_name, p.prior_state, p.planned_state)
                    .await
                    .map(|state| (Some(json!({ "new_state": state })), Diagnostics::new())),
                Err(diags) => Err(diags),
            },
            method::READ_RESOURCE => match decode::<ReadParams>(params) {
                Ok(p) => self
                    .read_resource(&p.type_name, p.current_state)
                    .await
                    .map(|state| (Some(json!({ "new_state": state })), Diagnostics::new())),
                Err(diags) => Err(diags),
            },
            method::IMPORT_RESOURCE_STATE => match decode::<ImportParams>(params) {
                Ok(p) => self
                    .import_resource_state(&p.type_name, &p.id)
                    .await
                    .map(|imported| {
                        (
                            Some(json!({ "imported_resources": [imported] })),
                            Diagnostics::new(),
                        )
                    }),
                Err(diags) => Err(diags),
            },
            method::STOP_PROVIDER => {
                return (Response::new(id, None, Diagnostics::new()), true);
            }
            other => Err(Error::protocol(format!("Unknown method: {}", other)).into()),
        };

        let response = match outcome {
            Ok((result, diagnostics)) => Response::new(id, result, diagnostics),
            Err(diagnostics) => Response::failed(id, diagnostics),
        };
        (response, false)
    }

    /// Provider metadata and every schema
    pub fn get_provider_schema(&self) -> ProviderSchemaResult {
        ProviderSchemaResult {
            provider: self.provider.metadata(),
            provider_schema: self.provider.schema(),
            resource_schemas: self.registry.schemas(),
        }
    }

    pub fn validate_provider_config(&self, config: &Value) -> Diagnostics {
        self.provider.schema().validate_config(config)
    }

    /// Validate the provider block and build the shared client
    pub async fn configure_provider(&self, config: Value) -> Diagnostics {
        let mut diags = self.validate_provider_config(&config);
        if diags.has_error() {
            return diags;
        }

        match self.provider.configure(config).await {
            Ok(client) => {
                *self.client.write().await = Some(Arc::new(client));
                info!("Provider {} configured", self.provider.type_name());
            }
            Err(e) => {
                warn!("Provider configuration failed: {}", e);
                diags.push(e.into());
            }
        }

        diags
    }

    pub fn validate_resource_config(&self, type_name: &str, config: &Value) -> Diagnostics {
        match self.registry.schema(type_name) {
            Ok(schema) => schema.validate_config(config),
            Err(e) => e.into(),
        }
    }

    /// Pass through state written at the current schema version
    pub fn upgrade_resource_state(
        &self,
        type_name: &str,
        version: i64,
        raw_state: Value,
    ) -> OpResult<Value> {
        let schema = self.registry.schema(type_name)?;

        if version != schema.version {
            return Err(Diagnostic::error(
                "Unable to Upgrade Resource State",
                format!(
                    "{} has no upgrade path from schema version {} to {}",
                    type_name, version, schema.version
                ),
            )
            .into());
        }

        Ok(raw_state)
    }

    pub fn plan_resource_change(&self, params: &PlanParams) -> OpResult<PlannedChange> {
        let schema = self.registry.schema(&params.type_name)?;

        if params.proposed_new_state.is_some() && !params.config.is_null() {
            schema.validate_config(&params.config).into_result()?;
        }

        let change = plan_resource_change(
            &schema,
            params.prior_state.as_ref(),
            params.proposed_new_state.as_ref(),
        )?;

        if change.is_replacement() {
            debug!(
                "{} requires replacement due to {:?}",
                params.type_name, change.requires_replace
            );
        }

        Ok(change)
    }

    /// Create, update or delete depending on which states are present
    ///
    /// Returns the new state, `None` after a delete.
    pub async fn apply_resource_change(
        &self,
        type_name: &str,
        prior_state: Option<Value>,
        planned_state: Option<Value>,
    ) -> OpResult<Option<Value>> {
        let resource = self.resource(type_name).await?;

        let new_state = match (prior_state, planned_state) {
            (None, Some(planned)) => {
                let state = resource.create(planned).await?;
                trace!("created a {} resource", type_name);
                Some(state)
            }
            (Some(prior), Some(planned)) => {
                let state = resource.update(prior, planned).await?;
                trace!("updated a {} resource", type_name);
                Some(state)
            }
            (Some(prior), None) => {
                resource.delete(prior).await?;
                trace!("deleted a {} resource", type_name);
                None
            }
            (None, None) => None,
        };

        if new_state.as_ref().is_some_and(contains_unknown) {
            return Err(Diagnostic::error(
                "Provider returned invalid result object after apply",
                format!(
                    "After applying changes to {}, the provider left unknown values in the new state.",
                    type_name
                ),
            )
            .into());
        }

        Ok(new_state)
    }

    /// Refresh state; `None` means the resource is gone
    pub async fn read_resource(&self, type_name: &str, current_state: Value) -> OpResult<Option<Value>> {
        let resource = self.resource(type_name).await?;
        let state = resource.read(current_state).await?;

        if state.is_none() {
            info!("{} no longer exists remotely, removing from state", type_name);
        }

        Ok(state)
    }

    pub async fn import_resource_state(&self, type_name: &str, id: &str) -> OpResult<ImportedResource> {
        let resource = self.resource(type_name).await?;
        let state = resource.import_state(id).await?;

        Ok(ImportedResource {
            type_name: type_name.to_string(),
            state,
        })
    }

    async fn resource(&self, type_name: &str) -> OpResult<Box<dyn ResourceHandler>> {
        let client = self
            .client
            .read()
            .await
            .clone()
            .ok_or(Error::NotConfigured)?;

        Ok(self.registry.create_resource(type_name, client)?)
    }
}

fn decode<T: DeserializeOwned>(params: Value) -> OpResult<T> {
    serde_json::from_value(params)
        .map_err(|e| Error::protocol(format!("Invalid request params: {}", e)).into())
}

fn to_json<T: serde::Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!("Unable to encode response: {}", e);
            None
        }
    }
}
