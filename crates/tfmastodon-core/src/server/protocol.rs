//! Wire types of the plugin protocol
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"id":1,"method":"read_resource","params":{"type_name":"mastodon_follow","current_state":{...}}}
//! <- {"id":1,"result":{"new_state":{...}},"diagnostics":[]}
//! ```
//!
//! Before the first request the plugin writes a single handshake line:
//! `<core version>|<protocol version>|stdio|jsonl`.

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::schema::Schema;
use crate::traits::ProviderMetadata;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Version of the handshake itself
pub const CORE_PROTOCOL_VERSION: u32 = 1;

/// Version of the resource lifecycle protocol
pub const APP_PROTOCOL_VERSION: u32 = 6;

/// The line written to stdout before serving
pub fn handshake_line() -> String {
    format!("{}|{}|stdio|jsonl", CORE_PROTOCOL_VERSION, APP_PROTOCOL_VERSION)
}

/// Method names accepted by the server
pub mod method {
    pub const GET_PROVIDER_SCHEMA: &str = "get_provider_schema";
    pub const VALIDATE_PROVIDER_CONFIG: &str = "validate_provider_config";
    pub const CONFIGURE_PROVIDER: &str = "configure_provider";
    pub const VALIDATE_RESOURCE_CONFIG: &str = "validate_resource_config";
    pub const UPGRADE_RESOURCE_STATE: &str = "upgrade_resource_state";
    pub const PLAN_RESOURCE_CHANGE: &str = "plan_resource_change";
    pub const APPLY_RESOURCE_CHANGE: &str = "apply_resource_change";
    pub const READ_RESOURCE: &str = "read_resource";
    pub const IMPORT_RESOURCE_STATE: &str = "import_resource_state";
    pub const STOP_PROVIDER: &str = "stop_provider";
}

/// A request from the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Echoed back in the response
    #[serde(default)]
    pub id: Value,

    pub method: String,

    #[serde(default)]
    pub params: Value,
}

impl Request {
    pub fn new(id: impl Into<Value>, method: &str, params: Value) -> Self {
        Self {
            id: id.into(),
            method: method.to_string(),
            params,
        }
    }
}

/// A response to the host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default)]
    pub diagnostics: Diagnostics,
}

impl Response {
    pub fn new(id: Value, result: Option<Value>, diagnostics: Diagnostics) -> Self {
        Self {
            id,
            result,
            diagnostics,
        }
    }

    pub fn failed(id: Value, diagnostics: impl Into<Diagnostics>) -> Self {
        Self::new(id, None, diagnostics.into())
    }

    pub fn has_error(&self) -> bool {
        self.diagnostics.has_error()
    }

    /// First error diagnostic, if any
    pub fn first_error(&self) -> Option<&Diagnostic> {
        self.diagnostics.iter().find(|d| d.is_error())
    }
}

/// Params carrying a provider configuration block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigParams {
    pub config: Value,
}

/// Params of `validate_resource_config`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfigParams {
    pub type_name: String,
    pub config: Value,
}

/// Params of `upgrade_resource_state`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeParams {
    pub type_name: String,
    pub version: i64,
    pub raw_state: Value,
}

/// Params of `plan_resource_change`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanParams {
    pub type_name: String,
    #[serde(default)]
    pub prior_state: Option<Value>,
    #[serde(default)]
    pub proposed_new_state: Option<Value>,
    #[serde(default)]
    pub config: Value,
}

/// Params of `apply_resource_change`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyParams {
    pub type_name: String,
    #[serde(default)]
    pub prior_state: Option<Value>,
    #[serde(default)]
    pub planned_state: Option<Value>,
}

/// Params of `read_resource`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadParams {
    pub type_name: String,
    pub current_state: Value,
}

/// Params of `import_resource_state`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportParams {
    pub type_name: String,
    pub id: String,
}

/// Result of `get_provider_schema`
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSchemaResult {
    pub provider: ProviderMetadata,
    pub provider_schema: Schema,
    pub resource_schemas: BTreeMap<String, Schema>,
}

/// A resource produced by `import_resource_state`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedResource {
    pub type_name: String,
    pub state: Value,
}
