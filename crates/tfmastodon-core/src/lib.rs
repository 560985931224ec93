// # tfmastodon-core
//
// Plugin framework for the Mastodon Terraform provider.
//
// ## Architecture Overview
//
// This library owns everything between the host and a provider implementation:
// - **Provider**: Trait for reading the provider block and producing a shared client
// - **Resource**: Trait mapping one resource type onto remote CRUD calls
// - **ResourceRegistry**: Plugin-based registry of resource factories
// - **Schema**: Attribute declarations, config validation and value validators
// - **Plan**: Planned state and replacement detection for resource changes
// - **ProviderServer**: Line-delimited JSON protocol spoken to the host over stdio
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Lifecycle handling is separate from remote APIs
// 2. **Plugin-Based**: Resources are registered through factories, no hard-coded match
// 3. **Library-First**: The server can be driven over any async reader/writer pair
// 4. **Verbatim Errors**: Remote failures surface unchanged as diagnostics

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod plan;
pub mod registry;
pub mod schema;
pub mod server;
pub mod traits;

// Re-export core types for convenience
pub use config::ServeConfig;
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{Error, Result};
pub use plan::{PlannedChange, UNKNOWN_VALUE};
pub use registry::ResourceRegistry;
pub use schema::{Attribute, AttributeType, Schema};
pub use server::{ProviderServer, serve, serve_on};
pub use traits::{Provider, Resource, ResourceFactory, ResourceHandler};
