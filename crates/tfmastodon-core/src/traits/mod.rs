//! Core traits for the provider plugin
//!
//! This module defines the abstract interfaces that provider implementations follow.
//!
//! - [`Provider`]: Configure the remote client and register resources
//! - [`Resource`]: Map one resource type onto remote CRUD calls
//! - [`ResourceHandler`]: Type-erased resource driven by the server
//! - [`ResourceFactory`]: Build resources from the configured client

pub mod provider;
pub mod resource;

pub use provider::{Provider, ProviderMetadata};
pub use resource::{Resource, ResourceFactory, ResourceHandler, Typed, boxed};
