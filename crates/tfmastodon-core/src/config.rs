//! Plugin process configuration
//!
//! The host launches the plugin with a handful of environment variables.
//! This module reads and validates them.
//!
//! - `TF_PLUGIN_MAGIC_COOKIE`: must match [`MAGIC_COOKIE_VALUE`]
//! - `TF_LOG_PROVIDER`, falling back to `TF_LOG`: log level

use crate::error::{Error, Result};
use tracing::Level;

/// Environment variable carrying the handshake cookie
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";

/// Expected handshake cookie value
pub const MAGIC_COOKIE_VALUE: &str =
    "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

/// Printed when the binary is started outside the host
pub const NOT_A_PLUGIN_HOST_MESSAGE: &str = "This binary is a plugin. These are not meant to be \
executed directly. Please execute the program that consumes these plugins, which will load any \
plugins automatically";

const DEFAULT_LOG_LEVEL: &str = "warn";

/// Settings for a plugin process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    /// Requested log level, as given
    pub log_level: String,

    /// Handshake cookie passed by the host
    pub magic_cookie: Option<String>,
}

impl ServeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let log_level = lookup("TF_LOG_PROVIDER")
            .filter(|level| !level.is_empty())
            .or_else(|| lookup("TF_LOG").filter(|level| !level.is_empty()))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Self {
            log_level,
            magic_cookie: lookup(MAGIC_COOKIE_KEY),
        }
    }

    /// Check whether the process was launched by a plugin host
    pub fn launched_by_host(&self) -> bool {
        self.magic_cookie.as_deref() == Some(MAGIC_COOKIE_VALUE)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.launched_by_host() {
            return Err(Error::config(NOT_A_PLUGIN_HOST_MESSAGE));
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "json" | "off" => Ok(()),
            _ => Err(Error::config(format!(
                "TF_LOG '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error, json, off",
                self.log_level
            ))),
        }
    }

    /// Maximum tracing level, `None` when logging is off
    pub fn max_level(&self) -> Option<Level> {
        match self.log_level.to_lowercase().as_str() {
            "off" => None,
            "trace" | "json" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "error" => Some(Level::ERROR),
            _ => Some(Level::WARN),
        }
    }
}
