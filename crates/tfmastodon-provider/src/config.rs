//! Provider block configuration

use serde::Deserialize;
use serde_json::Value;
use tfmastodon_core::{Error, Result};

/// Settings from the `provider "mastodon"` block
#[derive(Clone, Deserialize)]
pub struct MastodonConfig {
    /// Base URL of the instance, e.g. `https://mastodon.social`
    pub server: String,

    pub client_id: String,

    /// ⚠️ NEVER log this value
    pub client_secret: String,

    pub username: String,

    /// ⚠️ NEVER log this value
    pub password: String,

    /// Skip TLS certificate verification
    #[serde(default)]
    pub allow_insecure: Option<bool>,
}

// Custom Debug implementation that hides the credentials
impl std::fmt::Debug for MastodonConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MastodonConfig")
            .field("server", &self.server)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<REDACTED>")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("allow_insecure", &self.allow_insecure)
            .finish()
    }
}

impl MastodonConfig {
    /// Decode the provider block as sent by the host
    pub fn from_value(config: Value) -> Result<Self> {
        serde_json::from_value(config)
            .map_err(|e| Error::config(format!("Invalid provider configuration: {}", e)))
    }

    pub fn allow_insecure(&self) -> bool {
        self.allow_insecure.unwrap_or(false)
    }

    /// Reject empty settings before any request is made
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("server", &self.server),
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("username", &self.username),
            ("password", &self.password),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::config(format!("{} cannot be empty", name)));
            }
        }

        Ok(())
    }
}
