//! Value validators attached to schema attributes

use serde_json::Value;

/// Validates a known, correctly typed attribute value
///
/// Returns the diagnostic detail on failure.
pub trait AttributeValidator: Send + Sync + std::fmt::Debug {
    fn validate(&self, value: &Value) -> Result<(), String>;
}

/// Requires a DNS host name
#[derive(Debug, Clone, Copy)]
pub struct Hostname;

impl AttributeValidator for Hostname {
    fn validate(&self, value: &Value) -> Result<(), String> {
        match value.as_str() {
            Some(host) => validate_hostname(host),
            None => Err("Value must be a string".to_string()),
        }
    }
}

/// Requires an account handle: `user`, `user@domain` or `@user@domain`
#[derive(Debug, Clone, Copy)]
pub struct AccountHandle;

impl AttributeValidator for AccountHandle {
    fn validate(&self, value: &Value) -> Result<(), String> {
        match value.as_str() {
            Some(handle) => validate_account_handle(handle),
            None => Err("Value must be a string".to_string()),
        }
    }
}

/// Validate that a string is a valid host name
///
/// Basic RFC 1035 checks: total length, label length and characters.
pub fn validate_hostname(host: &str) -> Result<(), String> {
    if host.is_empty() {
        return Err("Domain name cannot be empty".to_string());
    }

    if host.len() > 253 {
        return Err(format!(
            "Domain name too long: {} chars (max 253). Got: {}",
            host.len(),
            host
        ));
    }

    for label in host.split('.') {
        if label.is_empty() {
            return Err(format!("Domain name has empty label: '{}'", host));
        }

        if label.len() > 63 {
            return Err(format!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            ));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(format!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric and hyphen only.",
                label
            ));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(format!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            ));
        }
    }

    Ok(())
}

/// Validate an account handle as accepted by account search
pub fn validate_account_handle(handle: &str) -> Result<(), String> {
    let trimmed = handle.strip_prefix('@').unwrap_or(handle);

    if trimmed.is_empty() {
        return Err("Account cannot be empty".to_string());
    }

    if trimmed.chars().any(char::is_whitespace) {
        return Err(format!("Account cannot contain whitespace. Got: '{}'", handle));
    }

    let mut parts = trimmed.split('@');
    let user = parts.next().unwrap_or_default();
    let domain = parts.next();

    if parts.next().is_some() {
        return Err(format!(
            "Account must be of the form user or user@domain. Got: '{}'",
            handle
        ));
    }

    if user.is_empty() {
        return Err(format!("Account is missing a user name. Got: '{}'", handle));
    }

    if let Some(domain) = domain {
        // local test servers are addressed with a port
        let host = domain.split_once(':').map_or(domain, |(host, _)| host);
        validate_hostname(host)?;
    }

    Ok(())
}
