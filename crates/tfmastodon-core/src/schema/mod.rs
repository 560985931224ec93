//! Schema declarations for providers and resources
//!
//! A [`Schema`] lists the attributes of a provider block or resource type.
//! It is served to the host as-is and used to validate configuration before
//! any remote call is made.
//!
//! ## Usage
//!
//! ```rust
//! use tfmastodon_core::schema::{Attribute, Schema};
//!
//! let schema = Schema::v0()
//!     .with_description("manages domain blocks for your account.")
//!     .with_attribute("domain", Attribute::required_string().requires_replace())
//!     .with_attribute("id", Attribute::computed_string());
//!
//! let diags = schema.validate_config(&serde_json::json!({ "domain": "example.com" }));
//! assert!(!diags.has_error());
//! ```

pub mod validators;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::plan::is_unknown;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

pub use validators::{AccountHandle, AttributeValidator, Hostname};

/// Value type of an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Bool,
}

impl AttributeType {
    /// Check whether a known, non-null JSON value has this type
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            AttributeType::String => value.is_string(),
            AttributeType::Bool => value.is_boolean(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
        }
    }
}

/// A single schema attribute
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attribute_type: AttributeType,

    /// Markdown description used by documentation and language servers
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,

    /// Changing this attribute destroys and recreates the resource
    pub requires_replace: bool,

    #[serde(skip)]
    validators: Vec<Arc<dyn AttributeValidator>>,
}

impl Attribute {
    fn new(attribute_type: AttributeType) -> Self {
        Self {
            attribute_type,
            description: String::new(),
            required: false,
            optional: false,
            computed: false,
            sensitive: false,
            requires_replace: false,
            validators: Vec::new(),
        }
    }

    pub fn required_string() -> Self {
        Self {
            required: true,
            ..Self::new(AttributeType::String)
        }
    }

    pub fn optional_bool() -> Self {
        Self {
            optional: true,
            ..Self::new(AttributeType::Bool)
        }
    }

    pub fn computed_string() -> Self {
        Self {
            computed: true,
            ..Self::new(AttributeType::String)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    pub fn with_validator(mut self, validator: impl AttributeValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Computed-only attributes cannot be set in configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    /// Validate a single configured value, skipping null and unknown values
    fn validate(&self, name: &str, value: &Value, diags: &mut Diagnostics) {
        if value.is_null() {
            if self.required {
                diags.push(
                    Diagnostic::error(
                        "Missing required argument",
                        format!("The argument \"{}\" is required, but no definition was found.", name),
                    )
                    .with_attribute(name),
                );
            }
            return;
        }

        if is_unknown(value) {
            return;
        }

        if self.is_read_only() {
            diags.push(
                Diagnostic::error(
                    "Invalid Configuration for Read-Only Attribute",
                    format!("Cannot set value for this attribute as the provider has marked it as read-only. Remove the configuration line setting the value: \"{}\"", name),
                )
                .with_attribute(name),
            );
            return;
        }

        if !self.attribute_type.matches(value) {
            diags.push(
                Diagnostic::error(
                    "Incorrect attribute value type",
                    format!("Inappropriate value for attribute \"{}\": {} required.", name, self.attribute_type.name()),
                )
                .with_attribute(name),
            );
            return;
        }

        for validator in &self.validators {
            if let Err(detail) = validator.validate(value) {
                diags.push(
                    Diagnostic::error("Invalid Attribute Value", detail).with_attribute(name),
                );
            }
        }
    }
}

/// Schema of a provider block or resource type
#[derive(Debug, Clone, Serialize)]
pub struct Schema {
    pub version: i64,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    /// Create an empty schema at version 0
    pub fn v0() -> Self {
        Self {
            version: 0,
            description: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Names of all computed attributes
    pub fn computed_attributes(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .iter()
            .filter(|(_, attr)| attr.computed)
            .map(|(name, _)| name.as_str())
    }

    /// Validate a configuration object against this schema
    ///
    /// Reports unsupported arguments, missing required arguments, values set
    /// on read-only attributes, type mismatches and validator failures.
    /// Unknown values are accepted as-is.
    pub fn validate_config(&self, config: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let empty = serde_json::Map::new();
        let object = match config {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => {
                diags.add_error(
                    "Invalid Configuration",
                    "The configuration must be an object of attribute values.",
                );
                return diags;
            }
        };

        for name in object.keys() {
            if !self.attributes.contains_key(name) {
                diags.push(
                    Diagnostic::error(
                        "Unsupported argument",
                        format!("An argument named \"{}\" is not expected here.", name),
                    )
                    .with_attribute(name.as_str()),
                );
            }
        }

        for (name, attribute) in &self.attributes {
            let value = object.get(name).unwrap_or(&Value::Null);
            attribute.validate(name, value, &mut diags);
        }

        diags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::UNKNOWN_VALUE;
    use serde_json::json;

    fn domain_block_schema() -> Schema {
        Schema::v0()
            .with_attribute(
                "domain",
                Attribute::required_string()
                    .requires_replace()
                    .with_validator(Hostname),
            )
            .with_attribute("id", Attribute::computed_string())
    }

    #[test]
    fn accepts_valid_config() {
        let diags = domain_block_schema().validate_config(&json!({ "domain": "example.com" }));
        assert!(diags.is_empty(), "{:?}", diags);
    }

    #[test]
    fn reports_missing_required_argument() {
        let diags = domain_block_schema().validate_config(&json!({}));
        assert!(diags.has_error());

        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.summary, "Missing required argument");
        assert_eq!(diag.attribute.as_deref(), Some("domain"));
    }

    #[test]
    fn reports_unsupported_and_read_only_arguments() {
        let diags = domain_block_schema().validate_config(&json!({
            "domain": "example.com",
            "id": "example.com",
            "color": "blue",
        }));

        let summaries: Vec<_> = diags.iter().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"Unsupported argument"));
        assert!(summaries.contains(&"Invalid Configuration for Read-Only Attribute"));
        assert_eq!(diags.len(), 2);
    }

    #[test]
    fn reports_type_mismatch() {
        let schema = Schema::v0().with_attribute("allow_insecure", Attribute::optional_bool());
        let diags = schema.validate_config(&json!({ "allow_insecure": "yes" }));

        assert_eq!(diags.len(), 1);
        assert_eq!(diags.iter().next().unwrap().summary, "Incorrect attribute value type");
    }

    #[test]
    fn runs_validators_on_known_values_only() {
        let schema = domain_block_schema();

        let invalid = schema.validate_config(&json!({ "domain": "not a domain" }));
        assert!(invalid.has_error());
        assert_eq!(invalid.iter().next().unwrap().summary, "Invalid Attribute Value");

        let unknown = schema.validate_config(&json!({ "domain": UNKNOWN_VALUE }));
        assert!(unknown.is_empty());
    }

    #[test]
    fn rejects_non_object_config() {
        let diags = domain_block_schema().validate_config(&json!(["example.com"]));
        assert!(diags.has_error());
    }

    #[test]
    fn serializes_without_validators() {
        let json = serde_json::to_value(domain_block_schema()).unwrap();

        assert_eq!(json["version"], 0);
        assert_eq!(json["attributes"]["domain"]["type"], "string");
        assert_eq!(json["attributes"]["domain"]["requires_replace"], true);
        assert_eq!(json["attributes"]["id"]["computed"], true);
        assert!(json["attributes"]["domain"].get("validators").is_none());
    }
}
