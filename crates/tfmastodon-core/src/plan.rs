//! Planning of resource changes
//!
//! Given the prior state and the proposed new state of a resource, work out
//! the planned state the host should show and apply:
//!
//! - **Create** (no prior state): computed attributes without a value become unknown
//! - **Destroy** (no proposed state): planned state is null
//! - **Update**: configurable attributes that differ from prior state are
//!   compared against the schema; if any of them requires replacement the
//!   change is reported in `requires_replace` and read-only computed
//!   attributes become unknown, otherwise computed values carry over from
//!   prior state

use crate::error::{Error, Result};
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder for a value that is only known after apply
pub const UNKNOWN_VALUE: &str = "74D93920-ED26-11E3-AC10-0800200C9A66";

/// Check whether a value is the unknown placeholder
pub fn is_unknown(value: &Value) -> bool {
    value.as_str() == Some(UNKNOWN_VALUE)
}

/// Check whether a value or any nested value is unknown
pub fn contains_unknown(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.values().any(contains_unknown),
        Value::Array(items) => items.iter().any(contains_unknown),
        other => is_unknown(other),
    }
}

/// Result of planning a resource change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedChange {
    /// Planned state, `None` when the resource is being destroyed
    pub planned_state: Option<Value>,

    /// Attributes whose change forces the resource to be replaced
    #[serde(default)]
    pub requires_replace: Vec<String>,
}

impl PlannedChange {
    pub fn is_replacement(&self) -> bool {
        !self.requires_replace.is_empty()
    }
}

/// Plan a change from `prior` to `proposed`
pub fn plan_resource_change(
    schema: &Schema,
    prior: Option<&Value>,
    proposed: Option<&Value>,
) -> Result<PlannedChange> {
    let Some(proposed) = proposed else {
        return Ok(PlannedChange {
            planned_state: None,
            requires_replace: Vec::new(),
        });
    };

    let mut planned = as_object(proposed, "proposed new state")?.clone();

    let Some(prior) = prior else {
        for name in schema.computed_attributes() {
            if planned.get(name).is_none_or(Value::is_null) {
                planned.insert(name.to_string(), Value::String(UNKNOWN_VALUE.to_string()));
            }
        }

        return Ok(PlannedChange {
            planned_state: Some(Value::Object(planned)),
            requires_replace: Vec::new(),
        });
    };

    let prior = as_object(prior, "prior state")?;

    let requires_replace: Vec<String> = schema
        .attributes
        .iter()
        .filter(|(_, attr)| attr.requires_replace && !attr.is_read_only())
        .filter(|(name, _)| field(&planned, name) != field(prior, name))
        .map(|(name, _)| name.clone())
        .collect();

    for (name, attr) in schema.attributes.iter().filter(|(_, attr)| attr.computed) {
        let current = field(&planned, name);

        if !requires_replace.is_empty() {
            if attr.is_read_only() || current.is_null() {
                planned.insert(name.clone(), Value::String(UNKNOWN_VALUE.to_string()));
            }
        } else if current.is_null() || is_unknown(current) {
            planned.insert(name.clone(), field(prior, name).clone());
        }
    }

    Ok(PlannedChange {
        planned_state: Some(Value::Object(planned)),
        requires_replace,
    })
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::protocol(format!("{} must be an object", what)))
}

fn field<'a>(object: &'a Map<String, Value>, name: &str) -> &'a Value {
    object.get(name).unwrap_or(&Value::Null)
}
