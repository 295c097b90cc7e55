//! Mapping normalized errors onto form fields
//!
//! Forms show per-field messages next to their inputs and one server-level
//! message in a banner. [`organize_form_errors`] splits an [`AppError`] into
//! those two parts.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keys under `details` that may carry a field-keyed error map
const FIELD_ERROR_KEYS: [&str; 2] = ["fieldErrors", "field_errors"];

/// Field-keyed messages plus a single server-level message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormErrorSplit {
    /// Message for the form-level banner
    pub server_error: Option<String>,
    /// One message per field
    pub field_errors: BTreeMap<String, String>,
}

impl FormErrorSplit {
    /// Message for a specific field
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.field_errors.get(name).map(String::as_str)
    }

    /// Whether there is nothing to show
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.server_error.is_none() && self.field_errors.is_empty()
    }
}

/// Split an error into field errors and a server-level message
///
/// Entries of `details.fieldErrors` become field errors; the top-level message
/// becomes the server error. Without a field map everything collapses into the
/// server error. Pure function of its input.
#[must_use]
pub fn organize_form_errors(error: &AppError) -> FormErrorSplit {
    let field_errors = error
        .details
        .as_ref()
        .and_then(Value::as_object)
        .and_then(field_map)
        .map(collect_field_messages)
        .unwrap_or_default();

    let server_error = Some(error.message.trim())
        .filter(|message| !message.is_empty())
        .map(String::from);

    FormErrorSplit {
        server_error,
        field_errors,
    }
}

fn field_map(details: &Map<String, Value>) -> Option<&Map<String, Value>> {
    FIELD_ERROR_KEYS
        .iter()
        .find_map(|key| details.get(*key).and_then(Value::as_object))
}

fn collect_field_messages(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(field, value)| first_message(value).map(|message| (field.clone(), message)))
        .collect()
}

/// A field entry may be a message or a list of messages
fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        Value::Object(object) => object.get("message").and_then(first_message),
        _ => None,
    }
}
