//! Normalized error handling for the storefront client
//!
//! Every failure collapses into a single [`AppError`] shape:
//! - [`ErrorKind`] classifies the failure for retry decisions and display
//! - [`RawFailure`] is the tagged union of everything that can fail upstream
//! - [`normalize_error`] is the one translation boundary between the two
//!
//! Nothing above the request executor should ever see anything other than an
//! `AppError`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

/// Message used whenever a failure carries nothing displayable
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

/// Message used for failures where no response was received
pub const NETWORK_ERROR_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";

/// Code attached to failures where the request never got a response
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";

/// Code attached to failures where the transport ceiling elapsed
pub const TIMEOUT_CODE: &str = "TIMEOUT";

/// Code attached to schema validation failures
pub const VALIDATION_ERROR_CODE: &str = "VALIDATION_ERROR";

/// Longest plain-text response body that is shown to users verbatim
const MAX_TEXT_MESSAGE_LEN: usize = 200;

/// Failure classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Outbound or inbound payload failed schema validation
    Validation,
    /// Rejected by the server as the caller's fault (4xx)
    Client,
    /// Transient service failure (5xx)
    Server,
    /// No response received at all
    Network,
    /// Anything that matched none of the above
    Unknown,
}

impl ErrorKind {
    /// Classify an HTTP status code
    #[must_use]
    pub fn from_status(status: u16) -> Self {
        match status {
            400..=499 => Self::Client,
            500..=599 => Self::Server,
            _ => Self::Unknown,
        }
    }

    /// Human-readable category
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation => "Validation",
            Self::Client => "Client",
            Self::Server => "Server",
            Self::Network => "Network",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category())
    }
}

/// The single normalized error shape
///
/// Constructed at the point of failure and never mutated afterwards; the
/// `with_*` builders consume and return a new value.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppError {
    /// Classification
    pub kind: ErrorKind,
    /// Displayable message, never empty
    pub message: String,
    /// HTTP status, when a response was received
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Machine-readable code (`NETWORK_ERROR`, `VALIDATION_ERROR`, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Structured payload, e.g. per-field issues
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// When the failure was observed
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        match (self.status, &self.code) {
            (Some(status), _) => write!(f, " (HTTP {status})"),
            (None, Some(code)) => write!(f, " ({code})"),
            (None, None) => Ok(()),
        }
    }
}

impl AppError {
    /// Create a new error, substituting the generic message for an empty one
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: non_empty(message.into()),
            status: None,
            code: None,
            details: None,
            timestamp: Utc::now(),
        }
    }

    /// Error for an HTTP response with a failing status
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        let mut error = Self::new(ErrorKind::from_status(status), message);
        error.status = Some(status);
        error
    }

    /// Error for a request that never received a response
    pub fn network(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message).with_code(code)
    }

    /// Schema validation failure
    ///
    /// `details` carries the full issue list under `errors` and the first
    /// message per field under `fieldErrors`.
    pub fn validation(
        message: impl Into<String>,
        errors: Vec<String>,
        field_errors: Map<String, Value>,
    ) -> Self {
        let mut details = Map::new();
        details.insert(
            "errors".to_string(),
            Value::Array(errors.into_iter().map(Value::String).collect()),
        );
        details.insert("fieldErrors".to_string(), Value::Object(field_errors));

        Self::new(ErrorKind::Validation, message)
            .with_code(VALIDATION_ERROR_CODE)
            .with_details(Value::Object(details))
    }

    /// Unclassified failure
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Attach a machine-readable code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Attach structured details
    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach an HTTP status, reclassifying the error accordingly
    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self.kind = ErrorKind::from_status(status);
        self
    }

    /// 4xx response
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self.status, Some(status) if (400..500).contains(&status))
    }

    /// 5xx response
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self.status, Some(status) if status >= 500)
    }

    /// 401 response; callers drop cached identity state on this
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// Schema validation failure
    #[must_use]
    pub fn is_validation(&self) -> bool {
        self.kind == ErrorKind::Validation
    }

    /// No response was received
    #[must_use]
    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    /// Process exit code for command-line front ends
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self.kind {
            ErrorKind::Validation => exit_codes::VALIDATION_ERROR,
            ErrorKind::Network => exit_codes::NETWORK_ERROR,
            _ if self.is_unauthorized() => exit_codes::AUTH_REQUIRED,
            _ => exit_codes::FAILURE,
        }
    }
}

/// Exit codes for CLI commands
pub mod exit_codes {
    /// Command succeeded
    pub const SUCCESS: i32 = 0;
    /// Generic failure
    pub const FAILURE: i32 = 1;
    /// Input or response failed validation
    pub const VALIDATION_ERROR: i32 = 2;
    /// Not signed in, or the session was rejected
    pub const AUTH_REQUIRED: i32 = 3;
    /// No response from the API
    pub const NETWORK_ERROR: i32 = 4;
}

/// Anything that can fail before it has been normalized
#[derive(Debug)]
pub enum RawFailure {
    /// Already normalized; passed through untouched
    App(AppError),
    /// A native Rust error
    Native(Box<dyn std::error::Error + Send + Sync>),
    /// A bare message
    Text(String),
    /// Nothing at all was supplied
    Empty,
    /// An HTTP response with a failing status was received
    Response {
        /// HTTP status code
        status: u16,
        /// Parsed body (JSON, or a string for non-JSON bodies)
        body: Value,
    },
    /// The request was sent but no response arrived
    NoResponse {
        /// Transport-level code, defaults to `NETWORK_ERROR`
        code: Option<String>,
        /// Transport-level message
        message: Option<String>,
    },
    /// Arbitrary JSON that matched no known shape
    Unknown(Value),
}

impl From<AppError> for RawFailure {
    fn from(error: AppError) -> Self {
        Self::App(error)
    }
}

impl From<String> for RawFailure {
    fn from(message: String) -> Self {
        Self::Text(message)
    }
}

impl From<&str> for RawFailure {
    fn from(message: &str) -> Self {
        Self::Text(message.to_string())
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for RawFailure {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        Self::Native(error)
    }
}

impl From<std::io::Error> for RawFailure {
    fn from(error: std::io::Error) -> Self {
        Self::Native(Box::new(error))
    }
}

impl From<serde_json::Error> for RawFailure {
    fn from(error: serde_json::Error) -> Self {
        Self::Native(Box::new(error))
    }
}

impl From<Value> for RawFailure {
    /// Classify transport-shaped JSON:
    /// `{response: {status, data}}`, `{status, data}`, `{request, ...}`.
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::String(message) => Self::Text(message),
            Value::Object(object) => {
                if let Some(Value::Object(response)) = object.get("response") {
                    if let Some(status) = status_of(response) {
                        return Self::Response {
                            status,
                            body: body_of(response),
                        };
                    }
                }
                if let Some(status) = status_of(&object) {
                    return Self::Response {
                        status,
                        body: body_of(&object),
                    };
                }
                if object.contains_key("request") {
                    return Self::NoResponse {
                        code: string_field(&object, "code"),
                        message: string_field(&object, "message"),
                    };
                }
                Self::Unknown(Value::Object(object))
            }
            other => Self::Unknown(other),
        }
    }
}

/// Convert any failure into an [`AppError`]
///
/// Total: never panics and always yields a non-empty message.
pub fn normalize_error(raw: impl Into<RawFailure>) -> AppError {
    match raw.into() {
        RawFailure::App(mut error) => {
            if error.message.trim().is_empty() {
                error.message = GENERIC_ERROR_MESSAGE.to_string();
            }
            error
        }
        RawFailure::Native(error) => match error.downcast::<AppError>() {
            Ok(app) => normalize_error(*app),
            Err(other) => AppError::unknown(other.to_string()),
        },
        RawFailure::Text(message) => AppError::unknown(message),
        RawFailure::Empty => AppError::unknown(GENERIC_ERROR_MESSAGE),
        RawFailure::Response { status, body } => {
            let message = extract_message(&body).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.into());
            let code = extract_code(&body).unwrap_or_else(|| format!("HTTP_{status}"));
            let error = AppError::http(status, message).with_code(code);
            if body.is_null() {
                error
            } else {
                error.with_details(body)
            }
        }
        RawFailure::NoResponse { code, message } => AppError::network(
            code.unwrap_or_else(|| NETWORK_ERROR_CODE.to_string()),
            message.unwrap_or_else(|| NETWORK_ERROR_MESSAGE.to_string()),
        ),
        RawFailure::Unknown(value) => {
            let message = extract_message(&value).unwrap_or_else(|| GENERIC_ERROR_MESSAGE.into());
            let mut error = AppError::unknown(message);
            if let Some(code) = extract_code(&value) {
                error = error.with_code(code);
            }
            error.with_details(value)
        }
    }
}

/// Pull a displayable message out of a server body
fn extract_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || text.starts_with('<') || text.len() > MAX_TEXT_MESSAGE_LEN {
                None
            } else {
                Some(text.to_string())
            }
        }
        Value::Object(object) => ["message", "error_description", "msg"]
            .iter()
            .find_map(|key| string_field(object, key))
            .or_else(|| match object.get("error") {
                Some(Value::String(text)) if !text.trim().is_empty() => Some(text.clone()),
                Some(nested @ Value::Object(_)) => extract_message(nested),
                _ => None,
            }),
        _ => None,
    }
}

fn extract_code(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    match object.get("code") {
        Some(Value::String(code)) if !code.is_empty() => Some(code.clone()),
        Some(Value::Number(code)) => Some(code.to_string()),
        _ => object
            .get("error")
            .and_then(Value::as_object)
            .and_then(|nested| string_field(nested, "code")),
    }
}

fn status_of(object: &Map<String, Value>) -> Option<u16> {
    object
        .get("status")
        .and_then(Value::as_u64)
        .and_then(|status| u16::try_from(status).ok())
}

fn body_of(object: &Map<String, Value>) -> Value {
    object
        .get("data")
        .or_else(|| object.get("body"))
        .cloned()
        .unwrap_or_else(|| Value::Object(object.clone()))
}

fn string_field(object: &Map<String, Value>, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn non_empty(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_ERROR_MESSAGE.to_string()
    } else {
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_kind_from_status() {
        assert_eq!(ErrorKind::from_status(404), ErrorKind::Client);
        assert_eq!(ErrorKind::from_status(503), ErrorKind::Server);
        assert_eq!(ErrorKind::from_status(302), ErrorKind::Unknown);
    }

    #[test]
    fn test_normalize_totality() {
        let inputs: Vec<RawFailure> = vec![
            RawFailure::from(std::io::Error::other("x")),
            RawFailure::from("plain string"),
            RawFailure::Empty,
            RawFailure::from(Value::Null),
            RawFailure::from(json!({"status": 500, "data": {"message": "y"}})),
        ];

        for raw in inputs {
            let error = normalize_error(raw);
            assert!(!error.message.is_empty());
        }
    }

    #[test]
    fn test_normalize_native_error_keeps_message() {
        let error = normalize_error(std::io::Error::other("x"));
        assert_eq!(error.message, "x");
        assert_eq!(error.kind, ErrorKind::Unknown);
    }

    #[test]
    fn test_normalize_response_shape() {
        let error = normalize_error(json!({"status": 500, "data": {"message": "y"}}));
        assert_eq!(error.message, "y");
        assert_eq!(error.status, Some(500));
        assert_eq!(error.kind, ErrorKind::Server);
        assert_eq!(error.code.as_deref(), Some("HTTP_500"));
    }

    #[test]
    fn test_normalize_nested_response_shape() {
        let raw = json!({
            "response": {"status": 422, "data": {"error": {"message": "bad", "code": "E1"}}}
        });
        let error = normalize_error(raw);
        assert_eq!(error.status, Some(422));
        assert_eq!(error.message, "bad");
        assert_eq!(error.code.as_deref(), Some("E1"));
    }

    #[test]
    fn test_normalize_request_without_response() {
        let error = normalize_error(json!({"request": {}, "message": "socket hang up"}));
        assert_eq!(error.kind, ErrorKind::Network);
        assert_eq!(error.status, None);
        assert_eq!(error.code.as_deref(), Some(NETWORK_ERROR_CODE));
        assert_eq!(error.message, "socket hang up");
    }

    #[test]
    fn test_normalize_empty_uses_generic_message() {
        assert_eq!(normalize_error(RawFailure::Empty).message, GENERIC_ERROR_MESSAGE);
        assert_eq!(normalize_error("   ").message, GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_app_error_passes_through() {
        let original = AppError::http(409, "Conflict").with_code("DUPLICATE");
        let normalized = normalize_error(original.clone());
        assert_eq!(normalized, original);
    }

    #[test]
    fn test_boxed_app_error_is_unwrapped() {
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(AppError::http(404, "gone"));
        let error = normalize_error(boxed);
        assert_eq!(error.status, Some(404));
        assert_eq!(error.message, "gone");
    }

    #[test]
    fn test_html_body_is_not_shown() {
        let error = normalize_error(RawFailure::Response {
            status: 502,
            body: json!("<html>Bad Gateway</html>"),
        });
        assert_eq!(error.message, GENERIC_ERROR_MESSAGE);
    }

    #[test]
    fn test_supabase_auth_body() {
        let error = normalize_error(RawFailure::Response {
            status: 400,
            body: json!({"error": "invalid_grant", "error_description": "Invalid login credentials"}),
        });
        assert_eq!(error.message, "Invalid login credentials");
    }

    #[test]
    fn test_predicates() {
        let unauthorized = AppError::http(401, "Unauthorized");
        assert!(unauthorized.is_unauthorized());
        assert!(unauthorized.is_client_error());
        assert!(!unauthorized.is_server_error());
        assert_eq!(unauthorized.exit_code(), exit_codes::AUTH_REQUIRED);

        let network = AppError::network(NETWORK_ERROR_CODE, "offline");
        assert!(network.is_network());
        assert_eq!(network.exit_code(), exit_codes::NETWORK_ERROR);
    }

    #[test]
    fn test_display() {
        assert_eq!(AppError::http(404, "Not found").to_string(), "Not found (HTTP 404)");
        assert_eq!(
            AppError::network(TIMEOUT_CODE, "Timed out").to_string(),
            "Timed out (TIMEOUT)"
        );
    }

    #[test]
    fn test_serialization_is_camel_case() {
        let error = AppError::http(500, "boom");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json["kind"], "SERVER");
        assert_eq!(json["status"], 500);
        assert!(json.get("details").is_none());
    }

    proptest! {
        #[test]
        fn prop_normalize_never_returns_empty_message(text in ".*", status in 0u16..1000) {
            let from_text = normalize_error(text.clone());
            prop_assert!(!from_text.message.trim().is_empty());

            let from_response = normalize_error(json!({"status": status, "data": {"message": text}}));
            prop_assert!(!from_response.message.trim().is_empty());
        }
    }
}
