//! Declarative schema validation for JSON payloads
//!
//! Schemas describe JSON object shapes. Validation is deterministic and
//! side-effect free: it never mutates its input, it reports one issue per
//! violated constraint, and on success it returns the payload narrowed to the
//! declared shape with coercions and defaults applied.
//!
//! # Example
//!
//! ```rust
//! use storefront_core::validation::{validate, Field, Schema, ValidationContext};
//! use serde_json::json;
//!
//! let schema = Schema::object(
//!     "cart_item",
//!     [
//!         Field::integer("id"),
//!         Field::integer("quantity").default_value(json!(1)).min(1.0),
//!         Field::number("unit_price").default_value(json!(0)).min(0.0),
//!     ],
//! );
//!
//! let result = validate(&schema, &json!({"id": 1}), &ValidationContext::default());
//! assert!(result.is_valid);
//! assert_eq!(result.data.unwrap()["quantity"], 1);
//! ```

use crate::error::AppError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;
use tracing::debug;

/// Path reported for issues on the payload itself
const ROOT_FIELD: &str = "payload";

static EMAIL_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// A single violated constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Dotted path of the offending field (`variants.price`, `items[0].quantity`)
    pub field: String,
    /// Human-readable message
    pub message: String,
    /// Machine-readable code
    pub code: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Outcome of validating a payload
///
/// `data` is populated only when `is_valid` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResult<T> {
    /// Whether every constraint held
    pub is_valid: bool,
    /// Narrowed payload
    pub data: Option<T>,
    /// One entry per violated constraint
    pub errors: Vec<ValidationIssue>,
}

impl<T> ValidationResult<T> {
    fn valid(data: T) -> Self {
        Self {
            is_valid: true,
            data: Some(data),
            errors: Vec::new(),
        }
    }

    fn invalid(errors: Vec<ValidationIssue>) -> Self {
        Self {
            is_valid: false,
            data: None,
            errors,
        }
    }

    /// Issues rendered as `"field: message"`
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    /// First message per field
    #[must_use]
    pub fn field_errors(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        for issue in &self.errors {
            fields
                .entry(issue.field.clone())
                .or_insert_with(|| Value::String(issue.message.clone()));
        }
        fields
    }

    /// Convert into a `Result`, turning failures into a validation [`AppError`]
    pub fn into_result(self) -> Result<T, AppError> {
        match self.data {
            Some(data) if self.is_valid => Ok(data),
            _ => {
                let messages = self.messages();
                let message = format!("Validation failed: {}", messages.join("; "));
                Err(AppError::validation(message, messages, self.field_errors()))
            }
        }
    }
}

/// Diagnostic metadata for a validation run
///
/// Only used for logging; never affects the result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// HTTP method of the call being validated
    pub method: String,
    /// Endpoint of the call being validated
    pub endpoint: String,
}

impl ValidationContext {
    /// Create a context for a call
    pub fn new(method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
        }
    }
}

/// Constraint applied after type checking
#[derive(Debug, Clone)]
pub enum Rule {
    /// Number must be ≥ the bound
    Min(f64),
    /// Number must be ≤ the bound
    Max(f64),
    /// String (chars) or array (items) must be at least this long
    MinLength(usize),
    /// String (chars) or array (items) must be at most this long
    MaxLength(usize),
    /// String must look like an email address
    Email,
    /// String must match a regular expression
    Pattern {
        /// Compiled pattern; `None` when the pattern failed to compile
        regex: Option<Regex>,
        /// What the pattern means, for messages
        description: String,
    },
    /// String must be one of the listed values
    OneOf(Vec<String>),
}

/// Declared type of a value
#[derive(Debug, Clone)]
pub enum FieldType {
    /// JSON string
    String,
    /// Any JSON number; numeric strings are coerced
    Number,
    /// Whole number; numeric strings and integral floats are coerced
    Integer,
    /// JSON boolean; `"true"` / `"false"` are coerced
    Boolean,
    /// Nested object
    Object(ObjectShape),
    /// Array of a single item type
    Array(Box<FieldType>),
    /// Anything, passed through unchanged
    Any,
}

impl FieldType {
    /// Nested object type, for array items
    pub fn object(fields: impl IntoIterator<Item = Field>) -> Self {
        Self::Object(ObjectShape::new(fields))
    }

    fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object(_) => "object",
            Self::Array(_) => "array",
            Self::Any => "any",
        }
    }
}

/// Fields of an object type
#[derive(Debug, Clone, Default)]
pub struct ObjectShape {
    fields: Vec<Field>,
    strict: bool,
}

impl ObjectShape {
    /// Create a shape that passes unknown keys through
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            fields: fields.into_iter().collect(),
            strict: false,
        }
    }

    /// Reject keys that are not declared
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// A named field within an object shape
///
/// Fields are required unless marked optional or given a default.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
    required: bool,
    nullable: bool,
    default: Option<Value>,
    rules: Vec<Rule>,
}

impl Field {
    fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            nullable: false,
            default: None,
            rules: Vec::new(),
        }
    }

    /// Required string field
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    /// Required number field; numeric strings are coerced
    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    /// Required integer field; integral floats and numeric strings are coerced
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// Required boolean field; `"true"`/`"false"` are coerced
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    /// Required field of any type
    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Any)
    }

    /// Required nested object
    pub fn object(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self::new(name, FieldType::object(fields))
    }

    /// Required array of `item`
    pub fn array(name: impl Into<String>, item: FieldType) -> Self {
        Self::new(name, FieldType::Array(Box::new(item)))
    }

    /// Absent or null values are accepted and omitted
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Explicit nulls are kept as null
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Fill absent or null values with `value`
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Numbers must be at least `bound`
    #[must_use]
    pub fn min(mut self, bound: f64) -> Self {
        self.rules.push(Rule::Min(bound));
        self
    }

    /// Numbers must be at most `bound`
    #[must_use]
    pub fn max(mut self, bound: f64) -> Self {
        self.rules.push(Rule::Max(bound));
        self
    }

    /// Strings need at least `len` characters
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.rules.push(Rule::MinLength(len));
        self
    }

    /// Strings may have at most `len` characters
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.rules.push(Rule::MaxLength(len));
        self
    }

    /// Strings must look like an email address
    #[must_use]
    pub fn email(mut self) -> Self {
        self.rules.push(Rule::Email);
        self
    }

    /// Require a regex match; an invalid pattern reports an issue at validation time
    #[must_use]
    pub fn pattern(mut self, pattern: &str, description: impl Into<String>) -> Self {
        self.rules.push(Rule::Pattern {
            regex: Regex::new(pattern).ok(),
            description: description.into(),
        });
        self
    }

    /// Strings must be one of `allowed`
    #[must_use]
    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        self.rules
            .push(Rule::OneOf(allowed.iter().map(|s| (*s).to_string()).collect()));
        self
    }
}

/// A named payload shape
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    root: FieldType,
}

impl Schema {
    /// Object payload
    pub fn object(name: impl Into<String>, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            name: name.into(),
            root: FieldType::object(fields),
        }
    }

    /// Array payload
    pub fn array(name: impl Into<String>, item: FieldType) -> Self {
        Self {
            name: name.into(),
            root: FieldType::Array(Box::new(item)),
        }
    }

    /// Reject undeclared keys on the root object
    #[must_use]
    pub fn strict(mut self) -> Self {
        if let FieldType::Object(shape) = self.root {
            self.root = FieldType::Object(shape.strict());
        }
        self
    }

    /// Schema name, for diagnostics
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Validate `payload` against `schema`
pub fn validate(schema: &Schema, payload: &Value, context: &ValidationContext) -> ValidationResult<Value> {
    let mut issues = Vec::new();
    let data = check_value(&schema.root, &[], payload, "", &mut issues);

    match data {
        Some(data) if issues.is_empty() => ValidationResult::valid(data),
        _ => {
            debug!(
                schema = %schema.name,
                method = %context.method,
                endpoint = %context.endpoint,
                issues = issues.len(),
                "Payload failed validation"
            );
            ValidationResult::invalid(issues)
        }
    }
}

/// Validate and deserialize into `T`
pub fn validate_into<T: DeserializeOwned>(
    schema: &Schema,
    payload: &Value,
    context: &ValidationContext,
) -> ValidationResult<T> {
    let result = validate(schema, payload, context);
    match result.data {
        Some(data) if result.is_valid => match serde_json::from_value(data) {
            Ok(typed) => ValidationResult::valid(typed),
            Err(e) => ValidationResult::invalid(vec![issue(
                "",
                format!("cannot be decoded: {e}"),
                "DECODE",
            )]),
        },
        _ => ValidationResult::invalid(result.errors),
    }
}

fn check_value(
    ty: &FieldType,
    rules: &[Rule],
    value: &Value,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Option<Value> {
    let coerced = match ty {
        FieldType::String => value.is_string().then(|| value.clone()),
        FieldType::Number => coerce_number(value),
        FieldType::Integer => coerce_integer(value),
        FieldType::Boolean => coerce_boolean(value),
        FieldType::Any => Some(value.clone()),
        FieldType::Object(shape) => {
            return match value.as_object() {
                Some(object) => {
                    let checked = check_object(shape, object, path, issues);
                    check_rules(rules, &checked, path, issues);
                    Some(checked)
                }
                None => {
                    issues.push(type_issue(path, ty, value));
                    None
                }
            };
        }
        FieldType::Array(item) => {
            return match value.as_array() {
                Some(items) => {
                    let checked: Vec<Value> = items
                        .iter()
                        .enumerate()
                        .filter_map(|(i, v)| check_value(item, &[], v, &format!("{path}[{i}]"), issues))
                        .collect();
                    let checked = Value::Array(checked);
                    check_rules(rules, &checked, path, issues);
                    Some(checked)
                }
                None => {
                    issues.push(type_issue(path, ty, value));
                    None
                }
            };
        }
    };

    match coerced {
        Some(coerced) => {
            check_rules(rules, &coerced, path, issues);
            Some(coerced)
        }
        None => {
            issues.push(type_issue(path, ty, value));
            None
        }
    }
}

fn check_object(
    shape: &ObjectShape,
    object: &Map<String, Value>,
    path: &str,
    issues: &mut Vec<ValidationIssue>,
) -> Value {
    let mut out = Map::new();

    for field in &shape.fields {
        let field_path = join(path, &field.name);
        match object.get(&field.name) {
            Some(Value::Null) if field.nullable => {
                out.insert(field.name.clone(), Value::Null);
            }
            None | Some(Value::Null) => {
                if let Some(default) = &field.default {
                    out.insert(field.name.clone(), default.clone());
                } else if field.required {
                    issues.push(issue(&field_path, "is required", "REQUIRED"));
                }
            }
            Some(value) => {
                if let Some(checked) = check_value(&field.ty, &field.rules, value, &field_path, issues) {
                    out.insert(field.name.clone(), checked);
                }
            }
        }
    }

    for (key, value) in object {
        if shape.fields.iter().any(|f| &f.name == key) {
            continue;
        }
        if shape.strict {
            issues.push(issue(&join(path, key), "is not allowed", "UNKNOWN_FIELD"));
        } else {
            out.insert(key.clone(), value.clone());
        }
    }

    Value::Object(out)
}

fn check_rules(rules: &[Rule], value: &Value, path: &str, issues: &mut Vec<ValidationIssue>) {
    for rule in rules {
        match rule {
            Rule::Min(bound) => {
                if value.as_f64().is_some_and(|n| n < *bound) {
                    issues.push(issue(path, format!("must be ≥ {}", format_bound(*bound)), "MIN"));
                }
            }
            Rule::Max(bound) => {
                if value.as_f64().is_some_and(|n| n > *bound) {
                    issues.push(issue(path, format!("must be ≤ {}", format_bound(*bound)), "MAX"));
                }
            }
            Rule::MinLength(min) => match value {
                Value::String(s) if s.chars().count() < *min => {
                    issues.push(issue(path, format!("must be at least {min} characters"), "MIN_LENGTH"));
                }
                Value::Array(items) if items.len() < *min => {
                    issues.push(issue(path, format!("must contain at least {min} items"), "MIN_LENGTH"));
                }
                _ => {}
            },
            Rule::MaxLength(max) => match value {
                Value::String(s) if s.chars().count() > *max => {
                    issues.push(issue(path, format!("must be at most {max} characters"), "MAX_LENGTH"));
                }
                Value::Array(items) if items.len() > *max => {
                    issues.push(issue(path, format!("must contain at most {max} items"), "MAX_LENGTH"));
                }
                _ => {}
            },
            Rule::Email => {
                if let Some(text) = value.as_str() {
                    let matches = EMAIL_PATTERN.as_ref().is_some_and(|re| re.is_match(text));
                    if !matches {
                        issues.push(issue(path, "invalid format", "EMAIL"));
                    }
                }
            }
            Rule::Pattern { regex, description } => {
                if let Some(text) = value.as_str() {
                    match regex {
                        Some(re) if re.is_match(text) => {}
                        Some(_) => issues.push(issue(path, format!("must match {description}"), "PATTERN")),
                        None => issues.push(issue(path, "invalid validation pattern", "INTERNAL")),
                    }
                }
            }
            Rule::OneOf(allowed) => {
                if let Some(text) = value.as_str() {
                    if !allowed.iter().any(|a| a == text) {
                        issues.push(issue(
                            path,
                            format!("must be one of: {}", allowed.join(", ")),
                            "ONE_OF",
                        ));
                    }
                }
            }
        }
    }
}

fn coerce_number(value: &Value) -> Option<Value> {
    match value {
        Value::Number(_) => Some(value.clone()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
        Value::Number(n) => n.as_f64().and_then(integral).map(Value::from),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .map(Value::from)
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn integral(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15).then(|| n as i64)
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(_) => Some(value.clone()),
        Value::String(s) => match s.trim() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn format_bound(bound: f64) -> String {
    integral(bound).map_or_else(|| bound.to_string(), |n| n.to_string())
}

fn type_issue(path: &str, ty: &FieldType, value: &Value) -> ValidationIssue {
    let actual = match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    };
    issue(path, format!("expected {}, got {actual}", ty.name()), "TYPE")
}

fn issue(path: &str, message: impl Into<String>, code: &str) -> ValidationIssue {
    ValidationIssue {
        field: if path.is_empty() { ROOT_FIELD.to_string() } else { path.to_string() },
        message: message.into(),
        code: code.to_string(),
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::forms::organize_form_errors;
    use proptest::prelude::*;
    use serde_json::json;

    fn cart_item_schema() -> Schema {
        Schema::object(
            "cart_item",
            [
                Field::integer("id"),
                Field::integer("quantity").default_value(json!(1)).min(1.0),
                Field::number("unit_price").default_value(json!(0)).min(0.0),
                Field::object(
                    "variants",
                    [Field::string("name"), Field::number("price").min(0.0)],
                )
                .optional(),
            ],
        )
    }

    fn signup_schema() -> Schema {
        Schema::object(
            "signup",
            [
                Field::string("email").email(),
                Field::string("password").min_length(8),
                Field::string("name").min_length(1),
            ],
        )
    }

    fn ctx() -> ValidationContext {
        ValidationContext::new("POST", "/test")
    }

    #[test]
    fn test_defaults_are_populated() {
        let payload = json!({"id": 1, "variants": {"name": "Red", "price": 10}});
        let result = validate(&cart_item_schema(), &payload, &ctx());

        assert!(result.is_valid);
        let data = result.data.unwrap();
        assert_eq!(data["id"], 1);
        assert_eq!(data["quantity"], 1);
        assert_eq!(data["unit_price"], 0);
        assert_eq!(data["variants"]["name"], "Red");
    }

    #[test]
    fn test_revalidation_is_stable() {
        let payload = json!({"id": "7", "quantity": "3", "unit_price": "12.5"});
        let first = validate(&cart_item_schema(), &payload, &ctx());
        let second = validate(&cart_item_schema(), &payload, &ctx());

        assert_eq!(first.data, second.data);
        let again = validate(&cart_item_schema(), first.data.as_ref().unwrap(), &ctx());
        assert_eq!(again.data, first.data);
    }

    #[test]
    fn test_string_coercion() {
        let payload = json!({"id": "7", "quantity": "3", "unit_price": "12.5"});
        let data = validate(&cart_item_schema(), &payload, &ctx()).data.unwrap();

        assert_eq!(data["id"], 7);
        assert_eq!(data["quantity"], 3);
        assert_eq!(data["unit_price"], 12.5);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let payload = json!({"id": "7"});
        let before = payload.clone();
        let _ = validate(&cart_item_schema(), &payload, &ctx());
        assert_eq!(payload, before);
    }

    #[test]
    fn test_one_error_per_missing_field() {
        let result = validate(&signup_schema(), &json!({}), &ctx());

        assert!(!result.is_valid);
        assert!(result.data.is_none());
        assert_eq!(
            result.messages(),
            vec!["email: is required", "password: is required", "name: is required"]
        );
    }

    #[test]
    fn test_rule_messages() {
        let result = validate(
            &cart_item_schema(),
            &json!({"id": 1, "unit_price": -5, "variants": {"name": "x", "price": -1}}),
            &ctx(),
        );
        assert_eq!(
            result.messages(),
            vec!["unit_price: must be ≥ 0", "variants.price: must be ≥ 0"]
        );

        let result = validate(
            &signup_schema(),
            &json!({"email": "nope", "password": "short", "name": "A"}),
            &ctx(),
        );
        assert_eq!(
            result.messages(),
            vec!["email: invalid format", "password: must be at least 8 characters"]
        );
    }

    #[test]
    fn test_type_mismatch() {
        let result = validate(&cart_item_schema(), &json!({"id": true}), &ctx());
        assert_eq!(result.errors[0].field, "id");
        assert_eq!(result.errors[0].code, "TYPE");

        let result = validate(&cart_item_schema(), &json!([1, 2]), &ctx());
        assert_eq!(result.errors[0].field, "payload");
    }

    #[test]
    fn test_array_paths() {
        let schema = Schema::object(
            "cart",
            [Field::array("items", FieldType::object([Field::integer("quantity").min(1.0)]))],
        );
        let result = validate(&schema, &json!({"items": [{"quantity": 2}, {"quantity": 0}]}), &ctx());

        assert_eq!(result.messages(), vec!["items[1].quantity: must be ≥ 1"]);
    }

    #[test]
    fn test_strict_rejects_unknown_keys() {
        let schema = Schema::object("login", [Field::string("email")]).strict();
        let result = validate(&schema, &json!({"email": "a@b.co", "admin": true}), &ctx());
        assert_eq!(result.messages(), vec!["admin: is not allowed"]);

        let lenient = Schema::object("login", [Field::string("email")]);
        let data = validate(&lenient, &json!({"email": "a@b.co", "admin": true}), &ctx())
            .data
            .unwrap();
        assert_eq!(data["admin"], true);
    }

    #[test]
    fn test_nullable_and_optional() {
        let schema = Schema::object(
            "product",
            [
                Field::string("description").nullable().optional(),
                Field::string("slug").optional(),
            ],
        );
        let data = validate(&schema, &json!({"description": null, "slug": null}), &ctx())
            .data
            .unwrap();
        assert_eq!(data["description"], Value::Null);
        assert!(data.get("slug").is_none());
    }

    #[test]
    fn test_pattern_and_one_of() {
        let schema = Schema::object(
            "filters",
            [
                Field::string("sort").one_of(&["price", "name"]),
                Field::string("sku").pattern(r"^[A-Z]{3}-\d+$", "SKU format"),
                Field::string("bad").pattern(r"(", "broken").optional(),
            ],
        );
        let result = validate(&schema, &json!({"sort": "date", "sku": "abc", "bad": "x"}), &ctx());
        assert_eq!(
            result.messages(),
            vec![
                "sort: must be one of: price, name",
                "sku: must match SKU format",
                "bad: invalid validation pattern"
            ]
        );
    }

    #[test]
    fn test_validate_into_typed() {
        #[derive(Debug, Deserialize)]
        struct Item {
            id: i64,
            quantity: u32,
            unit_price: f64,
        }

        let item: Item = validate_into(&cart_item_schema(), &json!({"id": 3}), &ctx())
            .into_result()
            .unwrap();
        assert_eq!(item.id, 3);
        assert_eq!(item.quantity, 1);
        assert!(item.unit_price.abs() < f64::EPSILON);
    }

    #[test]
    fn test_into_result_builds_validation_error() {
        let error = validate(&signup_schema(), &json!({"email": "x"}), &ctx())
            .into_result()
            .unwrap_err();

        assert_eq!(error.kind, ErrorKind::Validation);
        let split = organize_form_errors(&error);
        assert_eq!(split.field("email"), Some("invalid format"));
        assert_eq!(split.field("password"), Some("is required"));
    }

    proptest! {
        #[test]
        fn prop_valid_items_validate_identically(id in 1i64..10_000, qty in 1i64..100, price in 0.0f64..1_000.0) {
            let payload = json!({"id": id, "quantity": qty, "unit_price": price});
            let first = validate(&cart_item_schema(), &payload, &ctx());
            let second = validate(&cart_item_schema(), &payload, &ctx());
            prop_assert!(first.is_valid);
            prop_assert_eq!(first.data, second.data);
        }
    }
}
