//! Parameter specifications and the resolved input handed to a use case.
//!
//! A [`ParameterSpec`] says *where* a value lives in an inbound request
//! ([`ParamSource`]) and *what shape* the use case expects it in
//! ([`ParamType`]).  The resolver walks a trigger's specs and produces one
//! [`ResolvedInput`] per invocation.
//!
//! # Example metadata (TOML)
//!
//! ```toml
//! [[params]]
//! field = "request_id"
//! source = "header"
//! key = "X-Request-Id"
//! type = "string"
//! required = false
//! default = "none"
//! ```

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ── Source and type enums ─────────────────────────────────────────────────────

/// Location in an inbound request or event where a raw value is looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamSource {
    /// A `{placeholder}` segment of the HTTP route.
    Path,
    /// A query-string parameter.
    Query,
    /// An HTTP header (looked up case-insensitively).
    Header,
    /// A field of the JSON request body.
    Body,
    /// A field of a WebSocket event payload.
    SocketPayload,
}

impl ParamSource {
    /// Returns `true` for sources that only ever carry text and therefore
    /// need parsing into the declared type.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Path | Self::Query | Self::Header)
    }

    /// Returns `true` if the source can appear on an HTTP trigger.
    pub fn available_over_http(self) -> bool {
        !matches!(self, Self::SocketPayload)
    }

    /// Returns `true` if the source can appear on a WebSocket trigger.
    pub fn available_over_socket(self) -> bool {
        matches!(self, Self::SocketPayload)
    }

    /// Stable lower-case name used in metadata files and error details.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Header => "header",
            Self::Body => "body",
            Self::SocketPayload => "socket_payload",
        }
    }
}

impl fmt::Display for ParamSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Semantic type a use case expects for one input field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamType {
    #[default]
    String,
    Integer,
    Float,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    /// Returns `true` if an already-structured JSON value has this type.
    ///
    /// Used to check declared defaults at startup.  Integers are accepted
    /// where a float is expected; the reverse is not.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── ParameterSpec ─────────────────────────────────────────────────────────────

/// Describes one expected input field of a use case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Name of the field in the [`ResolvedInput`].
    pub field: String,

    /// Where the raw value is looked up.
    pub source: ParamSource,

    /// Lookup key at the source when it differs from `field`.
    ///
    /// For `body` and `socket_payload` sources this may be a dotted path
    /// (`customer.address.city`) into nested objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Declared type the raw value is coerced into.
    #[serde(rename = "type", default)]
    pub ty: ParamType,

    /// Whether a value must be present (or defaulted) for the use case to run.
    #[serde(default)]
    pub required: bool,

    /// Value used when the source does not carry the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParameterSpec {
    /// Creates an optional spec with no default and no key override.
    pub fn new(field: impl Into<String>, source: ParamSource, ty: ParamType) -> Self {
        Self {
            field: field.into(),
            source,
            key: None,
            ty,
            required: false,
            default: None,
        }
    }

    /// Marks the field as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the value used when the field is absent from the request.
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Looks the value up under `key` instead of the field name.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The key used at the source: the explicit `key` or else the field name.
    pub fn lookup_key(&self) -> &str {
        self.key.as_deref().unwrap_or(&self.field)
    }
}

// ── ResolvedInput ─────────────────────────────────────────────────────────────

/// Field name → coerced value mapping for exactly one invocation.
///
/// Built by the resolver, moved into the use case, never retained by the
/// engine afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedInput(Map<String, Value>);

impl ResolvedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Deserializes the whole input into a use-case specific struct.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the fields do not fit `T`.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(Value::Object(self.0.clone()))
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for ResolvedInput {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_deserializes_from_metadata_shape() {
        // Arrange
        let raw = json!({
            "field": "request_id",
            "source": "header",
            "key": "X-Request-Id",
            "type": "string",
            "default": "none"
        });

        // Act
        let spec: ParameterSpec = serde_json::from_value(raw).unwrap();

        // Assert
        assert_eq!(spec.source, ParamSource::Header);
        assert_eq!(spec.lookup_key(), "X-Request-Id");
        assert!(!spec.required);
        assert_eq!(spec.default, Some(json!("none")));
    }

    #[test]
    fn test_spec_type_defaults_to_string() {
        let spec: ParameterSpec =
            serde_json::from_value(json!({"field": "room", "source": "socket_payload"})).unwrap();
        assert_eq!(spec.ty, ParamType::String);
        assert_eq!(spec.source, ParamSource::SocketPayload);
    }

    #[test]
    fn test_lookup_key_falls_back_to_field() {
        let spec = ParameterSpec::new("id", ParamSource::Path, ParamType::Integer);
        assert_eq!(spec.lookup_key(), "id");
    }

    #[test]
    fn test_param_type_accepts_matching_json() {
        assert!(ParamType::Integer.accepts(&json!(3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::Float.accepts(&json!(3)));
        assert!(ParamType::Object.accepts(&json!({})));
        assert!(!ParamType::Array.accepts(&json!("[]")));
    }

    #[test]
    fn test_source_transport_availability() {
        assert!(ParamSource::Header.available_over_http());
        assert!(!ParamSource::SocketPayload.available_over_http());
        assert!(ParamSource::SocketPayload.available_over_socket());
        assert!(!ParamSource::Body.available_over_socket());
    }

    #[test]
    fn test_resolved_input_deserializes_into_struct() {
        #[derive(serde::Deserialize)]
        struct Query {
            id: i64,
            verbose: bool,
        }

        let mut input = ResolvedInput::new();
        input.insert("id", json!(42));
        input.insert("verbose", json!(true));

        let query: Query = input.deserialize_into().unwrap();

        assert_eq!(query.id, 42);
        assert!(query.verbose);
    }
}
