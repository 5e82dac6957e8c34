//! Transport-neutral views of inbound requests and socket events.
//!
//! The resolver only ever talks to [`RequestSource`].  Serving runtimes build
//! an [`InboundRequest`] (HTTP) or a [`SocketEvent`] (WebSocket) from their
//! native objects and hand it to the synthesized handler.

use serde_json::{Map, Value};

use crate::domain::ParamSource;

/// A raw value found at a parameter source, before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue<'a> {
    /// Text from a path segment or header.
    Text(&'a str),
    /// Every occurrence of a query parameter, in URL order.
    TextList(Vec<&'a str>),
    /// A value taken from a parsed JSON document.
    Structured(&'a Value),
}

/// Capability the resolver needs from a request: look a key up at a source.
pub trait RequestSource {
    /// Returns the raw value stored under `key` at `source`, if any.
    fn lookup(&self, source: ParamSource, key: &str) -> Option<RawValue<'_>>;

    /// Reports a source that was present but unreadable (malformed JSON body,
    /// undecodable query string).
    fn source_error(&self, _source: ParamSource) -> Option<&str> {
        None
    }

    /// Fields forwarded as-is when a trigger declares no parameter specs.
    fn passthrough(&self, include_body: bool) -> Map<String, Value>;
}

// ── Body document ─────────────────────────────────────────────────────────────

/// The request body as the resolver sees it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BodyDocument {
    #[default]
    Empty,
    Json(Value),
    /// The body was not valid JSON; holds the parser's message.
    Malformed(String),
}

impl BodyDocument {
    /// Parses raw body bytes.  Blank bodies are [`BodyDocument::Empty`].
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Self::Empty;
        }
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(e) => Self::Malformed(e.to_string()),
        }
    }
}

/// Walks `key` into `root`: first as a literal member name, then as a dotted
/// path (`customer.address.city`, `items.0.sku`).  `null` counts as absent.
pub(crate) fn lookup_structured<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    let found = match root.get(key) {
        Some(value) => Some(value),
        None if key.contains('.') => key.split('.').try_fold(root, |node, part| match node {
            Value::Object(map) => map.get(part),
            Value::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }),
        None => None,
    };
    found.filter(|value| !value.is_null())
}

// ── HTTP request ──────────────────────────────────────────────────────────────

/// An HTTP request reduced to what parameter resolution needs.
#[derive(Debug, Clone, Default)]
pub struct InboundRequest {
    path_params: Vec<(String, String)>,
    query: Vec<(String, String)>,
    query_error: Option<String>,
    headers: Vec<(String, String)>,
    body: BodyDocument,
}

impl InboundRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Records that the query string could not be decoded.
    pub fn with_query_error(mut self, reason: impl Into<String>) -> Self {
        self.query_error = Some(reason.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: BodyDocument) -> Self {
        self.body = body;
        self
    }

    pub fn with_json_body(self, body: Value) -> Self {
        self.with_body(BodyDocument::Json(body))
    }

    pub fn body(&self) -> &BodyDocument {
        &self.body
    }
}

impl RequestSource for InboundRequest {
    fn lookup(&self, source: ParamSource, key: &str) -> Option<RawValue<'_>> {
        match source {
            ParamSource::Path => self
                .path_params
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| RawValue::Text(value)),
            ParamSource::Query => {
                let values: Vec<&str> = self
                    .query
                    .iter()
                    .filter(|(name, _)| name == key)
                    .map(|(_, value)| value.as_str())
                    .collect();
                (!values.is_empty()).then_some(RawValue::TextList(values))
            }
            ParamSource::Header => self
                .headers
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(key))
                .map(|(_, value)| RawValue::Text(value)),
            ParamSource::Body => match &self.body {
                BodyDocument::Json(root) => lookup_structured(root, key).map(RawValue::Structured),
                BodyDocument::Empty | BodyDocument::Malformed(_) => None,
            },
            ParamSource::SocketPayload => None,
        }
    }

    fn source_error(&self, source: ParamSource) -> Option<&str> {
        match (source, &self.body) {
            (ParamSource::Body, BodyDocument::Malformed(reason)) => Some(reason.as_str()),
            (ParamSource::Query, _) => self.query_error.as_deref(),
            _ => None,
        }
    }

    fn passthrough(&self, include_body: bool) -> Map<String, Value> {
        let mut fields = Map::new();
        if include_body {
            if let BodyDocument::Json(Value::Object(body)) = &self.body {
                fields.extend(body.clone());
            }
        }
        // Route placeholders win over body members of the same name.
        for (name, value) in &self.path_params {
            fields.insert(name.clone(), Value::String(value.clone()));
        }
        fields
    }
}

// ── Socket event ──────────────────────────────────────────────────────────────

/// One inbound WebSocket event.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketEvent {
    pub event: String,
    pub payload: Value,
}

impl SocketEvent {
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

impl RequestSource for SocketEvent {
    fn lookup(&self, source: ParamSource, key: &str) -> Option<RawValue<'_>> {
        match source {
            ParamSource::SocketPayload => {
                lookup_structured(&self.payload, key).map(RawValue::Structured)
            }
            _ => None,
        }
    }

    fn passthrough(&self, _include_body: bool) -> Map<String, Value> {
        match &self.payload {
            Value::Object(fields) => fields.clone(),
            _ => Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_parse_blank_is_empty() {
        assert_eq!(BodyDocument::parse(b"  \n"), BodyDocument::Empty);
        assert_eq!(BodyDocument::parse(b""), BodyDocument::Empty);
    }

    #[test]
    fn test_body_parse_invalid_json_is_malformed() {
        assert!(matches!(
            BodyDocument::parse(b"{not json"),
            BodyDocument::Malformed(_)
        ));
    }

    #[test]
    fn test_lookup_structured_follows_dotted_path() {
        let doc = json!({"customer": {"address": {"city": "Lima"}}, "items": [{"sku": "A1"}]});
        assert_eq!(
            lookup_structured(&doc, "customer.address.city"),
            Some(&json!("Lima"))
        );
        assert_eq!(lookup_structured(&doc, "items.0.sku"), Some(&json!("A1")));
        assert_eq!(lookup_structured(&doc, "customer.phone"), None);
    }

    #[test]
    fn test_lookup_structured_prefers_literal_dotted_member() {
        let doc = json!({"a.b": 1, "a": {"b": 2}});
        assert_eq!(lookup_structured(&doc, "a.b"), Some(&json!(1)));
    }

    #[test]
    fn test_lookup_structured_treats_null_as_absent() {
        let doc = json!({"room": null});
        assert_eq!(lookup_structured(&doc, "room"), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = InboundRequest::new().with_header("x-request-id", "abc");
        assert_eq!(
            request.lookup(ParamSource::Header, "X-Request-Id"),
            Some(RawValue::Text("abc"))
        );
    }

    #[test]
    fn test_query_key_yields_every_occurrence() {
        let request = InboundRequest::new()
            .with_query("tag", "a")
            .with_query("tag", "b")
            .with_query("page", "2");
        assert_eq!(
            request.lookup(ParamSource::Query, "tag"),
            Some(RawValue::TextList(vec!["a", "b"]))
        );
        assert_eq!(
            request.lookup(ParamSource::Query, "page"),
            Some(RawValue::TextList(vec!["2"]))
        );
        assert_eq!(request.lookup(ParamSource::Query, "missing"), None);
    }

    #[test]
    fn test_http_request_never_answers_socket_payload() {
        let request = InboundRequest::new().with_json_body(json!({"room": "lobby"}));
        assert_eq!(request.lookup(ParamSource::SocketPayload, "room"), None);
    }

    #[test]
    fn test_passthrough_merges_body_and_path_with_path_winning() {
        let request = InboundRequest::new()
            .with_path_param("id", "7")
            .with_json_body(json!({"id": 1, "name": "widget"}));

        let fields = request.passthrough(true);

        assert_eq!(fields.get("id"), Some(&json!("7")));
        assert_eq!(fields.get("name"), Some(&json!("widget")));
    }

    #[test]
    fn test_passthrough_skips_body_when_not_included() {
        let request = InboundRequest::new().with_json_body(json!({"name": "widget"}));
        assert!(request.passthrough(false).is_empty());
    }

    #[test]
    fn test_socket_event_only_answers_payload_source() {
        let event = SocketEvent::new("join_room", json!({"room": "lobby"}));
        assert_eq!(
            event.lookup(ParamSource::SocketPayload, "room"),
            Some(RawValue::Structured(&json!("lobby")))
        );
        assert_eq!(event.lookup(ParamSource::Body, "room"), None);
    }
}
