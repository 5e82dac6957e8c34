//! Parameter resolver: raw request → [`ResolvedInput`].
//!
//! # How resolution works
//!
//! For every [`ParameterSpec`] of a trigger the resolver:
//!
//! 1. Looks the raw value up at the spec's source through [`RequestSource`].
//! 2. Coerces it into the declared [`ParamType`](crate::domain::ParamType).
//! 3. Falls back to the spec's default when the value is absent.
//!
//! Problems are **collected, not thrown**: a request missing three required
//! fields and carrying one malformed integer yields a single
//! [`ValidationError`] listing all four.  Clients see every problem in one
//! response instead of fixing them one round-trip at a time.

mod coerce;
pub mod request;

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::domain::{Failure, ParamSource, ParameterSpec, ResolvedInput};

pub use request::{BodyDocument, InboundRequest, RawValue, RequestSource, SocketEvent};

/// Message recorded for a required field that is absent and has no default.
pub const MISSING_FIELD: &str = "is required";

// ── ValidationError ───────────────────────────────────────────────────────────

/// Every field-level problem found while resolving one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    fields: BTreeMap<String, String>,
}

impl ValidationError {
    /// Records a problem for `field`.  A second problem for the same field is
    /// appended to the first.
    pub fn record(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        self.fields
            .entry(field.to_owned())
            .and_modify(|existing| {
                existing.push_str("; ");
                existing.push_str(&message);
            })
            .or_insert(message);
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid request parameters: {}",
            self.field_names().join(", ")
        )
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for Failure {
    /// `details` maps each offending field to its message, e.g.
    /// `{"id": "not an integer"}`.
    fn from(error: ValidationError) -> Self {
        let message = error.to_string();
        let details = error
            .fields
            .into_iter()
            .map(|(field, msg)| (field, Value::String(msg)))
            .collect();
        Failure::validation(message).with_details(Value::Object(details))
    }
}

// ── resolve ───────────────────────────────────────────────────────────────────

/// Resolves `specs` against `request`.
///
/// # Errors
///
/// Returns one [`ValidationError`] naming every field that was missing or
/// failed coercion, plus an entry keyed by the source name (`"body"`,
/// `"query"`) when a source the specs read could not be decoded at all.
pub fn resolve<R>(specs: &[ParameterSpec], request: &R) -> Result<ResolvedInput, ValidationError>
where
    R: RequestSource + ?Sized,
{
    let mut input = ResolvedInput::new();
    let mut errors = ValidationError::default();

    for source in [ParamSource::Body, ParamSource::Query] {
        if specs.iter().any(|spec| spec.source == source) {
            if let Some(reason) = request.source_error(source) {
                errors.record(source.as_str(), format!("could not be decoded: {reason}"));
            }
        }
    }

    for spec in specs {
        match request.lookup(spec.source, spec.lookup_key()) {
            Some(raw) => match coerce::coerce(raw, spec.ty) {
                Ok(value) => input.insert(spec.field.as_str(), value),
                Err(message) => errors.record(&spec.field, message),
            },
            None => match &spec.default {
                Some(default) => input.insert(spec.field.as_str(), default.clone()),
                None if spec.required => errors.record(&spec.field, MISSING_FIELD),
                None => {}
            },
        }
    }

    if errors.is_empty() {
        Ok(input)
    } else {
        Err(errors)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
