//! Use-case outcomes and the closed failure taxonomy.
//!
//! Every invocation ends in exactly one [`Outcome`]: a success payload or a
//! [`Failure`] whose [`FailureKind`] decides the HTTP status / socket event the
//! result mapper produces.
//!
//! # Who classifies failures?
//!
//! The use case does.  `unauthorized` and `timeout` in particular are declared
//! by the use-case runtime through [`Failure::unauthorized`] and
//! [`Failure::timeout`]; the engine never infers a kind from error text.  The
//! only kind the engine produces itself is `validation` (from the parameter
//! resolver) and `internal` (serialization faults, panics, unknown kinds).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Bad or missing input; the client can fix the request.
    Validation,
    /// A resource referenced by the request does not exist.
    NotFound,
    /// The caller lacks rights.  Decided by the use case, passed through here.
    Unauthorized,
    /// The use case exceeded its allotted time.
    Timeout,
    /// Anything unexpected, including unclassified failures.
    Internal,
}

impl FailureKind {
    /// Every kind, in a stable order.
    pub const ALL: [FailureKind; 5] = [
        Self::Validation,
        Self::NotFound,
        Self::Unauthorized,
        Self::Timeout,
        Self::Internal,
    ];

    /// Wire name of the kind (`"not-found"`, `"validation"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not-found",
            Self::Unauthorized => "unauthorized",
            Self::Timeout => "timeout",
            Self::Internal => "internal",
        }
    }

    /// Parses a kind reported by a string-typed use-case runtime.
    ///
    /// Case and `_`/`-` separators are ignored, so `"NOT_FOUND"`,
    /// `"not-found"` and `"not_found"` all parse.  Returns `None` for codes
    /// outside the taxonomy.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Failure ───────────────────────────────────────────────────────────────────

/// A classified use-case failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}: {message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
    /// Structured context.  Only ever set when the producer supplied it.
    pub details: Option<Value>,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(FailureKind::NotFound, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unauthorized, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Timeout, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, message)
    }

    /// Builds a failure from a runtime that reports kinds as strings.
    ///
    /// Known codes map to their kind unchanged.  Unknown codes become
    /// `internal`; the original code, message and details are kept under
    /// `details` so nothing reported by the use case is lost.
    pub fn from_code(code: &str, message: impl Into<String>, details: Option<Value>) -> Self {
        let message = message.into();
        match FailureKind::from_code(code) {
            Some(kind) => Self {
                kind,
                message,
                details,
            },
            None => {
                let mut preserved = json!({
                    "original_kind": code,
                    "original_message": message,
                });
                if let Some(details) = details {
                    preserved["original_details"] = details;
                }
                Self::internal(format!("unclassified failure '{code}'")).with_details(preserved)
            }
        }
    }
}

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Result of one use-case invocation.  Consumed immediately by the mapper.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Value),
    Failure(Failure),
}

impl Outcome {
    pub fn success(payload: Value) -> Self {
        Self::Success(payload)
    }

    /// Serializes `payload` into a success outcome.
    ///
    /// A payload that cannot be represented as JSON (for example a map with
    /// non-string keys) becomes an `internal` failure instead of a fault.
    pub fn from_serializable<T: Serialize + ?Sized>(payload: &T) -> Self {
        match serde_json::to_value(payload) {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Failure(
                Failure::internal("use case returned a payload that could not be serialized")
                    .with_details(json!({ "error": e.to_string() })),
            ),
        }
    }

    /// Converts a `Result` from idiomatic use-case code into an outcome.
    pub fn from_result<T, E>(result: Result<T, E>) -> Self
    where
        T: Serialize,
        E: Into<Failure>,
    {
        match result {
            Ok(payload) => Self::from_serializable(&payload),
            Err(e) => Self::Failure(e.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The failure kind, or `None` for a success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Success(_) => None,
            Self::Failure(f) => Some(f.kind),
        }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
