//! Result mapper: [`Outcome`] → transport reply.
//!
//! # HTTP
//!
//! | Outcome               | Status | Body                                                    |
//! |-----------------------|--------|---------------------------------------------------------|
//! | `Success(P)`          | 200    | `{"status":"ok","data":P}`                              |
//! | `Failure(validation)` | 400    | `{"status":"error","kind":..,"message":..,"details"?:..}` |
//! | `Failure(unauthorized)` | 401  | same                                                    |
//! | `Failure(not-found)`  | 404    | same                                                    |
//! | `Failure(internal)`   | 500    | same                                                    |
//! | `Failure(timeout)`    | 504    | same                                                    |
//!
//! # WebSocket
//!
//! Success emits on the trigger's success event with `{"data":P}`.  Every
//! failure emits on [`ERROR_EVENT`] with `{"kind","message","details"?}`.
//!
//! Bodies are produced by `serde` from typed envelopes; nothing is
//! string-templated.

use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::domain::{Failure, FailureKind, Outcome, SocketTrigger, ERROR_EVENT};

pub const STATUS_OK: u16 = 200;

/// Body written when a reply cannot be encoded at all.
const FALLBACK_BODY: &[u8] =
    br#"{"status":"error","kind":"internal","message":"response could not be encoded"}"#;

/// HTTP status for a failure kind.  Total over the taxonomy.
pub fn status_for(kind: FailureKind) -> u16 {
    match kind {
        FailureKind::Validation => 400,
        FailureKind::Unauthorized => 401,
        FailureKind::NotFound => 404,
        FailureKind::Internal => 500,
        FailureKind::Timeout => 504,
    }
}

// ── Envelopes ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum HttpEnvelope<'a> {
    Ok {
        data: &'a Value,
    },
    Error {
        kind: FailureKind,
        message: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        details: Option<&'a Value>,
    },
}

#[derive(Serialize)]
struct SocketData<'a> {
    data: &'a Value,
}

#[derive(Serialize)]
struct SocketError<'a> {
    kind: FailureKind,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<&'a Value>,
}

// ── HTTP ──────────────────────────────────────────────────────────────────────

/// Status code plus JSON body for one HTTP response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Value,
}

impl HttpReply {
    /// Encodes the body to bytes.
    ///
    /// Falls back to a fixed `500` internal-error body if encoding fails, so
    /// the client always receives a well-formed response.
    pub fn into_wire(self) -> (u16, Vec<u8>) {
        match serde_json::to_vec(&self.body) {
            Ok(bytes) => (self.status, bytes),
            Err(e) => {
                error!("failed to encode HTTP reply: {e}");
                (status_for(FailureKind::Internal), FALLBACK_BODY.to_vec())
            }
        }
    }
}

/// Maps an outcome to an HTTP reply.
pub fn map_http(outcome: Outcome) -> HttpReply {
    match &outcome {
        Outcome::Success(data) => match serde_json::to_value(HttpEnvelope::Ok { data }) {
            Ok(body) => HttpReply {
                status: STATUS_OK,
                body,
            },
            Err(e) => failure_reply(&encoding_failure(e)),
        },
        Outcome::Failure(failure) => failure_reply(failure),
    }
}

/// HTTP reply for a failure.
pub fn failure_reply(failure: &Failure) -> HttpReply {
    let envelope = HttpEnvelope::Error {
        kind: failure.kind,
        message: &failure.message,
        details: failure.details.as_ref(),
    };
    match serde_json::to_value(envelope) {
        Ok(body) => HttpReply {
            status: status_for(failure.kind),
            body,
        },
        Err(e) => {
            error!("failed to encode failure envelope: {e}");
            HttpReply {
                status: status_for(FailureKind::Internal),
                body: serde_json::from_slice(FALLBACK_BODY).unwrap_or(Value::Null),
            }
        }
    }
}

// ── WebSocket ─────────────────────────────────────────────────────────────────

/// Event name plus payload for one socket emission.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketEmission {
    pub event: String,
    pub payload: Value,
}

/// Maps an outcome to a socket emission for `trigger`.
pub fn map_socket(trigger: &SocketTrigger, outcome: Outcome) -> SocketEmission {
    match &outcome {
        Outcome::Success(data) => match serde_json::to_value(SocketData { data }) {
            Ok(payload) => SocketEmission {
                event: trigger.success_event(),
                payload,
            },
            Err(e) => failure_emission(&encoding_failure(e)),
        },
        Outcome::Failure(failure) => failure_emission(failure),
    }
}

/// Emission on [`ERROR_EVENT`] for a failure.
pub fn failure_emission(failure: &Failure) -> SocketEmission {
    let envelope = SocketError {
        kind: failure.kind,
        message: &failure.message,
        details: failure.details.as_ref(),
    };
    let payload = serde_json::to_value(envelope).unwrap_or_else(|e| {
        error!("failed to encode socket failure: {e}");
        serde_json::json!({
            "kind": FailureKind::Internal.as_str(),
            "message": "emission could not be encoded",
        })
    });
    SocketEmission {
        event: ERROR_EVENT.to_owned(),
        payload,
    }
}

fn encoding_failure(e: serde_json::Error) -> Failure {
    Failure::internal("response could not be encoded")
        .with_details(serde_json::json!({ "error": e.to_string() }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
