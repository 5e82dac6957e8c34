//! Handler synthesis: one use case + one trigger → one transport handler.
//!
//! A synthesized handler is a closure that owns everything it needs (the use
//! case, the trigger's specs) and takes nothing but the transport's request.
//! Calling it runs the fixed pipeline:
//!
//! ```text
//! request ──► resolve ──► invoke use case ──► map outcome ──► reply
//!               │
//!               └── ValidationError ──► map failure ──► reply   (use case not called)
//! ```
//!
//! Synthesis validates the descriptor and performs no I/O.  A malformed
//! descriptor is a startup error ([`ConfigError`]), never a request-time one.

use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info_span, warn, Instrument};

use crate::domain::{
    Failure, FailureKind, HttpTrigger, Outcome, ParamSource, ParamType, ParameterSpec,
    PathError, PathTemplate, ResolvedInput, SocketTrigger, UseCase,
};
use crate::mapping::{map_http, map_socket, HttpReply, SocketEmission};
use crate::resolver::{resolve, InboundRequest, RequestSource, SocketEvent};

/// A synthesized HTTP handler.
pub type HttpHandler = Arc<dyn Fn(InboundRequest) -> BoxFuture<'static, HttpReply> + Send + Sync>;

/// A synthesized WebSocket event handler.
pub type SocketHandler =
    Arc<dyn Fn(SocketEvent) -> BoxFuture<'static, SocketEmission> + Send + Sync>;

// ── ConfigError ───────────────────────────────────────────────────────────────

/// A descriptor the engine refuses to bind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("use case '{use_case}': invalid route '{path}': {reason}")]
    InvalidPath {
        use_case: String,
        path: String,
        #[source]
        reason: PathError,
    },

    #[error("use case '{use_case}' ({trigger}): parameter '{field}' reads placeholder '{key}' which the route does not declare")]
    UnknownPathParam {
        use_case: String,
        trigger: String,
        field: String,
        key: String,
    },

    #[error("use case '{use_case}' ({trigger}): parameter '{field}' uses source '{param_source}' which {transport} triggers do not provide")]
    SourceUnavailable {
        use_case: String,
        trigger: String,
        field: String,
        param_source: ParamSource,
        transport: &'static str,
    },

    #[error("use case '{use_case}' ({trigger}): field '{field}' is declared more than once")]
    DuplicateField {
        use_case: String,
        trigger: String,
        field: String,
    },

    #[error("use case '{use_case}' ({trigger}): default for '{field}' is not of type {expected}")]
    DefaultTypeMismatch {
        use_case: String,
        trigger: String,
        field: String,
        expected: ParamType,
    },

    #[error("use case '{use_case}': socket trigger has an empty event name")]
    EmptyEventName { use_case: String },

    #[error("use case '{use_case}': socket namespace '{namespace}' must start with '/'")]
    InvalidNamespace { use_case: String, namespace: String },
}

// ── Descriptor validation ─────────────────────────────────────────────────────

/// Validates an HTTP trigger and returns its parsed route.
pub(crate) fn validate_http(
    use_case: &str,
    trigger: &HttpTrigger,
) -> Result<PathTemplate, ConfigError> {
    let template = PathTemplate::parse(&trigger.path).map_err(|reason| ConfigError::InvalidPath {
        use_case: use_case.to_owned(),
        path: trigger.path.clone(),
        reason,
    })?;

    let label = trigger.label();
    validate_params(use_case, &label, &trigger.params, "HTTP", ParamSource::available_over_http)?;

    for spec in trigger.params.iter().filter(|s| s.source == ParamSource::Path) {
        if !template.has_param(spec.lookup_key()) {
            return Err(ConfigError::UnknownPathParam {
                use_case: use_case.to_owned(),
                trigger: label,
                field: spec.field.clone(),
                key: spec.lookup_key().to_owned(),
            });
        }
    }

    Ok(template)
}

/// Validates a socket trigger.
pub(crate) fn validate_socket(use_case: &str, trigger: &SocketTrigger) -> Result<(), ConfigError> {
    if trigger.event.trim().is_empty() {
        return Err(ConfigError::EmptyEventName {
            use_case: use_case.to_owned(),
        });
    }
    if !trigger.namespace().starts_with('/') {
        return Err(ConfigError::InvalidNamespace {
            use_case: use_case.to_owned(),
            namespace: trigger.namespace().to_owned(),
        });
    }
    validate_params(
        use_case,
        &trigger.label(),
        &trigger.params,
        "WebSocket",
        ParamSource::available_over_socket,
    )
}

fn validate_params(
    use_case: &str,
    trigger: &str,
    params: &[ParameterSpec],
    transport: &'static str,
    available: fn(ParamSource) -> bool,
) -> Result<(), ConfigError> {
    let mut fields = BTreeSet::new();
    for spec in params {
        if !available(spec.source) {
            return Err(ConfigError::SourceUnavailable {
                use_case: use_case.to_owned(),
                trigger: trigger.to_owned(),
                field: spec.field.clone(),
                param_source: spec.source,
                transport,
            });
        }
        if !fields.insert(spec.field.as_str()) {
            return Err(ConfigError::DuplicateField {
                use_case: use_case.to_owned(),
                trigger: trigger.to_owned(),
                field: spec.field.clone(),
            });
        }
        if let Some(default) = &spec.default {
            if !spec.ty.accepts(default) {
                return Err(ConfigError::DefaultTypeMismatch {
                    use_case: use_case.to_owned(),
                    trigger: trigger.to_owned(),
                    field: spec.field.clone(),
                    expected: spec.ty,
                });
            }
        }
    }
    Ok(())
}

// ── Invocation pipeline ───────────────────────────────────────────────────────

/// What a handler closes over.
struct Binding {
    use_case_name: String,
    address: String,
    use_case: Arc<dyn UseCase>,
    params: Vec<ParameterSpec>,
    /// Passthrough mode only: whether body members are forwarded.
    forward_body: bool,
}

impl Binding {
    /// Resolves, invokes and returns the outcome.  Never panics outward.
    async fn run<R: RequestSource + Send + Sync>(&self, request: R) -> Outcome {
        let span = info_span!("use_case", name = %self.use_case_name, trigger = %self.address);
        async move {
            let input = if self.params.is_empty() {
                ResolvedInput::from(request.passthrough(self.forward_body))
            } else {
                match resolve(&self.params, &request) {
                    Ok(input) => input,
                    Err(rejected) => {
                        debug!(
                            fields = ?rejected.field_names(),
                            "request rejected before invocation"
                        );
                        return Outcome::Failure(rejected.into());
                    }
                }
            };
            drop(request);

            let outcome = invoke_guarded(self.use_case.as_ref(), input).await;
            match &outcome {
                Outcome::Success(_) => debug!("use case succeeded"),
                Outcome::Failure(f) if f.kind == FailureKind::Internal => {
                    warn!(message = %f.message, "use case failed with internal error")
                }
                Outcome::Failure(f) => debug!(kind = %f.kind, "use case failed"),
            }
            outcome
        }
        .instrument(span)
        .await
    }
}

/// Invokes the use case, converting a panic into an `internal` failure.
async fn invoke_guarded(use_case: &dyn UseCase, input: ResolvedInput) -> Outcome {
    match AssertUnwindSafe(use_case.invoke(input)).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            error!(panic = %message, "use case panicked");
            Failure::internal("use case panicked")
                .with_details(json!({ "panic": message }))
                .into()
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ── Synthesis ─────────────────────────────────────────────────────────────────

/// Builds the HTTP handler for `trigger`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the trigger is malformed.
pub fn synthesize_http(
    use_case_name: &str,
    use_case: Arc<dyn UseCase>,
    trigger: &HttpTrigger,
) -> Result<HttpHandler, ConfigError> {
    validate_http(use_case_name, trigger)?;

    let binding = Arc::new(Binding {
        use_case_name: use_case_name.to_owned(),
        address: trigger.label(),
        use_case,
        params: trigger.params.clone(),
        forward_body: trigger.method.carries_body(),
    });

    Ok(Arc::new(move |request: InboundRequest| {
        let binding = Arc::clone(&binding);
        async move { map_http(binding.run(request).await) }.boxed()
    }))
}

/// Builds the WebSocket handler for `trigger`.
///
/// # Errors
///
/// Returns [`ConfigError`] when the trigger is malformed.
pub fn synthesize_socket(
    use_case_name: &str,
    use_case: Arc<dyn UseCase>,
    trigger: &SocketTrigger,
) -> Result<SocketHandler, ConfigError> {
    validate_socket(use_case_name, trigger)?;

    let binding = Arc::new(Binding {
        use_case_name: use_case_name.to_owned(),
        address: trigger.label(),
        use_case,
        params: trigger.params.clone(),
        forward_body: true,
    });
    let trigger = Arc::new(trigger.clone());

    Ok(Arc::new(move |event: SocketEvent| {
        let binding = Arc::clone(&binding);
        let trigger = Arc::clone(&trigger);
        async move { map_socket(&trigger, binding.run(event).await) }.boxed()
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HttpMethod, MockUseCase};
    use serde_json::{json, Value};

    fn orders_trigger() -> HttpTrigger {
        HttpTrigger::new(HttpMethod::Get, "/orders/{id}").with_param(
            ParameterSpec::new("id", ParamSource::Path, ParamType::Integer).required(),
        )
    }

    #[tokio::test]
    async fn test_http_handler_resolves_invokes_and_maps() {
        // Arrange: the use case must see the coerced integer.
        let mut mock = MockUseCase::new();
        mock.expect_invoke()
            .withf(|input| input.get_i64("id") == Some(42))
            .times(1)
            .returning(|_| Outcome::success(json!({"status": "shipped"})));
        let handler = synthesize_http("get_order", Arc::new(mock), &orders_trigger()).unwrap();

        // Act
        let reply = handler(InboundRequest::new().with_path_param("id", "42")).await;

        // Assert
        assert_eq!(reply.status, 200);
        assert_eq!(reply.body, json!({"status": "ok", "data": {"status": "shipped"}}));
    }

    #[tokio::test]
    async fn test_http_validation_failure_never_invokes_use_case() {
        let mut mock = MockUseCase::new();
        mock.expect_invoke().never();
        let handler = synthesize_http("get_order", Arc::new(mock), &orders_trigger()).unwrap();

        let reply = handler(InboundRequest::new().with_path_param("id", "abc")).await;

        assert_eq!(reply.status, 400);
        assert_eq!(reply.body["kind"], "validation");
        assert_eq!(reply.body["details"], json!({"id": "not an integer"}));
    }

    #[tokio::test]
    async fn test_socket_missing_field_emits_error_without_invocation() {
        let mut mock = MockUseCase::new();
        mock.expect_invoke().never();
        let trigger = SocketTrigger::new("join_room").with_param(
            ParameterSpec::new("room", ParamSource::SocketPayload, ParamType::String).required(),
        );
        let handler = synthesize_socket("join_room", Arc::new(mock), &trigger).unwrap();

        let emission = handler(SocketEvent::new("join_room", json!({}))).await;

        assert_eq!(emission.event, "error");
        assert_eq!(emission.payload["kind"], "validation");
    }

    #[tokio::test]
    async fn test_panicking_use_case_maps_to_internal() {
        let mut mock = MockUseCase::new();
        mock.expect_invoke().returning(|_| panic!("database exploded"));
        let trigger = HttpTrigger::new(HttpMethod::Post, "/boom");
        let handler = synthesize_http("boom", Arc::new(mock), &trigger).unwrap();

        let reply = handler(InboundRequest::new()).await;

        assert_eq!(reply.status, 500);
        assert_eq!(reply.body["details"]["panic"], "database exploded");
    }

    #[tokio::test]
    async fn test_use_case_kinds_pass_through_unchanged() {
        let mut mock = MockUseCase::new();
        mock.expect_invoke()
            .returning(|_| Failure::unauthorized("not your order").into());
        let handler = synthesize_http("get_order", Arc::new(mock), &orders_trigger()).unwrap();

        let reply = handler(InboundRequest::new().with_path_param("id", "1")).await;

        assert_eq!(reply.status, 401);
        assert_eq!(reply.body["message"], "not your order");
    }

    #[tokio::test]
    async fn test_passthrough_forwards_body_and_path_for_post() {
        let mut mock = MockUseCase::new();
        mock.expect_invoke()
            .withf(|input| input.get_str("id") == Some("9") && input.get_str("name") == Some("w"))
            .returning(|input| Outcome::success(input.into_value()));
        let trigger = HttpTrigger::new(HttpMethod::Post, "/items/{id}");
        let handler = synthesize_http("update_item", Arc::new(mock), &trigger).unwrap();

        let reply = handler(
            InboundRequest::new()
                .with_path_param("id", "9")
                .with_json_body(json!({"name": "w"})),
        )
        .await;

        assert_eq!(reply.status, 200);
    }

    #[tokio::test]
    async fn test_passthrough_ignores_body_for_get() {
        let mut mock = MockUseCase::new();
        mock.expect_invoke()
            .withf(|input| input.is_empty())
            .returning(|_| Outcome::success(Value::Null));
        let trigger = HttpTrigger::new(HttpMethod::Get, "/ping");
        let handler = synthesize_http("ping", Arc::new(mock), &trigger).unwrap();

        let reply = handler(InboundRequest::new().with_json_body(json!({"x": 1}))).await;

        assert_eq!(reply.status, 200);
    }

    // ── Descriptor validation ────────────────────────────────────────────────

    fn never_called() -> Arc<dyn UseCase> {
        Arc::new(MockUseCase::new())
    }

    #[test]
    fn test_unknown_path_placeholder_is_config_error() {
        let trigger = HttpTrigger::new(HttpMethod::Get, "/orders/{id}").with_param(
            ParameterSpec::new("order", ParamSource::Path, ParamType::Integer),
        );
        let err = synthesize_http("get_order", never_called(), &trigger).err().unwrap();
        assert!(matches!(err, ConfigError::UnknownPathParam { .. }));
    }

    #[test]
    fn test_socket_payload_on_http_trigger_is_config_error() {
        let trigger = HttpTrigger::new(HttpMethod::Post, "/rooms").with_param(
            ParameterSpec::new("room", ParamSource::SocketPayload, ParamType::String),
        );
        let err = synthesize_http("join", never_called(), &trigger).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::SourceUnavailable { param_source: ParamSource::SocketPayload, .. }
        ));
    }

    #[test]
    fn test_body_source_on_socket_trigger_is_config_error() {
        let trigger = SocketTrigger::new("join_room")
            .with_param(ParameterSpec::new("room", ParamSource::Body, ParamType::String));
        let err = synthesize_socket("join", never_called(), &trigger).err().unwrap();
        assert!(matches!(err, ConfigError::SourceUnavailable { transport: "WebSocket", .. }));
    }

    #[test]
    fn test_duplicate_field_is_config_error() {
        let trigger = HttpTrigger::new(HttpMethod::Get, "/search")
            .with_param(ParameterSpec::new("q", ParamSource::Query, ParamType::String))
            .with_param(ParameterSpec::new("q", ParamSource::Header, ParamType::String));
        let err = synthesize_http("search", never_called(), &trigger).err().unwrap();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn test_mistyped_default_is_config_error() {
        let trigger = HttpTrigger::new(HttpMethod::Get, "/search").with_param(
            ParameterSpec::new("limit", ParamSource::Query, ParamType::Integer)
                .with_default(json!("ten")),
        );
        let err = synthesize_http("search", never_called(), &trigger).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::DefaultTypeMismatch { expected: ParamType::Integer, .. }
        ));
    }

    #[test]
    fn test_invalid_route_is_config_error() {
        let trigger = HttpTrigger::new(HttpMethod::Get, "orders");
        let err = synthesize_http("list", never_called(), &trigger).err().unwrap();
        assert!(err.to_string().contains("invalid route 'orders'"));
    }

    #[test]
    fn test_empty_event_and_bad_namespace_are_config_errors() {
        let empty = SocketTrigger::new("  ");
        assert!(matches!(
            synthesize_socket("x", never_called(), &empty).err().unwrap(),
            ConfigError::EmptyEventName { .. }
        ));

        let bad_ns = SocketTrigger::new("join").in_namespace("chat");
        assert!(matches!(
            synthesize_socket("x", never_called(), &bad_ns).err().unwrap(),
            ConfigError::InvalidNamespace { .. }
        ));
    }
}
