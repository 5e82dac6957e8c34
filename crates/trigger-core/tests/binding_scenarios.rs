//! Integration tests for the binding engine through its public API.
//!
//! A recording runtime stands in for a real server: it keeps every handler it
//! is given so the tests can call them like a transport would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use trigger_core::{
    use_case_fn, Failure, HttpHandler, HttpMethod, HttpRoute, HttpTrigger, InboundRequest,
    Outcome, ParamSource, ParamType, ParameterSpec, Registrar, RegistrationError,
    ServingRuntime, SocketEvent, SocketHandler, SocketRoute, SocketTrigger, UseCase,
    UseCaseDescriptor,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingRuntime {
    http: BTreeMap<String, HttpHandler>,
    socket: BTreeMap<String, SocketHandler>,
}

impl ServingRuntime for RecordingRuntime {
    type Error = std::convert::Infallible;

    fn register_http(&mut self, route: &HttpRoute) -> Result<(), Self::Error> {
        self.http
            .insert(format!("{} {}", route.method, route.path), route.handler.clone());
        Ok(())
    }

    fn register_socket(&mut self, route: &SocketRoute) -> Result<(), Self::Error> {
        self.socket
            .insert(format!("{}{}", route.namespace, route.event), route.handler.clone());
        Ok(())
    }
}

fn get_order() -> Arc<dyn UseCase> {
    use_case_fn(|input| async move {
        match input.get_i64("id") {
            Some(42) => Outcome::success(json!({"status": "shipped"})),
            Some(id) => Failure::not_found(format!("order {id} does not exist")).into(),
            None => Failure::internal("id missing after resolution").into(),
        }
    })
}

fn counting(calls: Arc<AtomicUsize>) -> Arc<dyn UseCase> {
    use_case_fn(move |input| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Outcome::success(input.into_value())
        }
    })
}

fn orders_descriptor() -> UseCaseDescriptor {
    UseCaseDescriptor::new("get_order", get_order()).with_trigger(
        HttpTrigger::new(HttpMethod::Get, "/orders/{id}").with_param(
            ParameterSpec::new("id", ParamSource::Path, ParamType::Integer).required(),
        ),
    )
}

fn bound(descriptors: &[UseCaseDescriptor]) -> RecordingRuntime {
    let mut runtime = RecordingRuntime::default();
    Registrar::new()
        .register_all(descriptors, &mut runtime)
        .expect("registration must succeed");
    runtime
}

// ── Scenarios ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_existing_order_returns_ok_envelope() {
    let runtime = bound(&[orders_descriptor()]);
    let handler = &runtime.http["GET /orders/{id}"];

    let reply = handler(InboundRequest::new().with_path_param("id", "42")).await;

    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, json!({"status": "ok", "data": {"status": "shipped"}}));
}

#[tokio::test]
async fn test_get_order_with_non_numeric_id_is_400_with_field_detail() {
    let runtime = bound(&[orders_descriptor()]);
    let handler = &runtime.http["GET /orders/{id}"];

    let reply = handler(InboundRequest::new().with_path_param("id", "abc")).await;

    assert_eq!(reply.status, 400);
    assert_eq!(reply.body["status"], "error");
    assert_eq!(reply.body["kind"], "validation");
    assert_eq!(reply.body["details"], json!({"id": "not an integer"}));
}

#[tokio::test]
async fn test_use_case_not_found_passes_through_as_404() {
    let runtime = bound(&[orders_descriptor()]);
    let handler = &runtime.http["GET /orders/{id}"];

    let reply = handler(InboundRequest::new().with_path_param("id", "7")).await;

    assert_eq!(reply.status, 404);
    assert_eq!(reply.body["kind"], "not-found");
}

#[tokio::test]
async fn test_join_room_without_room_emits_validation_error_and_skips_use_case() {
    // Arrange
    let calls = Arc::new(AtomicUsize::new(0));
    let descriptor = UseCaseDescriptor::new("join_room", counting(Arc::clone(&calls)))
        .with_trigger(SocketTrigger::new("join_room").with_param(
            ParameterSpec::new("room", ParamSource::SocketPayload, ParamType::String).required(),
        ));
    let runtime = bound(&[descriptor]);
    let handler = &runtime.socket["/join_room"];

    // Act
    let emission = handler(SocketEvent::new("join_room", json!({"user": "ana"}))).await;

    // Assert
    assert_eq!(emission.event, "error");
    assert_eq!(emission.payload["kind"], "validation");
    assert_eq!(emission.payload["details"], json!({"room": "is required"}));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_join_room_success_emits_on_success_event() {
    let calls = Arc::new(AtomicUsize::new(0));
    let descriptor = UseCaseDescriptor::new("join_room", counting(Arc::clone(&calls)))
        .with_trigger(
            SocketTrigger::new("join_room")
                .with_success_event("joined")
                .with_param(
                    ParameterSpec::new("room", ParamSource::SocketPayload, ParamType::String)
                        .required(),
                ),
        );
    let runtime = bound(&[descriptor]);

    let emission = runtime.socket["/join_room"](SocketEvent::new(
        "join_room",
        json!({"room": "lobby", "ignored": true}),
    ))
    .await;

    assert_eq!(emission.event, "joined");
    assert_eq!(emission.payload, json!({"data": {"room": "lobby"}}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_two_post_items_triggers_fail_startup_naming_the_conflict() {
    let post_items = || HttpTrigger::new(HttpMethod::Post, "/items");
    let descriptors = vec![
        UseCaseDescriptor::new("create_item", get_order()).with_trigger(post_items()),
        UseCaseDescriptor::new("import_item", get_order()).with_trigger(post_items()),
    ];
    let mut runtime = RecordingRuntime::default();

    let err = Registrar::new()
        .register_all(&descriptors, &mut runtime)
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("POST /items"), "{text}");
    assert!(text.contains("create_item") && text.contains("import_item"), "{text}");
    assert!(runtime.http.is_empty());
}

#[test]
fn test_double_registration_is_rejected_the_same_way_each_time() {
    let mut registrar = Registrar::new();
    registrar
        .register_all(&[orders_descriptor()], &mut RecordingRuntime::default())
        .unwrap();

    for _ in 0..2 {
        let again =
            registrar.register_all(&[orders_descriptor()], &mut RecordingRuntime::default());
        assert!(matches!(again, Err(RegistrationError::AlreadyRegistered)));
    }
}

#[tokio::test]
async fn test_five_missing_fields_reported_in_one_error() {
    let mut trigger = HttpTrigger::new(HttpMethod::Post, "/profiles");
    for field in ["first", "last", "email", "phone", "city"] {
        trigger = trigger
            .with_param(ParameterSpec::new(field, ParamSource::Body, ParamType::String).required());
    }
    let calls = Arc::new(AtomicUsize::new(0));
    let runtime = bound(&[
        UseCaseDescriptor::new("create_profile", counting(Arc::clone(&calls)))
            .with_trigger(trigger),
    ]);

    let request = InboundRequest::new().with_json_body(json!({}));
    let reply = runtime.http["POST /profiles"](request).await;

    let details = reply.body["details"].as_object().unwrap();
    assert_eq!(reply.status, 400);
    assert_eq!(details.len(), 5);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_success_payload_round_trips_through_data() {
    let payload = json!({"nested": {"list": [1, "two", null, 3.5]}, "flag": false});
    let echoed = payload.clone();
    let descriptor = UseCaseDescriptor::new(
        "echo",
        use_case_fn(move |_| {
            let echoed = echoed.clone();
            async move { Outcome::success(echoed) }
        }),
    )
    .with_trigger(HttpTrigger::new(HttpMethod::Get, "/echo"));
    let runtime = bound(&[descriptor]);

    let (status, bytes) = runtime.http["GET /echo"](InboundRequest::new()).await.into_wire();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(status, 200);
    assert_eq!(body["data"], payload);
}
