//! Namespace-scoped routing of WebSocket events to synthesized handlers.
//!
//! The dispatcher is the socket half of the serving runtime: the registrar
//! hands it every [`SocketRoute`] and the WebSocket server asks it two things,
//! "is this namespace served?" at handshake time and "answer this frame"
//! afterwards.  It never touches a socket itself, so it is tested without a
//! network.

use std::collections::HashMap;
use std::convert::Infallible;

use serde_json::Value;
use tracing::debug;
use trigger_core::{
    failure_emission, Failure, HttpRoute, ServingRuntime, SocketEvent, SocketHandler, SocketRoute,
};

use crate::domain::{InboundFrame, OutboundFrame};

/// Event handlers grouped by namespace.
#[derive(Clone, Default)]
pub struct SocketDispatcher {
    namespaces: HashMap<String, HashMap<String, SocketHandler>>,
}

impl SocketDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    pub fn event_count(&self) -> usize {
        self.namespaces.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Answers one text frame received on `namespace`.
    ///
    /// Always produces exactly one reply: malformed frames become
    /// `validation` errors, unknown events `not-found` errors.
    pub async fn handle_text(&self, namespace: &str, text: &str) -> OutboundFrame {
        match InboundFrame::parse(text) {
            Ok(frame) => self.dispatch(namespace, frame).await,
            Err(e) => {
                debug!(namespace, "malformed frame: {e}");
                let failure = Failure::validation(format!("malformed frame: {e}"));
                let id = InboundFrame::salvage_id(text);
                OutboundFrame::from_emission(failure_emission(&failure), id)
            }
        }
    }

    /// Runs the handler bound to `frame.event` in `namespace`.
    pub async fn dispatch(&self, namespace: &str, frame: InboundFrame) -> OutboundFrame {
        let InboundFrame { event, data, id } = frame;
        let handler = self
            .namespaces
            .get(namespace)
            .and_then(|events| events.get(&event))
            .cloned();

        let emission = match handler {
            Some(handler) => handler(SocketEvent::new(event, data)).await,
            None => {
                debug!(namespace, event = %event, "no handler bound");
                failure_emission(&Failure::not_found(format!(
                    "no handler for event '{event}' in namespace '{namespace}'"
                )))
            }
        };
        OutboundFrame::from_emission(emission, id)
    }

    /// Replies to a binary frame, which this protocol does not use.
    pub fn binary_rejected() -> OutboundFrame {
        let failure = Failure::validation("binary frames are not supported; send JSON text");
        OutboundFrame::from_emission(failure_emission(&failure), None::<Value>)
    }
}

impl ServingRuntime for SocketDispatcher {
    type Error = Infallible;

    fn register_http(&mut self, _route: &HttpRoute) -> Result<(), Self::Error> {
        Ok(())
    }

    fn register_socket(&mut self, route: &SocketRoute) -> Result<(), Self::Error> {
        self.namespaces
            .entry(route.namespace.clone())
            .or_default()
            .insert(route.event.clone(), route.handler.clone());
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use trigger_core::{
        use_case_fn, Outcome, ParamSource, ParamType, ParameterSpec, Registrar, SocketTrigger,
        UseCaseDescriptor,
    };

    fn chat_dispatcher() -> SocketDispatcher {
        let join = use_case_fn(|input| async move {
            Outcome::success(json!({ "joined": input.get_str("room") }))
        });
        let descriptors = vec![UseCaseDescriptor::new("join_room", join).with_trigger(
            SocketTrigger::new("join_room").in_namespace("/chat").with_param(
                ParameterSpec::new("room", ParamSource::SocketPayload, ParamType::String)
                    .required(),
            ),
        )];
        let mut dispatcher = SocketDispatcher::new();
        Registrar::new()
            .register_all(&descriptors, &mut dispatcher)
            .unwrap();
        dispatcher
    }

    #[tokio::test]
    async fn test_known_event_answers_on_success_event_with_id() {
        // Arrange
        let dispatcher = chat_dispatcher();

        // Act
        let reply = dispatcher
            .handle_text("/chat", r#"{"event":"join_room","data":{"room":"lobby"},"id":1}"#)
            .await;

        // Assert
        assert_eq!(reply.event, "join_room:ok");
        assert_eq!(reply.payload["data"], json!({"joined": "lobby"}));
        assert_eq!(reply.id, Some(json!(1)));
    }

    #[tokio::test]
    async fn test_missing_field_answers_validation_error() {
        let dispatcher = chat_dispatcher();

        let reply = dispatcher
            .handle_text("/chat", r#"{"event":"join_room","data":{}}"#)
            .await;

        assert_eq!(reply.event, "error");
        assert_eq!(reply.payload["kind"], "validation");
    }

    #[tokio::test]
    async fn test_unknown_event_answers_not_found() {
        let dispatcher = chat_dispatcher();

        let reply = dispatcher.handle_text("/chat", r#"{"event":"leave_room"}"#).await;

        assert_eq!(reply.event, "error");
        assert_eq!(reply.payload["kind"], "not-found");
    }

    #[tokio::test]
    async fn test_event_is_scoped_to_its_namespace() {
        let dispatcher = chat_dispatcher();

        let reply = dispatcher
            .handle_text("/", r#"{"event":"join_room","data":{"room":"x"}}"#)
            .await;

        assert_eq!(reply.payload["kind"], "not-found");
    }

    #[tokio::test]
    async fn test_malformed_frame_answers_validation_and_keeps_id() {
        let dispatcher = chat_dispatcher();

        let reply = dispatcher.handle_text("/chat", r#"{"id":9,"data":{}}"#).await;

        assert_eq!(reply.event, "error");
        assert_eq!(reply.payload["kind"], "validation");
        assert_eq!(reply.id, Some(json!(9)));
    }

    #[test]
    fn test_namespaces_known_after_registration() {
        let dispatcher = chat_dispatcher();

        assert!(dispatcher.has_namespace("/chat"));
        assert!(!dispatcher.has_namespace("/"));
        assert_eq!(dispatcher.event_count(), 1);
    }
}
