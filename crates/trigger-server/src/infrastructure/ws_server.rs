//! WebSocket server: accept loop and per-connection task management.
//!
//! This module is responsible for:
//!
//! 1. Accepting incoming TCP connections on the WebSocket listener.
//! 2. Upgrading each connection to a WebSocket session, rejecting the
//!    handshake with `404` when its URL path is not a served namespace.
//! 3. Reading JSON text frames and answering each one through the
//!    [`SocketDispatcher`], strictly in arrival order.
//! 4. Stopping the accept loop and closing sessions when the shutdown signal
//!    fires.
//!
//! # Scalability
//!
//! Each session runs in its own Tokio task; the accept loop never waits on a
//! session.  Inside one session frames are handled one at a time, so a client
//! always receives replies in the order it sent events.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::SocketDispatcher;
use crate::domain::OutboundFrame;

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the WebSocket accept loop on `listener` until `shutdown` flips to
/// `true`.
///
/// # Errors
///
/// Returns an error if the listener has no local address.  Per-connection
/// failures are logged and never end the loop.
pub async fn run_server(
    listener: TcpListener,
    dispatcher: Arc<SocketDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let addr = listener
        .local_addr()
        .context("WebSocket listener has no local address")?;
    info!(%addr, events = dispatcher.event_count(), "WebSocket server listening");

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer_addr)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        handle_connection(stream, peer_addr, dispatcher, shutdown).await;
                    });
                }
                Err(e) => {
                    // Transient accept error (e.g., too many open file descriptors).
                    error!("accept error: {e}");
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    info!("WebSocket server stopped");
    Ok(())
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Top-level handler for one connection.  Wraps [`run_session`] and logs how
/// it ended.
async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    dispatcher: Arc<SocketDispatcher>,
    shutdown: watch::Receiver<bool>,
) {
    let session_id = Uuid::new_v4();
    match run_session(stream, peer_addr, session_id, dispatcher, shutdown).await {
        Ok(()) => info!(%session_id, %peer_addr, "session closed"),
        Err(e) => warn!(%session_id, %peer_addr, "session closed with error: {e:#}"),
    }
}

/// Handshake, then the frame loop.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    session_id: Uuid,
    dispatcher: Arc<SocketDispatcher>,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    // ── Handshake: the URL path selects the namespace ─────────────────────────
    let mut namespace = None;
    let select_namespace = |request: &Request, response: Response| {
        let path = request.uri().path();
        if dispatcher.has_namespace(path) {
            namespace = Some(path.to_owned());
            Ok(response)
        } else {
            Err(reject_namespace(path))
        }
    };
    let ws_stream = accept_hdr_async(stream, select_namespace)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;
    let namespace = namespace.context("handshake accepted without a namespace")?;

    info!(%session_id, %peer_addr, namespace = %namespace, "WebSocket session established");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // ── Frame loop ─────────────────────────────────────────────────────────────
    loop {
        let message = tokio::select! {
            next = ws_rx.next() => next,
            _ = shutdown.changed() => {
                debug!(%session_id, "shutdown; closing session");
                ws_tx.send(WsMessage::Close(None)).await.ok();
                break;
            }
        };

        let message = match message {
            Some(Ok(msg)) => msg,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) => {
                debug!(%session_id, "client WebSocket closed");
                break;
            }
            Some(Err(e)) => {
                warn!(%session_id, "WebSocket error: {e}");
                break;
            }
            None => {
                debug!(%session_id, "client stream ended");
                break;
            }
        };

        let reply = match message {
            WsMessage::Text(text) => dispatcher.handle_text(&namespace, &text).await,
            WsMessage::Binary(_) => SocketDispatcher::binary_rejected(),
            WsMessage::Close(_) => {
                debug!(%session_id, "client sent close frame");
                break;
            }
            // Ping/Pong are answered by tungstenite itself.
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => continue,
        };

        debug!(%session_id, event = %reply.event, "replying");
        if !send_frame(&mut ws_tx, &reply).await {
            debug!(%session_id, "send failed (client disconnected)");
            break;
        }
    }

    Ok(())
}

/// Writes one frame; `false` when the client is gone.
async fn send_frame<S>(sink: &mut S, frame: &OutboundFrame) -> bool
where
    S: SinkExt<WsMessage> + Unpin,
{
    match frame.to_text() {
        Ok(text) => sink.send(WsMessage::Text(text)).await.is_ok(),
        Err(e) => {
            error!("failed to encode outbound frame: {e}");
            true
        }
    }
}

fn reject_namespace(path: &str) -> ErrorResponse {
    debug!(namespace = path, "handshake for unknown namespace rejected");
    let mut response = ErrorResponse::new(Some(format!("unknown namespace '{path}'")));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}
