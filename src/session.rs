//! Per-connection I/O loop (C7): accepts a WebSocket upgrade, gates
//! authenticated host connections, and routes inbound frames to the right
//! room actor's queue while draining that room's broadcast stream back to
//! the socket.
//!
//! Grounded on `congress/src/ws.rs`'s `ws_handler`/`handle_socket`
//! split-socket read/write task shape (an inbound loop over
//! `StreamExt::next`, an outbound task draining a channel, both joined on
//! disconnect) and `congress/src/auth.rs`'s query-string extraction idiom
//! (adapted here from an HTTP Basic Auth header to the bearer
//! `?token=` query parameter described in §6).

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;

use crate::abuse::AbuseConfig;
use crate::auth::{self, TokenVerifier};
use crate::directory::GameDirectory;
use crate::protocol::{self, ClientMessage, HostAction, ServerMessage, TeamAction, WatcherAction};
use crate::room::actor::RoomHandle;
use crate::room::outbound;

/// Consecutive malformed frames tolerated before the session is closed
/// (§7 "close the session if it recurs, otherwise reply `error` and
/// continue").
const MAX_MALFORMED_FRAMES: u32 = 5;

#[derive(Clone)]
pub struct AppServices {
    pub directory: Arc<GameDirectory>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub abuse: Arc<AbuseConfig>,
}

pub async fn health() -> &'static str {
    "ok"
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    State(services): State<Arc<AppServices>>,
) -> impl IntoResponse {
    let token = params.get("token").cloned();
    ws.on_upgrade(move |socket| handle_socket(socket, services, token))
}

async fn handle_socket(socket: WebSocket, services: Arc<AppServices>, token: Option<String>) {
    let session_id = ulid::Ulid::new().to_string();

    if !services.abuse.allow(token.as_deref()).await {
        tracing::debug!(session_id = %session_id, "connection rate limited");
        return;
    }

    let (mut ws_tx, mut ws_rx) = socket.split();
    let (outbound_tx, mut outbound_rx) = outbound::channel(outbound::DEFAULT_CAPACITY);

    let writer = tokio::spawn(async move {
        loop {
            let message = outbound_rx.recv().await;
            let frame = protocol::encode_server_message(&message);
            if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut bound_room: Option<RoomHandle> = None;
    let mut malformed_count = 0u32;

    while let Some(Ok(message)) = ws_rx.next().await {
        let Message::Text(text) = message else {
            if matches!(message, Message::Close(_)) {
                break;
            }
            continue;
        };

        match protocol::decode_client_message(&text) {
            Err(err) => {
                malformed_count += 1;
                outbound_tx.push(ServerMessage::error(format!("malformed message: {err}")));
                if malformed_count >= MAX_MALFORMED_FRAMES {
                    tracing::warn!(session_id = %session_id, "closing session after repeated malformed frames");
                    break;
                }
            }
            Ok(client_message) => {
                malformed_count = 0;
                dispatch(
                    &services,
                    &session_id,
                    &outbound_tx,
                    &mut bound_room,
                    token.as_deref(),
                    client_message,
                )
                .await;
            }
        }
    }

    if let Some(room) = bound_room {
        room.detach(session_id).await;
    }
    writer.abort();
}

async fn dispatch(
    services: &Arc<AppServices>,
    session_id: &str,
    outbound_tx: &outbound::OutboundTx,
    bound_room: &mut Option<RoomHandle>,
    token: Option<&str>,
    message: ClientMessage,
) {
    match &message {
        ClientMessage::Host(HostAction::CreateGame { game_code }) => {
            if let Err(err) = authorize_host(services, token).await {
                outbound_tx.push(ServerMessage::error(err.to_string()));
                return;
            }
            match services.directory.create_or_attach(game_code.clone()).await {
                Ok(handle) => {
                    *bound_room = Some(handle.clone());
                    handle
                        .send_inbound(session_id.to_string(), outbound_tx.clone(), message)
                        .await;
                }
                Err(err) => outbound_tx.push(ServerMessage::error(err.to_string())),
            }
        }
        ClientMessage::Host(_) => forward_or_reject(bound_room, session_id, outbound_tx, message).await,
        ClientMessage::Team(TeamAction::ValidateJoin { game_code, .. })
        | ClientMessage::Team(TeamAction::JoinGame { game_code, .. }) => {
            match services.directory.resolve(game_code).await {
                Ok(handle) => {
                    *bound_room = Some(handle.clone());
                    handle
                        .send_inbound(session_id.to_string(), outbound_tx.clone(), message)
                        .await;
                }
                Err(err) => outbound_tx.push(ServerMessage::error(err.to_string())),
            }
        }
        ClientMessage::Team(TeamAction::SubmitAnswer { .. }) => {
            forward_or_reject(bound_room, session_id, outbound_tx, message).await
        }
        ClientMessage::Watcher(WatcherAction::Subscribe { game_code }) => {
            match services.directory.resolve(game_code).await {
                Ok(handle) => {
                    *bound_room = Some(handle.clone());
                    handle
                        .send_inbound(session_id.to_string(), outbound_tx.clone(), message)
                        .await;
                }
                Err(err) => outbound_tx.push(ServerMessage::error(err.to_string())),
            }
        }
    }
}

async fn forward_or_reject(
    bound_room: &Option<RoomHandle>,
    session_id: &str,
    outbound_tx: &outbound::OutboundTx,
    message: ClientMessage,
) {
    match bound_room {
        Some(handle) => {
            handle
                .send_inbound(session_id.to_string(), outbound_tx.clone(), message)
                .await
        }
        None => outbound_tx.push(ServerMessage::error(
            "no game joined yet on this connection".to_string(),
        )),
    }
}

async fn authorize_host(
    services: &Arc<AppServices>,
    token: Option<&str>,
) -> Result<(), crate::error::RoomError> {
    let token = token.ok_or(crate::error::RoomError::Unauthenticated)?;
    let claims = services.verifier.verify(token).await?;
    auth::require_host_group(&claims)
}
