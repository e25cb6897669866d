//! # WebSocket Handler
//!
//! `GET /api/ws?token=<jwt>` upgrades to the realtime event stream.
//!
//! Browsers cannot set headers on WebSocket requests, so the JWT travels as
//! a query parameter. A bad token still gets an upgrade, then an immediate
//! close with code 1008 and the rejection reason ("Token missing",
//! "Token expired" or "Invalid token") so clients can distinguish re-login
//! from retry.
//!
//! On connect, the socket is auto-subscribed to its user's direct channel.
//! Conversation rooms are joined and left explicitly with
//! `conversation:join` / `conversation:leave` frames; membership is checked
//! on join. Disconnecting drops every room subscription implicitly.

use crate::realtime::events::{ClientEvent, RealtimeEvent};
use crate::realtime::fanout::Frame;
use crate::server::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use lib_auth::{decode_jwt_strict, Claims, TokenRejection};
use lib_core::model::store::ConversationRepository;
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamMap;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct WsAuthParams {
    pub token: Option<String>,
}

/// WebSocket endpoint. Authenticates before entering the event loop.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsAuthParams>,
    State(state): State<AppState>,
) -> Response {
    let auth = match params.token.as_deref() {
        None => Err(TokenRejection::Missing),
        Some(token) => decode_jwt_strict(token, &state.config.jwt_secret),
    };

    match auth {
        Ok(claims) => ws.on_upgrade(move |socket| handle_socket(socket, state, claims)),
        Err(rejection) => {
            warn!("[WS] Rejecting connection: {}", rejection.reason());
            ws.on_upgrade(move |socket| reject_socket(socket, rejection))
        }
    }
}

/// Close the socket with a policy-violation frame carrying the reason.
async fn reject_socket(mut socket: WebSocket, rejection: TokenRejection) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: rejection.reason().into(),
    };
    let _ = socket.send(WsMessage::Close(Some(frame))).await;
}

/// Per-connection event loop: forward direct-channel and joined-room frames
/// out, handle join/leave/typing frames coming in.
async fn handle_socket(socket: WebSocket, state: AppState, claims: Claims) {
    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(err) => {
            warn!("[WS] Malformed subject claim: {}", err);
            let frame = CloseFrame {
                code: close_code::POLICY,
                reason: TokenRejection::Invalid.reason().into(),
            };
            let (mut sink, _) = socket.split();
            let _ = sink.send(WsMessage::Close(Some(frame))).await;
            return;
        }
    };
    let username = claims.username.clone();

    info!("[WS] Connected: {} (id: {})", username, user_id);

    let mut direct = BroadcastStream::new(state.fanout.subscribe_user(user_id).await);
    let mut rooms: StreamMap<i64, BroadcastStream<Frame>> = StreamMap::new();
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            frame = direct.next() => {
                match frame {
                    Some(Ok(frame)) => {
                        if forward(&mut sink, user_id, frame).await.is_err() {
                            break;
                        }
                    }
                    Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                        // Slow consumer; it can re-sync over REST
                        warn!("[WS] User {} lagged, {} events dropped", user_id, skipped);
                    }
                    None => break,
                }
            }
            // An empty StreamMap yields None, which disables this branch
            Some((room_id, frame)) = rooms.next() => {
                match frame {
                    Ok(frame) => {
                        if forward(&mut sink, user_id, frame).await.is_err() {
                            break;
                        }
                    }
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!(
                            "[WS] User {} lagged in room {}, {} events dropped",
                            user_id, room_id, skipped
                        );
                    }
                }
            }
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(raw))) => {
                        handle_client_event(&state, user_id, &username, raw.as_str(), &mut rooms)
                            .await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {} // binary and ping/pong frames are ignored
                    Some(Err(err)) => {
                        debug!("[WS] Receive error for user {}: {}", user_id, err);
                        break;
                    }
                }
            }
        }
    }

    let joined: Vec<i64> = rooms.iter().map(|(room_id, _)| *room_id).collect();
    drop(rooms);
    drop(direct);
    for room_id in joined {
        state.fanout.prune_room(room_id).await;
    }
    state.fanout.prune_user(user_id).await;
    info!("[WS] Disconnected: {} (id: {})", username, user_id);
}

/// Send one frame out unless it is marked excluded for this connection.
async fn forward(
    sink: &mut SplitSink<WebSocket, WsMessage>,
    user_id: i64,
    frame: Frame,
) -> Result<(), axum::Error> {
    if frame.exclude == Some(user_id) {
        return Ok(());
    }
    sink.send(WsMessage::Text(frame.payload.into())).await
}

/// Parse and dispatch one client frame. Joins are membership-checked
/// against the database; typing frames only relay into rooms this
/// connection has joined and exclude the originator. Typing state is
/// ephemeral: nothing is persisted.
async fn handle_client_event(
    state: &AppState,
    user_id: i64,
    username: &str,
    raw: &str,
    rooms: &mut StreamMap<i64, BroadcastStream<Frame>>,
) {
    let event: ClientEvent = match serde_json::from_str(raw) {
        Ok(event) => event,
        Err(err) => {
            debug!("[WS] Ignoring unparseable client event: {}", err);
            return;
        }
    };

    match event {
        ClientEvent::ConversationJoin { conversation_id } => {
            match ConversationRepository::is_participant(&state.db, conversation_id, user_id).await
            {
                Ok(true) => {}
                Ok(false) => {
                    debug!(
                        "[WS] User {} tried to join conversation {} they are not in",
                        user_id, conversation_id
                    );
                    return;
                }
                Err(err) => {
                    warn!("[WS] Membership check failed: {}", err);
                    return;
                }
            }
            let receiver = state.fanout.join_room(conversation_id).await;
            rooms.insert(conversation_id, BroadcastStream::new(receiver));
            debug!("[WS] User {} joined room {}", user_id, conversation_id);
        }
        ClientEvent::ConversationLeave { conversation_id } => {
            if rooms.remove(&conversation_id).is_some() {
                state.fanout.prune_room(conversation_id).await;
                debug!("[WS] User {} left room {}", user_id, conversation_id);
            }
        }
        ClientEvent::TypingStart { conversation_id } | ClientEvent::TypingStop { conversation_id }
            if !rooms.contains_key(&conversation_id) =>
        {
            debug!(
                "[WS] Dropping typing frame from user {} for unjoined room {}",
                user_id, conversation_id
            );
        }
        ClientEvent::TypingStart { conversation_id } => {
            state
                .fanout
                .publish_to_room(
                    conversation_id,
                    &RealtimeEvent::TypingStart {
                        conversation_id,
                        user_id,
                        username: username.to_string(),
                    },
                    Some(user_id),
                )
                .await;
        }
        ClientEvent::TypingStop { conversation_id } => {
            state
                .fanout
                .publish_to_room(
                    conversation_id,
                    &RealtimeEvent::TypingStop {
                        conversation_id,
                        user_id,
                        username: username.to_string(),
                    },
                    Some(user_id),
                )
                .await;
        }
    }
}
