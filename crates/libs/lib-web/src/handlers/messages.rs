//! # Message Handlers
//!
//! Sending and reading messages. Delivery to the conversation room happens
//! through the fanout after the database write succeeds; the HTTP response
//! is the sender's acknowledgement, so they are excluded from the broadcast.

use crate::realtime::RealtimeEvent;
use crate::server::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use lib_auth::Claims;
use lib_core::dto::{MarkReadResponse, SendMessageRequest, StatusResponse};
use lib_core::model::store::models::MessageWithSender;
use lib_core::model::store::MessageRepository;
use lib_core::{AppError, Result};
use tracing::{info, instrument};

/// Send a message into a conversation.
///
/// **Route**: `POST /api/conversations/{id}/messages`
///
/// If a bot participates, a reply is triggered in the background; the
/// response never waits on generation.
#[instrument(skip(state, claims, req))]
pub async fn send(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageWithSender>)> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let message = MessageRepository::create(
        &state.db,
        conversation_id,
        user_id,
        &req.text,
        req.image_url.as_deref(),
    )
    .await?;

    state
        .fanout
        .publish_to_room(
            conversation_id,
            &RealtimeEvent::MessageReceive {
                message: message.clone(),
            },
            Some(user_id),
        )
        .await;

    state.bot.trigger_reply(conversation_id, user_id);

    info!(
        "[MESSAGE] User {} sent message {} in conversation {}",
        user_id, message.id, conversation_id
    );

    Ok((StatusCode::CREATED, Json(message)))
}

/// Fetch a conversation's message history, oldest first.
///
/// **Route**: `GET /api/conversations/{id}/messages`
#[instrument(skip(state, claims))]
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<Vec<MessageWithSender>>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let messages =
        MessageRepository::list_for_participant(&state.db, conversation_id, user_id).await?;
    Ok(Json(messages))
}

/// Mark a single message as read.
///
/// **Route**: `PUT /api/messages/{id}/read`
///
/// Idempotent; the read receipt only fires when the flag actually flips.
#[instrument(skip(state, claims))]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<i64>,
) -> Result<Json<MarkReadResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let (conversation_id, flipped) =
        MessageRepository::mark_read_by_id(&state.db, message_id, user_id).await?;

    if flipped {
        state
            .fanout
            .publish_to_room(
                conversation_id,
                &RealtimeEvent::MessageRead {
                    conversation_id,
                    reader_id: user_id,
                    updated: 1,
                },
                None,
            )
            .await;
    }

    Ok(Json(MarkReadResponse {
        updated: if flipped { 1 } else { 0 },
    }))
}

/// Delete one of your own messages.
///
/// **Route**: `DELETE /api/messages/{id}`
#[instrument(skip(state, claims))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(message_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    MessageRepository::delete(&state.db, message_id, user_id).await?;

    info!("[MESSAGE] User {} deleted message {}", user_id, message_id);

    Ok(Json(StatusResponse {
        message: "Message deleted".to_string(),
    }))
}
