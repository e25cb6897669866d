//! # Conversation Handlers
//!
//! Conversation lifecycle endpoints. Every fetch goes through the
//! membership-gated repository paths, so a non-participant receives 403
//! whether or not the conversation id exists.

use crate::realtime::RealtimeEvent;
use crate::server::AppState;
use axum::{
    extract::{Extension, Json, Path, State},
    http::StatusCode,
};
use lib_auth::Claims;
use lib_core::dto::{
    AddParticipantRequest, ConversationResponse, CreateConversationRequest, MarkReadResponse,
    RenameConversationRequest, StatusResponse,
};
use lib_core::model::store::models::Conversation;
use lib_core::model::store::{ConversationRepository, MessageRepository};
use lib_core::{AppError, DbPool, Result};
use tracing::{info, instrument, warn};

/// Assemble the full response shape for one conversation as seen by
/// `user_id`: participants, preview message and unread count.
async fn build_response(
    pool: &DbPool,
    conversation: &Conversation,
    user_id: i64,
) -> Result<ConversationResponse> {
    let participants = ConversationRepository::participants(pool, conversation.id).await?;
    let last_message = MessageRepository::last_in_conversation(pool, conversation.id).await?;
    let unread_count = MessageRepository::unread_count(pool, conversation.id, user_id).await?;
    Ok(ConversationResponse::from_parts(
        conversation,
        participants,
        last_message,
        unread_count,
    ))
}

/// Create a conversation.
///
/// **Route**: `POST /api/conversations`
///
/// Direct conversations are idempotent: re-creating one with the same
/// counterpart returns `200 OK` and the existing conversation instead of
/// `201 Created`. When a fresh direct conversation is with a bot that has a
/// greeting configured, the greeting is posted (after a short deliberate
/// delay) before the response is built, so the response already carries it.
/// Only creation triggers the greeting, so an idempotent re-create can
/// never double-send it.
#[instrument(skip(state, claims, req))]
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>)> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let (conversation, created) = ConversationRepository::create(
        &state.db,
        user_id,
        &req.participant_ids,
        req.name.clone(),
        req.is_group,
    )
    .await?;

    if created {
        info!(
            "[CONVERSATION] Created conversation {} (group: {})",
            conversation.id, conversation.is_group
        );

        state
            .fanout
            .publish_to_users(
                &req.participant_ids,
                &RealtimeEvent::ConversationCreated {
                    conversation_id: conversation.id,
                },
                Some(user_id),
            )
            .await;

        if !conversation.is_group {
            if let Some(bot) = state.bot.find_bot_participant(conversation.id).await? {
                if let Err(err) = state.bot.post_initial_message(conversation.id, bot).await {
                    warn!(
                        "[BOT] Initial message failed for conversation {}: {}",
                        conversation.id, err
                    );
                }
            }
        }
    }

    let response = build_response(&state.db, &conversation, user_id).await?;
    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(response)))
}

/// List the authenticated user's conversations, most recently active first.
///
/// **Route**: `GET /api/conversations`
#[instrument(skip(state, claims))]
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConversationResponse>>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let conversations = ConversationRepository::list_for_user(&state.db, user_id).await?;
    let mut responses = Vec::with_capacity(conversations.len());
    for conversation in &conversations {
        responses.push(build_response(&state.db, conversation, user_id).await?);
    }
    Ok(Json(responses))
}

/// Fetch one conversation.
///
/// **Route**: `GET /api/conversations/{id}`
#[instrument(skip(state, claims))]
pub async fn get(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<ConversationResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let conversation =
        ConversationRepository::get_for_participant(&state.db, conversation_id, user_id).await?;
    let response = build_response(&state.db, &conversation, user_id).await?;
    Ok(Json(response))
}

/// Rename a group conversation. On a direct conversation the name is
/// cleared instead, since those are always unnamed.
///
/// **Route**: `PUT /api/conversations/{id}`
#[instrument(skip(state, claims, req))]
pub async fn rename(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
    Json(req): Json<RenameConversationRequest>,
) -> Result<Json<ConversationResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let conversation =
        ConversationRepository::update_name(&state.db, conversation_id, user_id, req.name.trim())
            .await?;
    let response = build_response(&state.db, &conversation, user_id).await?;
    Ok(Json(response))
}

/// Add a participant to a group conversation.
///
/// **Route**: `POST /api/conversations/{id}/participants`
#[instrument(skip(state, claims, req))]
pub async fn add_participant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
    Json(req): Json<AddParticipantRequest>,
) -> Result<Json<StatusResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    ConversationRepository::add_participant(&state.db, conversation_id, user_id, req.user_id)
        .await?;

    state
        .fanout
        .publish_to_users(
            &[req.user_id],
            &RealtimeEvent::ConversationCreated { conversation_id },
            None,
        )
        .await;

    info!(
        "[CONVERSATION] User {} added {} to conversation {}",
        user_id, req.user_id, conversation_id
    );

    Ok(Json(StatusResponse {
        message: "Participant added".to_string(),
    }))
}

/// Leave a group conversation. Direct conversations cannot be left.
///
/// **Route**: `POST /api/conversations/{id}/leave`
#[instrument(skip(state, claims))]
pub async fn leave(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    ConversationRepository::remove_participant(&state.db, conversation_id, user_id).await?;

    info!("[CONVERSATION] User {} left conversation {}", user_id, conversation_id);

    Ok(Json(StatusResponse {
        message: "Left conversation".to_string(),
    }))
}

/// Delete a conversation and its history.
///
/// **Route**: `DELETE /api/conversations/{id}`
#[instrument(skip(state, claims))]
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<StatusResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    ConversationRepository::delete(&state.db, conversation_id, user_id).await?;

    info!("[CONVERSATION] User {} deleted conversation {}", user_id, conversation_id);

    Ok(Json(StatusResponse {
        message: "Conversation deleted".to_string(),
    }))
}

/// Mark everything from other senders as read.
///
/// **Route**: `PUT /api/conversations/{id}/read`
///
/// Idempotent: a second call reports `updated: 0`. The room gets a
/// `message:read` event including the marker's own other sessions, so every
/// view of the conversation flips its read receipts together.
#[instrument(skip(state, claims))]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(conversation_id): Path<i64>,
) -> Result<Json<MarkReadResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let updated = ConversationRepository::mark_read(&state.db, conversation_id, user_id).await?;

    if updated > 0 {
        state
            .fanout
            .publish_to_room(
                conversation_id,
                &RealtimeEvent::MessageRead {
                    conversation_id,
                    reader_id: user_id,
                    updated,
                },
                None,
            )
            .await;
    }

    Ok(Json(MarkReadResponse { updated }))
}

/// Remove another user from a group conversation.
///
/// **Route**: `DELETE /api/conversations/{id}/participants/{user_id}`
#[instrument(skip(state, claims))]
pub async fn remove_participant(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((conversation_id, target_user_id)): Path<(i64, i64)>,
) -> Result<Json<StatusResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    ConversationRepository::remove_other_participant(
        &state.db,
        conversation_id,
        user_id,
        target_user_id,
    )
    .await?;

    info!(
        "[CONVERSATION] User {} removed {} from conversation {}",
        user_id, target_user_id, conversation_id
    );

    Ok(Json(StatusResponse {
        message: "Participant removed".to_string(),
    }))
}
