//! # Conversation and Message Data Transfer Objects
//!
//! - `POST /api/conversations` - [`CreateConversationRequest`] -> [`ConversationResponse`]
//! - `GET /api/conversations` -> `Vec<ConversationResponse>`
//! - `POST /api/conversations/{id}/messages` - [`SendMessageRequest`]
//! - `PUT /api/conversations/{id}/read` -> [`MarkReadResponse`]

use crate::model::store::models::{Conversation, MessageWithSender, ParticipantInfo};
use lib_utils::format_time;
use serde::{Deserialize, Serialize};

/// Create a conversation. A direct conversation names exactly one other
/// participant and no `name`; re-creating one returns the existing row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateConversationRequest {
    pub participant_ids: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub is_group: bool,
}

/// A conversation with everything a list view needs. Response-only: the
/// nested model rows serialize but never come back in on this shape.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationResponse {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub is_group: bool,
    pub participants: Vec<ParticipantInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessageWithSender>,
    pub unread_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ConversationResponse {
    pub fn from_parts(
        conversation: &Conversation,
        participants: Vec<ParticipantInfo>,
        last_message: Option<MessageWithSender>,
        unread_count: i64,
    ) -> Self {
        Self {
            id: conversation.id,
            name: conversation.name.clone(),
            is_group: conversation.is_group,
            participants,
            last_message,
            unread_count,
            created_at: format_time(conversation.created_at),
            updated_at: format_time(conversation.updated_at),
        }
    }
}

/// Rename a group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenameConversationRequest {
    pub name: String,
}

/// Add a participant to a group conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddParticipantRequest {
    pub user_id: i64,
}

/// Send a message. Requires text, an image reference, or both.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Result of a mark-read call: how many messages flipped to read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkReadResponse {
    pub updated: u64,
}
