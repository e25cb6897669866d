//! # Realtime Events
//!
//! Wire format for the WebSocket layer. Server-to-client events are tagged
//! with an `event` field; client-to-server events use the same shape.
//!
//! ```json
//! {"event":"message:receive","data":{"message":{...}}}
//! {"event":"typing:start","data":{"conversation_id":1,"user_id":2,"username":"bob"}}
//! ```

use lib_core::model::store::models::MessageWithSender;
use serde::{Deserialize, Serialize};

/// Server-to-client event, serialized onto the socket as tagged JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    /// A new message in one of the recipient's conversations.
    #[serde(rename = "message:receive")]
    MessageReceive { message: MessageWithSender },

    /// Someone marked the conversation read.
    #[serde(rename = "message:read")]
    MessageRead {
        conversation_id: i64,
        reader_id: i64,
        updated: u64,
    },

    /// A participant started typing.
    #[serde(rename = "typing:start")]
    TypingStart {
        conversation_id: i64,
        user_id: i64,
        username: String,
    },

    /// A participant stopped typing.
    #[serde(rename = "typing:stop")]
    TypingStop {
        conversation_id: i64,
        user_id: i64,
        username: String,
    },

    /// The recipient was added to a new conversation.
    #[serde(rename = "conversation:created")]
    ConversationCreated { conversation_id: i64 },
}

/// Client-to-server event. Room membership and typing indicators are the
/// only client-initiated realtime traffic; everything else goes through
/// REST.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Start receiving events for a conversation the client is viewing.
    #[serde(rename = "conversation:join")]
    ConversationJoin { conversation_id: i64 },
    /// Stop receiving events for a conversation.
    #[serde(rename = "conversation:leave")]
    ConversationLeave { conversation_id: i64 },
    #[serde(rename = "typing:start")]
    TypingStart { conversation_id: i64 },
    #[serde(rename = "typing:stop")]
    TypingStop { conversation_id: i64 },
}
