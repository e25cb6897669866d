use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User entity representing a complete user record from the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_bot: bool,
    pub bot_system_prompt: Option<String>,
    pub bot_quotes: Option<String>,
    pub bot_initial_message: Option<String>,
    pub reset_token: Option<String>,
    pub reset_token_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Classify this account as human or bot.
    ///
    /// Bot detection is a type-level case: downstream code matches on
    /// [`UserKind`] instead of probing boolean flags.
    pub fn kind(&self) -> UserKind {
        if self.is_bot {
            UserKind::Bot(BotPersona {
                system_prompt: self.bot_system_prompt.clone().unwrap_or_default(),
                quotes: self
                    .bot_quotes
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
                    .unwrap_or_default(),
                initial_message: self.bot_initial_message.clone(),
            })
        } else {
            UserKind::Human
        }
    }
}

/// Tagged account variant: a user is either a human or a bot with a persona.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserKind {
    Human,
    Bot(BotPersona),
}

/// Persona driving a bot account's auto-replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotPersona {
    /// System prompt for the generation API.
    pub system_prompt: String,
    /// Flavor quotes, sampled into the system prompt as optional seasoning.
    pub quotes: Vec<String>,
    /// Message the bot sends when a conversation with it is first created.
    pub initial_message: Option<String>,
}

/// Data structure for creating a new user.
///
/// Password must be hashed before creating.
#[derive(Debug, Clone)]
pub struct UserForCreate {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

impl UserForCreate {
    pub fn new(username: String, email: String, password_hash: String) -> Self {
        Self {
            username,
            email,
            password_hash,
        }
    }
}

/// User profile, 1:1 with a user row.
///
/// `image_url` is an owned reference into external blob storage; the profile
/// row is the source of truth for the current image.
#[derive(Debug, Clone, FromRow)]
pub struct UserProfile {
    pub user_id: i64,
    pub display_name: String,
    pub bio: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileForUpdate {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub image_url: Option<String>,
}

/// Conversation entity. Owns its participants and messages.
#[derive(Debug, Clone, FromRow)]
pub struct Conversation {
    pub id: i64,
    pub name: Option<String>,
    pub is_group: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Participant row joined with the user it points at, for listing who is
/// in a conversation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ParticipantInfo {
    pub user_id: i64,
    pub username: String,
    pub is_bot: bool,
    pub joined_at: DateTime<Utc>,
}

/// Message joined with its sender's username, the shape handed to API
/// responses and realtime delivery. Content is immutable after creation;
/// only `is_read` ever changes.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MessageWithSender {
    pub id: i64,
    pub conversation_id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub text: String,
    pub image_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user(is_bot: bool) -> User {
        User {
            id: 7,
            username: "quotebot".to_string(),
            email: "bot@example.com".to_string(),
            password_hash: "x".to_string(),
            is_bot,
            bot_system_prompt: Some("You are a friendly bot.".to_string()),
            bot_quotes: Some(r#"["stay curious","onward"]"#.to_string()),
            bot_initial_message: Some("Hello there!".to_string()),
            reset_token: None,
            reset_token_expires_at: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login: None,
        }
    }

    #[test]
    fn test_bot_kind_carries_persona() {
        let user = sample_user(true);
        match user.kind() {
            UserKind::Bot(persona) => {
                assert_eq!(persona.system_prompt, "You are a friendly bot.");
                assert_eq!(persona.quotes, vec!["stay curious", "onward"]);
                assert_eq!(persona.initial_message.as_deref(), Some("Hello there!"));
            }
            UserKind::Human => panic!("bot user should classify as Bot"),
        }
    }

    #[test]
    fn test_human_kind_ignores_persona_columns() {
        let user = sample_user(false);
        assert_eq!(user.kind(), UserKind::Human);
    }

    #[test]
    fn test_malformed_quotes_fall_back_to_empty() {
        let mut user = sample_user(true);
        user.bot_quotes = Some("not json".to_string());
        match user.kind() {
            UserKind::Bot(persona) => assert!(persona.quotes.is_empty()),
            UserKind::Human => panic!("bot user should classify as Bot"),
        }
    }
}
