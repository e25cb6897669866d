//! # Message Repository
//!
//! Database access layer for messages. Reads and writes are gated on the
//! acting user's conversation membership, same as the conversation
//! repository.

use super::models::MessageWithSender;
use super::{ConversationRepository, DbPool};
use crate::error::{AppError, Result};
use lib_utils::validation::validate_message_content;
use sqlx::query_as;

/// Message repository for database operations.
pub struct MessageRepository;

impl MessageRepository {
    /// Persist a message and bump the conversation's activity timestamp.
    ///
    /// A message must carry text, an image reference, or both; the sender
    /// must be a current participant.
    pub async fn create(
        pool: &DbPool,
        conversation_id: i64,
        sender_id: i64,
        text: &str,
        image_url: Option<&str>,
    ) -> Result<MessageWithSender> {
        if let Err(error) = validate_message_content(text, image_url) {
            return Err(AppError::validation(error));
        }
        if !ConversationRepository::is_participant(pool, conversation_id, sender_id).await? {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }

        let mut tx = pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, sender_id, text, image_url) VALUES (?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(sender_id)
        .bind(text)
        .bind(image_url)
        .execute(&mut *tx)
        .await?;
        let message_id = result.last_insert_rowid();

        // Conversation ordering in listings follows last activity
        sqlx::query("UPDATE conversations SET updated_at = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        let message = query_as::<_, MessageWithSender>(
            r#"
            SELECT m.id, m.conversation_id, m.sender_id, u.username AS sender_username,
                   m.text, m.image_url, m.is_read, m.created_at
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.id = ?
            "#,
        )
        .bind(message_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(message)
    }

    /// Message history for a conversation, oldest first.
    pub async fn list_for_participant(
        pool: &DbPool,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<Vec<MessageWithSender>> {
        if !ConversationRepository::is_participant(pool, conversation_id, user_id).await? {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }

        let messages = query_as::<_, MessageWithSender>(
            r#"
            SELECT m.id, m.conversation_id, m.sender_id, u.username AS sender_username,
                   m.text, m.image_url, m.is_read, m.created_at
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = ?
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;
        Ok(messages)
    }

    /// Most recent message in a conversation, if any. Used for list
    /// previews; membership is the caller's responsibility.
    pub async fn last_in_conversation(
        pool: &DbPool,
        conversation_id: i64,
    ) -> Result<Option<MessageWithSender>> {
        let message = query_as::<_, MessageWithSender>(
            r#"
            SELECT m.id, m.conversation_id, m.sender_id, u.username AS sender_username,
                   m.text, m.image_url, m.is_read, m.created_at
            FROM messages m
            JOIN users u ON u.id = m.sender_id
            WHERE m.conversation_id = ?
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(pool)
        .await?;
        Ok(message)
    }

    /// Unread count for a user in a conversation, excluding their own
    /// messages.
    pub async fn unread_count(
        pool: &DbPool,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<i64> {
        let (count,): (i64,) = query_as(
            r#"
            SELECT COUNT(*) FROM messages
            WHERE conversation_id = ? AND sender_id != ? AND is_read = 0
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(pool)
        .await?;
        Ok(count)
    }

    /// Mark a single message as read. Idempotent; returns the message's
    /// conversation id and whether the flag actually flipped.
    pub async fn mark_read_by_id(
        pool: &DbPool,
        message_id: i64,
        reader_id: i64,
    ) -> Result<(i64, bool)> {
        let row: Option<(i64,)> = query_as("SELECT conversation_id FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(pool)
            .await?;
        let Some((conversation_id,)) = row else {
            return Err(AppError::NotFound("Message not found".to_string()));
        };
        if !ConversationRepository::is_participant(pool, conversation_id, reader_id).await? {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }

        let result = sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ? AND is_read = 0")
            .bind(message_id)
            .execute(pool)
            .await?;
        Ok((conversation_id, result.rows_affected() > 0))
    }

    /// Delete a message. Only the sender may delete their own message.
    pub async fn delete(pool: &DbPool, message_id: i64, acting_user_id: i64) -> Result<()> {
        let sender: Option<(i64,)> = query_as("SELECT sender_id FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(pool)
            .await?;

        match sender {
            None => Err(AppError::NotFound("Message not found".to_string())),
            Some((sender_id,)) if sender_id != acting_user_id => Err(AppError::Forbidden(
                "Only the sender can delete a message".to_string(),
            )),
            Some(_) => {
                sqlx::query("DELETE FROM messages WHERE id = ?")
                    .bind(message_id)
                    .execute(pool)
                    .await?;
                Ok(())
            }
        }
    }
}
