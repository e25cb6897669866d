//! # Conversation Repository
//!
//! Database access layer for conversations and their participant rows.
//!
//! All read paths are membership-gated: callers pass the acting user's id
//! and a non-participant gets [`AppError::Forbidden`] before any lookup
//! result is revealed, so outsiders cannot probe which conversations exist.

use super::models::{Conversation, ParticipantInfo};
use super::DbPool;
use crate::error::{AppError, Result};
use lib_utils::validation::validate_conversation_name;
use sqlx::query_as;

/// Conversation repository for database operations.
pub struct ConversationRepository;

impl ConversationRepository {
    /// Create a conversation with the given members, or return the
    /// existing one for the direct (two-person, non-group) case.
    ///
    /// The creator is always a participant and must not appear in
    /// `other_user_ids`. Returns the conversation and whether it was
    /// newly created.
    pub async fn create(
        pool: &DbPool,
        creator_id: i64,
        other_user_ids: &[i64],
        name: Option<String>,
        is_group: bool,
    ) -> Result<(Conversation, bool)> {
        if other_user_ids.is_empty() {
            return Err(AppError::validation(
                "A conversation needs at least one other participant",
            ));
        }
        if other_user_ids.contains(&creator_id) {
            return Err(AppError::validation(
                "Participant list must not include yourself",
            ));
        }
        if !is_group && other_user_ids.len() != 1 {
            return Err(AppError::validation(
                "A direct conversation has exactly two participants",
            ));
        }

        // Only groups carry a name
        let name = if is_group { name } else { None };
        if let Some(name) = name.as_deref() {
            if let Err(error) = validate_conversation_name(name) {
                return Err(AppError::validation(error));
            }
        }

        for &user_id in other_user_ids {
            let exists: Option<(i64,)> = query_as("SELECT id FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
            if exists.is_none() {
                return Err(AppError::NotFound(format!("User {} not found", user_id)));
            }
        }

        // Direct conversations are idempotent: re-creating one between the
        // same pair returns the existing row.
        if !is_group {
            if let Some(existing) =
                Self::find_direct_between(pool, creator_id, other_user_ids[0]).await?
            {
                return Ok((existing, false));
            }
        }

        let mut tx = pool.begin().await?;

        let result = sqlx::query("INSERT INTO conversations (name, is_group) VALUES (?, ?)")
            .bind(&name)
            .bind(is_group)
            .execute(&mut *tx)
            .await?;
        let conversation_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)",
        )
        .bind(conversation_id)
        .bind(creator_id)
        .execute(&mut *tx)
        .await?;
        for &user_id in other_user_ids {
            sqlx::query(
                "INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)",
            )
            .bind(conversation_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        let conversation =
            query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(conversation_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok((conversation, true))
    }

    /// Find the direct conversation between two users, in either order.
    pub async fn find_direct_between(
        pool: &DbPool,
        user_a: i64,
        user_b: i64,
    ) -> Result<Option<Conversation>> {
        let conversation = query_as::<_, Conversation>(
            r#"
            SELECT c.* FROM conversations c
            JOIN conversation_participants pa
                ON pa.conversation_id = c.id AND pa.user_id = ?
            JOIN conversation_participants pb
                ON pb.conversation_id = c.id AND pb.user_id = ?
            WHERE c.is_group = 0
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .fetch_optional(pool)
        .await?;
        Ok(conversation)
    }

    /// Whether a user is a current (not departed) participant.
    pub async fn is_participant(
        pool: &DbPool,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<bool> {
        let row: Option<(i64,)> = query_as(
            r#"
            SELECT id FROM conversation_participants
            WHERE conversation_id = ? AND user_id = ? AND left_at IS NULL
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    /// Fetch a conversation, gated on the acting user's membership.
    pub async fn get_for_participant(
        pool: &DbPool,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<Conversation> {
        if !Self::is_participant(pool, conversation_id, user_id).await? {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }
        let conversation =
            query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = ?")
                .bind(conversation_id)
                .fetch_one(pool)
                .await?;
        Ok(conversation)
    }

    /// All conversations the user currently belongs to, most recently
    /// active first.
    pub async fn list_for_user(pool: &DbPool, user_id: i64) -> Result<Vec<Conversation>> {
        let conversations = query_as::<_, Conversation>(
            r#"
            SELECT c.* FROM conversations c
            JOIN conversation_participants p
                ON p.conversation_id = c.id
            WHERE p.user_id = ? AND p.left_at IS NULL
            ORDER BY c.updated_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;
        Ok(conversations)
    }

    /// Current participants of a conversation, joined with their usernames.
    pub async fn participants(
        pool: &DbPool,
        conversation_id: i64,
    ) -> Result<Vec<ParticipantInfo>> {
        let participants = query_as::<_, ParticipantInfo>(
            r#"
            SELECT u.id AS user_id, u.username, u.is_bot, p.joined_at
            FROM conversation_participants p
            JOIN users u ON u.id = p.user_id
            WHERE p.conversation_id = ? AND p.left_at IS NULL
            ORDER BY p.joined_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;
        Ok(participants)
    }

    /// Rename a group conversation. Only participants may rename. Direct
    /// conversations are unnamed, so a rename there just clears the name.
    pub async fn update_name(
        pool: &DbPool,
        conversation_id: i64,
        acting_user_id: i64,
        name: &str,
    ) -> Result<Conversation> {
        let conversation = Self::get_for_participant(pool, conversation_id, acting_user_id).await?;
        if !conversation.is_group {
            sqlx::query("UPDATE conversations SET name = NULL WHERE id = ?")
                .bind(conversation_id)
                .execute(pool)
                .await?;
            return Self::get_for_participant(pool, conversation_id, acting_user_id).await;
        }

        if let Err(error) = validate_conversation_name(name) {
            return Err(AppError::validation(error));
        }

        sqlx::query(
            "UPDATE conversations SET name = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(name)
        .bind(conversation_id)
        .execute(pool)
        .await?;

        Self::get_for_participant(pool, conversation_id, acting_user_id).await
    }

    /// Add a user to a group conversation. Re-adding a departed user
    /// reactivates their original membership row.
    pub async fn add_participant(
        pool: &DbPool,
        conversation_id: i64,
        acting_user_id: i64,
        new_user_id: i64,
    ) -> Result<()> {
        let conversation = Self::get_for_participant(pool, conversation_id, acting_user_id).await?;
        if !conversation.is_group {
            return Err(AppError::validation(
                "Cannot add participants to a direct conversation",
            ));
        }

        let user_exists: Option<(i64,)> = query_as("SELECT id FROM users WHERE id = ?")
            .bind(new_user_id)
            .fetch_optional(pool)
            .await?;
        if user_exists.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", new_user_id)));
        }

        let existing: Option<(i64, Option<String>)> = query_as(
            "SELECT id, left_at FROM conversation_participants WHERE conversation_id = ? AND user_id = ?",
        )
        .bind(conversation_id)
        .bind(new_user_id)
        .fetch_optional(pool)
        .await?;

        match existing {
            Some((_, None)) => Err(AppError::validation("User is already a participant")),
            Some((row_id, Some(_))) => {
                sqlx::query("UPDATE conversation_participants SET left_at = NULL WHERE id = ?")
                    .bind(row_id)
                    .execute(pool)
                    .await?;
                Ok(())
            }
            None => {
                sqlx::query(
                    "INSERT INTO conversation_participants (conversation_id, user_id) VALUES (?, ?)",
                )
                .bind(conversation_id)
                .bind(new_user_id)
                .execute(pool)
                .await?;
                Ok(())
            }
        }
    }

    /// Leave a group conversation. Membership rows are kept with `left_at`
    /// set so message history stays attributable.
    ///
    /// Direct conversations keep both members: leaving one would strand a
    /// row the idempotent re-create keeps returning but neither side can
    /// use.
    pub async fn remove_participant(
        pool: &DbPool,
        conversation_id: i64,
        user_id: i64,
    ) -> Result<()> {
        let conversation = Self::get_for_participant(pool, conversation_id, user_id).await?;
        if !conversation.is_group {
            return Err(AppError::validation(
                "Cannot leave a direct conversation",
            ));
        }
        sqlx::query(
            r#"
            UPDATE conversation_participants
            SET left_at = CURRENT_TIMESTAMP
            WHERE conversation_id = ? AND user_id = ?
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Remove another user from a group conversation. The acting user must
    /// be a participant and direct conversations keep both members.
    pub async fn remove_other_participant(
        pool: &DbPool,
        conversation_id: i64,
        acting_user_id: i64,
        target_user_id: i64,
    ) -> Result<()> {
        let conversation = Self::get_for_participant(pool, conversation_id, acting_user_id).await?;
        if !conversation.is_group {
            return Err(AppError::validation(
                "Cannot remove participants from a direct conversation",
            ));
        }
        if !Self::is_participant(pool, conversation_id, target_user_id).await? {
            return Err(AppError::validation("User is not a participant"));
        }

        sqlx::query(
            r#"
            UPDATE conversation_participants
            SET left_at = CURRENT_TIMESTAMP
            WHERE conversation_id = ? AND user_id = ?
            "#,
        )
        .bind(conversation_id)
        .bind(target_user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Delete a conversation outright. Participants and messages cascade.
    pub async fn delete(pool: &DbPool, conversation_id: i64, acting_user_id: i64) -> Result<()> {
        // Gate before deleting so outsiders cannot probe ids.
        Self::get_for_participant(pool, conversation_id, acting_user_id).await?;

        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark every message from other senders as read.
    ///
    /// Returns the number of messages flipped; repeating the call returns
    /// zero since already-read rows are excluded.
    pub async fn mark_read(
        pool: &DbPool,
        conversation_id: i64,
        reader_id: i64,
    ) -> Result<u64> {
        if !Self::is_participant(pool, conversation_id, reader_id).await? {
            return Err(AppError::Forbidden(
                "Not a participant of this conversation".to_string(),
            ));
        }
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_read = 1
            WHERE conversation_id = ? AND sender_id != ? AND is_read = 0
            "#,
        )
        .bind(conversation_id)
        .bind(reader_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::models::UserForCreate;
    use crate::model::store::test_support::setup_test_db;
    use crate::model::store::UserRepository;

    async fn seed_user(pool: &DbPool, name: &str) -> i64 {
        UserRepository::create(
            pool,
            UserForCreate::new(
                name.to_string(),
                format!("{}@example.com", name),
                "hash".to_string(),
            ),
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_create_direct_conversation() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let (conversation, created) =
            ConversationRepository::create(&pool, alice, &[bob], None, false)
                .await
                .unwrap();
        assert!(created);
        assert!(!conversation.is_group);
        assert!(conversation.name.is_none());

        let participants = ConversationRepository::participants(&pool, conversation.id)
            .await
            .unwrap();
        assert_eq!(participants.len(), 2);
    }

    #[tokio::test]
    async fn test_direct_conversation_idempotent_both_orders() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let (first, created) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        assert!(created);

        let (again, created) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);

        // Creator and other participant swapped still hits the same row
        let (reversed, created) = ConversationRepository::create(&pool, bob, &[alice], None, false)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(reversed.id, first.id);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_participant_lists() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let carol = seed_user(&pool, "carol").await;

        let empty = ConversationRepository::create(&pool, alice, &[], None, false).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));

        let self_included =
            ConversationRepository::create(&pool, alice, &[alice], None, false).await;
        assert!(matches!(self_included, Err(AppError::Validation(_))));

        let direct_with_three =
            ConversationRepository::create(&pool, alice, &[bob, carol], None, false).await;
        assert!(matches!(direct_with_three, Err(AppError::Validation(_))));

        let missing_user = ConversationRepository::create(&pool, alice, &[9999], None, false).await;
        assert!(matches!(missing_user, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_group_conversations_are_not_deduplicated() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let carol = seed_user(&pool, "carol").await;

        let (g1, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob, carol],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();
        let (g2, created) = ConversationRepository::create(
            &pool,
            alice,
            &[bob, carol],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();
        assert!(created);
        assert_ne!(g1.id, g2.id);
    }

    #[tokio::test]
    async fn test_non_participant_sees_forbidden_not_not_found() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let eve = seed_user(&pool, "eve").await;

        let (conversation, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();

        let existing = ConversationRepository::get_for_participant(&pool, conversation.id, eve).await;
        assert!(matches!(existing, Err(AppError::Forbidden(_))));

        // Missing ids look identical to real-but-foreign ids
        let missing = ConversationRepository::get_for_participant(&pool, 9999, eve).await;
        assert!(matches!(missing, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_list_for_user_excludes_departed() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let carol = seed_user(&pool, "carol").await;

        let (direct, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        let (group, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob, carol],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();

        let listed = ConversationRepository::list_for_user(&pool, alice).await.unwrap();
        assert_eq!(listed.len(), 2);

        ConversationRepository::remove_participant(&pool, group.id, alice)
            .await
            .unwrap();

        let listed = ConversationRepository::list_for_user(&pool, alice).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, direct.id);
    }

    #[tokio::test]
    async fn test_add_participant_rules() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let carol = seed_user(&pool, "carol").await;
        let dave = seed_user(&pool, "dave").await;

        let (group, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();

        ConversationRepository::add_participant(&pool, group.id, alice, carol)
            .await
            .unwrap();

        let duplicate =
            ConversationRepository::add_participant(&pool, group.id, alice, carol).await;
        assert!(matches!(duplicate, Err(AppError::Validation(_))));

        let by_outsider =
            ConversationRepository::add_participant(&pool, group.id, dave, dave).await;
        assert!(matches!(by_outsider, Err(AppError::Forbidden(_))));

        let (direct, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        let into_direct =
            ConversationRepository::add_participant(&pool, direct.id, alice, carol).await;
        assert!(matches!(into_direct, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_readd_after_leaving_reactivates() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let carol = seed_user(&pool, "carol").await;

        let (group, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob, carol],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();

        ConversationRepository::remove_participant(&pool, group.id, carol)
            .await
            .unwrap();
        assert!(!ConversationRepository::is_participant(&pool, group.id, carol)
            .await
            .unwrap());

        ConversationRepository::add_participant(&pool, group.id, alice, carol)
            .await
            .unwrap();
        assert!(ConversationRepository::is_participant(&pool, group.id, carol)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_remove_other_participant_rules() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;
        let carol = seed_user(&pool, "carol").await;
        let eve = seed_user(&pool, "eve").await;

        let (group, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob, carol],
            Some("Team".to_string()),
            true,
        )
        .await
        .unwrap();

        let by_outsider =
            ConversationRepository::remove_other_participant(&pool, group.id, eve, bob).await;
        assert!(matches!(by_outsider, Err(AppError::Forbidden(_))));

        ConversationRepository::remove_other_participant(&pool, group.id, alice, carol)
            .await
            .unwrap();
        assert!(!ConversationRepository::is_participant(&pool, group.id, carol)
            .await
            .unwrap());

        // Already gone
        let again =
            ConversationRepository::remove_other_participant(&pool, group.id, alice, carol).await;
        assert!(matches!(again, Err(AppError::Validation(_))));

        let (direct, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        let from_direct =
            ConversationRepository::remove_other_participant(&pool, direct.id, alice, bob).await;
        assert!(matches!(from_direct, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_rename_group_and_direct_clears_name() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        // Renaming a direct conversation is a silent no-op: the name stays
        // cleared instead of erroring.
        let (direct, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        let renamed = ConversationRepository::update_name(&pool, direct.id, alice, "Us")
            .await
            .unwrap();
        assert!(renamed.name.is_none());

        let (group, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob],
            Some("Old".to_string()),
            true,
        )
        .await
        .unwrap();
        let updated = ConversationRepository::update_name(&pool, group.id, alice, "New")
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("New"));

        let empty = ConversationRepository::update_name(&pool, group.id, alice, "").await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_group_create_validates_name() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let empty = ConversationRepository::create(
            &pool,
            alice,
            &[bob],
            Some("".to_string()),
            true,
        )
        .await;
        assert!(matches!(empty, Err(AppError::Validation(_))));

        let oversized = ConversationRepository::create(
            &pool,
            alice,
            &[bob],
            Some("n".repeat(101)),
            true,
        )
        .await;
        assert!(matches!(oversized, Err(AppError::Validation(_))));

        // A name on a direct conversation is dropped, not stored
        let (direct, _) = ConversationRepository::create(
            &pool,
            alice,
            &[bob],
            Some("Us".to_string()),
            false,
        )
        .await
        .unwrap();
        assert!(direct.name.is_none());
    }

    #[tokio::test]
    async fn test_leave_direct_is_rejected() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let (direct, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();

        let left = ConversationRepository::remove_participant(&pool, direct.id, alice).await;
        assert!(matches!(left, Err(AppError::Validation(_))));

        // The idempotent re-create still hands back a usable conversation
        let (again, created) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, direct.id);
        assert!(
            ConversationRepository::get_for_participant(&pool, again.id, alice)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let (conversation, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        sqlx::query("INSERT INTO messages (conversation_id, sender_id, text) VALUES (?, ?, ?)")
            .bind(conversation.id)
            .bind(alice)
            .bind("hello")
            .execute(&pool)
            .await
            .unwrap();

        ConversationRepository::delete(&pool, conversation.id, alice)
            .await
            .unwrap();

        let participants: Vec<(i64,)> = sqlx::query_as(
            "SELECT id FROM conversation_participants WHERE conversation_id = ?",
        )
        .bind(conversation.id)
        .fetch_all(&pool)
        .await
        .unwrap();
        assert!(participants.is_empty());

        let messages: Vec<(i64,)> =
            sqlx::query_as("SELECT id FROM messages WHERE conversation_id = ?")
                .bind(conversation.id)
                .fetch_all(&pool)
                .await
                .unwrap();
        assert!(messages.is_empty());
    }

    #[tokio::test]
    async fn test_mark_read_counts_and_is_idempotent() {
        let pool = setup_test_db().await;
        let alice = seed_user(&pool, "alice").await;
        let bob = seed_user(&pool, "bob").await;

        let (conversation, _) = ConversationRepository::create(&pool, alice, &[bob], None, false)
            .await
            .unwrap();
        for text in ["one", "two"] {
            sqlx::query("INSERT INTO messages (conversation_id, sender_id, text) VALUES (?, ?, ?)")
                .bind(conversation.id)
                .bind(bob)
                .bind(text)
                .execute(&pool)
                .await
                .unwrap();
        }
        // Alice's own message must not count toward her mark-read
        sqlx::query("INSERT INTO messages (conversation_id, sender_id, text) VALUES (?, ?, ?)")
            .bind(conversation.id)
            .bind(alice)
            .bind("mine")
            .execute(&pool)
            .await
            .unwrap();

        let updated = ConversationRepository::mark_read(&pool, conversation.id, alice)
            .await
            .unwrap();
        assert_eq!(updated, 2);

        let again = ConversationRepository::mark_read(&pool, conversation.id, alice)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }
}
