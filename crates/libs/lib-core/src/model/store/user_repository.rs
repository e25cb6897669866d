//! # User Repository
//!
//! Database access layer for user accounts, following the repository
//! pattern: a clean abstraction over the SQL for the `users` table.

use super::models::{BotPersona, User, UserForCreate};
use super::DbPool;
use chrono::{DateTime, Utc};
use sqlx::query_as;

/// User repository for database operations.
pub struct UserRepository;

impl UserRepository {
    /// Find a user by their email address.
    pub async fn find_by_email(pool: &DbPool, email: &str) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by their username (case-insensitive, per schema collation).
    pub async fn find_by_username(
        pool: &DbPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by id.
    pub async fn find_by_id(pool: &DbPool, id: i64) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Create a new human user.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` on UNIQUE constraint violations (duplicate
    /// username or email) or connection failure.
    pub async fn create(pool: &DbPool, user_data: UserForCreate) -> Result<User, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)",
        )
        .bind(&user_data.username)
        .bind(&user_data.email)
        .bind(&user_data.password_hash)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();

        query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Create a bot account with its persona.
    pub async fn create_bot(
        pool: &DbPool,
        user_data: UserForCreate,
        persona: &BotPersona,
    ) -> Result<User, sqlx::Error> {
        let quotes_json = serde_json::to_string(&persona.quotes).unwrap_or_else(|_| "[]".into());

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, email, password_hash, is_bot,
                               bot_system_prompt, bot_quotes, bot_initial_message)
            VALUES (?, ?, ?, 1, ?, ?, ?)
            "#,
        )
        .bind(&user_data.username)
        .bind(&user_data.email)
        .bind(&user_data.password_hash)
        .bind(&persona.system_prompt)
        .bind(quotes_json)
        .bind(&persona.initial_message)
        .execute(pool)
        .await?;

        let id = result.last_insert_rowid();

        query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    /// Store a password-reset token, replacing any previous one.
    ///
    /// A user has at most one active reset token at a time.
    pub async fn set_reset_token(
        pool: &DbPool,
        user_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users SET reset_token = ?, reset_token_expires_at = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Look up a user by an active reset token.
    pub async fn find_by_reset_token(
        pool: &DbPool,
        token: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        query_as::<_, User>("SELECT * FROM users WHERE reset_token = ?")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Replace the password hash and invalidate the reset token.
    pub async fn update_password(
        pool: &DbPool,
        user_id: i64,
        password_hash: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?,
                reset_token = NULL,
                reset_token_expires_at = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Update the last login timestamp for a user.
    ///
    /// Does not verify the user exists; updating a missing id affects no rows.
    pub async fn update_last_login(pool: &DbPool, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
