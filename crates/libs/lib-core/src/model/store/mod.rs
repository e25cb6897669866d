//! # Database Store
//!
//! Database connection pool and repository implementations.

// region: --- Modules
pub mod conversation_repository;
pub mod message_repository;
pub mod models;
pub mod profile_repository;
pub mod user_repository;
// endregion: --- Modules

// region: --- Re-exports
pub use conversation_repository::ConversationRepository;
pub use message_repository::MessageRepository;
pub use profile_repository::ProfileRepository;
pub use user_repository::UserRepository;
// endregion: --- Re-exports

// region: --- Types and Functions
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::env;

/// Type alias for SQLite connection pool.
pub type DbPool = SqlitePool;

/// Create a new SQLite connection pool.
///
/// Foreign keys are enabled so conversation deletion cascades to its
/// participants and messages.
pub async fn create_pool() -> anyhow::Result<DbPool> {
    let database_url = env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:data/courier.db".to_string());

    let options = database_url
        .parse::<SqliteConnectOptions>()?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;

    Ok(pool)
}
// endregion: --- Types and Functions

#[cfg(test)]
pub(crate) mod test_support {
    use super::DbPool;
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    /// In-memory database with the real migrations applied.
    ///
    /// A single connection is required: each pooled `:memory:` connection
    /// would otherwise get its own empty database.
    pub async fn setup_test_db() -> DbPool {
        let options = "sqlite::memory:"
            .parse::<SqliteConnectOptions>()
            .expect("valid sqlite url")
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("in-memory pool");

        sqlx::migrate!("../../../migrations")
            .run(&pool)
            .await
            .expect("migrations apply");

        pool
    }
}
