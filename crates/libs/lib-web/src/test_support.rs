//! Shared fixtures for lib-web tests: in-memory database, seeded users and
//! signed tokens.

use lib_auth::{encode_jwt, hash_password};
use lib_core::config::{core_config, init_config};
use lib_core::model::store::models::{BotPersona, User, UserForCreate};
use lib_core::model::store::UserRepository;
use lib_core::DbPool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

pub const TEST_JWT_SECRET: &str = "test-secret-key-must-be-at-least-32-chars-long!";

/// Initialize the global config for tests. Safe to call repeatedly.
pub fn ensure_test_config() {
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    }
    let _ = init_config();
}

/// In-memory database with the real migrations applied.
///
/// A single connection is required: each pooled `:memory:` connection would
/// otherwise get its own empty database.
pub async fn setup_test_db() -> DbPool {
    ensure_test_config();

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

pub async fn seed_user(pool: &DbPool, name: &str) -> User {
    UserRepository::create(
        pool,
        UserForCreate::new(
            name.to_string(),
            format!("{}@example.com", name),
            hash_password("TestPassword123!").unwrap(),
        ),
    )
    .await
    .unwrap()
}

pub async fn seed_bot(pool: &DbPool, name: &str, initial_message: Option<&str>) -> User {
    let persona = BotPersona {
        system_prompt: "You are a friendly movie-quote bot.".to_string(),
        quotes: vec!["I'll be back".to_string()],
        initial_message: initial_message.map(str::to_string),
    };
    UserRepository::create_bot(
        pool,
        UserForCreate::new(
            name.to_string(),
            format!("{}@example.com", name),
            hash_password("TestPassword123!").unwrap(),
        ),
        &persona,
    )
    .await
    .unwrap()
}

/// A valid bearer token for the given user.
pub fn token_for(user: &User) -> String {
    ensure_test_config();
    let config = core_config();
    encode_jwt(user.id, user.username.clone(), &config.jwt_secret, 24).unwrap()
}
