//! # Profile Repository
//!
//! Database access layer for user profiles. Profiles are 1:1 with users
//! and created lazily on first access, so older accounts never need a
//! backfill.

use super::models::{ProfileForUpdate, UserProfile};
use super::DbPool;
use sqlx::query_as;

/// Profile repository for database operations.
pub struct ProfileRepository;

impl ProfileRepository {
    /// Find a profile by its owning user id.
    pub async fn find_by_user_id(
        pool: &DbPool,
        user_id: i64,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the profile for a user, creating it if missing.
    ///
    /// The display name of a freshly created profile defaults to the
    /// username.
    pub async fn get_or_create(
        pool: &DbPool,
        user_id: i64,
        default_display_name: &str,
    ) -> Result<UserProfile, sqlx::Error> {
        sqlx::query(
            "INSERT OR IGNORE INTO user_profiles (user_id, display_name) VALUES (?, ?)",
        )
        .bind(user_id)
        .bind(default_display_name)
        .execute(pool)
        .await?;

        query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Apply a partial update to a profile. Omitted fields keep their
    /// current values.
    pub async fn update(
        pool: &DbPool,
        user_id: i64,
        update: ProfileForUpdate,
    ) -> Result<UserProfile, sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE user_profiles
            SET display_name = COALESCE(?, display_name),
                bio = COALESCE(?, bio),
                image_url = COALESCE(?, image_url),
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = ?
            "#,
        )
        .bind(&update.display_name)
        .bind(&update.bio)
        .bind(&update.image_url)
        .bind(user_id)
        .execute(pool)
        .await?;

        query_as::<_, UserProfile>("SELECT * FROM user_profiles WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Drop the profile image reference, if any.
    pub async fn clear_image(pool: &DbPool, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE user_profiles SET image_url = NULL, updated_at = CURRENT_TIMESTAMP WHERE user_id = ?",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::store::test_support::setup_test_db;
    use crate::model::store::UserRepository;
    use crate::model::store::models::UserForCreate;

    async fn seed_user(pool: &DbPool) -> i64 {
        UserRepository::create(
            pool,
            UserForCreate::new(
                "testuser".to_string(),
                "test@example.com".to_string(),
                "hash".to_string(),
            ),
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_get_or_create_defaults_display_name() {
        let pool = setup_test_db().await;
        let user_id = seed_user(&pool).await;

        assert!(ProfileRepository::find_by_user_id(&pool, user_id)
            .await
            .unwrap()
            .is_none());

        let profile = ProfileRepository::get_or_create(&pool, user_id, "testuser")
            .await
            .unwrap();
        assert_eq!(profile.display_name, "testuser");
        assert!(profile.bio.is_none());
        assert!(profile.image_url.is_none());
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let pool = setup_test_db().await;
        let user_id = seed_user(&pool).await;

        ProfileRepository::get_or_create(&pool, user_id, "testuser")
            .await
            .unwrap();
        ProfileRepository::update(
            &pool,
            user_id,
            ProfileForUpdate {
                display_name: Some("Custom Name".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Second call must not reset the customized display name
        let profile = ProfileRepository::get_or_create(&pool, user_id, "testuser")
            .await
            .unwrap();
        assert_eq!(profile.display_name, "Custom Name");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_omitted_fields() {
        let pool = setup_test_db().await;
        let user_id = seed_user(&pool).await;
        ProfileRepository::get_or_create(&pool, user_id, "testuser")
            .await
            .unwrap();

        ProfileRepository::update(
            &pool,
            user_id,
            ProfileForUpdate {
                bio: Some("Rustacean".to_string()),
                image_url: Some("blob://avatars/1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let profile = ProfileRepository::update(
            &pool,
            user_id,
            ProfileForUpdate {
                display_name: Some("New Name".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(profile.display_name, "New Name");
        assert_eq!(profile.bio.as_deref(), Some("Rustacean"));
        assert_eq!(profile.image_url.as_deref(), Some("blob://avatars/1"));
    }

    #[tokio::test]
    async fn test_clear_image() {
        let pool = setup_test_db().await;
        let user_id = seed_user(&pool).await;
        ProfileRepository::get_or_create(&pool, user_id, "testuser")
            .await
            .unwrap();
        ProfileRepository::update(
            &pool,
            user_id,
            ProfileForUpdate {
                image_url: Some("blob://avatars/1".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        ProfileRepository::clear_image(&pool, user_id).await.unwrap();

        let profile = ProfileRepository::find_by_user_id(&pool, user_id)
            .await
            .unwrap()
            .unwrap();
        assert!(profile.image_url.is_none());
    }
}
