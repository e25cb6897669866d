//! # User and Profile Handlers
//!
//! Profile endpoints for the authenticated user and public lookups by
//! username. Profiles are created lazily on first read, so accounts made
//! before the profile table existed still resolve.

use axum::{
    extract::{Extension, Json, Path, State},
};
use lib_auth::Claims;
use lib_core::dto::{ProfileResponse, PublicProfileResponse, UpdateProfileRequest};
use lib_core::model::store::models::ProfileForUpdate;
use lib_core::model::store::{ProfileRepository, UserRepository};
use lib_core::{AppError, DbPool, Result};
use lib_utils::validation::{validate_bio, validate_display_name};
use tracing::{info, instrument};

/// Fetch the authenticated user's own profile.
///
/// **Route**: `GET /api/users/me`
#[instrument(skip(pool, claims))]
pub async fn get_me(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;
    let user = UserRepository::find_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let profile = ProfileRepository::get_or_create(&pool, user.id, &user.username).await?;

    Ok(Json(ProfileResponse::from_parts(&user, &profile)))
}

/// Update the authenticated user's profile.
///
/// **Route**: `PUT /api/users/me`
///
/// Partial update: omitted fields are untouched. All provided fields are
/// validated together and every failure is reported.
#[instrument(skip(pool, claims, req))]
pub async fn update_me(
    State(pool): State<DbPool>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let mut errors = Vec::new();
    if let Some(display_name) = &req.display_name {
        if let Err(e) = validate_display_name(display_name) {
            errors.push(e);
        }
    }
    if let Some(bio) = &req.bio {
        if let Err(e) = validate_bio(bio) {
            errors.push(e);
        }
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let user = UserRepository::find_by_id(&pool, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    ProfileRepository::get_or_create(&pool, user.id, &user.username).await?;

    let profile = ProfileRepository::update(
        &pool,
        user.id,
        ProfileForUpdate {
            display_name: req.display_name,
            bio: req.bio,
            image_url: req.image_url,
        },
    )
    .await?;

    info!("[PROFILE] Updated profile for user {}", user.id);

    Ok(Json(ProfileResponse::from_parts(&user, &profile)))
}

/// Fetch another user's public profile by username.
///
/// **Route**: `GET /api/users/{username}`
#[instrument(skip(pool))]
pub async fn get_by_username(
    State(pool): State<DbPool>,
    Path(username): Path<String>,
) -> Result<Json<PublicProfileResponse>> {
    let user = UserRepository::find_by_username(&pool, &username)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    let profile = ProfileRepository::get_or_create(&pool, user.id, &user.username).await?;

    Ok(Json(PublicProfileResponse::from_parts(&user, &profile)))
}
