//! # Authentication Handlers
//!
//! HTTP request handlers for registration, login and password reset.
//!
//! Validation errors are collected, not short-circuited: a register request
//! with a bad username AND a bad password reports both in `details`.

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use lib_auth::{encode_jwt, hash_password, is_token_live, new_reset_token, verify_password, Claims};
use lib_core::dto::{
    AuthResponse, ForgotPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    StatusResponse, UserInfo,
};
use lib_core::model::store::models::UserForCreate;
use lib_core::model::store::{ProfileRepository, UserRepository};
use lib_core::{AppError, Config, DbPool, Result};
use lib_utils::validation::{validate_email, validate_password, validate_username};
use tracing::{debug, info, instrument, warn};

/// Register a new account.
///
/// **Route**: `POST /api/auth/register`
///
/// Returns `201 Created` with an [`AuthResponse`] so the client is logged in
/// immediately. Duplicate username or email is a validation failure, same as
/// any other bad field.
#[instrument(skip(pool, config, req), fields(username = %req.username, email = %req.email))]
pub async fn register(
    State(pool): State<DbPool>,
    State(config): State<Config>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    info!("[REGISTER] New account request");

    let mut errors = Vec::new();
    if let Err(e) = validate_username(&req.username) {
        errors.push(e);
    }
    if let Err(e) = validate_email(&req.email) {
        errors.push(e);
    }
    if let Err(e) = validate_password(&req.password) {
        errors.push(e);
    }

    if UserRepository::find_by_username(&pool, &req.username)
        .await?
        .is_some()
    {
        errors.push("Username already taken".to_string());
    }
    if UserRepository::find_by_email(&pool, &req.email)
        .await?
        .is_some()
    {
        errors.push("Email already registered".to_string());
    }

    if !errors.is_empty() {
        warn!("[REGISTER] Rejected: {:?}", errors);
        return Err(AppError::Validation(errors));
    }

    let password_hash = hash_password(&req.password).map_err(AppError::validation)?;

    let user = UserRepository::create(
        &pool,
        UserForCreate::new(req.username.clone(), req.email.clone(), password_hash),
    )
    .await?;
    ProfileRepository::get_or_create(&pool, user.id, &user.username).await?;

    let token = encode_jwt(
        user.id,
        user.username.clone(),
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )
    .map_err(AppError::Internal)?;

    info!("[REGISTER] Created user {} (id: {})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user: UserInfo::from(&user),
            token,
            message: "Registration successful".to_string(),
        }),
    ))
}

/// Log in with email and password.
///
/// **Route**: `POST /api/auth/login`
///
/// A missing account and a wrong password return the same error, so the
/// endpoint cannot be used to enumerate registered emails.
#[instrument(skip(pool, config, req), fields(email = %req.email))]
pub async fn login(
    State(pool): State<DbPool>,
    State(config): State<Config>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    info!("[LOGIN] Login attempt");

    let user = UserRepository::find_by_email(&pool, &req.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = verify_password(&req.password, &user.password_hash)
        .map_err(AppError::Internal)?;
    if !valid {
        warn!("[LOGIN] Bad password for user {}", user.id);
        return Err(AppError::Unauthorized("Invalid email or password".to_string()));
    }
    if !user.is_active {
        warn!("[LOGIN] Inactive account {}", user.id);
        return Err(AppError::Unauthorized("Account is disabled".to_string()));
    }

    UserRepository::update_last_login(&pool, user.id).await?;

    let token = encode_jwt(
        user.id,
        user.username.clone(),
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )
    .map_err(AppError::Internal)?;

    info!("[LOGIN] Authenticated {} (id: {})", user.username, user.id);

    Ok(Json(AuthResponse {
        user: UserInfo::from(&user),
        token,
        message: "Login successful".to_string(),
    }))
}

/// Verify a bearer token and re-issue a fresh one.
///
/// **Route**: `GET /api/auth/verify`
///
/// Lets a client restore its session on reload without storing credentials.
#[instrument(skip(pool, config, claims))]
pub async fn verify(
    State(pool): State<DbPool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<AuthResponse>> {
    let user_id = claims.user_id().map_err(AppError::Unauthorized)?;

    let user = UserRepository::find_by_id(&pool, user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Invalid token".to_string()))?;

    let token = encode_jwt(
        user.id,
        user.username.clone(),
        &config.jwt_secret,
        config.jwt_expiration_hours,
    )
    .map_err(AppError::Internal)?;

    Ok(Json(AuthResponse {
        user: UserInfo::from(&user),
        token,
        message: "Token valid".to_string(),
    }))
}

/// Start a password reset.
///
/// **Route**: `POST /api/auth/password/forgot`
///
/// Responds `200 OK` with the same body whether or not the email exists.
/// The token itself only appears in server logs until a mailer is wired up.
#[instrument(skip(pool, req))]
pub async fn forgot_password(
    State(pool): State<DbPool>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<StatusResponse>> {
    if let Some(user) = UserRepository::find_by_email(&pool, &req.email).await? {
        let reset = new_reset_token();
        UserRepository::set_reset_token(&pool, user.id, &reset.token, reset.expires_at).await?;
        info!("[RESET] Issued reset token for user {}: {}", user.id, reset.token);
    } else {
        debug!("[RESET] Reset requested for unknown email");
    }

    Ok(Json(StatusResponse {
        message: "If the email is registered, a reset link has been sent".to_string(),
    }))
}

/// Complete a password reset with the emailed token.
///
/// **Route**: `POST /api/auth/password/reset`
#[instrument(skip(pool, req))]
pub async fn reset_password(
    State(pool): State<DbPool>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<StatusResponse>> {
    let user = UserRepository::find_by_reset_token(&pool, &req.token)
        .await?
        .filter(|u| is_token_live(u.reset_token_expires_at))
        .ok_or_else(|| AppError::validation("Reset token is invalid or expired"))?;

    let password_hash = hash_password(&req.new_password).map_err(AppError::validation)?;
    UserRepository::update_password(&pool, user.id, &password_hash).await?;

    info!("[RESET] Password updated for user {}", user.id);

    Ok(Json(StatusResponse {
        message: "Password has been reset".to_string(),
    }))
}
