//! # Authentication Middleware
//!
//! Axum middleware for JWT token validation.
//!
//! Extracts and validates the `Authorization: Bearer <token>` header, then
//! injects the authenticated user's [`Claims`] into request extensions.
//! Handlers pull them back out with `Extension<Claims>`.

use axum::{extract::Request, http::header::AUTHORIZATION, middleware::Next, response::Response};
use lib_auth::{decode_jwt_strict, Claims, TokenRejection};
use lib_core::config::core_config;
use lib_core::AppError;
use tracing::{debug, warn};

/// Authentication middleware that validates JWT tokens.
///
/// # Behavior
///
/// - **Valid token**: continues to the handler with [`Claims`] in extensions
/// - **Missing/expired/invalid token**: returns `401 Unauthorized` with the
///   standard error body
pub async fn require_auth(mut req: Request, next: Next) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            warn!("[AUTH] Missing or malformed Authorization header");
            AppError::Unauthorized(TokenRejection::Missing.reason().to_string())
        })?;

    let config = core_config();
    let claims: Claims = decode_jwt_strict(token, &config.jwt_secret).map_err(|rejection| {
        warn!("[AUTH] JWT validation failed: {}", rejection.reason());
        AppError::Unauthorized(rejection.reason().to_string())
    })?;

    debug!("[AUTH] Authenticated user: {} (id: {})", claims.username, claims.sub);

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
