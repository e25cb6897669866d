//! # Authentication Data Transfer Objects
//!
//! Request and response structures for the auth endpoints:
//!
//! - `POST /api/auth/register` - [`RegisterRequest`] -> [`AuthResponse`]
//! - `POST /api/auth/login` - [`LoginRequest`] -> [`AuthResponse`]
//! - `POST /api/auth/password/forgot` - [`ForgotPasswordRequest`] -> [`StatusResponse`]
//! - `POST /api/auth/password/reset` - [`ResetPasswordRequest`] -> [`StatusResponse`]
//!
//! All DTOs use snake_case field names in JSON (default serde behavior).

use crate::model::store::models::User;
use lib_utils::format_time;
use serde::{Deserialize, Serialize};

/// Registration request for a new account.
///
/// Validation happens server-side; every failed rule is reported, not just
/// the first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login request. Authentication is by email only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned on successful login or registration.
///
/// The `token` goes into subsequent requests as `Authorization: Bearer <token>`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub user: UserInfo,
    pub token: String,
    pub message: String,
}

/// Public user data, safe to send to clients. Never carries the password
/// hash or reset-token columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub is_bot: bool,
    pub created_at: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_bot: user.is_bot,
            created_at: format_time(user.created_at),
        }
    }
}

/// Start a password reset. The response is identical whether or not the
/// email is registered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Complete a password reset with the emailed token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

/// Generic message-only response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_deserialize() {
        let json = r#"{"username":"alice","email":"alice@example.com","password":"Secret123!"}"#;
        let request: RegisterRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.username, "alice");
        assert_eq!(request.email, "alice@example.com");
    }

    #[test]
    fn test_user_info_excludes_sensitive_fields() {
        let user = UserInfo {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            is_bot: false,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("reset_token"));
    }
}
