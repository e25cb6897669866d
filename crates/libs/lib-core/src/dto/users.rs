//! # User and Profile Data Transfer Objects
//!
//! - `GET /api/users/me` -> [`ProfileResponse`]
//! - `PUT /api/users/me` - [`UpdateProfileRequest`] -> [`ProfileResponse`]
//! - `GET /api/users/{username}` -> [`PublicProfileResponse`]

use crate::model::store::models::{User, UserProfile};
use serde::{Deserialize, Serialize};

/// Partial profile update; omitted fields keep their current value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// The authenticated user's own profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileResponse {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ProfileResponse {
    pub fn from_parts(user: &User, profile: &UserProfile) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone(),
            image_url: profile.image_url.clone(),
        }
    }
}

/// Another user's profile as visible to any authenticated user. No email.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicProfileResponse {
    pub user_id: i64,
    pub username: String,
    pub is_bot: bool,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PublicProfileResponse {
    pub fn from_parts(user: &User, profile: &UserProfile) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_bot: user.is_bot,
            display_name: profile.display_name.clone(),
            bio: profile.bio.clone(),
            image_url: profile.image_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_all_fields_optional() {
        let request: UpdateProfileRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, UpdateProfileRequest::default());
    }

    #[test]
    fn test_public_profile_has_no_email() {
        let response = PublicProfileResponse {
            user_id: 1,
            username: "alice".to_string(),
            is_bot: false,
            display_name: "Alice".to_string(),
            bio: None,
            image_url: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("email"));
        // None fields are omitted entirely
        assert!(!json.contains("bio"));
    }
}
