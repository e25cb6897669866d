//! # Validation Utilities
//!
//! Input validation helpers for the messaging domain. Each function returns
//! a human-readable failure message so callers can collect field-level
//! errors into a single validation response.

/// Maximum message text length.
pub const MAX_MESSAGE_LENGTH: usize = 5000;

/// Maximum bio length.
pub const MAX_BIO_LENGTH: usize = 500;

/// Maximum group conversation name length.
pub const MAX_CONVERSATION_NAME_LENGTH: usize = 100;

/// Validate a username: 3-20 characters, `a-z`, `0-9`, `_` or `-`,
/// case-insensitive.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err("Username must be between 3 and 20 characters".to_string());
    }
    let valid = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(
            "Username may only contain letters, numbers, underscores and hyphens".to_string(),
        );
    }
    Ok(())
}

/// Validate email format (basic check).
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.contains('@') && email.contains('.') {
        Ok(())
    } else {
        Err("Invalid email format".to_string())
    }
}

/// Validate password strength (length only; hashing enforces the rest).
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < 8 {
        Err("Password must be at least 8 characters long".to_string())
    } else {
        Ok(())
    }
}

/// Validate a profile display name: 1-50 characters after trimming.
pub fn validate_display_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if !(1..=50).contains(&len) {
        Err("Display name must be between 1 and 50 characters".to_string())
    } else {
        Ok(())
    }
}

/// Validate a profile bio.
pub fn validate_bio(bio: &str) -> Result<(), String> {
    if bio.chars().count() > MAX_BIO_LENGTH {
        Err(format!("Bio must be at most {MAX_BIO_LENGTH} characters"))
    } else {
        Ok(())
    }
}

/// Validate a group conversation name: 1-100 characters after trimming.
pub fn validate_conversation_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if !(1..=MAX_CONVERSATION_NAME_LENGTH).contains(&len) {
        Err(format!(
            "Conversation name must be between 1 and {MAX_CONVERSATION_NAME_LENGTH} characters"
        ))
    } else {
        Ok(())
    }
}

/// Validate message content: text or image required, text capped at
/// [`MAX_MESSAGE_LENGTH`].
pub fn validate_message_content(text: &str, image_url: Option<&str>) -> Result<(), String> {
    if text.trim().is_empty() && image_url.map_or(true, |u| u.trim().is_empty()) {
        return Err("Message must contain text or an image".to_string());
    }
    if text.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message text must be at most {MAX_MESSAGE_LENGTH} characters"
        ));
    }
    Ok(())
}
