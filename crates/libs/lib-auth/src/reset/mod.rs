//! # Password Reset Tokens
//!
//! Single-use reset tokens with a fixed expiry window. The token itself is
//! an opaque UUID; durability and lookup belong to the store layer.

use chrono::{DateTime, Duration, Utc};
use lib_utils::now_utc;
use uuid::Uuid;

/// How long a reset token stays valid.
const RESET_TOKEN_TTL_MINUTES: i64 = 60;

/// A freshly minted reset token and its expiry.
#[derive(Debug, Clone)]
pub struct ResetToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Mint a new reset token valid for one hour.
pub fn new_reset_token() -> ResetToken {
    ResetToken {
        token: Uuid::new_v4().to_string(),
        expires_at: reset_token_expiry(),
    }
}

/// Expiry timestamp for a token minted now.
pub fn reset_token_expiry() -> DateTime<Utc> {
    now_utc() + Duration::minutes(RESET_TOKEN_TTL_MINUTES)
}

/// Check whether a stored expiry is still in the future.
pub fn is_token_live(expires_at: Option<DateTime<Utc>>) -> bool {
    expires_at.is_some_and(|t| t > now_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_live() {
        let reset = new_reset_token();
        assert!(!reset.token.is_empty());
        assert!(is_token_live(Some(reset.expires_at)));
    }

    #[test]
    fn test_expired_and_absent_tokens_are_dead() {
        assert!(!is_token_live(Some(Utc::now() - Duration::minutes(1))));
        assert!(!is_token_live(None));
    }
}
