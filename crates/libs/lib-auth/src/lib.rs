//! # Authentication Library
//!
//! Authentication, password hashing, JWT token management and password-reset
//! tokens.

pub mod pwd;
pub mod reset;
pub mod token;

// Re-export commonly used types
pub use pwd::{hash_password, verify_password};
pub use reset::{is_token_live, new_reset_token, reset_token_expiry, ResetToken};
pub use token::{decode_jwt, decode_jwt_strict, encode_jwt, Claims, TokenRejection};
