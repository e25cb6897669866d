//! # Utilities Library
//!
//! Shared utility functions for environment variables, time, and validation.

pub mod envs;
pub mod time;
pub mod validation;

// Re-export commonly used functions
pub use envs::{get_env, get_env_parse};
pub use time::{format_time, now_utc};
pub use validation::{
    validate_bio, validate_conversation_name, validate_display_name, validate_email,
    validate_message_content, validate_password, validate_username,
};
