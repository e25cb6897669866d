//! # HTTP Handlers
//!
//! REST request handlers, grouped by resource.

pub mod auth;
pub mod conversations;
pub mod messages;
pub mod users;
