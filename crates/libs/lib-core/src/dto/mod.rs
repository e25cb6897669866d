//! # Data Transfer Objects (DTOs)
//!
//! Request and response structures for the REST API.

pub mod auth;
pub mod chat;
pub mod users;

pub use auth::*;
pub use chat::*;
pub use users::*;
