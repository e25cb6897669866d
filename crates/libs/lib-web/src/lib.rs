//! # Web Library
//!
//! HTTP server, REST handlers, middleware and the realtime layer for the
//! messaging backend.

pub mod bot;
pub mod handlers;
pub mod middleware;
pub mod realtime;
pub mod server;

pub use server::{start_server, AppState, ServerConfig};

#[cfg(test)]
pub(crate) mod test_support;
