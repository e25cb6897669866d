//! # Middleware
//!
//! Request stamping, logging and authentication middleware.

pub mod mw_auth;
pub mod mw_logging;
pub mod mw_req_stamp;

pub use mw_auth::require_auth;
pub use mw_logging::log_requests;
pub use mw_req_stamp::{stamp_req, RequestStamp};
