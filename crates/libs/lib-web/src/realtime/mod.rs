//! # Realtime Layer
//!
//! WebSocket delivery of messages, read receipts and typing indicators.
//!
//! Every connected client holds one WebSocket, auto-subscribed to its own
//! user channel and explicitly joined to the conversation rooms it is
//! viewing. The server pushes [`RealtimeEvent`]s through the broadcast
//! channels managed by [`Fanout`]; REST handlers publish into them after a
//! write succeeds, so the socket layer only touches the database for join
//! membership checks.

pub mod events;
pub mod fanout;
pub mod socket;

pub use events::{ClientEvent, RealtimeEvent};
pub use fanout::Fanout;
pub use socket::ws_handler;
