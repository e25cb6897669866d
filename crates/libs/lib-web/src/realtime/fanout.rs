//! # Fanout
//!
//! Broadcast registry for realtime delivery: one channel per conversation
//! ("room") that sockets join and leave explicitly, plus one channel per
//! user for direct notifications (auto-subscribed on connect). Channels are
//! created lazily and dropped when the last subscriber disconnects.
//!
//! Exclusion (the message sender, the typing originator) travels on the
//! frame itself: every subscriber of a room shares one broadcast channel,
//! so the excluded connection filters itself out on receive.
//!
//! The registry is plain shared state handed to handlers through
//! [`AppState`], never a global.
//!
//! [`AppState`]: crate::server::AppState

use super::events::RealtimeEvent;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 100;

/// One broadcast unit: a serialized event plus the user it must not reach.
#[derive(Clone, Debug)]
pub struct Frame {
    pub exclude: Option<i64>,
    pub payload: String,
}

/// Registry of per-conversation rooms and per-user channels.
#[derive(Clone, Default)]
pub struct Fanout {
    rooms: Arc<RwLock<HashMap<i64, broadcast::Sender<Frame>>>>,
    users: Arc<RwLock<HashMap<i64, broadcast::Sender<Frame>>>>,
}

impl Fanout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a user's direct channel, creating it if needed.
    pub async fn subscribe_user(&self, user_id: i64) -> broadcast::Receiver<Frame> {
        Self::subscribe(&self.users, user_id).await
    }

    /// Join a conversation room, creating it if needed.
    pub async fn join_room(&self, conversation_id: i64) -> broadcast::Receiver<Frame> {
        Self::subscribe(&self.rooms, conversation_id).await
    }

    async fn subscribe(
        channels: &Arc<RwLock<HashMap<i64, broadcast::Sender<Frame>>>>,
        key: i64,
    ) -> broadcast::Receiver<Frame> {
        let mut channels = channels.write().await;
        if let Some(sender) = channels.get(&key) {
            sender.subscribe()
        } else {
            let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
            channels.insert(key, tx);
            rx
        }
    }

    /// Publish an event into a conversation room. `exclude` marks the user
    /// whose connections must skip the frame (typically the actor, who
    /// already has the result from the REST response).
    ///
    /// A room nobody joined is silently skipped; realtime delivery is
    /// best-effort and the database stays the source of truth.
    pub async fn publish_to_room(
        &self,
        conversation_id: i64,
        event: &RealtimeEvent,
        exclude: Option<i64>,
    ) {
        let Some(payload) = Self::serialize(event) else {
            return;
        };
        let rooms = self.rooms.read().await;
        if let Some(sender) = rooms.get(&conversation_id) {
            // A send error just means no receiver is currently listening
            let _ = sender.send(Frame { exclude, payload });
        }
    }

    /// Publish an event to a set of users' direct channels, skipping
    /// `exclude`. Used for notifications that must reach a user whether or
    /// not they joined the room (e.g. a conversation they were added to).
    pub async fn publish_to_users(
        &self,
        user_ids: &[i64],
        event: &RealtimeEvent,
        exclude: Option<i64>,
    ) {
        let Some(payload) = Self::serialize(event) else {
            return;
        };
        let users = self.users.read().await;
        for &user_id in user_ids {
            if Some(user_id) == exclude {
                continue;
            }
            if let Some(sender) = users.get(&user_id) {
                let _ = sender.send(Frame {
                    exclude: None,
                    payload: payload.clone(),
                });
            }
        }
    }

    /// Drop a user's channel if nothing is subscribed to it anymore.
    pub async fn prune_user(&self, user_id: i64) {
        Self::prune(&self.users, user_id, "user").await;
    }

    /// Drop a room if nothing is subscribed to it anymore.
    pub async fn prune_room(&self, conversation_id: i64) {
        Self::prune(&self.rooms, conversation_id, "room").await;
    }

    async fn prune(
        channels: &Arc<RwLock<HashMap<i64, broadcast::Sender<Frame>>>>,
        key: i64,
        kind: &str,
    ) {
        let mut channels = channels.write().await;
        if let Some(sender) = channels.get(&key) {
            if sender.receiver_count() == 0 {
                channels.remove(&key);
                debug!("[FANOUT] Pruned {} channel {}", kind, key);
            }
        }
    }

    fn serialize(event: &RealtimeEvent) -> Option<String> {
        match serde_json::to_string(event) {
            Ok(payload) => Some(payload),
            Err(err) => {
                tracing::error!("[FANOUT] Failed to serialize event: {}", err);
                None
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn user_channel_count(&self) -> usize {
        self.users.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typing_event(conversation_id: i64, user_id: i64) -> RealtimeEvent {
        RealtimeEvent::TypingStart {
            conversation_id,
            user_id,
            username: "alice".to_string(),
        }
    }

    #[tokio::test]
    async fn test_room_publish_reaches_all_joined() {
        let fanout = Fanout::new();
        let mut rx_bob = fanout.join_room(1).await;
        let mut rx_carol = fanout.join_room(1).await;

        fanout.publish_to_room(1, &typing_event(1, 1), Some(1)).await;

        let frame = rx_bob.recv().await.unwrap();
        assert!(frame.payload.contains("typing:start"));
        assert_eq!(frame.exclude, Some(1));
        assert!(rx_carol.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let fanout = Fanout::new();
        let mut rx_room_one = fanout.join_room(1).await;
        let mut rx_room_two = fanout.join_room(2).await;

        fanout.publish_to_room(1, &typing_event(1, 1), None).await;

        assert!(rx_room_one.recv().await.is_ok());
        assert!(matches!(
            rx_room_two.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_user_publish_excludes_actor() {
        let fanout = Fanout::new();
        let mut rx_alice = fanout.subscribe_user(1).await;
        let mut rx_bob = fanout.subscribe_user(2).await;

        fanout
            .publish_to_users(&[1, 2], &typing_event(1, 1), Some(1))
            .await;

        assert!(rx_bob.recv().await.is_ok());
        // Alice's channel stays empty
        assert!(matches!(
            rx_alice.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_publish_to_empty_room_is_noop() {
        let fanout = Fanout::new();
        // Nobody joined room 9; must not panic or create a channel
        fanout.publish_to_room(9, &typing_event(9, 1), None).await;
        assert_eq!(fanout.room_count().await, 0);

        fanout.publish_to_users(&[9], &typing_event(9, 1), None).await;
        assert_eq!(fanout.user_channel_count().await, 0);
    }

    #[tokio::test]
    async fn test_prune_removes_orphaned_channels() {
        let fanout = Fanout::new();
        let rx_room = fanout.join_room(5).await;
        let rx_user = fanout.subscribe_user(7).await;
        assert_eq!(fanout.room_count().await, 1);
        assert_eq!(fanout.user_channel_count().await, 1);

        // Still subscribed: prune keeps the channels
        fanout.prune_room(5).await;
        fanout.prune_user(7).await;
        assert_eq!(fanout.room_count().await, 1);
        assert_eq!(fanout.user_channel_count().await, 1);

        drop(rx_room);
        drop(rx_user);
        fanout.prune_room(5).await;
        fanout.prune_user(7).await;
        assert_eq!(fanout.room_count().await, 0);
        assert_eq!(fanout.user_channel_count().await, 0);
    }
}
