use crate::room::Room;
use log::debug;
use shared::Message;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Outbound message sink of one connection. The network layer drains it
/// into the socket, so sending never blocks while a lock is held.
pub type Outbox = mpsc::UnboundedSender<Message>;

/// An identified user.
///
/// Created when a `NICK` is accepted and dropped from the directory on
/// `QUIT` or disconnect. Games keep `Arc<User>` references while handling a
/// request, so a user removed mid-request still receives the rest of it.
pub struct User {
    nickname: String,
    room: RwLock<Option<Arc<Room>>>,
    outbox: Outbox,
}

impl User {
    pub fn new(nickname: impl Into<String>, outbox: Outbox) -> Self {
        Self {
            nickname: nickname.into(),
            room: RwLock::new(None),
            outbox,
        }
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    /// Queues a message for delivery. Returns false if the connection is gone.
    pub fn send(&self, message: Message) -> bool {
        match self.outbox.send(message) {
            Ok(()) => true,
            Err(e) => {
                debug!(
                    "Dropping message for {}: connection closed ({})",
                    self.nickname,
                    e.0
                );
                false
            }
        }
    }

    pub async fn room(&self) -> Option<Arc<Room>> {
        self.room.read().await.clone()
    }

    /// Sets the user's room. A user joins at most one room; returns false
    /// if a room is already set.
    pub async fn set_room(&self, room: Arc<Room>) -> bool {
        let mut current = self.room.write().await;
        if current.is_some() {
            return false;
        }
        *current = Some(room);
        true
    }

    pub async fn take_room(&self) -> Option<Arc<Room>> {
        self.room.write().await.take()
    }
}
