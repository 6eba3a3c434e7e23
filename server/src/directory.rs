//! Process-wide registry of identified users and rooms
//!
//! The directory is the only owner of the nickname and room maps. Callers go
//! through atomic check-and-insert / get-or-create operations and never see
//! the raw collections. Every session shares one `Arc<Directory>`.
//!
//! Lock order is always registry first, then a room, and no lock is held
//! while a message is written to a socket: users only enqueue into their
//! outbox.

use crate::game::GameRegistry;
use crate::room::Room;
use crate::user::{Outbox, User};
use log::{debug, error, info};
use shared::{Message, USRMSG};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

pub struct Directory {
    /// Identified users indexed by nickname
    users: RwLock<HashMap<String, Arc<User>>>,
    /// Rooms indexed by name, created on first reference
    rooms: Mutex<HashMap<String, Arc<Room>>>,
    games: GameRegistry,
}

impl Directory {
    pub fn new(games: GameRegistry) -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            rooms: Mutex::new(HashMap::new()),
            games,
        }
    }

    /// Registers `nickname` with its outbox. Returns false if the nickname
    /// is already taken.
    pub async fn add_user(&self, nickname: &str, outbox: Outbox) -> bool {
        let mut users = self.users.write().await;
        if users.contains_key(nickname) {
            return false;
        }

        users.insert(nickname.to_string(), Arc::new(User::new(nickname, outbox)));
        info!("User {} registered", nickname);
        true
    }

    /// Removes a user from the registry and from their room. Calling it for
    /// an unknown nickname does nothing.
    pub async fn remove_user(&self, nickname: &str) -> bool {
        let removed = self.users.write().await.remove(nickname);
        let Some(user) = removed else {
            return false;
        };

        if let Some(room) = user.take_room().await {
            room.remove_user(nickname).await;
            debug!("User {} left room {}", nickname, room.name());
        }

        info!("User {} removed", nickname);
        true
    }

    pub async fn join(&self, nickname: &str, room_name: &str) -> bool {
        let Some(user) = self.authenticated_user(nickname).await else {
            return false;
        };
        if user.room().await.is_some() {
            return false;
        }

        let room = {
            let mut rooms = self.rooms.lock().await;
            let room = rooms.entry(room_name.to_string()).or_insert_with(|| {
                info!("Room {} created", room_name);
                Arc::new(Room::new(room_name))
            });
            Arc::clone(room)
        };

        if !room.add_user(Arc::clone(&user)).await {
            return false;
        }
        if !user.set_room(Arc::clone(&room)).await {
            room.remove_user(nickname).await;
            return false;
        }

        info!("User {} joined room {}", nickname, room_name);
        true
    }

    /// Relays `text` as `USRMSG <nickname>: <text>` to the other members of
    /// the sender's room.
    pub async fn broadcast_message(&self, nickname: &str, text: &str) -> bool {
        let Some(room) = self.room_of(nickname).await else {
            return false;
        };

        let message = Message::new(USRMSG, format!("{}: {}", nickname, text));
        room.broadcast_except(nickname, &message).await;
        true
    }

    /// Supported games formatted as `[ name1 name2 ]`.
    pub fn list_games(&self) -> String {
        let mut list = String::from("[ ");
        for name in self.games.names() {
            list.push_str(name);
            list.push(' ');
        }
        list.push(']');
        list
    }

    pub async fn start_game(&self, nickname: &str, game_name: &str) -> bool {
        if !self.games.supports(game_name) {
            return false;
        }
        let Some(user) = self.authenticated_user(nickname).await else {
            return false;
        };
        let Some(room) = user.room().await else {
            return false;
        };
        if room.has_game().await {
            return false;
        }

        let players = room.users().await;
        let game = match self.games.create(game_name, players).await {
            Ok(game) => game,
            Err(e) => {
                error!(
                    "Could not start {} in room {}: {}",
                    game_name,
                    room.name(),
                    e
                );
                return false;
            }
        };

        room.start_game(&user, game).await
    }

    pub async fn dispatch_text_response(&self, nickname: &str, text: &str) -> bool {
        let Some(user) = self.authenticated_user(nickname).await else {
            return false;
        };
        let Some(room) = user.room().await else {
            return false;
        };

        match room.handle_text_response(&user, text).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Text response from {} rejected: {}", nickname, e);
                false
            }
        }
    }

    pub async fn dispatch_select_response(&self, nickname: &str, choice: usize) -> bool {
        let Some(user) = self.authenticated_user(nickname).await else {
            return false;
        };
        let Some(room) = user.room().await else {
            return false;
        };

        match room.handle_select_response(&user, choice).await {
            Ok(()) => true,
            Err(e) => {
                debug!("Select response from {} rejected: {}", nickname, e);
                false
            }
        }
    }

    pub async fn user(&self, nickname: &str) -> Option<Arc<User>> {
        self.users.read().await.get(nickname).cloned()
    }

    pub async fn room(&self, name: &str) -> Option<Arc<Room>> {
        self.rooms.lock().await.get(name).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    async fn room_of(&self, nickname: &str) -> Option<Arc<Room>> {
        self.authenticated_user(nickname).await?.room().await
    }

    /// Looks up a user the calling session has identified. A miss breaks
    /// the session contract, so it is logged and only fails this request.
    async fn authenticated_user(&self, nickname: &str) -> Option<Arc<User>> {
        let user = self.user(nickname).await;
        if user.is_none() {
            error!("Identified user {} is missing from the directory", nickname);
        }
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluffer;
    use crate::questions::{Question, QuestionBank};
    use tokio::sync::mpsc;

    type Inbox = mpsc::UnboundedReceiver<Message>;

    fn bluffer_registry() -> GameRegistry {
        GameRegistry::new().register(bluffer::NAME, |players| {
            let bank = QuestionBank::new(vec![
                Question::new("Q1", "a"),
                Question::new("Q2", "b"),
                Question::new("Q3", "c"),
            ]);
            Ok(Box::new(bluffer::Bluffer::new(bank, players)?) as Box<dyn crate::game::Game>)
        })
    }

    async fn register(directory: &Directory, nickname: &str) -> Inbox {
        let (tx, rx) = mpsc::unbounded_channel();
        assert!(directory.add_user(nickname, tx).await);
        rx
    }

    fn drain(inbox: &mut Inbox) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(message) = inbox.try_recv() {
            lines.push(message.to_string());
        }
        lines
    }

    #[tokio::test]
    async fn test_add_user_once() {
        let directory = Directory::new(GameRegistry::new());
        let _rx = register(&directory, "alice").await;

        let (tx, _rx2) = mpsc::unbounded_channel();
        assert!(!directory.add_user("alice", tx.clone()).await);
        assert_eq!(directory.user_count().await, 1);

        assert!(directory.remove_user("alice").await);
        assert!(directory.add_user("alice", tx).await);
    }

    #[tokio::test]
    async fn test_remove_user_is_idempotent() {
        let directory = Directory::new(GameRegistry::new());
        let _rx = register(&directory, "alice").await;

        assert!(directory.remove_user("alice").await);
        assert!(!directory.remove_user("alice").await);
        assert!(directory.user("alice").await.is_none());
    }

    #[tokio::test]
    async fn test_join_creates_room_once() {
        let directory = Directory::new(GameRegistry::new());
        let _a = register(&directory, "alice").await;
        let _b = register(&directory, "bob").await;

        assert!(directory.join("alice", "lobby").await);
        assert!(directory.join("bob", "lobby").await);
        assert_eq!(directory.room_count().await, 1);

        let room = directory.room("lobby").await.unwrap();
        assert_eq!(room.nicknames().await, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_rejoin_is_rejected() {
        let directory = Directory::new(GameRegistry::new());
        let _a = register(&directory, "alice").await;

        assert!(directory.join("alice", "lobby").await);
        assert!(!directory.join("alice", "lobby").await);
        assert!(!directory.join("alice", "other").await);
    }

    #[tokio::test]
    async fn test_unknown_user_fails_request() {
        let directory = Directory::new(bluffer_registry());

        assert!(!directory.join("ghost", "lobby").await);
        assert!(!directory.broadcast_message("ghost", "hi").await);
        assert!(!directory.start_game("ghost", "bluffer").await);
        assert!(!directory.dispatch_text_response("ghost", "x").await);
    }

    #[tokio::test]
    async fn test_broadcast_skips_sender() {
        let directory = Directory::new(GameRegistry::new());
        let mut alice = register(&directory, "alice").await;
        let mut bob = register(&directory, "bob").await;

        assert!(!directory.broadcast_message("alice", "Hello").await);

        directory.join("alice", "lobby").await;
        directory.join("bob", "lobby").await;
        assert!(directory.broadcast_message("alice", "Hello").await);

        assert_eq!(drain(&mut bob), vec!["USRMSG alice: Hello"]);
        assert!(drain(&mut alice).is_empty());
    }

    #[tokio::test]
    async fn test_list_games() {
        assert_eq!(Directory::new(GameRegistry::new()).list_games(), "[ ]");
        assert_eq!(
            Directory::new(bluffer_registry()).list_games(),
            "[ bluffer ]"
        );
    }

    #[tokio::test]
    async fn test_start_game_rules() {
        let directory = Directory::new(bluffer_registry());
        let mut alice = register(&directory, "alice").await;
        let _bob = register(&directory, "bob").await;

        // not in a room
        assert!(!directory.start_game("alice", "bluffer").await);

        directory.join("alice", "lobby").await;
        assert!(!directory.start_game("alice", "chess").await);
        assert!(directory.start_game("alice", "bluffer").await);

        let lines = drain(&mut alice);
        assert_eq!(lines[0], "SYSMSG STARTGAME ACCEPTED");
        assert!(lines[1].starts_with("ASKTXT Q"));

        assert!(!directory.start_game("alice", "bluffer").await);
        assert!(!directory.join("bob", "lobby").await);
    }

    #[tokio::test]
    async fn test_game_failure_rejects_start() {
        let registry = GameRegistry::new().register(bluffer::NAME, |players| {
            let bank = QuestionBank::new(vec![Question::new("Q1", "a")]);
            Ok(Box::new(bluffer::Bluffer::new(bank, players)?) as Box<dyn crate::game::Game>)
        });
        let directory = Directory::new(registry);
        let mut alice = register(&directory, "alice").await;
        directory.join("alice", "lobby").await;

        assert!(!directory.start_game("alice", "bluffer").await);
        assert!(drain(&mut alice).is_empty());
        assert!(!directory.room("lobby").await.unwrap().has_game().await);
    }

    #[tokio::test]
    async fn test_dispatch_without_game() {
        let directory = Directory::new(bluffer_registry());
        let _a = register(&directory, "alice").await;

        assert!(!directory.dispatch_text_response("alice", "x").await);
        directory.join("alice", "lobby").await;
        assert!(!directory.dispatch_text_response("alice", "x").await);
        assert!(!directory.dispatch_select_response("alice", 0).await);
    }

    #[tokio::test]
    async fn test_remove_user_leaves_room() {
        let directory = Directory::new(GameRegistry::new());
        let _a = register(&directory, "alice").await;
        let _b = register(&directory, "bob").await;
        directory.join("alice", "lobby").await;
        directory.join("bob", "lobby").await;

        directory.remove_user("alice").await;

        let room = directory.room("lobby").await.unwrap();
        assert_eq!(room.nicknames().await, vec!["bob"]);
    }

    #[tokio::test]
    async fn test_concurrent_nick_registration() {
        let directory = Arc::new(Directory::new(GameRegistry::new()));
        let mut handles = Vec::new();

        for _ in 0..16 {
            let directory = Arc::clone(&directory);
            handles.push(tokio::spawn(async move {
                let (tx, _rx) = mpsc::unbounded_channel();
                directory.add_user("alice", tx).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_joins_and_final_answers() {
        const PLAYERS: usize = 4;

        for _ in 0..50 {
            let directory = Arc::new(Directory::new(bluffer_registry()));
            let nicknames: Vec<String> =
                (0..PLAYERS).map(|i| format!("player{}", i)).collect();
            let mut inboxes = Vec::new();
            for nickname in &nicknames {
                inboxes.push(register(&directory, nickname).await);
            }

            let joins: Vec<_> = nicknames
                .iter()
                .cloned()
                .map(|nickname| {
                    let directory = Arc::clone(&directory);
                    tokio::spawn(async move { directory.join(&nickname, "arena").await })
                })
                .collect();
            for join in joins {
                assert!(join.await.unwrap());
            }
            assert_eq!(directory.room_count().await, 1);

            assert!(directory.start_game("player0", "bluffer").await);

            // Every answer may be the one that completes the stage
            let answers: Vec<_> = nicknames
                .iter()
                .cloned()
                .map(|nickname| {
                    let directory = Arc::clone(&directory);
                    tokio::spawn(async move {
                        let guess = format!("guess from {}", nickname);
                        directory.dispatch_text_response(&nickname, &guess).await
                    })
                })
                .collect();
            for answer in answers {
                assert!(answer.await.unwrap());
            }

            for inbox in &mut inboxes {
                let ballots = drain(inbox)
                    .iter()
                    .filter(|line| line.starts_with("ASKCHOICES"))
                    .count();
                assert_eq!(ballots, 1);
            }
        }
    }
}
