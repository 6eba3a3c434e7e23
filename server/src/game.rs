//! Pluggable turn-based games and the name-to-constructor registry.
//!
//! A game never touches the room directly: the room hands it the current
//! member list on every call while holding its own lock, so membership and
//! round progress can't interleave.

use crate::questions::BankError;
use crate::user::User;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Whether a game keeps running after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameStatus {
    InProgress,
    Finished,
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("unknown game '{0}'")]
    UnknownGame(String),

    #[error("room has no active game")]
    NoActiveGame,

    #[error("not waiting for text responses")]
    UnexpectedTextResponse,

    #[error("not waiting for choice responses")]
    UnexpectedSelectResponse,

    #[error("{0} already answered this question")]
    AlreadyAnswered(String),

    #[error("{0} already voted on this ballot")]
    AlreadyVoted(String),

    #[error("choice {0} is not on the ballot")]
    InvalidChoice(usize),

    #[error("question bank has {available} distinct questions, {needed} needed")]
    NotEnoughQuestions { needed: usize, available: usize },

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error("game constructor did not complete: {0}")]
    Constructor(#[from] tokio::task::JoinError),
}

/// A turn-based game bound to one room.
pub trait Game: Send {
    fn name(&self) -> &'static str;

    /// Sends the opening prompt once the game is attached to its room.
    fn begin(&mut self, players: &[Arc<User>]);

    fn handle_text_response(
        &mut self,
        user: &User,
        text: &str,
        players: &[Arc<User>],
    ) -> Result<GameStatus, GameError>;

    fn handle_select_response(
        &mut self,
        user: &User,
        choice: usize,
        players: &[Arc<User>],
    ) -> Result<GameStatus, GameError>;

    /// Called after a member left the room; `players` no longer contains them.
    fn handle_departure(&mut self, nickname: &str, players: &[Arc<User>]) -> GameStatus;
}

type Constructor = Arc<dyn Fn(&[Arc<User>]) -> Result<Box<dyn Game>, GameError> + Send + Sync>;

/// Supported games, keyed by the (lowercase) name clients use in `STARTGAME`.
#[derive(Default, Clone)]
pub struct GameRegistry {
    constructors: BTreeMap<String, Constructor>,
}

impl GameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: &str, constructor: F) -> Self
    where
        F: Fn(&[Arc<User>]) -> Result<Box<dyn Game>, GameError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_lowercase(), Arc::new(constructor));
        self
    }

    pub fn supports(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Game names in a stable (sorted) order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    /// Builds a game on the blocking pool, since constructors may read files.
    pub async fn create(
        &self,
        name: &str,
        players: Vec<Arc<User>>,
    ) -> Result<Box<dyn Game>, GameError> {
        let constructor = self
            .constructors
            .get(name)
            .map(Arc::clone)
            .ok_or_else(|| GameError::UnknownGame(name.to_string()))?;
        tokio::task::spawn_blocking(move || constructor(&players)).await?
    }
}

/// Sends `message` to every player.
pub(crate) fn broadcast(players: &[Arc<User>], message: &shared::Message) {
    for player in players {
        player.send(message.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::thread;

    struct NoopGame;

    impl Game for NoopGame {
        fn name(&self) -> &'static str {
            "noop"
        }

        fn begin(&mut self, _players: &[Arc<User>]) {}

        fn handle_text_response(
            &mut self,
            _user: &User,
            _text: &str,
            _players: &[Arc<User>],
        ) -> Result<GameStatus, GameError> {
            Ok(GameStatus::InProgress)
        }

        fn handle_select_response(
            &mut self,
            _user: &User,
            _choice: usize,
            _players: &[Arc<User>],
        ) -> Result<GameStatus, GameError> {
            Ok(GameStatus::Finished)
        }

        fn handle_departure(&mut self, _nickname: &str, _players: &[Arc<User>]) -> GameStatus {
            GameStatus::InProgress
        }
    }

    #[test]
    fn test_registry_names_are_sorted() {
        let registry = GameRegistry::new()
            .register("zeta", |_| Ok(Box::new(NoopGame) as Box<dyn Game>))
            .register("Alpha", |_| Ok(Box::new(NoopGame) as Box<dyn Game>));

        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(registry.supports("alpha"));
        assert!(!registry.supports("Alpha"));
    }

    #[tokio::test]
    async fn test_registry_create_unknown_game() {
        let registry = GameRegistry::new();
        let result = registry.create("bluffer", Vec::new()).await;
        assert!(matches!(result, Err(GameError::UnknownGame(name)) if name == "bluffer"));
    }

    #[tokio::test]
    async fn test_registry_create_known_game() {
        let registry =
            GameRegistry::new().register("noop", |_| Ok(Box::new(NoopGame) as Box<dyn Game>));
        let game = registry.create("noop", Vec::new()).await.unwrap();
        assert_eq!(game.name(), "noop");
    }

    #[tokio::test]
    async fn test_constructor_runs_off_the_runtime_thread() {
        let seen = Arc::new(Mutex::new(None));
        let recorder = Arc::clone(&seen);
        let registry = GameRegistry::new().register("noop", move |_| {
            *recorder.lock().unwrap() = Some(thread::current().id());
            Ok(Box::new(NoopGame) as Box<dyn Game>)
        });

        registry.create("noop", Vec::new()).await.unwrap();

        let constructor_thread = seen.lock().unwrap().expect("constructor was not called");
        assert_ne!(constructor_thread, thread::current().id());
    }

    #[tokio::test]
    async fn test_constructor_panic_is_an_error() {
        let registry = GameRegistry::new().register(
            "broken",
            |_| -> Result<Box<dyn Game>, GameError> { panic!("bank exploded") },
        );

        let result = registry.create("broken", Vec::new()).await;
        assert!(matches!(result, Err(GameError::Constructor(_))));
    }
}
