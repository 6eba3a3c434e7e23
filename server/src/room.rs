//! Named group of users sharing at most one active game.

use crate::game::{Game, GameError, GameStatus};
use crate::user::User;
use log::info;
use shared::{system_reply, CommandResult, Message};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct RoomState {
    /// Members in join order
    members: Vec<Arc<User>>,
    game: Option<Box<dyn Game>>,
}

/// A room's lock serializes membership changes, game attach/detach and
/// every game event, so a round always sees a consistent member list.
pub struct Room {
    name: String,
    state: Mutex<RoomState>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(RoomState::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a member. Fails while a game is running or if the nickname is
    /// already present.
    pub async fn add_user(&self, user: Arc<User>) -> bool {
        let mut state = self.state.lock().await;
        if state.game.is_some()
            || state
                .members
                .iter()
                .any(|member| member.nickname() == user.nickname())
        {
            return false;
        }
        state.members.push(user);
        true
    }

    /// Removes a member and lets a running game re-check its stage. The game
    /// is detached once it finishes or the room empties.
    pub async fn remove_user(&self, nickname: &str) -> bool {
        let mut state = self.state.lock().await;
        let before = state.members.len();
        state.members.retain(|member| member.nickname() != nickname);
        if state.members.len() == before {
            return false;
        }

        let state = &mut *state;
        if let Some(game) = state.game.as_mut() {
            let status = if state.members.is_empty() {
                GameStatus::Finished
            } else {
                game.handle_departure(nickname, &state.members)
            };
            if status == GameStatus::Finished {
                info!(
                    "Game {} in room {} ended after {} left",
                    game.name(),
                    self.name,
                    nickname
                );
                state.game = None;
            }
        }
        true
    }

    pub async fn users(&self) -> Vec<Arc<User>> {
        self.state.lock().await.members.clone()
    }

    pub async fn nicknames(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .members
            .iter()
            .map(|member| member.nickname().to_string())
            .collect()
    }

    pub async fn has_game(&self) -> bool {
        self.state.lock().await.game.is_some()
    }

    /// Attaches `game`, confirms to `starter` and lets the game send its
    /// opening prompt. Returns false if a game is already running.
    pub async fn start_game(&self, starter: &User, mut game: Box<dyn Game>) -> bool {
        let mut state = self.state.lock().await;
        if state.game.is_some() {
            return false;
        }

        starter.send(system_reply("STARTGAME", CommandResult::Accepted, ""));
        game.begin(&state.members);
        info!(
            "{} started {} in room {}",
            starter.nickname(),
            game.name(),
            self.name
        );
        state.game = Some(game);
        true
    }

    /// Detaches the running game. Returns false if there was none.
    pub async fn stop_game(&self) -> bool {
        self.state.lock().await.game.take().is_some()
    }

    /// Sends `message` to every member except `sender`.
    pub async fn broadcast_except(&self, sender: &str, message: &Message) {
        let state = self.state.lock().await;
        for member in state.members.iter().filter(|m| m.nickname() != sender) {
            member.send(message.clone());
        }
    }

    pub async fn handle_text_response(&self, user: &User, text: &str) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let game = state.game.as_mut().ok_or(GameError::NoActiveGame)?;
        let status = game.handle_text_response(user, text, &state.members)?;
        self.detach_if_finished(state, status);
        Ok(())
    }

    pub async fn handle_select_response(
        &self,
        user: &User,
        choice: usize,
    ) -> Result<(), GameError> {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let game = state.game.as_mut().ok_or(GameError::NoActiveGame)?;
        let status = game.handle_select_response(user, choice, &state.members)?;
        self.detach_if_finished(state, status);
        Ok(())
    }

    fn detach_if_finished(&self, state: &mut RoomState, status: GameStatus) {
        if status == GameStatus::Finished {
            if let Some(game) = state.game.take() {
                info!("Game {} in room {} finished", game.name(), self.name);
            }
        }
    }
}
