//! Per-connection protocol state machine.
//!
//! ```text
//! Unauthenticated --NICK ok--> Authenticated
//!        |                          |
//!        +----------QUIT------------+--> Closed
//! ```
//!
//! Every processed line yields at most one `SYSMSG <CMD> <RESULT>` reply.
//! Commands whose effects the game reports itself (`STARTGAME`, `TXTRESP`,
//! `SELECTRESP` on success) produce no reply of their own.

use crate::directory::Directory;
use crate::user::Outbox;
use log::{info, warn};
use shared::{raw_param, system_reply, Command, CommandResult, Message};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    Unauthenticated,
    Authenticated { nickname: String },
    Closed,
}

/// What to answer for a processed command.
enum Reply {
    Result(CommandResult),
    WithInfo(CommandResult, String),
    Suppressed,
}

pub struct Session {
    directory: Arc<Directory>,
    outbox: Outbox,
    state: SessionState,
}

impl Session {
    pub fn new(directory: Arc<Directory>, outbox: Outbox) -> Self {
        Self {
            directory,
            outbox,
            state: SessionState::Unauthenticated,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    pub fn nickname(&self) -> Option<&str> {
        match &self.state {
            SessionState::Authenticated { nickname } => Some(nickname.as_str()),
            _ => None,
        }
    }

    /// Handles one received line. Lines arriving after the session closed
    /// are ignored.
    pub async fn process_message(&mut self, line: &str) {
        if self.is_closed() {
            return;
        }

        let message = Message::parse(line);
        let command = Command::from_token(message.command());

        let reply = if command == Command::Quit {
            self.terminate().await;
            Reply::Result(CommandResult::Accepted)
        } else {
            self.handle_command(command, &message, line).await
        };

        let (result, info) = match reply {
            Reply::Result(result) => (result, String::new()),
            Reply::WithInfo(result, info) => (result, info),
            Reply::Suppressed => return,
        };

        if self
            .outbox
            .send(system_reply(message.command(), result, &info))
            .is_err()
        {
            warn!(
                "Connection closed before reply to {} could be sent",
                message.command()
            );
            self.terminate().await;
        }
    }

    /// Closes the session and removes its user from the directory. Safe to
    /// call more than once.
    pub async fn terminate(&mut self) {
        let previous = std::mem::replace(&mut self.state, SessionState::Closed);
        if let SessionState::Authenticated { nickname } = previous {
            self.directory.remove_user(&nickname).await;
            info!("Session for {} closed", nickname);
        }
    }

    async fn handle_command(&mut self, command: Command, message: &Message, line: &str) -> Reply {
        let nickname = match &self.state {
            SessionState::Authenticated { nickname } => Some(nickname.clone()),
            SessionState::Unauthenticated => None,
            SessionState::Closed => return Reply::Suppressed,
        };
        let Some(nickname) = nickname else {
            return self.handle_unauthenticated(command, message).await;
        };

        let directory = &self.directory;
        let param = message.param();

        match command {
            // A session identifies only once
            Command::Nick => Reply::Result(CommandResult::Rejected),
            Command::Join => {
                let joined = match param {
                    Some(room) if !room.is_empty() => directory.join(&nickname, room).await,
                    _ => false,
                };
                Reply::Result(CommandResult::from_success(joined))
            }
            Command::Msg => {
                let sent = match raw_param(line) {
                    Some(text) => directory.broadcast_message(&nickname, text).await,
                    None => false,
                };
                Reply::Result(CommandResult::from_success(sent))
            }
            Command::ListGames => Reply::WithInfo(CommandResult::Accepted, directory.list_games()),
            Command::StartGame => {
                let started = match param {
                    Some(game) => directory.start_game(&nickname, game).await,
                    None => false,
                };
                suppress_on_success(started)
            }
            Command::TxtResp => {
                let accepted = match param {
                    Some(text) => directory.dispatch_text_response(&nickname, text).await,
                    None => false,
                };
                suppress_on_success(accepted)
            }
            Command::SelectResp => {
                let accepted = match param.and_then(parse_choice) {
                    Some(choice) => directory.dispatch_select_response(&nickname, choice).await,
                    None => false,
                };
                suppress_on_success(accepted)
            }
            Command::Quit | Command::Unknown(_) => Reply::Result(CommandResult::Unidentified),
        }
    }

    async fn handle_unauthenticated(&mut self, command: Command, message: &Message) -> Reply {
        if command != Command::Nick {
            return Reply::Result(CommandResult::Unidentified);
        }

        let nickname = match message.param() {
            Some(nickname) if !nickname.is_empty() => nickname,
            _ => return Reply::Result(CommandResult::Rejected),
        };

        if self.directory.add_user(nickname, self.outbox.clone()).await {
            self.state = SessionState::Authenticated {
                nickname: nickname.to_string(),
            };
            Reply::Result(CommandResult::Accepted)
        } else {
            Reply::Result(CommandResult::Rejected)
        }
    }
}

fn suppress_on_success(succeeded: bool) -> Reply {
    if succeeded {
        Reply::Suppressed
    } else {
        Reply::Result(CommandResult::Rejected)
    }
}

fn parse_choice(param: &str) -> Option<usize> {
    param.trim().parse().ok()
}
