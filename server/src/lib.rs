//! # Turn-Based Game Protocol Server
//!
//! This library implements a text-line multiplayer game server. Clients connect
//! over TCP, identify with a nickname, gather in named rooms and play turn-based
//! games whose rules plug in through a registry.
//!
//! ## Core Responsibilities
//!
//! ### Session Protocol
//! Every connection runs a small state machine (unidentified, identified,
//! closed) that turns each received line into directory, room or game
//! operations and answers with a `SYSMSG <CMD> <RESULT>` reply. Commands whose
//! outcome a game reports itself are answered by the game instead.
//!
//! ### Shared Directory
//! All sessions share one directory of nicknames and rooms. Nickname
//! registration and room creation are atomic check-and-insert operations, so
//! two clients racing for the same nickname or room name can't both win.
//!
//! ### Games
//! A room hosts at most one game at a time. Games receive text answers
//! (`TXTRESP`) and numbered choices (`SELECTRESP`) and broadcast their own
//! prompts and results. The bundled game is Bluffer, a trivia game where
//! players invent fake answers to fool each other.
//!
//! ## Module Organization
//!
//! ### Directory Module (`directory`)
//! Registry of identified users and rooms, and the entry point for every
//! room and game operation a session performs.
//!
//! ### Room and User Modules (`room`, `user`)
//! A room's lock serializes membership changes and every game event. A user
//! carries its nickname, its room and the outbox of its connection.
//!
//! ### Session Module (`session`)
//! The per-connection protocol state machine and its reply rules.
//!
//! ### Game Modules (`game`, `bluffer`, `questions`)
//! The game trait with its name-to-constructor registry, the Bluffer rules,
//! and the JSON question bank Bluffer draws from.
//!
//! ### Network Module (`network`)
//! TCP accept loop plus one reader task and one writer task per connection.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::{bluffer, directory::Directory, game::GameRegistry, network::Server};
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let games = GameRegistry::new().register(
//!         bluffer::NAME,
//!         bluffer::constructor(PathBuf::from("questions.json")),
//!     );
//!     let directory = Arc::new(Directory::new(games));
//!
//!     let server = Server::bind("0.0.0.0:7000", directory).await?;
//!     server.run().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod bluffer;
pub mod directory;
pub mod game;
pub mod network;
pub mod questions;
pub mod room;
pub mod session;
pub mod user;
