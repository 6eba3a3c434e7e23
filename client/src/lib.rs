//! # Terminal Game Client
//!
//! A line-oriented client for the turn-based game server. It is a thin relay:
//! every line typed by the player is sent to the server as-is, and every line
//! the server sends is printed. The protocol itself lives on the server.
//!
//! ## Session Flow
//!
//! A typical session looks like this:
//!
//! ```text
//! > NICK alice
//! SYSMSG NICK ACCEPTED
//! > JOIN lobby
//! SYSMSG JOIN ACCEPTED
//! > STARTGAME bluffer
//! SYSMSG STARTGAME ACCEPTED
//! ASKTXT What is the capital of Australia?
//! > TXTRESP sydney
//! SYSMSG TXTRESP ACCEPTED
//! ASKCHOICES 0.canberra 1.sydney
//! > SELECTRESP 0
//! SYSMSG SELECTRESP ACCEPTED
//! GAMEMSG The correct answer is: canberra
//! GAMEMSG correct! +10pts
//! > QUIT
//! SYSMSG QUIT ACCEPTED
//! ```
//!
//! After `QUIT` is sent the client stops reading input and waits for the
//! server to close the connection, so the final reply is always printed.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::Client;
//! use tokio::io::BufReader;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::connect("127.0.0.1:7000").await?;
//!     client
//!         .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod network;
