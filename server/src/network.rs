//! Server network layer: TCP accept loop and per-connection line I/O
//!
//! Each connection gets two tasks:
//! - **Reader**: reads `\n`-terminated lines and feeds them one at a time to
//!   the connection's [`Session`], so a session never processes two lines
//!   concurrently
//! - **Writer**: drains the connection's outbox into the socket
//!
//! Sessions, rooms and games only ever enqueue into an outbox, so a slow or
//! broken client never stalls a lock other connections need.

use crate::directory::Directory;
use crate::session::Session;
use log::{debug, error, info, warn};
use shared::{strip_line_ending, Message};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// Accepts connections and drives one session per client
pub struct Server {
    listener: TcpListener,
    directory: Arc<Directory>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        directory: Arc<Directory>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);

        Ok(Server {
            listener,
            directory,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn directory(&self) -> Arc<Directory> {
        Arc::clone(&self.directory)
    }

    /// Accepts connections until `shutdown` completes.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Server shutting down");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let directory = Arc::clone(&self.directory);
                            tokio::spawn(handle_connection(stream, peer, directory));
                        }
                        Err(e) => warn!("Failed to accept connection: {}", e),
                    }
                }
            }
        }

        Ok(())
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        self.run_until(std::future::pending()).await
    }
}

async fn handle_connection(stream: TcpStream, peer: SocketAddr, directory: Arc<Directory>) {
    info!("Accepted connection from {}", peer);

    let (reader, writer) = stream.into_split();
    let (outbox, inbox) = mpsc::unbounded_channel();
    let writer_task = tokio::spawn(write_outbox(writer, inbox, peer));

    let closed = outbox.clone();
    let mut session = Session::new(directory, outbox);
    let mut lines = BufReader::new(reader).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    let line = strip_line_ending(&line);
                    if line.trim().is_empty() {
                        continue;
                    }
                    session.process_message(line).await;
                    if session.is_closed() {
                        break;
                    }
                }
                Ok(None) => {
                    info!("Client on {} disconnected", peer);
                    break;
                }
                Err(e) => {
                    warn!("Failed to read from {}: {}", peer, e);
                    break;
                }
            },
            _ = closed.closed() => {
                debug!("Writer for {} stopped", peer);
                break;
            }
        }
    }

    // Drops the user from the directory; pending output still flushes
    session.terminate().await;
    drop(session);
    drop(closed);

    if let Err(e) = writer_task.await {
        error!("Writer task for {} panicked: {}", peer, e);
    }
    info!("Connection closed: {}", peer);
}

/// Writes queued messages as lines until every sender is gone or a write fails.
async fn write_outbox(
    mut writer: OwnedWriteHalf,
    mut inbox: mpsc::UnboundedReceiver<Message>,
    peer: SocketAddr,
) {
    while let Some(message) = inbox.recv().await {
        let line = format!("{}\n", message);
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            warn!("Failed to send to {}: {}", peer, e);
            return;
        }
    }

    if let Err(e) = writer.shutdown().await {
        debug!("Failed to shut down connection to {}: {}", peer, e);
    }
}
