use log::{debug, info};
use shared::{strip_line_ending, Command, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Returns true if sending `line` ends the session.
pub fn is_quit(line: &str) -> bool {
    Command::from_token(Message::parse(line).command()) == Command::Quit
}

/// Line-oriented connection to a game server
pub struct Client {
    stream: TcpStream,
}

impl Client {
    pub async fn connect(server_addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(server_addr).await?;
        info!("Connected to {}", stream.peer_addr()?);
        Ok(Client { stream })
    }

    /// Forwards `input` lines to the server and copies server lines to
    /// `output` until the server closes the connection.
    ///
    /// After a `QUIT` line is sent no more input is read; closing `input`
    /// sends `QUIT` on the user's behalf.
    pub async fn run<I, O>(self, input: I, mut output: O) -> Result<(), Box<dyn std::error::Error>>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (reader, mut writer) = self.stream.into_split();
        let mut server_lines = BufReader::new(reader).lines();
        let mut input_lines = input.lines();
        let mut quit_sent = false;

        loop {
            tokio::select! {
                line = server_lines.next_line() => match line? {
                    Some(line) => {
                        output.write_all(line.as_bytes()).await?;
                        output.write_all(b"\n").await?;
                        output.flush().await?;
                    }
                    None => {
                        info!("Server closed the connection");
                        break;
                    }
                },
                line = input_lines.next_line(), if !quit_sent => {
                    let line = match line? {
                        Some(line) => line,
                        None => {
                            debug!("Input closed, quitting");
                            "QUIT".to_string()
                        }
                    };
                    let line = strip_line_ending(&line);
                    writer.write_all(line.as_bytes()).await?;
                    writer.write_all(b"\n").await?;
                    quit_sent = is_quit(line);
                }
            }
        }

        Ok(())
    }
}
