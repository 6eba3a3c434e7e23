//! Text-line message codec shared by the game server and the terminal client.
//!
//! Every line on the wire is `COMMAND[ parameter]`. Parsing uppercases the
//! command and lowercases the parameter; replies composed by the server keep
//! their casing and are built with [`Message::new`].

use std::fmt;

pub const SYSMSG: &str = "SYSMSG";
pub const USRMSG: &str = "USRMSG";
pub const GAMEMSG: &str = "GAMEMSG";
pub const ASKTXT: &str = "ASKTXT";
pub const ASKCHOICES: &str = "ASKCHOICES";

const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Removes any trailing CR/LF characters from a received line.
pub fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(LINE_ENDINGS)
}

/// Returns the parameter of a raw line exactly as typed, without case folding.
pub fn raw_param(line: &str) -> Option<&str> {
    strip_line_ending(line).split_once(' ').map(|(_, param)| param)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    command: String,
    param: Option<String>,
}

impl Message {
    /// Parses one received line into a normalized command/parameter pair.
    pub fn parse(line: &str) -> Self {
        let line = strip_line_ending(line);
        match line.split_once(' ') {
            Some((command, param)) => Self {
                command: command.to_uppercase(),
                param: Some(param.to_lowercase()),
            },
            None => Self {
                command: line.to_uppercase(),
                param: None,
            },
        }
    }

    /// Builds a message from an already-normalized command, keeping the
    /// parameter's casing untouched.
    pub fn new(command: impl Into<String>, param: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            param: Some(param.into()),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param {
            Some(param) => write!(f, "{} {}", self.command, param),
            None => f.write_str(&self.command),
        }
    }
}

/// Commands a client may send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick,
    Join,
    Msg,
    ListGames,
    StartGame,
    TxtResp,
    SelectResp,
    Quit,
    Unknown(String),
}

impl Command {
    /// Maps an uppercased command token onto a known command.
    pub fn from_token(token: &str) -> Self {
        match token {
            "NICK" => Command::Nick,
            "JOIN" => Command::Join,
            "MSG" => Command::Msg,
            "LISTGAMES" => Command::ListGames,
            "STARTGAME" => Command::StartGame,
            "TXTRESP" => Command::TxtResp,
            "SELECTRESP" => Command::SelectResp,
            "QUIT" => Command::Quit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// Outcome reported back in a `SYSMSG` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Accepted,
    Rejected,
    Unidentified,
}

impl CommandResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandResult::Accepted => "ACCEPTED",
            CommandResult::Rejected => "REJECTED",
            CommandResult::Unidentified => "UNIDENTIFIED",
        }
    }

    pub fn from_success(succeeded: bool) -> Self {
        if succeeded {
            CommandResult::Accepted
        } else {
            CommandResult::Rejected
        }
    }
}

/// Composes `SYSMSG <command> <RESULT>[ <info>]`.
pub fn system_reply(command: &str, result: CommandResult, info: &str) -> Message {
    let mut param = format!("{} {}", command, result.as_str());
    if !info.is_empty() {
        param.push(' ');
        param.push_str(info);
    }
    Message::new(SYSMSG, param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_only() {
        let msg = Message::parse("listgames\r\n");
        assert_eq!(msg.command(), "LISTGAMES");
        assert_eq!(msg.param(), None);
    }

    #[test]
    fn test_parse_normalizes_case() {
        let msg = Message::parse("nIcK Alice");
        assert_eq!(msg.command(), "NICK");
        assert_eq!(msg.param(), Some("alice"));
    }

    #[test]
    fn test_parse_splits_at_first_space() {
        let msg = Message::parse("MSG Hello There World\n");
        assert_eq!(msg.command(), "MSG");
        assert_eq!(msg.param(), Some("hello there world"));
    }

    #[test]
    fn test_parse_trailing_space_gives_empty_param() {
        let msg = Message::parse("JOIN ");
        assert_eq!(msg.command(), "JOIN");
        assert_eq!(msg.param(), Some(""));
    }

    #[test]
    fn test_raw_param_keeps_casing() {
        assert_eq!(raw_param("msg Hello There\r\n"), Some("Hello There"));
        assert_eq!(raw_param("QUIT"), None);
    }

    #[test]
    fn test_new_keeps_param_casing() {
        let msg = Message::new(USRMSG, "alice: Hello");
        assert_eq!(msg.to_string(), "USRMSG alice: Hello");
    }

    #[test]
    fn test_display_without_param() {
        assert_eq!(Message::parse("quit").to_string(), "QUIT");
    }

    #[test]
    fn test_command_from_token() {
        assert_eq!(Command::from_token("SELECTRESP"), Command::SelectResp);
        assert_eq!(Command::from_token("QUIT"), Command::Quit);
        assert_eq!(
            Command::from_token("FOO"),
            Command::Unknown("FOO".to_string())
        );
    }

    #[test]
    fn test_system_reply_format() {
        let reply = system_reply("NICK", CommandResult::Accepted, "");
        assert_eq!(reply.to_string(), "SYSMSG NICK ACCEPTED");

        let reply = system_reply("LISTGAMES", CommandResult::Accepted, "[ bluffer ]");
        assert_eq!(reply.to_string(), "SYSMSG LISTGAMES ACCEPTED [ bluffer ]");

        let reply = system_reply("FOO", CommandResult::Unidentified, "");
        assert_eq!(reply.to_string(), "SYSMSG FOO UNIDENTIFIED");
    }

    #[test]
    fn test_result_from_success() {
        assert_eq!(CommandResult::from_success(true), CommandResult::Accepted);
        assert_eq!(CommandResult::from_success(false), CommandResult::Rejected);
    }
}
