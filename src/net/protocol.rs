//! Line protocol definitions
//! Every message is one `\n`-terminated line of `;`-separated fields

use std::fmt;
use std::sync::Arc;

use crate::game::{Key, KeyEvent, RoomError};

/// Longest inbound line accepted, in bytes, excluding the `\n`
pub const MAX_LINE_LEN: usize = 1024;

/// Handshake command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Create a room and join it
    Create,
    /// Join an existing room
    Join,
}

impl Command {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(Self::Create),
            "JOIN" => Some(Self::Join),
            _ => None,
        }
    }
}

/// First line sent by a client: `COMMAND;ADDRESS;USERNAME;PASSWORD;ROOM`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub command: Command,
    /// Address the client dialed; informational only
    pub address: String,
    pub username: String,
    pub password: String,
    pub room: String,
}

impl Handshake {
    pub fn parse(line: &str) -> Result<Self, HandshakeError> {
        let fields = split_fields(line);
        if fields.len() < 5 {
            return Err(HandshakeError::InvalidFormat);
        }

        let command = Command::parse(fields[0]).ok_or(HandshakeError::UnknownCommand)?;

        // Usernames are written into `,`-separated snapshot records
        if fields[2].contains(',') {
            return Err(HandshakeError::InvalidFormat);
        }

        Ok(Self {
            command,
            address: fields[1].to_string(),
            username: fields[2].to_string(),
            password: fields[3].to_string(),
            room: fields[4].to_string(),
        })
    }
}

/// Split on `;`, dropping trailing empty fields and a trailing `\r`
fn split_fields(line: &str) -> Vec<&str> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields: Vec<&str> = line.split(';').collect();
    while fields.last().is_some_and(|f| f.is_empty()) {
        fields.pop();
    }
    fields
}

/// Parse an input line: `KEY_PRESSED;<code>` or `KEY_RELEASED;<code>`.
/// Anything else, including unknown codes, yields `None`.
pub fn parse_client_line(line: &str) -> Option<KeyEvent> {
    let fields = split_fields(line);
    let pressed = match *fields.first()? {
        "KEY_PRESSED" => true,
        "KEY_RELEASED" => false,
        _ => return None,
    };

    let code = fields.get(1)?.trim().parse::<i32>().ok()?;
    let key = Key::from_code(code)?;

    Some(KeyEvent { key, pressed })
}

/// Reasons a handshake is refused. `Display` is the exact wire reason.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("Invalid message format")]
    InvalidFormat,

    #[error("Unknown command")]
    UnknownCommand,

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Room already exists")]
    RoomExists,

    #[error("Room does not exist")]
    RoomMissing,

    #[error("Username already exists: {0}")]
    UsernameTaken(String),

    #[error("Database error")]
    Database,
}

impl From<RoomError> for HandshakeError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::AlreadyExists => Self::RoomExists,
            RoomError::NotFound => Self::RoomMissing,
            RoomError::UsernameTaken(name) => Self::UsernameTaken(name),
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMsg {
    /// Handshake accepted
    Success,
    /// Handshake refused
    Error(HandshakeError),
    /// A player joined the room
    NewUser { username: String, x: i32, y: i32 },
    /// Full room state for one tick, shared by every recipient
    Snapshot(Arc<str>),
    /// Every player is dead
    GameOver,
}

impl fmt::Display for ServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("SUCCESS"),
            Self::Error(reason) => write!(f, "ERROR;{reason}"),
            Self::NewUser { username, x, y } => write!(f, "NEW_USER;{username};{x};{y}"),
            Self::Snapshot(snapshot) => f.write_str(snapshot),
            Self::GameOver => f.write_str("GAMEOVER;"),
        }
    }
}

impl ServerMsg {
    /// Encode as a complete wire line
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}
