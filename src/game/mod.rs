//! Game simulation modules

pub mod combat;
pub mod objects;
pub mod physics;
pub mod registry;
pub mod room;
pub mod snapshot;

pub use registry::RoomRegistry;
pub use room::{Room, RoomError, RoomPhase, RoomSettings, RoomState, Seat, StepOutcome};

use std::str::FromStr;

/// Keys a client may report. Codes are the desktop virtual-key codes the
/// game client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Up,
    Right,
    Down,
    Fire,
}

impl Key {
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            37 => Some(Self::Left),
            38 => Some(Self::Up),
            39 => Some(Self::Right),
            40 => Some(Self::Down),
            32 => Some(Self::Fire),
            _ => None,
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            Self::Left => 37,
            Self::Up => 38,
            Self::Right => 39,
            Self::Down => 40,
            Self::Fire => 32,
        }
    }
}

/// A key press or release received from a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub pressed: bool,
}

impl KeyEvent {
    pub const fn pressed(key: Key) -> Self {
        Self { key, pressed: true }
    }

    pub const fn released(key: Key) -> Self {
        Self {
            key,
            pressed: false,
        }
    }

    pub fn is_fire_press(&self) -> bool {
        self.pressed && self.key == Key::Fire
    }
}

/// Where kill and pickup points go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreMode {
    /// Each player earns their own score
    #[default]
    PerPlayer,
    /// One counter for the whole room
    Shared,
}

impl FromStr for ScoreMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per_player" | "per-player" => Ok(Self::PerPlayer),
            "shared" => Ok(Self::Shared),
            other => Err(format!("unknown score mode: {other}")),
        }
    }
}
