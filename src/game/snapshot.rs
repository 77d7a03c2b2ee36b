//! Snapshot encoding for the per-tick broadcast

use std::fmt::Write;
use std::sync::Arc;

use super::RoomState;

/// Builds full-state snapshot lines. The text buffer is reused across ticks.
pub struct SnapshotBuilder {
    buf: String,
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            buf: String::with_capacity(512),
        }
    }

    /// Encode every live object of the room.
    ///
    /// Records are `;`-terminated: players in join order, then enemies,
    /// bullets and rewards.
    pub fn build(&mut self, state: &RoomState) -> Arc<str> {
        self.buf.clear();

        for player in &state.players {
            // Writing into a String cannot fail
            let _ = write!(
                self.buf,
                "player,{},{},{},{},{};",
                player.username,
                player.x,
                player.y,
                state.displayed_score(player),
                player.alive
            );
        }

        for enemy in &state.enemies {
            let _ = write!(self.buf, "enemy,{},{};", enemy.x, enemy.y);
        }

        for bullet in &state.bullets {
            let _ = write!(self.buf, "bullet,{},{};", bullet.x, bullet.y);
        }

        for reward in &state.rewards {
            let _ = write!(self.buf, "reward,{},{};", reward.x, reward.y);
        }

        Arc::from(self.buf.as_str())
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
