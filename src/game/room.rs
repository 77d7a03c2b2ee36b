//! Room state and the authoritative tick loop

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::Config;
use crate::net::protocol::ServerMsg;
use crate::util::time::ticks_per_interval;

use super::combat::{CombatSystem, Credit};
use super::objects::{Bullet, Enemy, Player, Reward, FIELD_WIDTH, PLAYER_STEP};
use super::physics::PhysicsSystem;
use super::snapshot::SnapshotBuilder;
use super::{Key, KeyEvent, ScoreMode};

/// Enemies and rewards spawn with x in `[0, FIELD_WIDTH - SPAWN_MARGIN)`
const SPAWN_MARGIN: i32 = 50;

/// Room membership errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room already exists")]
    AlreadyExists,

    #[error("Room does not exist")]
    NotFound,

    #[error("Username already exists: {0}")]
    UsernameTaken(String),
}

/// Per-room simulation settings
#[derive(Debug, Clone)]
pub struct RoomSettings {
    pub tick: Duration,
    /// Ticks between enemy spawns
    pub enemy_spawn_every: u32,
    /// Ticks between reward spawns
    pub reward_spawn_every: u32,
    pub score_mode: ScoreMode,
    /// Messages buffered per room before slow receivers start skipping
    pub broadcast_capacity: usize,
}

impl RoomSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick: config.tick,
            enemy_spawn_every: ticks_per_interval(config.enemy_spawn_interval, config.tick),
            reward_spawn_every: ticks_per_interval(config.reward_spawn_interval, config.tick),
            score_mode: config.score_mode,
            broadcast_capacity: config.broadcast_capacity,
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Waiting for a second player
    Waiting,
    /// Tick loop running
    InProgress,
    /// Every player died; kept around for the final scores
    Ended,
}

/// Outcome of a single simulation step
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub snapshot: Arc<str>,
    pub game_over: bool,
}

/// Authoritative state of one room. Guarded by the room's lock.
pub struct RoomState {
    pub name: String,
    pub phase: RoomPhase,
    pub tick: u64,
    /// Join order
    pub players: Vec<Player>,
    pub enemies: Vec<Enemy>,
    pub bullets: Vec<Bullet>,
    pub rewards: Vec<Reward>,
    /// Room counter used in shared score mode
    pub shared_score: u32,
    score_mode: ScoreMode,
    enemy_spawn_every: u32,
    reward_spawn_every: u32,
    next_seat: u64,
    rng: ChaCha8Rng,
    closed: bool,
}

impl RoomState {
    pub fn new(name: impl Into<String>, seed: u64, settings: &RoomSettings) -> Self {
        Self {
            name: name.into(),
            phase: RoomPhase::Waiting,
            tick: 0,
            players: Vec::new(),
            enemies: Vec::new(),
            bullets: Vec::new(),
            rewards: Vec::new(),
            shared_score: 0,
            score_mode: settings.score_mode,
            enemy_spawn_every: settings.enemy_spawn_every.max(1),
            reward_spawn_every: settings.reward_spawn_every.max(1),
            next_seat: 1,
            rng: ChaCha8Rng::seed_from_u64(seed),
            closed: false,
        }
    }

    pub fn player(&self, username: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.username == username)
    }

    /// Add a player at the spawn slot for the current player count,
    /// under a fresh seat id
    pub fn add_player(&mut self, username: &str) -> Result<&Player, RoomError> {
        if self.player(username).is_some() {
            return Err(RoomError::UsernameTaken(username.to_string()));
        }

        let (x, y) = Player::spawn_position(self.players.len());
        let mut player = Player::new(username, x, y);
        player.seat = self.next_seat;
        self.next_seat += 1;

        self.players.push(player);
        Ok(&self.players[self.players.len() - 1])
    }

    /// Remove the player holding `seat`. A seat that was already released
    /// matches nothing, even if its username has been taken again.
    pub fn remove_player(&mut self, seat: u64) -> Option<Player> {
        let index = self.players.iter().position(|p| p.seat == seat)?;
        Some(self.players.remove(index))
    }

    pub fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    /// Score shown for a player in snapshots
    pub fn displayed_score(&self, player: &Player) -> u32 {
        match self.score_mode {
            ScoreMode::PerPlayer => player.score,
            ScoreMode::Shared => self.shared_score,
        }
    }

    /// Apply one key event to a player's intent. Returns false when the
    /// player is unknown or dead.
    pub fn apply_key(&mut self, username: &str, event: KeyEvent) -> bool {
        let in_progress = self.phase == RoomPhase::InProgress;
        let Some(player) = self.players.iter_mut().find(|p| p.username == username) else {
            return false;
        };

        if !player.alive {
            return false;
        }

        match (event.key, event.pressed) {
            (Key::Left, true) => player.dx = -PLAYER_STEP,
            (Key::Right, true) => player.dx = PLAYER_STEP,
            (Key::Up, true) => player.dy = -PLAYER_STEP,
            (Key::Down, true) => player.dy = PLAYER_STEP,
            (Key::Left | Key::Right, false) => player.dx = 0,
            (Key::Up | Key::Down, false) => player.dy = 0,
            (Key::Fire, true) => {
                if in_progress {
                    let (x, y) = player.muzzle();
                    let owner = player.username.clone();
                    self.bullets.push(Bullet::new(x, y, owner));
                }
            }
            (Key::Fire, false) => {}
        }

        true
    }

    /// Move to `InProgress` from `Waiting`, or from `Ended` once a living
    /// player is present again. Dead players stay dead. Returns true if this
    /// call started the loop.
    pub fn begin(&mut self) -> bool {
        if self.closed || self.phase == RoomPhase::InProgress || self.alive_count() == 0 {
            return false;
        }

        self.phase = RoomPhase::InProgress;
        true
    }

    /// Run one simulation step and encode the resulting snapshot
    pub fn step(&mut self, snapshots: &mut SnapshotBuilder) -> StepOutcome {
        self.tick += 1;

        PhysicsSystem::advance_all(&mut self.players);
        PhysicsSystem::advance_all(&mut self.enemies);
        PhysicsSystem::advance_all(&mut self.bullets);
        PhysicsSystem::advance_all(&mut self.rewards);

        let report = CombatSystem::resolve(
            &mut self.players,
            &mut self.enemies,
            &mut self.bullets,
            &mut self.rewards,
        );

        for username in &report.deaths {
            info!(room = %self.name, username = %username, tick = self.tick, "Player died");
        }
        self.apply_credits(&report.credits);

        self.prune();

        let any_alive = self.alive_count() > 0;
        if any_alive {
            self.spawn_due();
        } else {
            self.phase = RoomPhase::Ended;
        }

        StepOutcome {
            snapshot: snapshots.build(self),
            game_over: !any_alive,
        }
    }

    /// Drop dead and escaped enemies, bullets and rewards
    pub fn prune(&mut self) {
        PhysicsSystem::prune(&mut self.enemies);
        PhysicsSystem::prune(&mut self.bullets);
        PhysicsSystem::prune(&mut self.rewards);
    }

    pub fn clear_objects(&mut self) {
        self.enemies.clear();
        self.bullets.clear();
        self.rewards.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn apply_credits(&mut self, credits: &[Credit]) {
        for credit in credits {
            match self.score_mode {
                ScoreMode::PerPlayer => {
                    // The owner may have left since firing
                    if let Some(player) = self
                        .players
                        .iter_mut()
                        .find(|p| p.username == credit.username)
                    {
                        player.credit();
                    }
                }
                ScoreMode::Shared => {
                    self.shared_score = self.shared_score.saturating_add(1);
                }
            }
        }
    }

    fn spawn_due(&mut self) {
        if self.tick % u64::from(self.enemy_spawn_every) == 0 {
            let x = self.rng.gen_range(0..FIELD_WIDTH - SPAWN_MARGIN);
            self.enemies.push(Enemy::new(x, 0));
        }

        if self.tick % u64::from(self.reward_spawn_every) == 0 {
            let x = self.rng.gen_range(0..FIELD_WIDTH - SPAWN_MARGIN);
            self.rewards.push(Reward::new(x, 0));
        }
    }
}

/// A player's place in a room, handed to the session that owns it
#[derive(Debug)]
pub struct Seat {
    /// Identifies this seat when it is released
    pub id: u64,
    pub username: String,
    pub position: (i32, i32),
    /// Room broadcasts, starting with this player's own `NEW_USER`
    pub events: broadcast::Receiver<ServerMsg>,
}

/// Shared handle to a room
pub struct Room {
    name: String,
    tick: Duration,
    state: Mutex<RoomState>,
    events_tx: broadcast::Sender<ServerMsg>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("name", &self.name)
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

impl Room {
    pub fn new(name: impl Into<String>, seed: u64, settings: &RoomSettings) -> Arc<Self> {
        let name = name.into();
        let (events_tx, _) = broadcast::channel(settings.broadcast_capacity.max(1));

        Arc::new(Self {
            state: Mutex::new(RoomState::new(name.clone(), seed, settings)),
            name,
            tick: settings.tick,
            events_tx,
            ticker: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a player, announce it to the room and start the loop once a
    /// second player is present
    pub fn attach(self: &Arc<Self>, username: &str) -> Result<Seat, RoomError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(RoomError::NotFound);
        }

        let player = state.add_player(username)?;
        let (id, x, y) = (player.seat, player.x, player.y);
        let events = self.events_tx.subscribe();
        let _ = self.events_tx.send(ServerMsg::NewUser {
            username: username.to_string(),
            x,
            y,
        });

        let resumed = state.phase == RoomPhase::Ended;
        let start = state.players.len() >= 2 && state.begin();
        let player_count = state.players.len();
        drop(state);

        info!(
            room = %self.name,
            username = %username,
            player_count,
            "Player joined room"
        );

        if start {
            if resumed {
                info!(room = %self.name, "Restarting finished room");
            }
            self.spawn_ticker();
        }

        Ok(Seat {
            id,
            username: username.to_string(),
            position: (x, y),
            events,
        })
    }

    pub fn detach(&self, seat: u64) -> bool {
        let removed = self.state.lock().remove_player(seat);
        if let Some(player) = &removed {
            info!(room = %self.name, username = %player.username, "Player left room");
        }
        removed.is_some()
    }

    /// Start the loop without waiting for a second player
    pub fn start(self: &Arc<Self>) -> bool {
        let started = self.state.lock().begin();
        if started {
            self.spawn_ticker();
        }
        started
    }

    pub fn apply_key(&self, username: &str, event: KeyEvent) -> bool {
        self.state.lock().apply_key(username, event)
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().players.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.state.lock().players.len()
    }

    pub fn phase(&self) -> RoomPhase {
        self.state.lock().phase
    }

    /// True while a tick loop task is alive for this room
    pub fn is_running(&self) -> bool {
        self.ticker
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Inspect or adjust the state under the room lock
    pub fn with_state<R>(&self, f: impl FnOnce(&mut RoomState) -> R) -> R {
        f(&mut self.state.lock())
    }

    /// Mark the room closed, drop transient objects and cancel the loop
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            state.closed = true;
            state.clear_objects();
        }

        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }

        debug!(room = %self.name, "Room closed");
    }

    /// Run one tick: step, then broadcast the snapshot (and `GAMEOVER;` at
    /// the end). Returns false once the loop should stop.
    pub fn run_tick(&self, snapshots: &mut SnapshotBuilder) -> bool {
        let mut state = self.state.lock();
        if state.closed || state.phase != RoomPhase::InProgress {
            return false;
        }

        let outcome = state.step(snapshots);

        // Sent under the lock so no join or intent lands between a step and its broadcast
        let _ = self.events_tx.send(ServerMsg::Snapshot(outcome.snapshot));

        if outcome.game_over {
            let _ = self.events_tx.send(ServerMsg::GameOver);
            info!(room = %self.name, tick = state.tick, "Game over");
            return false;
        }

        true
    }

    fn spawn_ticker(self: &Arc<Self>) {
        let room = Arc::clone(self);
        let handle = tokio::spawn(room.run());
        *self.ticker.lock() = Some(handle);
    }

    async fn run(self: Arc<Self>) {
        info!(room = %self.name, tick_ms = self.tick.as_millis() as u64, "Room loop started");

        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut snapshots = SnapshotBuilder::new();

        loop {
            ticker.tick().await;

            if !self.run_tick(&mut snapshots) {
                break;
            }
        }

        debug!(room = %self.name, "Room loop stopped");
    }
}
