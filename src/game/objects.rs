//! Game objects and the bounding-box capability they share

/// Play-field width
pub const FIELD_WIDTH: i32 = 800;
/// Play-field height
pub const FIELD_HEIGHT: i32 = 600;

pub const PLAYER_SIZE: i32 = 50;
/// Distance a player moves per tick while a direction key is held
pub const PLAYER_STEP: i32 = 5;
/// Horizontal gap between spawn slots
pub const SPAWN_SPACING: i32 = 80;
pub const SPAWN_Y: i32 = 500;

pub const ENEMY_SIZE: i32 = 50;
pub const ENEMY_SPEED: i32 = 1;

pub const BULLET_WIDTH: i32 = 5;
pub const BULLET_HEIGHT: i32 = 10;
pub const BULLET_SPEED: i32 = 2;

pub const REWARD_SIZE: i32 = 20;
pub const REWARD_SPEED: i32 = 2;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Bounds {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the boxes overlap with positive area. Touching edges do not count.
    pub fn intersects(&self, other: &Bounds) -> bool {
        if self.width <= 0 || self.height <= 0 || other.width <= 0 || other.height <= 0 {
            return false;
        }

        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Common capability of everything the simulation moves and collides
pub trait Body {
    fn bounds(&self) -> Bounds;

    fn is_alive(&self) -> bool;

    /// Advance one tick
    fn advance(&mut self);

    /// True once the body has left the part of the field it lives in
    fn escaped(&self) -> bool {
        false
    }
}

/// Player-controlled ship (authoritative)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub username: String,
    pub x: i32,
    pub y: i32,
    /// Current movement vector, replaced by the latest key input
    pub dx: i32,
    pub dy: i32,
    pub score: u32,
    pub alive: bool,
    /// Room-local id of the seat this player occupies
    pub seat: u64,
}

impl Player {
    pub fn new(username: impl Into<String>, x: i32, y: i32) -> Self {
        Self {
            username: username.into(),
            x,
            y,
            dx: 0,
            dy: 0,
            score: 0,
            alive: true,
            seat: 0,
        }
    }

    /// Spawn slot for the player joining at `index` (0-based join order)
    pub fn spawn_position(index: usize) -> (i32, i32) {
        let slot = i32::try_from(index).unwrap_or(i32::MAX);
        let x = slot.saturating_mul(SPAWN_SPACING);
        (
            x.clamp(0, FIELD_WIDTH - PLAYER_SIZE),
            SPAWN_Y.clamp(0, FIELD_HEIGHT - PLAYER_SIZE),
        )
    }

    /// Top-center point bullets are fired from
    pub fn muzzle(&self) -> (i32, i32) {
        (self.x + PLAYER_SIZE / 2 - 2, self.y)
    }

    pub fn credit(&mut self) {
        self.score = self.score.saturating_add(1);
    }
}

impl Body for Player {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, PLAYER_SIZE, PLAYER_SIZE)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn advance(&mut self) {
        if !self.alive {
            return;
        }

        self.x = (self.x + self.dx).clamp(0, FIELD_WIDTH - PLAYER_SIZE);
        self.y = (self.y + self.dy).clamp(0, FIELD_HEIGHT - PLAYER_SIZE);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enemy {
    pub x: i32,
    pub y: i32,
    pub alive: bool,
}

impl Enemy {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, alive: true }
    }
}

impl Body for Enemy {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, ENEMY_SIZE, ENEMY_SIZE)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn advance(&mut self) {
        self.y += ENEMY_SPEED;
        if self.escaped() {
            self.alive = false;
        }
    }

    fn escaped(&self) -> bool {
        self.y > FIELD_HEIGHT
    }
}

/// Projectile fired by a player. Carries its owner so kills can be credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bullet {
    pub x: i32,
    pub y: i32,
    pub owner: String,
    pub alive: bool,
}

impl Bullet {
    pub fn new(x: i32, y: i32, owner: impl Into<String>) -> Self {
        Self {
            x,
            y,
            owner: owner.into(),
            alive: true,
        }
    }
}

impl Body for Bullet {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, BULLET_WIDTH, BULLET_HEIGHT)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn advance(&mut self) {
        self.y -= BULLET_SPEED;
        if self.escaped() {
            self.alive = false;
        }
    }

    fn escaped(&self) -> bool {
        self.y < 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reward {
    pub x: i32,
    pub y: i32,
    pub alive: bool,
}

impl Reward {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y, alive: true }
    }
}

impl Body for Reward {
    fn bounds(&self) -> Bounds {
        Bounds::new(self.x, self.y, REWARD_SIZE, REWARD_SIZE)
    }

    fn is_alive(&self) -> bool {
        self.alive
    }

    fn advance(&mut self) {
        self.y += REWARD_SPEED;
        if self.escaped() {
            self.alive = false;
        }
    }

    fn escaped(&self) -> bool {
        self.y > FIELD_HEIGHT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_overlap() {
        let a = Bounds::new(0, 0, 10, 10);
        let b = Bounds::new(5, 5, 10, 10);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_bounds_touching_edges_do_not_intersect() {
        let a = Bounds::new(0, 0, 10, 10);
        let right = Bounds::new(10, 0, 10, 10);
        let below = Bounds::new(0, 10, 10, 10);
        assert!(!a.intersects(&right));
        assert!(!a.intersects(&below));
    }

    #[test]
    fn test_bounds_empty_box_never_intersects() {
        let a = Bounds::new(0, 0, 10, 10);
        let empty = Bounds::new(2, 2, 0, 5);
        assert!(!a.intersects(&empty));
    }

    #[test]
    fn test_spawn_positions_follow_join_order() {
        assert_eq!(Player::spawn_position(0), (0, 500));
        assert_eq!(Player::spawn_position(1), (80, 500));
        assert_eq!(Player::spawn_position(3), (240, 500));
        // Far slots are clamped into the field
        assert_eq!(Player::spawn_position(50), (FIELD_WIDTH - PLAYER_SIZE, 500));
        assert_eq!(
            Player::spawn_position(usize::MAX),
            (FIELD_WIDTH - PLAYER_SIZE, 500)
        );
    }

    #[test]
    fn test_player_clamped_to_field() {
        let mut player = Player::new("alice", 2, 3);
        player.dx = -PLAYER_STEP;
        player.dy = -PLAYER_STEP;
        player.advance();
        assert_eq!((player.x, player.y), (0, 0));

        let mut player = Player::new("bob", FIELD_WIDTH - PLAYER_SIZE - 1, FIELD_HEIGHT - PLAYER_SIZE);
        player.dx = PLAYER_STEP;
        player.dy = PLAYER_STEP;
        player.advance();
        assert_eq!(
            (player.x, player.y),
            (FIELD_WIDTH - PLAYER_SIZE, FIELD_HEIGHT - PLAYER_SIZE)
        );
    }

    #[test]
    fn test_dead_player_does_not_move() {
        let mut player = Player::new("alice", 100, 100);
        player.dx = PLAYER_STEP;
        player.alive = false;
        player.advance();
        assert_eq!(player.x, 100);
    }

    #[test]
    fn test_muzzle_is_top_center() {
        let player = Player::new("alice", 100, 200);
        assert_eq!(player.muzzle(), (123, 200));
    }

    #[test]
    fn test_objects_die_when_leaving_field() {
        let mut enemy = Enemy::new(0, FIELD_HEIGHT);
        enemy.advance();
        assert!(!enemy.is_alive());

        let mut bullet = Bullet::new(0, 1, "alice");
        bullet.advance();
        assert!(!bullet.is_alive());
        assert!(bullet.escaped());

        let mut reward = Reward::new(0, FIELD_HEIGHT - 1);
        reward.advance();
        assert!(!reward.is_alive());
    }

    #[test]
    fn test_objects_move_at_fixed_speeds() {
        let mut enemy = Enemy::new(10, 10);
        let mut bullet = Bullet::new(10, 100, "alice");
        let mut reward = Reward::new(10, 10);

        enemy.advance();
        bullet.advance();
        reward.advance();

        assert_eq!(enemy.y, 11);
        assert_eq!(bullet.y, 98);
        assert_eq!(reward.y, 12);
        assert!(enemy.is_alive() && bullet.is_alive() && reward.is_alive());
    }
}
