//! Movement and pruning over collections of bodies

use super::objects::Body;

/// Physics system for advancing and pruning bodies
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance every body by one tick
    pub fn advance_all<B: Body>(bodies: &mut [B]) {
        for body in bodies.iter_mut() {
            body.advance();
        }
    }

    /// Drop bodies that are dead or have left the field.
    /// Returns how many were removed.
    pub fn prune<B: Body>(bodies: &mut Vec<B>) -> usize {
        let before = bodies.len();
        bodies.retain(|body| body.is_alive() && !body.escaped());
        before - bodies.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::objects::{Bullet, Enemy, FIELD_HEIGHT};

    #[test]
    fn test_prune_removes_dead_and_escaped() {
        let mut enemies = vec![Enemy::new(0, 0), Enemy::new(10, 0), Enemy::new(20, FIELD_HEIGHT + 5)];
        enemies[1].alive = false;

        let removed = PhysicsSystem::prune(&mut enemies);

        assert_eq!(removed, 2);
        assert_eq!(enemies, vec![Enemy::new(0, 0)]);
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut bullets = vec![
            Bullet::new(0, 50, "alice"),
            Bullet::new(0, -3, "alice"),
            Bullet::new(5, 60, "bob"),
        ];
        bullets[2].alive = false;

        PhysicsSystem::prune(&mut bullets);
        let once = bullets.clone();
        let removed_again = PhysicsSystem::prune(&mut bullets);

        assert_eq!(removed_again, 0);
        assert_eq!(bullets, once);
    }

    #[test]
    fn test_advance_all_moves_everything() {
        let mut enemies = vec![Enemy::new(0, 0), Enemy::new(100, 40)];
        PhysicsSystem::advance_all(&mut enemies);
        assert_eq!(enemies[0].y, 1);
        assert_eq!(enemies[1].y, 41);
    }
}
