//! Collision resolution and score attribution

use super::objects::{Body, Bullet, Enemy, Player, Reward};

/// Why a point was awarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditReason {
    /// A bullet destroyed an enemy
    Kill,
    /// A player collected a reward
    Pickup,
}

/// One point owed to a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub username: String,
    pub reason: CreditReason,
}

/// Result of one collision pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CollisionReport {
    pub credits: Vec<Credit>,
    /// Usernames of players that died this pass
    pub deaths: Vec<String>,
}

/// Combat system for resolving collisions between bodies
pub struct CombatSystem;

impl CombatSystem {
    /// Run the collision pass. Only flags are mutated; membership of the
    /// collections is left to pruning.
    ///
    /// Order is fixed: player/enemy, then bullet/enemy, then player/reward.
    pub fn resolve(
        players: &mut [Player],
        enemies: &mut [Enemy],
        bullets: &mut [Bullet],
        rewards: &mut [Reward],
    ) -> CollisionReport {
        let mut report = CollisionReport::default();

        // Enemies survive ramming a player, and several players may die at once
        for player in players.iter_mut().filter(|p| p.alive) {
            let hit = enemies
                .iter()
                .filter(|e| e.alive)
                .any(|e| player.bounds().intersects(&e.bounds()));

            if hit {
                player.alive = false;
                report.deaths.push(player.username.clone());
            }
        }

        for enemy in enemies.iter_mut().filter(|e| e.alive) {
            let enemy_bounds = enemy.bounds();
            if let Some(bullet) = bullets
                .iter_mut()
                .find(|b| b.alive && b.bounds().intersects(&enemy_bounds))
            {
                bullet.alive = false;
                enemy.alive = false;
                report.credits.push(Credit {
                    username: bullet.owner.clone(),
                    reason: CreditReason::Kill,
                });
            }
        }

        // At most one reward per player per pass
        for player in players.iter().filter(|p| p.alive) {
            let player_bounds = player.bounds();
            if let Some(reward) = rewards
                .iter_mut()
                .find(|r| r.alive && r.bounds().intersects(&player_bounds))
            {
                reward.alive = false;
                report.credits.push(Credit {
                    username: player.username.clone(),
                    reason: CreditReason::Pickup,
                });
            }
        }

        report
    }
}
