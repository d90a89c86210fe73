//! Collision resolution and damage bookkeeping.

use crate::components::{BulletSide, EnemyType, EntityId, PowerUpKind};
use crate::entities::{EasterEgg, HitOutcome, BULLET_SIZE, TANK_SIZE, UFO_SIZE};
use crate::events::GameEvent;
use crate::math::{boxes_overlap, fx, Vec2Fixed};
use crate::services::SoundCue;
use crate::tile_map::PLAYER_SPAWN_RECT;
use crate::timers::TimedEffect;

use super::Simulation;

impl Simulation {
    /// Run every collision pass. Returns false if the base fell, in which
    /// case the rest of the tick is skipped.
    pub(super) fn resolve_collisions(&mut self) -> bool {
        self.bullets_vs_tanks();
        self.bullets_vs_bullets();
        if self.bullets_vs_base() {
            return false;
        }
        self.bullets_vs_ufo();
        self.collect_power_ups();
        self.collect_easter_egg();
        true
    }

    fn bullets_vs_tanks(&mut self) {
        for id in self.bullets.ids() {
            let Some(bullet) = self.bullets.get(id) else {
                continue;
            };
            let (position, side) = (bullet.position, bullet.side);
            if side == BulletSide::Player {
                let target = self
                    .enemies()
                    .find(|t| boxes_overlap(position, BULLET_SIZE, t.position, TANK_SIZE))
                    .map(|t| t.id);
                if let Some(target) = target {
                    self.remove_bullet(id);
                    self.hit_enemy(target);
                }
            } else {
                let struck = self.player().is_some_and(|p| {
                    p.alive && boxes_overlap(position, BULLET_SIZE, p.position, TANK_SIZE)
                });
                if struck {
                    self.remove_bullet(id);
                    self.hit_player(1);
                }
            }
        }
    }

    fn bullets_vs_bullets(&mut self) {
        let ids = self.bullets.ids();
        let reach = BULLET_SIZE * BULLET_SIZE;
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                let (Some(first), Some(second)) = (self.bullets.get(a), self.bullets.get(b)) else {
                    continue;
                };
                if first.position.distance_squared(second.position) < reach {
                    self.remove_bullet(a);
                    self.remove_bullet(b);
                    break;
                }
            }
        }
    }

    /// True once a bullet reaches the base.
    fn bullets_vs_base(&mut self) -> bool {
        if self.base.destroyed {
            return false;
        }
        let hit = self
            .bullets
            .values()
            .find(|b| self.base.contains(b.position))
            .map(|b| b.id);
        let Some(id) = hit else {
            return false;
        };
        self.remove_bullet(id);
        self.base.destroyed = true;
        tracing::info!(tick = self.tick, level = self.level, "Base destroyed");
        self.emit(GameEvent::BaseDestroyed);
        self.play(SoundCue::BaseDestroyed);
        true
    }

    fn bullets_vs_ufo(&mut self) {
        for id in self.bullets.ids() {
            let Some(ufo) = self.ufo.as_ref() else {
                return;
            };
            let inside = self.bullets.get(id).is_some_and(|b| {
                b.side == BulletSide::Player && ufo.position.within_box(b.position, UFO_SIZE / fx(2))
            });
            if !inside {
                continue;
            }
            self.remove_bullet(id);
            let Some(ufo) = self.ufo.as_mut() else {
                return;
            };
            if !ufo.damage() {
                continue;
            }
            let position = ufo.position;
            self.ufo = None;
            tracing::debug!(tick = self.tick, "UFO destroyed");
            self.emit(GameEvent::UfoDestroyed { position });
            self.play(SoundCue::UfoDestroyed);
            self.spawn_easter_egg(position);
        }
    }

    /// Drop the egg at a random empty tile, or where the UFO fell if the
    /// map has none.
    pub(super) fn spawn_easter_egg(&mut self, fallback: Vec2Fixed) {
        let position = self
            .map
            .find_random_empty_tile(&mut self.rng)
            .unwrap_or(fallback);
        self.easter_egg = Some(EasterEgg::new(
            position,
            self.tuning.power_ups.easter_egg_lifetime,
        ));
        self.emit(GameEvent::EasterEggSpawned { position });
    }

    /// One bullet hit on an enemy.
    pub(super) fn hit_enemy(&mut self, id: EntityId) {
        let Some(tank) = self.tanks.get_mut(id) else {
            return;
        };
        let Some(kind) = tank.enemy_type() else {
            return;
        };
        let position = tank.position;
        let outcome = tank.take_hit(1);
        let health = tank.health;
        if outcome == HitOutcome::Absorbed {
            return;
        }
        if kind == EnemyType::Power {
            self.drop_power_up(position);
        }
        match outcome {
            HitOutcome::Destroyed => self.kill_enemy(id, kind != EnemyType::Power),
            _ => {
                self.emit(GameEvent::EnemyHit { id, health });
                self.play(SoundCue::EnemyHit);
            }
        }
    }

    /// Remove an enemy and award its score.
    ///
    /// `roll_drop` enables the kill-drop roll; bombs and power-type kills
    /// skip it.
    pub(super) fn kill_enemy(&mut self, id: EntityId, roll_drop: bool) {
        let Some(tank) = self.tanks.remove(id) else {
            return;
        };
        let Some(kind) = tank.enemy_type() else {
            return;
        };
        let score = self.tuning.enemy(kind).score;
        self.score += u64::from(score);
        self.kills += 1;
        self.kills_by_type[kind.index()] += 1;
        tracing::debug!(tick = self.tick, id, ?kind, score, "Enemy killed");
        self.emit(GameEvent::EnemyKilled { id, kind, score });
        self.play(SoundCue::Explosion);

        if roll_drop && self.rng.chance(self.tuning.power_ups.kill_drop_chance) {
            self.drop_power_up(tank.position);
        }
    }

    /// Damage the player unless shielded.
    pub(super) fn hit_player(&mut self, amount: u32) {
        let Some(player) = self.tanks.get_mut(self.player_id) else {
            return;
        };
        if !player.alive {
            return;
        }
        match player.take_hit(amount) {
            HitOutcome::Absorbed => {}
            HitOutcome::Damaged => {
                let health = player.health;
                self.emit(GameEvent::PlayerHit { health });
            }
            HitOutcome::Destroyed => self.kill_player(),
        }
    }

    /// Take a life and schedule the respawn if any are left.
    fn kill_player(&mut self) {
        let stats = self.tuning.player.clone();
        let Some(player) = self.tanks.get_mut(self.player_id) else {
            return;
        };
        player.lives = player.lives.saturating_sub(1);
        player.alive = false;
        player.shield = None;
        player.reset_upgrades(&stats);
        let lives = player.lives;
        if lives > 0 {
            player.respawn = Some(TimedEffect::new(
                stats.respawn_delay,
                PLAYER_SPAWN_RECT.center(),
            ));
        }
        tracing::debug!(tick = self.tick, lives, "Player destroyed");
        self.emit(GameEvent::PlayerDied { lives });
        self.play(SoundCue::PlayerDeath);
    }

    /// Place a random power-up on a random empty tile.
    pub(super) fn drop_power_up(&mut self, fallback: Vec2Fixed) {
        let Some(&kind) = self.rng.pick(&PowerUpKind::ALL) else {
            return;
        };
        let position = self
            .map
            .find_random_empty_tile(&mut self.rng)
            .unwrap_or(fallback);
        self.place_power_up(kind, position);
    }
}
