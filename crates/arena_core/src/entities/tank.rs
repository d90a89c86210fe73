//! Player and enemy tanks: stats, upgrades, firing and damage.

use serde::{Deserialize, Serialize};

use crate::ai::AiController;
use crate::components::{BulletSide, Direction, EnemyType, EntityId, TankKind};
use crate::math::{fixed_serde, fx, Fixed, Vec2Fixed};
use crate::storage::Identified;
use crate::timers::{is_active, tick_slot, TimedEffect};
use crate::tuning::{EnemyStats, PlayerStats};

use super::{Bullet, BULLET_SPEED, TANK_SIZE};

/// Shortest shoot cooldown machinegun stacks can reach.
const MIN_SHOOT_COOLDOWN: u32 = 4;
/// Cooldown removed per machinegun stack.
const MACHINEGUN_COOLDOWN_STEP: u32 = 4;
/// Star stacks at which player shells break steel.
const STARS_FOR_STEEL: u8 = 3;

/// Result of a bullet (or bomb) reaching a tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOutcome {
    /// A shield absorbed it.
    Absorbed,
    /// Lost health but still standing.
    Damaged,
    /// Health reached 0.
    Destroyed,
}

/// A player or enemy tank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tank {
    /// Assigned by storage.
    pub id: EntityId,
    /// Player number or enemy type.
    pub kind: TankKind,
    /// Center.
    pub position: Vec2Fixed,
    /// Heading; shots leave this way.
    pub facing: Direction,
    /// Current hit points.
    pub health: u32,
    /// Hit points when fresh.
    pub max_health: u32,
    /// Remaining lives (player only).
    pub lives: u32,
    /// Movement per tick before the multiplier.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Car pickups raise this.
    #[serde(with = "fixed_serde")]
    pub speed_multiplier: Fixed,
    /// Shell power.
    pub bullet_power: u8,
    base_max_bullets: u32,
    base_shoot_cooldown: u32,
    /// Own bullets currently in flight.
    pub bullets_in_flight: u32,
    shoot_cooldown: u32,
    /// Star pickups held.
    pub star_stacks: u8,
    /// Machinegun pickups held.
    pub machinegun_stacks: u8,
    /// Ship pickup.
    pub can_swim: bool,
    /// Saw pickup.
    pub can_cut_forest: bool,
    /// Invulnerability window.
    pub shield: Option<TimedEffect<()>>,
    /// Pending respawn; the payload is where to reappear.
    pub respawn: Option<TimedEffect<Vec2Fixed>>,
    /// Ticks of momentum left after releasing the stick on ice.
    pub ice_slide: u32,
    /// False while a player waits to respawn.
    pub alive: bool,
    /// Brain for enemy tanks.
    pub ai: Option<AiController>,
}

impl Identified for Tank {
    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }
}

impl Tank {
    /// A fresh player tank.
    #[must_use]
    pub fn player(number: u8, stats: &PlayerStats, position: Vec2Fixed) -> Self {
        Self {
            id: 0,
            kind: TankKind::Player(number),
            position,
            facing: Direction::Up,
            health: stats.health,
            max_health: stats.health,
            lives: stats.lives,
            speed: stats.speed,
            speed_multiplier: Fixed::ONE,
            bullet_power: stats.bullet_power,
            base_max_bullets: stats.max_bullets,
            base_shoot_cooldown: stats.shoot_cooldown,
            bullets_in_flight: 0,
            shoot_cooldown: 0,
            star_stacks: 0,
            machinegun_stacks: 0,
            can_swim: false,
            can_cut_forest: false,
            shield: None,
            respawn: None,
            ice_slide: 0,
            alive: true,
            ai: None,
        }
    }

    /// A fresh enemy tank facing the base.
    #[must_use]
    pub fn enemy(stats: &EnemyStats, shoot_cooldown: u32, position: Vec2Fixed) -> Self {
        Self {
            id: 0,
            kind: TankKind::Enemy(stats.kind),
            position,
            facing: Direction::Down,
            health: stats.health,
            max_health: stats.health,
            lives: 0,
            speed: stats.speed,
            speed_multiplier: Fixed::ONE,
            bullet_power: stats.bullet_power,
            base_max_bullets: 1,
            base_shoot_cooldown: shoot_cooldown,
            bullets_in_flight: 0,
            shoot_cooldown: 0,
            star_stacks: 0,
            machinegun_stacks: 0,
            can_swim: false,
            can_cut_forest: false,
            shield: None,
            respawn: None,
            ice_slide: 0,
            alive: true,
            ai: Some(AiController::new(stats, position)),
        }
    }

    /// True for player tanks.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.kind, TankKind::Player(_))
    }

    /// Enemy type, `None` for players.
    #[must_use]
    pub const fn enemy_type(&self) -> Option<EnemyType> {
        match self.kind {
            TankKind::Enemy(kind) => Some(kind),
            TankKind::Player(_) => None,
        }
    }

    /// Effective movement per tick.
    #[must_use]
    pub fn move_speed(&self) -> Fixed {
        self.speed * self.speed_multiplier
    }

    /// Bullets allowed in flight at once.
    #[must_use]
    pub fn max_bullets(&self) -> u32 {
        self.base_max_bullets + u32::from(self.machinegun_stacks)
    }

    /// Ticks between shots after machinegun stacks.
    #[must_use]
    pub fn shoot_cooldown_ticks(&self) -> u32 {
        self.base_shoot_cooldown
            .saturating_sub(MACHINEGUN_COOLDOWN_STEP * u32::from(self.machinegun_stacks))
            .max(MIN_SHOOT_COOLDOWN.min(self.base_shoot_cooldown))
    }

    /// Shell speed after star stacks.
    #[must_use]
    pub fn bullet_speed(&self) -> Fixed {
        BULLET_SPEED + Fixed::from_num(self.star_stacks)
    }

    /// Shell power after star stacks.
    #[must_use]
    pub fn shot_power(&self) -> u8 {
        if self.is_player() && self.star_stacks >= STARS_FOR_STEEL {
            self.bullet_power.max(2)
        } else {
            self.bullet_power
        }
    }

    /// Ticks until the next shot is allowed.
    #[must_use]
    pub const fn cooldown_remaining(&self) -> u32 {
        self.shoot_cooldown
    }

    /// Whether a shot would be accepted right now.
    #[must_use]
    pub fn can_fire(&self) -> bool {
        self.alive && self.shoot_cooldown == 0 && self.bullets_in_flight < self.max_bullets()
    }

    /// Fire if allowed; the returned bullet still needs an ID from storage.
    pub fn fire(&mut self) -> Option<Bullet> {
        if !self.can_fire() {
            return None;
        }
        self.bullets_in_flight += 1;
        self.shoot_cooldown = self.shoot_cooldown_ticks();
        let muzzle = self.position + self.facing.unit().scale(TANK_SIZE / fx(2));
        let side = if self.is_player() {
            BulletSide::Player
        } else {
            BulletSide::Enemy
        };
        Some(Bullet::new(
            muzzle,
            self.facing,
            Some(self.id),
            side,
            self.shot_power(),
            self.bullet_speed(),
        ))
    }

    /// One of this tank's bullets left play.
    pub fn on_bullet_removed(&mut self) {
        self.bullets_in_flight = self.bullets_in_flight.saturating_sub(1);
    }

    /// Count down the shoot cooldown and shield.
    pub fn tick_timers(&mut self) {
        self.shoot_cooldown = self.shoot_cooldown.saturating_sub(1);
        tick_slot(&mut self.shield);
    }

    /// Whether a shield is up.
    #[must_use]
    pub fn is_shielded(&self) -> bool {
        is_active(&self.shield)
    }

    /// Raise (or extend) the shield.
    pub fn grant_shield(&mut self, ticks: u32) {
        self.shield = Some(TimedEffect::new(ticks, ()));
    }

    /// Apply `amount` damage unless shielded.
    pub fn take_hit(&mut self, amount: u32) -> HitOutcome {
        if self.is_shielded() {
            return HitOutcome::Absorbed;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            HitOutcome::Destroyed
        } else {
            HitOutcome::Damaged
        }
    }

    /// Drop every pickup-granted upgrade (player death).
    pub fn reset_upgrades(&mut self, stats: &PlayerStats) {
        self.star_stacks = 0;
        self.machinegun_stacks = 0;
        self.bullet_power = stats.bullet_power;
        self.speed_multiplier = Fixed::ONE;
        self.can_swim = false;
        self.can_cut_forest = false;
        self.ice_slide = 0;
    }

    /// Whether any equipment pickup is held.
    #[must_use]
    pub fn has_equipment_upgrade(&self, base_power: u8) -> bool {
        self.star_stacks > 0
            || self.machinegun_stacks > 0
            || self.bullet_power > base_power
            || self.can_swim
            || self.can_cut_forest
            || self.speed_multiplier > Fixed::ONE
    }

    /// Turn an enemy into another type at that type's full health.
    pub fn convert_to(&mut self, stats: &EnemyStats) {
        if self.is_player() {
            return;
        }
        self.kind = TankKind::Enemy(stats.kind);
        self.health = stats.health;
        self.max_health = stats.health;
        self.speed = stats.speed;
        self.bullet_power = self.bullet_power.max(stats.bullet_power);
        if let Some(ai) = self.ai.as_mut() {
            ai.retune(stats);
        }
    }

    /// Snap the coordinate across the new heading to the half-tile grid.
    #[must_use]
    pub fn snapped_for_turn(&self, dir: Direction) -> Vec2Fixed {
        let grid = crate::tile_map::HALF_TILE;
        let snap = |v: Fixed| (v / grid).round() * grid;
        if dir.is_vertical() {
            Vec2Fixed::new(snap(self.position.x), self.position.y)
        } else {
            Vec2Fixed::new(self.position.x, snap(self.position.y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Tuning;

    fn player() -> Tank {
        let mut tank = Tank::player(1, &Tuning::default().player, Vec2Fixed::from_ints(100, 100));
        tank.id = 1;
        tank
    }

    #[test]
    fn test_bullet_cap_and_cooldown() {
        let mut tank = player();
        assert!(tank.fire().is_some());
        // Cap of one bullet in flight.
        for _ in 0..30 {
            tank.tick_timers();
        }
        assert!(tank.fire().is_none());
        tank.on_bullet_removed();
        assert!(tank.fire().is_some());
        assert!(tank.fire().is_none());
    }

    #[test]
    fn test_machinegun_stacks() {
        let mut tank = player();
        tank.machinegun_stacks = 3;
        assert_eq!(tank.max_bullets(), 4);
        assert_eq!(tank.shoot_cooldown_ticks(), 8);
    }

    #[test]
    fn test_stars_raise_speed_and_power() {
        let mut tank = player();
        tank.star_stacks = 2;
        assert_eq!(tank.bullet_speed(), fx(6));
        assert_eq!(tank.shot_power(), 1);
        tank.star_stacks = 3;
        assert_eq!(tank.shot_power(), 2);
    }

    #[test]
    fn test_shield_absorbs() {
        let mut tank = player();
        tank.grant_shield(2);
        assert_eq!(tank.take_hit(1), HitOutcome::Absorbed);
        tank.tick_timers();
        tank.tick_timers();
        assert!(!tank.is_shielded());
        assert_eq!(tank.take_hit(1), HitOutcome::Destroyed);
    }

    #[test]
    fn test_bullet_leaves_from_muzzle() {
        let mut tank = player();
        tank.facing = Direction::Left;
        let bullet = tank.fire().unwrap();
        assert_eq!(bullet.position, Vec2Fixed::from_ints(93, 100));
        assert_eq!(bullet.owner, Some(1));
        assert_eq!(bullet.side, BulletSide::Player);
    }

    #[test]
    fn test_turn_snaps_to_half_tiles() {
        let mut tank = player();
        tank.position = Vec2Fixed::new(Fixed::from_num(101.5), Fixed::from_num(97.25));
        assert_eq!(tank.snapped_for_turn(Direction::Up).x, fx(104));
        assert_eq!(tank.snapped_for_turn(Direction::Left).y, fx(96));
    }

    #[test]
    fn test_convert_keeps_stronger_shells() {
        let tuning = Tuning::default();
        let mut tank = Tank::enemy(tuning.enemy(EnemyType::Regular), 40, Vec2Fixed::ZERO);
        tank.bullet_power = 2;
        tank.convert_to(tuning.enemy(EnemyType::Armored));
        assert_eq!(tank.enemy_type(), Some(EnemyType::Armored));
        assert_eq!(tank.health, 2);
        assert_eq!(tank.bullet_power, 2);
    }
}
