//! Power-up and easter egg pickups.
//!
//! Every power-up has two effects: one when the player collects it and a
//! mirrored one when an enemy drives over it first.

use crate::components::{EnemyType, EntityId, PowerUpKind};
use crate::entities::{Tank, EASTER_EGG_SIZE, POWER_UP_SIZE, TANK_SIZE};
use crate::events::GameEvent;
use crate::math::{boxes_overlap, Vec2Fixed};
use crate::services::SoundCue;
use crate::tile_map::TileType;
use crate::timers::TimedEffect;

use super::Simulation;

/// Health a shielded power-type enemy is raised to.
const POWER_SHIELD_HEALTH: u32 = 3;

impl Simulation {
    pub(super) fn collect_power_ups(&mut self) {
        for id in self.power_ups.ids() {
            let Some(power_up) = self.power_ups.get(id) else {
                continue;
            };
            let (kind, position) = (power_up.kind, power_up.position);
            let touches = |p: Vec2Fixed| boxes_overlap(position, POWER_UP_SIZE, p, TANK_SIZE);

            let by_player = self.player().is_some_and(|p| p.alive && touches(p.position));
            let collector = if by_player {
                Some(self.player_id)
            } else {
                self.enemies().find(|t| touches(t.position)).map(|t| t.id)
            };
            let Some(collector) = collector else {
                continue;
            };

            self.power_ups.remove(id);
            tracing::debug!(tick = self.tick, ?kind, by_player, "Power-up collected");
            self.emit(GameEvent::PowerUpCollected {
                id,
                kind,
                by_player,
            });
            self.play(SoundCue::PowerUpPickup);
            if by_player {
                self.apply_player_power_up(kind);
            } else {
                self.apply_enemy_power_up(collector, kind);
            }
        }
    }

    /// Player-side effect of a power-up.
    pub(super) fn apply_player_power_up(&mut self, kind: PowerUpKind) {
        let tuning = self.tuning.power_ups.clone();
        let Some(player) = self.tanks.get_mut(self.player_id) else {
            return;
        };
        let cap = u8::try_from(tuning.player_stack_cap).unwrap_or(u8::MAX);
        match kind {
            PowerUpKind::Gun => player.bullet_power = player.bullet_power.max(2),
            PowerUpKind::Star => player.star_stacks = (player.star_stacks + 1).min(cap),
            PowerUpKind::Machinegun => {
                player.machinegun_stacks = (player.machinegun_stacks + 1).min(cap);
            }
            PowerUpKind::Car => {
                player.speed_multiplier =
                    (player.speed_multiplier + tuning.car_step).min(tuning.car_cap);
            }
            PowerUpKind::Ship => player.can_swim = true,
            PowerUpKind::Saw => player.can_cut_forest = true,
            PowerUpKind::Tank => player.lives += 1,
            PowerUpKind::Shield => player.grant_shield(tuning.shield_duration),
            PowerUpKind::Shovel => {
                self.base_protection = Some(TimedEffect::new(tuning.shovel_duration, ()));
                self.set_protection(TileType::Steel);
            }
            PowerUpKind::Freeze => {
                self.enemy_freeze = Some(TimedEffect::new(tuning.freeze_duration, ()));
            }
            PowerUpKind::Bomb => {
                let ids: Vec<EntityId> = self.enemies().map(|t| t.id).collect();
                for id in ids {
                    self.kill_enemy(id, false);
                }
            }
        }
    }

    /// Enemy-side effect of a power-up collected by `id`.
    pub(super) fn apply_enemy_power_up(&mut self, id: EntityId, kind: PowerUpKind) {
        let tuning = self.tuning.power_ups.clone();
        match kind {
            PowerUpKind::Shovel => {
                self.base_protection = None;
                self.set_protection(TileType::Empty);
                return;
            }
            PowerUpKind::Tank => {
                self.spawner.enqueue_extra();
                return;
            }
            PowerUpKind::Freeze => {
                self.player_freeze = Some(TimedEffect::new(tuning.freeze_duration, ()));
                return;
            }
            PowerUpKind::Bomb => {
                self.hit_player(1);
                return;
            }
            PowerUpKind::Shield => {
                self.upgrade_enemy(id);
                return;
            }
            _ => {}
        }

        let Some(tank) = self.tanks.get_mut(id) else {
            return;
        };
        match kind {
            PowerUpKind::Gun => tank.bullet_power = tank.bullet_power.max(2),
            PowerUpKind::Star => tank.star_stacks = tank.star_stacks.saturating_add(1),
            PowerUpKind::Machinegun => {
                tank.machinegun_stacks = tank.machinegun_stacks.saturating_add(1);
            }
            PowerUpKind::Car => tank.speed_multiplier = tuning.enemy_car_multiplier,
            PowerUpKind::Ship => tank.can_swim = true,
            PowerUpKind::Saw => tank.can_cut_forest = true,
            _ => {}
        }
    }

    /// Shield pickup by an enemy: one rung up the type ladder.
    fn upgrade_enemy(&mut self, id: EntityId) {
        let Some(kind) = self.tanks.get(id).and_then(Tank::enemy_type) else {
            return;
        };
        let next = kind.upgrade().map(|next| self.tuning.enemy(next).clone());
        let Some(tank) = self.tanks.get_mut(id) else {
            return;
        };
        match (kind, next) {
            (_, Some(stats)) => tank.convert_to(&stats),
            (EnemyType::Power, None) => {
                tank.max_health = tank.max_health.max(POWER_SHIELD_HEALTH);
                tank.health = (tank.health + 1).min(tank.max_health);
            }
            (_, None) => tank.health = tank.max_health,
        }
    }

    pub(super) fn collect_easter_egg(&mut self) {
        let Some(egg) = self.easter_egg.as_ref() else {
            return;
        };
        let position = egg.position;
        let touches = |p: Vec2Fixed| boxes_overlap(position, EASTER_EGG_SIZE, p, TANK_SIZE);

        let by_player = self.player().is_some_and(|p| p.alive && touches(p.position));
        if !by_player && !self.enemies().any(|t| touches(t.position)) {
            return;
        }

        self.easter_egg = None;
        let convert_to = if by_player {
            if let Some(player) = self.tanks.get_mut(self.player_id) {
                player.lives += self.tuning.power_ups.easter_egg_lives;
            }
            EnemyType::Power
        } else {
            EnemyType::Heavy
        };
        let stats = self.tuning.enemy(convert_to).clone();
        let ids: Vec<EntityId> = self
            .enemies()
            .filter(|t| t.enemy_type() != Some(EnemyType::Boss))
            .map(|t| t.id)
            .collect();
        for id in ids {
            if let Some(tank) = self.tanks.get_mut(id) {
                tank.convert_to(&stats);
            }
        }
        tracing::debug!(tick = self.tick, by_player, ?convert_to, "Easter egg collected");
        self.emit(GameEvent::EasterEggCollected { by_player });
        self.play(SoundCue::EasterEgg);
    }
}

#[cfg(test)]
mod tests {
    use crate::components::{EnemyType, PowerUpKind};
    use crate::entities::EasterEgg;
    use crate::events::GameEvent;
    use crate::math::fx;
    use crate::simulation::{LevelSetup, PlayerInput, Simulation};
    use crate::tile_map::{Cell, TileMap, TileType};
    use crate::tuning::Tuning;

    fn open_sim() -> Simulation {
        let mut sim =
            Simulation::with_map(LevelSetup::new(1, 11), Tuning::default(), TileMap::bordered())
                .unwrap();
        sim.spawner_mut().hold(100_000);
        sim
    }

    #[test]
    fn test_player_collects_on_touch() {
        let mut sim = open_sim();
        let at = sim.player().unwrap().position;
        let id = sim.place_power_up(PowerUpKind::Star, at);
        let report = sim.tick(PlayerInput::default());
        assert!(report.events.contains(&GameEvent::PowerUpCollected {
            id,
            kind: PowerUpKind::Star,
            by_player: true,
        }));
        assert_eq!(sim.player().unwrap().star_stacks, 1);
        assert!(sim.power_ups().is_empty());
    }

    #[test]
    fn test_player_stacks_cap() {
        let mut sim = open_sim();
        for _ in 0..5 {
            sim.apply_player_power_up(PowerUpKind::Machinegun);
            sim.apply_player_power_up(PowerUpKind::Car);
        }
        let player = sim.player().unwrap();
        assert_eq!(player.machinegun_stacks, 3);
        assert_eq!(player.max_bullets(), 4);
        assert_eq!(player.speed_multiplier, sim.tuning().power_ups.car_cap);
    }

    #[test]
    fn test_bomb_kills_everything_for_score() {
        let mut sim = open_sim();
        sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        sim.spawn_enemy(EnemyType::Heavy, Cell::new(4, 10).center());
        sim.apply_player_power_up(PowerUpKind::Bomb);
        assert_eq!(sim.living_enemies(), 0);
        assert_eq!(sim.score(), 500);
        assert!(sim.power_ups().is_empty());
    }

    #[test]
    fn test_enemy_shovel_strips_protection() {
        let mut sim = open_sim();
        sim.apply_player_power_up(PowerUpKind::Shovel);
        let id = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        sim.apply_enemy_power_up(id, PowerUpKind::Shovel);
        assert!(sim.base_protection_remaining().is_none());
        assert_eq!(sim.map().protection_tiles(), [TileType::Empty; 5]);
    }

    #[test]
    fn test_enemy_tank_pickup_queues_extra() {
        let mut sim = open_sim();
        let id = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        let before = sim.hud().remaining_enemies;
        sim.apply_enemy_power_up(id, PowerUpKind::Tank);
        assert_eq!(sim.hud().remaining_enemies, before + 1);
    }

    #[test]
    fn test_enemy_shield_ladder() {
        let mut sim = open_sim();
        let regular = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        let power = sim.spawn_enemy(EnemyType::Power, Cell::new(4, 10).center());
        sim.apply_enemy_power_up(regular, PowerUpKind::Shield);
        sim.apply_enemy_power_up(power, PowerUpKind::Shield);
        assert_eq!(
            sim.tanks().get(regular).unwrap().enemy_type(),
            Some(EnemyType::Armored)
        );
        let power = sim.tanks().get(power).unwrap();
        assert_eq!(power.max_health, 3);
        assert_eq!(power.health, 3);
    }

    #[test]
    fn test_enemy_bomb_absorbed_by_shield() {
        let mut sim = open_sim();
        let id = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        assert!(sim.player().unwrap().is_shielded());
        sim.apply_enemy_power_up(id, PowerUpKind::Bomb);
        let player = sim.player().unwrap();
        assert!(player.alive);
        assert_eq!(player.lives, 3);
    }

    #[test]
    fn test_enemy_bomb_hurts_unshielded_player() {
        let mut sim = open_sim();
        let player_id = sim.player_id();
        sim.tank_mut(player_id).unwrap().shield = None;
        let id = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        sim.apply_enemy_power_up(id, PowerUpKind::Bomb);
        let player = sim.player().unwrap();
        assert!(!player.alive);
        assert_eq!(player.lives, 2);
        assert!(sim.events.contains(&GameEvent::PlayerDied { lives: 2 }));
        assert_eq!(sim.living_enemies(), 1);
    }

    #[test]
    fn test_enemy_equipment_pickups() {
        let mut sim = open_sim();
        let id = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        for kind in [
            PowerUpKind::Gun,
            PowerUpKind::Star,
            PowerUpKind::Star,
            PowerUpKind::Machinegun,
            PowerUpKind::Ship,
            PowerUpKind::Saw,
        ] {
            sim.apply_enemy_power_up(id, kind);
        }
        let tank = sim.tanks().get(id).unwrap();
        assert_eq!(tank.bullet_power, 2);
        assert_eq!(tank.star_stacks, 2);
        assert_eq!(tank.machinegun_stacks, 1);
        assert!(tank.can_swim);
        assert!(tank.can_cut_forest);
        assert_eq!(tank.enemy_type(), Some(EnemyType::Regular));

        let player = sim.player().unwrap();
        assert_eq!(player.star_stacks, 0);
        assert!(!player.can_swim);
    }

    #[test]
    fn test_player_wins_contested_pickup() {
        let mut sim = open_sim();
        let at = sim.player().unwrap().position;
        let enemy = sim.spawn_enemy(EnemyType::Regular, at);
        let id = sim.place_power_up(PowerUpKind::Gun, at);
        sim.collect_power_ups();
        assert!(sim.events.contains(&GameEvent::PowerUpCollected {
            id,
            kind: PowerUpKind::Gun,
            by_player: true,
        }));
        assert_eq!(sim.player().unwrap().bullet_power, 2);
        assert_eq!(sim.tanks().get(enemy).unwrap().bullet_power, 1);
        assert!(sim.power_ups().is_empty());
    }

    #[test]
    fn test_enemy_collects_when_player_is_away() {
        let mut sim = open_sim();
        let at = Cell::new(4, 4).center();
        let enemy = sim.spawn_enemy(EnemyType::Regular, at);
        let id = sim.place_power_up(PowerUpKind::Ship, at);
        sim.collect_power_ups();
        assert!(sim.events.contains(&GameEvent::PowerUpCollected {
            id,
            kind: PowerUpKind::Ship,
            by_player: false,
        }));
        assert!(sim.tanks().get(enemy).unwrap().can_swim);
        assert!(!sim.player().unwrap().can_swim);
    }

    #[test]
    fn test_enemy_car_and_freeze() {
        let mut sim = open_sim();
        let id = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        sim.apply_enemy_power_up(id, PowerUpKind::Car);
        assert_eq!(sim.tanks().get(id).unwrap().speed_multiplier, fx(3) / fx(2));
        sim.apply_enemy_power_up(id, PowerUpKind::Freeze);
        assert!(sim.player_frozen());
        let start = sim.player().unwrap().position;
        sim.tick(PlayerInput::drive(crate::components::Direction::Up));
        assert_eq!(sim.player().unwrap().position, start);
    }

    #[test]
    fn test_easter_egg_by_player() {
        let mut sim = open_sim();
        let boss = sim.spawn_enemy(EnemyType::Boss, Cell::new(4, 4).center());
        let fast = sim.spawn_enemy(EnemyType::Fast, Cell::new(4, 10).center());
        let at = sim.player().unwrap().position;
        sim.easter_egg = Some(EasterEgg::new(at, 100));
        let lives = sim.player().unwrap().lives;
        sim.collect_easter_egg();
        assert!(sim.easter_egg().is_none());
        assert_eq!(sim.player().unwrap().lives, lives + 3);
        assert_eq!(sim.tanks().get(boss).unwrap().enemy_type(), Some(EnemyType::Boss));
        assert_eq!(sim.tanks().get(fast).unwrap().enemy_type(), Some(EnemyType::Power));
    }

    #[test]
    fn test_easter_egg_by_enemy() {
        let mut sim = open_sim();
        let boss = sim.spawn_enemy(EnemyType::Boss, Cell::new(4, 10).center());
        let regular = sim.spawn_enemy(EnemyType::Regular, Cell::new(4, 4).center());
        let fast = sim.spawn_enemy(EnemyType::Fast, Cell::new(4, 16).center());
        sim.easter_egg = Some(EasterEgg::new(Cell::new(4, 4).center(), 100));
        let lives = sim.player().unwrap().lives;
        sim.collect_easter_egg();
        assert!(sim.easter_egg().is_none());
        assert!(sim.events.contains(&GameEvent::EasterEggCollected { by_player: false }));
        assert_eq!(sim.player().unwrap().lives, lives);
        assert_eq!(sim.tanks().get(boss).unwrap().enemy_type(), Some(EnemyType::Boss));
        for id in [regular, fast] {
            let tank = sim.tanks().get(id).unwrap();
            assert_eq!(tank.enemy_type(), Some(EnemyType::Heavy));
            assert_eq!(tank.max_health, sim.tuning().enemy(EnemyType::Heavy).health);
        }
    }

    #[test]
    fn test_untouched_egg_stays() {
        let mut sim = open_sim();
        sim.easter_egg = Some(EasterEgg::new(Cell::new(10, 12).center(), 100));
        sim.collect_easter_egg();
        assert!(sim.easter_egg().is_some());
    }
}
