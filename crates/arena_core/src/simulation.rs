//! Per-level orchestrator.
//!
//! [`Simulation`] owns every entity of one level and advances them at a
//! fixed 60 Hz tick. Each call to [`Simulation::tick`] runs the same passes
//! in the same order:
//!
//! 1. Freeze timers and the base protection timer
//! 2. Player (respawn, shield, movement, fire)
//! 3. Enemies (AI, movement, fire)
//! 4. Bullets vs terrain
//! 5. UFO and easter egg, plus the UFO appearance roll
//! 6. Spawner
//! 7. Collisions and power-up lifetimes
//! 8. Win/loss check
//!
//! # Determinism
//!
//! - Positions and speeds are fixed-point ([`Fixed`])
//! - Every random roll draws from one per-level [`SeededRandom`] stream
//! - Entities are visited in ID (creation) order
//!
//! Two simulations built from the same [`LevelSetup`] and fed the same
//! inputs produce the same [`Simulation::state_hash`] every tick.
//!
//! # Example
//!
//! ```
//! use arena_core::simulation::{LevelSetup, PlayerInput, Simulation};
//! use arena_core::tuning::Tuning;
//!
//! let mut sim = Simulation::new(LevelSetup::new(1, 42), Tuning::default()).unwrap();
//! let report = sim.tick(PlayerInput::default());
//! assert_eq!(report.tick, 1);
//! ```

mod combat;
mod pickups;

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ai::AiContext;
use crate::components::{BulletSide, Direction, EnemyType, EntityId, PowerUpKind};
use crate::entities::{Base, Bullet, EasterEgg, PowerUp, Tank, Ufo, BULLET_SPEED, TANK_SIZE};
use crate::error::{GameError, Result};
use crate::events::{
    BaseView, BulletView, GameEvent, Hud, LevelStatus, LossReason, PowerUpView, Snapshot,
    TankView, TickReport, UfoView,
};
use crate::hashing::StableHasher;
use crate::math::{boxes_overlap, Fixed, Vec2Fixed};
use crate::rng::{gameplay_seed, level_seed, SeededRandom};
use crate::services::{AudioSink, NullAudio, SoundCue};
use crate::session::CarryOver;
use crate::spawner::Spawner;
use crate::storage::EntityStorage;
use crate::tile_map::{TileMap, TileType, VisualHandle, PLAYER_SPAWN_RECT};
use crate::timers::{is_active, tick_slot, TimedEffect};
use crate::tuning::Tuning;

/// Ticks per second.
pub const TICK_RATE: u32 = 60;

/// Ticks a player keeps sliding on ice after releasing the stick.
pub const ICE_SLIDE_TICKS: u32 = 16;

/// One tick of player input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Held direction, if any.
    pub movement: Option<Direction>,
    /// Fire held.
    pub fire: bool,
}

impl PlayerInput {
    /// Drive in a direction without firing.
    #[must_use]
    pub const fn drive(dir: Direction) -> Self {
        Self {
            movement: Some(dir),
            fire: false,
        }
    }

    /// Fire without moving.
    #[must_use]
    pub const fn fire() -> Self {
        Self {
            movement: None,
            fire: true,
        }
    }
}

/// Everything needed to build a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSetup {
    /// 1-based level number.
    pub level: u32,
    /// Session root seed; the map and gameplay streams derive from it.
    pub session_seed: u64,
    /// Player state carried from the previous level.
    pub carry: Option<CarryOver>,
}

impl LevelSetup {
    /// A level with a fresh player.
    #[must_use]
    pub const fn new(level: u32, session_seed: u64) -> Self {
        Self {
            level,
            session_seed,
            carry: None,
        }
    }

    /// Attach carried player state.
    #[must_use]
    pub fn with_carry(mut self, carry: CarryOver) -> Self {
        self.carry = Some(carry);
        self
    }

    /// Seed of this level's map.
    #[must_use]
    pub const fn map_seed(&self) -> u64 {
        level_seed(self.session_seed, self.level)
    }
}

/// One level in play.
pub struct Simulation {
    tick: u64,
    level: u32,
    tuning: Tuning,
    map: TileMap,
    rng: SeededRandom,
    tanks: EntityStorage<Tank>,
    bullets: EntityStorage<Bullet>,
    power_ups: EntityStorage<PowerUp>,
    ufo: Option<Ufo>,
    ufo_appeared: bool,
    easter_egg: Option<EasterEgg>,
    base: Base,
    spawner: Spawner,
    player_id: EntityId,
    enemy_freeze: Option<TimedEffect<()>>,
    player_freeze: Option<TimedEffect<()>>,
    base_protection: Option<TimedEffect<()>>,
    score: u64,
    kills: u32,
    kills_by_type: [u32; 6],
    status: LevelStatus,
    events: Vec<GameEvent>,
    audio: Box<dyn AudioSink>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.tick)
            .field("level", &self.level)
            .field("status", &self.status)
            .field("tanks", &self.tanks.len())
            .field("bullets", &self.bullets.len())
            .field("score", &self.score)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Generate the level's map and set everything up.
    pub fn new(setup: LevelSetup, tuning: Tuning) -> Result<Self> {
        if setup.level == 0 {
            return Err(GameError::InvalidLevel(setup.level));
        }
        let map = TileMap::generate(setup.map_seed());
        Self::with_map(setup, tuning, map)
    }

    /// Set the level up on an explicit map.
    pub fn with_map(setup: LevelSetup, tuning: Tuning, map: TileMap) -> Result<Self> {
        if setup.level == 0 {
            return Err(GameError::InvalidLevel(setup.level));
        }
        tuning.validate()?;
        map.validate()?;
        let spawner = Spawner::new(setup.level, &tuning.spawner)?;

        let mut tanks = EntityStorage::new();
        let mut player = Tank::player(1, &tuning.player, PLAYER_SPAWN_RECT.center());
        let carry = setup
            .carry
            .clone()
            .unwrap_or_else(|| CarryOver::fresh(&tuning.player));
        carry.apply_to(&mut player);
        player.grant_shield(tuning.player.spawn_shield);
        let player_id = tanks.insert(player);

        tracing::info!(
            level = setup.level,
            map_seed = setup.map_seed(),
            enemies = spawner.total_enemies(),
            "Level started"
        );

        Ok(Self {
            tick: 0,
            level: setup.level,
            map,
            rng: SeededRandom::new(gameplay_seed(setup.map_seed())),
            tanks,
            bullets: EntityStorage::new(),
            power_ups: EntityStorage::new(),
            ufo: None,
            ufo_appeared: false,
            easter_egg: None,
            base: Base::default(),
            spawner,
            player_id,
            enemy_freeze: None,
            player_freeze: None,
            base_protection: None,
            score: carry.score,
            kills: 0,
            kills_by_type: [0; 6],
            status: LevelStatus::Playing,
            events: Vec::new(),
            audio: Box::new(NullAudio),
            tuning,
        })
    }

    /// Replace the audio sink.
    #[must_use]
    pub fn with_audio(mut self, audio: Box<dyn AudioSink>) -> Self {
        self.audio = audio;
        self
    }

    /// Ticks run so far.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Level number.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Session score including this level.
    #[must_use]
    pub const fn score(&self) -> u64 {
        self.score
    }

    /// Enemies killed this level.
    #[must_use]
    pub const fn kills(&self) -> u32 {
        self.kills
    }

    /// Kills this level for one enemy type.
    #[must_use]
    pub const fn kills_of(&self, kind: EnemyType) -> u32 {
        self.kills_by_type[kind.index()]
    }

    /// Level status.
    #[must_use]
    pub const fn status(&self) -> LevelStatus {
        self.status
    }

    /// Tuning in effect.
    #[must_use]
    pub const fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Terrain.
    #[must_use]
    pub const fn map(&self) -> &TileMap {
        &self.map
    }

    /// Mutable terrain, for tools and scripted scenarios.
    pub fn map_mut(&mut self) -> &mut TileMap {
        &mut self.map
    }

    /// All tanks, player included.
    #[must_use]
    pub const fn tanks(&self) -> &EntityStorage<Tank> {
        &self.tanks
    }

    /// Mutable access to one tank, for tools and scripted scenarios.
    pub fn tank_mut(&mut self, id: EntityId) -> Option<&mut Tank> {
        self.tanks.get_mut(id)
    }

    /// ID of the player tank.
    #[must_use]
    pub const fn player_id(&self) -> EntityId {
        self.player_id
    }

    /// The player tank.
    #[must_use]
    pub fn player(&self) -> Option<&Tank> {
        self.tanks.get(self.player_id)
    }

    /// Bullets in flight.
    #[must_use]
    pub const fn bullets(&self) -> &EntityStorage<Bullet> {
        &self.bullets
    }

    /// Power-ups on the field.
    #[must_use]
    pub const fn power_ups(&self) -> &EntityStorage<PowerUp> {
        &self.power_ups
    }

    /// The UFO, if airborne.
    #[must_use]
    pub const fn ufo(&self) -> Option<&Ufo> {
        self.ufo.as_ref()
    }

    /// The easter egg, if on the field.
    #[must_use]
    pub const fn easter_egg(&self) -> Option<&EasterEgg> {
        self.easter_egg.as_ref()
    }

    /// The base.
    #[must_use]
    pub const fn base(&self) -> &Base {
        &self.base
    }

    /// Enemy population state.
    #[must_use]
    pub const fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    /// Mutable spawner, for tools and scripted scenarios.
    pub fn spawner_mut(&mut self) -> &mut Spawner {
        &mut self.spawner
    }

    /// Whether enemies are frozen.
    #[must_use]
    pub fn enemies_frozen(&self) -> bool {
        is_active(&self.enemy_freeze)
    }

    /// Whether the player is frozen.
    #[must_use]
    pub fn player_frozen(&self) -> bool {
        is_active(&self.player_freeze)
    }

    /// Ticks left on the shovel fortification.
    #[must_use]
    pub fn base_protection_remaining(&self) -> Option<u32> {
        self.base_protection.as_ref().map(TimedEffect::remaining)
    }

    /// Living enemy tanks.
    pub fn enemies(&self) -> impl Iterator<Item = &Tank> {
        self.tanks.values().filter(|t| !t.is_player() && t.alive)
    }

    /// Number of living enemy tanks.
    #[must_use]
    pub fn living_enemies(&self) -> u32 {
        self.enemies().count() as u32
    }

    /// Drain visual handles released by tile destruction.
    pub fn take_released_handles(&mut self) -> Vec<VisualHandle> {
        self.map.take_released_handles()
    }

    /// Player state to carry into the next level.
    #[must_use]
    pub fn carry_over(&self) -> CarryOver {
        self.player().map_or_else(
            || CarryOver::fresh(&self.tuning.player),
            |player| CarryOver::from_tank(player, self.score),
        )
    }

    /// Advance one tick.
    ///
    /// Once the level is decided further calls change nothing and report
    /// the final state with no events.
    pub fn tick(&mut self, input: PlayerInput) -> TickReport {
        if self.status.is_over() {
            return self.report(Vec::new());
        }
        self.tick += 1;

        self.update_timers();
        self.update_player(input);
        self.update_enemies();
        self.update_bullets();
        self.update_ufo_and_egg();
        self.run_spawner();
        if self.resolve_collisions() {
            self.update_power_up_lifetimes();
        }
        self.check_outcome();
        self.flush_tile_deltas();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::debug!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        let events = std::mem::take(&mut self.events);
        self.report(events)
    }

    fn report(&self, events: Vec<GameEvent>) -> TickReport {
        TickReport {
            tick: self.tick,
            events,
            status: self.status,
            snapshot: self.snapshot(),
        }
    }

    fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    fn play(&mut self, cue: SoundCue) {
        self.audio.play(cue);
    }

    fn update_timers(&mut self) {
        tick_slot(&mut self.enemy_freeze);
        tick_slot(&mut self.player_freeze);

        let Some(timer) = self.base_protection.as_mut() else {
            return;
        };
        let expired = timer.tick().is_some();
        let remaining = timer.remaining();
        if expired {
            self.base_protection = None;
            self.set_protection(TileType::Brick);
            return;
        }
        let window = self.tuning.power_ups.shovel_flash_window;
        let period = self.tuning.power_ups.shovel_flash_period;
        if period > 0 && remaining <= window && remaining % period == 0 {
            let tile = if (remaining / period) % 2 == 0 {
                TileType::Steel
            } else {
                TileType::Brick
            };
            self.set_protection(tile);
        }
    }

    /// Rewrite the base footprint, announcing real changes only.
    fn set_protection(&mut self, tile: TileType) {
        if self.map.protection_tiles() == [tile; 5] {
            return;
        }
        match tile {
            TileType::Steel => self.map.set_base_protection(true),
            TileType::Empty => self.map.clear_base_protection(),
            _ => self.map.set_base_protection(false),
        }
        self.emit(GameEvent::BaseProtectionChanged { tile });
    }

    fn update_player(&mut self, input: PlayerInput) {
        let spawn_shield = self.tuning.player.spawn_shield;
        let Some(player) = self.tanks.get_mut(self.player_id) else {
            return;
        };
        if !player.alive {
            let Some(position) = tick_slot(&mut player.respawn) else {
                return;
            };
            player.alive = true;
            player.health = player.max_health;
            player.position = position;
            player.facing = Direction::Up;
            player.grant_shield(spawn_shield);
            self.emit(GameEvent::PlayerRespawned { position });
            return;
        }
        player.tick_timers();

        if !is_active(&self.player_freeze) {
            let heading = match input.movement {
                Some(dir) => Some(dir),
                None if player.ice_slide > 0 => {
                    player.ice_slide -= 1;
                    Some(player.facing)
                }
                None => None,
            };
            if let Some(dir) = heading {
                self.move_tank(self.player_id, dir);
                let on_ice = self
                    .player()
                    .is_some_and(|p| self.map.is_ice_tile(p.position));
                if let Some(player) = self.tanks.get_mut(self.player_id) {
                    if !on_ice {
                        player.ice_slide = 0;
                    } else if input.movement.is_some() {
                        player.ice_slide = ICE_SLIDE_TICKS;
                    }
                }
            }
        }

        if input.fire {
            self.fire_from(self.player_id);
        }
    }

    fn update_enemies(&mut self) {
        let frozen = is_active(&self.enemy_freeze);
        let ids: Vec<EntityId> = self.enemies().map(|t| t.id).collect();
        let players: Vec<Vec2Fixed> = self
            .player()
            .filter(|p| p.alive)
            .map(|p| p.position)
            .into_iter()
            .collect();
        let base = (!self.base.destroyed).then_some(self.base.position);

        for id in ids {
            if frozen {
                if let Some(tank) = self.tanks.get_mut(id) {
                    tick_slot(&mut tank.shield);
                }
                continue;
            }
            let live: Vec<(EntityId, Vec2Fixed)> = self
                .tanks
                .values()
                .filter(|t| t.alive)
                .map(|t| (t.id, t.position))
                .collect();
            let Some(tank) = self.tanks.get_mut(id) else {
                continue;
            };
            tank.tick_timers();
            let Some(mut ai) = tank.ai.take() else {
                continue;
            };
            let ctx = AiContext {
                id,
                position: tank.position,
                facing: tank.facing,
                step: tank.move_speed(),
                can_swim: tank.can_swim,
                map: &self.map,
                tanks: &live,
                players: &players,
                base,
            };
            let intent = ai.decide(&ctx, &mut self.rng);
            tank.ai = Some(ai);

            self.move_tank(id, intent.movement);
            if intent.fire {
                self.fire_from(id);
            }
        }
    }

    /// Turn (with grid snap) and step a tank. Returns whether it moved.
    fn move_tank(&mut self, id: EntityId, dir: Direction) -> bool {
        let others: Vec<Vec2Fixed> = self
            .tanks
            .values()
            .filter(|t| t.alive && t.id != id)
            .map(|t| t.position)
            .collect();
        let Some(tank) = self.tanks.get_mut(id) else {
            return false;
        };
        let map = &self.map;
        let blocked = |from: Vec2Fixed, to: Vec2Fixed, can_swim: bool| {
            map.check_tank_collision(to, TANK_SIZE, can_swim)
                || others.iter().any(|o| {
                    boxes_overlap(to, TANK_SIZE, *o, TANK_SIZE)
                        && to.distance_squared(*o) < from.distance_squared(*o)
                })
        };

        if dir != tank.facing {
            if dir.is_vertical() != tank.facing.is_vertical() {
                let snapped = tank.snapped_for_turn(dir);
                if !blocked(tank.position, snapped, tank.can_swim) {
                    tank.position = snapped;
                }
            }
            tank.facing = dir;
        }

        let target = tank.position + dir.unit().scale(tank.move_speed());
        let moved = !blocked(tank.position, target, tank.can_swim);
        if moved {
            tank.position = target;
        }
        let (position, saw) = (tank.position, tank.can_cut_forest);
        if saw {
            self.map.destroy_forest_in_box(position, TANK_SIZE);
        }
        moved
    }

    fn fire_from(&mut self, id: EntityId) {
        let Some(bullet) = self.tanks.get_mut(id).and_then(Tank::fire) else {
            return;
        };
        self.add_bullet(bullet);
    }

    fn add_bullet(&mut self, bullet: Bullet) -> EntityId {
        let side = bullet.side;
        let id = self.bullets.insert(bullet);
        self.emit(GameEvent::BulletFired { id, side });
        self.play(SoundCue::Fire);
        id
    }

    /// Remove a bullet and give its owner the slot back.
    fn remove_bullet(&mut self, id: EntityId) {
        let Some(bullet) = self.bullets.remove(id) else {
            return;
        };
        if let Some(owner) = bullet.owner.and_then(|o| self.tanks.get_mut(o)) {
            owner.on_bullet_removed();
        }
    }

    fn update_bullets(&mut self) {
        for id in self.bullets.ids() {
            let Some(bullet) = self.bullets.get_mut(id) else {
                continue;
            };
            bullet.advance();
            let gone = if bullet.out_of_bounds() {
                true
            } else {
                let impact = self.map.check_bullet_collision(bullet.position, bullet.power);
                if impact.hit {
                    let cue = if impact.destroyed {
                        SoundCue::BrickHit
                    } else {
                        SoundCue::SteelHit
                    };
                    if bullet.side == BulletSide::Player {
                        self.audio.play(cue);
                    }
                }
                impact.hit
            };
            if gone {
                self.remove_bullet(id);
            }
        }
    }

    fn update_ufo_and_egg(&mut self) {
        if let Some(ufo) = self.ufo.as_mut() {
            let action = ufo.update(&mut self.rng, &self.tuning.ufo);
            let position = ufo.position;
            if action.escaped {
                self.ufo = None;
                tracing::debug!(tick = self.tick, "UFO escaped");
                self.emit(GameEvent::UfoEscaped);
            } else if action.fire {
                self.add_bullet(Bullet::new(
                    position,
                    Direction::Down,
                    None,
                    BulletSide::Ufo,
                    1,
                    BULLET_SPEED,
                ));
            }
        }

        if self.easter_egg.as_mut().is_some_and(EasterEgg::tick) {
            self.easter_egg = None;
        }

        if self.ufo_gate_open() && self.rng.chance(self.tuning.ufo.appear_chance) {
            self.summon_ufo();
        }
    }

    fn ufo_gate_open(&self) -> bool {
        let base_power = self.tuning.player.bullet_power;
        !self.ufo_appeared
            && self.ufo.is_none()
            && self.kills >= self.tuning.ufo.kill_gate
            && self
                .player()
                .is_some_and(|p| p.alive && p.has_equipment_upgrade(base_power))
    }

    /// Bring the UFO in now. Only one UFO per level.
    pub fn summon_ufo(&mut self) -> bool {
        if self.ufo_appeared || self.ufo.is_some() {
            return false;
        }
        let ufo = Ufo::enter(&mut self.rng, &self.tuning.ufo);
        let position = ufo.position;
        self.ufo = Some(ufo);
        self.ufo_appeared = true;
        tracing::debug!(tick = self.tick, "UFO incoming");
        self.emit(GameEvent::UfoIncoming { position });
        self.play(SoundCue::UfoAppear);
        true
    }

    fn run_spawner(&mut self) {
        let on_screen = self.living_enemies();
        let occupied: Vec<Vec2Fixed> = self
            .tanks
            .values()
            .filter(|t| t.alive)
            .map(|t| t.position)
            .collect();
        if let Some(order) = self
            .spawner
            .update(on_screen, &self.map, &occupied, &mut self.rng)
        {
            self.spawn_enemy(order.kind, order.position);
        }
    }

    /// Place an enemy directly, bypassing the spawner.
    pub fn spawn_enemy(&mut self, kind: EnemyType, position: Vec2Fixed) -> EntityId {
        let tank = Tank::enemy(
            self.tuning.enemy(kind),
            self.tuning.enemy_shoot_cooldown,
            position,
        );
        let id = self.tanks.insert(tank);
        self.emit(GameEvent::EnemySpawned { id, kind, position });
        id
    }

    /// Place a power-up directly.
    pub fn place_power_up(&mut self, kind: PowerUpKind, position: Vec2Fixed) -> EntityId {
        let id = self
            .power_ups
            .insert(PowerUp::new(kind, position, self.tuning.power_ups.lifetime));
        self.emit(GameEvent::PowerUpSpawned { id, kind, position });
        self.play(SoundCue::PowerUpAppear);
        id
    }

    /// Put a bullet in flight directly.
    pub fn spawn_bullet(&mut self, bullet: Bullet) -> EntityId {
        if let Some(owner) = bullet.owner.and_then(|o| self.tanks.get_mut(o)) {
            owner.bullets_in_flight += 1;
        }
        self.add_bullet(bullet)
    }

    fn update_power_up_lifetimes(&mut self) {
        for id in self.power_ups.ids() {
            if self.power_ups.get_mut(id).is_some_and(PowerUp::tick) {
                self.power_ups.remove(id);
                self.emit(GameEvent::PowerUpExpired { id });
            }
        }
    }

    fn check_outcome(&mut self) {
        if self.status.is_over() {
            return;
        }
        let out_of_lives = self.player().is_some_and(|p| p.lives == 0 && !p.alive);
        let status = if self.base.destroyed {
            LevelStatus::Lost(LossReason::BaseDestroyed)
        } else if out_of_lives {
            LevelStatus::Lost(LossReason::OutOfLives)
        } else if self.spawner.exhausted() && self.living_enemies() == 0 {
            LevelStatus::Won
        } else {
            return;
        };
        self.status = status;
        match status {
            LevelStatus::Won => {
                tracing::info!(level = self.level, score = self.score, tick = self.tick, "Level complete");
                self.emit(GameEvent::LevelComplete {
                    level: self.level,
                    score: self.score,
                });
                self.play(SoundCue::LevelComplete);
            }
            LevelStatus::Lost(reason) => {
                tracing::info!(level = self.level, score = self.score, ?reason, "Game over");
                self.emit(GameEvent::GameOver {
                    level: self.level,
                    score: self.score,
                });
                self.play(SoundCue::GameOver);
            }
            LevelStatus::Playing => {}
        }
    }

    fn flush_tile_deltas(&mut self) {
        for delta in self.map.take_deltas() {
            self.events.push(GameEvent::TileChanged {
                cell: delta.cell,
                tile: delta.tile,
            });
        }
    }

    /// Presentation view of the current state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let enemies_frozen = self.enemies_frozen();
        let player_frozen = self.player_frozen();
        let tanks = self
            .tanks
            .values()
            .map(|t| TankView {
                id: t.id,
                kind: t.kind,
                position: t.position,
                facing: t.facing,
                health: t.health,
                shielded: t.is_shielded(),
                frozen: if t.is_player() {
                    player_frozen
                } else {
                    enemies_frozen
                },
                visible: t.alive,
            })
            .collect();
        let bullets = self
            .bullets
            .values()
            .map(|b| BulletView {
                id: b.id,
                position: b.position,
                direction: b.direction,
                side: b.side,
            })
            .collect();
        let blink_window = self.tuning.power_ups.blink_window;
        let power_ups = self
            .power_ups
            .values()
            .map(|p| PowerUpView {
                id: p.id,
                kind: p.kind,
                position: p.position,
                blinking: p.is_blinking(blink_window),
            })
            .collect();
        Snapshot {
            tanks,
            bullets,
            power_ups,
            ufo: self.ufo.as_ref().map(|u| UfoView {
                position: u.position,
                health: u.health,
            }),
            easter_egg: self.easter_egg.as_ref().map(|e| e.position),
            base: BaseView {
                position: self.base.position,
                destroyed: self.base.destroyed,
            },
            hud: self.hud(),
        }
    }

    /// HUD numbers.
    #[must_use]
    pub fn hud(&self) -> Hud {
        Hud {
            remaining_enemies: self.spawner.remaining_enemies(),
            lives: self.player().map_or(0, |p| p.lives),
            level: self.level,
            score: self.score,
        }
    }

    /// Hash of the full simulation state.
    ///
    /// Two simulations with identical state produce identical hashes on any
    /// platform or toolchain; used by replays and the determinism harness.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = StableHasher::new();

        self.tick.hash(&mut hasher);
        self.level.hash(&mut hasher);
        self.score.hash(&mut hasher);
        self.kills.hash(&mut hasher);
        self.map.tiles().hash(&mut hasher);

        self.tanks.len().hash(&mut hasher);
        for tank in self.tanks.values() {
            tank.id.hash(&mut hasher);
            tank.kind.hash(&mut hasher);
            tank.position.hash(&mut hasher);
            tank.facing.hash(&mut hasher);
            tank.health.hash(&mut hasher);
            tank.lives.hash(&mut hasher);
            tank.alive.hash(&mut hasher);
            tank.bullets_in_flight.hash(&mut hasher);
            tank.cooldown_remaining().hash(&mut hasher);
            tank.star_stacks.hash(&mut hasher);
            tank.machinegun_stacks.hash(&mut hasher);
            tank.speed_multiplier.to_bits().hash(&mut hasher);
            tank.shield.map(|s| s.remaining()).hash(&mut hasher);
        }

        self.bullets.len().hash(&mut hasher);
        for bullet in self.bullets.values() {
            bullet.id.hash(&mut hasher);
            bullet.position.hash(&mut hasher);
            bullet.direction.hash(&mut hasher);
            bullet.owner.hash(&mut hasher);
            bullet.power.hash(&mut hasher);
        }

        self.power_ups.len().hash(&mut hasher);
        for power_up in self.power_ups.values() {
            power_up.id.hash(&mut hasher);
            power_up.kind.hash(&mut hasher);
            power_up.position.hash(&mut hasher);
            power_up.remaining().hash(&mut hasher);
        }

        if let Some(ufo) = &self.ufo {
            ufo.position.hash(&mut hasher);
            ufo.health.hash(&mut hasher);
        }
        self.easter_egg
            .as_ref()
            .map(|e| e.position)
            .hash(&mut hasher);
        self.base.destroyed.hash(&mut hasher);
        self.spawner.spawned().hash(&mut hasher);
        self.spawner.extra_queued().hash(&mut hasher);
        self.enemy_freeze.map(|t| t.remaining()).hash(&mut hasher);
        self.player_freeze.map(|t| t.remaining()).hash(&mut hasher);
        self.base_protection_remaining().hash(&mut hasher);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_map::{Cell, BASE_CELL};

    fn open_sim() -> Simulation {
        let mut sim =
            Simulation::with_map(LevelSetup::new(1, 7), Tuning::default(), TileMap::bordered())
                .unwrap();
        sim.spawner_mut().hold(100_000);
        sim
    }

    #[test]
    fn test_level_zero_rejected() {
        assert!(matches!(
            Simulation::new(LevelSetup::new(0, 1), Tuning::default()),
            Err(GameError::InvalidLevel(0))
        ));
    }

    #[test]
    fn test_deterministic_hash() {
        let mut a = Simulation::new(LevelSetup::new(1, 99), Tuning::default()).unwrap();
        let mut b = Simulation::new(LevelSetup::new(1, 99), Tuning::default()).unwrap();
        for i in 0..600u32 {
            let input = PlayerInput {
                movement: Some(Direction::ALL[(i / 40 % 4) as usize]),
                fire: i % 7 == 0,
            };
            a.tick(input);
            b.tick(input);
            assert_eq!(a.state_hash(), b.state_hash(), "diverged at tick {i}");
        }
    }

    #[test]
    fn test_player_starts_shielded_at_spawn() {
        let sim = open_sim();
        let player = sim.player().unwrap();
        assert!(player.is_shielded());
        assert_eq!(player.position, PLAYER_SPAWN_RECT.center());
        assert_eq!(player.lives, 3);
    }

    #[test]
    fn test_player_moves_and_fires() {
        let mut sim = open_sim();
        let start = sim.player().unwrap().position;
        let report = sim.tick(PlayerInput {
            movement: Some(Direction::Up),
            fire: true,
        });
        let player = sim.player().unwrap();
        assert!(player.position.y > start.y);
        assert_eq!(sim.bullets().len(), 1);
        assert!(report
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::BulletFired { side: BulletSide::Player, .. })));
    }

    #[test]
    fn test_shovel_flash_then_revert() {
        let mut sim = open_sim();
        sim.apply_player_power_up(PowerUpKind::Shovel);
        assert_eq!(sim.map().protection_tiles(), [TileType::Steel; 5]);
        let mut saw_brick_while_active = false;
        for _ in 0..3600 {
            sim.tick(PlayerInput::default());
            if sim.base_protection_remaining().is_some()
                && sim.map().protection_tiles() == [TileType::Brick; 5]
            {
                saw_brick_while_active = true;
            }
        }
        assert!(saw_brick_while_active);
        assert!(sim.base_protection_remaining().is_none());
        assert_eq!(sim.map().protection_tiles(), [TileType::Brick; 5]);
    }

    #[test]
    fn test_shot_base_ends_level() {
        let mut sim = open_sim();
        sim.map_mut().clear_base_protection();
        let above = Cell::new(BASE_CELL.row - 2, BASE_CELL.col).center();
        sim.spawn_bullet(Bullet::new(
            above,
            Direction::Down,
            None,
            BulletSide::Enemy,
            1,
            BULLET_SPEED,
        ));
        let mut lost = false;
        for _ in 0..20 {
            let report = sim.tick(PlayerInput::default());
            if report.status == LevelStatus::Lost(LossReason::BaseDestroyed) {
                assert!(report.events.contains(&GameEvent::BaseDestroyed));
                lost = true;
                break;
            }
        }
        assert!(lost);
        assert!(sim.base().destroyed);
        let frozen_tick = sim.current_tick();
        let report = sim.tick(PlayerInput::default());
        assert_eq!(report.tick, frozen_tick);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_tile_changes_are_reported() {
        let mut sim = open_sim();
        let target = Cell::new(10, 10);
        sim.map_mut().set_tile(target, TileType::Brick);
        sim.map_mut().take_deltas();
        let start = Cell::new(12, 10).center();
        sim.spawn_bullet(Bullet::new(
            start,
            Direction::Up,
            None,
            BulletSide::Player,
            1,
            BULLET_SPEED,
        ));
        let mut changed = false;
        for _ in 0..20 {
            let report = sim.tick(PlayerInput::default());
            if report.events.contains(&GameEvent::TileChanged {
                cell: target,
                tile: TileType::Empty,
            }) {
                changed = true;
                break;
            }
        }
        assert!(changed);
        assert!(sim.bullets().is_empty());
    }

    #[test]
    fn test_ice_slide_carries_player() {
        let mut sim = open_sim();
        for row in 14..=22 {
            sim.map_mut().set_tile(Cell::new(row, 8), TileType::Ice);
            sim.map_mut().set_tile(Cell::new(row, 9), TileType::Ice);
        }
        for _ in 0..40 {
            sim.tick(PlayerInput::drive(Direction::Up));
        }
        assert!(sim.map().is_ice_tile(sim.player().unwrap().position));
        let released = sim.player().unwrap().position;
        sim.tick(PlayerInput::default());
        let slid = sim.player().unwrap().position;
        assert!(slid.y > released.y);
        for _ in 0..ICE_SLIDE_TICKS + 2 {
            sim.tick(PlayerInput::default());
        }
        let settled = sim.player().unwrap().position;
        sim.tick(PlayerInput::default());
        assert_eq!(sim.player().unwrap().position, settled);
    }

    #[test]
    fn test_hud_tracks_spawner() {
        let mut sim =
            Simulation::with_map(LevelSetup::new(1, 3), Tuning::default(), TileMap::bordered())
                .unwrap();
        for _ in 0..400 {
            let report = sim.tick(PlayerInput::default());
            let s = sim.spawner();
            assert_eq!(
                report.snapshot.hud.remaining_enemies,
                s.total_enemies() - s.spawned() + s.extra_queued()
            );
            assert!(sim.living_enemies() <= s.max_on_screen());
        }
        assert!(sim.spawner().spawned() >= 2);
    }

    #[test]
    fn test_frozen_enemies_hold_still() {
        let mut sim = open_sim();
        let id = sim.spawn_enemy(EnemyType::Fast, Cell::new(6, 12).center());
        sim.apply_player_power_up(PowerUpKind::Freeze);
        let before = sim.tanks().get(id).unwrap().position;
        for _ in 0..100 {
            sim.tick(PlayerInput::default());
        }
        assert_eq!(sim.tanks().get(id).unwrap().position, before);
        assert!(sim.enemies_frozen());
        assert!(sim.snapshot().tanks.iter().any(|t| t.id == id && t.frozen));
    }
}
