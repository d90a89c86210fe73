//! Scripted player policies for autoplay.
//!
//! Pilots only read the simulation; everything they decide goes through
//! [`PlayerInput`], so an autoplayed session records and replays like a
//! human one.

use std::str::FromStr;

use arena_core::ai::heading_toward;
use arena_core::components::Direction;
use arena_core::math::{fx, Fixed, Vec2Fixed};
use arena_core::simulation::{PlayerInput, Simulation};
use serde::{Deserialize, Serialize};

/// Alignment slack when deciding whether a target is in the line of fire.
const AIM_SLACK: Fixed = fx(6);

/// Ticks without progress before the hunter picks another heading.
const STUCK_TICKS: u32 = 20;

/// Which policy drives the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PilotKind {
    /// Never touches the controls.
    Idle,
    /// Sweeps all four headings and fires on a fixed rhythm.
    Patrol,
    /// Chases the nearest enemy and fires when lined up.
    #[default]
    Hunter,
}

impl FromStr for PilotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "idle" => Ok(Self::Idle),
            "patrol" => Ok(Self::Patrol),
            "hunter" | "hunt" => Ok(Self::Hunter),
            other => Err(format!("unknown pilot '{other}' (idle, patrol, hunter)")),
        }
    }
}

/// A stateful player policy.
#[derive(Debug, Clone)]
pub struct Pilot {
    kind: PilotKind,
    ticks: u64,
    last_position: Option<Vec2Fixed>,
    stalled: u32,
    detour: Option<Direction>,
}

impl Pilot {
    /// Fresh pilot of the given kind.
    #[must_use]
    pub const fn new(kind: PilotKind) -> Self {
        Self {
            kind,
            ticks: 0,
            last_position: None,
            stalled: 0,
            detour: None,
        }
    }

    /// Policy in use.
    #[must_use]
    pub const fn kind(&self) -> PilotKind {
        self.kind
    }

    /// Input for the next tick of `sim`.
    pub fn next_input(&mut self, sim: &Simulation) -> PlayerInput {
        let tick = self.ticks;
        self.ticks += 1;
        match self.kind {
            PilotKind::Idle => PlayerInput::default(),
            PilotKind::Patrol => PlayerInput {
                movement: Some(Direction::ALL[(tick / 45 % 4) as usize]),
                fire: tick % 6 == 0,
            },
            PilotKind::Hunter => self.hunt(sim, tick),
        }
    }

    fn hunt(&mut self, sim: &Simulation, tick: u64) -> PlayerInput {
        let Some(me) = sim.player().filter(|p| p.alive) else {
            return PlayerInput::default();
        };
        let here = me.position;

        if self.last_position == Some(here) {
            self.stalled += 1;
        } else {
            self.stalled = 0;
        }
        self.last_position = Some(here);

        let target = sim
            .enemies()
            .filter(|e| e.alive)
            .min_by_key(|e| here.manhattan_distance(e.position))
            .map(|e| e.position);

        let Some(target) = target else {
            // Nothing to hunt: wander so pickups get collected.
            return PlayerInput {
                movement: Some(Direction::ALL[(tick / 60 % 4) as usize]),
                fire: false,
            };
        };

        let delta = target - here;
        if delta.x.abs() <= AIM_SLACK || delta.y.abs() <= AIM_SLACK {
            let aim = heading_toward(here, target);
            self.detour = None;
            return PlayerInput {
                movement: (me.facing != aim).then_some(aim),
                fire: me.facing == aim,
            };
        }

        if self.stalled >= STUCK_TICKS {
            // Blocked by terrain: turn clockwise from wherever we were
            // trying to go and shoot the obstacle on the way.
            let next = clockwise(self.detour.unwrap_or(me.facing));
            self.detour = Some(next);
            self.stalled = 0;
        }

        let heading = self.detour.unwrap_or_else(|| heading_toward(here, target));
        PlayerInput {
            movement: Some(heading),
            fire: tick % 10 == 0,
        }
    }
}

const fn clockwise(dir: Direction) -> Direction {
    match dir {
        Direction::Up => Direction::Right,
        Direction::Right => Direction::Down,
        Direction::Down => Direction::Left,
        Direction::Left => Direction::Up,
    }
}
