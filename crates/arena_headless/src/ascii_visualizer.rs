//! ASCII rendering of maps and live snapshots for terminals and CI logs.

use std::fmt::Write as _;

use arena_core::components::{EnemyType, TankKind};
use arena_core::events::Snapshot;
use arena_core::math::Vec2Fixed;
use arena_core::tile_map::{TileMap, MAP_COLS, MAP_ROWS};

/// Configuration for ASCII rendering.
#[derive(Debug, Clone, Copy)]
pub struct AsciiConfig {
    /// Draw a legend under the grid.
    pub show_legend: bool,
    /// Draw the HUD line above the grid.
    pub show_hud: bool,
}

impl Default for AsciiConfig {
    fn default() -> Self {
        Self {
            show_legend: true,
            show_hud: true,
        }
    }
}

/// Letter used for an enemy type.
#[must_use]
pub const fn enemy_glyph(kind: EnemyType) -> char {
    match kind {
        EnemyType::Regular => 'r',
        EnemyType::Fast => 'f',
        EnemyType::Armored => 'a',
        EnemyType::Power => 'p',
        EnemyType::Heavy => 'h',
        EnemyType::Boss => 'X',
    }
}

fn plot(grid: &mut [Vec<char>], pos: Vec2Fixed, glyph: char) {
    if let Some(cell) = TileMap::cell_at(pos) {
        grid[cell.row as usize][cell.col as usize] = glyph;
    }
}

/// Render the terrain plus everything in `snapshot` on top of it.
///
/// Later layers win: terrain, power-ups, bullets, tanks, then the UFO.
#[must_use]
pub fn render_ascii(map: &TileMap, snapshot: &Snapshot, config: &AsciiConfig) -> String {
    let mut grid: Vec<Vec<char>> = map
        .tiles()
        .chunks(MAP_COLS)
        .map(|row| row.iter().map(|t| t.symbol()).collect())
        .collect();
    debug_assert_eq!(grid.len(), MAP_ROWS);

    plot(
        &mut grid,
        snapshot.base.position,
        if snapshot.base.destroyed { 'x' } else { 'E' },
    );
    if let Some(egg) = snapshot.easter_egg {
        plot(&mut grid, egg, 'o');
    }
    for power_up in &snapshot.power_ups {
        plot(&mut grid, power_up.position, if power_up.blinking { '?' } else { '+' });
    }
    for bullet in &snapshot.bullets {
        plot(&mut grid, bullet.position, '*');
    }
    for tank in snapshot.tanks.iter().filter(|t| t.visible) {
        let glyph = match tank.kind {
            TankKind::Player(_) => 'P',
            TankKind::Enemy(kind) => enemy_glyph(kind),
        };
        plot(&mut grid, tank.position, glyph);
    }
    if let Some(ufo) = &snapshot.ufo {
        plot(&mut grid, ufo.position, 'U');
    }

    let mut out = String::new();
    if config.show_hud {
        let hud = snapshot.hud;
        let _ = writeln!(
            out,
            "level {}  lives {}  enemies {}  score {}",
            hud.level, hud.lives, hud.remaining_enemies, hud.score
        );
    }
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    if config.show_legend {
        out.push_str(
            ". empty  B brick  S steel  W water  F forest  I ice  E base\n\
             P player  r/f/a/p/h/X enemies  * bullet  + power-up  U ufo  o egg\n",
        );
    }
    out
}
