//! Procedural level generation.
//!
//! Turns a 64-bit seed into a tile grid:
//! - Steel border and a handful of brick/steel main structures
//! - An optional mirrored pattern for a symmetric look
//! - Corridors, water, trees, ice and scattered blocks
//! - Cleared spawn areas and a density repair pass
//! - The brick footprint around the base
//!
//! Every write goes through [`Canvas::paint`], which refuses the border and
//! the reserved base cells.

use serde::{Deserialize, Serialize};

use crate::rng::SeededRandom;
use crate::tile_map::{
    in_spawn_area, interior_empty_fraction, Cell, CellRect, TileType, ENEMY_SPAWN_RECTS,
    MAP_COLS, MAP_ROWS, PLAYER_SPAWN_RECT, PROTECTION_CELLS,
};

/// Upper bound on the interior empty fraction after generation.
pub const MAX_EMPTY_FRACTION: f64 = 0.5;

/// Extra content passes allowed before falling back to single-brick fill.
pub const MAX_REPAIR_ATTEMPTS: u32 = 50;

/// What the generator did, for logs and the headless tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Main structures placed.
    pub structures: u32,
    /// Whether a mirrored pattern was added.
    pub symmetric_pattern: bool,
    /// Content passes run by density repair.
    pub repair_passes: u32,
    /// Single bricks placed by the fallback fill.
    pub fallback_fills: u32,
    /// Interior empty fraction of the final grid.
    pub empty_fraction: f64,
}

/// Wall shapes used for main structures and repair passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    HollowRect,
    Cross,
    Diamond,
    L,
    T,
    U,
    Zigzag,
    Spiral,
}

impl Shape {
    const ALL: [Self; 8] = [
        Self::HollowRect,
        Self::Cross,
        Self::Diamond,
        Self::L,
        Self::T,
        Self::U,
        Self::Zigzag,
        Self::Spiral,
    ];
}

/// Guarded write access to the grid under construction.
struct Canvas {
    tiles: Vec<TileType>,
}

impl Canvas {
    fn new() -> Self {
        let mut tiles = vec![TileType::Empty; MAP_ROWS * MAP_COLS];
        for row in 0..MAP_ROWS {
            for col in 0..MAP_COLS {
                if Cell::new(row as i32, col as i32).is_border() {
                    tiles[row * MAP_COLS + col] = TileType::Steel;
                }
            }
        }
        Self { tiles }
    }

    fn writable(cell: Cell) -> bool {
        cell.in_bounds() && !cell.is_border() && !cell.is_reserved()
    }

    fn get(&self, cell: Cell) -> TileType {
        if cell.in_bounds() {
            self.tiles[cell.row as usize * MAP_COLS + cell.col as usize]
        } else {
            TileType::Empty
        }
    }

    fn paint(&mut self, cell: Cell, tile: TileType) {
        if Self::writable(cell) {
            self.tiles[cell.row as usize * MAP_COLS + cell.col as usize] = tile;
        }
    }

    fn paint_all(&mut self, cells: &[Cell], tile: TileType) {
        for cell in cells {
            self.paint(*cell, tile);
        }
    }

    fn paint_mirrored(&mut self, cell: Cell, tile: TileType) {
        self.paint(cell, tile);
        self.paint(cell.mirrored(), tile);
    }

    fn clear_spawn_areas(&mut self) {
        for rect in ENEMY_SPAWN_RECTS.iter().chain(std::iter::once(&PLAYER_SPAWN_RECT)) {
            for cell in rect.cells() {
                self.paint(cell, TileType::Empty);
            }
        }
    }

    fn empty_fraction(&self) -> f64 {
        interior_empty_fraction(&self.tiles)
    }
}

/// Generate the tiles for `seed`.
#[must_use]
pub fn generate_tiles(seed: u64) -> (Vec<TileType>, GenerationStats) {
    let mut rng = SeededRandom::new(seed);
    let mut canvas = Canvas::new();

    let structures = rng.range_inclusive(2, 4) as u32;
    for _ in 0..structures {
        let material = wall_material(&mut rng, 0.75);
        place_shape(&mut canvas, &mut rng, material);
    }

    let symmetric_pattern = rng.chance(0.7);
    if symmetric_pattern {
        place_symmetric_pattern(&mut canvas, &mut rng);
    }

    for _ in 0..rng.range_inclusive(1, 3) {
        place_corridor(&mut canvas, &mut rng);
    }
    for _ in 0..rng.range_inclusive(1, 3) {
        place_water(&mut canvas, &mut rng);
    }
    for _ in 0..rng.range_inclusive(1, 3) {
        place_trees(&mut canvas, &mut rng);
    }
    for _ in 0..rng.range_inclusive(1, 2) {
        place_ice(&mut canvas, &mut rng);
    }
    let scatter = rng.range_inclusive(5, 13);
    place_scatter(&mut canvas, &mut rng, scatter);

    canvas.clear_spawn_areas();

    let repair_passes = repair_density(&mut canvas, &mut rng);
    let fallback_fills = if canvas.empty_fraction() > MAX_EMPTY_FRACTION {
        let filled = fallback_fill(&mut canvas, &mut rng);
        tracing::warn!(seed, filled, "Density repair exhausted; filled single bricks");
        filled
    } else {
        0
    };

    for cell in PROTECTION_CELLS {
        canvas.tiles[cell.row as usize * MAP_COLS + cell.col as usize] = TileType::Brick;
    }

    let stats = GenerationStats {
        structures,
        symmetric_pattern,
        repair_passes,
        fallback_fills,
        empty_fraction: canvas.empty_fraction(),
    };
    (canvas.tiles, stats)
}

fn wall_material(rng: &mut SeededRandom, brick_chance: f64) -> TileType {
    if rng.chance(brick_chance) {
        TileType::Brick
    } else {
        TileType::Steel
    }
}

/// Random interior anchor leaving room for a shape of up to `extent` cells.
fn random_anchor(rng: &mut SeededRandom, extent: i32) -> Cell {
    let max_row = MAP_ROWS as i32 - 2 - extent;
    let max_col = MAP_COLS as i32 - 2 - extent;
    Cell::new(rng.range_inclusive(2, max_row.max(2)), rng.range_inclusive(2, max_col.max(2)))
}

fn line(start: Cell, d_row: i32, d_col: i32, len: i32) -> impl Iterator<Item = Cell> {
    (0..len).map(move |i| Cell::new(start.row + d_row * i, start.col + d_col * i))
}

fn shape_cells(shape: Shape, rng: &mut SeededRandom) -> Vec<Cell> {
    let mut cells = Vec::new();
    match shape {
        Shape::HollowRect => {
            let w = rng.range_inclusive(3, 6);
            let h = rng.range_inclusive(3, 5);
            let a = random_anchor(rng, w.max(h));
            for c in 0..w {
                cells.push(Cell::new(a.row, a.col + c));
                cells.push(Cell::new(a.row + h - 1, a.col + c));
            }
            for r in 1..h - 1 {
                cells.push(Cell::new(a.row + r, a.col));
                cells.push(Cell::new(a.row + r, a.col + w - 1));
            }
            // Exactly one way in.
            let opening = rng.next_int(cells.len() as u32) as usize;
            cells.remove(opening);
        }
        Shape::Cross => {
            let arm = rng.range_inclusive(1, 3);
            let a = random_anchor(rng, arm * 2 + 1);
            let center = Cell::new(a.row + arm, a.col + arm);
            cells.push(center);
            for i in 1..=arm {
                cells.push(Cell::new(center.row - i, center.col));
                cells.push(Cell::new(center.row + i, center.col));
                cells.push(Cell::new(center.row, center.col - i));
                cells.push(Cell::new(center.row, center.col + i));
            }
        }
        Shape::Diamond => {
            let radius = rng.range_inclusive(2, 3);
            let a = random_anchor(rng, radius * 2 + 1);
            let center = Cell::new(a.row + radius, a.col + radius);
            for dr in -radius..=radius {
                let dc = radius - dr.abs();
                cells.push(Cell::new(center.row + dr, center.col - dc));
                if dc != 0 {
                    cells.push(Cell::new(center.row + dr, center.col + dc));
                }
            }
        }
        Shape::L => {
            let down = rng.range_inclusive(3, 5);
            let across = rng.range_inclusive(3, 5);
            let a = random_anchor(rng, down.max(across));
            cells.extend(line(a, 1, 0, down));
            cells.extend(line(Cell::new(a.row + down - 1, a.col + 1), 0, 1, across - 1));
        }
        Shape::T => {
            let half = rng.range_inclusive(1, 3);
            let stem = rng.range_inclusive(2, 4);
            let a = random_anchor(rng, (half * 2 + 1).max(stem + 1));
            cells.extend(line(a, 0, 1, half * 2 + 1));
            cells.extend(line(Cell::new(a.row + 1, a.col + half), 1, 0, stem));
        }
        Shape::U => {
            let h = rng.range_inclusive(3, 4);
            let w = rng.range_inclusive(3, 5);
            let a = random_anchor(rng, h.max(w));
            cells.extend(line(a, 1, 0, h));
            cells.extend(line(Cell::new(a.row, a.col + w - 1), 1, 0, h));
            cells.extend(line(Cell::new(a.row + h - 1, a.col + 1), 0, 1, w - 2));
        }
        Shape::Zigzag => {
            let segments = rng.range_inclusive(3, 5);
            let seg_len = rng.range_inclusive(2, 3);
            let a = random_anchor(rng, segments * seg_len / 2 + seg_len);
            let mut cursor = a;
            for seg in 0..segments {
                let (dr, dc) = if seg % 2 == 0 { (0, 1) } else { (1, 0) };
                for _ in 0..seg_len {
                    cells.push(cursor);
                    cursor = Cell::new(cursor.row + dr, cursor.col + dc);
                }
            }
            cells.push(cursor);
        }
        Shape::Spiral => {
            let turns = rng.range_inclusive(4, 6);
            let a = random_anchor(rng, 7);
            let mut cursor = Cell::new(a.row + 3, a.col + 3);
            let headings = [(0, 1), (1, 0), (0, -1), (-1, 0)];
            for turn in 0..turns {
                let (dr, dc) = headings[turn as usize % 4];
                let len = 2 * (turn / 2 + 1);
                for _ in 0..len {
                    cells.push(cursor);
                    cursor = Cell::new(cursor.row + dr, cursor.col + dc);
                }
            }
        }
    }
    cells
}

fn place_shape(canvas: &mut Canvas, rng: &mut SeededRandom, material: TileType) {
    let Some(shape) = rng.pick(&Shape::ALL).copied() else {
        return;
    };
    let cells = shape_cells(shape, rng);
    canvas.paint_all(&cells, material);
}

/// Left-half maze motif; `#` cells become brick.
const MAZE_MOTIF: [&str; 5] = ["#####", "#...#", "#.#.#", "..#..", "###.#"];

fn place_symmetric_pattern(canvas: &mut Canvas, rng: &mut SeededRandom) {
    let half = MAP_COLS as i32 / 2;
    match rng.next_int(3) {
        0 => {
            // Mirrored walls.
            for _ in 0..rng.range_inclusive(2, 3) {
                let len = rng.range_inclusive(3, 5);
                let vertical = rng.next_bool();
                let start = Cell::new(
                    rng.range_inclusive(3, MAP_ROWS as i32 - 9),
                    rng.range_inclusive(2, half - 2 - if vertical { 0 } else { len }),
                );
                let (dr, dc) = if vertical { (1, 0) } else { (0, 1) };
                for cell in line(start, dr, dc, len) {
                    canvas.paint_mirrored(cell, TileType::Brick);
                }
            }
        }
        1 => {
            // Pillars on a 4-cell lattice.
            let material = wall_material(rng, 0.8);
            let row0 = rng.range_inclusive(4, 6);
            let col0 = rng.range_inclusive(3, 5);
            for row in (row0..MAP_ROWS as i32 - 6).step_by(4) {
                for col in (col0..half - 1).step_by(4) {
                    canvas.paint_mirrored(Cell::new(row, col), material);
                }
            }
        }
        _ => {
            let top = rng.range_inclusive(5, MAP_ROWS as i32 - 12);
            let left = rng.range_inclusive(2, half - 1 - MAZE_MOTIF[0].len() as i32);
            for (dr, row) in MAZE_MOTIF.iter().enumerate() {
                for (dc, symbol) in row.chars().enumerate() {
                    if symbol == '#' {
                        let cell = Cell::new(top + dr as i32, left + dc as i32);
                        canvas.paint_mirrored(cell, TileType::Brick);
                    }
                }
            }
        }
    }
}

fn place_corridor(canvas: &mut Canvas, rng: &mut SeededRandom) {
    let len = rng.range_inclusive(4, 10);
    let material = wall_material(rng, 0.8);
    let vertical = rng.next_bool();
    let start = random_anchor(rng, if vertical { len } else { 1 });
    let start = if vertical {
        start
    } else {
        Cell::new(start.row, rng.range_inclusive(1, (MAP_COLS as i32 - 1 - len).max(1)))
    };
    let (dr, dc) = if vertical { (1, 0) } else { (0, 1) };
    let gap = rng.chance(0.3).then(|| rng.range_inclusive(1, len - 2));
    for (i, cell) in line(start, dr, dc, len).enumerate() {
        if gap != Some(i as i32) {
            canvas.paint(cell, material);
        }
    }
}

fn place_water(canvas: &mut Canvas, rng: &mut SeededRandom) {
    match rng.next_int(3) {
        0 => {
            let w = rng.range_inclusive(2, 4);
            let h = rng.range_inclusive(2, 3);
            let a = random_anchor(rng, w.max(h));
            for cell in CellRect::new(a.row, a.col, h, w).cells() {
                canvas.paint(cell, TileType::Water);
            }
        }
        1 => {
            // River: a walk along one axis that drifts sideways.
            let len = rng.range_inclusive(6, 14);
            let vertical = rng.next_bool();
            let mut cursor = random_anchor(rng, 2);
            for _ in 0..len {
                canvas.paint(cursor, TileType::Water);
                let drift = match (rng.chance(0.3), rng.next_bool()) {
                    (true, true) => 1,
                    (true, false) => -1,
                    (false, _) => 0,
                };
                cursor = if vertical {
                    Cell::new(cursor.row + 1, (cursor.col + drift).clamp(1, MAP_COLS as i32 - 2))
                } else {
                    Cell::new((cursor.row + drift).clamp(1, MAP_ROWS as i32 - 2), cursor.col + 1)
                };
            }
        }
        _ => {
            let radius = rng.range_inclusive(2, 3);
            let a = random_anchor(rng, radius * 2 + 1);
            let center = Cell::new(a.row + radius, a.col + radius);
            for dr in -radius..=radius {
                for dc in -radius..=radius {
                    if dr * dr + dc * dc <= radius * radius {
                        canvas.paint(Cell::new(center.row + dr, center.col + dc), TileType::Water);
                    }
                }
            }
        }
    }
}

fn place_trees(canvas: &mut Canvas, rng: &mut SeededRandom) {
    match rng.next_int(3) {
        0 => {
            let radius = rng.range_inclusive(1, 2);
            let a = random_anchor(rng, radius * 2 + 1);
            for cell in CellRect::new(a.row, a.col, radius * 2 + 1, radius * 2 + 1).cells() {
                if rng.chance(0.7) {
                    canvas.paint(cell, TileType::Forest);
                }
            }
        }
        1 => {
            let len = rng.range_inclusive(3, 7);
            let vertical = rng.next_bool();
            let a = random_anchor(rng, len);
            let (dr, dc) = if vertical { (1, 0) } else { (0, 1) };
            for cell in line(a, dr, dc, len) {
                canvas.paint(cell, TileType::Forest);
            }
        }
        _ => {
            let w = rng.range_inclusive(3, 5);
            let h = rng.range_inclusive(3, 4);
            let a = random_anchor(rng, w.max(h));
            for cell in CellRect::new(a.row, a.col, h, w).cells() {
                if rng.chance(0.8) {
                    canvas.paint(cell, TileType::Forest);
                }
            }
        }
    }
}

fn place_ice(canvas: &mut Canvas, rng: &mut SeededRandom) {
    if rng.next_bool() {
        let w = rng.range_inclusive(3, 5);
        let h = rng.range_inclusive(2, 4);
        let a = random_anchor(rng, w.max(h));
        for cell in CellRect::new(a.row, a.col, h, w).cells() {
            canvas.paint(cell, TileType::Ice);
        }
    } else {
        let len = rng.range_inclusive(4, 8);
        let width = rng.range_inclusive(1, 2);
        let vertical = rng.next_bool();
        let a = random_anchor(rng, len);
        let rect = if vertical {
            CellRect::new(a.row, a.col, len, width)
        } else {
            CellRect::new(a.row, a.col, width, len)
        };
        for cell in rect.cells() {
            canvas.paint(cell, TileType::Ice);
        }
    }
}

const SCATTER_MATERIALS: [TileType; 4] =
    [TileType::Brick, TileType::Steel, TileType::Forest, TileType::Water];
const SCATTER_WEIGHTS: [f64; 4] = [0.5, 0.2, 0.15, 0.15];

fn place_scatter(canvas: &mut Canvas, rng: &mut SeededRandom, count: i32) {
    for _ in 0..count {
        let material = SCATTER_MATERIALS[rng.weighted_index(&SCATTER_WEIGHTS)];
        let a = random_anchor(rng, 2);
        if rng.chance(0.3) {
            for cell in CellRect::new(a.row, a.col, 2, 2).cells() {
                canvas.paint(cell, material);
            }
        } else {
            canvas.paint(a, material);
        }
    }
}

/// Add content until the empty bound holds or the attempt budget runs out.
fn repair_density(canvas: &mut Canvas, rng: &mut SeededRandom) -> u32 {
    let mut passes = 0;
    while canvas.empty_fraction() > MAX_EMPTY_FRACTION && passes < MAX_REPAIR_ATTEMPTS {
        match rng.next_int(4) {
            0 => {
                let material = wall_material(rng, 0.75);
                place_shape(canvas, rng, material);
            }
            1 => place_corridor(canvas, rng),
            2 => {
                let count = rng.range_inclusive(3, 6);
                place_scatter(canvas, rng, count);
            }
            _ => place_trees(canvas, rng),
        }
        canvas.clear_spawn_areas();
        passes += 1;
    }
    passes
}

/// Brick random empty non-spawn cells until the bound holds.
fn fallback_fill(canvas: &mut Canvas, rng: &mut SeededRandom) -> u32 {
    let mut candidates: Vec<Cell> = (1..MAP_ROWS as i32 - 1)
        .flat_map(|r| (1..MAP_COLS as i32 - 1).map(move |c| Cell::new(r, c)))
        .filter(|cell| {
            Canvas::writable(*cell) && !in_spawn_area(*cell) && canvas.get(*cell) == TileType::Empty
        })
        .collect();
    rng.shuffle(&mut candidates);
    let mut filled = 0;
    for cell in candidates {
        if canvas.empty_fraction() <= MAX_EMPTY_FRACTION {
            break;
        }
        canvas.paint(cell, TileType::Brick);
        filled += 1;
    }
    filled
}
