//! Tile grid, terrain queries and tile mutation.
//!
//! The grid is row-major with row 0 at the top of the screen. World space has
//! its origin at the bottom-left corner with +Y up, so a world position maps
//! to `row = MAP_ROWS - 1 - floor(y / TILE_SIZE)` and `col = floor(x / TILE_SIZE)`.
//!
//! Every non-empty cell owns one [`VisualHandle`] for the presentation layer.
//! Emptying a cell releases its handle; released handles and tile deltas are
//! queued until drained.

use serde::{Deserialize, Serialize};

use crate::components::Direction;
use crate::error::{GameError, Result};
use crate::map_generation::{generate_tiles, GenerationStats};
use crate::math::{fx, Fixed, Vec2Fixed};
use crate::rng::{level_seed, SeededRandom};

/// Columns in the grid.
pub const MAP_COLS: usize = 26;
/// Rows in the grid.
pub const MAP_ROWS: usize = 26;
/// Edge length of one tile in world units.
pub const TILE_SIZE: Fixed = fx(16);
/// Half a tile; tanks snap to this grid when turning.
pub const HALF_TILE: Fixed = fx(8);

/// The base's own cell (kept empty; the base entity sits on it).
pub const BASE_CELL: Cell = Cell::new(24, 13);

/// The five reserved cells forming the U around the base.
pub const PROTECTION_CELLS: [Cell; 5] = [
    Cell::new(23, 12),
    Cell::new(23, 13),
    Cell::new(23, 14),
    Cell::new(24, 12),
    Cell::new(24, 14),
];

/// Enemy spawn areas: top-left, top-center (boss-sized), top-right.
pub const ENEMY_SPAWN_RECTS: [CellRect; 3] = [
    CellRect::new(1, 1, 2, 2),
    CellRect::new(1, 12, 3, 3),
    CellRect::new(1, 23, 2, 2),
];

/// Player spawn area, left of the base.
pub const PLAYER_SPAWN_RECT: CellRect = CellRect::new(23, 8, 2, 2);

/// Terrain types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TileType {
    /// Open ground.
    #[default]
    Empty,
    /// Destructible wall.
    Brick,
    /// Wall that only power-2 shells break.
    Steel,
    /// Blocks tanks without a ship; bullets pass.
    Water,
    /// Hides tanks; bullets pass; a saw cuts it.
    Forest,
    /// Slippery ground.
    Ice,
}

impl TileType {
    /// Whether a tank may occupy this tile.
    #[must_use]
    pub const fn blocks_tank(self, can_swim: bool) -> bool {
        match self {
            Self::Brick | Self::Steel => true,
            Self::Water => !can_swim,
            Self::Empty | Self::Forest | Self::Ice => false,
        }
    }

    /// One-character map notation.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Brick => 'B',
            Self::Steel => 'S',
            Self::Water => 'W',
            Self::Forest => 'F',
            Self::Ice => 'I',
        }
    }

    /// Parse the one-character notation.
    #[must_use]
    pub const fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Self::Empty),
            'B' => Some(Self::Brick),
            'S' => Some(Self::Steel),
            'W' => Some(Self::Water),
            'F' => Some(Self::Forest),
            'I' => Some(Self::Ice),
            _ => None,
        }
    }
}

/// Grid coordinate (signed so neighbour arithmetic can step off the map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    /// Row, 0 at the top.
    pub row: i32,
    /// Column, 0 at the left.
    pub col: i32,
}

impl Cell {
    /// Create a cell coordinate.
    #[must_use]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Whether the coordinate lies on the grid.
    #[must_use]
    pub const fn in_bounds(self) -> bool {
        self.row >= 0 && self.col >= 0 && self.row < MAP_ROWS as i32 && self.col < MAP_COLS as i32
    }

    /// Whether the coordinate is on the outer ring.
    #[must_use]
    pub const fn is_border(self) -> bool {
        self.row == 0
            || self.col == 0
            || self.row == MAP_ROWS as i32 - 1
            || self.col == MAP_COLS as i32 - 1
    }

    /// Whether generation must leave this cell alone (protection + base cell).
    #[must_use]
    pub fn is_reserved(self) -> bool {
        self == BASE_CELL || PROTECTION_CELLS.contains(&self)
    }

    /// Mirror across the vertical center line.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        Self::new(self.row, MAP_COLS as i32 - 1 - self.col)
    }

    /// World-space center of the cell.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        let x = Fixed::from_num(self.col) * TILE_SIZE + HALF_TILE;
        let y = Fixed::from_num(MAP_ROWS as i32 - 1 - self.row) * TILE_SIZE + HALF_TILE;
        Vec2Fixed::new(x, y)
    }

    fn index(self) -> usize {
        self.row as usize * MAP_COLS + self.col as usize
    }
}

/// Rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRect {
    /// Top row.
    pub row: i32,
    /// Left column.
    pub col: i32,
    /// Height in rows.
    pub rows: i32,
    /// Width in columns.
    pub cols: i32,
}

impl CellRect {
    /// Create a rectangle.
    #[must_use]
    pub const fn new(row: i32, col: i32, rows: i32, cols: i32) -> Self {
        Self {
            row,
            col,
            rows,
            cols,
        }
    }

    /// Whether the rectangle contains a cell.
    #[must_use]
    pub const fn contains(self, cell: Cell) -> bool {
        cell.row >= self.row
            && cell.row < self.row + self.rows
            && cell.col >= self.col
            && cell.col < self.col + self.cols
    }

    /// All cells, row-major.
    pub fn cells(self) -> impl Iterator<Item = Cell> {
        (self.row..self.row + self.rows)
            .flat_map(move |r| (self.col..self.col + self.cols).map(move |c| Cell::new(r, c)))
    }

    /// World-space center of the rectangle.
    #[must_use]
    pub fn center(self) -> Vec2Fixed {
        let top_left = Cell::new(self.row, self.col).center();
        let bottom_right = Cell::new(self.row + self.rows - 1, self.col + self.cols - 1).center();
        Vec2Fixed::new(
            (top_left.x + bottom_right.x) / fx(2),
            (top_left.y + bottom_right.y) / fx(2),
        )
    }
}

/// Whether a cell belongs to any spawn area.
#[must_use]
pub fn in_spawn_area(cell: Cell) -> bool {
    PLAYER_SPAWN_RECT.contains(cell) || ENEMY_SPAWN_RECTS.iter().any(|r| r.contains(cell))
}

/// World width in units.
#[must_use]
pub fn world_width() -> Fixed {
    Fixed::from_num(MAP_COLS) * TILE_SIZE
}

/// World height in units.
#[must_use]
pub fn world_height() -> Fixed {
    Fixed::from_num(MAP_ROWS) * TILE_SIZE
}

/// World position of the base.
#[must_use]
pub fn base_position() -> Vec2Fixed {
    BASE_CELL.center()
}

/// Opaque handle to the visual node representing a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VisualHandle(pub u32);

/// A single tile change, for presentation diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDelta {
    /// Changed cell.
    pub cell: Cell,
    /// New tile type.
    pub tile: TileType,
}

/// Outcome of a bullet meeting the terrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletImpact {
    /// The bullet stops here.
    pub hit: bool,
    /// The tile was destroyed.
    pub destroyed: bool,
}

impl BulletImpact {
    /// Bullet passes.
    pub const MISS: Self = Self {
        hit: false,
        destroyed: false,
    };
    /// Bullet stops, tile survives.
    pub const BLOCKED: Self = Self {
        hit: true,
        destroyed: false,
    };
    /// Bullet stops and destroys the tile.
    pub const DESTROYED: Self = Self {
        hit: true,
        destroyed: true,
    };
}

/// The level's terrain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileMap {
    tiles: Vec<TileType>,
    visuals: Vec<Option<VisualHandle>>,
    next_visual: u32,
    #[serde(skip)]
    deltas: Vec<TileDelta>,
    #[serde(skip)]
    released: Vec<VisualHandle>,
    seed: Option<u64>,
    stats: Option<GenerationStats>,
}

impl TileMap {
    /// Run the procedural generator for `seed`.
    #[must_use]
    pub fn generate(seed: u64) -> Self {
        let (tiles, stats) = generate_tiles(seed);
        tracing::debug!(
            seed,
            empty_fraction = stats.empty_fraction,
            repair_passes = stats.repair_passes,
            "Generated tile map"
        );
        let mut map = Self::from_tiles_unchecked(tiles);
        map.seed = Some(seed);
        map.stats = Some(stats);
        map
    }

    /// Generate the map for `level` of the session rooted at `session_seed`.
    pub fn for_level(session_seed: u64, level: u32) -> Result<Self> {
        if level == 0 {
            return Err(GameError::InvalidLevel(level));
        }
        Ok(Self::generate(level_seed(session_seed, level)))
    }

    /// A map with only the steel border and the brick base footprint.
    #[must_use]
    pub fn bordered() -> Self {
        let mut tiles = vec![TileType::Empty; MAP_ROWS * MAP_COLS];
        for row in 0..MAP_ROWS as i32 {
            for col in 0..MAP_COLS as i32 {
                let cell = Cell::new(row, col);
                if cell.is_border() {
                    tiles[cell.index()] = TileType::Steel;
                }
            }
        }
        for cell in PROTECTION_CELLS {
            tiles[cell.index()] = TileType::Brick;
        }
        Self::from_tiles_unchecked(tiles)
    }

    /// Build a map from rows of tile symbols (`.BSWFI`).
    ///
    /// The grid must be exactly `MAP_ROWS` x `MAP_COLS`, with a steel border,
    /// protection cells limited to brick/steel/empty and an empty base cell.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        if rows.is_empty() {
            return Err(GameError::InvalidMap("map has no rows".to_string()));
        }
        if rows.len() != MAP_ROWS {
            return Err(GameError::InvalidMap(format!(
                "expected {MAP_ROWS} rows, got {}",
                rows.len()
            )));
        }
        let mut tiles = Vec::with_capacity(MAP_ROWS * MAP_COLS);
        for (r, line) in rows.iter().enumerate() {
            let line = line.as_ref();
            let count = line.chars().count();
            if count != MAP_COLS {
                return Err(GameError::InvalidMap(format!(
                    "row {r} has {count} columns, expected {MAP_COLS}"
                )));
            }
            for (c, symbol) in line.chars().enumerate() {
                let tile = TileType::from_symbol(symbol).ok_or_else(|| {
                    GameError::InvalidMap(format!("unknown tile '{symbol}' at ({r}, {c})"))
                })?;
                tiles.push(tile);
            }
        }
        let map = Self::from_tiles_unchecked(tiles);
        map.validate()?;
        Ok(map)
    }

    fn from_tiles_unchecked(tiles: Vec<TileType>) -> Self {
        let mut next_visual = 0;
        let visuals = tiles
            .iter()
            .map(|tile| {
                (*tile != TileType::Empty).then(|| {
                    next_visual += 1;
                    VisualHandle(next_visual)
                })
            })
            .collect();
        Self {
            tiles,
            visuals,
            next_visual,
            deltas: Vec::new(),
            released: Vec::new(),
            seed: None,
            stats: None,
        }
    }

    /// Check the structural invariants of the grid.
    pub fn validate(&self) -> Result<()> {
        for row in 0..MAP_ROWS as i32 {
            for col in 0..MAP_COLS as i32 {
                let cell = Cell::new(row, col);
                if cell.is_border() && self.tiles[cell.index()] != TileType::Steel {
                    return Err(GameError::InvalidMap(format!(
                        "border cell ({row}, {col}) is not steel"
                    )));
                }
            }
        }
        for cell in PROTECTION_CELLS {
            let tile = self.tiles[cell.index()];
            if !matches!(tile, TileType::Brick | TileType::Steel | TileType::Empty) {
                return Err(GameError::InvalidMap(format!(
                    "protection cell ({}, {}) holds {tile:?}",
                    cell.row, cell.col
                )));
            }
        }
        if self.tiles[BASE_CELL.index()] != TileType::Empty {
            return Err(GameError::InvalidMap("base cell must be empty".to_string()));
        }
        Ok(())
    }

    /// Seed the map was generated from, if any.
    #[must_use]
    pub const fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Generator statistics, if the map was generated.
    #[must_use]
    pub const fn generation_stats(&self) -> Option<&GenerationStats> {
        self.stats.as_ref()
    }

    /// Raw row-major tiles.
    #[must_use]
    pub fn tiles(&self) -> &[TileType] {
        &self.tiles
    }

    /// Tile at a grid coordinate; `Empty` when out of bounds.
    #[must_use]
    pub fn get_tile(&self, cell: Cell) -> TileType {
        if cell.in_bounds() {
            self.tiles[cell.index()]
        } else {
            TileType::Empty
        }
    }

    /// Visual handle of a cell, if it has one.
    #[must_use]
    pub fn visual(&self, cell: Cell) -> Option<VisualHandle> {
        if cell.in_bounds() {
            self.visuals[cell.index()]
        } else {
            None
        }
    }

    /// Grid cell containing a world position, `None` off the map.
    #[must_use]
    pub fn cell_at(pos: Vec2Fixed) -> Option<Cell> {
        if pos.x < Fixed::ZERO || pos.y < Fixed::ZERO {
            return None;
        }
        let col = (pos.x / TILE_SIZE).to_num::<i32>();
        let y_tile = (pos.y / TILE_SIZE).to_num::<i32>();
        let cell = Cell::new(MAP_ROWS as i32 - 1 - y_tile, col);
        cell.in_bounds().then_some(cell)
    }

    /// Tile at a world position; `Empty` off the map.
    #[must_use]
    pub fn tile_at(&self, pos: Vec2Fixed) -> TileType {
        Self::cell_at(pos).map_or(TileType::Empty, |cell| self.get_tile(cell))
    }

    /// Whether the tile under a world position is ice.
    #[must_use]
    pub fn is_ice_tile(&self, pos: Vec2Fixed) -> bool {
        self.tile_at(pos) == TileType::Ice
    }

    /// Cells overlapped by a centered square box.
    fn cells_under_box(pos: Vec2Fixed, size: Fixed) -> impl Iterator<Item = Cell> {
        let half = size / fx(2);
        let min_x = pos.x - half;
        let min_y = pos.y - half;
        let max_x = pos.x + half - Fixed::DELTA;
        let max_y = pos.y + half - Fixed::DELTA;
        let col0 = (min_x / TILE_SIZE).floor().to_num::<i32>();
        let col1 = (max_x / TILE_SIZE).floor().to_num::<i32>();
        let y0 = (min_y / TILE_SIZE).floor().to_num::<i32>();
        let y1 = (max_y / TILE_SIZE).floor().to_num::<i32>();
        (y0..=y1).flat_map(move |y| {
            (col0..=col1).map(move |col| Cell::new(MAP_ROWS as i32 - 1 - y, col))
        })
    }

    /// True if a tank-sized box at `pos` leaves the map or overlaps
    /// brick, steel, or (without `can_swim`) water.
    #[must_use]
    pub fn check_tank_collision(&self, pos: Vec2Fixed, size: Fixed, can_swim: bool) -> bool {
        let half = size / fx(2);
        if pos.x - half < Fixed::ZERO
            || pos.y - half < Fixed::ZERO
            || pos.x + half > world_width()
            || pos.y + half > world_height()
        {
            return true;
        }
        Self::cells_under_box(pos, size).any(|cell| self.get_tile(cell).blocks_tank(can_swim))
    }

    /// Resolve a bullet against the single tile at `pos`.
    ///
    /// Brick is always destroyed. Steel is destroyed only by power 2+ and
    /// otherwise stops the bullet. Water, forest, ice and empty let it pass.
    pub fn check_bullet_collision(&mut self, pos: Vec2Fixed, power: u8) -> BulletImpact {
        let Some(cell) = Self::cell_at(pos) else {
            return BulletImpact::MISS;
        };
        match self.get_tile(cell) {
            TileType::Brick => {
                self.set_tile(cell, TileType::Empty);
                BulletImpact::DESTROYED
            }
            TileType::Steel if power >= 2 && !cell.is_border() => {
                self.set_tile(cell, TileType::Empty);
                BulletImpact::DESTROYED
            }
            TileType::Steel => BulletImpact::BLOCKED,
            TileType::Water | TileType::Forest | TileType::Ice | TileType::Empty => {
                BulletImpact::MISS
            }
        }
    }

    /// Turn the forest tile at `pos` into open ground.
    pub fn destroy_forest(&mut self, pos: Vec2Fixed) -> bool {
        match Self::cell_at(pos) {
            Some(cell) if self.get_tile(cell) == TileType::Forest => {
                self.set_tile(cell, TileType::Empty);
                true
            }
            _ => false,
        }
    }

    /// Cut every forest tile under a box. Returns the number cut.
    pub fn destroy_forest_in_box(&mut self, pos: Vec2Fixed, size: Fixed) -> usize {
        let cells: Vec<Cell> = Self::cells_under_box(pos, size)
            .filter(|c| self.get_tile(*c) == TileType::Forest)
            .collect();
        for cell in &cells {
            self.set_tile(*cell, TileType::Empty);
        }
        cells.len()
    }

    /// Overwrite a cell, maintaining visual handles and the delta queue.
    ///
    /// Border cells are never modified.
    pub fn set_tile(&mut self, cell: Cell, tile: TileType) {
        if !cell.in_bounds() || cell.is_border() {
            return;
        }
        let idx = cell.index();
        if self.tiles[idx] == tile {
            return;
        }
        if let Some(handle) = self.visuals[idx].take() {
            self.released.push(handle);
        }
        if tile != TileType::Empty {
            self.next_visual += 1;
            self.visuals[idx] = Some(VisualHandle(self.next_visual));
        }
        self.tiles[idx] = tile;
        self.deltas.push(TileDelta { cell, tile });
    }

    /// Fortify the base: all five protection cells become steel (or brick).
    pub fn set_base_protection(&mut self, steel: bool) {
        let tile = if steel { TileType::Steel } else { TileType::Brick };
        for cell in PROTECTION_CELLS {
            self.set_tile(cell, tile);
        }
    }

    /// Strip the base bare: all five protection cells become empty.
    pub fn clear_base_protection(&mut self) {
        for cell in PROTECTION_CELLS {
            self.set_tile(cell, TileType::Empty);
        }
    }

    /// Tiles of the protection footprint, in [`PROTECTION_CELLS`] order.
    #[must_use]
    pub fn protection_tiles(&self) -> [TileType; 5] {
        PROTECTION_CELLS.map(|cell| self.get_tile(cell))
    }

    /// Fraction of interior cells that are empty.
    #[must_use]
    pub fn empty_fraction(&self) -> f64 {
        interior_empty_fraction(&self.tiles)
    }

    /// Center of a random empty, unreserved interior tile.
    ///
    /// Tries a bounded number of random probes, then scans the grid from a
    /// random start so a single empty tile is still found.
    pub fn find_random_empty_tile(&self, rng: &mut SeededRandom) -> Option<Vec2Fixed> {
        let usable = |cell: Cell| {
            !cell.is_border() && !cell.is_reserved() && self.get_tile(cell) == TileType::Empty
        };
        for _ in 0..64 {
            let cell = Cell::new(
                1 + rng.next_int(MAP_ROWS as u32 - 2) as i32,
                1 + rng.next_int(MAP_COLS as u32 - 2) as i32,
            );
            if usable(cell) {
                return Some(cell.center());
            }
        }
        let total = MAP_ROWS * MAP_COLS;
        let start = rng.next_int(total as u32) as usize;
        (0..total)
            .map(|offset| (start + offset) % total)
            .map(|idx| Cell::new((idx / MAP_COLS) as i32, (idx % MAP_COLS) as i32))
            .find(|cell| usable(*cell))
            .map(Cell::center)
    }

    /// Tiles sampled along a ray from `from` in `dir`, nearest first.
    ///
    /// Samples every half tile up to `max_dist`; each distinct cell is
    /// reported once with the distance at which the ray enters it.
    #[must_use]
    pub fn scan_line(&self, from: Vec2Fixed, dir: Direction, max_dist: Fixed) -> Vec<(Fixed, TileType)> {
        let step = dir.unit().scale(HALF_TILE);
        let mut out = Vec::new();
        let mut last: Option<Cell> = Self::cell_at(from);
        let mut probe = from;
        let mut dist = Fixed::ZERO;
        while dist < max_dist {
            probe += step;
            dist += HALF_TILE;
            let Some(cell) = Self::cell_at(probe) else {
                break;
            };
            if last == Some(cell) {
                continue;
            }
            last = Some(cell);
            out.push((dist, self.get_tile(cell)));
        }
        out
    }

    /// Drain tile changes since the last call.
    pub fn take_deltas(&mut self) -> Vec<TileDelta> {
        std::mem::take(&mut self.deltas)
    }

    /// Drain visual handles released since the last call.
    pub fn take_released_handles(&mut self) -> Vec<VisualHandle> {
        std::mem::take(&mut self.released)
    }

    /// Render the grid with one symbol per tile.
    #[must_use]
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity(MAP_ROWS * (MAP_COLS + 1));
        for row in self.tiles.chunks(MAP_COLS) {
            out.extend(row.iter().map(|t| t.symbol()));
            out.push('\n');
        }
        out
    }
}

/// Fraction of non-border cells that are empty.
#[must_use]
pub fn interior_empty_fraction(tiles: &[TileType]) -> f64 {
    let mut empty = 0usize;
    let mut total = 0usize;
    for row in 1..MAP_ROWS - 1 {
        for col in 1..MAP_COLS - 1 {
            total += 1;
            if tiles[row * MAP_COLS + col] == TileType::Empty {
                empty += 1;
            }
        }
    }
    empty as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map() -> TileMap {
        TileMap::bordered()
    }

    #[test]
    fn test_world_to_cell_mirrors_rows() {
        // Bottom-left interior tile is the last interior row.
        let pos = Vec2Fixed::from_ints(20, 20);
        assert_eq!(TileMap::cell_at(pos), Some(Cell::new(24, 1)));
        // Top of the world is row 0.
        let top = Vec2Fixed::from_ints(5, 415);
        assert_eq!(TileMap::cell_at(top), Some(Cell::new(0, 0)));
        assert_eq!(TileMap::cell_at(Vec2Fixed::from_ints(-1, 5)), None);
        assert_eq!(TileMap::cell_at(Vec2Fixed::from_ints(5, 416)), None);
    }

    #[test]
    fn test_cell_center_roundtrip() {
        for cell in [Cell::new(3, 7), BASE_CELL, Cell::new(0, 25)] {
            assert_eq!(TileMap::cell_at(cell.center()), Some(cell));
        }
    }

    #[test]
    fn test_out_of_bounds_reads_empty() {
        let map = open_map();
        assert_eq!(map.get_tile(Cell::new(-1, 3)), TileType::Empty);
        assert_eq!(map.tile_at(Vec2Fixed::from_ints(9999, 9999)), TileType::Empty);
    }

    #[test]
    fn test_bullet_vs_steel_depends_on_power() {
        let mut map = open_map();
        let cell = Cell::new(10, 10);
        map.set_tile(cell, TileType::Steel);
        let pos = cell.center();
        assert_eq!(map.check_bullet_collision(pos, 1), BulletImpact::BLOCKED);
        assert_eq!(map.get_tile(cell), TileType::Steel);
        assert_eq!(map.check_bullet_collision(pos, 2), BulletImpact::DESTROYED);
        assert_eq!(map.get_tile(cell), TileType::Empty);
    }

    #[test]
    fn test_bullet_vs_brick_always_destroys() {
        for power in [1u8, 2, 3] {
            let mut map = open_map();
            let cell = Cell::new(5, 5);
            map.set_tile(cell, TileType::Brick);
            assert_eq!(map.check_bullet_collision(cell.center(), power), BulletImpact::DESTROYED);
            assert_eq!(map.get_tile(cell), TileType::Empty);
        }
    }

    #[test]
    fn test_bullet_passes_water_forest_ice() {
        let mut map = open_map();
        for (i, tile) in [TileType::Water, TileType::Forest, TileType::Ice].into_iter().enumerate() {
            let cell = Cell::new(8, 4 + i as i32);
            map.set_tile(cell, tile);
            assert_eq!(map.check_bullet_collision(cell.center(), 2), BulletImpact::MISS);
            assert_eq!(map.get_tile(cell), tile);
        }
    }

    #[test]
    fn test_border_steel_is_indestructible() {
        let mut map = open_map();
        let pos = Cell::new(0, 5).center();
        assert_eq!(map.check_bullet_collision(pos, 2), BulletImpact::BLOCKED);
        assert_eq!(map.get_tile(Cell::new(0, 5)), TileType::Steel);
    }

    #[test]
    fn test_visual_handles_follow_tiles() {
        let mut map = open_map();
        let cell = Cell::new(6, 6);
        assert!(map.visual(cell).is_none());
        map.set_tile(cell, TileType::Brick);
        let handle = map.visual(cell).unwrap();
        map.take_released_handles();
        map.check_bullet_collision(cell.center(), 1);
        assert!(map.visual(cell).is_none());
        assert_eq!(map.take_released_handles(), vec![handle]);
        let deltas = map.take_deltas();
        assert_eq!(deltas.last().unwrap().tile, TileType::Empty);
        assert!(map.take_deltas().is_empty());
    }

    #[test]
    fn test_tank_collision() {
        let mut map = open_map();
        let size = fx(14);
        let free = Cell::new(12, 12).center();
        assert!(!map.check_tank_collision(free, size, false));

        map.set_tile(Cell::new(12, 13), TileType::Water);
        // Shift right so the box straddles into the water tile.
        let straddle = free + Vec2Fixed::from_ints(4, 0);
        assert!(map.check_tank_collision(straddle, size, false));
        assert!(!map.check_tank_collision(straddle, size, true));

        // Touching the border ring is a collision.
        let corner = Vec2Fixed::from_ints(8, 8);
        assert!(map.check_tank_collision(corner, size, false));
        // Leaving the world is a collision.
        assert!(map.check_tank_collision(Vec2Fixed::from_ints(-20, 100), size, true));
    }

    #[test]
    fn test_forest_cutting() {
        let mut map = open_map();
        let cell = Cell::new(9, 9);
        map.set_tile(cell, TileType::Forest);
        assert!(map.destroy_forest(cell.center()));
        assert!(!map.destroy_forest(cell.center()));
        assert_eq!(map.get_tile(cell), TileType::Empty);
    }

    #[test]
    fn test_protection_rewrites_exactly_five_cells() {
        let mut map = open_map();
        let before: Vec<TileType> = map.tiles().to_vec();
        map.set_base_protection(true);
        assert_eq!(map.protection_tiles(), [TileType::Steel; 5]);
        let changed = map
            .tiles()
            .iter()
            .zip(before.iter())
            .filter(|(a, b)| a != b)
            .count();
        assert_eq!(changed, 5);
        map.clear_base_protection();
        assert_eq!(map.protection_tiles(), [TileType::Empty; 5]);
        map.set_base_protection(false);
        assert_eq!(map.protection_tiles(), [TileType::Brick; 5]);
        assert_eq!(map.get_tile(BASE_CELL), TileType::Empty);
    }

    #[test]
    fn test_from_rows_validation() {
        let good: Vec<String> = TileMap::bordered()
            .to_ascii()
            .lines()
            .map(str::to_string)
            .collect();
        assert!(TileMap::from_rows(&good).is_ok());

        let mut bad_border = good.clone();
        bad_border[0].replace_range(3..4, ".");
        assert!(TileMap::from_rows(&bad_border).is_err());

        let mut bad_base = good.clone();
        bad_base[BASE_CELL.row as usize].replace_range(13..14, "B");
        assert!(TileMap::from_rows(&bad_base).is_err());

        let empty: Vec<String> = Vec::new();
        assert!(matches!(TileMap::from_rows(&empty), Err(GameError::InvalidMap(_))));
    }

    #[test]
    fn test_find_random_empty_tile() {
        let map = open_map();
        let mut rng = SeededRandom::new(5);
        for _ in 0..50 {
            let pos = map.find_random_empty_tile(&mut rng).unwrap();
            let cell = TileMap::cell_at(pos).unwrap();
            assert_eq!(map.get_tile(cell), TileType::Empty);
            assert!(!cell.is_reserved());
        }
    }

    #[test]
    fn test_scan_line_reports_first_obstacle() {
        let mut map = open_map();
        let from = Cell::new(12, 5).center();
        map.set_tile(Cell::new(12, 8), TileType::Brick);
        let seen = map.scan_line(from, Direction::Right, fx(120));
        let first = seen.iter().find(|(_, t)| *t != TileType::Empty).unwrap();
        assert_eq!(first.1, TileType::Brick);
        // Brick tile starts 2.5 tiles from the shooter's center.
        assert!(first.0 >= fx(40) && first.0 <= fx(48));
    }

    #[test]
    fn test_for_level_rejects_zero() {
        assert!(matches!(TileMap::for_level(1, 0), Err(GameError::InvalidLevel(0))));
    }
}
