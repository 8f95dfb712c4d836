//! Procedural terrain for the command game
//!
//! The map is a sequence of fixed-height columns. Obstacle columns (holes and
//! low ceilings) are always separated by at least one plain column, and no
//! three plain columns follow each other past the safe start.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Rows per column
pub const GRID_HEIGHT: usize = 15;

/// First row of solid ground
pub const GROUND_ROW: usize = 12;

/// Row the runner stands on when ground is present
pub const STANDING_ROW: usize = GROUND_ROW - 1;

/// Row occupied by a low ceiling
pub const LOW_CEILING_ROW: usize = 11;

/// Columns at the start that are always plain ground
pub const SAFE_START_COLUMNS: usize = 6;

const HOLE_CHANCE: f64 = 0.25;
const LOW_CEILING_CHANCE: f64 = 0.45;
const EXTEND_LOW_CEILING_CHANCE: f64 = 0.40;

/// Contents of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Ground,
    LowCeiling,
    Platform,
}

/// Obstacle classification of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Plain,
    Hole,
    LowCeiling,
}

/// One immutable column of the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainColumn {
    cells: [Cell; GRID_HEIGHT],
}

impl TerrainColumn {
    /// Ground only
    #[must_use]
    pub fn plain() -> Self {
        let mut cells = [Cell::Empty; GRID_HEIGHT];
        for cell in &mut cells[GROUND_ROW..] {
            *cell = Cell::Ground;
        }
        Self { cells }
    }

    /// No ground at all
    #[must_use]
    pub const fn hole() -> Self {
        Self {
            cells: [Cell::Empty; GRID_HEIGHT],
        }
    }

    /// Ground with a ceiling right above it
    #[must_use]
    pub fn low_ceiling() -> Self {
        let mut column = Self::plain();
        column.cells[LOW_CEILING_ROW] = Cell::LowCeiling;
        column
    }

    #[must_use]
    pub fn from_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Plain => Self::plain(),
            ColumnKind::Hole => Self::hole(),
            ColumnKind::LowCeiling => Self::low_ceiling(),
        }
    }

    /// Cell at `row`; rows outside the grid read as empty
    #[must_use]
    pub fn cell(&self, row: usize) -> Cell {
        self.cells.get(row).copied().unwrap_or(Cell::Empty)
    }

    #[must_use]
    pub fn has_ground(&self) -> bool {
        self.cells.contains(&Cell::Ground)
    }

    #[must_use]
    pub fn is_hole(&self) -> bool {
        !self.has_ground()
    }

    #[must_use]
    pub fn has_low_ceiling(&self, row: usize) -> bool {
        self.cell(row) == Cell::LowCeiling
    }

    /// Row directly above the first ground cell, or the bottom row
    #[must_use]
    pub fn ground_level(&self) -> usize {
        self.cells
            .iter()
            .position(|&c| c == Cell::Ground)
            .map_or(GRID_HEIGHT - 1, |row| row.saturating_sub(1))
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        if self.is_hole() {
            ColumnKind::Hole
        } else if self.cells.contains(&Cell::LowCeiling) {
            ColumnKind::LowCeiling
        } else {
            ColumnKind::Plain
        }
    }
}

/// Append-only sequence of columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameMap {
    columns: Vec<TerrainColumn>,
}

impl GameMap {
    #[must_use]
    pub fn from_kinds(kinds: &[ColumnKind]) -> Self {
        Self {
            columns: kinds.iter().map(|&k| TerrainColumn::from_kind(k)).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn column(&self, x: usize) -> Option<&TerrainColumn> {
        self.columns.get(x)
    }

    pub fn columns(&self) -> impl Iterator<Item = &TerrainColumn> {
        self.columns.iter()
    }

    /// Standing row at `x`; beyond the map this is the bottom row
    #[must_use]
    pub fn ground_level(&self, x: usize) -> usize {
        self.column(x)
            .map_or(GRID_HEIGHT - 1, TerrainColumn::ground_level)
    }

    /// Columns past the end read as holes
    #[must_use]
    pub fn is_hole(&self, x: usize) -> bool {
        self.column(x).is_none_or(TerrainColumn::is_hole)
    }

    #[must_use]
    pub fn has_low_ceiling(&self, x: usize, row: usize) -> bool {
        self.column(x).is_some_and(|c| c.has_low_ceiling(row))
    }

    #[must_use]
    pub fn kinds(&self) -> Vec<ColumnKind> {
        self.columns.iter().map(TerrainColumn::kind).collect()
    }

    fn push(&mut self, kind: ColumnKind) {
        self.columns.push(TerrainColumn::from_kind(kind));
    }
}

/// Builds and extends maps under the intercalation rules
#[derive(Debug, Clone)]
pub struct TerrainGenerator<R: Rng = StdRng> {
    rng: R,
}

impl TerrainGenerator<StdRng> {
    /// Deterministic generator
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the OS
    #[must_use]
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng> TerrainGenerator<R> {
    #[must_use]
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }

    /// Build a fresh map of `length` columns
    #[must_use]
    pub fn build(&mut self, length: usize) -> GameMap {
        let mut map = GameMap::default();
        let mut context = [ColumnKind::Plain; 2];
        for x in 0..length {
            let kind = if x < SAFE_START_COLUMNS {
                ColumnKind::Plain
            } else {
                self.next_kind(context, LOW_CEILING_CHANCE)
            };
            map.push(kind);
            context = [context[1], kind];
        }

        tracing::debug!(length, "terrain built");
        map
    }

    /// Append columns until the map holds `target` columns
    ///
    /// Existing columns are never touched.
    pub fn extend(&mut self, map: &mut GameMap, target: usize) {
        let start = map.len();
        if target <= start {
            return;
        }

        let mut context = [
            start
                .checked_sub(2)
                .and_then(|x| map.column(x))
                .map_or(ColumnKind::Plain, TerrainColumn::kind),
            start
                .checked_sub(1)
                .and_then(|x| map.column(x))
                .map_or(ColumnKind::Plain, TerrainColumn::kind),
        ];

        for x in start..target {
            let kind = if x < SAFE_START_COLUMNS {
                ColumnKind::Plain
            } else {
                self.next_kind(context, EXTEND_LOW_CEILING_CHANCE)
            };
            map.push(kind);
            context = [context[1], kind];
        }

        tracing::trace!(from = start, to = target, "terrain extended");
    }

    fn next_kind(&mut self, context: [ColumnKind; 2], low_ceiling_chance: f64) -> ColumnKind {
        let previous_plain = context[1] == ColumnKind::Plain;
        if !previous_plain {
            return ColumnKind::Plain;
        }

        // Two plain columns in a row: the next one must be an obstacle
        if context[0] == ColumnKind::Plain {
            return if self.rng.gen_bool(0.5) {
                ColumnKind::Hole
            } else {
                ColumnKind::LowCeiling
            };
        }

        let r: f64 = self.rng.r#gen();
        if r < HOLE_CHANCE {
            ColumnKind::Hole
        } else if r < low_ceiling_chance {
            ColumnKind::LowCeiling
        } else {
            ColumnKind::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- columns ---

    #[test]
    fn plain_column_stands_above_ground() {
        let column = TerrainColumn::plain();
        assert_eq!(column.ground_level(), STANDING_ROW);
        assert_eq!(column.cell(GROUND_ROW), Cell::Ground);
        assert_eq!(column.kind(), ColumnKind::Plain);
    }

    #[test]
    fn hole_column_reports_bottom_row() {
        let column = TerrainColumn::hole();
        assert!(column.is_hole());
        assert_eq!(column.ground_level(), GRID_HEIGHT - 1);
    }

    #[test]
    fn low_ceiling_sits_on_standing_row() {
        let column = TerrainColumn::low_ceiling();
        assert!(column.has_low_ceiling(STANDING_ROW));
        assert!(!column.is_hole());
        assert_eq!(column.kind(), ColumnKind::LowCeiling);
    }

    // -- map queries ---

    #[test]
    fn out_of_bounds_reads_as_hole_at_bottom() {
        let map = GameMap::from_kinds(&[ColumnKind::Plain]);
        assert!(map.is_hole(5));
        assert_eq!(map.ground_level(5), GRID_HEIGHT - 1);
        assert!(!map.has_low_ceiling(5, STANDING_ROW));
    }

    // -- generation ---

    #[test]
    fn safe_start_is_plain() {
        let map = TerrainGenerator::seeded(7).build(30);
        assert!(
            map.kinds()[..SAFE_START_COLUMNS]
                .iter()
                .all(|&k| k == ColumnKind::Plain)
        );
    }

    #[test]
    fn same_seed_same_map() {
        let a = TerrainGenerator::seeded(99).build(50);
        let b = TerrainGenerator::seeded(99).build(50);
        assert_eq!(a, b);
    }

    #[test]
    fn extend_continues_from_short_map() {
        let mut generator = TerrainGenerator::seeded(3);
        let mut map = GameMap::default();
        generator.extend(&mut map, 12);
        assert_eq!(map.len(), 12);
        assert!(
            map.kinds()[..SAFE_START_COLUMNS]
                .iter()
                .all(|&k| k == ColumnKind::Plain)
        );
    }
}
