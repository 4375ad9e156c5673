use crate::world::map::TileMap;
use crate::world::position::{Direction, Position, PositionDelta};
use thiserror::Error;

/// Authored cell values: 0 off, 1 on, 2 origin only, 3 origin and on.
pub const CELL_OFF: u8 = 0;
pub const CELL_ON: u8 = 1;
pub const CELL_ORIGIN: u8 = 2;
pub const CELL_ORIGIN_ON: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AreaError {
    #[error("area has no cells")]
    Empty,
    #[error("area row {row} has {found} columns, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("area of {cells} cells does not divide into {rows} rows")]
    Indivisible { cells: usize, rows: usize },
    #[error("area cell value {value} at row {row}, column {col} is not one of 0-3")]
    InvalidCell { row: usize, col: usize, value: u8 },
    #[error("area has no origin cell")]
    MissingOrigin,
    #[error("area has a second origin cell at row {row}, column {col}")]
    DuplicateOrigin { row: usize, col: usize },
    #[error("origin ({row}, {col}) lies outside the {rows}x{cols} grid")]
    OriginOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },
}

/// Rectangular footprint with the caster's projected cell as origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaShape {
    rows: usize,
    cols: usize,
    cells: Vec<bool>,
    origin_row: usize,
    origin_col: usize,
}

impl AreaShape {
    pub fn new(
        rows: usize,
        cols: usize,
        cells: Vec<bool>,
        origin_row: usize,
        origin_col: usize,
    ) -> Result<Self, AreaError> {
        if rows == 0 || cols == 0 || cells.is_empty() {
            return Err(AreaError::Empty);
        }
        if cells.len() != rows * cols {
            return Err(AreaError::Indivisible {
                cells: cells.len(),
                rows,
            });
        }
        if origin_row >= rows || origin_col >= cols {
            return Err(AreaError::OriginOutOfBounds {
                row: origin_row,
                col: origin_col,
                rows,
                cols,
            });
        }
        Ok(Self {
            rows,
            cols,
            cells,
            origin_row,
            origin_col,
        })
    }

    /// Builds a shape from authored rows of 0/1/2/3 values.
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, AreaError> {
        let Some(first) = rows.first() else {
            return Err(AreaError::Empty);
        };
        let cols = first.as_ref().len();
        if cols == 0 {
            return Err(AreaError::Empty);
        }
        let mut cells = Vec::with_capacity(rows.len() * cols);
        let mut origin = None;
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(AreaError::RaggedRow {
                    row: row_index,
                    expected: cols,
                    found: row.len(),
                });
            }
            for (col_index, &value) in row.iter().enumerate() {
                let on = match value {
                    CELL_OFF | CELL_ORIGIN => false,
                    CELL_ON | CELL_ORIGIN_ON => true,
                    _ => {
                        return Err(AreaError::InvalidCell {
                            row: row_index,
                            col: col_index,
                            value,
                        })
                    }
                };
                if value == CELL_ORIGIN || value == CELL_ORIGIN_ON {
                    if origin.is_some() {
                        return Err(AreaError::DuplicateOrigin {
                            row: row_index,
                            col: col_index,
                        });
                    }
                    origin = Some((row_index, col_index));
                }
                cells.push(on);
            }
        }
        let (origin_row, origin_col) = origin.ok_or(AreaError::MissingOrigin)?;
        Self::new(rows.len(), cols, cells, origin_row, origin_col)
    }

    /// Builds a shape from a flat row-major list split into `rows` rows.
    pub fn from_flat(values: &[u8], rows: usize) -> Result<Self, AreaError> {
        if values.is_empty() || rows == 0 {
            return Err(AreaError::Empty);
        }
        if values.len() % rows != 0 {
            return Err(AreaError::Indivisible {
                cells: values.len(),
                rows,
            });
        }
        let cols = values.len() / rows;
        let split: Vec<&[u8]> = values.chunks(cols).collect();
        Self::from_rows(&split)
    }

    /// Filled disc centred on the origin.
    pub fn circle(radius: u8) -> Self {
        let radius = i32::from(radius);
        let size = (radius * 2 + 1) as usize;
        let mut cells = Vec::with_capacity(size * size);
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                cells.push(dx * dx + dy * dy <= radius * radius);
            }
        }
        Self {
            rows: size,
            cols: size,
            cells,
            origin_row: radius as usize,
            origin_col: radius as usize,
        }
    }

    pub fn square(radius: u8) -> Self {
        let size = usize::from(radius) * 2 + 1;
        Self {
            rows: size,
            cols: size,
            cells: vec![true; size * size],
            origin_row: usize::from(radius),
            origin_col: usize::from(radius),
        }
    }

    /// Straight line of `length` cells pointing north, origin at the bottom.
    pub fn beam(length: u8) -> Self {
        Self::wave(length, 0)
    }

    /// North-pointing cone: the top row is widest and each side narrows by
    /// one column every `spread` rows towards the origin at the bottom centre.
    pub fn wave(length: u8, spread: u8) -> Self {
        let rows = usize::from(length.max(1));
        let cols = if spread == 0 {
            1
        } else {
            let spread = usize::from(spread);
            ((rows - rows % spread) / spread) * 2 + 1
        };
        let mut cells = Vec::with_capacity(rows * cols);
        let mut col_spread = cols;
        for row in 1..=rows {
            let min_col = cols - col_spread + 1;
            let max_col = col_spread;
            for col in 1..=cols {
                cells.push(col >= min_col && col <= max_col);
            }
            if spread > 0 && row % usize::from(spread) == 0 {
                col_spread = col_spread.saturating_sub(1).max(cols / 2 + 1);
            }
        }
        let origin_row = rows - 1;
        let origin_col = cols / 2;
        cells[origin_row * cols + origin_col] = true;
        Self {
            rows,
            cols,
            cells,
            origin_row,
            origin_col,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Origin as `(row, col)`.
    pub fn origin(&self) -> (usize, usize) {
        (self.origin_row, self.origin_col)
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        if row >= self.rows || col >= self.cols {
            return false;
        }
        self.cells[row * self.cols + col]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.iter().filter(|on| **on).count()
    }

    /// Clockwise quarter turn: `new[x][rows - 1 - y] = old[y][x]`.
    pub fn rotate90(&self) -> Self {
        let new_rows = self.cols;
        let new_cols = self.rows;
        let mut cells = vec![false; self.cells.len()];
        for y in 0..self.rows {
            for x in 0..self.cols {
                cells[x * new_cols + (self.rows - 1 - y)] = self.cells[y * self.cols + x];
            }
        }
        Self {
            rows: new_rows,
            cols: new_cols,
            cells,
            origin_row: self.origin_col,
            origin_col: self.rows - 1 - self.origin_row,
        }
    }

    /// Reverses the flattened cell order; the origin is mirrored through the centre.
    pub fn rotate180(&self) -> Self {
        let mut cells = self.cells.clone();
        cells.reverse();
        Self {
            rows: self.rows,
            cols: self.cols,
            cells,
            origin_row: self.rows - 1 - self.origin_row,
            origin_col: self.cols - 1 - self.origin_col,
        }
    }

    /// Counter-clockwise quarter turn: `new[cols - 1 - x][y] = old[y][x]`.
    pub fn rotate270(&self) -> Self {
        let new_rows = self.cols;
        let new_cols = self.rows;
        let mut cells = vec![false; self.cells.len()];
        for y in 0..self.rows {
            for x in 0..self.cols {
                cells[(self.cols - 1 - x) * new_cols + y] = self.cells[y * self.cols + x];
            }
        }
        Self {
            rows: new_rows,
            cols: new_cols,
            cells,
            origin_row: self.cols - 1 - self.origin_col,
            origin_col: self.origin_row,
        }
    }

    /// `(dx, dy)` of every "on" cell relative to the origin, row-major.
    pub fn offsets(&self) -> Vec<(i32, i32)> {
        let mut offsets = Vec::with_capacity(self.cell_count());
        for row in 0..self.rows {
            for col in 0..self.cols {
                if self.cells[row * self.cols + col] {
                    offsets.push((
                        col as i32 - self.origin_col as i32,
                        row as i32 - self.origin_row as i32,
                    ));
                }
            }
        }
        offsets
    }

    /// Places the origin on `target` and returns every covered position that
    /// `sight_origin` can see, materializing missing tiles as static ground.
    pub fn project<M: TileMap + ?Sized>(
        &self,
        map: &mut M,
        target: Position,
        sight_origin: Position,
    ) -> Vec<Position> {
        let mut positions = Vec::new();
        for (dx, dy) in self.offsets() {
            let (Ok(dx), Ok(dy)) = (i16::try_from(dx), i16::try_from(dy)) else {
                continue;
            };
            let Some(position) = target.offset(PositionDelta { dx, dy, dz: 0 }) else {
                continue;
            };
            if !map.has_line_of_sight(sight_origin, position, true) {
                continue;
            }
            map.ensure_tile(position);
            positions.push(position);
        }
        positions
    }
}

/// Picks the facing from caster to target. The x sign wins over the y sign
/// unless diagonals are available and both deltas are non-zero.
pub fn resolve_direction(caster: Position, target: Position, has_extended: bool) -> Direction {
    let dx = caster.offset_x(target);
    let dy = caster.offset_y(target);
    if has_extended && dx != 0 && dy != 0 {
        return match (dx < 0, dy < 0) {
            (true, true) => Direction::Northwest,
            (false, true) => Direction::Northeast,
            (true, false) => Direction::Southwest,
            (false, false) => Direction::Southeast,
        };
    }
    if dx < 0 {
        Direction::West
    } else if dx > 0 {
        Direction::East
    } else if dy < 0 {
        Direction::North
    } else {
        Direction::South
    }
}

/// Where a caster stands for a footprint anchored on `target` while facing `facing`.
pub fn projected_caster(target: Position, facing: Direction) -> Position {
    target.step(facing.opposite()).unwrap_or(target)
}

/// One rotated footprint per compass direction, derived from authored
/// north (and optionally northwest) shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionalAreaSet {
    cardinal: [AreaShape; 4],
    extended: Option<[AreaShape; 4]>,
}

impl DirectionalAreaSet {
    pub fn new(north: AreaShape) -> Self {
        let east = north.rotate90();
        let south = north.rotate180();
        let west = north.rotate270();
        Self {
            cardinal: [north, east, south, west],
            extended: None,
        }
    }

    pub fn with_extended(mut self, northwest: AreaShape) -> Self {
        let northeast = northwest.rotate90();
        let southeast = northwest.rotate180();
        let southwest = northwest.rotate270();
        self.extended = Some([northwest, northeast, southeast, southwest]);
        self
    }

    pub fn has_extended(&self) -> bool {
        self.extended.is_some()
    }

    pub fn shape(&self, direction: Direction) -> &AreaShape {
        match direction {
            Direction::North => &self.cardinal[0],
            Direction::East => &self.cardinal[1],
            Direction::South => &self.cardinal[2],
            Direction::West => &self.cardinal[3],
            diagonal => match &self.extended {
                Some(extended) => match diagonal {
                    Direction::Northwest => &extended[0],
                    Direction::Northeast => &extended[1],
                    Direction::Southeast => &extended[2],
                    _ => &extended[3],
                },
                None => &self.cardinal[0],
            },
        }
    }

    pub fn resolve_direction(&self, caster: Position, target: Position) -> Direction {
        resolve_direction(caster, target, self.has_extended())
    }

    /// Resolves the facing and projects the matching footprint onto `target`.
    /// Without a caster the footprint faces south. Sight is always traced from
    /// the projected caster cell one step behind `target`, never from the
    /// caster's real position.
    pub fn project<M: TileMap + ?Sized>(
        &self,
        map: &mut M,
        caster: Option<Position>,
        target: Position,
    ) -> Vec<Position> {
        let facing = self.resolve_direction(caster.unwrap_or(target), target);
        self.shape(facing)
            .project(map, target, projected_caster(target, facing))
    }
}
