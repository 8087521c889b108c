// grid.rs: static obstacle map the swarm explores.
//
// Row-major flat storage, one byte per cell.  Immutable once built: every
// drone reads it, nothing writes it after setup.

use crate::core::error::{SwarmError, SwarmResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate.  Signed so that a proposed step can land outside the
/// grid and simply be rejected by [`GridEnvironment::is_open`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Position { row, col }
    }

    /// Euclidean distance between two cells.
    #[inline]
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dr = (other.row - self.row) as f64;
        let dc = (other.col - self.col) as f64;
        (dr * dr + dc * dc).sqrt()
    }
}

impl From<(i32, i32)> for Position {
    fn from((row, col): (i32, i32)) -> Self {
        Position { row, col }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cell {
    Open,
    Blocked,
}

/// Immutable `height × width` obstacle map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridEnvironment {
    cells: Box<[Cell]>,
    height: usize,
    width: usize,
}

impl GridEnvironment {
    /// An obstacle-free grid.
    pub fn open(height: usize, width: usize) -> Self {
        GridEnvironment {
            cells: vec![Cell::Open; height * width].into_boxed_slice(),
            height,
            width,
        }
    }

    /// Build from a row-major obstacle array (`true` = blocked), the shape an
    /// external setup layer hands us.  Rows must all have the same length.
    pub fn from_obstacles(rows: &[Vec<bool>]) -> SwarmResult<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if height == 0 || width == 0 {
            return Err(SwarmError::MalformedGrid("grid has no cells".to_string()));
        }

        let mut cells = Vec::with_capacity(height * width);
        for (r, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(SwarmError::MalformedGrid(format!(
                    "row {} has {} columns, expected {}",
                    r,
                    row.len(),
                    width
                )));
            }
            cells.extend(row.iter().map(|&b| if b { Cell::Blocked } else { Cell::Open }));
        }

        Ok(GridEnvironment {
            cells: cells.into_boxed_slice(),
            height,
            width,
        })
    }

    /// Scatter `obstacle_count` obstacles uniformly, with replacement, so the
    /// number of distinct blocked cells may be lower.  Cells listed in
    /// `keep_open` are never blocked.
    pub fn random<R: Rng + ?Sized>(
        height: usize,
        width: usize,
        obstacle_count: usize,
        keep_open: &[Position],
        rng: &mut R,
    ) -> Self {
        let mut grid = Self::open(height, width);
        if height == 0 || width == 0 {
            return grid;
        }
        for _ in 0..obstacle_count {
            let pos = Position::new(
                rng.gen_range(0..height) as i32,
                rng.gen_range(0..width) as i32,
            );
            if keep_open.contains(&pos) {
                continue;
            }
            if let Some(idx) = grid.index(pos) {
                grid.cells[idx] = Cell::Blocked;
            }
        }
        grid
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if pos.row < 0 || pos.col < 0 {
            return None;
        }
        let (r, c) = (pos.row as usize, pos.col as usize);
        if r >= self.height || c >= self.width {
            return None;
        }
        Some(r * self.width + c)
    }

    #[inline]
    pub fn in_bounds(&self, pos: Position) -> bool {
        self.index(pos).is_some()
    }

    /// True iff `pos` is inside the grid and not an obstacle.
    /// Out-of-bounds is "not traversable", never an error.
    #[inline]
    pub fn is_open(&self, pos: Position) -> bool {
        self.index(pos)
            .map(|idx| self.cells[idx] == Cell::Open)
            .unwrap_or(false)
    }

    pub fn cell(&self, pos: Position) -> Option<Cell> {
        self.index(pos).map(|idx| self.cells[idx])
    }

    pub fn open_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| **c == Cell::Open).count()
    }

    /// Row-major obstacle array (`true` = blocked) for renderers.
    pub fn to_obstacles(&self) -> Vec<Vec<bool>> {
        self.cells
            .chunks(self.width.max(1))
            .map(|row| row.iter().map(|c| *c == Cell::Blocked).collect())
            .collect()
    }
}
