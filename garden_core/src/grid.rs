use crate::Error;
use serde::{Deserialize, Serialize};

/// A single grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct Cell {
    pub x: u32,
    pub y: u32,
}

impl Cell {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Directional input. `Up` moves towards row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Fixed `cols × rows` grid dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cols: u32,
    rows: u32,
}

impl Grid {
    pub fn new(cols: u32, rows: u32) -> Result<Self, Error> {
        if cols == 0 || rows == 0 {
            return Err(Error::Config(format!(
                "grid dimensions must be non-zero, got {}x{}",
                cols, rows
            )));
        }
        Ok(Self { cols, rows })
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.cols && cell.y < self.rows
    }

    /// Where the cursor lands on the first directional input.
    pub fn initial_cursor(&self) -> Cell {
        Cell::new(self.cols / 2, 0)
    }

    /// Neighbour of `cell` in `direction`, clamped to the grid edges.
    pub fn step(&self, cell: Cell, direction: Direction) -> Cell {
        match direction {
            Direction::Up => Cell::new(cell.x, cell.y.saturating_sub(1)),
            Direction::Down => Cell::new(cell.x, (cell.y + 1).min(self.rows - 1)),
            Direction::Left => Cell::new(cell.x.saturating_sub(1), cell.y),
            Direction::Right => Cell::new((cell.x + 1).min(self.cols - 1), cell.y),
        }
    }
}
