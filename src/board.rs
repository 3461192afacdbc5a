//! Game board representation, piece merging and line clearing

use crate::piece::Piece;
use ratatui::style::Color;

/// Standard board dimensions
pub const DEFAULT_WIDTH: usize = 10;
pub const DEFAULT_HEIGHT: usize = 20;

/// A cell on the board - either empty or filled with a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Filled(Color),
}

impl Cell {
    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    pub fn is_filled(&self) -> bool {
        matches!(self, Cell::Filled(_))
    }
}

/// The game board
///
/// Stored as rows, row 0 is the top, y increases downward. The dimensions
/// are fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    width: usize,
    height: usize,
    rows: Vec<Vec<Cell>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

impl Board {
    /// Create a new empty board
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            rows: vec![vec![Cell::Empty; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the cell at (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i32, y: i32) -> Option<Cell> {
        if x < 0 || y < 0 {
            return None;
        }
        self.rows
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .copied()
    }

    /// Set the cell at (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i32, y: i32, cell: Cell) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        match self
            .rows
            .get_mut(y as usize)
            .and_then(|row| row.get_mut(x as usize))
        {
            Some(slot) => {
                *slot = cell;
                true
            }
            None => false,
        }
    }

    /// Whether (x, y) is inside the board and filled
    pub fn is_occupied(&self, x: i32, y: i32) -> bool {
        self.get(x, y).is_some_and(|cell| cell.is_filled())
    }

    /// Write a piece's cells into the board
    ///
    /// Fails without touching the board when any cell is still above the
    /// top row (lock out).
    pub fn merge(&mut self, piece: &Piece) -> bool {
        let cells = piece.occupied_cells();
        if cells.iter().any(|&(_, y)| y < 0) {
            return false;
        }
        let color = piece.color();
        for (x, y) in cells {
            self.set(x, y, Cell::Filled(color));
        }
        true
    }

    /// Clear completed lines and return the number cleared
    ///
    /// Scans bottom to top. A full row is removed and an empty row is
    /// inserted at the top, so the same index is checked again before
    /// moving up.
    pub fn clear_full_lines(&mut self) -> usize {
        let mut lines_cleared = 0;
        let mut y = self.height;

        while y > 0 {
            if self.is_line_full(y - 1) {
                self.rows.remove(y - 1);
                self.rows.insert(0, vec![Cell::Empty; self.width]);
                lines_cleared += 1;
            } else {
                y -= 1;
            }
        }

        lines_cleared
    }

    /// Check if a line is completely filled
    fn is_line_full(&self, y: usize) -> bool {
        self.rows[y].iter().all(|cell| cell.is_filled())
    }

    /// Rows from top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(|row| row.as_slice())
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rows
            .iter()
            .all(|row| row.iter().all(|cell| cell.is_empty()))
    }
}
