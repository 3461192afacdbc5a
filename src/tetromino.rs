//! Tetromino definitions and shapes
//!
//! All 7 standard tetrominoes with their spawn-orientation shape matrices.
//! Every shape is a square matrix so a quarter turn never changes its size.

use ratatui::style::Color;

/// Largest bounding matrix of any tetromino (the I piece)
pub const MAX_SHAPE_SIZE: usize = 4;

/// The 7 tetromino types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TetrominoType {
    I, // Cyan - long bar
    O, // Yellow - square
    T, // Magenta - T-shape
    S, // Green - S-shape
    Z, // Red - Z-shape
    J, // Blue - J-shape
    L, // Orange - L-shape
}

impl TetrominoType {
    /// Get the color for this tetromino
    pub fn color(&self) -> Color {
        match self {
            TetrominoType::I => Color::Cyan,
            TetrominoType::O => Color::Yellow,
            TetrominoType::T => Color::Magenta,
            TetrominoType::S => Color::Green,
            TetrominoType::Z => Color::Red,
            TetrominoType::J => Color::Blue,
            TetrominoType::L => Color::Rgb(255, 165, 0), // Orange
        }
    }

    /// All tetromino types, in sidebar order
    pub fn all() -> [TetrominoType; 7] {
        [
            TetrominoType::I,
            TetrominoType::O,
            TetrominoType::T,
            TetrominoType::S,
            TetrominoType::Z,
            TetrominoType::J,
            TetrominoType::L,
        ]
    }

    /// Position of this type in [`TetrominoType::all`]
    pub fn index(&self) -> usize {
        match self {
            TetrominoType::I => 0,
            TetrominoType::O => 1,
            TetrominoType::T => 2,
            TetrominoType::S => 3,
            TetrominoType::Z => 4,
            TetrominoType::J => 5,
            TetrominoType::L => 6,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TetrominoType::I => "I",
            TetrominoType::O => "O",
            TetrominoType::T => "T",
            TetrominoType::S => "S",
            TetrominoType::Z => "Z",
            TetrominoType::J => "J",
            TetrominoType::L => "L",
        }
    }

    /// Get the spawn-orientation shape matrix
    pub fn shape(&self) -> Shape {
        match self {
            TetrominoType::I => Shape::from_rows(&[
                &[0, 0, 0, 0],
                &[1, 1, 1, 1],
                &[0, 0, 0, 0],
                &[0, 0, 0, 0],
            ]),
            TetrominoType::O => Shape::from_rows(&[&[1, 1], &[1, 1]]),
            TetrominoType::T => Shape::from_rows(&[&[0, 0, 0], &[1, 1, 1], &[0, 1, 0]]),
            TetrominoType::S => Shape::from_rows(&[&[0, 0, 0], &[0, 1, 1], &[1, 1, 0]]),
            TetrominoType::Z => Shape::from_rows(&[&[0, 0, 0], &[1, 1, 0], &[0, 1, 1]]),
            TetrominoType::J => Shape::from_rows(&[&[0, 0, 0], &[1, 0, 0], &[1, 1, 1]]),
            TetrominoType::L => Shape::from_rows(&[&[0, 0, 0], &[0, 0, 1], &[1, 1, 1]]),
        }
    }
}

/// A square N×N occupancy matrix (N ≤ 4)
///
/// Cells outside the `size × size` corner are always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    size: usize,
    cells: [[bool; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE],
}

impl Shape {
    /// Build a shape from square rows, any nonzero entry being occupied
    fn from_rows(rows: &[&[u8]]) -> Self {
        let size = rows.len();
        debug_assert!(size <= MAX_SHAPE_SIZE);
        let mut cells = [[false; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (r, row) in rows.iter().enumerate() {
            debug_assert_eq!(row.len(), size, "shape matrix must be square");
            for (c, &value) in row.iter().enumerate() {
                cells[r][c] = value != 0;
            }
        }
        Self { size, cells }
    }

    /// Side length of the bounding matrix
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_filled(&self, row: usize, col: usize) -> bool {
        row < self.size && col < self.size && self.cells[row][col]
    }

    /// Quarter turn clockwise: transpose of the vertically reversed matrix
    pub fn rotated_cw(&self) -> Shape {
        let n = self.size;
        let mut cells = [[false; MAX_SHAPE_SIZE]; MAX_SHAPE_SIZE];
        for (r, row) in cells.iter_mut().enumerate().take(n) {
            for (c, cell) in row.iter_mut().enumerate().take(n) {
                *cell = self.cells[n - 1 - c][r];
            }
        }
        Shape { size: n, cells }
    }

    /// Offsets (col, row) of occupied cells in row-major order
    pub fn filled_offsets(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.size).flat_map(move |r| {
            (0..self.size)
                .filter(move |&c| self.cells[r][c])
                .map(move |c| (c, r))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_shape_has_four_cells() {
        for kind in TetrominoType::all() {
            assert_eq!(kind.shape().filled_offsets().count(), 4, "{:?}", kind);
        }
    }

    #[test]
    fn test_index_matches_all_order() {
        for (i, kind) in TetrominoType::all().iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_shape_sizes() {
        assert_eq!(TetrominoType::I.shape().size(), 4);
        assert_eq!(TetrominoType::O.shape().size(), 2);
        for kind in [
            TetrominoType::T,
            TetrominoType::S,
            TetrominoType::Z,
            TetrominoType::J,
            TetrominoType::L,
        ] {
            assert_eq!(kind.shape().size(), 3);
        }
    }

    #[test]
    fn test_rotate_t_clockwise() {
        // ...        .#.
        // ###   ->   ##.
        // .#.        .#.
        let rotated = TetrominoType::T.shape().rotated_cw();
        let offsets: Vec<_> = rotated.filled_offsets().collect();
        assert_eq!(offsets, vec![(1, 0), (0, 1), (1, 1), (1, 2)]);
    }

    #[test]
    fn test_rotate_i_becomes_vertical() {
        let rotated = TetrominoType::I.shape().rotated_cw();
        let offsets: Vec<_> = rotated.filled_offsets().collect();
        assert_eq!(offsets, vec![(2, 0), (2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn test_o_rotation_is_identity() {
        let shape = TetrominoType::O.shape();
        assert_eq!(shape.rotated_cw(), shape);
    }

    #[test]
    fn test_four_rotations_restore_shape() {
        for kind in TetrominoType::all() {
            let shape = kind.shape();
            let back = shape.rotated_cw().rotated_cw().rotated_cw().rotated_cw();
            assert_eq!(back, shape, "{:?}", kind);
        }
    }
}
