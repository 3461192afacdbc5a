//! Active falling piece logic

use crate::board::Board;
use crate::tetromino::{Shape, TetrominoType};
use ratatui::style::Color;

/// An active falling piece
///
/// Movement here is unconditional; callers check [`Piece::collides`] first.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// The type of tetromino
    pub piece_type: TetrominoType,
    /// Current rotation state of the shape matrix
    pub shape: Shape,
    /// Top-left corner of the shape matrix in board space
    pub x: i32,
    pub y: i32,
}

impl Piece {
    /// Create a new piece centered horizontally on the top row
    pub fn spawn(piece_type: TetrominoType, board_width: usize) -> Self {
        let shape = piece_type.shape();
        let x = (board_width / 2) as i32 - (shape.size() / 2) as i32;
        Self {
            piece_type,
            shape,
            x,
            y: 0,
        }
    }

    pub fn color(&self) -> Color {
        self.piece_type.color()
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        self.x += dx;
        self.y += dy;
    }

    /// Rotate the shape a quarter turn clockwise in place
    pub fn rotate(&mut self) {
        self.shape = self.shape.rotated_cw();
    }

    /// Absolute (x, y) of every occupied cell, row-major
    pub fn occupied_cells(&self) -> Vec<(i32, i32)> {
        self.shape
            .filled_offsets()
            .map(|(dx, dy)| (self.x + dx as i32, self.y + dy as i32))
            .collect()
    }

    /// Would the piece overlap a wall, the floor or a locked cell if
    /// shifted by (dx, dy)?
    ///
    /// Cells above the top row never collide on their own.
    pub fn collides(&self, board: &Board, dx: i32, dy: i32) -> bool {
        let width = board.width() as i32;
        let height = board.height() as i32;
        self.occupied_cells().into_iter().any(|(x, y)| {
            let (x, y) = (x + dx, y + dy);
            x < 0 || x >= width || y >= height || (y >= 0 && board.is_occupied(x, y))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Cell;
    use proptest::prelude::*;

    #[test]
    fn test_spawn_position() {
        let o = Piece::spawn(TetrominoType::O, 10);
        assert_eq!((o.x, o.y), (4, 0));
        let i = Piece::spawn(TetrominoType::I, 10);
        assert_eq!((i.x, i.y), (3, 0));
        let t = Piece::spawn(TetrominoType::T, 10);
        assert_eq!((t.x, t.y), (4, 0));
    }

    #[test]
    fn test_spawn_is_centered() {
        for kind in TetrominoType::all() {
            let piece = Piece::spawn(kind, 10);
            let left = piece.x;
            let right = 10 - (piece.x + piece.shape.size() as i32);
            assert!((left - right).abs() <= 1, "{:?} not centered", kind);
            assert!(piece.occupied_cells().iter().all(|&(_, y)| y >= 0));
        }
    }

    #[test]
    fn test_occupied_cells_row_major() {
        let piece = Piece::spawn(TetrominoType::J, 10);
        assert_eq!(
            piece.occupied_cells(),
            vec![(4, 1), (4, 2), (5, 2), (6, 2)]
        );
    }

    #[test]
    fn test_rotate_keeps_origin_and_color() {
        let mut piece = Piece::spawn(TetrominoType::L, 10);
        piece.rotate();
        assert_eq!((piece.x, piece.y), (4, 0));
        assert_eq!(piece.color(), Color::Rgb(255, 165, 0));
        assert_ne!(piece.shape, TetrominoType::L.shape());
    }

    #[test]
    fn test_o_piece_falls_to_floor() {
        let board = Board::default();
        let mut piece = Piece::spawn(TetrominoType::O, board.width());
        assert!(!piece.collides(&board, 0, 1));
        for _ in 0..18 {
            assert!(!piece.collides(&board, 0, 1));
            piece.translate(0, 1);
        }
        assert!(piece.collides(&board, 0, 1));
    }

    #[test]
    fn test_walls_collide() {
        let board = Board::default();
        let mut piece = Piece::spawn(TetrominoType::O, board.width());
        piece.translate(-4, 0);
        assert!(!piece.collides(&board, 0, 0));
        assert!(piece.collides(&board, -1, 0));
        piece.translate(8, 0);
        assert!(!piece.collides(&board, 0, 0));
        assert!(piece.collides(&board, 1, 0));
    }

    #[test]
    fn test_above_top_does_not_collide() {
        let board = Board::default();
        let mut piece = Piece::spawn(TetrominoType::I, board.width());
        piece.translate(0, -3);
        assert!(!piece.collides(&board, 0, 0));
    }

    #[test]
    fn test_locked_cell_collides() {
        let mut board = Board::default();
        board.set(4, 2, Cell::Filled(Color::Red));
        let piece = Piece::spawn(TetrominoType::O, board.width());
        assert!(!piece.collides(&board, 0, 0));
        assert!(piece.collides(&board, 0, 1));
    }

    fn any_kind() -> impl Strategy<Value = TetrominoType> {
        (0usize..7).prop_map(|i| TetrominoType::all()[i])
    }

    proptest! {
        #[test]
        fn prop_collides_matches_cell_rule(
            kind in any_kind(),
            turns in 0usize..4,
            x in -4i32..12,
            y in -4i32..22,
            filled in proptest::collection::vec((0i32..10, 0i32..20), 0..40),
        ) {
            let mut board = Board::default();
            for &(fx, fy) in &filled {
                board.set(fx, fy, Cell::Filled(Color::Gray));
            }
            let mut piece = Piece::spawn(kind, board.width());
            for _ in 0..turns {
                piece.rotate();
            }
            piece.x = x;
            piece.y = y;

            let expected = piece.occupied_cells().iter().any(|&(cx, cy)| {
                cx < 0 || cx >= 10 || cy >= 20 || (cy >= 0 && filled.contains(&(cx, cy)))
            });
            prop_assert_eq!(piece.collides(&board, 0, 0), expected);
        }

        #[test]
        fn prop_four_rotations_are_identity(kind in any_kind(), turns in 0usize..4) {
            let mut piece = Piece::spawn(kind, 10);
            for _ in 0..turns {
                piece.rotate();
            }
            let before = piece.clone();
            for _ in 0..4 {
                piece.rotate();
            }
            prop_assert_eq!(piece, before);
        }
    }
}
