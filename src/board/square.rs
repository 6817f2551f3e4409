//! Board coordinates and the fixed playable-square ordering.
//!
//! The 50 dark squares of the 10x10 board are enumerated row-major. That
//! ordering is the index space every trained policy model was built
//! against, so it must never change.

use std::fmt;

/// Width and height of the board.
pub const BOARD_SIZE: usize = 10;

/// Number of playable (dark) squares.
pub const PLAYABLE_COUNT: usize = BOARD_SIZE * BOARD_SIZE / 2;

/// A cell on the board, addressed by row and column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Square {
    pub row: u8,
    pub col: u8,
}

impl Square {
    /// Creates a square. Returns None if the coordinates are off the board.
    pub const fn new(row: usize, col: usize) -> Option<Square> {
        if row < BOARD_SIZE && col < BOARD_SIZE {
            Some(Square {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// Returns true for the dark squares, where `row + col` is odd.
    #[inline]
    pub const fn is_playable(self) -> bool {
        (self.row + self.col) % 2 == 1
    }

    /// Position of this square in the playable ordering, or None for a light square.
    #[inline]
    pub const fn index(self) -> Option<usize> {
        if self.is_playable() {
            // Each row holds five dark squares at columns col/2 = 0..4.
            Some(self.row as usize * (BOARD_SIZE / 2) + self.col as usize / 2)
        } else {
            None
        }
    }

    /// Inverse of [`Square::index`].
    #[inline]
    pub fn from_index(index: usize) -> Option<Square> {
        PLAYABLE_SQUARES.get(index).copied()
    }

    /// Returns the square offset by (dr, dc), or None if it leaves the board.
    #[inline]
    pub fn offset(self, dr: i32, dc: i32) -> Option<Square> {
        let r = self.row as i32 + dr;
        let c = self.col as i32 + dc;
        if r < 0 || c < 0 {
            return None;
        }
        Square::new(r as usize, c as usize)
    }

    /// Iterates over the on-board diagonal neighbours.
    pub fn diagonal_neighbors(self) -> impl Iterator<Item = Square> {
        DIAGONALS
            .iter()
            .filter_map(move |&(dr, dc)| self.offset(dr, dc))
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// The four diagonal step directions.
pub const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// All playable squares in row-major order.
pub const PLAYABLE_SQUARES: [Square; PLAYABLE_COUNT] = build_playable_squares();

const fn build_playable_squares() -> [Square; PLAYABLE_COUNT] {
    let mut out = [Square { row: 0, col: 0 }; PLAYABLE_COUNT];
    let mut i = 0;
    let mut row = 0;
    while row < BOARD_SIZE {
        let mut col = 0;
        while col < BOARD_SIZE {
            if (row + col) % 2 == 1 {
                out[i] = Square {
                    row: row as u8,
                    col: col as u8,
                };
                i += 1;
            }
            col += 1;
        }
        row += 1;
    }
    out
}

/// Looks up a square in the playable ordering.
pub fn square_index(square: Square) -> Option<usize> {
    square.index()
}
