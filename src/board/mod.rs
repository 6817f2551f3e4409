//! Board representation.
//!
//! Squares and their fixed playable ordering, pieces, the board grid, and
//! the query interface the defensive evaluator reads positions through.

pub mod piece;
pub mod square;
pub mod state;
pub mod threats;

pub use piece::{Color, Piece};
pub use square::{square_index, Square, BOARD_SIZE, DIAGONALS, PLAYABLE_COUNT, PLAYABLE_SQUARES};
pub use state::{BoardError, BoardState};
pub use threats::{BoardQuery, DiagonalThreats};
