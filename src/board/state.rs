//! Board state representation.
//!
//! A fixed 10x10 grid of optional pieces, supplied by the host game loop on
//! every request. Nothing in this crate mutates a caller's board.

use thiserror::Error;

use super::piece::{Color, Piece};
use super::square::{Square, BOARD_SIZE, PLAYABLE_SQUARES};

/// Errors that can occur when building a board from external input.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("invalid board JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected 10 rows, got {0}")]
    RowCount(usize),

    #[error("row {row}: expected 10 cells, got {len}")]
    RowLength { row: usize, len: usize },

    #[error("piece on non-playable square {0}")]
    NotPlayable(Square),

    #[error("unknown diagram symbol '{0}'")]
    UnknownSymbol(char),
}

/// Complete piece placement at a point in time.
///
/// Indexed `[row][col]`. Light squares are always empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardState {
    cells: [[Option<Piece>; BOARD_SIZE]; BOARD_SIZE],
}

impl Default for BoardState {
    fn default() -> Self {
        Self::empty()
    }
}

impl BoardState {
    /// Creates a board with no pieces.
    pub fn empty() -> Self {
        BoardState {
            cells: [[None; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Places a piece. Returns false if the square is light or already occupied.
    pub fn place_piece(&mut self, square: Square, piece: Piece) -> bool {
        if !square.is_playable() {
            return false;
        }
        let cell = &mut self.cells[square.row as usize][square.col as usize];
        if cell.is_some() {
            return false;
        }
        *cell = Some(piece);
        true
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.cells[square.row as usize][square.col as usize]
    }

    /// Iterates over occupied squares in playable order.
    pub fn pieces(&self) -> impl Iterator<Item = (Square, Piece)> + '_ {
        PLAYABLE_SQUARES
            .iter()
            .filter_map(move |&sq| self.piece_at(sq).map(|p| (sq, p)))
    }

    /// Counts the pieces of one color.
    pub fn count(&self, color: Color) -> usize {
        self.pieces().filter(|(_, p)| p.color == color).count()
    }

    /// Parses the host's JSON board: ten rows of ten cells, each `null` or
    /// `{"color": "red"|"black", "king": bool}`.
    pub fn from_json(text: &str) -> Result<Self, BoardError> {
        let rows: Vec<Vec<Option<Piece>>> = serde_json::from_str(text)?;
        if rows.len() != BOARD_SIZE {
            return Err(BoardError::RowCount(rows.len()));
        }
        let mut board = BoardState::empty();
        for (r, row) in rows.iter().enumerate() {
            if row.len() != BOARD_SIZE {
                return Err(BoardError::RowLength {
                    row: r,
                    len: row.len(),
                });
            }
            for (c, cell) in row.iter().enumerate() {
                if let Some(piece) = cell {
                    board.put(r, c, *piece)?;
                }
            }
        }
        Ok(board)
    }

    /// Parses a text diagram: ten lines of ten symbols, `.` for empty and
    /// `r`/`R`/`b`/`B` for pieces. Whitespace inside a line is ignored.
    pub fn from_diagram(text: &str) -> Result<Self, BoardError> {
        let rows: Vec<Vec<char>> = text
            .lines()
            .map(|l| l.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
            .filter(|l| !l.is_empty())
            .collect();
        if rows.len() != BOARD_SIZE {
            return Err(BoardError::RowCount(rows.len()));
        }
        let mut board = BoardState::empty();
        for (r, row) in rows.iter().enumerate() {
            if row.len() != BOARD_SIZE {
                return Err(BoardError::RowLength {
                    row: r,
                    len: row.len(),
                });
            }
            for (c, &ch) in row.iter().enumerate() {
                if ch == '.' {
                    continue;
                }
                let piece = Piece::from_symbol(ch).ok_or(BoardError::UnknownSymbol(ch))?;
                board.put(r, c, piece)?;
            }
        }
        Ok(board)
    }

    fn put(&mut self, row: usize, col: usize, piece: Piece) -> Result<(), BoardError> {
        let square = Square {
            row: row as u8,
            col: col as u8,
        };
        if !square.is_playable() {
            return Err(BoardError::NotPlayable(square));
        }
        self.cells[row][col] = Some(piece);
        Ok(())
    }
}
