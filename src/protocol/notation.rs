//! Move descriptor notation.
//!
//! A move is written `fromRow,fromCol->toRow,toCol`, e.g. `6,1->5,2`. This
//! is the format legal moves arrive in and the format `bestmove` answers in.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::board::square::Square;

/// Errors that can occur when parsing a move descriptor.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("missing '->' separator in '{0}'")]
    MissingSeparator(String),

    #[error("expected 'row,col', got '{0}'")]
    MissingComma(String),

    #[error("invalid coordinate '{0}'")]
    InvalidNumber(String),

    #[error("square {row},{col} is off the board")]
    OutOfRange { row: i64, col: i64 },

    #[error("origin and destination are the same square {0}")]
    SameSquare(Square),
}

/// An origin/destination pair. Legality is decided by the host rules engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Move { from, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.from, self.to)
    }
}

impl FromStr for Move {
    type Err = NotationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_move(s)
    }
}

/// Parses a `r,c->r,c` descriptor.
pub fn parse_move(s: &str) -> Result<Move, NotationError> {
    let (from, to) = s
        .split_once("->")
        .ok_or_else(|| NotationError::MissingSeparator(s.to_string()))?;
    let from = parse_square(from)?;
    let to = parse_square(to)?;
    if from == to {
        return Err(NotationError::SameSquare(from));
    }
    Ok(Move { from, to })
}

/// Parses `row,col` into an on-board square.
fn parse_square(s: &str) -> Result<Square, NotationError> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| NotationError::MissingComma(s.trim().to_string()))?;
    let row = parse_coord(row)?;
    let col = parse_coord(col)?;
    if row < 0 || col < 0 {
        return Err(NotationError::OutOfRange { row, col });
    }
    Square::new(row as usize, col as usize).ok_or(NotationError::OutOfRange { row, col })
}

fn parse_coord(s: &str) -> Result<i64, NotationError> {
    let t = s.trim();
    t.parse::<i64>()
        .map_err(|_| NotationError::InvalidNumber(t.to_string()))
}

/// Formats a move as its descriptor.
pub fn format_move(mv: &Move) -> String {
    mv.to_string()
}
