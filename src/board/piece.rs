//! Piece colors and kinds.

use serde::{Deserialize, Serialize};

/// The two sides. Red is the first color in the tensor layout, black the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Red,
    Black,
}

impl Color {
    pub const fn opponent(self) -> Color {
        match self {
            Color::Red => Color::Black,
            Color::Black => Color::Red,
        }
    }

    /// The edge row this color starts on and defends.
    ///
    /// Red sets up on rows 0..=3 and black on rows 6..=9.
    pub const fn home_row(self) -> usize {
        match self {
            Color::Red => 0,
            Color::Black => 9,
        }
    }

    /// Row step of a man's forward move: black men advance toward row 0,
    /// red men toward row 9.
    pub const fn forward(self) -> i32 {
        match self {
            Color::Red => 1,
            Color::Black => -1,
        }
    }

    /// Parses `red` / `black` (case-insensitive).
    pub fn from_name(s: &str) -> Option<Color> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Some(Color::Red),
            "black" => Some(Color::Black),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Color::Red => "red",
            Color::Black => "black",
        }
    }
}

/// A piece on the board: a man, or a king once promoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    #[serde(default)]
    pub king: bool,
}

impl Piece {
    pub const fn man(color: Color) -> Piece {
        Piece { color, king: false }
    }

    pub const fn king(color: Color) -> Piece {
        Piece { color, king: true }
    }

    /// Parses a diagram symbol: `r`/`b` for men, `R`/`B` for kings.
    pub fn from_symbol(c: char) -> Option<Piece> {
        match c {
            'r' => Some(Piece::man(Color::Red)),
            'R' => Some(Piece::king(Color::Red)),
            'b' => Some(Piece::man(Color::Black)),
            'B' => Some(Piece::king(Color::Black)),
            _ => None,
        }
    }
}
