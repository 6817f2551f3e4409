//! Text protocol handling.
//!
//! Move descriptor notation (`"r1,c1->r2,c2"`) and the command parser for the
//! line-oriented main loop.

pub mod notation;
pub mod parser;

pub use notation::{format_move, parse_move, Move, NotationError};
pub use parser::{parse_command, Command, GoParams};
