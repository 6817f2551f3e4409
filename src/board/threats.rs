//! Board queries used by the defensive evaluator.
//!
//! Capture rules belong to the host's rules engine, so the evaluator only
//! sees a position through [`BoardQuery`]. [`DiagonalThreats`] is a
//! self-contained adapter for hosts that do not supply their own.

use super::piece::Piece;
use super::square::{Square, DIAGONALS};
use super::state::BoardState;

/// Read-only view of a position plus next-ply capture threats.
pub trait BoardQuery {
    /// The piece on a square, if any.
    fn piece_at(&self, square: Square) -> Option<Piece>;

    /// Number of distinct captures that threaten the piece on `square` next ply.
    fn threat_count(&self, square: Square) -> u32;

    /// Whether the piece on `square` can be captured next ply.
    fn is_threatened(&self, square: Square) -> bool {
        self.threat_count(square) > 0
    }
}

/// Single-jump threat detection on a plain board.
///
/// A piece is threatened along a diagonal when the square behind it is
/// empty and an enemy piece can jump it from the front: an adjacent enemy
/// man moving forward, or an enemy king anywhere on the diagonal with only
/// empty squares between. Men never capture backwards.
#[derive(Debug, Clone, Copy)]
pub struct DiagonalThreats<'a> {
    board: &'a BoardState,
}

impl<'a> DiagonalThreats<'a> {
    pub fn new(board: &'a BoardState) -> Self {
        DiagonalThreats { board }
    }

    /// Returns true if an enemy of `target` can jump it moving along (dr, dc).
    fn attacked_along(&self, square: Square, target: Piece, dr: i32, dc: i32) -> bool {
        match square.offset(dr, dc) {
            Some(landing) if self.board.piece_at(landing).is_none() => {}
            _ => return false,
        }

        let mut distance = 1;
        let mut cursor = square.offset(-dr, -dc);
        while let Some(sq) = cursor {
            if let Some(attacker) = self.board.piece_at(sq) {
                if attacker.color == target.color {
                    return false;
                }
                return attacker.king || (distance == 1 && dr == attacker.color.forward());
            }
            distance += 1;
            cursor = sq.offset(-dr, -dc);
        }
        false
    }
}

impl BoardQuery for DiagonalThreats<'_> {
    fn piece_at(&self, square: Square) -> Option<Piece> {
        self.board.piece_at(square)
    }

    fn threat_count(&self, square: Square) -> u32 {
        let Some(target) = self.board.piece_at(square) else {
            return 0;
        };
        DIAGONALS
            .iter()
            .filter(|&&(dr, dc)| self.attacked_along(square, target, dr, dc))
            .count() as u32
    }
}
