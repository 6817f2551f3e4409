//! Action-space indexing for the policy head.
//!
//! Every ordered pair of playable squares gets an index
//! `origin * 50 + destination` in `[0, 2500)`. The space is purely
//! combinatorial: most indices are never legal checkers moves, and the
//! policy output is masked down to the legal set by the selector. Distinct
//! landing squares get distinct indices, so flying-king moves are covered.

use crate::board::square::{Square, PLAYABLE_COUNT};
use crate::protocol::notation::{parse_move, Move};

/// Size of the policy output: one score per ordered pair of playable squares.
pub const ACTION_SPACE: usize = PLAYABLE_COUNT * PLAYABLE_COUNT;

/// Maps an origin/destination pair to its action index.
///
/// Returns None if either square is not playable.
#[inline]
pub fn encode_move(from: Square, to: Square) -> Option<usize> {
    Some(from.index()? * PLAYABLE_COUNT + to.index()?)
}

/// Inverse of [`encode_move`]. Returns None for indices outside the action space.
pub fn decode_action(index: usize) -> Option<(Square, Square)> {
    if index >= ACTION_SPACE {
        return None;
    }
    let from = Square::from_index(index / PLAYABLE_COUNT)?;
    let to = Square::from_index(index % PLAYABLE_COUNT)?;
    Some((from, to))
}

/// Action index of a parsed move.
pub fn move_to_action(mv: &Move) -> Option<usize> {
    encode_move(mv.from, mv.to)
}

/// Parses a descriptor and maps it to its action index in one step.
///
/// Returns None for malformed descriptors and for moves touching light squares.
pub fn descriptor_to_action(descriptor: &str) -> Option<usize> {
    let mv = parse_move(descriptor).ok()?;
    move_to_action(&mv)
}
