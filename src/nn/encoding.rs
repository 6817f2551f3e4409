//! Board state -> tensor encoding for neural network inference.
//!
//! Produces a [10, 10, 5] f32 tensor, indexed `[row][col][channel]`, in the
//! layout the policy model was trained on:
//!
//!   [0] red man
//!   [1] red king
//!   [2] black man
//!   [3] black king
//!   [4] playable (dark) square, independent of occupancy
//!
//! The channel order and row-major layout are part of the model contract and
//! must not change.

use ndarray::Array3;

use crate::board::piece::{Color, Piece};
use crate::board::square::{BOARD_SIZE, PLAYABLE_SQUARES};
use crate::board::state::BoardState;

/// Number of feature channels per cell.
pub const NUM_CHANNELS: usize = 5;

/// Total number of values in one encoded board.
pub const TENSOR_LEN: usize = BOARD_SIZE * BOARD_SIZE * NUM_CHANNELS;

/// Model input shape including the batch dimension (NHWC).
pub const INPUT_SHAPE: [usize; 4] = [1, BOARD_SIZE, BOARD_SIZE, NUM_CHANNELS];

const CH_RED_MAN: usize = 0;
const CH_RED_KING: usize = 1;
const CH_BLACK_MAN: usize = 2;
const CH_BLACK_KING: usize = 3;
const CH_PLAYABLE: usize = 4;

/// An encoded board, shape [10, 10, 5].
pub type EncodedTensor = Array3<f32>;

/// Channel index for a piece.
#[inline]
fn piece_channel(piece: Piece) -> usize {
    match (piece.color, piece.king) {
        (Color::Red, false) => CH_RED_MAN,
        (Color::Red, true) => CH_RED_KING,
        (Color::Black, false) => CH_BLACK_MAN,
        (Color::Black, true) => CH_BLACK_KING,
    }
}

/// Encodes a board into its [10, 10, 5] tensor.
pub fn encode_board(board: &BoardState) -> EncodedTensor {
    let mut tensor = Array3::<f32>::zeros((BOARD_SIZE, BOARD_SIZE, NUM_CHANNELS));

    for &sq in PLAYABLE_SQUARES.iter() {
        let (r, c) = (sq.row as usize, sq.col as usize);
        tensor[[r, c, CH_PLAYABLE]] = 1.0;
        if let Some(piece) = board.piece_at(sq) {
            tensor[[r, c, piece_channel(piece)]] = 1.0;
        }
    }

    tensor
}

/// Encodes a board as a flat row-major buffer of [`TENSOR_LEN`] values,
/// ready to be shaped as [`INPUT_SHAPE`].
pub fn encode_flat(board: &BoardState) -> Vec<f32> {
    flatten(&encode_board(board))
}

/// Flattens an encoded tensor in logical (row, col, channel) order.
pub fn flatten(tensor: &EncodedTensor) -> Vec<f32> {
    tensor.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::square::Square;

    fn sq(r: usize, c: usize) -> Square {
        Square::new(r, c).unwrap()
    }

    #[test]
    fn tensor_shape() {
        let t = encode_board(&BoardState::empty());
        assert_eq!(t.shape(), &[BOARD_SIZE, BOARD_SIZE, NUM_CHANNELS]);
        assert_eq!(encode_flat(&BoardState::empty()).len(), TENSOR_LEN);
    }

    #[test]
    fn empty_board_only_has_playable_mask() {
        let t = encode_board(&BoardState::empty());
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                let playable = if (r + c) % 2 == 1 { 1.0 } else { 0.0 };
                assert_eq!(t[[r, c, CH_PLAYABLE]], playable);
                for ch in 0..CH_PLAYABLE {
                    assert_eq!(t[[r, c, ch]], 0.0);
                }
            }
        }
    }

    #[test]
    fn pieces_set_exactly_one_channel() {
        let mut board = BoardState::empty();
        board.place_piece(sq(6, 1), Piece::man(Color::Red));
        board.place_piece(sq(0, 1), Piece::king(Color::Red));
        board.place_piece(sq(3, 2), Piece::man(Color::Black));
        board.place_piece(sq(9, 8), Piece::king(Color::Black));
        let t = encode_board(&board);

        assert_eq!(t[[6, 1, CH_RED_MAN]], 1.0);
        assert_eq!(t[[0, 1, CH_RED_KING]], 1.0);
        assert_eq!(t[[3, 2, CH_BLACK_MAN]], 1.0);
        assert_eq!(t[[9, 8, CH_BLACK_KING]], 1.0);

        for (s, _) in board.pieces() {
            let set: f32 = (0..CH_PLAYABLE)
                .map(|ch| t[[s.row as usize, s.col as usize, ch]])
                .sum();
            assert_eq!(set, 1.0);
        }
    }

    #[test]
    fn playable_mask_ignores_occupancy() {
        let mut board = BoardState::empty();
        for &s in PLAYABLE_SQUARES.iter().take(20) {
            board.place_piece(s, Piece::man(Color::Black));
        }
        let full = encode_board(&board);
        let empty = encode_board(&BoardState::empty());
        for r in 0..BOARD_SIZE {
            for c in 0..BOARD_SIZE {
                assert_eq!(full[[r, c, CH_PLAYABLE]], empty[[r, c, CH_PLAYABLE]]);
            }
        }
    }

    #[test]
    fn encoding_is_deterministic() {
        let mut board = BoardState::empty();
        board.place_piece(sq(4, 5), Piece::man(Color::Red));
        board.place_piece(sq(5, 4), Piece::king(Color::Black));
        assert_eq!(encode_board(&board), encode_board(&board));
        assert_eq!(encode_flat(&board), encode_flat(&board));
    }

    #[test]
    fn flat_layout_is_row_major_channels_last() {
        let mut board = BoardState::empty();
        board.place_piece(sq(3, 2), Piece::man(Color::Black));
        let flat = encode_flat(&board);
        let base = (3 * BOARD_SIZE + 2) * NUM_CHANNELS;
        assert_eq!(&flat[base..base + NUM_CHANNELS], &[0.0, 0.0, 1.0, 0.0, 1.0]);
    }
}
