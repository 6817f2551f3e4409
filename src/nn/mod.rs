//! Neural network interface encoding.
//!
//! Converts a `BoardState` into the [10, 10, 5] input tensor expected by the
//! trained policy network, and maps moves to and from the 2500-wide action
//! space of its output.

pub mod action;
pub mod encoding;

pub use action::{decode_action, descriptor_to_action, encode_move, ACTION_SPACE};
pub use encoding::{encode_board, encode_flat, EncodedTensor, INPUT_SHAPE, NUM_CHANNELS};
