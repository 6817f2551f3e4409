//! Move selection.
//!
//! Intersects the policy network's output with the host-supplied legal moves
//! and picks one deterministically, with an optional exploration layer.

pub mod selector;

pub use selector::{
    select_move, FallbackReason, MoveSelector, SelectError, Selection, SelectionSource,
    SelectorConfig,
};
