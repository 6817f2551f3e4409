//! checkmind agent library.
//!
//! Exposes the board representation, the policy network interface, the
//! defensive evaluator, move selection and the protocol modules for use by
//! integration tests and the binary entry point.

pub mod board;
pub mod config;
pub mod engine;
pub mod eval;
pub mod nn;
pub mod protocol;
pub mod search;
