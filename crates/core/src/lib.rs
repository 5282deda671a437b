//! Ludus Core - Game abstractions and common types
//!
//! This crate provides the traits a game implements to be searched by
//! `ludus-mcts`, together with the error type shared across the workspace.
//!
//! # Types
//!
//! - [`Game`] - Deterministic game capability
//! - [`PassGame`] - Games whose mover may have to pass
//! - [`StochasticGame`] - Games with environment-random transitions
//! - [`Policy`] - Probability distribution over actions (sums to 1.0)
//! - [`PlayerId`] - Seat index of a player

mod error;
mod game;
mod types;

pub use error::{LudusError, Result};
pub use game::{Game, PassGame, StochasticGame};
pub use types::{PlayerId, Policy, POLICY_SUM_TOLERANCE};
