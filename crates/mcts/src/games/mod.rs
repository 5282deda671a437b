//! Reference games for MCTS validation.
//!
//! Tic-tac-toe exercises the deterministic drivers; Pig exercises the
//! chance/decision driver.

pub mod pig;
pub mod tictactoe;

pub use pig::{Face, Pig, PigAction, PigState};
pub use tictactoe::{Mark, TicTacToe, TicTacToeAction, TicTacToeState};
