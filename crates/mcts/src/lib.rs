//! Generalized Monte Carlo Tree Search.
//!
//! This crate searches any game implementing the `ludus_core::Game` trait
//! family and returns a move together with a visit distribution.
//!
//! # Drivers
//!
//! - [`UctMcts`]: classic MCTS with UCT selection and random rollouts
//! - [`Mcts`]: PUCT selection driven by an [`Evaluator`] (rollouts or an
//!   external approximator), with optional root Dirichlet noise
//! - [`ChanceMcts`]: alternating decision and chance nodes for
//!   [`StochasticGame`](ludus_core::StochasticGame)s
//!
//! [`Agent`] wraps any driver, keeps its tree between moves and is the
//! intended caller-facing surface. [`PassWrapped`] and [`PassEvaluator`]
//! turn "no legal move" into an explicit pass.
//!
//! # Example
//!
//! ```
//! use ludus_mcts::{Agent, MctsConfig, UctMcts, games::TicTacToe};
//! use ludus_core::Game;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let game = TicTacToe;
//! let state = game.initial_state();
//!
//! let config = MctsConfig::with_iterations(200);
//! let engine = UctMcts::new(config.clone(), ChaCha8Rng::seed_from_u64(42));
//! let mut agent = Agent::with_config(engine, &config);
//!
//! let (action, distribution) = agent.choose_action(&game, &state).unwrap();
//! println!("Best action: {}", action);
//! assert_eq!(distribution.len(), 9);
//! ```

pub mod agent;
pub mod chance;
pub mod config;
pub mod evaluator;
pub mod games;
pub mod node;
pub mod pass;
pub mod result;
pub mod search;
pub mod selection;
pub mod tree;
pub mod uct;

pub use agent::{Agent, SearchEngine};
pub use chance::{resolve_chance, sample_outcome, ChanceMcts};
pub use config::{Budget, MctsConfig, ZeroVisitRule};
pub use evaluator::{rollout, Evaluation, Evaluator, RolloutEvaluator, UniformEvaluator};
pub use node::{Backup, NodeStats};
pub use pass::{PassAction, PassEvaluator, PassState, PassWrapped};
pub use result::{SearchResult, SearchStats};
pub use search::Mcts;
pub use tree::{NodeId, Tree};
pub use uct::UctMcts;
