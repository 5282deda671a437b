//! Evaluation abstraction for MCTS.
//!
//! The `Evaluator` trait allows swapping between different evaluation strategies:
//! - `RolloutEvaluator`: uniform priors and a random playout
//! - `UniformEvaluator`: uniform priors and the game's own score
//! - an external position evaluator returning (value, policy)

use ludus_core::{Game, LudusError, PlayerId, Policy, Result};
use rand::Rng;
use std::cell::RefCell;

/// Evaluation result: prior policy + value estimate.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    /// Prior probability for each legal action, aligned with
    /// `game.legal_actions(state)`.
    pub policy: Vec<f32>,

    /// Value estimate from the perspective of the player to move.
    pub value: f32,
}

impl Evaluation {
    /// Check the policy against the number of legal actions.
    ///
    /// # Errors
    /// `InvalidPolicy` if the length differs or the entries do not form a
    /// distribution.
    pub fn validate(&self, num_actions: usize) -> Result<()> {
        if self.policy.len() != num_actions {
            return Err(LudusError::InvalidPolicy(format!(
                "evaluator returned {} priors for {} legal actions",
                self.policy.len(),
                num_actions
            )));
        }
        Policy::new(self.policy.clone()).map(|_| ())
    }
}

/// Trait for evaluating game positions.
///
/// Errors are handed back to the caller of the search unchanged; the search
/// never retries an evaluation.
pub trait Evaluator<G: Game> {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation>;
}

impl<G: Game, E: Evaluator<G>> Evaluator<G> for &E {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        (**self).evaluate(game, state)
    }
}

/// Outcome of one random playout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rollout {
    /// Score of the final state for the reference player.
    pub value: f32,
    /// Number of moves played.
    pub depth: usize,
    /// Whether the playout reached a terminal state.
    pub terminal: bool,
}

/// Play uniformly random moves from `state` until the game ends or
/// `max_depth` moves were made.
///
/// The result is scored for `reference`, normally the player to move at the
/// search root rather than at `state`.
///
/// # Panics
/// Panics if a non-terminal state has no legal actions.
pub fn rollout<G: Game, R: Rng>(
    game: &G,
    state: &G::State,
    reference: PlayerId,
    max_depth: usize,
    rng: &mut R,
) -> Rollout {
    let mut state = state.clone();
    let mut depth = 0;

    while !game.is_terminal(&state) && depth < max_depth {
        let legal_actions = game.legal_actions(&state);
        assert!(
            !legal_actions.is_empty(),
            "non-terminal state without legal actions; wrap the game in PassWrapped"
        );

        let action = legal_actions[rng.gen_range(0..legal_actions.len())];
        state = game.apply(&state, action);
        depth += 1;
    }

    Rollout {
        value: game.score(&state, reference),
        depth,
        terminal: game.is_terminal(&state),
    }
}

fn uniform_policy(num_actions: usize) -> Vec<f32> {
    if num_actions == 0 {
        Vec::new()
    } else {
        vec![1.0 / num_actions as f32; num_actions]
    }
}

/// Evaluator using uniform prior and random rollouts.
pub struct RolloutEvaluator<R: Rng> {
    /// Random number generator (wrapped in RefCell for interior mutability).
    rng: RefCell<R>,

    /// Maximum depth for random rollouts.
    max_rollout_depth: usize,
}

impl<R: Rng> RolloutEvaluator<R> {
    /// # Arguments
    /// * `rng` - Random number generator for rollouts
    /// * `max_rollout_depth` - Maximum moves in a random playout
    pub fn new(rng: R, max_rollout_depth: usize) -> Self {
        Self {
            rng: RefCell::new(rng),
            max_rollout_depth,
        }
    }
}

impl<G: Game, R: Rng> Evaluator<G> for RolloutEvaluator<R> {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        let num_actions = game.legal_actions(state).len();
        let mover = game.player_to_move(state);
        let playout = rollout(
            game,
            state,
            mover,
            self.max_rollout_depth,
            &mut *self.rng.borrow_mut(),
        );

        Ok(Evaluation {
            policy: uniform_policy(num_actions),
            value: playout.value,
        })
    }
}

/// Evaluator with uniform priors that trusts the game's own score.
///
/// Useful for stochastic games, where random playouts through afterstates
/// are not available, and as a deterministic baseline in tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformEvaluator;

impl<G: Game> Evaluator<G> for UniformEvaluator {
    fn evaluate(&self, game: &G, state: &G::State) -> Result<Evaluation> {
        let num_actions = game.legal_actions(state).len();
        Ok(Evaluation {
            policy: uniform_policy(num_actions),
            value: game.score(state, game.player_to_move(state)),
        })
    }
}
