use std::fmt::Debug;
use std::hash::Hash;

use crate::types::PlayerId;

/// A game abstraction for tree search.
///
/// Any deterministic game with one or two players can be searched through
/// this trait. States are values: `apply` must return a new state and leave
/// its input untouched.
pub trait Game: Clone + Send + Sync {
    /// The game state (e.g., a board position)
    type State: Clone + Send;

    /// A game action (e.g., a cell index)
    type Action: Clone + Copy + Send + Eq + Hash + Debug;

    /// Returns the initial game state
    fn initial_state(&self) -> Self::State;

    /// Number of players taking part. Search supports 1 and 2.
    fn num_players(&self) -> usize;

    /// Returns all legal actions from the given state, in a stable order
    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action>;

    /// Applies an action, returning a new state (immutable operation)
    fn apply(&self, state: &Self::State, action: Self::Action) -> Self::State;

    /// Returns true if the game has ended
    fn is_terminal(&self, state: &Self::State) -> bool;

    /// The player whose turn it is in `state`
    fn player_to_move(&self, state: &Self::State) -> PlayerId;

    /// Value of `state` for `player`.
    ///
    /// Terminal states report the final result (+1 win, -1 loss, 0 draw for
    /// win/loss games). Non-terminal states may report a heuristic estimate;
    /// rollouts cut off by the depth limit use it as their value.
    fn score(&self, state: &Self::State, player: PlayerId) -> f32;

    /// The single action this state forces, if any.
    ///
    /// Plain games have none. Pass-wrapped games report the pass action when
    /// the mover has no legal move, so tree reuse can walk through it.
    fn forced_action(&self, _state: &Self::State) -> Option<Self::Action> {
        None
    }
}

/// A game in which the mover can be left without legal actions.
pub trait PassGame: Game {
    /// Hands the turn to the next player without changing the board.
    fn pass_to_next_player(&self, state: &Self::State) -> Self::State;
}

/// A game with environment-random transitions.
///
/// `Game::apply` returns the *afterstate*: the position after the agent's
/// decision and before the environment has acted. The environment step is
/// described by `random_outcomes` and resolved by `apply_outcome`.
pub trait StochasticGame: Game {
    /// Identifier of one random outcome (e.g., a die face)
    type Outcome: Clone + Copy + Send + Eq + Hash + Debug;

    /// Outcomes of the pending environment step with their probabilities.
    ///
    /// Probabilities sum to 1. An empty list means the afterstate is already
    /// the next decision state.
    fn random_outcomes(&self, afterstate: &Self::State) -> Vec<(Self::Outcome, f32)>;

    /// Resolve the pending environment step with `outcome`.
    fn apply_outcome(&self, afterstate: &Self::State, outcome: Self::Outcome) -> Self::State;
}
