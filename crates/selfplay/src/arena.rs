//! Players and the match loop.
//!
//! Every game is played on a [`StochasticGame`]; deterministic games simply
//! declare no random outcomes, so the same loop settles Pig's dice and
//! passes tic-tac-toe afterstates through untouched.

use clap::ValueEnum;
use ludus_core::{Game, PlayerId, Result, StochasticGame};
use ludus_mcts::{
    resolve_chance, Agent, ChanceMcts, Mcts, MctsConfig, RolloutEvaluator, SearchEngine, UctMcts,
    UniformEvaluator,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// The kinds of player the tool can seat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    /// Classic UCT with random rollouts.
    Uct,
    /// PUCT with rollout evaluation.
    Puct,
    /// Chance/decision search with the game's own score as evaluation.
    Chance,
    /// Uniformly random legal moves.
    Random,
}

impl AgentKind {
    /// Whether the agent searches through afterstates with random rollouts,
    /// which only works when no move leaves an environment step pending.
    pub fn needs_deterministic_game(self) -> bool {
        matches!(self, AgentKind::Uct | AgentKind::Puct)
    }
}

/// One seat at the table.
pub trait Player<G: Game> {
    /// Pick a move for `state`, the `ply`-th position of the game.
    fn choose(&mut self, game: &G, state: &G::State, ply: usize) -> Result<G::Action>;

    /// Called with every move played, by either seat.
    fn observe(&mut self, _action: G::Action) {}
}

/// A search agent that samples its move with the configured temperature.
pub struct SearchPlayer<G: Game, S: SearchEngine<G>> {
    agent: Agent<G, S>,
    config: MctsConfig,
    rng: ChaCha8Rng,
}

impl<G: Game, S: SearchEngine<G>> SearchPlayer<G, S> {
    pub fn new(engine: S, config: &MctsConfig, seed: u64) -> Self {
        Self {
            agent: Agent::with_config(engine, config),
            config: config.clone(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<G: Game, S: SearchEngine<G>> Player<G> for SearchPlayer<G, S> {
    fn choose(&mut self, game: &G, state: &G::State, ply: usize) -> Result<G::Action> {
        let result = self.agent.search(game, state)?;
        let temperature = self.config.effective_temperature(ply);
        Ok(result.select_action(temperature, &mut self.rng))
    }

    fn observe(&mut self, action: G::Action) {
        self.agent.record_move(action);
    }
}

pub struct RandomPlayer {
    rng: ChaCha8Rng,
}

impl RandomPlayer {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl<G: Game> Player<G> for RandomPlayer {
    fn choose(&mut self, game: &G, state: &G::State, _ply: usize) -> Result<G::Action> {
        let actions = game.legal_actions(state);
        if actions.is_empty() {
            return Err(ludus_core::LudusError::NoLegalActions);
        }
        Ok(actions[self.rng.gen_range(0..actions.len())])
    }
}

/// Seat a player of the given kind.
pub fn build_player<G>(kind: AgentKind, config: &MctsConfig, seed: u64) -> Box<dyn Player<G>>
where
    G: StochasticGame + 'static,
{
    let rng = ChaCha8Rng::seed_from_u64(seed);
    match kind {
        AgentKind::Uct => Box::new(SearchPlayer::new(
            UctMcts::<G, _>::new(config.clone(), rng),
            config,
            seed,
        )),
        AgentKind::Puct => {
            let evaluator = RolloutEvaluator::new(
                ChaCha8Rng::seed_from_u64(seed.wrapping_add(1)),
                config.max_rollout_depth,
            );
            Box::new(SearchPlayer::new(
                Mcts::<G, _, _>::new(config.clone(), evaluator, rng),
                config,
                seed,
            ))
        }
        AgentKind::Chance => Box::new(SearchPlayer::new(
            ChanceMcts::<G, _, _>::new(config.clone(), UniformEvaluator, rng),
            config,
            seed,
        )),
        AgentKind::Random => Box::new(RandomPlayer::new(seed)),
    }
}

/// How one game ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameOutcome {
    /// The winning seat; `None` for a draw or an unfinished game.
    pub winner: Option<PlayerId>,
    pub plies: usize,
    /// False if the ply limit stopped the game.
    pub finished: bool,
}

/// Play one game. `seats[i]` moves for player `i`.
///
/// # Errors
/// Any error raised by a player's search or by an invalid outcome list.
pub fn play_game<G: StochasticGame>(
    game: &G,
    seats: &mut [Box<dyn Player<G>>; 2],
    max_plies: usize,
    seed: u64,
) -> Result<GameOutcome> {
    let mut dice = ChaCha8Rng::seed_from_u64(seed);
    let mut state = game.initial_state();
    let mut plies = 0;

    while !game.is_terminal(&state) && plies < max_plies {
        let mover = game.player_to_move(&state).index();
        let action = seats[mover].choose(game, &state, plies)?;
        for seat in seats.iter_mut() {
            seat.observe(action);
        }
        let afterstate = game.apply(&state, action);
        state = resolve_chance(game, &afterstate, &mut dice)?;
        plies += 1;
    }

    let finished = game.is_terminal(&state);
    let winner = if finished {
        let score = game.score(&state, PlayerId::FIRST);
        if score > 0.0 {
            Some(PlayerId::FIRST)
        } else if score < 0.0 {
            Some(PlayerId::SECOND)
        } else {
            None
        }
    } else {
        None
    };
    debug!(plies, finished, ?winner, "game over");

    Ok(GameOutcome {
        winner,
        plies,
        finished,
    })
}
