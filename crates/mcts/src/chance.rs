//! Chance/decision MCTS for stochastic games.
//!
//! The tree alternates decision nodes, where the mover picks an action with
//! PUCT, and chance nodes, where one environment outcome is sampled per
//! visit. Expectations over outcomes are approximated by repeated sampling
//! across iterations, never computed in full.
//!
//! All values are kept from the perspective of the player to move at the
//! root (the target player). In two-player games a decision node belonging
//! to the opponent negates its Q-values before selecting.

use crate::{
    agent::SearchEngine,
    config::MctsConfig,
    evaluator::Evaluator,
    node::{Backup, ChanceNode, DecisionNode, StochasticNode, Visited},
    result::{first_argmax, visit_policy, SearchResult, SearchStats},
    selection::puct_select,
    tree::{NodeId, Tree},
};
use ludus_core::{LudusError, PlayerId, Result, StochasticGame};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// Draw one outcome of the environment step pending in `afterstate`.
///
/// Returns `None` when the afterstate has no randomness, i.e. it already is
/// the next decision state.
///
/// # Errors
/// `InvalidPolicy` if the declared probabilities are negative, non-finite or
/// all zero.
pub fn sample_outcome<G, R>(game: &G, afterstate: &G::State, rng: &mut R) -> Result<Option<G::Outcome>>
where
    G: StochasticGame,
    R: Rng + ?Sized,
{
    let outcomes = game.random_outcomes(afterstate);
    if outcomes.is_empty() {
        return Ok(None);
    }
    let dist = WeightedIndex::new(outcomes.iter().map(|(_, p)| *p)).map_err(|e| {
        LudusError::InvalidPolicy(format!("invalid outcome distribution: {}", e))
    })?;
    Ok(Some(outcomes[dist.sample(rng)].0))
}

/// The decision state reached from `afterstate` after resolving its
/// environment step with a sampled outcome.
pub fn resolve_chance<G, R>(game: &G, afterstate: &G::State, rng: &mut R) -> Result<G::State>
where
    G: StochasticGame,
    R: Rng + ?Sized,
{
    Ok(match sample_outcome(game, afterstate, rng)? {
        Some(outcome) => game.apply_outcome(afterstate, outcome),
        None => afterstate.clone(),
    })
}

/// Expectimax-flavored MCTS over decision and chance nodes.
pub struct ChanceMcts<G: StochasticGame, E: Evaluator<G>, R: Rng> {
    config: MctsConfig,
    evaluator: E,
    rng: R,
    tree: Option<Tree<StochasticNode<G>>>,
}

impl<G, E, R> ChanceMcts<G, E, R>
where
    G: StochasticGame,
    E: Evaluator<G>,
    R: Rng,
{
    pub fn new(config: MctsConfig, evaluator: E, rng: R) -> Self {
        Self {
            config,
            evaluator,
            rng,
            tree: None,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Run a search from the decision state `state`.
    ///
    /// # Errors
    /// - `InvalidConfig` for an invalid config or a time budget
    /// - `UnsupportedPlayerCount` for games with more than two players
    /// - `TerminalState` / `NoLegalActions` if there is nothing to decide
    /// - any error raised by the evaluator or by an invalid outcome list
    pub fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        self.config.validate_iteration_budget()?;
        let backup = Backup::for_players(game.num_players())?;
        if game.is_terminal(state) {
            return Err(LudusError::TerminalState);
        }
        if game.legal_actions(state).is_empty() {
            return Err(LudusError::NoLegalActions);
        }

        let tree = self
            .tree
            .insert(Tree::new(StochasticNode::Decision(DecisionNode::new(
                game,
                state.clone(),
            ))));
        let mut descent = Descent {
            game,
            evaluator: &self.evaluator,
            rng: &mut self.rng,
            tree,
            config: &self.config,
            target: game.player_to_move(state),
            two_player: backup == Backup::Negamax,
        };

        let start = Instant::now();
        let mut iterations = 0;
        while !self.config.budget.exhausted(iterations, start.elapsed()) {
            let root = descent.tree.root();
            descent.visit_decision(root, 0)?;
            iterations += 1;
        }

        let stats = SearchStats {
            iterations,
            nodes: descent.tree.len(),
            terminal_rollouts: 0,
            elapsed: start.elapsed(),
        };
        debug!(
            iterations = stats.iterations,
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "chance search finished"
        );

        Ok(extract_results(descent.tree, stats))
    }

    /// Number of visits recorded at the root decision node.
    pub fn root_visits(&self) -> Option<u32> {
        self.tree.as_ref().map(Tree::root_visits)
    }

    /// Visit counts of the root's chance children, keyed by action.
    pub fn root_chance_visits(&self) -> Vec<(G::Action, u32)> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        let root = decision(tree, tree.root());
        root.actions
            .iter()
            .filter_map(|a| {
                let id = root.children.get(a)?;
                Some((*a, chance(tree, *id).visits))
            })
            .collect()
    }
}

/// Borrowed state of one search: the pieces each recursive visit needs.
struct Descent<'a, G: StochasticGame, E, R> {
    game: &'a G,
    evaluator: &'a E,
    rng: &'a mut R,
    tree: &'a mut Tree<StochasticNode<G>>,
    config: &'a MctsConfig,
    target: PlayerId,
    two_player: bool,
}

impl<'a, G, E, R> Descent<'a, G, E, R>
where
    G: StochasticGame,
    E: Evaluator<G>,
    R: Rng,
{
    /// A mover's value expressed for the target player.
    fn for_target(&self, mover: PlayerId, value: f32) -> f32 {
        if self.two_player && mover != self.target {
            -value
        } else {
            value
        }
    }

    fn visit_decision(&mut self, id: NodeId, depth: usize) -> Result<f32> {
        let game = self.game;
        let node = decision(self.tree, id);

        if node.terminal {
            let value = game.score(&node.state, self.target);
            self.tree.get_mut(id).increment_visit();
            return Ok(value);
        }

        if !node.expanded {
            let actions = game.legal_actions(&node.state);
            assert!(
                !actions.is_empty(),
                "non-terminal state without legal actions; wrap the game in PassWrapped"
            );
            let evaluation = self.evaluator.evaluate(game, &node.state)?;
            evaluation.validate(actions.len())?;
            let value = self.for_target(node.mover, evaluation.value);

            let node = decision_mut(self.tree, id);
            node.expand(actions, evaluation.policy, value);
            node.increment_visit();
            return Ok(value);
        }

        if self.config.max_depth.map_or(false, |max| depth >= max) {
            let value = self.best_stored_value(id);
            self.tree.get_mut(id).increment_visit();
            return Ok(value);
        }

        let sign = if self.for_target(node.mover, 1.0) < 0.0 { -1.0 } else { 1.0 };
        let q: Vec<f32> = node.q.iter().map(|q| sign * q).collect();
        let idx = puct_select(
            &q,
            &node.n,
            &node.priors,
            self.config.exploration,
            self.config.zero_visit_eps,
            self.rng,
        );
        let action = node.actions[idx];

        let child = match node.children.get(&action).copied() {
            Some(child) => child,
            None => {
                let afterstate = game.apply(&node.state, action);
                let child = self
                    .tree
                    .add(StochasticNode::Chance(ChanceNode::new(game, afterstate, action)));
                decision_mut(self.tree, id).children.insert(action, child);
                child
            }
        };

        let value = self.visit_chance(child, depth)?;

        let node = decision_mut(self.tree, id);
        node.update(idx, value);
        node.increment_visit();
        Ok(value)
    }

    fn visit_chance(&mut self, id: NodeId, depth: usize) -> Result<f32> {
        let game = self.game;
        let node = chance(self.tree, id);

        let value = if node.terminal {
            game.score(&node.afterstate, self.target)
        } else {
            let outcome = sample_outcome(game, &node.afterstate, self.rng)?;
            let child = match node.children.get(&outcome).copied() {
                Some(child) => child,
                None => {
                    let next = match outcome {
                        Some(outcome) => game.apply_outcome(&node.afterstate, outcome),
                        None => node.afterstate.clone(),
                    };
                    let child = self
                        .tree
                        .add(StochasticNode::Decision(DecisionNode::new(game, next)));
                    chance_mut(self.tree, id).children.insert(outcome, child);
                    child
                }
            };
            self.visit_decision(child, depth + 1)?
        };

        // Sum only; the mean is taken at the parent decision node
        let node = chance_mut(self.tree, id);
        node.sum_of_values += value;
        node.increment_visit();
        Ok(value)
    }

    /// What the mover would pick among the actions it has tried, or the
    /// stored evaluation if it has tried none.
    fn best_stored_value(&self, id: NodeId) -> f32 {
        let node = decision(self.tree, id);
        let maximize = self.for_target(node.mover, 1.0) > 0.0;
        node.q
            .iter()
            .zip(&node.n)
            .filter(|&(_, &n)| n > 0)
            .map(|(&q, _)| q)
            .reduce(|a, b| if maximize { a.max(b) } else { a.min(b) })
            .unwrap_or(node.value)
    }
}

fn decision<G: StochasticGame>(tree: &Tree<StochasticNode<G>>, id: NodeId) -> &DecisionNode<G> {
    match tree.get(id) {
        StochasticNode::Decision(node) => node,
        StochasticNode::Chance(_) => panic!("BUG: expected a decision node"),
    }
}

fn decision_mut<G: StochasticGame>(
    tree: &mut Tree<StochasticNode<G>>,
    id: NodeId,
) -> &mut DecisionNode<G> {
    match tree.get_mut(id) {
        StochasticNode::Decision(node) => node,
        StochasticNode::Chance(_) => panic!("BUG: expected a decision node"),
    }
}

fn chance<G: StochasticGame>(tree: &Tree<StochasticNode<G>>, id: NodeId) -> &ChanceNode<G> {
    match tree.get(id) {
        StochasticNode::Chance(node) => node,
        StochasticNode::Decision(_) => panic!("BUG: expected a chance node"),
    }
}

fn chance_mut<G: StochasticGame>(
    tree: &mut Tree<StochasticNode<G>>,
    id: NodeId,
) -> &mut ChanceNode<G> {
    match tree.get_mut(id) {
        StochasticNode::Chance(node) => node,
        StochasticNode::Decision(_) => panic!("BUG: expected a chance node"),
    }
}

fn extract_results<G: StochasticGame>(
    tree: &Tree<StochasticNode<G>>,
    stats: SearchStats,
) -> SearchResult<G::Action> {
    let root = decision(tree, tree.root());

    let total: u32 = root.n.iter().sum();
    let best = if total > 0 {
        first_argmax(root.n.iter().copied())
    } else {
        first_argmax(root.priors.iter().copied())
    }
    .expect("BUG: root expanded without actions");

    let root_value = if total > 0 {
        root.q
            .iter()
            .zip(&root.n)
            .map(|(&q, &n)| q * n as f32)
            .sum::<f32>()
            / total as f32
    } else {
        root.value
    };

    SearchResult {
        best_action: root.actions[best],
        visit_counts: root
            .actions
            .iter()
            .copied()
            .zip(root.n.iter().copied())
            .collect(),
        values: root.actions.iter().copied().zip(root.q.iter().copied()).collect(),
        policy: visit_policy(&root.n, &root.priors),
        root_value,
        stats,
    }
}

impl<G, E, R> SearchEngine<G> for ChanceMcts<G, E, R>
where
    G: StochasticGame,
    E: Evaluator<G>,
    R: Rng,
{
    fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        ChanceMcts::search(self, game, state)
    }

    fn clear(&mut self) {
        self.tree = None;
    }
}
