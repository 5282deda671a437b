//! Monte Carlo Tree Search with an approximator.
//!
//! Leaves are expanded in one shot: a single evaluator call supplies both the
//! leaf's value and the priors used by PUCT selection. Child states are only
//! produced when selection first descends into them.

use crate::{
    agent::SearchEngine,
    config::MctsConfig,
    evaluator::Evaluator,
    node::{Backup, PuctNode},
    result::{first_argmax, visit_policy, SearchResult, SearchStats},
    selection::puct_select,
    tree::{NodeId, Tree},
};
use ludus_core::{Game, LudusError, Result};
use rand::Rng;
use rand_distr::{Dirichlet, Distribution};
use std::time::Instant;
use tracing::debug;

/// Monte Carlo Tree Search with PUCT selection.
///
/// Generic over:
/// - `G`: The game being played
/// - `E`: The evaluation strategy (rollouts or an external approximator)
/// - `R`: The random number generator
pub struct Mcts<G: Game, E: Evaluator<G>, R: Rng> {
    config: MctsConfig,
    evaluator: E,
    rng: R,
    tree: Option<Tree<PuctNode<G>>>,
}

impl<G, E, R> Mcts<G, E, R>
where
    G: Game,
    E: Evaluator<G>,
    R: Rng,
{
    /// Create a new MCTS instance.
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

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Number of visits recorded at the current root.
    pub fn root_visits(&self) -> Option<u32> {
        self.tree.as_ref().map(Tree::root_visits)
    }

    /// Run MCTS from the given state on a fresh tree.
    ///
    /// The first iteration only expands the root, so after `K` iterations
    /// the root holds `K` visits and its actions `K - 1`.
    ///
    /// # Errors
    /// - `InvalidConfig` for an invalid config or a time budget
    /// - `UnsupportedPlayerCount` for games with more than two players
    /// - `TerminalState` / `NoLegalActions` if there is nothing to decide
    /// - any error raised by the evaluator, or `InvalidPolicy` if its policy
    ///   does not match the legal actions
    pub fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        self.config.validate_iteration_budget()?;
        let backup = Backup::for_players(game.num_players())?;
        if game.is_terminal(state) {
            return Err(LudusError::TerminalState);
        }
        if game.legal_actions(state).is_empty() {
            return Err(LudusError::NoLegalActions);
        }

        self.tree = Some(Tree::new(PuctNode::new(game, state.clone(), None)));
        self.run(game, backup)
    }

    fn run(&mut self, game: &G, backup: Backup) -> Result<SearchResult<G::Action>> {
        let mut noise_pending = self.config.exploration_fraction > 0.0;
        let mut iterations = 0;
        let start = Instant::now();

        while !self.config.budget.exhausted(iterations, start.elapsed()) {
            if noise_pending && self.root_expanded() {
                self.add_root_noise()?;
                noise_pending = false;
            }
            self.simulate(game, backup)?;
            iterations += 1;
        }

        let tree = self.tree.as_ref().expect("BUG: run called without a tree");
        let stats = SearchStats {
            iterations,
            nodes: tree.len(),
            terminal_rollouts: 0,
            elapsed: start.elapsed(),
        };
        debug!(
            iterations = stats.iterations,
            nodes = stats.nodes,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "puct search finished"
        );

        Ok(self.extract_results(stats))
    }

    fn root_expanded(&self) -> bool {
        self.tree
            .as_ref()
            .map_or(false, |tree| tree.get(tree.root()).expanded)
    }

    /// Run a single simulation: select -> expand -> backpropagate.
    fn simulate(&mut self, game: &G, backup: Backup) -> Result<()> {
        let tree = self.tree.as_mut().expect("BUG: simulate called without a tree");
        let mut path: Vec<(NodeId, usize)> = Vec::new();
        let mut current_id = tree.root();

        // SELECT down to a terminal or unexpanded node
        let leaf_value = loop {
            let node = tree.get(current_id);

            // Terminal values are read straight from the game, for the mover
            if node.terminal {
                break game.score(&node.state, game.player_to_move(&node.state));
            }

            // EXPAND with one evaluator call
            if !node.expanded {
                let actions = game.legal_actions(&node.state);
                assert!(
                    !actions.is_empty(),
                    "non-terminal state without legal actions; wrap the game in PassWrapped"
                );
                let evaluation = self.evaluator.evaluate(game, &node.state)?;
                evaluation.validate(actions.len())?;
                tree.get_mut(current_id).expand(actions, evaluation.policy);
                break evaluation.value;
            }

            let q = node.q_values();
            let idx = puct_select(
                &q,
                &node.edge_visits,
                &node.priors,
                self.config.exploration,
                self.config.zero_visit_eps,
                &mut self.rng,
            );
            let action = node.actions[idx];

            let child_id = match node.children.get(&action).copied() {
                Some(id) => id,
                None => {
                    let child_state = game.apply(&node.state, action);
                    let id = tree.add(PuctNode::new(game, child_state, Some(action)));
                    tree.get_mut(current_id).children.insert(action, id);
                    id
                }
            };

            path.push((current_id, idx));
            current_id = child_id;
        };

        // BACKPROPAGATE, flipping perspective per level for two players
        tree.get_mut(current_id).stats.record(leaf_value);
        let mut value = leaf_value;
        for &(parent_id, idx) in path.iter().rev() {
            value = backup.parent_value(value);
            let parent = tree.get_mut(parent_id);
            parent.edge_visits[idx] += 1;
            parent.edge_values[idx] += value;
            parent.stats.record(value);
        }

        Ok(())
    }

    /// Mix fresh Dirichlet noise into the root's evaluator priors.
    ///
    /// A root kept from an earlier search is re-noised from its raw priors,
    /// so noise never compounds across searches.
    fn add_root_noise(&mut self) -> Result<()> {
        let tree = self.tree.as_mut().expect("BUG: noise without a tree");
        let root_id = tree.root();
        let num_actions = tree.get(root_id).priors.len();

        // Dirichlet requires at least 2 elements
        if num_actions < 2 {
            return Ok(());
        }

        let alpha = vec![self.config.dirichlet_alpha; num_actions];
        let dirichlet = Dirichlet::new(&alpha)
            .map_err(|e| LudusError::InvalidConfig(format!("dirichlet noise: {}", e)))?;
        let noise: Vec<f32> = dirichlet.sample(&mut self.rng);

        let frac = self.config.exploration_fraction;
        let root = tree.get_mut(root_id);
        for ((prior, &raw), eta) in root.priors.iter_mut().zip(&root.raw_priors).zip(noise) {
            *prior = (1.0 - frac) * raw + frac * eta;
        }
        Ok(())
    }

    /// Extract search results from root node.
    fn extract_results(&self, stats: SearchStats) -> SearchResult<G::Action> {
        let tree = self.tree.as_ref().expect("BUG: no tree to read results from");
        let root = tree.get(tree.root());

        let total: u32 = root.edge_visits.iter().sum();
        let best = if total > 0 {
            first_argmax(root.edge_visits.iter().copied())
        } else {
            first_argmax(root.raw_priors.iter().copied())
        }
        .expect("BUG: root expanded without actions");

        SearchResult {
            best_action: root.actions[best],
            visit_counts: root
                .actions
                .iter()
                .copied()
                .zip(root.edge_visits.iter().copied())
                .collect(),
            values: root.actions.iter().copied().zip(root.q_values()).collect(),
            policy: visit_policy(&root.edge_visits, &root.raw_priors),
            root_value: root.stats.mean_value(),
            stats,
        }
    }
}

impl<G, E, R> SearchEngine<G> for Mcts<G, E, R>
where
    G: Game,
    E: Evaluator<G>,
    R: Rng,
{
    fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        Mcts::search(self, game, state)
    }

    fn advance_root(&mut self, game: &G, action: G::Action) -> bool {
        let Some(tree) = self.tree.as_mut() else {
            return false;
        };
        if let Some(child) = descend(tree, game, action) {
            tree.set_root(child);
            return true;
        }
        self.tree = None;
        false
    }

    fn root_forced_action(&self, game: &G) -> Option<G::Action> {
        let tree = self.tree.as_ref()?;
        game.forced_action(&tree.get(tree.root()).state)
    }

    fn retained_matches(&self, game: &G, state: &G::State) -> bool {
        let Some(tree) = self.tree.as_ref() else {
            return false;
        };
        let root = &tree.get(tree.root()).state;
        game.player_to_move(root) == game.player_to_move(state)
            && game.legal_actions(root) == game.legal_actions(state)
    }

    fn search_retained(&mut self, game: &G) -> Option<Result<SearchResult<G::Action>>> {
        let tree = self.tree.as_ref()?;
        if tree.get(tree.root()).terminal {
            return Some(Err(LudusError::TerminalState));
        }
        let backup = match self
            .config
            .validate_iteration_budget()
            .and_then(|_| Backup::for_players(game.num_players()))
        {
            Ok(backup) => backup,
            Err(e) => return Some(Err(e)),
        };
        Some(self.run(game, backup))
    }

    fn clear(&mut self) {
        self.tree = None;
    }
}

/// Child of the root reached by `action`, walking through forced moves the
/// caller did not report.
fn descend<G: Game>(tree: &Tree<PuctNode<G>>, game: &G, action: G::Action) -> Option<NodeId> {
    let mut id = tree.root();
    loop {
        let node = tree.get(id);
        if let Some(&child) = node.children.get(&action) {
            return Some(child);
        }
        match game.forced_action(&node.state) {
            Some(forced) if forced != action => id = *node.children.get(&forced)?,
            _ => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::{Evaluation, RolloutEvaluator, UniformEvaluator};
    use ludus_core::PlayerId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // Simple test game: race to 5
    // Players take turns adding 1 or 2. First to reach exactly 5 wins.
    // First player can always win with optimal play.
    #[derive(Clone)]
    struct RaceToFive;

    #[derive(Clone, PartialEq, Eq, Debug)]
    struct RaceState {
        count: u8,
        current_player: u8,
    }

    #[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
    struct RaceAction(u8); // 1 or 2

    impl Game for RaceToFive {
        type State = RaceState;
        type Action = RaceAction;

        fn initial_state(&self) -> Self::State {
            RaceState {
                count: 0,
                current_player: 0,
            }
        }

        fn num_players(&self) -> usize {
            2
        }

        fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action> {
            if state.count >= 5 {
                Vec::new()
            } else {
                let mut actions = vec![RaceAction(1)];
                if state.count + 2 <= 5 {
                    actions.push(RaceAction(2));
                }
                actions
            }
        }

        fn apply(&self, state: &Self::State, action: Self::Action) -> Self::State {
            RaceState {
                count: state.count + action.0,
                current_player: 1 - state.current_player,
            }
        }

        fn is_terminal(&self, state: &Self::State) -> bool {
            state.count >= 5
        }

        fn player_to_move(&self, state: &Self::State) -> PlayerId {
            PlayerId(state.current_player)
        }

        fn score(&self, state: &Self::State, player: PlayerId) -> f32 {
            if state.count < 5 {
                0.0
            } else if player.0 != state.current_player {
                // Player who just moved reached 5 and wins
                1.0
            } else {
                -1.0
            }
        }
    }

    /// Fails on every call.
    struct Broken;

    impl Evaluator<RaceToFive> for Broken {
        fn evaluate(&self, _game: &RaceToFive, _state: &RaceState) -> Result<Evaluation> {
            Err(LudusError::evaluator(std::io::Error::new(
                std::io::ErrorKind::Other,
                "model offline",
            )))
        }
    }

    /// Returns one prior too many.
    struct WrongLength;

    impl Evaluator<RaceToFive> for WrongLength {
        fn evaluate(&self, _game: &RaceToFive, _state: &RaceState) -> Result<Evaluation> {
            Ok(Evaluation {
                policy: vec![0.2, 0.2, 0.6],
                value: 0.0,
            })
        }
    }

    #[test]
    fn test_mcts_basic() {
        let config = MctsConfig::with_iterations(100);
        let rng = ChaCha8Rng::seed_from_u64(42);
        let evaluator = RolloutEvaluator::new(rng.clone(), 20);
        let mut mcts = Mcts::new(config, evaluator, rng);

        let game = RaceToFive;
        let result = mcts.search(&game, &game.initial_state()).unwrap();

        assert!(result.best_action == RaceAction(1) || result.best_action == RaceAction(2));
        let policy_sum: f32 = result.policy.iter().sum();
        assert!((policy_sum - 1.0).abs() < 0.01);

        // The first iteration stops at the root
        assert_eq!(result.total_visits(), 99);
        assert_eq!(mcts.root_visits(), Some(100));
    }

    #[test]
    fn test_mcts_deterministic() {
        let config = MctsConfig::with_iterations(50);

        let run_search = |seed: u64| {
            let rng = ChaCha8Rng::seed_from_u64(seed);
            let evaluator = RolloutEvaluator::new(rng.clone(), 20);
            let mut mcts = Mcts::new(config.clone(), evaluator, rng);

            let game = RaceToFive;
            mcts.search(&game, &game.initial_state()).unwrap()
        };

        let result1 = run_search(12345);
        let result2 = run_search(12345);

        assert_eq!(result1.best_action, result2.best_action);
        assert_eq!(result1.visit_counts, result2.visit_counts);
    }

    #[test]
    fn test_mcts_finds_winning_move() {
        // From 3, adding 2 wins on the spot.
        let game = RaceToFive;
        let state = RaceState {
            count: 3,
            current_player: 0,
        };
        let mut mcts = Mcts::new(
            MctsConfig::puct(200, 1.5),
            UniformEvaluator,
            ChaCha8Rng::seed_from_u64(0),
        );

        let result = mcts.search(&game, &state).unwrap();
        assert_eq!(result.best_action, RaceAction(2));
        let win_value = result
            .values
            .iter()
            .find(|(a, _)| *a == RaceAction(2))
            .map(|(_, v)| *v)
            .unwrap();
        assert_eq!(win_value, 1.0);
    }

    #[test]
    fn test_evaluator_error_is_propagated() {
        let game = RaceToFive;
        let mut mcts = Mcts::new(
            MctsConfig::with_iterations(10),
            Broken,
            ChaCha8Rng::seed_from_u64(0),
        );

        let err = mcts.search(&game, &game.initial_state()).unwrap_err();
        assert!(matches!(err, LudusError::Evaluator(_)));
    }

    #[test]
    fn test_wrong_policy_length_is_rejected() {
        let game = RaceToFive;
        let mut mcts = Mcts::new(
            MctsConfig::with_iterations(10),
            WrongLength,
            ChaCha8Rng::seed_from_u64(0),
        );

        let err = mcts.search(&game, &game.initial_state()).unwrap_err();
        assert!(matches!(err, LudusError::InvalidPolicy(_)));
    }

    #[test]
    fn test_time_budget_is_rejected() {
        let game = RaceToFive;
        let mut mcts = Mcts::new(
            MctsConfig::timed(10),
            UniformEvaluator,
            ChaCha8Rng::seed_from_u64(0),
        );

        let err = mcts.search(&game, &game.initial_state()).unwrap_err();
        assert!(matches!(err, LudusError::InvalidConfig(_)));
    }

    #[test]
    fn test_root_noise_keeps_distribution() {
        let game = RaceToFive;
        let mut config = MctsConfig::puct(64, 1.5);
        config.exploration_fraction = 0.25;
        let mut mcts = Mcts::new(config, UniformEvaluator, ChaCha8Rng::seed_from_u64(9));

        let result = mcts.search(&game, &game.initial_state()).unwrap();
        let tree = mcts.tree.as_ref().unwrap();
        let priors = &tree.get(tree.root()).priors;

        assert!((priors.iter().sum::<f32>() - 1.0).abs() < 1e-4);
        assert_ne!(priors[0], 0.5);
        assert!(result.typed_policy().is_ok());
    }

    #[test]
    fn test_kept_root_is_noised_from_raw_priors() {
        let game = RaceToFive;
        let mut config = MctsConfig::puct(32, 1.5);
        config.exploration_fraction = 0.25;
        config.dirichlet_alpha = 0.3;
        let frac = config.exploration_fraction;
        let mut mcts = Mcts::new(config, UniformEvaluator, ChaCha8Rng::seed_from_u64(4));

        mcts.search(&game, &game.initial_state()).unwrap();
        for round in 0..10 {
            SearchEngine::search_retained(&mut mcts, &game)
                .unwrap()
                .unwrap();

            let tree = mcts.tree.as_ref().unwrap();
            let root = tree.get(tree.root());
            assert_eq!(root.raw_priors, vec![0.5, 0.5]);
            assert!((root.priors.iter().sum::<f32>() - 1.0).abs() < 1e-4);
            for (&prior, &raw) in root.priors.iter().zip(&root.raw_priors) {
                let floor = (1.0 - frac) * raw;
                assert!(
                    prior >= floor - 1e-6 && prior <= floor + frac + 1e-6,
                    "round {}: prior {} outside one mix of raw {}",
                    round,
                    prior,
                    raw
                );
            }
        }
    }
}
