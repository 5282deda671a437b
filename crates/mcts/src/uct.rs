//! Classic rollout-based MCTS with UCT selection.
//!
//! Each iteration descends through fully expanded nodes with UCT, creates
//! one new child, plays a random rollout from it and backs the result up the
//! path. Node values are stored from the perspective of the player who moved
//! into the node, so a parent reads its children's statistics directly.

use crate::{
    agent::SearchEngine,
    config::MctsConfig,
    evaluator::rollout,
    node::{Backup, NodeStats, UctNode},
    result::{first_argmax, visit_policy, SearchResult, SearchStats},
    selection::uct_select,
    tree::{NodeId, Tree},
};
use ludus_core::{Game, LudusError, PlayerId, Result};
use rand::Rng;
use std::time::Instant;
use tracing::debug;

/// Rollout-driven MCTS.
///
/// Generic over:
/// - `G`: The game being played
/// - `R`: The random stream used for tie-breaking, expansion and rollouts
pub struct UctMcts<G: Game, R: Rng> {
    config: MctsConfig,
    rng: R,
    tree: Option<Tree<UctNode<G>>>,
}

impl<G: Game, R: Rng> UctMcts<G, R> {
    pub fn new(config: MctsConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            tree: None,
        }
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// Statistics of the current root, if a tree exists.
    pub fn root_stats(&self) -> Option<&NodeStats> {
        let tree = self.tree.as_ref()?;
        Some(&tree.get(tree.root()).stats)
    }

    /// Statistics of the root's child reached by `action`, if created.
    pub fn child_stats(&self, action: G::Action) -> Option<&NodeStats> {
        let tree = self.tree.as_ref()?;
        let child = tree.get(tree.root()).child_for(action)?;
        Some(&tree.get(child).stats)
    }

    /// Run a search from `state` on a fresh tree.
    ///
    /// # Errors
    /// - `InvalidConfig` if the configuration does not validate
    /// - `UnsupportedPlayerCount` for games with more than two players
    /// - `TerminalState` / `NoLegalActions` if there is nothing to decide
    pub fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        self.config.validate()?;
        let backup = Backup::for_players(game.num_players())?;
        if game.is_terminal(state) {
            return Err(LudusError::TerminalState);
        }
        if game.legal_actions(state).is_empty() {
            return Err(LudusError::NoLegalActions);
        }

        self.tree = Some(Tree::new(UctNode::new(game, state.clone(), None)));
        self.run(game, backup)
    }

    fn run(&mut self, game: &G, backup: Backup) -> Result<SearchResult<G::Action>> {
        let tree = self
            .tree
            .as_mut()
            .expect("BUG: run called without a tree");
        let root_player = game.player_to_move(&tree.get(tree.root()).state);
        let mut stats = SearchStats::default();
        let start = Instant::now();

        while !self.config.budget.exhausted(stats.iterations, start.elapsed()) {
            let reached_terminal =
                iterate(tree, &mut self.rng, game, &self.config, backup, root_player);
            if reached_terminal {
                stats.terminal_rollouts += 1;
            }
            stats.iterations += 1;
        }

        stats.nodes = tree.len();
        stats.elapsed = start.elapsed();
        debug!(
            iterations = stats.iterations,
            nodes = stats.nodes,
            terminal_rollouts = stats.terminal_rollouts,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            "rollout search finished"
        );

        Ok(extract_results(tree, stats))
    }
}

/// One select, expand, rollout, backup pass. Returns whether the rollout
/// ended in a terminal state.
fn iterate<G: Game, R: Rng>(
    tree: &mut Tree<UctNode<G>>,
    rng: &mut R,
    game: &G,
    config: &MctsConfig,
    backup: Backup,
    root_player: PlayerId,
) -> bool {
    let mut id = tree.root();
    let mut path = vec![id];

    // SELECT
    loop {
        let node = tree.get(id);
        if node.terminal || !node.is_fully_expanded() {
            break;
        }
        let children = node.children.iter().map(|slot| {
            let child = tree.get(slot.expect("BUG: fully expanded node with an empty slot"));
            (child.stats.value_sum, child.stats.visit_count)
        });
        let idx = uct_select(children, node.stats.visit_count, config.exploration, rng);
        id = node.children[idx].expect("BUG: selected an empty slot");
        path.push(id);
    }

    // EXPAND one uniformly chosen missing child
    if !tree.get(id).terminal {
        let node = tree.get(id);
        let mut chosen = None;
        let mut best_draw = -1.0f32;
        for (slot, child) in node.children.iter().enumerate() {
            if child.is_none() {
                let draw = rng.gen::<f32>();
                if draw > best_draw {
                    chosen = Some(slot);
                    best_draw = draw;
                }
            }
        }
        let slot = chosen.expect("BUG: expansion on a fully expanded node");
        let action = node.actions[slot];
        let child_state = game.apply(&node.state, action);

        let child_id = tree.add(UctNode::new(game, child_state, Some(action)));
        tree.get_mut(id).children[slot] = Some(child_id);
        id = child_id;
        path.push(id);
    }

    // ROLLOUT, scored for the root player
    let playout = rollout(
        game,
        &tree.get(id).state,
        root_player,
        config.max_rollout_depth,
        rng,
    );

    // BACKUP: a node at odd depth was entered by the root player
    let leaf_depth = path.len() - 1;
    let mut value = match backup {
        Backup::Negamax if leaf_depth % 2 == 0 => -playout.value,
        _ => playout.value,
    };
    for &node_id in path.iter().rev() {
        tree.get_mut(node_id).stats.record(value);
        value = backup.parent_value(value);
    }

    playout.terminal
}

fn extract_results<G: Game>(tree: &Tree<UctNode<G>>, stats: SearchStats) -> SearchResult<G::Action> {
    let root = tree.get(tree.root());

    let child_stats: Vec<Option<&NodeStats>> = root
        .children
        .iter()
        .map(|slot| slot.map(|id| &tree.get(id).stats))
        .collect();

    let visits: Vec<u32> = child_stats
        .iter()
        .map(|s| s.map_or(0, |s| s.visit_count))
        .collect();
    let means: Vec<f32> = child_stats
        .iter()
        .map(|s| s.map_or(0.0, |s| s.mean_value()))
        .collect();

    // Highest mean among tried children
    let best = first_argmax(child_stats.iter().map(|s| match s {
        Some(s) if s.visit_count > 0 => s.mean_value(),
        _ => f32::NEG_INFINITY,
    }))
    .expect("BUG: root has no actions");

    let total: u32 = visits.iter().sum();
    let root_value = if total > 0 {
        child_stats
            .iter()
            .flatten()
            .map(|s| s.value_sum)
            .sum::<f32>()
            / total as f32
    } else {
        0.0
    };

    SearchResult {
        best_action: root.actions[best],
        visit_counts: root.actions.iter().copied().zip(visits.iter().copied()).collect(),
        values: root.actions.iter().copied().zip(means).collect(),
        policy: visit_policy(&visits, &[]),
        root_value,
        stats,
    }
}

impl<G: Game, R: Rng> SearchEngine<G> for UctMcts<G, R> {
    fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        UctMcts::search(self, game, state)
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
            .validate()
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
fn descend<G: Game>(tree: &Tree<UctNode<G>>, game: &G, action: G::Action) -> Option<NodeId> {
    let mut id = tree.root();
    loop {
        let node = tree.get(id);
        if let Some(child) = node.child_for(action) {
            return Some(child);
        }
        match game.forced_action(&node.state) {
            Some(forced) if forced != action => id = node.child_for(forced)?,
            _ => return None,
        }
    }
}
