//! Node types stored in the search arenas.
//!
//! Each driver owns its own node variant. They share the [`Visited`]
//! interface instead of a common base type.

use crate::tree::NodeId;
use ludus_core::{Game, LudusError, PlayerId, Result, StochasticGame};
use rustc_hash::FxHashMap;

/// Shared view of a node's visit counter.
pub trait Visited {
    fn visits(&self) -> u32;
    fn increment_visit(&mut self);
}

/// Visit count and accumulated value of a node.
#[derive(Clone, Debug, Default)]
pub struct NodeStats {
    pub visit_count: u32,
    pub value_sum: f32,
}

impl NodeStats {
    /// Mean value; 0.0 if the node has never been visited.
    pub fn mean_value(&self) -> f32 {
        if self.visit_count == 0 {
            0.0
        } else {
            self.value_sum / self.visit_count as f32
        }
    }

    pub fn record(&mut self, value: f32) {
        self.visit_count += 1;
        self.value_sum += value;
    }
}

/// Rule for carrying a value from a node to its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backup {
    /// One player: values are never sign-flipped.
    SinglePlayer,
    /// Two alternating players: the sign flips at every level.
    Negamax,
}

impl Backup {
    /// # Errors
    /// `UnsupportedPlayerCount` for anything but one or two players.
    pub fn for_players(num_players: usize) -> Result<Self> {
        match num_players {
            1 => Ok(Backup::SinglePlayer),
            2 => Ok(Backup::Negamax),
            n => Err(LudusError::UnsupportedPlayerCount(n)),
        }
    }

    /// The value one level up the tree.
    pub fn parent_value(self, value: f32) -> f32 {
        match self {
            Backup::SinglePlayer => value,
            Backup::Negamax => -value,
        }
    }
}

// ---------------------------------------------------------------------------
// Classic rollout tree
// ---------------------------------------------------------------------------

/// Node of the UCT rollout tree.
///
/// Children are slots aligned with `actions`; a slot stays `None` until
/// expansion creates it. `stats.value_sum` is kept from the perspective of the
/// player who moved into this node.
#[derive(Clone)]
pub struct UctNode<G: Game> {
    pub state: G::State,
    pub action: Option<G::Action>,
    pub terminal: bool,
    pub actions: Vec<G::Action>,
    pub children: Vec<Option<NodeId>>,
    pub stats: NodeStats,
}

impl<G: Game> UctNode<G> {
    /// # Panics
    /// Panics if a non-terminal state has no legal actions.
    pub fn new(game: &G, state: G::State, action: Option<G::Action>) -> Self {
        let terminal = game.is_terminal(&state);
        let actions = if terminal {
            Vec::new()
        } else {
            game.legal_actions(&state)
        };
        assert!(
            terminal || !actions.is_empty(),
            "non-terminal state without legal actions; wrap the game in PassWrapped"
        );
        let children = vec![None; actions.len()];
        Self {
            state,
            action,
            terminal,
            actions,
            children,
            stats: NodeStats::default(),
        }
    }

    pub fn is_fully_expanded(&self) -> bool {
        self.children.iter().all(Option::is_some)
    }

    pub fn child_for(&self, action: G::Action) -> Option<NodeId> {
        let slot = self.actions.iter().position(|a| *a == action)?;
        self.children[slot]
    }
}

impl<G: Game> Visited for UctNode<G> {
    fn visits(&self) -> u32 {
        self.stats.visit_count
    }

    fn increment_visit(&mut self) {
        self.stats.visit_count += 1;
    }
}

// ---------------------------------------------------------------------------
// Approximator (PUCT) tree
// ---------------------------------------------------------------------------

/// Node of the PUCT tree.
///
/// Per-action statistics live in the parent. `edge_values` and
/// `stats.value_sum` are from the perspective of this node's mover.
#[derive(Clone)]
pub struct PuctNode<G: Game> {
    pub state: G::State,
    pub action: Option<G::Action>,
    pub terminal: bool,
    pub expanded: bool,
    pub actions: Vec<G::Action>,
    /// Priors used by selection; at the root these may carry noise.
    pub priors: Vec<f32>,
    /// Priors as the evaluator returned them.
    pub raw_priors: Vec<f32>,
    pub edge_visits: Vec<u32>,
    pub edge_values: Vec<f32>,
    pub children: FxHashMap<G::Action, NodeId>,
    pub stats: NodeStats,
}

impl<G: Game> PuctNode<G> {
    pub fn new(game: &G, state: G::State, action: Option<G::Action>) -> Self {
        let terminal = game.is_terminal(&state);
        Self {
            state,
            action,
            terminal,
            expanded: false,
            actions: Vec::new(),
            priors: Vec::new(),
            raw_priors: Vec::new(),
            edge_visits: Vec::new(),
            edge_values: Vec::new(),
            children: FxHashMap::default(),
            stats: NodeStats::default(),
        }
    }

    /// Store the evaluator's priors and mark the node expanded.
    pub fn expand(&mut self, actions: Vec<G::Action>, priors: Vec<f32>) {
        debug_assert_eq!(actions.len(), priors.len());
        self.edge_visits = vec![0; actions.len()];
        self.edge_values = vec![0.0; actions.len()];
        self.actions = actions;
        self.raw_priors = priors.clone();
        self.priors = priors;
        self.expanded = true;
    }

    /// Mean value of each action for this node's mover; 0 when unvisited.
    pub fn q_values(&self) -> Vec<f32> {
        self.edge_visits
            .iter()
            .zip(&self.edge_values)
            .map(|(&n, &w)| if n == 0 { 0.0 } else { w / n as f32 })
            .collect()
    }
}

impl<G: Game> Visited for PuctNode<G> {
    fn visits(&self) -> u32 {
        self.stats.visit_count
    }

    fn increment_visit(&mut self) {
        self.stats.visit_count += 1;
    }
}

// ---------------------------------------------------------------------------
// Chance / decision tree
// ---------------------------------------------------------------------------

/// A state where an agent chooses among actions.
///
/// All values are from the perspective of the search's target player.
/// `q` is a true running mean per action.
#[derive(Clone)]
pub struct DecisionNode<G: StochasticGame> {
    pub state: G::State,
    pub mover: PlayerId,
    pub terminal: bool,
    pub expanded: bool,
    pub actions: Vec<G::Action>,
    pub priors: Vec<f32>,
    pub q: Vec<f32>,
    pub n: Vec<u32>,
    pub children: FxHashMap<G::Action, NodeId>,
    /// Evaluator value stored at expansion.
    pub value: f32,
    pub visits: u32,
}

impl<G: StochasticGame> DecisionNode<G> {
    pub fn new(game: &G, state: G::State) -> Self {
        Self {
            mover: game.player_to_move(&state),
            terminal: game.is_terminal(&state),
            state,
            expanded: false,
            actions: Vec::new(),
            priors: Vec::new(),
            q: Vec::new(),
            n: Vec::new(),
            children: FxHashMap::default(),
            value: 0.0,
            visits: 0,
        }
    }

    pub fn expand(&mut self, actions: Vec<G::Action>, priors: Vec<f32>, value: f32) {
        self.q = vec![0.0; actions.len()];
        self.n = vec![0; actions.len()];
        self.actions = actions;
        self.priors = priors;
        self.value = value;
        self.expanded = true;
    }

    /// Fold one more sampled value into the running mean of action `idx`.
    pub fn update(&mut self, idx: usize, value: f32) {
        let n = self.n[idx] as f32;
        self.q[idx] = (n * self.q[idx] + value) / (n + 1.0);
        self.n[idx] += 1;
    }
}

impl<G: StochasticGame> Visited for DecisionNode<G> {
    fn visits(&self) -> u32 {
        self.visits
    }

    fn increment_visit(&mut self) {
        self.visits += 1;
    }
}

/// The afterstate of one agent action, awaiting the environment.
///
/// Keeps a running sum of the values returned through it; the mean is taken
/// once, at the parent decision node.
#[derive(Clone)]
pub struct ChanceNode<G: StochasticGame> {
    pub afterstate: G::State,
    pub action: G::Action,
    pub terminal: bool,
    /// `None` keys the single child of an afterstate without randomness.
    pub children: FxHashMap<Option<G::Outcome>, NodeId>,
    pub sum_of_values: f32,
    pub visits: u32,
}

impl<G: StochasticGame> ChanceNode<G> {
    pub fn new(game: &G, afterstate: G::State, action: G::Action) -> Self {
        Self {
            terminal: game.is_terminal(&afterstate),
            afterstate,
            action,
            children: FxHashMap::default(),
            sum_of_values: 0.0,
            visits: 0,
        }
    }
}

impl<G: StochasticGame> Visited for ChanceNode<G> {
    fn visits(&self) -> u32 {
        self.visits
    }

    fn increment_visit(&mut self) {
        self.visits += 1;
    }
}

/// Arena entry of the chance-extended tree.
#[derive(Clone)]
pub enum StochasticNode<G: StochasticGame> {
    Decision(DecisionNode<G>),
    Chance(ChanceNode<G>),
}

impl<G: StochasticGame> Visited for StochasticNode<G> {
    fn visits(&self) -> u32 {
        match self {
            StochasticNode::Decision(node) => node.visits(),
            StochasticNode::Chance(node) => node.visits(),
        }
    }

    fn increment_visit(&mut self) {
        match self {
            StochasticNode::Decision(node) => node.increment_visit(),
            StochasticNode::Chance(node) => node.increment_visit(),
        }
    }
}
