//! Caller-facing agent with tree reuse.
//!
//! An [`Agent`] owns one search engine. Between decisions it remembers the
//! moves played since its last search and, when reuse is enabled, replays
//! them down the retained tree so the next search continues from the
//! subtree that was already built.

use crate::config::MctsConfig;
use crate::result::SearchResult;
use ludus_core::{Game, LudusError, Result};
use std::marker::PhantomData;
use tracing::trace;

/// A search driver the agent can call.
///
/// Only `search` is required. Drivers that can keep their tree between calls
/// also implement `advance_root` and `search_retained`.
pub trait SearchEngine<G: Game> {
    /// Search `state` on a fresh tree.
    fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>>;

    /// Re-root the retained tree at the child reached by `action`.
    ///
    /// Returns `false`, and drops the tree, if that child was never created.
    fn advance_root(&mut self, _game: &G, _action: G::Action) -> bool {
        false
    }

    /// The forced action of the retained root's state, if any.
    fn root_forced_action(&self, _game: &G) -> Option<G::Action> {
        None
    }

    /// Whether the retained root could stand for `state`: same mover and
    /// same actions in the same order. `false` when no tree is held.
    fn retained_matches(&self, _game: &G, _state: &G::State) -> bool {
        false
    }

    /// Continue searching from the retained root. `None` if no tree is held.
    fn search_retained(&mut self, _game: &G) -> Option<Result<SearchResult<G::Action>>> {
        None
    }

    /// Drop any retained tree.
    fn clear(&mut self) {}
}

/// Chooses moves for one seat of a game.
pub struct Agent<G: Game, S: SearchEngine<G>> {
    engine: S,
    reuse_tree: bool,
    /// Moves played since the last search, oldest first.
    pending: Vec<G::Action>,
    has_tree: bool,
    last_reused: bool,
    _game: PhantomData<G>,
}

impl<G: Game, S: SearchEngine<G>> Agent<G, S> {
    pub fn new(engine: S, reuse_tree: bool) -> Self {
        Self {
            engine,
            reuse_tree,
            pending: Vec::new(),
            has_tree: false,
            last_reused: false,
            _game: PhantomData,
        }
    }

    /// Agent with the reuse setting taken from `config`.
    pub fn with_config(engine: S, config: &MctsConfig) -> Self {
        Self::new(engine, config.reuse_tree)
    }

    pub fn engine(&self) -> &S {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut S {
        &mut self.engine
    }

    /// Whether the last search continued a retained tree.
    pub fn last_reused(&self) -> bool {
        self.last_reused
    }

    /// Report a move applied to the game, by any player.
    ///
    /// Every move between two searches must be reported, in order, for the
    /// retained tree to be found again. Forced moves may be omitted.
    pub fn record_move(&mut self, action: G::Action) {
        if self.reuse_tree && self.has_tree {
            self.pending.push(action);
        }
    }

    /// Forget the retained tree, e.g. at the start of a new game.
    pub fn new_episode(&mut self) {
        self.pending.clear();
        self.has_tree = false;
        self.last_reused = false;
        self.engine.clear();
    }

    /// Search `state` and return the full result.
    ///
    /// `state` must be the position reached by the moves recorded since the
    /// previous search.
    ///
    /// # Errors
    /// `TerminalState` when `state` is terminal, plus any error of the
    /// engine's search.
    pub fn search(&mut self, game: &G, state: &G::State) -> Result<SearchResult<G::Action>> {
        if game.is_terminal(state) {
            return Err(LudusError::TerminalState);
        }

        let retained = if self.reuse_tree && self.has_tree {
            self.replay_pending(game, state)
        } else {
            None
        };
        self.pending.clear();

        let result = match retained {
            Some(result) => {
                self.last_reused = true;
                result
            }
            None => {
                self.last_reused = false;
                self.engine.search(game, state)
            }
        };

        self.has_tree = self.reuse_tree && result.is_ok();
        result
    }

    /// Choose a move for `state`.
    ///
    /// Returns the chosen action and the normalized visit distribution over
    /// the available actions.
    pub fn choose_action(
        &mut self,
        game: &G,
        state: &G::State,
    ) -> Result<(G::Action, Vec<(G::Action, f32)>)> {
        let result = self.search(game, state)?;
        Ok((result.best_action, result.distribution()))
    }

    fn replay_pending(
        &mut self,
        game: &G,
        state: &G::State,
    ) -> Option<Result<SearchResult<G::Action>>> {
        for (i, &action) in self.pending.iter().enumerate() {
            if !self.engine.advance_root(game, action) {
                trace!(replayed = i, pending = self.pending.len(), "tree reuse miss");
                return None;
            }
        }

        // A forced pass is never the anchor unless the caller stands on it
        if game.forced_action(state).is_none() {
            while let Some(forced) = self.engine.root_forced_action(game) {
                if !self.engine.advance_root(game, forced) {
                    trace!("tree reuse miss on a forced move");
                    return None;
                }
            }
        }

        if !self.engine.retained_matches(game, state) {
            trace!("retained root does not match the searched state");
            self.engine.clear();
            return None;
        }

        let retained = self.engine.search_retained(game);
        if retained.is_some() {
            trace!(replayed = self.pending.len(), "tree reuse hit");
        }
        retained
    }
}
