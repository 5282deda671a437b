//! Pass-wrapping facade.
//!
//! [`PassWrapped`] presents a state whose mover has no legal action as a
//! state with exactly one action, [`PassAction::Pass`]. Search code above it
//! never needs to special-case "no legal moves".

use crate::evaluator::{Evaluation, Evaluator};
use ludus_core::{Game, PassGame, PlayerId, Result};
use std::cell::OnceCell;
use std::fmt;

/// An action of a pass-wrapped game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassAction<A> {
    /// Hand the turn to the next player.
    Pass,
    /// An ordinary move of the underlying game.
    Play(A),
}

impl<A: fmt::Display> fmt::Display for PassAction<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassAction::Pass => write!(f, "pass"),
            PassAction::Play(action) => write!(f, "{}", action),
        }
    }
}

/// A state of the underlying game plus its lazily computed action list.
#[derive(Clone, Debug)]
pub struct PassState<S, A> {
    inner: S,
    actions: OnceCell<Vec<PassAction<A>>>,
}

impl<S, A> PassState<S, A> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            actions: OnceCell::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: PartialEq, A> PartialEq for PassState<S, A> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

/// Wraps a [`PassGame`] so that forced passes look like ordinary moves.
#[derive(Clone, Debug, Default)]
pub struct PassWrapped<G> {
    game: G,
}

impl<G: PassGame> PassWrapped<G> {
    pub fn new(game: G) -> Self {
        Self { game }
    }

    pub fn inner(&self) -> &G {
        &self.game
    }

    pub fn wrap(&self, state: G::State) -> PassState<G::State, G::Action> {
        PassState::new(state)
    }

    /// Actions offered in `state`: `[Pass]` when the mover has no legal
    /// move, otherwise the underlying legal actions in their order.
    pub fn available_actions<'s>(
        &self,
        state: &'s PassState<G::State, G::Action>,
    ) -> &'s [PassAction<G::Action>] {
        state.actions.get_or_init(|| {
            let legal = self.game.legal_actions(&state.inner);
            if legal.is_empty() {
                vec![PassAction::Pass]
            } else {
                legal.into_iter().map(PassAction::Play).collect()
            }
        })
    }

    /// Whether the mover has no legal action and must pass.
    pub fn must_pass(&self, state: &PassState<G::State, G::Action>) -> bool {
        matches!(self.available_actions(state), [PassAction::Pass])
    }
}

impl<G: PassGame> Game for PassWrapped<G> {
    type State = PassState<G::State, G::Action>;
    type Action = PassAction<G::Action>;

    fn initial_state(&self) -> Self::State {
        self.wrap(self.game.initial_state())
    }

    fn num_players(&self) -> usize {
        self.game.num_players()
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action> {
        if self.is_terminal(state) {
            return Vec::new();
        }
        self.available_actions(state).to_vec()
    }

    fn apply(&self, state: &Self::State, action: Self::Action) -> Self::State {
        match action {
            PassAction::Pass => self.wrap(self.game.pass_to_next_player(&state.inner)),
            PassAction::Play(action) => self.wrap(self.game.apply(&state.inner, action)),
        }
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        self.game.is_terminal(&state.inner)
    }

    fn player_to_move(&self, state: &Self::State) -> PlayerId {
        self.game.player_to_move(&state.inner)
    }

    fn score(&self, state: &Self::State, player: PlayerId) -> f32 {
        self.game.score(&state.inner, player)
    }

    fn forced_action(&self, state: &Self::State) -> Option<Self::Action> {
        if !self.is_terminal(state) && self.must_pass(state) {
            Some(PassAction::Pass)
        } else {
            None
        }
    }
}

/// Lifts an evaluator of `G` to an evaluator of `PassWrapped<G>`.
///
/// A forced pass is evaluated one ply ahead: the opponent's position is
/// evaluated, its value negated, and the whole policy mass put on the pass.
#[derive(Clone, Debug, Default)]
pub struct PassEvaluator<E> {
    inner: E,
}

impl<E> PassEvaluator<E> {
    pub fn new(inner: E) -> Self {
        Self { inner }
    }
}

impl<G, E> Evaluator<PassWrapped<G>> for PassEvaluator<E>
where
    G: PassGame,
    E: Evaluator<G>,
{
    /// # Panics
    /// Panics on a forced pass in a game that is not two-player.
    fn evaluate(
        &self,
        game: &PassWrapped<G>,
        state: &PassState<G::State, G::Action>,
    ) -> Result<Evaluation> {
        if !game.must_pass(state) {
            return self.inner.evaluate(game.inner(), state.inner());
        }

        assert_eq!(
            game.num_players(),
            2,
            "forced-pass evaluation is only defined for two-player games"
        );
        let passed = game.inner().pass_to_next_player(state.inner());
        let opponent_view = self.inner.evaluate(game.inner(), &passed)?;

        Ok(Evaluation {
            policy: vec![1.0],
            value: -opponent_view.value,
        })
    }
}
