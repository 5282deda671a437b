//! Pig, a two-player dice game.
//!
//! On their turn a player repeatedly rolls one die, adding each face to a
//! turn total. Rolling a 1 forfeits the turn total and passes the turn;
//! holding banks it. The first player whose bank reaches the goal wins.
//!
//! Rolling is split into the agent's decision (`Roll`) and the die throw
//! that follows it, which makes Pig the reference [`StochasticGame`].

use ludus_core::{Game, PlayerId, StochasticGame};
use std::fmt;

/// Goal of the standard game.
pub const DEFAULT_GOAL: u32 = 100;

/// Probability of each die face.
const FACE_PROBABILITY: f32 = 1.0 / 6.0;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PigAction {
    Roll,
    Hold,
}

impl fmt::Display for PigAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PigAction::Roll => write!(f, "roll"),
            PigAction::Hold => write!(f, "hold"),
        }
    }
}

/// A die face, 1 through 6.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Face(pub u8);

#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct PigState {
    banked: [u32; 2],
    turn_total: u32,
    current: u8,
    /// Set after `Roll` until the die is thrown.
    awaiting_die: bool,
}

impl PigState {
    pub fn banked(&self, player: PlayerId) -> u32 {
        self.banked[player.index()]
    }

    pub fn turn_total(&self) -> u32 {
        self.turn_total
    }

    /// Whether this is an afterstate waiting for a die throw.
    pub fn awaiting_die(&self) -> bool {
        self.awaiting_die
    }

    fn end_turn(&mut self) {
        self.turn_total = 0;
        self.current = 1 - self.current;
    }
}

impl fmt::Display for PigState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "P0 {} | P1 {} | P{} to move, turn total {}",
            self.banked[0], self.banked[1], self.current, self.turn_total
        )
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Pig {
    goal: u32,
}

impl Pig {
    /// # Panics
    /// Panics if `goal` is zero.
    pub fn new(goal: u32) -> Self {
        assert!(goal > 0, "Pig goal must be positive");
        Self { goal }
    }

    pub fn goal(&self) -> u32 {
        self.goal
    }

    /// Position with the given banks and turn total, `mover` to play.
    pub fn position(&self, banked: [u32; 2], turn_total: u32, mover: PlayerId) -> PigState {
        PigState {
            banked,
            turn_total,
            current: mover.0,
            awaiting_die: false,
        }
    }

    fn winner(&self, state: &PigState) -> Option<PlayerId> {
        (0..2)
            .find(|&p| state.banked[p] >= self.goal)
            .map(|p| PlayerId(p as u8))
    }
}

impl Default for Pig {
    fn default() -> Self {
        Self::new(DEFAULT_GOAL)
    }
}

impl Game for Pig {
    type State = PigState;
    type Action = PigAction;

    fn initial_state(&self) -> PigState {
        self.position([0, 0], 0, PlayerId::FIRST)
    }

    fn num_players(&self) -> usize {
        2
    }

    /// Holding is only offered once something has been rolled this turn.
    fn legal_actions(&self, state: &PigState) -> Vec<PigAction> {
        if self.is_terminal(state) || state.awaiting_die {
            return Vec::new();
        }
        if state.turn_total == 0 {
            vec![PigAction::Roll]
        } else {
            vec![PigAction::Roll, PigAction::Hold]
        }
    }

    fn apply(&self, state: &PigState, action: PigAction) -> PigState {
        let mut next = state.clone();
        match action {
            PigAction::Roll => next.awaiting_die = true,
            PigAction::Hold => {
                next.banked[state.current as usize] += state.turn_total;
                if next.banked[state.current as usize] >= self.goal {
                    next.turn_total = 0;
                } else {
                    next.end_turn();
                }
            }
        }
        next
    }

    fn is_terminal(&self, state: &PigState) -> bool {
        self.winner(state).is_some()
    }

    fn player_to_move(&self, state: &PigState) -> PlayerId {
        PlayerId(state.current)
    }

    /// ±1 once someone has won; otherwise the lead, counting the mover's
    /// unbanked turn total, as a fraction of the goal.
    fn score(&self, state: &PigState, player: PlayerId) -> f32 {
        if let Some(winner) = self.winner(state) {
            return if winner == player { 1.0 } else { -1.0 };
        }

        let mut totals = [state.banked[0] as f32, state.banked[1] as f32];
        totals[state.current as usize] += state.turn_total as f32;
        let own = totals[player.index()];
        let other = totals[1 - player.index()];
        ((own - other) / self.goal as f32).clamp(-1.0, 1.0)
    }
}

impl StochasticGame for Pig {
    type Outcome = Face;

    fn random_outcomes(&self, afterstate: &PigState) -> Vec<(Face, f32)> {
        if !afterstate.awaiting_die {
            return Vec::new();
        }
        (1..=6).map(|face| (Face(face), FACE_PROBABILITY)).collect()
    }

    fn apply_outcome(&self, afterstate: &PigState, outcome: Face) -> PigState {
        let mut next = afterstate.clone();
        next.awaiting_die = false;
        if outcome.0 == 1 {
            next.end_turn();
        } else {
            next.turn_total += outcome.0 as u32;
        }
        next
    }
}
