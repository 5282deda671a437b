//! Tic-tac-toe implementation for MCTS validation.
//!
//! Tic-tac-toe is a solved game where perfect play always results in a draw.
//! This makes it ideal for validating MCTS correctness:
//! - MCTS should never lose against any opponent
//! - Two MCTS players should always draw
//! - MCTS should find a win in one

use ludus_core::{Game, PlayerId, StochasticGame};
use std::fmt;

/// Tic-tac-toe player.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Get the opposing mark.
    pub fn opposite(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }

    /// X is the first seat, O the second.
    pub fn player(self) -> PlayerId {
        match self {
            Mark::X => PlayerId::FIRST,
            Mark::O => PlayerId::SECOND,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Tic-tac-toe board state.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TicTacToeState {
    /// Board: 9 cells, indexed 0-8 (row-major).
    /// ```text
    /// 0 | 1 | 2
    /// ---------
    /// 3 | 4 | 5
    /// ---------
    /// 6 | 7 | 8
    /// ```
    board: [Option<Mark>; 9],

    current: Mark,

    /// Cached winner (if any).
    winner: Option<Mark>,
}

impl TicTacToeState {
    /// Create a new empty board with X to move.
    pub fn new() -> Self {
        Self {
            board: [None; 9],
            current: Mark::X,
            winner: None,
        }
    }

    /// Build a position from the cells each mark occupies.
    ///
    /// The side to move is derived from the piece count: X moves when both
    /// sides have placed the same number of marks.
    pub fn from_cells(x: &[u8], o: &[u8]) -> Self {
        let mut state = Self::new();
        for &cell in x {
            state.board[cell as usize] = Some(Mark::X);
        }
        for &cell in o {
            state.board[cell as usize] = Some(Mark::O);
        }
        state.current = if x.len() > o.len() { Mark::O } else { Mark::X };
        state.winner = state.check_winner();
        state
    }

    pub fn current_mark(&self) -> Mark {
        self.current
    }

    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    /// Get the mark at a cell, if any.
    pub fn get(&self, cell: usize) -> Option<Mark> {
        self.board.get(cell).copied().flatten()
    }

    fn check_winner(&self) -> Option<Mark> {
        const LINES: [[usize; 3]; 8] = [
            [0, 1, 2], // top row
            [3, 4, 5], // middle row
            [6, 7, 8], // bottom row
            [0, 3, 6], // left column
            [1, 4, 7], // center column
            [2, 5, 8], // right column
            [0, 4, 8], // main diagonal
            [2, 4, 6], // anti-diagonal
        ];

        for line in LINES {
            if let Some(mark) = self.board[line[0]] {
                if self.board[line[1]] == Some(mark) && self.board[line[2]] == Some(mark) {
                    return Some(mark);
                }
            }
        }
        None
    }

    fn is_full(&self) -> bool {
        self.board.iter().all(|c| c.is_some())
    }
}

impl Default for TicTacToeState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicTacToeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            if row > 0 {
                writeln!(f, "-----------")?;
            }
            for col in 0..3 {
                if col > 0 {
                    write!(f, " | ")?;
                }
                match self.board[row * 3 + col] {
                    Some(mark) => write!(f, " {} ", mark)?,
                    None => write!(f, "   ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Tic-tac-toe action (cell index 0-8).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct TicTacToeAction(pub u8);

impl TicTacToeAction {
    pub fn row(self) -> u8 {
        self.0 / 3
    }

    pub fn col(self) -> u8 {
        self.0 % 3
    }
}

impl fmt::Display for TicTacToeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row(), self.col())
    }
}

/// Tic-tac-toe game implementation.
#[derive(Clone, Copy, Debug, Default)]
pub struct TicTacToe;

impl Game for TicTacToe {
    type State = TicTacToeState;
    type Action = TicTacToeAction;

    fn initial_state(&self) -> Self::State {
        TicTacToeState::new()
    }

    fn num_players(&self) -> usize {
        2
    }

    fn legal_actions(&self, state: &Self::State) -> Vec<Self::Action> {
        if state.winner.is_some() {
            return Vec::new();
        }
        state
            .board
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| TicTacToeAction(i as u8))
            .collect()
    }

    fn apply(&self, state: &Self::State, action: Self::Action) -> Self::State {
        debug_assert!(state.board[action.0 as usize].is_none(), "cell already taken");
        let mut new_state = state.clone();
        new_state.board[action.0 as usize] = Some(state.current);
        new_state.current = state.current.opposite();
        new_state.winner = new_state.check_winner();
        new_state
    }

    fn is_terminal(&self, state: &Self::State) -> bool {
        state.winner.is_some() || state.is_full()
    }

    fn player_to_move(&self, state: &Self::State) -> PlayerId {
        state.current.player()
    }

    /// +1 if `player` has three in a row, -1 if the opponent has, else 0.
    fn score(&self, state: &Self::State, player: PlayerId) -> f32 {
        match state.winner {
            Some(mark) if mark.player() == player => 1.0,
            Some(_) => -1.0,
            None => 0.0,
        }
    }
}

/// Tic-tac-toe has no environment step; every afterstate is already the
/// next decision state.
impl StochasticGame for TicTacToe {
    type Outcome = ();

    fn random_outcomes(&self, _afterstate: &Self::State) -> Vec<((), f32)> {
        Vec::new()
    }

    fn apply_outcome(&self, afterstate: &Self::State, _outcome: ()) -> Self::State {
        afterstate.clone()
    }
}
