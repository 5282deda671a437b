//! Tests verifying the searches play tic-tac-toe perfectly.
//!
//! Perfect play in tic-tac-toe means:
//! - Never losing against any opponent
//! - Always exploiting opponent mistakes
//! - Drawing against another perfect player

use ludus_core::{Game, PlayerId};
use ludus_mcts::{
    games::{Mark, TicTacToe, TicTacToeAction, TicTacToeState},
    Mcts, MctsConfig, RolloutEvaluator, UctMcts,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

type PuctPlayer = Mcts<TicTacToe, RolloutEvaluator<ChaCha8Rng>, ChaCha8Rng>;

/// Create a PUCT search with rollout evaluation and the given seed.
fn create_mcts(seed: u64, iterations: usize) -> PuctPlayer {
    let config = MctsConfig::puct(iterations, 1.25);
    let rng = ChaCha8Rng::seed_from_u64(seed);
    let evaluator = RolloutEvaluator::new(rng.clone(), 50);
    Mcts::new(config, evaluator, rng)
}

fn random_move(game: &TicTacToe, state: &TicTacToeState, rng: &mut ChaCha8Rng) -> TicTacToeAction {
    let actions = game.legal_actions(state);
    actions[rng.gen_range(0..actions.len())]
}

/// Play one game against a uniformly random opponent and return the final
/// state. The search plays `seat`.
fn play_vs_random(seat: Mark, seed: u64) -> TicTacToeState {
    let game = TicTacToe;
    let mut mcts = create_mcts(seed, 1000);
    let mut rng = ChaCha8Rng::seed_from_u64(seed + 1000);

    let mut state = game.initial_state();
    while !game.is_terminal(&state) {
        let action = if state.current_mark() == seat {
            mcts.search(&game, &state).unwrap().best_action
        } else {
            random_move(&game, &state, &mut rng)
        };
        state = game.apply(&state, action);
    }
    state
}

#[test]
fn test_mcts_never_loses_as_x() {
    for seed in 0..20 {
        let state = play_vs_random(Mark::X, seed);
        assert_ne!(
            state.winner(),
            Some(Mark::O),
            "lost as X with seed {}. Final state:\n{}",
            seed,
            state
        );
    }
}

#[test]
fn test_mcts_never_loses_as_o() {
    for seed in 0..20 {
        let state = play_vs_random(Mark::O, seed);
        assert_ne!(
            state.winner(),
            Some(Mark::X),
            "lost as O with seed {}. Final state:\n{}",
            seed,
            state
        );
    }
}

/// Two rollout searches with enough iterations always draw.
#[test]
fn test_uct_vs_uct_always_draws() {
    let game = TicTacToe;

    for seed in 0..5 {
        let mut uct_x = UctMcts::new(
            MctsConfig::with_iterations(3000),
            ChaCha8Rng::seed_from_u64(seed),
        );
        let mut uct_o = UctMcts::new(
            MctsConfig::with_iterations(3000),
            ChaCha8Rng::seed_from_u64(seed + 500),
        );

        let mut state = game.initial_state();
        while !game.is_terminal(&state) {
            let result = match state.current_mark() {
                Mark::X => uct_x.search(&game, &state),
                Mark::O => uct_o.search(&game, &state),
            }
            .unwrap();
            state = game.apply(&state, result.best_action);
        }

        assert_eq!(
            game.score(&state, PlayerId(0)),
            0.0,
            "expected a draw with seed {}. Final state:\n{}",
            seed,
            state
        );
    }
}

#[test]
fn test_mcts_finds_winning_move() {
    let game = TicTacToe;
    let mut mcts = create_mcts(42, 500);

    // X _ X
    // O O _
    // _ _ _
    // X to move, cell 1 wins
    let state = TicTacToeState::from_cells(&[0, 2], &[3, 4]);

    let result = mcts.search(&game, &state).unwrap();

    assert_eq!(
        result.best_action,
        TicTacToeAction(1),
        "should find winning move at cell 1"
    );
}

#[test]
fn test_mcts_blocks_winning_move() {
    let game = TicTacToe;
    let mut mcts = create_mcts(42, 1000);

    // X X _
    // O _ _
    // _ _ _
    // O to move must block at 2
    let state = TicTacToeState::from_cells(&[0, 1], &[3]);

    let result = mcts.search(&game, &state).unwrap();

    assert_eq!(
        result.best_action,
        TicTacToeAction(2),
        "should block X's winning move at cell 2"
    );
}

#[test]
fn test_uct_blocks_winning_move() {
    let game = TicTacToe;
    let mut uct = UctMcts::new(MctsConfig::with_iterations(2000), ChaCha8Rng::seed_from_u64(42));
    let state = TicTacToeState::from_cells(&[0, 1], &[3]);

    let result = uct.search(&game, &state).unwrap();

    assert_eq!(result.best_action, TicTacToeAction(2));
}

/// Same seed, same game.
#[test]
fn test_mcts_deterministic() {
    let game = TicTacToe;

    let play_game = |seed: u64| -> Vec<TicTacToeAction> {
        let mut mcts = create_mcts(seed, 100);
        let mut state = game.initial_state();
        let mut moves = Vec::new();

        while !game.is_terminal(&state) {
            let result = mcts.search(&game, &state).unwrap();
            moves.push(result.best_action);
            state = game.apply(&state, result.best_action);
        }
        moves
    };

    let game1 = play_game(12345);
    let game2 = play_game(12345);

    assert_eq!(game1, game2, "same seed should produce identical games");
}

/// X can force at least a draw from the empty board.
#[test]
fn test_mcts_starting_position_value() {
    let game = TicTacToe;
    let mut mcts = create_mcts(42, 1000);

    let state = game.initial_state();
    let result = mcts.search(&game, &state).unwrap();

    assert!(
        result.root_value >= -0.3,
        "starting position value should be >= -0.3, got {}",
        result.root_value
    );

    // Corners and center are the strong openings
    let corner_and_center: f32 = [0usize, 2, 4, 6, 8]
        .iter()
        .map(|&i| result.policy[i])
        .sum();

    assert!(
        corner_and_center > 0.3,
        "opening policy should favor corners/center, but total was {}",
        corner_and_center
    );
}
