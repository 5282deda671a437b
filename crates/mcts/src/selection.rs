//! Child selection formulas.
//!
//! Both selectors are pure functions of node statistics plus an injected
//! random stream.

use crate::config::ZeroVisitRule;
use rand::Rng;

/// Guards the UCT divisions against unvisited children.
pub const UCT_EPSILON: f32 = 1e-6;

/// UCT score of one child.
///
/// `Q/(N+ε) + c·sqrt(ln(N_parent+1)/(N+ε)) + r·ε`, where `r` is a fresh
/// uniform draw in `[0, 1)` that only separates exact ties.
pub fn uct_score(value_sum: f32, visits: u32, parent_visits: u32, c: f32, r: f32) -> f32 {
    let n = visits as f32 + UCT_EPSILON;
    let ln_parent = (parent_visits as f32 + 1.0).ln();
    value_sum / n + c * (ln_parent / n).sqrt() + r * UCT_EPSILON
}

/// Index of the child with the highest UCT score.
///
/// `children` yields `(value_sum, visits)` per child.
///
/// # Panics
/// Panics if `children` is empty: the caller selected on an unexpanded or
/// corrupt node.
pub fn uct_select<R, I>(children: I, parent_visits: u32, c: f32, rng: &mut R) -> usize
where
    R: Rng,
    I: IntoIterator<Item = (f32, u32)>,
{
    let mut best = None;
    let mut best_score = f32::NEG_INFINITY;

    for (i, (value_sum, visits)) in children.into_iter().enumerate() {
        let score = uct_score(value_sum, visits, parent_visits, c, rng.gen::<f32>());
        if best.is_none() || score > best_score {
            best = Some(i);
            best_score = score;
        }
    }

    best.expect("BUG: UCT selection over an empty child set")
}

/// Index of the action with the highest PUCT score.
///
/// `Q(a) + c_puct · P(a) · sqrt(ΣN + EPS) / (1 + N(a))`, with `q` already
/// expressed from the selecting player's perspective. Ties go to the
/// earliest action. When no action has been visited and EPS is negative, an
/// action is sampled uniformly instead.
///
/// # Panics
/// Panics on an empty action set or mismatched slice lengths.
pub fn puct_select<R: Rng>(
    q: &[f32],
    visits: &[u32],
    priors: &[f32],
    c_puct: f32,
    eps: f32,
    rng: &mut R,
) -> usize {
    assert!(!priors.is_empty(), "BUG: PUCT selection over an empty action set");
    assert!(
        q.len() == priors.len() && visits.len() == priors.len(),
        "BUG: PUCT statistics have mismatched lengths"
    );

    let total: u32 = visits.iter().sum();
    let rule = ZeroVisitRule::from_eps(eps);
    if total == 0 && rule == ZeroVisitRule::Uniform {
        return rng.gen_range(0..priors.len());
    }

    let sqrt_total = (total as f32 + eps).max(0.0).sqrt();
    let mut best = 0;
    let mut best_score = f32::NEG_INFINITY;

    for a in 0..priors.len() {
        let score = q[a] + c_puct * priors[a] * sqrt_total / (1.0 + visits[a] as f32);
        if score > best_score {
            best = a;
            best_score = score;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_uct_prefers_unvisited() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let children = vec![(5.0, 5), (0.0, 0), (3.0, 4)];
        assert_eq!(uct_select(children, 9, 1.4, &mut rng), 1);
    }

    #[test]
    fn test_uct_exploits_with_zero_exploration() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let children = vec![(1.0, 4), (3.0, 4), (2.0, 4)];
        assert_eq!(uct_select(children, 12, 0.0, &mut rng), 1);
    }

    #[test]
    fn test_uct_breaks_ties_randomly() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut seen = [0u32; 3];
        for _ in 0..300 {
            let children = vec![(1.0, 2), (1.0, 2), (1.0, 2)];
            seen[uct_select(children, 6, 1.0, &mut rng)] += 1;
        }
        assert!(seen.iter().all(|&count| count > 50), "{:?}", seen);
    }

    #[test]
    #[should_panic(expected = "empty child set")]
    fn test_uct_empty_panics() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        uct_select(Vec::<(f32, u32)>::new(), 0, 1.0, &mut rng);
    }

    #[test]
    fn test_puct_positive_eps_picks_highest_prior() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let q = [0.0; 4];
        let n = [0; 4];
        let p = [0.1, 0.2, 0.6, 0.1];
        assert_eq!(puct_select(&q, &n, &p, 1.5, 1e-8, &mut rng), 2);
    }

    #[test]
    fn test_puct_zero_eps_picks_first_action() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let q = [0.0; 4];
        let n = [0; 4];
        let p = [0.1, 0.2, 0.6, 0.1];
        assert_eq!(puct_select(&q, &n, &p, 1.5, 0.0, &mut rng), 0);
    }

    #[test]
    fn test_puct_negative_eps_samples_uniformly() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let q = [0.0; 4];
        let n = [0; 4];
        let p = [0.7, 0.1, 0.1, 0.1];
        let trials = 10_000;
        let mut counts = [0usize; 4];
        for _ in 0..trials {
            counts[puct_select(&q, &n, &p, 1.5, -1e-3, &mut rng)] += 1;
        }
        for &count in &counts {
            let freq = count as f64 / trials as f64;
            assert!((freq - 0.25).abs() < 0.05, "{:?}", counts);
        }
    }

    #[test]
    fn test_puct_negative_eps_uses_formula_once_visited() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let q = [0.0, 0.9, 0.0];
        let n = [1, 1, 1];
        let p = [0.4, 0.3, 0.3];
        assert_eq!(puct_select(&q, &n, &p, 1.0, -1e-3, &mut rng), 1);
    }

    #[test]
    fn test_puct_balances_value_and_prior() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // A heavily visited action with a mediocre value loses to a fresh one.
        let q = [0.1, 0.0];
        let n = [50, 0];
        let p = [0.5, 0.5];
        assert_eq!(puct_select(&q, &n, &p, 1.5, 1e-8, &mut rng), 1);
    }
}
