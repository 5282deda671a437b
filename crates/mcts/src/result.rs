//! What a search reports back to its caller.

use ludus_core::{Policy, Result};
use rand::Rng;
use std::hash::Hash;
use std::time::Duration;

/// Diagnostics of one top-level search. Reset on every call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SearchStats {
    /// Iterations run by this call.
    pub iterations: usize,

    /// Nodes in the arena when the search finished, retained ones included.
    pub nodes: usize,

    /// Rollouts that reached a terminal state (rollout driver only).
    pub terminal_rollouts: usize,

    pub elapsed: Duration,
}

/// Result of an MCTS search.
#[derive(Clone, Debug)]
pub struct SearchResult<A: Clone + Copy + Eq + Hash> {
    /// Chosen action under the driver's own rule: highest mean value for the
    /// rollout driver, highest visit count for the others.
    /// For temperature-based selection, use `select_action()` instead.
    pub best_action: A,

    /// Visit count for each root action, in `legal_actions` order.
    pub visit_counts: Vec<(A, u32)>,

    /// Mean value of each root action for the root's mover.
    /// Actions never tried report 0.
    pub values: Vec<(A, f32)>,

    /// Normalized visit counts, aligned with `visit_counts`. Sums to 1.0.
    pub policy: Vec<f32>,

    /// Value estimate at root (from perspective of player to move).
    pub root_value: f32,

    pub stats: SearchStats,
}

impl<A: Clone + Copy + Eq + Hash> SearchResult<A> {
    /// Select an action using temperature-based sampling.
    ///
    /// - temperature = 0: always return best action (greedy)
    /// - temperature = 1: sample proportional to visit counts
    /// - temperature > 1: more uniform distribution
    /// - temperature < 1: more peaked distribution
    ///
    /// Formula: P(a) ∝ N(a)^(1/τ) where τ is temperature
    pub fn select_action<R: Rng>(&self, temperature: f32, rng: &mut R) -> A {
        if temperature <= 0.0 || self.visit_counts.len() <= 1 {
            return self.best_action;
        }

        let inv_temp = 1.0 / temperature as f64;
        let adjusted: Vec<f64> = self
            .visit_counts
            .iter()
            .map(|(_, count)| (*count as f64).powf(inv_temp))
            .collect();

        let sum: f64 = adjusted.iter().sum();
        if sum == 0.0 || !sum.is_finite() {
            return self.best_action;
        }

        let threshold: f64 = rng.gen::<f64>() * sum;
        let mut cumulative = 0.0;

        for (i, &weight) in adjusted.iter().enumerate() {
            cumulative += weight;
            if cumulative >= threshold {
                return self.visit_counts[i].0;
            }
        }

        self.best_action
    }

    /// Get the best action (greedy selection).
    pub fn best(&self) -> A {
        self.best_action
    }

    /// The move-probability output: each root action with its share of the
    /// visits.
    pub fn distribution(&self) -> Vec<(A, f32)> {
        self.visit_counts
            .iter()
            .zip(&self.policy)
            .map(|((action, _), &p)| (*action, p))
            .collect()
    }

    /// Get the policy as a typed Policy (enforces sum to 1.0 invariant).
    ///
    /// # Errors
    /// Returns error if policy doesn't sum to 1.0 (indicates a bug).
    pub fn typed_policy(&self) -> Result<Policy> {
        Policy::new(self.policy.clone())
    }

    pub fn total_visits(&self) -> u32 {
        self.visit_counts.iter().map(|(_, n)| n).sum()
    }
}

/// Normalize visit counts into a distribution.
///
/// Falls back to `fallback` (or uniform when it is empty) if no action was
/// visited, so the output always sums to 1.
pub(crate) fn visit_policy(visits: &[u32], fallback: &[f32]) -> Vec<f32> {
    let total: u32 = visits.iter().sum();
    if total > 0 {
        return visits.iter().map(|&n| n as f32 / total as f32).collect();
    }
    if fallback.len() == visits.len() && !fallback.is_empty() {
        return fallback.to_vec();
    }
    vec![1.0 / visits.len().max(1) as f32; visits.len()]
}

/// Index of the first maximal element.
pub(crate) fn first_argmax<T: PartialOrd + Copy>(values: impl IntoIterator<Item = T>) -> Option<usize> {
    let mut best: Option<(usize, T)> = None;
    for (i, v) in values.into_iter().enumerate() {
        match best {
            Some((_, b)) if v > b => best = Some((i, v)),
            None => best = Some((i, v)),
            _ => {}
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn result(counts: &[u32]) -> SearchResult<u8> {
        let visit_counts: Vec<(u8, u32)> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| (i as u8, n))
            .collect();
        let values = counts.iter().enumerate().map(|(i, _)| (i as u8, 0.0)).collect();
        let best = first_argmax(counts.iter().copied()).unwrap() as u8;
        SearchResult {
            best_action: best,
            visit_counts,
            values,
            policy: visit_policy(counts, &[]),
            root_value: 0.0,
            stats: SearchStats::default(),
        }
    }

    #[test]
    fn test_select_action_greedy() {
        let r = result(&[10, 50, 40]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(r.select_action(0.0, &mut rng), 1);
    }

    #[test]
    fn test_select_action_temperature_one() {
        let r = result(&[10, 50, 40]);
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut counts = [0usize; 3];
        for _ in 0..2000 {
            counts[r.select_action(1.0, &mut rng) as usize] += 1;
        }
        assert!(counts[1] > counts[2]);
        assert!(counts[2] > counts[0]);
        assert!(counts[0] > 0);
    }

    #[test]
    fn test_distribution_sums_to_one() {
        let r = result(&[3, 1, 0, 4]);
        let dist = r.distribution();
        assert_eq!(dist.len(), 4);
        let sum: f32 = dist.iter().map(|(_, p)| p).sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(r.typed_policy().is_ok());
        assert_eq!(r.total_visits(), 8);
    }

    #[test]
    fn test_visit_policy_falls_back_without_visits() {
        assert_eq!(visit_policy(&[0, 0], &[0.25, 0.75]), vec![0.25, 0.75]);
        assert_eq!(visit_policy(&[0, 0], &[]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_first_argmax_prefers_earliest() {
        assert_eq!(first_argmax([1.0, 3.0, 3.0]), Some(1));
        assert_eq!(first_argmax([2u32, 2, 1]), Some(0));
        assert_eq!(first_argmax(Vec::<f32>::new()), None);
    }
}
