//! Domain types with enforced invariants.
//!
//! - PlayerId: seat index of a player
//! - Policy: probability distribution summing to 1.0

use std::fmt;

use crate::{LudusError, Result};

/// Tolerance for policy sum validation.
pub const POLICY_SUM_TOLERANCE: f32 = 1e-4;

/// Seat index of a player (0-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct PlayerId(pub u8);

impl PlayerId {
    pub const FIRST: PlayerId = PlayerId(0);
    pub const SECOND: PlayerId = PlayerId(1);

    /// The player after this one in a game of `num_players` seats.
    pub fn next(self, num_players: usize) -> Self {
        PlayerId(((self.0 as usize + 1) % num_players.max(1)) as u8)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A probability distribution over a list of actions.
///
/// Invariant: All values are non-negative and sum to 1.0 (within
/// [`POLICY_SUM_TOLERANCE`]).
///
/// # Example
/// ```
/// use ludus_core::Policy;
///
/// let policy = Policy::new(vec![0.3, 0.5, 0.2]).unwrap();
/// assert!((policy.sum() - 1.0).abs() < 1e-5);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Policy(Vec<f32>);

impl Policy {
    /// Create a new policy from a probability distribution.
    ///
    /// # Errors
    /// Returns `LudusError::InvalidPolicy` if the vector is empty, holds a
    /// negative or non-finite entry, or does not sum to 1.0.
    pub fn new(probs: Vec<f32>) -> Result<Self> {
        check_entries(&probs)?;

        let sum: f32 = probs.iter().sum();
        if (sum - 1.0).abs() > POLICY_SUM_TOLERANCE {
            return Err(LudusError::InvalidPolicy(format!(
                "policy sum {} is not 1.0 (tolerance {})",
                sum, POLICY_SUM_TOLERANCE
            )));
        }

        Ok(Self(probs))
    }

    /// Create a policy from raw non-negative weights, normalizing them.
    ///
    /// # Errors
    /// Returns error if any weight is negative or all weights are zero.
    pub fn from_weights(weights: Vec<f32>) -> Result<Self> {
        check_entries(&weights)?;

        let sum: f32 = weights.iter().sum();
        if sum <= 0.0 {
            return Err(LudusError::InvalidPolicy(
                "cannot normalize: all weights are zero".to_string(),
            ));
        }

        Ok(Self(weights.into_iter().map(|w| w / sum).collect()))
    }

    /// Create a uniform policy over the given number of actions.
    ///
    /// # Errors
    /// Returns error if num_actions is zero.
    pub fn uniform(num_actions: usize) -> Result<Self> {
        if num_actions == 0 {
            return Err(LudusError::InvalidPolicy(
                "cannot create uniform policy with 0 actions".to_string(),
            ));
        }

        Ok(Self(vec![1.0 / num_actions as f32; num_actions]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f32 {
        self.0.iter().sum()
    }

    /// Index of the first maximal probability.
    pub fn argmax(&self) -> usize {
        let mut best = 0;
        for (i, &p) in self.0.iter().enumerate() {
            if p > self.0[best] {
                best = i;
            }
        }
        best
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl std::ops::Index<usize> for Policy {
    type Output = f32;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

fn check_entries(values: &[f32]) -> Result<()> {
    if values.is_empty() {
        return Err(LudusError::InvalidPolicy(
            "policy cannot be empty".to_string(),
        ));
    }
    if values.iter().any(|p| !p.is_finite() || *p < 0.0) {
        return Err(LudusError::InvalidPolicy(
            "policy contains negative or non-finite values".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_next_wraps() {
        assert_eq!(PlayerId::FIRST.next(2), PlayerId::SECOND);
        assert_eq!(PlayerId::SECOND.next(2), PlayerId::FIRST);
        assert_eq!(PlayerId::FIRST.next(1), PlayerId::FIRST);
    }

    #[test]
    fn test_policy_new_valid() {
        let policy = Policy::new(vec![0.3, 0.5, 0.2]).unwrap();
        assert_eq!(policy.len(), 3);
        assert!((policy.sum() - 1.0).abs() < POLICY_SUM_TOLERANCE);
    }

    #[test]
    fn test_policy_new_invalid_sum() {
        assert!(Policy::new(vec![0.3, 0.3, 0.3]).is_err());
    }

    #[test]
    fn test_policy_rejects_negative_and_nan() {
        assert!(Policy::new(vec![0.5, -0.2, 0.7]).is_err());
        assert!(Policy::new(vec![f32::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_policy_new_empty() {
        assert!(Policy::new(vec![]).is_err());
    }

    #[test]
    fn test_policy_from_weights() {
        let policy = Policy::from_weights(vec![1.0, 2.0, 1.0]).unwrap();
        assert!((policy[0] - 0.25).abs() < 1e-6);
        assert!((policy[1] - 0.50).abs() < 1e-6);
        assert!((policy[2] - 0.25).abs() < 1e-6);
        assert!(Policy::from_weights(vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn test_policy_uniform() {
        let policy = Policy::uniform(4).unwrap();
        assert!(policy.as_slice().iter().all(|&p| (p - 0.25).abs() < 1e-6));
        assert!(Policy::uniform(0).is_err());
    }

    #[test]
    fn test_policy_argmax_prefers_first_on_ties() {
        let policy = Policy::new(vec![0.4, 0.4, 0.2]).unwrap();
        assert_eq!(policy.argmax(), 0);
        let policy = Policy::new(vec![0.1, 0.6, 0.3]).unwrap();
        assert_eq!(policy.argmax(), 1);
    }
}
