//! MCTS configuration parameters.
//!
//! These parameters control the budget, selection and evaluation behavior of
//! every search driver. The struct is serde-friendly so tools can load it
//! from a config file.

use ludus_core::{LudusError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Stopping condition for a top-level search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Budget {
    /// Run exactly this many iterations.
    Iterations(usize),

    /// Run iterations until this many milliseconds have elapsed.
    /// Only the classic rollout driver honors a time budget; the other
    /// drivers reject it during validation.
    TimeMs(u64),
}

impl Budget {
    /// Whether the budget is used up after `iterations` iterations and
    /// `elapsed` wall time. At least one iteration always runs.
    pub fn exhausted(&self, iterations: usize, elapsed: Duration) -> bool {
        if iterations == 0 {
            return false;
        }
        match *self {
            Budget::Iterations(n) => iterations >= n,
            Budget::TimeMs(ms) => elapsed >= Duration::from_millis(ms),
        }
    }
}

/// How PUCT behaves at a node whose actions have zero total visits.
///
/// Derived from the sign of [`MctsConfig::zero_visit_eps`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZeroVisitRule {
    /// EPS > 0: the exploration term is proportional to the prior.
    HighestPrior,
    /// EPS == 0: every action scores zero and the first one wins.
    FirstAction,
    /// EPS < 0: sample an action uniformly at random.
    Uniform,
}

impl ZeroVisitRule {
    pub fn from_eps(eps: f32) -> Self {
        if eps > 0.0 {
            ZeroVisitRule::HighestPrior
        } else if eps < 0.0 {
            ZeroVisitRule::Uniform
        } else {
            ZeroVisitRule::FirstAction
        }
    }
}

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MctsConfig {
    /// Iterations (or wall time) spent on each top-level search.
    pub budget: Budget,

    /// Exploration constant: `c` for UCT, `c_puct` for PUCT.
    pub exploration: f32,

    /// Signed constant added under the PUCT square root.
    /// Its sign selects the [`ZeroVisitRule`].
    pub zero_visit_eps: f32,

    /// Maximum number of moves in a random rollout.
    pub max_rollout_depth: usize,

    /// Recursion bound for the chance-node driver (`None` = unlimited).
    pub max_depth: Option<usize>,

    /// Keep the subtree of the played line between calls.
    pub reuse_tree: bool,

    /// Dirichlet noise alpha (for root exploration, PUCT driver only).
    pub dirichlet_alpha: f32,

    /// Fraction of the root prior replaced with Dirichlet noise.
    /// 0 disables noise.
    pub exploration_fraction: f32,

    /// Temperature for sampling the played action from visit counts.
    /// - 0.0: always pick the best action (greedy)
    /// - 1.0: sample proportional to visit counts
    pub temperature: f32,

    /// Move number at which the temperature drops to 0.
    /// Set to 0 to always use the configured temperature.
    pub temperature_drop_move: usize,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            budget: Budget::Iterations(800),
            exploration: std::f32::consts::SQRT_2,
            zero_visit_eps: 1e-8,
            max_rollout_depth: 200,
            max_depth: None,
            reuse_tree: false,
            dirichlet_alpha: 0.3,
            exploration_fraction: 0.0,
            temperature: 0.0,
            temperature_drop_move: 0,
        }
    }
}

impl MctsConfig {
    /// Create a new config running the given number of iterations.
    pub fn with_iterations(iterations: usize) -> Self {
        Self {
            budget: Budget::Iterations(iterations),
            ..Default::default()
        }
    }

    /// Config tuned for the PUCT-based drivers.
    pub fn puct(iterations: usize, c_puct: f32) -> Self {
        Self {
            budget: Budget::Iterations(iterations),
            exploration: c_puct,
            ..Default::default()
        }
    }

    /// Config for the classic rollout driver with a wall-clock budget.
    pub fn timed(millis: u64) -> Self {
        Self {
            budget: Budget::TimeMs(millis),
            ..Default::default()
        }
    }

    pub fn zero_visit_rule(&self) -> ZeroVisitRule {
        ZeroVisitRule::from_eps(self.zero_visit_eps)
    }

    /// Get the effective temperature for a given move number.
    pub fn effective_temperature(&self, move_number: usize) -> f32 {
        if self.temperature_drop_move > 0 && move_number >= self.temperature_drop_move {
            0.0
        } else {
            self.temperature
        }
    }

    /// Reject settings no driver can run with.
    pub fn validate(&self) -> Result<()> {
        match self.budget {
            Budget::Iterations(0) => return Err(invalid("iteration budget must be > 0")),
            Budget::TimeMs(0) => return Err(invalid("time budget must be > 0 ms")),
            _ => {}
        }
        if !(self.exploration.is_finite() && self.exploration >= 0.0) {
            return Err(invalid("exploration constant must be finite and >= 0"));
        }
        if !self.zero_visit_eps.is_finite() || self.zero_visit_eps.abs() >= 1.0 {
            return Err(invalid("zero_visit_eps must be finite with magnitude < 1"));
        }
        if self.max_depth == Some(0) {
            return Err(invalid("max_depth must be > 0 (use None for unlimited)"));
        }
        if !(0.0..=1.0).contains(&self.exploration_fraction) {
            return Err(invalid("exploration_fraction must be in [0, 1]"));
        }
        if self.exploration_fraction > 0.0
            && !(self.dirichlet_alpha.is_finite() && self.dirichlet_alpha > 0.0)
        {
            return Err(invalid("dirichlet_alpha must be finite and > 0"));
        }
        if !(self.temperature.is_finite() && self.temperature >= 0.0) {
            return Err(invalid("temperature must be finite and >= 0"));
        }
        Ok(())
    }

    /// Validation for drivers that only count iterations.
    pub(crate) fn validate_iteration_budget(&self) -> Result<()> {
        self.validate()?;
        match self.budget {
            Budget::Iterations(_) => Ok(()),
            Budget::TimeMs(_) => Err(invalid(
                "time budgets are only supported by the rollout driver",
            )),
        }
    }
}

fn invalid(msg: &str) -> LudusError {
    LudusError::InvalidConfig(msg.to_string())
}
