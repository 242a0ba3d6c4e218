//! Simulation budgets.

use serde::{Deserialize, Serialize};

use crate::rally::DEFAULT_MAX_STEPS;

/// Default number of points per win-rate estimate.
pub const DEFAULT_NUM_POINTS: usize = 10_000;

/// Default relative improvement applied by elasticity analysis.
pub const DEFAULT_IMPROVEMENT: f64 = 0.05;

/// Iteration caps and perturbation size shared by the simulators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Continuation steps allowed per rally (default 50).
    pub max_steps: usize,
    /// Points simulated per win-rate estimate (default 10 000).
    pub num_points: usize,
    /// Relative improvement δ for elasticity (default 0.05).
    pub improvement: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_steps: DEFAULT_MAX_STEPS,
            num_points: DEFAULT_NUM_POINTS,
            improvement: DEFAULT_IMPROVEMENT,
        }
    }
}

impl SimulationConfig {
    /// Create a custom config.
    pub fn new(max_steps: usize, num_points: usize, improvement: f64) -> Self {
        Self {
            max_steps,
            num_points,
            improvement,
        }
    }

    /// Set the per-rally step cap.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the point budget.
    pub fn with_num_points(mut self, num_points: usize) -> Self {
        self.num_points = num_points;
        self
    }

    /// Set the relative improvement.
    pub fn with_improvement(mut self, improvement: f64) -> Self {
        self.improvement = improvement;
        self
    }
}
