//! Win-rate sensitivity to single transition probabilities.
//!
//! Elasticity model:
//! - Perturb: `p' = clamp(p · (1 + δ), 0, 1)`, `Δ = p' − p`
//! - Redistribute: every sibling `q` becomes `q · (1 − Δ / Σq)`
//! - Safety net: if the row then misses 1 by more than the tolerance, every
//!   entry is divided by the row sum
//! - Estimate: `E = (rate(perturbed vs baseline) − rate(baseline vs baseline)) / (rate(baseline vs baseline) · δ)`
//!
//! `E` is a finite difference over two Monte-Carlo estimates, so repeated
//! evaluations differ. Use [`ElasticityEngine::consistency`] to measure the
//! spread instead of expecting identical results.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::canonical::canonical_machine;
use crate::config::SimulationConfig;
use crate::error::{VolleyError, VolleyResult};
use crate::machine::{StateMachine, PROBABILITY_TOLERANCE};
use crate::matchup::MatchSimulator;
use crate::spread::Spread;
use crate::state::Transition;
use crate::statistic::Statistic;
use crate::template::ProbabilityTemplate;

/// Result of one elasticity evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Elasticity {
    pub statistic: Statistic,
    /// Target probability in the baseline machine.
    pub baseline_value: f64,
    /// Target probability after perturbation.
    pub perturbed_value: f64,
    /// Relative improvement δ.
    pub improvement: f64,
    /// Baseline vs baseline win rate.
    pub baseline_rate: f64,
    /// Perturbed vs baseline win rate.
    pub improved_rate: f64,
    pub elasticity: f64,
    /// Points simulated per win-rate estimate.
    pub points: usize,
}

/// Elasticity of one statistic over independent trials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Consistency {
    pub statistic: Statistic,
    pub samples: Vec<f64>,
    pub spread: Option<Spread>,
}

/// Perturbs a baseline machine and measures the effect on win rate.
#[derive(Debug, Clone)]
pub struct ElasticityEngine {
    baseline: StateMachine,
    baseline_template: ProbabilityTemplate,
    matches: MatchSimulator,
    config: SimulationConfig,
}

impl ElasticityEngine {
    /// Create an engine around a baseline machine.
    pub fn new(baseline: StateMachine, config: SimulationConfig) -> Self {
        Self {
            baseline_template: ProbabilityTemplate::from_machine(&baseline),
            baseline,
            matches: MatchSimulator::from_config(&config),
            config,
        }
    }

    /// Engine around the reference machine.
    pub fn canonical(config: SimulationConfig) -> VolleyResult<Self> {
        Ok(Self::new(canonical_machine()?, config))
    }

    /// Baseline machine.
    pub fn baseline(&self) -> &StateMachine {
        &self.baseline
    }

    /// Simulation budgets.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Target probability of a statistic in the baseline machine.
    pub fn baseline_value(&self, statistic: Statistic) -> VolleyResult<f64> {
        let (row, index) = self.target(statistic)?;
        Ok(row[index].probability)
    }

    /// Baseline probability of every statistic that resolves.
    pub fn baseline_values(&self) -> BTreeMap<Statistic, f64> {
        Statistic::ALL
            .iter()
            .filter_map(|stat| self.baseline_value(*stat).ok().map(|p| (*stat, p)))
            .collect()
    }

    fn target(&self, statistic: Statistic) -> VolleyResult<(&[Transition], usize)> {
        let not_found = || VolleyError::TargetNotFound {
            statistic: statistic.name().to_string(),
        };
        let row = self.baseline.row(statistic.state()).ok_or_else(not_found)?;
        let index = row
            .iter()
            .position(|t| t.to == statistic.destination())
            .ok_or_else(not_found)?;
        Ok((&row[..], index))
    }

    /// Baseline machine with one statistic scaled by `1 + delta`.
    ///
    /// Only the target's row is replaced; every other row is shared with
    /// the baseline.
    pub fn perturb(&self, statistic: Statistic, delta: f64) -> VolleyResult<StateMachine> {
        check_improvement(delta)?;
        let (row, index) = self.target(statistic)?;
        let perturbed = perturb_row(statistic.state(), row, index, delta).ok_or_else(|| {
            VolleyError::TargetImmovable {
                statistic: statistic.name().to_string(),
                value: row[index].probability,
            }
        })?;
        self.baseline.with_row(statistic.state(), perturbed)
    }

    /// Estimate the elasticity of a statistic with the configured δ and
    /// point budget.
    pub fn evaluate<R>(&self, statistic: Statistic, rng: &mut R) -> VolleyResult<Elasticity>
    where
        R: Rng + ?Sized,
    {
        let delta = self.config.improvement;
        let points = self.config.num_points;
        let baseline_value = self.baseline_value(statistic)?;
        let perturbed = self.perturb(statistic, delta)?;
        let perturbed_value = perturbed
            .transitions_from(statistic.state())?
            .iter()
            .find(|t| t.to == statistic.destination())
            .map(|t| t.probability)
            .unwrap_or(baseline_value);
        let improved_template = ProbabilityTemplate::from_machine(&perturbed);

        debug!(
            "Evaluating {}: {:.4} -> {:.4} over {} points",
            statistic, baseline_value, perturbed_value, points
        );

        let baseline_rate = self.matches.win_rate(
            &self.baseline_template,
            &self.baseline_template,
            points,
            rng,
        )?;
        let improved_rate =
            self.matches
                .win_rate(&improved_template, &self.baseline_template, points, rng)?;
        let elasticity = compute_elasticity(statistic, baseline_rate, improved_rate, delta)?;

        Ok(Elasticity {
            statistic,
            baseline_value,
            perturbed_value,
            improvement: delta,
            baseline_rate,
            improved_rate,
            elasticity,
            points,
        })
    }

    /// [`ElasticityEngine::evaluate`] by symbolic name.
    pub fn evaluate_named<R>(&self, name: &str, rng: &mut R) -> VolleyResult<Elasticity>
    where
        R: Rng + ?Sized,
    {
        self.evaluate(name.parse()?, rng)
    }

    /// Evaluate a statistic `trials` times and summarize the spread.
    pub fn consistency<R>(
        &self,
        statistic: Statistic,
        trials: usize,
        rng: &mut R,
    ) -> VolleyResult<Consistency>
    where
        R: Rng + ?Sized,
    {
        let samples = (0..trials)
            .map(|_| self.evaluate(statistic, rng).map(|e| e.elasticity))
            .collect::<VolleyResult<Vec<_>>>()?;
        let spread = Spread::from_samples(&samples);
        Ok(Consistency {
            statistic,
            samples,
            spread,
        })
    }
}

/// `(improved − baseline) / (baseline · δ)`; a zero baseline is an error.
pub fn compute_elasticity(
    statistic: Statistic,
    baseline_rate: f64,
    improved_rate: f64,
    delta: f64,
) -> VolleyResult<f64> {
    check_improvement(delta)?;
    if baseline_rate == 0.0 {
        return Err(VolleyError::DivisionByZero {
            statistic: statistic.name().to_string(),
        });
    }
    Ok((improved_rate - baseline_rate) / (baseline_rate * delta))
}

fn check_improvement(delta: f64) -> VolleyResult<()> {
    if !delta.is_finite() || delta == 0.0 || delta <= -1.0 {
        return Err(VolleyError::InvalidImprovement { delta });
    }
    Ok(())
}

/// Scale `row[index]` by `1 + delta` and rebalance its siblings so the row
/// still sums to 1.
///
/// `None` when the target cannot move: it is zero, or already at the bound
/// with no sibling mass to take from.
pub fn perturb_row(
    state: &str,
    row: &[Transition],
    index: usize,
    delta: f64,
) -> Option<Vec<Transition>> {
    let old = row[index].probability;
    let new = (old * (1.0 + delta)).clamp(0.0, 1.0);
    let shift = new - old;
    let others: f64 = row
        .iter()
        .enumerate()
        .filter(|(j, _)| *j != index)
        .map(|(_, t)| t.probability)
        .sum();

    if shift == 0.0 || others <= 0.0 {
        return None;
    }

    let reduction = shift / others;
    let mut perturbed: Vec<Transition> = row
        .iter()
        .enumerate()
        .map(|(j, t)| {
            if j == index {
                t.with_probability(new)
            } else {
                t.with_probability((t.probability * (1.0 - reduction)).max(0.0))
            }
        })
        .collect();

    let sum: f64 = perturbed.iter().map(|t| t.probability).sum();
    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        warn!("Row {} sums to {:.6} after perturbation, renormalizing", state, sum);
        for t in &mut perturbed {
            t.probability /= sum;
        }
    }
    Some(perturbed)
}
