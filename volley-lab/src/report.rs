//! Training-priority ranking and report output.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volley_core::{SimulationConfig, Spread, Statistic, VolleyResult, MODEL_VERSION};

use crate::runner::{Measurement, StatisticOutcome};

/// Coarse training priority derived from |elasticity|.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    High,
    Medium,
    Low,
}

impl Impact {
    /// High above 1.0, Medium above 0.5, Low otherwise.
    pub fn from_elasticity(elasticity: f64) -> Self {
        let magnitude = elasticity.abs();
        if magnitude > 1.0 {
            Self::High
        } else if magnitude > 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(match self {
            Self::High => "HIGH",
            Self::Medium => "MEDIUM",
            Self::Low => "LOW",
        })
    }
}

/// One row of the priority ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStatistic {
    /// 1-based.
    pub rank: usize,
    pub statistic: Statistic,
    pub baseline_value: f64,
    /// Mean over trials.
    pub elasticity: f64,
    pub impact: Impact,
    pub spread: Spread,
}

/// Measured statistics ordered by |elasticity|, largest first. Failed
/// outcomes are left out.
pub fn rank(outcomes: &[StatisticOutcome]) -> Vec<RankedStatistic> {
    let mut measured: Vec<_> = outcomes
        .iter()
        .filter_map(|outcome| match &outcome.measurement {
            Measurement::Measured {
                statistic,
                baseline_value,
                spread,
                ..
            } => Some((*statistic, *baseline_value, *spread)),
            Measurement::Failed { .. } => None,
        })
        .collect();
    measured.sort_by(|a, b| b.2.mean.abs().total_cmp(&a.2.mean.abs()));

    measured
        .into_iter()
        .enumerate()
        .map(|(i, (statistic, baseline_value, spread))| RankedStatistic {
            rank: i + 1,
            statistic,
            baseline_value,
            elasticity: spread.mean,
            impact: Impact::from_elasticity(spread.mean),
            spread,
        })
        .collect()
}

/// Full result of an elasticity sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElasticityReport {
    pub generated_at: DateTime<Utc>,
    pub model_version: String,
    pub seed: u64,
    pub simulation: SimulationConfig,
    pub trials: usize,
    pub ranking: Vec<RankedStatistic>,
    pub outcomes: Vec<StatisticOutcome>,
}

impl ElasticityReport {
    /// Build a report from sweep outcomes.
    pub fn new(
        outcomes: Vec<StatisticOutcome>,
        simulation: SimulationConfig,
        trials: usize,
        seed: u64,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            model_version: MODEL_VERSION.to_string(),
            seed,
            simulation,
            trials,
            ranking: rank(&outcomes),
            outcomes,
        }
    }

    /// Outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &StatisticOutcome> {
        self.outcomes.iter().filter(|o| o.is_failed())
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> VolleyResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write pretty-printed JSON to `path`.
    pub fn write_json(&self, path: impl AsRef<Path>) -> VolleyResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Plain-text ranking table, followed by a consistency table when more
    /// than one trial ran and a list of failures if any.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Elasticity ranking (model v{}, improvement {:+.1}%, {} points, seed {})",
            self.model_version,
            self.simulation.improvement * 100.0,
            self.simulation.num_points,
            self.seed
        );
        let _ = writeln!(
            out,
            "{:<5} {:<34} {:>9} {:>11} {:>7}",
            "Rank", "Statistic", "Baseline", "Elasticity", "Impact"
        );
        for row in &self.ranking {
            let _ = writeln!(
                out,
                "{:<5} {:<34} {:>9.3} {:>+11.3} {:>7}",
                row.rank,
                row.statistic.label(),
                row.baseline_value,
                row.elasticity,
                row.impact
            );
        }

        if self.trials > 1 {
            let _ = writeln!(out);
            let _ = writeln!(out, "Consistency over {} trials", self.trials);
            let _ = writeln!(
                out,
                "{:<34} {:>9} {:>9} {:>9} {:>9} {:>9}",
                "Statistic", "Mean", "Std dev", "Min", "Max", "Range"
            );
            for row in &self.ranking {
                let s = &row.spread;
                let _ = writeln!(
                    out,
                    "{:<34} {:>+9.3} {:>9.3} {:>+9.3} {:>+9.3} {:>9.3}",
                    row.statistic.label(),
                    s.mean,
                    s.std_dev,
                    s.min,
                    s.max,
                    s.range()
                );
            }
        }

        let failures: Vec<_> = self.failures().collect();
        if !failures.is_empty() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Failed statistics:");
            for outcome in failures {
                if let Measurement::Failed { kind, message } = &outcome.measurement {
                    let kind = kind.map_or("worker".to_string(), |k| k.to_string());
                    let _ = writeln!(out, "  {} [{}]: {}", outcome.name, kind, message);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use volley_core::ErrorKind;

    fn measured(statistic: Statistic, samples: &[f64]) -> StatisticOutcome {
        StatisticOutcome {
            name: statistic.name().to_string(),
            measurement: Measurement::Measured {
                statistic,
                baseline_value: 0.3,
                runs: Vec::new(),
                spread: Spread::from_samples(samples).unwrap(),
            },
        }
    }

    fn failed(name: &str) -> StatisticOutcome {
        StatisticOutcome {
            name: name.to_string(),
            measurement: Measurement::Failed {
                kind: Some(ErrorKind::TargetNotFound),
                message: format!("statistic '{name}' not found"),
            },
        }
    }

    #[test]
    fn impact_thresholds() {
        assert_eq!(Impact::from_elasticity(1.2), Impact::High);
        assert_eq!(Impact::from_elasticity(-1.5), Impact::High);
        assert_eq!(Impact::from_elasticity(1.0), Impact::Medium);
        assert_eq!(Impact::from_elasticity(0.6), Impact::Medium);
        assert_eq!(Impact::from_elasticity(0.5), Impact::Low);
        assert_eq!(Impact::from_elasticity(0.0), Impact::Low);
    }

    #[test]
    fn ranking_orders_by_magnitude_and_skips_failures() {
        let outcomes = vec![
            measured(Statistic::ServeAceRate, &[0.4]),
            failed("spike_speed"),
            measured(Statistic::DigPerfectRate, &[-1.3]),
            measured(Statistic::BlockKillRate, &[0.7]),
        ];
        let ranking = rank(&outcomes);

        let order: Vec<_> = ranking.iter().map(|r| r.statistic).collect();
        assert_eq!(
            order,
            vec![
                Statistic::DigPerfectRate,
                Statistic::BlockKillRate,
                Statistic::ServeAceRate
            ]
        );
        assert_eq!(ranking[0].rank, 1);
        assert_eq!(ranking[0].impact, Impact::High);
        assert_eq!(ranking[1].impact, Impact::Medium);
        assert_eq!(ranking[2].impact, Impact::Low);
    }

    #[test]
    fn render_includes_consistency_and_failures() {
        let outcomes = vec![
            measured(Statistic::ServeAceRate, &[0.4, 0.6]),
            failed("spike_speed"),
        ];
        let report = ElasticityReport::new(outcomes, SimulationConfig::default(), 2, 99);
        let text = report.render();

        assert!(text.contains("Serve Ace Rate"));
        assert!(text.contains("Consistency over 2 trials"));
        assert!(text.contains("spike_speed [target_not_found]"));
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn json_report() {
        let report = ElasticityReport::new(
            vec![measured(Statistic::BlockKillRate, &[0.9])],
            SimulationConfig::default(),
            1,
            5,
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["model_version"], MODEL_VERSION);
        assert_eq!(value["seed"], 5);
        assert_eq!(value["ranking"][0]["statistic"], "block_kill_rate");
        assert_eq!(value["ranking"][0]["impact"], "medium");
        assert_eq!(value["outcomes"][0]["measurement"]["status"], "measured");
        assert!(value["generated_at"].is_string());
    }
}
