//! Concurrent elasticity sweep.
//!
//! Each statistic is measured on a blocking worker with its own ChaCha
//! stream (`seed`, stream = position in the request list), so results do not
//! depend on scheduling order. Workers report over a channel to a single
//! aggregator that logs progress and collects outcomes; a failing statistic
//! is recorded and never aborts its siblings.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, info, warn};

use volley_core::{Elasticity, ElasticityEngine, ErrorKind, Spread, Statistic, VolleyResult};

use crate::config::LabConfig;

/// Result of measuring one statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Measurement {
    Measured {
        statistic: Statistic,
        baseline_value: f64,
        runs: Vec<Elasticity>,
        spread: Spread,
    },
    Failed {
        /// `None` when the worker itself died.
        kind: Option<ErrorKind>,
        message: String,
    },
}

/// One statistic's entry in a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticOutcome {
    /// Name as requested.
    pub name: String,
    pub measurement: Measurement,
}

impl StatisticOutcome {
    fn failed(name: String, kind: Option<ErrorKind>, message: String) -> Self {
        Self {
            name,
            measurement: Measurement::Failed { kind, message },
        }
    }

    /// Mean elasticity over all trials, if measured.
    pub fn elasticity(&self) -> Option<f64> {
        match &self.measurement {
            Measurement::Measured { spread, .. } => Some(spread.mean),
            Measurement::Failed { .. } => None,
        }
    }

    /// Whether measurement failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.measurement, Measurement::Failed { .. })
    }
}

/// Fans elasticity evaluations out over a bounded pool of workers.
#[derive(Debug, Clone)]
pub struct ElasticityRunner {
    engine: Arc<ElasticityEngine>,
    workers: usize,
    trials: usize,
    seed: u64,
}

impl ElasticityRunner {
    /// Create a runner around `engine`.
    pub fn new(engine: ElasticityEngine, seed: u64) -> Self {
        Self {
            engine: Arc::new(engine),
            workers: 1,
            trials: 1,
            seed,
        }
    }

    /// Runner configured from a lab config.
    pub fn from_config(engine: ElasticityEngine, config: &LabConfig, seed: u64) -> Self {
        Self::new(engine, seed)
            .with_workers(config.workers)
            .with_trials(config.trials)
    }

    /// Set the worker cap (at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Set trials per statistic (at least 1).
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    /// Base seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Engine shared by every worker.
    pub fn engine(&self) -> &ElasticityEngine {
        &self.engine
    }

    /// Measure every named statistic. Outcomes come back in request order.
    pub async fn run<S: AsRef<str>>(&self, names: &[S]) -> Vec<StatisticOutcome> {
        let total = names.len();
        let (tx, mut rx) = mpsc::channel(total.max(1));
        let permits = Arc::new(Semaphore::new(self.workers));

        info!(
            "Measuring {} statistics on {} workers ({} trials, seed {})",
            total, self.workers, self.trials, self.seed
        );

        for (index, name) in names.iter().enumerate() {
            let name = name.as_ref().to_string();
            let engine = Arc::clone(&self.engine);
            let permits = Arc::clone(&permits);
            let tx = tx.clone();
            let (seed, trials) = (self.seed, self.trials);

            tokio::spawn(async move {
                let _permit = permits.acquire_owned().await;
                let worker_name = name.clone();
                let outcome = tokio::task::spawn_blocking(move || {
                    measure(&engine, worker_name, index as u64, seed, trials)
                })
                .await
                .unwrap_or_else(|e| StatisticOutcome::failed(name, None, e.to_string()));

                if tx.send((index, outcome)).await.is_err() {
                    tracing::error!("Aggregator dropped before statistic {} reported", index);
                }
            });
        }
        drop(tx);

        let mut collected = BTreeMap::new();
        while let Some((index, outcome)) = rx.recv().await {
            let done = collected.len() + 1;
            match &outcome.measurement {
                Measurement::Measured { spread, .. } => info!(
                    "[{}/{}] {}: elasticity {:.3}",
                    done, total, outcome.name, spread.mean
                ),
                Measurement::Failed { message, .. } => {
                    warn!("[{}/{}] {} failed: {}", done, total, outcome.name, message)
                }
            }
            collected.insert(index, outcome);
        }
        collected.into_values().collect()
    }
}

/// Evaluate one statistic `trials` times on its own stream.
fn measure(
    engine: &ElasticityEngine,
    name: String,
    stream: u64,
    seed: u64,
    trials: usize,
) -> StatisticOutcome {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);

    let measured = name.parse::<Statistic>().and_then(|statistic| {
        let baseline_value = engine.baseline_value(statistic)?;
        let runs = (0..trials)
            .map(|trial| {
                debug!("{} trial {}", statistic, trial + 1);
                engine.evaluate(statistic, &mut rng)
            })
            .collect::<VolleyResult<Vec<_>>>()?;
        Ok((statistic, baseline_value, runs))
    });

    match measured {
        Ok((statistic, baseline_value, runs)) => {
            let samples: Vec<f64> = runs.iter().map(|r| r.elasticity).collect();
            match Spread::from_samples(&samples) {
                Some(spread) => StatisticOutcome {
                    name,
                    measurement: Measurement::Measured {
                        statistic,
                        baseline_value,
                        runs,
                        spread,
                    },
                },
                None => StatisticOutcome::failed(
                    name,
                    Some(ErrorKind::Input),
                    "no trials were run".to_string(),
                ),
            }
        }
        Err(err) => StatisticOutcome::failed(name, Some(err.kind()), err.to_string()),
    }
}
