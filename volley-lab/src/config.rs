//! Lab run configuration.

use std::path::{Path, PathBuf};

use volley_core::{
    canonical_machine, MachineBuilder, ProbabilityTemplate, SimulationConfig, StateMachine,
    Statistic, VolleyResult,
};

/// Configuration for one lab run.
#[derive(Debug, Clone)]
pub struct LabConfig {
    /// Simulation budgets and improvement δ.
    pub simulation: SimulationConfig,
    /// Statistic names to sweep.
    pub statistics: Vec<String>,
    /// Independent elasticity evaluations per statistic.
    pub trials: usize,
    /// Maximum statistics evaluated concurrently.
    pub workers: usize,
    /// Base seed. Fresh entropy when absent.
    pub seed: Option<u64>,
    /// Where to write the JSON report.
    pub output: Option<PathBuf>,
    /// Baseline template replacing the reference machine.
    pub baseline: Option<PathBuf>,
    /// Team A template for head-to-head runs.
    pub team_a: Option<PathBuf>,
    /// Team B template for head-to-head runs.
    pub team_b: Option<PathBuf>,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            statistics: Statistic::TRAINABLE
                .iter()
                .map(|s| s.name().to_string())
                .collect(),
            trials: 1,
            workers: default_workers(),
            seed: None,
            output: None,
            baseline: None,
            team_a: None,
            team_b: None,
        }
    }
}

impl LabConfig {
    /// Set simulation budgets.
    pub fn with_simulation(mut self, simulation: SimulationConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Sweep these statistics instead of the trainable set.
    /// An empty list keeps the current one.
    pub fn with_statistics<I, S>(mut self, statistics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let statistics: Vec<String> = statistics.into_iter().map(Into::into).collect();
        if !statistics.is_empty() {
            self.statistics = statistics;
        }
        self
    }

    /// Set trials per statistic (at least 1).
    pub fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials.max(1);
        self
    }

    /// Set the worker cap (at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Fix the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Write the JSON report to `path`.
    pub fn with_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Use a baseline template instead of the reference machine.
    pub fn with_baseline(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline = Some(path.into());
        self
    }

    /// Set head-to-head team templates.
    pub fn with_teams(mut self, team_a: Option<PathBuf>, team_b: Option<PathBuf>) -> Self {
        self.team_a = team_a;
        self.team_b = team_b;
        self
    }

    /// The configured seed, or a fresh one.
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random)
    }

    /// Baseline machine: the template at `baseline` completed from the
    /// reference machine, or the reference machine itself.
    pub fn baseline_machine(&self) -> VolleyResult<StateMachine> {
        match &self.baseline {
            Some(path) => machine_from_path(path),
            None => canonical_machine(),
        }
    }

    /// Team A template, defaulting to the reference machine.
    pub fn team_a_template(&self) -> VolleyResult<ProbabilityTemplate> {
        team_template(self.team_a.as_deref())
    }

    /// Team B template, defaulting to the reference machine.
    pub fn team_b_template(&self) -> VolleyResult<ProbabilityTemplate> {
        team_template(self.team_b.as_deref())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn machine_from_path(path: &Path) -> VolleyResult<StateMachine> {
    let (serving, receiving) = ProbabilityTemplate::from_path(path)?.split_by_side()?;
    MachineBuilder::new()
        .serving(serving)
        .receiving(receiving)
        .fill_from_canonical(true)
        .build()
}

fn team_template(path: Option<&Path>) -> VolleyResult<ProbabilityTemplate> {
    match path {
        Some(path) => ProbabilityTemplate::from_path(path),
        None => Ok(ProbabilityTemplate::from_machine(&canonical_machine()?)),
    }
}
