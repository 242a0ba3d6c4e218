//! volley-lab - sample rallies, play head-to-head matches and rank skill
//! statistics by elasticity.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::EnvFilter;

use volley_core::config::{DEFAULT_IMPROVEMENT, DEFAULT_NUM_POINTS};
use volley_core::rally::DEFAULT_MAX_STEPS;
use volley_core::{
    canonical_winners, ElasticityEngine, MatchSimulator, RallySimulator, SimulationConfig,
    Statistic,
};
use volley_lab::{ElasticityReport, ElasticityRunner, LabConfig};

#[derive(Debug, Parser)]
#[command(name = "volley-lab", version)]
#[command(about = "Monte-Carlo beach volleyball rallies, win rates and skill elasticity")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Base seed (fresh entropy when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Continuation steps allowed per rally
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,

    /// Baseline template (JSON); missing rows come from the reference machine
    #[arg(long, global = true)]
    baseline: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sample rallies on the baseline machine and print their paths
    Rally {
        /// Number of rallies
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Estimate team A's point win rate against team B
    Match {
        /// Team A template (JSON); defaults to the reference machine
        #[arg(long)]
        team_a: Option<PathBuf>,

        /// Team B template (JSON); defaults to the reference machine
        #[arg(long)]
        team_b: Option<PathBuf>,

        /// Points to simulate
        #[arg(long, default_value_t = DEFAULT_NUM_POINTS)]
        points: usize,

        /// Print the tally as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank statistics by win-rate elasticity
    Elasticity {
        /// Statistics to sweep (comma-separated); defaults to the trainable set
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,

        /// Points per win-rate estimate
        #[arg(long, default_value_t = DEFAULT_NUM_POINTS)]
        points: usize,

        /// Relative improvement applied to each statistic
        #[arg(long, default_value_t = DEFAULT_IMPROVEMENT)]
        improvement: f64,

        /// Independent trials per statistic
        #[arg(long, default_value_t = 1)]
        trials: usize,

        /// Concurrent workers (defaults to available parallelism)
        #[arg(long)]
        workers: Option<usize>,

        /// Write the JSON report to this path
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the baseline probability of every statistic
    Baseline,
}

impl Args {
    fn lab_config(&self) -> LabConfig {
        let mut config = LabConfig::default();
        config.simulation = config.simulation.with_max_steps(self.max_steps);
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(path) = &self.baseline {
            config = config.with_baseline(path);
        }

        match &self.command {
            Command::Match {
                team_a,
                team_b,
                points,
                ..
            } => {
                config.simulation = config.simulation.with_num_points(*points);
                config.with_teams(team_a.clone(), team_b.clone())
            }
            Command::Elasticity {
                stats,
                points,
                improvement,
                trials,
                workers,
                output,
            } => {
                config.simulation = SimulationConfig::new(self.max_steps, *points, *improvement);
                config = config.with_statistics(stats.clone()).with_trials(*trials);
                if let Some(workers) = workers {
                    config = config.with_workers(*workers);
                }
                if let Some(output) = output {
                    config = config.with_output(output);
                }
                config
            }
            Command::Rally { .. } | Command::Baseline => config,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = args.lab_config();
    let seed = config.resolve_seed();
    tracing::debug!("Seed {}", seed);

    match &args.command {
        Command::Rally { count } => run_rally(&config, seed, *count),
        Command::Match { json, .. } => run_match(&config, seed, *json),
        Command::Elasticity { .. } => run_elasticity(&config, seed).await,
        Command::Baseline => run_baseline(&config),
    }
}

fn run_rally(config: &LabConfig, seed: u64, count: usize) -> Result<()> {
    let machine = config
        .baseline_machine()
        .context("Failed to build baseline machine")?;
    let simulator =
        RallySimulator::new(canonical_winners()).with_max_steps(config.simulation.max_steps);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    for i in 0..count {
        let rally = simulator.run(&machine, &mut rng)?;
        println!("{:>3}. {}", i + 1, rally.sequence.join(" -> "));
        println!("     {} after {} steps", rally.outcome, rally.steps);
    }
    Ok(())
}

fn run_match(config: &LabConfig, seed: u64, json: bool) -> Result<()> {
    let team_a = config
        .team_a_template()
        .context("Failed to load team A template")?;
    let team_b = config
        .team_b_template()
        .context("Failed to load team B template")?;
    let simulator = MatchSimulator::from_config(&config.simulation);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let tally = simulator.simulate(&team_a, &team_b, config.simulation.num_points, &mut rng)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tally)?);
        return Ok(());
    }

    println!("Points simulated:  {}", tally.points);
    println!(
        "Team A won:        {} ({} on serve)",
        tally.team_a_points, tally.team_a_on_serve
    );
    println!(
        "Team B won:        {} ({} on serve)",
        tally.team_b_points, tally.team_b_on_serve
    );
    println!("Undecided:         {}", tally.undecided);
    println!("Mean rally steps:  {:.2}", tally.mean_rally_steps());
    match tally.win_rate() {
        Some(rate) => println!("Team A win rate:   {:.2}%", rate * 100.0),
        None => bail!("No point reached a terminal state"),
    }
    Ok(())
}

async fn run_elasticity(config: &LabConfig, seed: u64) -> Result<()> {
    let machine = config
        .baseline_machine()
        .context("Failed to build baseline machine")?;
    let engine = ElasticityEngine::new(machine, config.simulation);
    let runner = ElasticityRunner::from_config(engine, config, seed);

    let outcomes = runner.run(&config.statistics).await;
    let report = ElasticityReport::new(outcomes, config.simulation, config.trials, seed);
    print!("{}", report.render());

    if let Some(path) = &config.output {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        tracing::info!("Report written to {}", path.display());
    }

    if report.ranking.is_empty() && !report.outcomes.is_empty() {
        bail!("Every statistic failed");
    }
    Ok(())
}

fn run_baseline(config: &LabConfig) -> Result<()> {
    let machine = config
        .baseline_machine()
        .context("Failed to build baseline machine")?;
    let engine = ElasticityEngine::new(machine, config.simulation);
    let values = engine.baseline_values();

    println!("{:<34} {:<22} {:>9}", "Statistic", "Transition", "Baseline");
    for statistic in Statistic::ALL {
        let value = values
            .get(&statistic)
            .map_or("-".to_string(), |p| format!("{p:.3}"));
        let trainable = if Statistic::TRAINABLE.contains(&statistic) {
            "*"
        } else {
            ""
        };
        println!(
            "{:<34} {:<22} {:>9} {}",
            statistic.name(),
            statistic.destination(),
            value,
            trainable
        );
    }
    Ok(())
}
