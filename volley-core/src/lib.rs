//! # volley-core
//!
//! Core library for volley, a Monte-Carlo model of beach volleyball rallies.
//!
//! This crate provides the rally state machine, team probability templates,
//! the machine builder, rally and head-to-head point simulation, and the
//! elasticity engine that measures how much a single skill statistic moves
//! a team's point win rate.

pub mod builder;
pub mod canonical;
pub mod config;
pub mod elasticity;
pub mod error;
pub mod machine;
pub mod matchup;
pub mod rally;
pub mod spread;
pub mod state;
pub mod statistic;
pub mod template;
pub mod winner;

pub use builder::MachineBuilder;
pub use canonical::{canonical_machine, canonical_terminal_states, canonical_winners};
pub use config::SimulationConfig;
pub use elasticity::{compute_elasticity, Consistency, Elasticity, ElasticityEngine};
pub use error::{ErrorKind, VolleyError, VolleyResult};
pub use machine::{StateMachine, DEFAULT_INITIAL_STATE, PROBABILITY_TOLERANCE};
pub use matchup::{MatchSimulator, MatchTally};
pub use rally::{Rally, RallyOutcome, RallySimulator};
pub use spread::Spread;
pub use state::{ActionKind, Side, Transition};
pub use statistic::Statistic;
pub use template::ProbabilityTemplate;
pub use winner::WinnerAssignment;

/// Version of the reference probability table
pub const MODEL_VERSION: &str = "1";
