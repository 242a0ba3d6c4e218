//! volley-lab - run configuration, concurrent elasticity sweeps and reports
//! on top of `volley-core`.

pub mod config;
pub mod report;
pub mod runner;

pub use config::LabConfig;
pub use report::{rank, ElasticityReport, Impact, RankedStatistic};
pub use runner::{ElasticityRunner, Measurement, StatisticOutcome};
