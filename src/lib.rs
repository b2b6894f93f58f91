pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod fusion;
pub mod services;
pub mod strength;
pub mod tracker;

pub use adapters::{DocumentStore, FsDocumentStore, HttpPeriodSource, InMemoryDocumentStore, PeriodSource};
pub use config::AppConfig;
pub use domain::{
    extract_period_number, FusedMatchResult, MatchProbabilityRecord, Outcome, PeriodObservation,
    ProbabilityTriple,
};
pub use error::{PoolcastError, Result};
pub use fusion::{FusionEngine, FusionReport, FusionRun, FusionWarning, WeightingPolicy};
pub use services::{run_period_check, FusionJob, StrengthJob};
pub use strength::{StrengthCalculator, StrengthDocument};
pub use tracker::{PeriodCheck, PeriodTracker, TrackerSettings};
