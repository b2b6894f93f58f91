//! Orchestration glue between adapters and the core components

pub mod fusion_job;
pub mod period_select;
pub mod period_watch;
pub mod strength_job;

pub use fusion_job::{FusionJob, FusionJobOutput};
pub use period_select::resolve_period;
pub use period_watch::run_period_check;
pub use strength_job::{StrengthJob, StrengthJobOutput};
