//! Choosing which period a batch job works on

use tracing::info;

use crate::adapters::{highest_local_period, DocumentStore};
use crate::domain::extract_period_number;
use crate::error::{PoolcastError, Result};
use crate::tracker::PeriodTracker;

/// Pick the period to process.
///
/// Order: explicit argument, then the tracker's last recorded period, then
/// the highest `{number}{suffix}` document under `result_dir`.
pub fn resolve_period(
    store: &dyn DocumentStore,
    result_dir: &str,
    suffix: &str,
    explicit: Option<&str>,
    tracker: Option<&PeriodTracker>,
) -> Result<u64> {
    if let Some(raw) = explicit {
        return match extract_period_number(Some(raw)) {
            0 => Err(PoolcastError::Validation(format!("invalid period '{raw}'"))),
            n => Ok(n),
        };
    }

    if let Some(n) = tracker
        .and_then(PeriodTracker::last_recorded_period)
        .map(|p| extract_period_number(Some(&p)))
        .filter(|n| *n > 0)
    {
        info!(period = n, "using last recorded period");
        return Ok(n);
    }

    match highest_local_period(store, result_dir, suffix)? {
        Some(n) => {
            info!(period = n, suffix, "using latest local period");
            Ok(n)
        }
        None => Err(PoolcastError::MissingInput(
            "no period given, recorded, or found on disk".to_string(),
        )),
    }
}
