//! Fetch-then-track cycle for the period tracker

use std::time::Duration;
use tracing::warn;

use crate::adapters::PeriodSource;
use crate::tracker::{PeriodCheck, PeriodTracker};

/// Fetch the current period (bounded by `deadline`) and run the tracker on it.
///
/// A fetch that overruns the deadline counts as an absent signal.
pub async fn run_period_check(
    source: &dyn PeriodSource,
    tracker: &PeriodTracker,
    deadline: Duration,
) -> PeriodCheck {
    let signal = match tokio::time::timeout(deadline, source.fetch_current_period()).await {
        Ok(signal) => signal,
        Err(_) => {
            warn!(deadline_secs = deadline.as_secs_f64(), "period fetch timed out");
            None
        }
    };

    tracker.check_new_period(signal.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{FixedPeriodSource, InMemoryDocumentStore};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct SlowSource;

    #[async_trait]
    impl PeriodSource for SlowSource {
        async fn fetch_current_period(&self) -> Option<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Some("26099".to_string())
        }
    }

    #[tokio::test]
    async fn test_signal_flows_into_tracker() {
        let tracker = PeriodTracker::with_defaults(Arc::new(InMemoryDocumentStore::new()));
        let source = FixedPeriodSource(Some("26027".into()));

        let first = run_period_check(&source, &tracker, Duration::from_secs(1)).await;
        let second = run_period_check(&source, &tracker, Duration::from_secs(1)).await;

        assert!(first.has_new_period);
        assert!(!second.has_new_period);
    }

    #[tokio::test]
    async fn test_timeout_is_absent_signal() {
        let store = Arc::new(InMemoryDocumentStore::new());
        let tracker = PeriodTracker::with_defaults(store.clone());

        let check = run_period_check(&SlowSource, &tracker, Duration::from_millis(50)).await;

        assert!(!check.has_new_period);
        assert!(check.current_period.is_none());
        assert!(crate::adapters::DocumentStore::read(store.as_ref(), "present.json")
            .unwrap()
            .is_none());
    }
}
