//! Period tracker
//!
//! Decides whether the provider has moved on to a new period since the last
//! recorded observation, and records every observation it is given.
//!
//! Policy:
//! - the log is append-only and its *last* entry is the reference point, not
//!   the highest number in it; a hand-edited out-of-order entry is respected
//! - an empty or unreadable log makes any present signal "new"
//! - no signal is never "new", whatever is on disk
//! - every failure collapses to "no new period"

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::adapters::{highest_local_period, DocumentStore};
use crate::config::AppConfig;
use crate::domain::{extract_period_number, LoggedObservation, PeriodObservation};
use crate::error::{PoolcastError, Result};

/// Where the tracker keeps its state
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Observation log key
    pub log_key: String,
    /// Namespace of materialized per-period documents
    pub result_dir: String,
    /// Suffix of the documents counted by the local fallback scan
    pub local_scan_suffix: String,
}

impl TrackerSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            log_key: config.storage.observation_log.clone(),
            result_dir: config.storage.result_dir.clone(),
            local_scan_suffix: config.tracker.local_scan_suffix.clone(),
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            log_key: "present.json".to_string(),
            result_dir: "result".to_string(),
            local_scan_suffix: "期_历史交锋.json".to_string(),
        }
    }
}

/// Result of one tracker invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeriodCheck {
    pub has_new_period: bool,
    /// Signal as received
    pub current_period: Option<String>,
    pub current_number: Option<u64>,
    /// Number of the log's last entry before this call, if any
    pub last_number: Option<u64>,
    /// Highest locally materialized period, consulted only without a signal
    pub local_number: Option<u64>,
    /// Whether this call's observation was persisted
    pub recorded: bool,
}

impl PeriodCheck {
    pub fn no_new_period() -> Self {
        Self::default()
    }

    /// Process exit code: `new_period_code` when a new period was seen, else 0
    pub fn exit_code(&self, new_period_code: i32) -> i32 {
        if self.has_new_period {
            new_period_code
        } else {
            0
        }
    }
}

pub struct PeriodTracker {
    store: Arc<dyn DocumentStore>,
    settings: TrackerSettings,
}

impl PeriodTracker {
    pub fn new(store: Arc<dyn DocumentStore>, settings: TrackerSettings) -> Self {
        Self { store, settings }
    }

    pub fn with_defaults(store: Arc<dyn DocumentStore>) -> Self {
        Self::new(store, TrackerSettings::default())
    }

    /// Compare `current_signal` against the log and record it.
    ///
    /// Never fails: any internal error is logged and reported as no new period.
    pub fn check_new_period(&self, current_signal: Option<&str>) -> PeriodCheck {
        match self.try_check(current_signal) {
            Ok(check) => check,
            Err(e) => {
                warn!(error = %e, "period check failed, reporting no new period");
                PeriodCheck::no_new_period()
            }
        }
    }

    fn try_check(&self, current_signal: Option<&str>) -> Result<PeriodCheck> {
        let signal = current_signal.map(str::trim).filter(|s| !s.is_empty());

        let Some(signal) = signal else {
            let local_number = self.local_fallback();
            return Ok(PeriodCheck {
                local_number,
                ..PeriodCheck::no_new_period()
            });
        };

        let current_number = extract_period_number(Some(signal));
        let last_number = match self.load_log() {
            Ok(log) => log.last().map(|entry| parse_entry(entry).resolved_number()),
            Err(e) => {
                warn!(error = %e, "observation log unreadable, treating as empty");
                None
            }
        };

        let has_new_period = match last_number {
            None => true,
            Some(last) => current_number > last,
        };

        if has_new_period {
            info!(current = current_number, last = ?last_number, "new period detected");
        } else {
            debug!(current = current_number, last = ?last_number, "no new period");
        }

        let recorded = match self.append(PeriodObservation::now(signal)) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, period = %signal, "failed to record observation");
                false
            }
        };

        Ok(PeriodCheck {
            has_new_period,
            current_period: Some(signal.to_string()),
            current_number: Some(current_number),
            last_number,
            local_number: None,
            recorded,
        })
    }

    /// Append one observation (read-modify-write)
    pub fn append(&self, observation: PeriodObservation) -> Result<()> {
        let mut log = self.load_log()?;
        log.push(serde_json::to_value(&observation)?);
        self.store.write(&self.settings.log_key, &Value::Array(log))
    }

    /// Period token of the most recently recorded observation
    pub fn last_recorded_period(&self) -> Option<String> {
        let log = self.load_log().ok()?;
        parse_entry(log.last()?).period_token()
    }

    /// All recorded observations, oldest first
    pub fn observations(&self) -> Result<Vec<LoggedObservation>> {
        Ok(self.load_log()?.iter().map(parse_entry).collect())
    }

    /// Highest locally materialized period, if any
    pub fn local_fallback(&self) -> Option<u64> {
        match highest_local_period(
            self.store.as_ref(),
            &self.settings.result_dir,
            &self.settings.local_scan_suffix,
        ) {
            Ok(Some(n)) => {
                info!(local_period = n, "no upstream signal, local data present");
                Some(n)
            }
            Ok(None) => {
                info!("no upstream signal and no local data");
                None
            }
            Err(e) => {
                warn!(error = %e, "local result scan failed");
                None
            }
        }
    }

    /// Load the log. A malformed document is reset to empty; IO failures propagate.
    fn load_log(&self) -> Result<Vec<Value>> {
        match self.store.read(&self.settings.log_key) {
            Ok(Some(Value::Array(entries))) => Ok(entries),
            Ok(Some(other)) => {
                let err = PoolcastError::MalformedLog(format!(
                    "expected an array, found {}",
                    json_kind(&other)
                ));
                warn!(error = %err, "resetting observation log");
                Ok(Vec::new())
            }
            Ok(None) => Ok(Vec::new()),
            Err(PoolcastError::Json(e)) => {
                let err = PoolcastError::MalformedLog(e.to_string());
                warn!(error = %err, "resetting observation log");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn parse_entry(entry: &Value) -> LoggedObservation {
    serde_json::from_value(entry.clone()).unwrap_or_default()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryDocumentStore;
    use serde_json::json;

    fn tracker(store: InMemoryDocumentStore) -> (PeriodTracker, Arc<InMemoryDocumentStore>) {
        let store = Arc::new(store);
        (PeriodTracker::with_defaults(store.clone()), store)
    }

    fn log_len(store: &InMemoryDocumentStore) -> usize {
        store
            .read("present.json")
            .unwrap()
            .and_then(|v| v.as_array().map(Vec::len))
            .unwrap_or(0)
    }

    #[test]
    fn test_cold_start_is_new() {
        let (tracker, store) = tracker(InMemoryDocumentStore::new());
        let check = tracker.check_new_period(Some("26027"));
        assert!(check.has_new_period);
        assert_eq!(check.last_number, None);
        assert!(check.recorded);
        assert_eq!(log_len(&store), 1);
    }

    #[test]
    fn test_same_period_is_not_new() {
        let (tracker, store) = tracker(InMemoryDocumentStore::new());
        tracker.check_new_period(Some("26027"));
        let check = tracker.check_new_period(Some("26027期"));
        assert!(!check.has_new_period);
        assert_eq!(check.last_number, Some(26027));
        assert_eq!(log_len(&store), 2);
    }

    #[test]
    fn test_regression_is_not_new() {
        let (tracker, _) = tracker(InMemoryDocumentStore::new());
        tracker.check_new_period(Some("26027"));
        assert!(!tracker.check_new_period(Some("26026")).has_new_period);
    }

    #[test]
    fn test_last_entry_wins_over_max() {
        let store = InMemoryDocumentStore::new().with_document(
            "present.json",
            json!([
                { "period": "26030", "period_number": 26030 },
                { "period": "26020", "period_number": 26020 }
            ]),
        );
        let (tracker, _) = tracker(store);
        let check = tracker.check_new_period(Some("26025"));
        assert!(check.has_new_period);
        assert_eq!(check.last_number, Some(26020));
    }

    #[test]
    fn test_legacy_entry_without_number() {
        let store = InMemoryDocumentStore::new()
            .with_document("present.json", json!([{ "period": "26027", "timestamp": "2026-01-01T00:00:00" }]));
        let (tracker, _) = tracker(store);
        assert!(!tracker.check_new_period(Some("26027")).has_new_period);
        assert!(tracker.check_new_period(Some("26028")).has_new_period);
    }

    #[test]
    fn test_no_signal_never_new_and_never_logged() {
        let store = InMemoryDocumentStore::new()
            .with_document("result/26027期_历史交锋.json", json!({}));
        let (tracker, store) = tracker(store);

        let check = tracker.check_new_period(None);
        assert!(!check.has_new_period);
        assert_eq!(check.local_number, Some(26027));
        assert_eq!(log_len(&store), 0);

        let check = tracker.check_new_period(Some("  "));
        assert!(!check.has_new_period);
        assert_eq!(log_len(&store), 0);
    }

    #[test]
    fn test_no_signal_no_local_data() {
        let (tracker, _) = tracker(InMemoryDocumentStore::new());
        let check = tracker.check_new_period(None);
        assert_eq!(check, PeriodCheck::no_new_period());
    }

    #[test]
    fn test_malformed_log_is_reset() {
        let store = InMemoryDocumentStore::new()
            .with_document("present.json", json!({ "period": "26030" }));
        let (tracker, store) = tracker(store);

        let check = tracker.check_new_period(Some("26027"));
        assert!(check.has_new_period);
        assert_eq!(log_len(&store), 1);
    }

    #[test]
    fn test_exit_codes() {
        let new = PeriodCheck {
            has_new_period: true,
            ..PeriodCheck::default()
        };
        assert_eq!(new.exit_code(2), 2);
        assert_eq!(new.exit_code(1), 1);
        assert_eq!(PeriodCheck::no_new_period().exit_code(2), 0);
    }

    #[test]
    fn test_last_recorded_period() {
        let (tracker, _) = tracker(InMemoryDocumentStore::new());
        assert!(tracker.last_recorded_period().is_none());
        tracker.check_new_period(Some("26027"));
        tracker.check_new_period(Some("26028"));
        assert_eq!(tracker.last_recorded_period().as_deref(), Some("26028"));
        assert_eq!(tracker.observations().unwrap().len(), 2);
    }
}
