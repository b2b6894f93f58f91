//! Betting period identifiers and observations
//!
//! Periods arrive from the provider as tokens like `"26027"` or `"26027期"`.
//! The numeric part orders them; the raw token is kept for display and file keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extract the first contiguous run of ASCII digits as a period number.
///
/// Returns 0 when the input is absent, empty, contains no digits, or the digit
/// run does not fit in a `u64`.
pub fn extract_period_number(period: Option<&str>) -> u64 {
    let Some(raw) = period else {
        return 0;
    };

    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// One record in the observation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodObservation {
    /// Raw period token as reported by the provider
    pub period: String,
    /// Leading digit run of `period`
    pub period_number: u64,
    /// Capture time
    pub timestamp: DateTime<Utc>,
}

impl PeriodObservation {
    pub fn new(period: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        let period = period.into();
        let period_number = extract_period_number(Some(&period));
        Self {
            period,
            period_number,
            timestamp,
        }
    }

    pub fn now(period: impl Into<String>) -> Self {
        Self::new(period, Utc::now())
    }
}

/// Loosely-read view of a stored observation.
///
/// Older log files carry only `period` (sometimes as a number) and no
/// `period_number`; every field is optional here so any of them can be read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggedObservation {
    #[serde(default)]
    pub period: Option<serde_json::Value>,
    #[serde(default)]
    pub period_number: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LoggedObservation {
    /// Period token rendered as a string, whatever JSON type it was stored as
    pub fn period_token(&self) -> Option<String> {
        match self.period.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Stored number, falling back to re-deriving it from `period`
    pub fn resolved_number(&self) -> u64 {
        let stored = match self.period_number.as_ref() {
            Some(serde_json::Value::Number(n)) => n.as_u64(),
            Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        };

        stored.unwrap_or_else(|| extract_period_number(self.period_token().as_deref()))
    }
}
