//! Fusion output document

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::engine::{FusionEngine, FusionRun, FusionWarning, SourceRole};
use crate::domain::{FusedMatchResult, Outcome};

/// Identifiers of the documents that fed a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIds {
    pub basic: String,
    pub advanced: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<String>,
}

/// Output document for one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionReport {
    pub period: String,
    pub period_number: u64,
    pub generated_at: DateTime<Utc>,
    pub sources: SourceIds,
    pub weighting: String,
    pub basic_discount: f64,
    pub matches: Vec<FusedMatchResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FusionWarning>,
}

impl FusionReport {
    pub fn new(
        period: impl Into<String>,
        sources: SourceIds,
        engine: &FusionEngine,
        run: FusionRun,
    ) -> Self {
        let period = period.into();
        let period_number = crate::domain::extract_period_number(Some(&period));
        Self {
            period,
            period_number,
            generated_at: Utc::now(),
            sources,
            weighting: engine.policy().label().to_string(),
            basic_discount: engine.basic_discount(),
            matches: run.results,
            warnings: run.warnings,
        }
    }

    /// Ticket line in match order, e.g. `3103...`
    pub fn ticket(&self) -> String {
        self.matches.iter().map(|m| m.outcome.ticket_symbol()).collect()
    }

    pub fn count_outcome(&self, outcome: Outcome) -> usize {
        self.matches.iter().filter(|m| m.outcome == outcome).count()
    }

    /// Matches skipped because a mandatory source lacked them
    pub fn skipped_matches(&self) -> Vec<&str> {
        self.warnings
            .iter()
            .filter_map(|w| match w {
                FusionWarning::UnmatchedRecord {
                    match_id,
                    missing_from: SourceRole::Advanced,
                } => Some(match_id.as_str()),
                _ => None,
            })
            .collect()
    }
}
