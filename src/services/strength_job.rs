//! Strength scoring for one period: head-to-head history in, auxiliary document out

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

use super::period_select::resolve_period;
use crate::adapters::DocumentStore;
use crate::config::{AppConfig, StorageConfig, StrengthConfig};
use crate::error::{PoolcastError, Result};
use crate::strength::{HistoryDocument, StrengthCalculator, StrengthDocument};
use crate::tracker::PeriodTracker;

#[derive(Debug, Clone)]
pub struct StrengthJobOutput {
    pub document: StrengthDocument,
    pub output_key: String,
}

pub struct StrengthJob {
    store: Arc<dyn DocumentStore>,
    storage: StorageConfig,
    strength: StrengthConfig,
    output_suffix: String,
}

impl StrengthJob {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: StorageConfig,
        strength: StrengthConfig,
        output_suffix: String,
    ) -> Self {
        Self {
            store,
            storage,
            strength,
            output_suffix,
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self::new(
            store,
            config.storage.clone(),
            config.strength.clone(),
            config.fusion.auxiliary_suffix.clone(),
        )
    }

    /// Explicit period, then last recorded, then the latest history document on disk
    pub fn resolve_period(
        &self,
        explicit: Option<&str>,
        tracker: Option<&PeriodTracker>,
    ) -> Result<u64> {
        resolve_period(
            self.store.as_ref(),
            &self.storage.result_dir,
            &self.strength.history_suffix,
            explicit,
            tracker,
        )
    }

    /// Score `period_number` against `as_of` and write the strength document
    pub fn run(&self, period_number: u64, as_of: NaiveDate) -> Result<StrengthJobOutput> {
        let history_key = self
            .storage
            .period_key(period_number, &self.strength.history_suffix);
        let value = self
            .store
            .read(&history_key)?
            .ok_or_else(|| PoolcastError::MissingInput(self.store.locate(&history_key)))?;
        let history: HistoryDocument = serde_json::from_value(value)?;

        let calculator = StrengthCalculator::new(as_of, self.strength.weekly_decay);
        let document = calculator.evaluate_document(&history, &format!("{period_number}期"));

        let output_key = self.storage.period_key(period_number, &self.output_suffix);
        self.store
            .write(&output_key, &serde_json::to_value(&document)?)?;

        info!(
            period = period_number,
            matches = document.results.len(),
            scored = document.scored_matches(),
            output = %self.store.locate(&output_key),
            "strength document written"
        );

        Ok(StrengthJobOutput {
            document,
            output_key,
        })
    }
}
