//! One fusion run for one period: load inputs, fuse, persist the report

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use super::period_select::resolve_period;
use crate::adapters::DocumentStore;
use crate::config::{AppConfig, FusionConfig, StorageConfig};
use crate::domain::extract_period_number;
use crate::error::{PoolcastError, Result};
use crate::fusion::{
    parse_auxiliary_document, parse_source_document, FusionEngine, FusionReport, SourceDocument,
    SourceIds,
};
use crate::tracker::PeriodTracker;

/// Report plus the key it was written under
#[derive(Debug, Clone)]
pub struct FusionJobOutput {
    pub report: FusionReport,
    pub output_key: String,
}

pub struct FusionJob {
    store: Arc<dyn DocumentStore>,
    storage: StorageConfig,
    fusion: FusionConfig,
    engine: FusionEngine,
}

impl FusionJob {
    pub fn new(store: Arc<dyn DocumentStore>, storage: StorageConfig, fusion: FusionConfig) -> Self {
        let engine = FusionEngine::new(fusion.weighting, fusion.basic_discount);
        Self {
            store,
            storage,
            fusion,
            engine,
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, config: &AppConfig) -> Self {
        Self::new(store, config.storage.clone(), config.fusion.clone())
    }

    pub fn engine(&self) -> &FusionEngine {
        &self.engine
    }

    /// Pick the period to fuse: explicit, last recorded, then the latest
    /// basic-source document on disk
    pub fn resolve_period(
        &self,
        explicit: Option<&str>,
        tracker: Option<&PeriodTracker>,
    ) -> Result<u64> {
        resolve_period(
            self.store.as_ref(),
            &self.storage.result_dir,
            &self.fusion.basic_suffix,
            explicit,
            tracker,
        )
    }

    /// Fuse `period_number` and write the report
    pub fn run(&self, period_number: u64) -> Result<FusionJobOutput> {
        let basic_key = self.storage.period_key(period_number, &self.fusion.basic_suffix);
        let advanced_key = self.storage.period_key(period_number, &self.fusion.advanced_suffix);
        let auxiliary_key = self
            .storage
            .period_key(period_number, &self.fusion.auxiliary_suffix);

        let basic = self.load_source(&basic_key, period_number)?;
        let advanced = self.load_source(&advanced_key, period_number)?;
        let auxiliary = self.load_auxiliary(&auxiliary_key);

        let run = self.engine.fuse(
            &basic.records,
            &advanced.records,
            auxiliary.as_ref().map(|(_, records)| records.as_slice()),
        )?;

        let period = basic
            .period
            .clone()
            .unwrap_or_else(|| format!("{period_number}期"));
        let sources = SourceIds {
            basic: self.store.locate(&basic_key),
            advanced: self.store.locate(&advanced_key),
            auxiliary: auxiliary.map(|(key, _)| key),
        };
        let report = FusionReport::new(period, sources, &self.engine, run);

        let output_key = self.storage.period_key(period_number, &self.fusion.output_suffix);
        self.store.write(&output_key, &serde_json::to_value(&report)?)?;

        info!(
            period = period_number,
            matches = report.matches.len(),
            warnings = report.warnings.len(),
            weighting = %report.weighting,
            output = %self.store.locate(&output_key),
            "fusion report written"
        );

        Ok(FusionJobOutput { report, output_key })
    }

    fn load_source(&self, key: &str, period_number: u64) -> Result<SourceDocument> {
        let value = self
            .store
            .read(key)?
            .ok_or_else(|| PoolcastError::MissingInput(self.store.locate(key)))?;
        let doc = parse_source_document(&value)?;

        if let Some(declared) = doc.period.as_deref() {
            let declared_number = extract_period_number(Some(declared));
            if declared_number != 0 && declared_number != period_number {
                warn!(
                    key,
                    declared = declared_number,
                    expected = period_number,
                    "document declares a different period"
                );
            }
        }

        Ok(doc)
    }

    /// Optional strength document; absence or a bad shape is only a warning
    fn load_auxiliary(&self, key: &str) -> Option<(String, Vec<crate::domain::AuxiliaryRecord>)> {
        let value: Value = match self.store.read(key) {
            Ok(Some(value)) => value,
            Ok(None) => {
                warn!(key, "auxiliary document not found, fusing without it");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "auxiliary document unreadable, fusing without it");
                return None;
            }
        };

        match parse_auxiliary_document(&value) {
            Ok(doc) => Some((self.store.locate(key), doc.records)),
            Err(e) => {
                warn!(key, error = %e, "auxiliary document invalid, fusing without it");
                None
            }
        }
    }
}
