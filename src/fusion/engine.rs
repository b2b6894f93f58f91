//! Probability fusion
//!
//! Pairs the basic and advanced estimates by match id, combines them under a
//! weighting policy, normalizes, and makes the discrete call. Strength
//! scalars from the optional auxiliary source are attached untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::weighting::{WeightingPolicy, DEFAULT_BASIC_DISCOUNT};
use crate::domain::{
    AuxiliaryRecord, FusedMatchResult, MatchProbabilityRecord, SourceProbabilities,
};
use crate::error::{PoolcastError, Result};

/// Which input document a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceRole {
    Basic,
    Advanced,
    Auxiliary,
}

impl SourceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Advanced => "advanced",
            Self::Auxiliary => "auxiliary",
        }
    }
}

/// Non-fatal conditions met during a fusion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FusionWarning {
    /// A match in one mandatory source has no counterpart in the other
    UnmatchedRecord {
        match_id: String,
        missing_from: SourceRole,
    },
    /// Auxiliary data was supplied but has nothing for this match
    MissingAuxiliary { match_id: String },
    /// Auxiliary document was supplied with no records
    EmptyAuxiliary,
}

impl std::fmt::Display for FusionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnmatchedRecord {
                match_id,
                missing_from,
            } => write!(f, "match {match_id} missing from {} source", missing_from.as_str()),
            Self::MissingAuxiliary { match_id } => {
                write!(f, "no auxiliary record for match {match_id}")
            }
            Self::EmptyAuxiliary => write!(f, "auxiliary source is empty"),
        }
    }
}

/// Output of one fusion run
#[derive(Debug, Clone, Default)]
pub struct FusionRun {
    pub results: Vec<FusedMatchResult>,
    pub warnings: Vec<FusionWarning>,
}

/// Stateless fusion under a fixed weighting policy
#[derive(Debug, Clone, Copy)]
pub struct FusionEngine {
    policy: WeightingPolicy,
    basic_discount: f64,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(WeightingPolicy::default(), DEFAULT_BASIC_DISCOUNT)
    }
}

impl FusionEngine {
    pub fn new(policy: WeightingPolicy, basic_discount: f64) -> Self {
        Self {
            policy,
            basic_discount,
        }
    }

    pub fn policy(&self) -> WeightingPolicy {
        self.policy
    }

    pub fn basic_discount(&self) -> f64 {
        self.basic_discount
    }

    /// Fuse the two mandatory sources and the optional auxiliary one.
    ///
    /// Output follows the order of `basic`. Basic matches without an advanced
    /// counterpart are skipped with a warning.
    pub fn fuse(
        &self,
        basic: &[MatchProbabilityRecord],
        advanced: &[MatchProbabilityRecord],
        auxiliary: Option<&[AuxiliaryRecord]>,
    ) -> Result<FusionRun> {
        if basic.is_empty() {
            return Err(PoolcastError::EmptyInput("basic source has no matches".into()));
        }
        if advanced.is_empty() {
            return Err(PoolcastError::EmptyInput("advanced source has no matches".into()));
        }

        let mut run = FusionRun::default();

        let advanced_by_id = index_first(advanced.iter().map(|r| (r.match_id.as_str(), r)));
        let auxiliary_by_id = match auxiliary {
            Some([]) => {
                warn!("auxiliary source is empty, fusing without strength data");
                run.warnings.push(FusionWarning::EmptyAuxiliary);
                None
            }
            Some(records) => Some(index_first(records.iter().map(|r| (r.match_id.as_str(), r)))),
            None => {
                debug!("no auxiliary source supplied");
                None
            }
        };

        for record in basic {
            let Some(counterpart) = advanced_by_id.get(record.match_id.as_str()) else {
                warn!(
                    match_id = %record.match_id,
                    home = %record.home_team,
                    away = %record.away_team,
                    "match missing from advanced source, skipping"
                );
                run.warnings.push(FusionWarning::UnmatchedRecord {
                    match_id: record.match_id.clone(),
                    missing_from: SourceRole::Advanced,
                });
                continue;
            };

            let auxiliary = auxiliary_by_id.as_ref().and_then(|idx| {
                let found = idx.get(record.match_id.as_str()).map(|aux| aux.scalars.clone());
                if found.is_none() {
                    warn!(match_id = %record.match_id, "no auxiliary record for match");
                    run.warnings.push(FusionWarning::MissingAuxiliary {
                        match_id: record.match_id.clone(),
                    });
                }
                found
            });

            run.results.push(self.fuse_match(record, counterpart, auxiliary));
        }

        let basic_ids: HashSet<&str> = basic.iter().map(|r| r.match_id.as_str()).collect();
        for record in advanced {
            if !basic_ids.contains(record.match_id.as_str()) {
                warn!(match_id = %record.match_id, "match missing from basic source");
                run.warnings.push(FusionWarning::UnmatchedRecord {
                    match_id: record.match_id.clone(),
                    missing_from: SourceRole::Basic,
                });
            }
        }

        debug!(
            fused = run.results.len(),
            warnings = run.warnings.len(),
            policy = %self.policy,
            "fusion complete"
        );

        Ok(run)
    }

    fn fuse_match(
        &self,
        basic: &MatchProbabilityRecord,
        advanced: &MatchProbabilityRecord,
        auxiliary: Option<BTreeMap<String, serde_json::Value>>,
    ) -> FusedMatchResult {
        let combined =
            self.policy
                .combine(&basic.probabilities, &advanced.probabilities, self.basic_discount);
        let fused = combined.normalized();

        FusedMatchResult {
            match_id: basic.match_id.clone(),
            league: basic.league.clone(),
            home_team: basic.home_team.clone(),
            away_team: basic.away_team.clone(),
            kickoff: basic.kickoff.clone(),
            source_probabilities: SourceProbabilities {
                basic: basic.probabilities,
                advanced: advanced.probabilities,
            },
            fused_probabilities: fused,
            outcome: fused.outcome(),
            auxiliary,
        }
    }
}

/// Index by id, keeping the first record when ids repeat
fn index_first<'a, T>(items: impl Iterator<Item = (&'a str, &'a T)>) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::new();
    for (id, item) in items {
        index.entry(id).or_insert(item);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Outcome, ProbabilityTriple};
    use serde_json::json;

    fn record(id: &str, win: f64, draw: f64, loss: f64) -> MatchProbabilityRecord {
        MatchProbabilityRecord {
            match_id: id.to_string(),
            league: "EPL".to_string(),
            home_team: format!("home-{id}"),
            away_team: format!("away-{id}"),
            kickoff: "2026-02-01 20:00".to_string(),
            probabilities: ProbabilityTriple::new(win, draw, loss),
        }
    }

    fn aux(id: &str) -> AuxiliaryRecord {
        AuxiliaryRecord {
            match_id: id.to_string(),
            scalars: BTreeMap::from([("home_strength".to_string(), json!(3.2))]),
        }
    }

    #[test]
    fn test_empty_basic_is_error() {
        let err = FusionEngine::default()
            .fuse(&[], &[record("1", 0.5, 0.3, 0.2)], None)
            .unwrap_err();
        assert!(matches!(err, PoolcastError::EmptyInput(_)));
    }

    #[test]
    fn test_empty_advanced_is_error() {
        let err = FusionEngine::default()
            .fuse(&[record("1", 0.5, 0.3, 0.2)], &[], None)
            .unwrap_err();
        assert!(matches!(err, PoolcastError::EmptyInput(_)));
    }

    #[test]
    fn test_discounted_end_to_end() {
        let engine = FusionEngine::new(WeightingPolicy::DiscountedBasic, 0.8);
        let run = engine
            .fuse(
                &[record("1", 0.50, 0.30, 0.20)],
                &[record("1", 0.10, 0.05, 0.05)],
                None,
            )
            .unwrap();

        let fused = &run.results[0];
        assert!((fused.fused_probabilities.win - 0.50).abs() < 1e-9);
        assert!((fused.fused_probabilities.draw - 0.29).abs() < 1e-9);
        assert!((fused.fused_probabilities.loss - 0.21).abs() < 1e-9);
        assert_eq!(fused.outcome, Outcome::HomeWin);
        assert_eq!(
            fused.source_probabilities.basic,
            ProbabilityTriple::new(0.50, 0.30, 0.20)
        );
        assert!(run.warnings.is_empty());
    }

    #[test]
    fn test_degenerate_sources_give_uniform_home_win() {
        let run = FusionEngine::default()
            .fuse(&[record("1", 0.0, 0.0, 0.0)], &[record("1", 0.0, 0.0, 0.0)], None)
            .unwrap();
        assert_eq!(run.results[0].fused_probabilities, ProbabilityTriple::UNIFORM);
        assert_eq!(run.results[0].outcome, Outcome::HomeWin);
    }

    #[test]
    fn test_unmatched_basic_is_skipped_with_warning() {
        let run = FusionEngine::default()
            .fuse(
                &[record("101", 0.5, 0.3, 0.2), record("102", 0.2, 0.3, 0.5)],
                &[record("102", 0.1, 0.1, 0.3)],
                None,
            )
            .unwrap();

        assert_eq!(run.results.len(), 1);
        assert_eq!(run.results[0].match_id, "102");
        assert_eq!(run.results[0].outcome, Outcome::AwayWin);
        assert_eq!(
            run.warnings,
            vec![FusionWarning::UnmatchedRecord {
                match_id: "101".into(),
                missing_from: SourceRole::Advanced,
            }]
        );
    }

    #[test]
    fn test_advanced_only_match_is_reported() {
        let run = FusionEngine::default()
            .fuse(
                &[record("1", 0.5, 0.3, 0.2)],
                &[record("1", 0.5, 0.3, 0.2), record("9", 0.5, 0.3, 0.2)],
                None,
            )
            .unwrap();
        assert_eq!(run.results.len(), 1);
        assert!(run.warnings.contains(&FusionWarning::UnmatchedRecord {
            match_id: "9".into(),
            missing_from: SourceRole::Basic,
        }));
    }

    #[test]
    fn test_auxiliary_attached_verbatim() {
        let auxiliary = [aux("1")];
        let run = FusionEngine::default()
            .fuse(
                &[record("1", 0.5, 0.3, 0.2), record("2", 0.3, 0.3, 0.4)],
                &[record("1", 0.5, 0.3, 0.2), record("2", 0.3, 0.3, 0.4)],
                Some(&auxiliary),
            )
            .unwrap();

        let first = run.results[0].auxiliary.as_ref().unwrap();
        assert_eq!(first.get("home_strength"), Some(&json!(3.2)));
        assert!(run.results[1].auxiliary.is_none());
        assert_eq!(
            run.warnings,
            vec![FusionWarning::MissingAuxiliary {
                match_id: "2".into()
            }]
        );
    }

    #[test]
    fn test_empty_auxiliary_is_a_warning() {
        let run = FusionEngine::default()
            .fuse(&[record("1", 0.5, 0.3, 0.2)], &[record("1", 0.5, 0.3, 0.2)], Some(&[]))
            .unwrap();
        assert_eq!(run.results.len(), 1);
        assert!(run.results[0].auxiliary.is_none());
        assert_eq!(run.warnings, vec![FusionWarning::EmptyAuxiliary]);
    }

    #[test]
    fn test_policies_can_disagree() {
        // Basic favors home, advanced favors away; the discount flips the call.
        let basic = [record("1", 0.60, 0.30, 0.10)];
        let advanced = [record("1", 0.10, 0.35, 0.55)];

        let unweighted = FusionEngine::new(WeightingPolicy::UnweightedSum, 0.8)
            .fuse(&basic, &advanced, None)
            .unwrap();
        let discounted = FusionEngine::new(WeightingPolicy::DiscountedBasic, 0.8)
            .fuse(&basic, &advanced, None)
            .unwrap();

        assert_eq!(unweighted.results[0].outcome, Outcome::HomeWin);
        assert_eq!(discounted.results[0].outcome, Outcome::AwayWin);
    }

    #[test]
    fn test_fused_triples_sum_to_one() {
        let basic: Vec<_> = (0..14)
            .map(|i| record(&i.to_string(), 0.1 + i as f64 * 0.03, 0.27, 0.61 - i as f64 * 0.02))
            .collect();
        let advanced: Vec<_> = (0..14)
            .map(|i| record(&i.to_string(), 0.33, 0.2 + i as f64 * 0.01, 0.4))
            .collect();

        for policy in [WeightingPolicy::UnweightedSum, WeightingPolicy::DiscountedBasic] {
            let run = FusionEngine::new(policy, 0.8)
                .fuse(&basic, &advanced, None)
                .unwrap();
            assert_eq!(run.results.len(), 14);
            for r in &run.results {
                assert!((r.fused_probabilities.sum() - 1.0).abs() < 1e-9);
            }
        }
    }
}
