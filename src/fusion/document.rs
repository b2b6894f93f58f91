//! Boundary validation for fusion input documents
//!
//! Source documents are loosely shaped JSON written by separate estimators.
//! Both English keys and the provider's native keys are accepted:
//!
//! | field         | English         | native                      |
//! |---------------|-----------------|-----------------------------|
//! | period        | `period`        | `期数`                      |
//! | match list    | `matches`       | `14场对战信息` / `14场比赛结果` |
//! | match id      | `match_id`      | `场次`                      |
//! | league        | `league`        | `联赛`                      |
//! | home / away   | `home_team` / `away_team` | `主队` / `客队`   |
//! | kickoff       | `kickoff`       | `比赛时间`                  |
//! | probabilities | `probabilities.{win,draw,loss}` | `预测概率.{<主队>胜,平,<客队>胜}` |
//!
//! Everything missing is turned into a typed default here so the arithmetic
//! downstream never sees an absent value.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::warn;

use crate::domain::{AuxiliaryRecord, MatchProbabilityRecord, ProbabilityTriple};
use crate::error::{PoolcastError, Result};

const PERIOD_KEYS: &[&str] = &["period", "期数"];
const MATCHES_KEYS: &[&str] = &["matches", "14场对战信息", "14场比赛结果"];
const MATCH_ID_KEYS: &[&str] = &["match_id", "场次"];
const LEAGUE_KEYS: &[&str] = &["league", "联赛"];
const HOME_KEYS: &[&str] = &["home_team", "主队"];
const AWAY_KEYS: &[&str] = &["away_team", "客队"];
const KICKOFF_KEYS: &[&str] = &["kickoff", "比赛时间"];
const PROBABILITY_KEYS: &[&str] = &["probabilities", "预测概率"];

/// A validated win/draw/loss source document
#[derive(Debug, Clone, Default)]
pub struct SourceDocument {
    pub period: Option<String>,
    pub records: Vec<MatchProbabilityRecord>,
}

/// A validated strength-differential document
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryDocument {
    pub period: Option<String>,
    pub records: Vec<AuxiliaryRecord>,
}

/// Coerce a raw probability value to a float.
///
/// Numbers are used as-is. Strings have one trailing `%` stripped and are
/// divided by 100. Anything else, or anything unparseable, is 0. The result
/// is clamped to `[0, 1]`.
pub fn coerce_probability(value: Option<&Value>) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
            digits.parse::<f64>().ok().map(|v| v / 100.0)
        }
        _ => None,
    };

    parsed
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

pub fn parse_source_document(value: &Value) -> Result<SourceDocument> {
    let period = document_period(value);
    let mut records = Vec::new();

    for (idx, entry) in match_entries(value)?.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            warn!(index = idx, "skipping non-object match entry");
            continue;
        };
        let Some(match_id) = scalar_string(field(obj, MATCH_ID_KEYS)) else {
            warn!(index = idx, "skipping match entry without an id");
            continue;
        };

        let home_team = scalar_string(field(obj, HOME_KEYS)).unwrap_or_default();
        let away_team = scalar_string(field(obj, AWAY_KEYS)).unwrap_or_default();
        let probabilities = field(obj, PROBABILITY_KEYS)
            .and_then(Value::as_object)
            .map(|p| probability_triple(p, &home_team, &away_team))
            .unwrap_or_default();

        records.push(MatchProbabilityRecord {
            match_id,
            league: scalar_string(field(obj, LEAGUE_KEYS)).unwrap_or_default(),
            home_team,
            away_team,
            kickoff: scalar_string(field(obj, KICKOFF_KEYS)).unwrap_or_default(),
            probabilities,
        });
    }

    Ok(SourceDocument { period, records })
}

pub fn parse_auxiliary_document(value: &Value) -> Result<AuxiliaryDocument> {
    let period = document_period(value);
    let mut records = Vec::new();

    for (idx, entry) in match_entries(value)?.iter().enumerate() {
        let Some(obj) = entry.as_object() else {
            warn!(index = idx, "skipping non-object auxiliary entry");
            continue;
        };
        let Some(match_id) = scalar_string(field(obj, MATCH_ID_KEYS)) else {
            warn!(index = idx, "skipping auxiliary entry without an id");
            continue;
        };

        let scalars: BTreeMap<String, Value> = obj
            .iter()
            .filter(|(k, _)| !MATCH_ID_KEYS.contains(&k.as_str()))
            .filter(|(_, v)| matches!(v, Value::Number(_) | Value::String(_) | Value::Bool(_)))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        records.push(AuxiliaryRecord { match_id, scalars });
    }

    Ok(AuxiliaryDocument { period, records })
}

fn probability_triple(
    probs: &Map<String, Value>,
    home_team: &str,
    away_team: &str,
) -> ProbabilityTriple {
    let home_key = format!("{home_team}胜");
    let away_key = format!("{away_team}胜");

    ProbabilityTriple::new(
        coerce_probability(field(probs, &["win", home_key.as_str()])),
        coerce_probability(field(probs, &["draw", "平"])),
        coerce_probability(field(probs, &["loss", away_key.as_str()])),
    )
}

fn match_entries(value: &Value) -> Result<&Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => match field(obj, MATCHES_KEYS) {
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(PoolcastError::InvalidDocument(
                "match list is not an array".to_string(),
            )),
            None => Err(PoolcastError::InvalidDocument(
                "document has no match list".to_string(),
            )),
        },
        _ => Err(PoolcastError::InvalidDocument(
            "document is neither an object nor an array".to_string(),
        )),
    }
}

fn document_period(value: &Value) -> Option<String> {
    value
        .as_object()
        .and_then(|obj| scalar_string(field(obj, PERIOD_KEYS)))
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k)).filter(|v| !v.is_null())
}

fn scalar_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
