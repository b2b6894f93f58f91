//! Common-opponent strength scores
//!
//! For every ticket match, each side's most recent meeting with every
//! opponent both sides have played is turned into a time-decayed goal
//! difference. The per-match totals and their relative ratios make up the
//! auxiliary document read by the fusion job.
//!
//! Scoring of one meeting, seen from `team`:
//! - `weight = max(0, 1 - days_ago / 7 * weekly_decay)`
//! - `score = (team_goals - opponent_goals) * weight`
//!
//! A meeting dated after the reference date counts as zero days old when
//! scored, but is never picked as "most recent".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Weight lost per week of age
pub const DEFAULT_WEEKLY_DECAY: f64 = 0.01;

pub const NO_HISTORY: &str = "未找到历史交锋数据";
pub const TOO_FEW_RECORDS: &str = "比赛记录不足";
pub const NO_COMMON_OPPONENTS: &str = "没有共同对手";

const METHOD: &str = "共同对手实力分（时间衰减加权，仅计算最近一场比赛）";

// ── Input: head-to-head history document ────────────────────────

/// `{period}期_历史交锋.json`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryDocument {
    #[serde(rename = "期数", default)]
    pub period: Option<Value>,
    #[serde(rename = "14场对战信息", default)]
    pub matches: Vec<HistoryEntry>,
}

/// One ticket match with both sides' recent results
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "场次", default)]
    pub match_id: Option<Value>,
    #[serde(rename = "联赛", default)]
    pub league: Option<String>,
    #[serde(rename = "主队", default)]
    pub home_team: String,
    #[serde(rename = "主队排名", default)]
    pub home_rank: Option<Value>,
    #[serde(rename = "客队", default)]
    pub away_team: String,
    #[serde(rename = "客队排名", default)]
    pub away_rank: Option<Value>,
    #[serde(rename = "比赛时间", default)]
    pub kickoff: String,
    #[serde(rename = "历史交锋数据", default)]
    pub history: Option<HeadToHead>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeadToHead {
    #[serde(default)]
    pub data: Option<TeamHistories>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamHistories {
    #[serde(default)]
    pub home: TeamHistory,
    #[serde(default)]
    pub away: TeamHistory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TeamHistory {
    #[serde(default)]
    pub matches: Vec<PastMatch>,
}

/// A finished match as listed by the provider
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PastMatch {
    #[serde(rename = "homesxname", default)]
    pub home_team: String,
    #[serde(rename = "awaysxname", default)]
    pub away_team: String,
    #[serde(rename = "homescore", default)]
    pub home_score: Option<Value>,
    #[serde(rename = "awayscore", default)]
    pub away_score: Option<Value>,
    /// `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`
    #[serde(rename = "matchdate", default)]
    pub match_date: Option<String>,
}

impl PastMatch {
    pub fn date(&self) -> Option<NaiveDate> {
        let raw = self.match_date.as_deref()?.trim();
        let day = raw.split(' ').next().unwrap_or(raw);
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// The other side, if `team` played in this match
    pub fn opponent_of(&self, team: &str) -> Option<&str> {
        if self.home_team == team {
            Some(self.away_team.as_str())
        } else if self.away_team == team {
            Some(self.home_team.as_str())
        } else {
            None
        }
    }

    fn score_line(&self) -> String {
        format!(
            "{} {}-{} {}",
            self.home_team,
            goals(self.home_score.as_ref()),
            goals(self.away_score.as_ref()),
            self.away_team
        )
    }
}

fn goals(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

// ── Output: strength document ───────────────────────────────────

/// `{period}期_共同对手实力分.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrengthDocument {
    #[serde(rename = "期数")]
    pub period: String,
    #[serde(rename = "计算基准日期")]
    pub as_of: String,
    #[serde(rename = "计算方法")]
    pub method: String,
    #[serde(rename = "14场比赛结果")]
    pub results: Vec<MatchStrength>,
}

impl StrengthDocument {
    /// Matches that have at least one common opponent
    pub fn scored_matches(&self) -> usize {
        self.results.iter().filter(|r| r.common_opponents > 0).count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchStrength {
    #[serde(rename = "场次")]
    pub match_id: Value,
    #[serde(rename = "联赛", skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(rename = "主队")]
    pub home_team: String,
    #[serde(rename = "主队排名", skip_serializing_if = "Option::is_none")]
    pub home_rank: Option<Value>,
    #[serde(rename = "客队")]
    pub away_team: String,
    #[serde(rename = "客队排名", skip_serializing_if = "Option::is_none")]
    pub away_rank: Option<Value>,
    #[serde(rename = "比赛时间")]
    pub kickoff: String,
    #[serde(rename = "主队比赛记录数")]
    pub home_records: usize,
    #[serde(rename = "客队比赛记录数")]
    pub away_records: usize,
    #[serde(rename = "共同对手数")]
    pub common_opponents: usize,
    #[serde(rename = "主队总实力分")]
    pub home_total: f64,
    #[serde(rename = "客队总实力分")]
    pub away_total: f64,
    #[serde(rename = "主队相对实力比")]
    pub home_ratio: f64,
    #[serde(rename = "客队相对实力比")]
    pub away_ratio: f64,
    /// Why the neutral 0.5/0.5 split was used
    #[serde(rename = "错误", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "共同对手详情", skip_serializing_if = "Vec::is_empty")]
    pub opponents: Vec<OpponentStrength>,
}

/// Contribution of one common opponent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpponentStrength {
    #[serde(rename = "共同对手")]
    pub opponent: String,
    #[serde(rename = "主队比赛数")]
    pub home_meetings: usize,
    #[serde(rename = "客队比赛数")]
    pub away_meetings: usize,
    #[serde(rename = "主队对该对手总实力分")]
    pub home_strength: f64,
    #[serde(rename = "客队对该对手总实力分")]
    pub away_strength: f64,
    #[serde(rename = "主队最近比赛", skip_serializing_if = "Option::is_none")]
    pub home_latest: Option<MeetingDetail>,
    #[serde(rename = "客队最近比赛", skip_serializing_if = "Option::is_none")]
    pub away_latest: Option<MeetingDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeetingDetail {
    #[serde(rename = "比赛日期")]
    pub date: String,
    #[serde(rename = "比分")]
    pub score: String,
    #[serde(rename = "实力分")]
    pub strength: f64,
}

/// Both sides' meetings with one opponent
#[derive(Debug, Clone, Default)]
pub struct CommonOpponent<'a> {
    pub home_meetings: Vec<&'a PastMatch>,
    pub away_meetings: Vec<&'a PastMatch>,
}

/// Opponents met by both sides, keyed by name. The two sides themselves are
/// never counted, nor are unnamed opponents.
pub fn common_opponents<'a>(
    home_matches: &'a [PastMatch],
    away_matches: &'a [PastMatch],
    home_team: &str,
    away_team: &str,
) -> BTreeMap<String, CommonOpponent<'a>> {
    let by_opponent = |matches: &'a [PastMatch], team: &str| {
        let mut map: BTreeMap<String, Vec<&'a PastMatch>> = BTreeMap::new();
        for m in matches {
            match m.opponent_of(team) {
                Some(opp) if !opp.is_empty() && opp != team => {
                    map.entry(opp.to_string()).or_default().push(m)
                }
                _ => {}
            }
        }
        map
    };

    let home_opponents = by_opponent(home_matches, home_team);
    let mut away_opponents = by_opponent(away_matches, away_team);

    home_opponents
        .into_iter()
        .filter(|(opp, _)| opp != home_team && opp != away_team)
        .filter_map(|(opp, home_meetings)| {
            let away_meetings = away_opponents.remove(&opp)?;
            Some((
                opp,
                CommonOpponent {
                    home_meetings,
                    away_meetings,
                },
            ))
        })
        .collect()
}

/// Scores matches against a fixed reference date
#[derive(Debug, Clone, Copy)]
pub struct StrengthCalculator {
    as_of: NaiveDate,
    weekly_decay: f64,
}

impl StrengthCalculator {
    pub fn new(as_of: NaiveDate, weekly_decay: f64) -> Self {
        Self {
            as_of,
            weekly_decay,
        }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Time-decayed goal difference of one meeting from `team`'s side.
    /// Undated meetings and meetings `team` did not play score 0.
    pub fn meeting_strength(&self, meeting: &PastMatch, team: &str) -> f64 {
        let Some(date) = meeting.date() else {
            return 0.0;
        };
        let days = (self.as_of - date).num_days().max(0) as f64;
        let weight = (1.0 - days / 7.0 * self.weekly_decay).max(0.0);

        let home = goals(meeting.home_score.as_ref());
        let away = goals(meeting.away_score.as_ref());
        let difference = if meeting.home_team == team {
            home - away
        } else if meeting.away_team == team {
            away - home
        } else {
            return 0.0;
        };

        difference * weight
    }

    /// Closest meeting on or before the reference date; the first one wins a tie
    pub fn most_recent<'a>(&self, meetings: &[&'a PastMatch]) -> Option<&'a PastMatch> {
        let mut best: Option<(i64, &'a PastMatch)> = None;
        for m in meetings {
            let Some(date) = m.date() else { continue };
            let days = (self.as_of - date).num_days();
            if days < 0 {
                continue;
            }
            if best.map_or(true, |(d, _)| days < d) {
                best = Some((days, *m));
            }
        }
        best.map(|(_, m)| m)
    }

    pub fn evaluate(&self, entry: &HistoryEntry) -> MatchStrength {
        let mut result = MatchStrength {
            match_id: entry.match_id.clone().unwrap_or(Value::Null),
            league: entry.league.clone(),
            home_team: entry.home_team.clone(),
            home_rank: entry.home_rank.clone(),
            away_team: entry.away_team.clone(),
            away_rank: entry.away_rank.clone(),
            kickoff: entry.kickoff.clone(),
            home_records: 0,
            away_records: 0,
            common_opponents: 0,
            home_total: 0.0,
            away_total: 0.0,
            home_ratio: 0.5,
            away_ratio: 0.5,
            error: None,
            opponents: Vec::new(),
        };

        let Some(histories) = entry.history.as_ref().and_then(|h| h.data.as_ref()) else {
            warn!(home = %entry.home_team, away = %entry.away_team, "no head-to-head data");
            result.error = Some(NO_HISTORY.to_string());
            return result;
        };

        let home_matches = &histories.home.matches;
        let away_matches = &histories.away.matches;
        result.home_records = home_matches.len();
        result.away_records = away_matches.len();
        if home_matches.is_empty() || away_matches.is_empty() {
            warn!(home = %entry.home_team, away = %entry.away_team, "not enough match records");
            result.error = Some(TOO_FEW_RECORDS.to_string());
            return result;
        }

        let common = common_opponents(
            home_matches,
            away_matches,
            &entry.home_team,
            &entry.away_team,
        );
        if common.is_empty() {
            debug!(home = %entry.home_team, away = %entry.away_team, "no common opponents");
            result.error = Some(NO_COMMON_OPPONENTS.to_string());
            return result;
        }

        let mut home_total = 0.0;
        let mut away_total = 0.0;
        for (opponent, meetings) in &common {
            let home_latest = self.most_recent(&meetings.home_meetings);
            let away_latest = self.most_recent(&meetings.away_meetings);
            let home_strength = home_latest
                .map(|m| self.meeting_strength(m, &entry.home_team))
                .unwrap_or(0.0);
            let away_strength = away_latest
                .map(|m| self.meeting_strength(m, &entry.away_team))
                .unwrap_or(0.0);

            home_total += home_strength;
            away_total += away_strength;

            result.opponents.push(OpponentStrength {
                opponent: opponent.clone(),
                home_meetings: meetings.home_meetings.len(),
                away_meetings: meetings.away_meetings.len(),
                home_strength: round3(home_strength),
                away_strength: round3(away_strength),
                home_latest: home_latest.map(|m| detail(m, home_strength)),
                away_latest: away_latest.map(|m| detail(m, away_strength)),
            });
        }

        let scale = home_total.abs() + away_total.abs();
        if scale > 0.0 {
            result.home_ratio = round3(home_total / scale);
            result.away_ratio = round3(away_total / scale);
        }
        result.common_opponents = common.len();
        result.home_total = round3(home_total);
        result.away_total = round3(away_total);

        debug!(
            home = %entry.home_team,
            away = %entry.away_team,
            common = result.common_opponents,
            home_total = result.home_total,
            away_total = result.away_total,
            "match strength"
        );
        result
    }

    /// Score every match of a history document. `period` names the document
    /// when it does not carry one itself.
    pub fn evaluate_document(&self, doc: &HistoryDocument, period: &str) -> StrengthDocument {
        let period = match &doc.period {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => period.to_string(),
        };

        let results: Vec<MatchStrength> = doc.matches.iter().map(|m| self.evaluate(m)).collect();
        let document = StrengthDocument {
            period,
            as_of: self.as_of.format("%Y-%m-%d").to_string(),
            method: METHOD.to_string(),
            results,
        };

        info!(
            period = %document.period,
            matches = document.results.len(),
            scored = document.scored_matches(),
            "strength scores computed"
        );
        document
    }
}

fn detail(meeting: &PastMatch, strength: f64) -> MeetingDetail {
    MeetingDetail {
        date: meeting.match_date.clone().unwrap_or_default(),
        score: meeting.score_line(),
        strength: round3(strength),
    }
}
