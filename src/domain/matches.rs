//! Per-match probability records and fused results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Win/draw/loss probabilities from the home team's perspective
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTriple {
    pub win: f64,
    pub draw: f64,
    pub loss: f64,
}

impl ProbabilityTriple {
    pub const UNIFORM: ProbabilityTriple = ProbabilityTriple {
        win: 1.0 / 3.0,
        draw: 1.0 / 3.0,
        loss: 1.0 / 3.0,
    };

    pub fn new(win: f64, draw: f64, loss: f64) -> Self {
        Self { win, draw, loss }
    }

    pub fn sum(&self) -> f64 {
        self.win + self.draw + self.loss
    }

    pub fn scale(&self, factor: f64) -> Self {
        Self::new(self.win * factor, self.draw * factor, self.loss * factor)
    }

    pub fn add(&self, other: &ProbabilityTriple) -> Self {
        Self::new(
            self.win + other.win,
            self.draw + other.draw,
            self.loss + other.loss,
        )
    }

    /// Divide by the component sum. A zero sum yields the uniform triple.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total == 0.0 {
            return Self::UNIFORM;
        }
        self.scale(1.0 / total)
    }

    /// Discrete call with home > draw > away precedence on ties
    pub fn outcome(&self) -> Outcome {
        if self.win >= self.draw && self.win >= self.loss {
            Outcome::HomeWin
        } else if self.draw >= self.win && self.draw >= self.loss {
            Outcome::Draw
        } else {
            Outcome::AwayWin
        }
    }
}

/// Discrete match outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HomeWin => "HOME_WIN",
            Self::Draw => "DRAW",
            Self::AwayWin => "AWAY_WIN",
        }
    }

    /// Lottery ticket symbol: 3 = home win, 1 = draw, 0 = away win
    pub fn ticket_symbol(&self) -> char {
        match self {
            Self::HomeWin => '3',
            Self::Draw => '1',
            Self::AwayWin => '0',
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One source's estimate for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchProbabilityRecord {
    pub match_id: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: String,
    pub probabilities: ProbabilityTriple,
}

/// Strength-differential scalars for one match, carried through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryRecord {
    pub match_id: String,
    pub scalars: BTreeMap<String, serde_json::Value>,
}

/// Raw (pre-normalization) triples from both mandatory sources
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceProbabilities {
    pub basic: ProbabilityTriple,
    pub advanced: ProbabilityTriple,
}

/// Fused estimate and call for one match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedMatchResult {
    pub match_id: String,
    pub league: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: String,
    pub source_probabilities: SourceProbabilities,
    pub fused_probabilities: ProbabilityTriple,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auxiliary: Option<BTreeMap<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_sums_to_one() {
        let t = ProbabilityTriple::new(0.9, 0.5, 0.35).normalized();
        assert!((t.sum() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_sum_is_uniform() {
        let t = ProbabilityTriple::default().normalized();
        assert_eq!(t, ProbabilityTriple::UNIFORM);
        assert_eq!(t.outcome(), Outcome::HomeWin);
    }

    #[test]
    fn test_home_wins_tie_with_draw() {
        assert_eq!(ProbabilityTriple::new(0.4, 0.4, 0.2).outcome(), Outcome::HomeWin);
    }

    #[test]
    fn test_home_wins_tie_with_away() {
        assert_eq!(ProbabilityTriple::new(0.4, 0.2, 0.4).outcome(), Outcome::HomeWin);
    }

    #[test]
    fn test_draw_wins_tie_with_away() {
        assert_eq!(ProbabilityTriple::new(0.2, 0.4, 0.4).outcome(), Outcome::Draw);
    }

    #[test]
    fn test_away_only_when_strictly_greater() {
        assert_eq!(ProbabilityTriple::new(0.2, 0.3, 0.5).outcome(), Outcome::AwayWin);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::AwayWin).unwrap();
        assert_eq!(json, "\"AWAY_WIN\"");
        assert_eq!(Outcome::Draw.ticket_symbol(), '1');
    }
}
