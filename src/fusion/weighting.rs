//! Source weighting policies
//!
//! Two combination rules have been used for the same pair of sources. Both are
//! kept selectable so a run always records which one produced its numbers.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::ProbabilityTriple;

/// Default factor applied to the basic source under `DiscountedBasic`
pub const DEFAULT_BASIC_DISCOUNT: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightingPolicy {
    /// `basic + advanced`
    UnweightedSum,
    /// `basic * discount + advanced`
    #[default]
    DiscountedBasic,
}

impl WeightingPolicy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::UnweightedSum => "unweighted_sum",
            Self::DiscountedBasic => "discounted_basic",
        }
    }

    /// Combine the two raw triples component-wise. The result is not normalized.
    pub fn combine(
        &self,
        basic: &ProbabilityTriple,
        advanced: &ProbabilityTriple,
        basic_discount: f64,
    ) -> ProbabilityTriple {
        match self {
            Self::UnweightedSum => basic.add(advanced),
            Self::DiscountedBasic => basic.scale(basic_discount).add(advanced),
        }
    }
}

impl std::fmt::Display for WeightingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for WeightingPolicy {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "unweighted_sum" | "unweighted" | "sum" => Ok(Self::UnweightedSum),
            "discounted_basic" | "discounted" => Ok(Self::DiscountedBasic),
            other => Err(format!(
                "invalid weighting policy '{other}'; expected unweighted_sum|discounted_basic"
            )),
        }
    }
}
