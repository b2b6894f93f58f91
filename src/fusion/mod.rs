//! Probability fusion engine
//!
//! - `document`: loosely-shaped JSON to typed records
//! - `weighting`: combination policies
//! - `engine`: per-match fusion and the discrete call
//! - `report`: output document assembly

pub mod document;
pub mod engine;
pub mod report;
pub mod weighting;

pub use document::{
    coerce_probability, parse_auxiliary_document, parse_source_document, AuxiliaryDocument,
    SourceDocument,
};
pub use engine::{FusionEngine, FusionRun, FusionWarning, SourceRole};
pub use report::{FusionReport, SourceIds};
pub use weighting::{WeightingPolicy, DEFAULT_BASIC_DISCOUNT};
