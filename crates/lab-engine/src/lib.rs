//! Pathology report parameter resolution.
//!
//! This crate turns catalog test definitions and a patient context into
//! printable report rows:
//!
//! - **normalization**: age units to days, numeric parsing and formatting
//! - **catalog**: loaded test definitions and free-text test lookup
//! - **panel**: flattening of panel tests into parameter rows
//! - **grouping**: stable regrouping of rows under merged headings
//! - **range**: selection of one reference band per parameter
//! - **formula**: derived parameters over a restricted arithmetic grammar
//! - **status**: Normal/Low/High/Critical/Pending classification
//! - **report**: per-test assembly and the editing session

pub mod catalog;
pub mod formula;
pub mod grouping;
pub mod normalization;
pub mod panel;
pub mod range;
pub mod report;
pub mod status;

pub use catalog::Catalog;
pub use formula::{
    FormulaError, FormulaOutcome, NameLookup, ReentrancyGuard, apply_formulas,
    evaluate_formula, formula_references, invalidate_dependents,
};
pub use grouping::{GroupSection, group_sections, regroup, same_group};
pub use normalization::{parse_stored_age_to_days, patient_days, to_days};
pub use panel::expand_test;
pub use range::{AgeSpan, apply_range, band_age_span, format_normal_range, resolve_band};
pub use report::{ParameterRef, ReportSession, assemble_test};
pub use status::{RangeSpec, classify, parse_range};
