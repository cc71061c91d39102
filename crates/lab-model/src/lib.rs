//! Data model for pathology report parameter resolution.
//!
//! - **catalog**: test, parameter and reference band definitions
//! - **patient**: age/gender context for range selection
//! - **report**: runtime rows produced for one report
//! - **options**: engine configuration
//! - **lookup**: canonical keys for labels and test names

pub mod catalog;
pub mod error;
pub mod lookup;
pub mod options;
pub mod patient;
pub mod report;

pub use catalog::{
    AgeBound, BandKind, NormalValueBand, ParameterDefinition, ResultType, TestDefinition, TestRef,
    TestType, Unit, UnitRef, is_object_id,
};
pub use error::{LabError, Result};
pub use lookup::{FirstSeenLabels, canonical_label, compact_test_name};
pub use options::{EngineOptions, MAX_FORMULA_PASSES};
pub use patient::{AgeUnit, Gender, PatientContext};
pub use report::{ResolvedParameter, ResultStatus, TestReport};
