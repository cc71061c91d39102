//! Normalization functions shared by the engine stages.
//!
//! - **age**: age amount + free-text unit to a day count
//! - **numeric**: lenient number parsing, rounding and display formatting

pub mod age;
pub mod numeric;

pub use age::{
    AGE_UNIT_RULES, days_for, detect_age_unit, parse_stored_age_to_days, patient_days, to_days,
    unit_or_default,
};
pub use numeric::{first_number, format_fixed, format_numeric, parse_f64, round_to};
