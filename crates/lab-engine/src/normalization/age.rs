//! Age normalization to a common day scale.
//!
//! Ages and band bounds arrive as an amount plus a free-text unit
//! (`"Years"`, `"yrs"`, `"3 M"`, `"45 Days"`). Everything is converted to
//! whole days: months count 30 days and years 365, flat.
//!
//! Unit detection follows [`AGE_UNIT_RULES`] in order: Days, then Months,
//! then Years. Text that matches no rule is read as Years.

use lab_model::{AgeUnit, PatientContext};

use super::numeric::first_number;

/// Unit tokens in detection priority order.
///
/// Reordering these rows changes clinical meaning for ambiguous strings.
pub const AGE_UNIT_RULES: &[(AgeUnit, &[&str])] = &[
    (AgeUnit::Days, &["day", "days", "d"]),
    (
        AgeUnit::Months,
        &["month", "months", "mon", "mons", "mo", "mos", "mth", "mths", "m"],
    ),
    (AgeUnit::Years, &["year", "years", "yr", "yrs", "y"]),
];

/// Detects the unit named in `text`, if any rule matches one of its words.
pub fn detect_age_unit(text: &str) -> Option<AgeUnit> {
    let words: Vec<String> = text
        .split(|ch: char| !ch.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect();
    if words.is_empty() {
        return None;
    }
    AGE_UNIT_RULES
        .iter()
        .find(|(_, tokens)| words.iter().any(|word| tokens.contains(&word.as_str())))
        .map(|(unit, _)| *unit)
}

/// Detected unit, defaulting to Years.
pub fn unit_or_default(text: &str) -> AgeUnit {
    detect_age_unit(text).unwrap_or_default()
}

/// Converts an amount in `unit` to whole days (rounded to the nearest day).
pub fn days_for(value: f64, unit: AgeUnit) -> i64 {
    (value * unit.days_per_unit() as f64).round() as i64
}

/// Converts an amount with a free-text unit to whole days.
pub fn to_days(value: f64, unit: &str) -> i64 {
    days_for(value, unit_or_default(unit))
}

/// Patient age in days.
pub fn patient_days(patient: &PatientContext) -> i64 {
    days_for(patient.age_value, patient.age_unit)
}

/// Reads a stored free-form age such as `"3 M"` or `"45 Days"`.
///
/// Takes the first number in the text and the unit named after it.
/// Returns None when the text holds no number.
pub fn parse_stored_age_to_days(text: &str) -> Option<i64> {
    let (value, rest) = first_number(text)?;
    Some(days_for(value, unit_or_default(rest)))
}
