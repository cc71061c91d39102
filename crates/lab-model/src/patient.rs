//! Patient demographics used for reference-range selection.
//!
//! Only the three fields that influence range resolution are modelled:
//! age value, age unit and gender. Everything else about a patient lives
//! in the host application.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{LabError, Result};

/// Unit of a patient age or of a reference band age bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgeUnit {
    Days,
    Months,
    /// Adult data dominates the catalog, so unknown units fall back here.
    #[default]
    Years,
}

impl AgeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgeUnit::Days => "Days",
            AgeUnit::Months => "Months",
            AgeUnit::Years => "Years",
        }
    }

    /// Number of days one unit counts for. Months and years are flat
    /// multiples, not calendar-accurate.
    pub fn days_per_unit(&self) -> i64 {
        match self {
            AgeUnit::Days => 1,
            AgeUnit::Months => 30,
            AgeUnit::Years => 365,
        }
    }
}

impl fmt::Display for AgeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgeUnit {
    type Err = String;

    /// Parses the canonical unit names (case-insensitive, singular or plural).
    ///
    /// Free-text units such as `"yrs"` or `"3 M"` are handled by the engine's
    /// age normalizer, which applies the Days > Months > Years priority table.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Ok(AgeUnit::Days),
            "month" | "months" => Ok(AgeUnit::Months),
            "year" | "years" => Ok(AgeUnit::Years),
            _ => Err(format!("Unknown age unit: {s}")),
        }
    }
}

/// Gender as recorded on a patient or on a reference band.
///
/// Bands use `Male`, `Female` or `Any`. Patients may carry a value that is
/// none of those, which then never matches a gender-specific band exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Any,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Any => "Any",
            Gender::Other => "Other",
        }
    }

    /// Lenient parse used for both catalog and patient values.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            "" | "any" | "all" | "both" => Gender::Any,
            _ => Gender::Other,
        }
    }

    /// True for `Male` and `Female`, the only values that can match exactly.
    pub fn is_specific(&self) -> bool {
        matches!(self, Gender::Male | Gender::Female)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for Gender {
    fn from(value: String) -> Self {
        Gender::parse(&value)
    }
}

impl From<Gender> for String {
    fn from(value: Gender) -> Self {
        value.as_str().to_string()
    }
}

/// Patient age and gender for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientContext {
    pub age_value: f64,
    #[serde(default)]
    pub age_unit: AgeUnit,
    #[serde(default)]
    pub gender: Gender,
}

impl PatientContext {
    /// Create a validated patient context.
    ///
    /// # Errors
    ///
    /// Returns [`LabError::InvalidPatient`] for a negative or non-finite age.
    pub fn new(age_value: f64, age_unit: AgeUnit, gender: Gender) -> Result<Self> {
        let context = Self {
            age_value,
            age_unit,
            gender,
        };
        context.validate()?;
        Ok(context)
    }

    /// Check the `age_value >= 0` invariant on a deserialized context.
    pub fn validate(&self) -> Result<()> {
        if !self.age_value.is_finite() || self.age_value < 0.0 {
            return Err(LabError::InvalidPatient(format!(
                "age must be a finite value >= 0, got {}",
                self.age_value
            )));
        }
        Ok(())
    }
}
