//! Test and parameter definitions as loaded from the definitions service.
//!
//! These types mirror the catalog documents field for field (camelCase on
//! the wire). They are immutable once a report is built: the engine only
//! ever works on its own [`ResolvedParameter`](crate::ResolvedParameter)
//! copies.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::patient::Gender;

/// How a test is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestType {
    /// One result, possibly with its own reference bands.
    #[default]
    #[serde(alias = "Single")]
    Single,
    /// A fixed list of parameters.
    #[serde(alias = "Multiple")]
    Multiple,
    /// A list of other tests, each contributing its own parameters.
    #[serde(alias = "Panel")]
    Panel,
}

/// How a parameter's value is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultType {
    /// Typed in by the operator.
    #[default]
    #[serde(alias = "Manual")]
    Manual,
    /// Picked from `dropdownOptions`.
    #[serde(alias = "Dropdown")]
    Dropdown,
    /// Derived from other parameters of the same test.
    #[serde(alias = "Formula")]
    Formula,
}

/// Kind of a reference band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BandKind {
    #[default]
    #[serde(rename = "Numeric range", alias = "numeric", alias = "Numeric")]
    NumericRange,
    #[serde(alias = "text")]
    Text,
}

/// One end of a band's age interval.
///
/// Catalog documents store either a bare number (with the unit in the
/// band's `ageUnit` field) or free text such as `"45 Days"` or the packed
/// form `"1-10 Days"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AgeBound {
    Number(f64),
    Text(String),
}

impl AgeBound {
    /// True when the bound carries no usable value (blank text).
    pub fn is_blank(&self) -> bool {
        match self {
            AgeBound::Number(value) => !value.is_finite(),
            AgeBound::Text(text) => text.trim().is_empty(),
        }
    }
}

impl fmt::Display for AgeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeBound::Number(value) => write!(f, "{value}"),
            AgeBound::Text(text) => write!(f, "{text}"),
        }
    }
}

/// An age- and gender-scoped reference ("normal") value definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalValueBand {
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub min_age: Option<AgeBound>,
    #[serde(default)]
    pub max_age: Option<AgeBound>,
    /// Companion unit for numeric `min_age`/`max_age`.
    #[serde(default, alias = "unit")]
    pub age_unit: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: BandKind,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub lower_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub upper_value: Option<f64>,
    #[serde(default)]
    pub text_value: Option<String>,
    #[serde(default = "default_true")]
    pub display_in_report: bool,
    #[serde(default)]
    pub remark: Option<String>,
}

impl NormalValueBand {
    /// Numeric band with both value bounds, open in age.
    pub fn numeric(lower: f64, upper: f64) -> Self {
        Self {
            gender: Gender::Any,
            min_age: None,
            max_age: None,
            age_unit: None,
            kind: BandKind::NumericRange,
            lower_value: Some(lower),
            upper_value: Some(upper),
            text_value: None,
            display_in_report: true,
            remark: None,
        }
    }

    /// Text band (also used for dropdown normal-value lists).
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: BandKind::Text,
            lower_value: None,
            upper_value: None,
            text_value: Some(value.into()),
            ..Self::numeric(0.0, 0.0)
        }
    }

    #[must_use]
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = gender;
        self
    }

    /// Set numeric age bounds with a companion unit.
    #[must_use]
    pub fn with_ages(mut self, min: Option<f64>, max: Option<f64>, unit: &str) -> Self {
        self.min_age = min.map(AgeBound::Number);
        self.max_age = max.map(AgeBound::Number);
        self.age_unit = Some(unit.to_string());
        self
    }

    /// Set free-text age bounds (e.g. `"1-10 Days"` packed in `min`).
    #[must_use]
    pub fn with_age_text(mut self, min: &str, max: Option<&str>) -> Self {
        self.min_age = Some(AgeBound::Text(min.to_string()));
        self.max_age = max.map(|value| AgeBound::Text(value.to_string()));
        self
    }

    #[must_use]
    pub fn with_lower_only(mut self) -> Self {
        self.upper_value = None;
        self
    }

    #[must_use]
    pub fn with_upper_only(mut self) -> Self {
        self.lower_value = None;
        self
    }

    /// `lower_value <= upper_value` whenever both are present on a numeric band.
    pub fn is_consistent(&self) -> bool {
        match (self.kind, self.lower_value, self.upper_value) {
            (BandKind::NumericRange, Some(lower), Some(upper)) => lower <= upper,
            _ => true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Accepts a number, a numeric string, an empty string or null.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(value)) => Some(value),
        Some(Raw::Text(text)) => text.trim().parse::<f64>().ok(),
        None => None,
    })
}

/// Unit reference exactly as stored: an id, a `{_id, name}` object or a
/// plain display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UnitRef {
    Text(String),
    Object {
        #[serde(default, rename = "_id", alias = "id")]
        id: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Measurement unit after load-time resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "UnitRef", into = "UnitRef")]
pub enum Unit {
    /// Display name known.
    Named(String),
    /// Id that the unit table did not (yet) resolve.
    Unresolved(String),
}

impl Unit {
    /// Name to print; unresolved ids never reach a report.
    pub fn display_name(&self) -> &str {
        match self {
            Unit::Named(name) => name,
            Unit::Unresolved(_) => "",
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Unit::Named(_))
    }
}

impl Default for Unit {
    fn default() -> Self {
        Unit::Named(String::new())
    }
}

impl From<UnitRef> for Unit {
    fn from(value: UnitRef) -> Self {
        match value {
            UnitRef::Object {
                name: Some(name), ..
            } => Unit::Named(name),
            UnitRef::Object { id: Some(id), .. } => Unit::Unresolved(id),
            UnitRef::Object { .. } => Unit::default(),
            UnitRef::Text(text) if is_object_id(&text) => Unit::Unresolved(text),
            UnitRef::Text(text) => Unit::Named(text),
        }
    }
}

impl From<Unit> for UnitRef {
    fn from(value: Unit) -> Self {
        match value {
            Unit::Named(name) | Unit::Unresolved(name) => UnitRef::Text(name),
        }
    }
}

/// 24 hex digits, the shape of a document id.
pub fn is_object_id(value: &str) -> bool {
    value.len() == 24 && value.chars().all(|ch| ch.is_ascii_hexdigit())
}

/// A measurable item within a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDefinition {
    #[serde(default, rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub result_type: ResultType,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub dropdown_options: Option<String>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub is_optional: bool,
    #[serde(default)]
    pub removed: bool,
    #[serde(default)]
    pub order: f64,
    #[serde(default)]
    pub normal_values: Vec<NormalValueBand>,
}

impl ParameterDefinition {
    pub fn new(name: impl Into<String>, order: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            unit: Unit::default(),
            result_type: ResultType::Manual,
            formula: None,
            dropdown_options: None,
            group_by: None,
            is_optional: false,
            removed: false,
            order,
            normal_values: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Unit::Named(unit.to_string());
        self
    }

    #[must_use]
    pub fn with_formula(mut self, formula: &str) -> Self {
        self.result_type = ResultType::Formula;
        self.formula = Some(formula.to_string());
        self
    }

    #[must_use]
    pub fn with_dropdown(mut self, options: &str) -> Self {
        self.result_type = ResultType::Dropdown;
        self.dropdown_options = Some(options.to_string());
        self
    }

    #[must_use]
    pub fn with_group(mut self, group: &str) -> Self {
        self.group_by = Some(group.to_string());
        self
    }

    #[must_use]
    pub fn with_band(mut self, band: NormalValueBand) -> Self {
        self.normal_values.push(band);
        self
    }

    #[must_use]
    pub fn removed(mut self) -> Self {
        self.removed = true;
        self
    }
}

/// Reference from a panel to one of its included tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestRef {
    /// Document id, or the exact test name when no id matches.
    Id(String),
    /// Definition embedded in the panel document.
    Inline(Box<TestDefinition>),
}

/// A catalog test definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDefinition {
    #[serde(default, rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub test_type: TestType,
    /// Own unit, used when the test has no parameter list.
    #[serde(default)]
    pub unit: Unit,
    #[serde(default)]
    pub result_type: ResultType,
    #[serde(default)]
    pub dropdown_options: Option<String>,
    /// Own reference bands, used when the test has no parameter list.
    #[serde(default)]
    pub normal_values: Vec<NormalValueBand>,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    /// Included tests; only meaningful for [`TestType::Panel`].
    #[serde(default)]
    pub tests: Vec<TestRef>,
}

impl TestDefinition {
    pub fn new(name: impl Into<String>, test_type: TestType) -> Self {
        Self {
            id: None,
            name: name.into(),
            category: String::new(),
            test_type,
            unit: Unit::default(),
            result_type: ResultType::Manual,
            dropdown_options: None,
            normal_values: Vec::new(),
            parameters: Vec::new(),
            tests: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    #[must_use]
    pub fn with_unit(mut self, unit: &str) -> Self {
        self.unit = Unit::Named(unit.to_string());
        self
    }

    #[must_use]
    pub fn with_band(mut self, band: NormalValueBand) -> Self {
        self.normal_values.push(band);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterDefinition) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_included(mut self, reference: TestRef) -> Self {
        self.tests.push(reference);
        self
    }

    pub fn is_panel(&self) -> bool {
        matches!(self.test_type, TestType::Panel)
    }
}
