//! Runtime report rows.
//!
//! A [`ResolvedParameter`] is created fresh for every report, mutated on
//! each edit and discarded with the report view. Nothing here is shared
//! between reports.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::catalog::{BandKind, NormalValueBand, ParameterDefinition, ResultType, TestType};
use crate::lookup::canonical_label;

/// Interpretation of a result against its reference range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ResultStatus {
    Normal,
    Low,
    High,
    Critical,
    /// No result yet, or not enough information to judge it.
    #[default]
    Pending,
    /// Generic abnormal flag; only ever supplied by the host.
    Abnormal,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Normal => "Normal",
            ResultStatus::Low => "Low",
            ResultStatus::High => "High",
            ResultStatus::Critical => "Critical",
            ResultStatus::Pending => "Pending",
            ResultStatus::Abnormal => "Abnormal",
        }
    }

    /// Whether a renderer should highlight the row.
    pub fn is_flagged(&self) -> bool {
        matches!(
            self,
            ResultStatus::Low | ResultStatus::High | ResultStatus::Critical | ResultStatus::Abnormal
        )
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(ResultStatus::Normal),
            "low" => Ok(ResultStatus::Low),
            "high" => Ok(ResultStatus::High),
            "critical" => Ok(ResultStatus::Critical),
            "pending" | "" => Ok(ResultStatus::Pending),
            "abnormal" => Ok(ResultStatus::Abnormal),
            _ => Err(format!("Unknown result status: {s}")),
        }
    }
}

/// One printable report row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedParameter {
    pub name: String,
    /// Resolved unit display name.
    pub unit: String,
    pub result_type: ResultType,
    pub formula: Option<String>,
    pub dropdown_options: Option<String>,
    /// Sub-heading within the test (or within `outer_group`), possibly empty.
    pub group_by: String,
    /// Name of the panel-included test this row came from; empty at top level.
    pub outer_group: String,
    pub is_optional: bool,
    pub order: f64,
    pub normal_values: Vec<NormalValueBand>,
    /// Display string of the selected band, empty when none applies.
    pub normal_range: String,
    /// Kind of the selected band.
    pub range_kind: Option<BandKind>,
    /// Selected band's `displayInReport`.
    pub show_range: bool,
    pub remark: Option<String>,
    pub result: String,
    pub status: ResultStatus,
    pub selected_option_id: Option<String>,
}

impl ResolvedParameter {
    /// Working copy of a catalog parameter.
    pub fn from_definition(definition: &ParameterDefinition, outer_group: &str) -> Self {
        Self {
            name: definition.name.trim().to_string(),
            unit: definition.unit.display_name().to_string(),
            result_type: definition.result_type,
            formula: definition.formula.clone(),
            dropdown_options: definition.dropdown_options.clone(),
            group_by: definition.group_by.clone().unwrap_or_default(),
            outer_group: outer_group.to_string(),
            is_optional: definition.is_optional,
            order: definition.order,
            normal_values: definition.normal_values.clone(),
            normal_range: String::new(),
            range_kind: None,
            show_range: true,
            remark: None,
            result: String::new(),
            status: ResultStatus::Pending,
            selected_option_id: None,
        }
    }

    pub fn is_formula(&self) -> bool {
        matches!(self.result_type, ResultType::Formula)
    }

    pub fn is_dropdown(&self) -> bool {
        matches!(self.result_type, ResultType::Dropdown)
    }

    pub fn has_result(&self) -> bool {
        !self.result.trim().is_empty()
    }

    /// Dropdown labels in catalog order.
    pub fn options(&self) -> Vec<&str> {
        self.dropdown_options
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|label| !label.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Clear the result back to an unanswered row.
    pub fn clear_result(&mut self) {
        self.result.clear();
        self.selected_option_id = None;
        self.status = ResultStatus::Pending;
    }

    /// Record a dropdown selection. Labels outside the option list are kept
    /// as free text without an option id.
    pub fn select_option(&mut self, label: &str) {
        let trimmed = label.trim();
        let key = canonical_label(trimmed);
        let listed = self
            .options()
            .iter()
            .any(|option| canonical_label(option) == key);
        self.selected_option_id = listed.then_some(key);
        self.result = trimmed.to_string();
    }
}

/// All rows of one test in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub test_name: String,
    pub category: String,
    pub test_type: TestType,
    pub parameters: Vec<ResolvedParameter>,
}

impl TestReport {
    pub fn parameter(&self, name: &str) -> Option<&ResolvedParameter> {
        let key = canonical_label(name);
        self.parameters
            .iter()
            .find(|parameter| canonical_label(&parameter.name) == key)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.position_in(None, name)
    }

    /// First row named `name`, optionally restricted to one included test.
    pub fn position_in(&self, outer_group: Option<&str>, name: &str) -> Option<usize> {
        let key = canonical_label(name);
        let outer = outer_group.map(canonical_label);
        self.parameters.iter().position(|parameter| {
            canonical_label(&parameter.name) == key
                && outer
                    .as_deref()
                    .is_none_or(|outer| canonical_label(&parameter.outer_group) == outer)
        })
    }

    pub fn flagged_count(&self) -> usize {
        self.parameters
            .iter()
            .filter(|parameter| parameter.status.is_flagged())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dropdown_row() -> ResolvedParameter {
        let definition = ParameterDefinition::new("Colour", 1.0).with_dropdown("Pale Yellow, Yellow ,,Red");
        ResolvedParameter::from_definition(&definition, "")
    }

    #[test]
    fn options_are_trimmed_and_non_empty() {
        assert_eq!(dropdown_row().options(), vec!["Pale Yellow", "Yellow", "Red"]);
    }

    #[test]
    fn select_option_records_canonical_id() {
        let mut row = dropdown_row();
        row.select_option(" pale  yellow ");
        assert_eq!(row.result, "pale  yellow");
        assert_eq!(row.selected_option_id.as_deref(), Some("pale yellow"));

        row.select_option("Turbid");
        assert_eq!(row.selected_option_id, None);
        assert_eq!(row.result, "Turbid");
    }

    #[test]
    fn position_in_picks_the_included_test() {
        let report = TestReport {
            test_name: "Combo".to_string(),
            category: String::new(),
            test_type: TestType::Panel,
            parameters: vec![
                ResolvedParameter::from_definition(&ParameterDefinition::new("Total", 1.0), "Serum Iron"),
                ResolvedParameter::from_definition(&ParameterDefinition::new("Total", 1.0), "Urine Protein"),
            ],
        };
        assert_eq!(report.position("total"), Some(0));
        assert_eq!(report.position_in(Some("urine  protein"), "Total"), Some(1));
        assert_eq!(report.position_in(Some("Lipid"), "Total"), None);
    }

    #[test]
    fn status_round_trips_through_str() {
        for status in [
            ResultStatus::Normal,
            ResultStatus::Low,
            ResultStatus::High,
            ResultStatus::Critical,
            ResultStatus::Pending,
            ResultStatus::Abnormal,
        ] {
            assert_eq!(status.as_str().parse::<ResultStatus>(), Ok(status));
        }
        assert!(ResultStatus::Critical.is_flagged());
        assert!(!ResultStatus::Pending.is_flagged());
    }
}
