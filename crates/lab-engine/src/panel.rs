//! Panel expansion.
//!
//! Flattens a test definition into report rows:
//!
//! - **panel**: each included test contributes its parameters (or one
//!   synthetic row when it has none), tagged with the included test's name
//!   as `outer_group`.
//! - **single/multiple with parameters**: the parameters, top level.
//! - **single without parameters**: one synthetic row built from the test.
//!
//! Parameters are taken in `order`, skipping removed ones. `group_by` is
//! copied as-is; no heading is ever derived from `outer_group`, so an
//! included test's ungrouped rows stay ungrouped under its outer heading.

use lab_model::{ParameterDefinition, ResolvedParameter, TestDefinition, TestType};
use tracing::{debug, warn};

use crate::catalog::Catalog;

/// Expand a test into unsorted-by-group report rows.
pub fn expand_test(test: &TestDefinition, catalog: &Catalog) -> Vec<ResolvedParameter> {
    match test.test_type {
        TestType::Panel => expand_panel(test, catalog),
        _ if !test.parameters.is_empty() => map_parameters(test, ""),
        TestType::Single => vec![synthetic_row(test, "")],
        TestType::Multiple => {
            debug!(test = %test.name, "multiple test has no parameters");
            Vec::new()
        }
    }
}

fn expand_panel(panel: &TestDefinition, catalog: &Catalog) -> Vec<ResolvedParameter> {
    let mut rows = Vec::new();
    for reference in &panel.tests {
        let Some(included) = catalog.resolve_ref(reference) else {
            warn!(panel = %panel.name, "included test not found in catalog");
            continue;
        };
        let outer_group = included.name.trim();
        if included.parameters.is_empty() {
            rows.push(synthetic_row(included, outer_group));
        } else {
            rows.extend(map_parameters(included, outer_group));
        }
    }
    debug!(panel = %panel.name, rows = rows.len(), "panel expanded");
    rows
}

/// Active parameters of `test` in `order`, tagged with `outer_group`.
fn map_parameters(test: &TestDefinition, outer_group: &str) -> Vec<ResolvedParameter> {
    let mut parameters: Vec<&ParameterDefinition> = test
        .parameters
        .iter()
        .filter(|parameter| !parameter.removed)
        .collect();
    parameters.sort_by(|a, b| a.order.total_cmp(&b.order));
    parameters
        .into_iter()
        .map(|parameter| ResolvedParameter::from_definition(parameter, outer_group))
        .collect()
}

/// A test without sub-parameters reported as one row.
fn synthetic_row(test: &TestDefinition, outer_group: &str) -> ResolvedParameter {
    let definition = ParameterDefinition {
        id: test.id.clone(),
        name: test.name.clone(),
        unit: test.unit.clone(),
        result_type: test.result_type,
        formula: None,
        dropdown_options: test.dropdown_options.clone(),
        group_by: None,
        is_optional: false,
        removed: false,
        order: 0.0,
        normal_values: test.normal_values.clone(),
    };
    ResolvedParameter::from_definition(&definition, outer_group)
}
