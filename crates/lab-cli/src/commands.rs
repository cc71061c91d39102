use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result, bail};
use comfy_table::Table;
use lab_engine::{Catalog, ReportSession};
use lab_model::{EngineOptions, Gender, PatientContext};
use serde_json::Value;
use tracing::{debug, info, info_span, warn};

use crate::cli::{CatalogArgs, ReportArgs};
use crate::logging::redact_value;
use crate::summary::apply_table_style;

/// One value of a results file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Included test of a panel, when the value sits in a nested block.
    pub outer_group: Option<String>,
    pub parameter: String,
    pub value: String,
}

/// Result entries keyed by test name.
pub type ResultSheet = BTreeMap<String, Vec<SheetEntry>>;

pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let file = File::open(path).with_context(|| format!("open catalog {}", path.display()))?;
    let catalog = Catalog::from_reader(BufReader::new(file))
        .with_context(|| format!("parse catalog {}", path.display()))?;
    info!(tests = catalog.len(), "catalog loaded");
    Ok(catalog)
}

pub fn load_options(path: Option<&Path>) -> Result<EngineOptions> {
    let Some(path) = path else {
        return Ok(EngineOptions::default());
    };
    let file = File::open(path).with_context(|| format!("open options {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse options {}", path.display()))
}

/// Read a results sheet. Values may be JSON strings, numbers or null. A
/// nested object under a panel holds the values of one included test:
/// `{ "Panel": { "Included Test": { "Parameter": "1.2" } } }`.
pub fn load_results(path: &Path) -> Result<ResultSheet> {
    let file = File::open(path).with_context(|| format!("open results {}", path.display()))?;
    let raw: BTreeMap<String, BTreeMap<String, Value>> =
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse results {}", path.display()))?;
    parse_result_sheet(raw)
}

pub fn parse_result_sheet(raw: BTreeMap<String, BTreeMap<String, Value>>) -> Result<ResultSheet> {
    let mut sheet = ResultSheet::new();
    for (test, values) in raw {
        let mut entries = Vec::new();
        for (key, value) in values {
            match value {
                Value::Object(block) => {
                    for (parameter, value) in block {
                        let value = result_text(&test, &parameter, value)?;
                        entries.push(SheetEntry {
                            outer_group: Some(key.clone()),
                            parameter,
                            value,
                        });
                    }
                }
                value => {
                    let value = result_text(&test, &key, value)?;
                    entries.push(SheetEntry {
                        outer_group: None,
                        parameter: key,
                        value,
                    });
                }
            }
        }
        sheet.insert(test, entries);
    }
    Ok(sheet)
}

fn result_text(test: &str, parameter: &str, value: Value) -> Result<String> {
    Ok(match value {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => bail!("result for {test} / {parameter} must be a string or number, got {other}"),
    })
}

pub fn patient_from_args(args: &ReportArgs) -> Result<PatientContext> {
    let gender = Gender::parse(&args.gender);
    if gender == Gender::Other {
        warn!(gender = %args.gender, "gender matches no band exactly");
    }
    PatientContext::new(args.age, args.age_unit.into(), gender).context("invalid patient")
}

/// Build the report session and apply any result sheet.
pub fn run_report(args: &ReportArgs) -> Result<ReportSession> {
    let span = info_span!("report", tests = args.tests.len());
    let _guard = span.enter();

    let catalog = load_catalog(&args.catalog.catalog)?;
    let options = load_options(args.options.as_deref())?;
    let patient = patient_from_args(args)?;
    let mut session = ReportSession::from_receipt(&catalog, patient, options, &args.tests)
        .context("build report")?;
    if session.tests().is_empty() {
        bail!("none of the requested tests exist in the catalog");
    }

    if let Some(path) = &args.results {
        let sheet = load_results(path)?;
        apply_sheet(&mut session, &sheet)?;
    }
    Ok(session)
}

pub fn apply_sheet(session: &mut ReportSession, sheet: &ResultSheet) -> Result<()> {
    for (test, entries) in sheet {
        for entry in entries {
            debug!(
                test = %test,
                outer_group = entry.outer_group.as_deref().unwrap_or_default(),
                parameter = %entry.parameter,
                value = redact_value(&entry.value),
                "result queued"
            );
        }
        let outcome = session
            .apply_scoped_results(
                test,
                entries.iter().map(|entry| {
                    (
                        entry.outer_group.as_deref(),
                        entry.parameter.as_str(),
                        entry.value.as_str(),
                    )
                }),
            )
            .with_context(|| format!("apply results for {test}"))?;
        debug!(test = %test, passes = outcome.passes, changed = outcome.changed, "formulas settled");
    }
    Ok(())
}

pub fn run_tests(args: &CatalogArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    let mut table = Table::new();
    table.set_header(vec!["Test", "Type", "Category", "Parameters"]);
    apply_table_style(&mut table);
    for test in catalog.tests() {
        let size = if test.is_panel() {
            test.tests.len()
        } else {
            test.parameters.iter().filter(|parameter| !parameter.removed).count()
        };
        table.add_row(vec![
            test.name.clone(),
            format!("{:?}", test.test_type).to_lowercase(),
            test.category.clone(),
            size.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn result_sheet_accepts_strings_numbers_and_null() {
        let raw = serde_json::from_value(json!({
            "Lipid Profile": { "HDL": 45, "LDL": "130", "VLDL": null }
        }))
        .unwrap();
        let sheet = parse_result_sheet(raw).unwrap();
        let values: Vec<(&str, &str)> = sheet["Lipid Profile"]
            .iter()
            .map(|entry| (entry.parameter.as_str(), entry.value.as_str()))
            .collect();
        assert_eq!(values, vec![("HDL", "45"), ("LDL", "130"), ("VLDL", "")]);
        assert!(sheet["Lipid Profile"].iter().all(|entry| entry.outer_group.is_none()));
    }

    #[test]
    fn result_sheet_blocks_address_included_tests() {
        let raw = serde_json::from_value(json!({
            "Combo": {
                "Serum Iron": { "Total": 100 },
                "Urine Protein": { "Total": "5" }
            }
        }))
        .unwrap();
        let sheet = parse_result_sheet(raw).unwrap();
        assert_eq!(
            sheet["Combo"],
            vec![
                SheetEntry {
                    outer_group: Some("Serum Iron".to_string()),
                    parameter: "Total".to_string(),
                    value: "100".to_string(),
                },
                SheetEntry {
                    outer_group: Some("Urine Protein".to_string()),
                    parameter: "Total".to_string(),
                    value: "5".to_string(),
                },
            ]
        );
    }

    #[test]
    fn result_sheet_rejects_arrays_and_deep_nesting() {
        let raw = serde_json::from_value(json!({ "Lipid Profile": { "HDL": [1, 2] } })).unwrap();
        assert!(parse_result_sheet(raw).is_err());
        let raw = serde_json::from_value(json!({
            "Combo": { "Serum Iron": { "Total": { "value": 1 } } }
        }))
        .unwrap();
        assert!(parse_result_sheet(raw).is_err());
    }
}
