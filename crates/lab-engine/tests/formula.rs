//! Tests for derived (formula) parameters.

use lab_engine::formula::{NameLookup, evaluate_formula, formula_references};
use lab_engine::{Catalog, FormulaError, ReentrancyGuard, ReportSession, apply_formulas};
use lab_model::{
    AgeUnit, EngineOptions, Gender, ParameterDefinition, PatientContext, ResolvedParameter,
    ResultStatus, TestDefinition, TestType,
};

fn protein_test() -> TestDefinition {
    TestDefinition::new("Serum Proteins", TestType::Multiple)
        .with_parameter(ParameterDefinition::new("Albumin", 1.0).with_unit("g/dL"))
        .with_parameter(ParameterDefinition::new("TotalProtein", 2.0).with_unit("g/dL"))
        .with_parameter(
            ParameterDefinition::new("Globulin", 3.0)
                .with_unit("g/dL")
                .with_formula("Globulin = {Total Protein} - {Albumin}"),
        )
        .with_parameter(
            ParameterDefinition::new("A:G Ratio", 4.0).with_formula("{Albumin} ÷ {Globulin}"),
        )
}

fn session(options: EngineOptions) -> ReportSession {
    let patient = PatientContext::new(40.0, AgeUnit::Years, Gender::Female).unwrap();
    let mut session = ReportSession::new(patient, options).unwrap();
    session.add_test(&protein_test(), &Catalog::default());
    session
}

fn result(session: &ReportSession, name: &str) -> String {
    let at = session.find_parameter("Serum Proteins", name).unwrap();
    session.row(at).unwrap().result.clone()
}

#[test]
fn test_globulin_and_ratio_settle() {
    let mut session = session(EngineOptions::default());
    let outcome = session
        .apply_results("Serum Proteins", [("Albumin", "4.0"), ("TotalProtein", "7.0")])
        .unwrap();

    assert_eq!(result(&session, "Globulin"), "3");
    assert_eq!(result(&session, "A:G Ratio"), "1.33");
    assert!(outcome.passes <= 3);
}

#[test]
fn test_two_passes_are_enough_for_one_level_of_nesting() {
    let mut session = session(EngineOptions::default().with_formula_max_passes(2));
    session
        .apply_results("Serum Proteins", [("Albumin", "4.0"), ("TotalProtein", "7.0")])
        .unwrap();
    assert_eq!(result(&session, "A:G Ratio"), "1.33");
}

#[test]
fn test_clearing_input_clears_dependent_chain() {
    let mut session = session(EngineOptions::default());
    session
        .apply_results("Serum Proteins", [("Albumin", "4.0"), ("TotalProtein", "7.0")])
        .unwrap();

    let albumin = session.find_parameter("Serum Proteins", "Albumin").unwrap();
    session.clear_result(albumin).unwrap();

    for name in ["Globulin", "A:G Ratio"] {
        let at = session.find_parameter("Serum Proteins", name).unwrap();
        let row = session.row(at).unwrap();
        assert_eq!(row.result, "", "{name} should be cleared");
        assert_eq!(row.status, ResultStatus::Pending);
    }
}

#[test]
fn test_editing_input_recomputes_dependents() {
    let mut session = session(EngineOptions::default());
    session
        .apply_results("Serum Proteins", [("Albumin", "4.0"), ("TotalProtein", "7.0")])
        .unwrap();
    let albumin = session.find_parameter("Serum Proteins", "Albumin").unwrap();
    session.set_result(albumin, "3.5").unwrap();

    assert_eq!(result(&session, "Globulin"), "3.5");
    assert_eq!(result(&session, "A:G Ratio"), "1.00");
}

#[test]
fn test_unknown_reference_leaves_formula_blank() {
    let mut lookup = NameLookup::default();
    lookup.insert("Albumin", 4.0);
    let row = ResolvedParameter::from_definition(&ParameterDefinition::new("X", 1.0), "");

    assert_eq!(
        evaluate_formula("{Albumin} + {Removed}", &lookup, &row, &EngineOptions::default()),
        Err(FormulaError::UnresolvedReference(vec!["Removed".to_string()]))
    );
}

#[test]
fn test_division_by_zero_is_non_finite() {
    let mut lookup = NameLookup::default();
    lookup.insert("A", 1.0);
    lookup.insert("B", 0.0);
    let row = ResolvedParameter::from_definition(&ParameterDefinition::new("X", 1.0), "");

    assert_eq!(
        evaluate_formula("{A} ÷ {B}", &lookup, &row, &EngineOptions::default()),
        Err(FormulaError::NonFinite)
    );
}

#[test]
fn test_multiplication_alias_and_rounding() {
    let mut lookup = NameLookup::default();
    lookup.insert("Hb (Haemoglobin)", 13.0);
    let row = ResolvedParameter::from_definition(&ParameterDefinition::new("PCV", 1.0), "");

    assert_eq!(
        evaluate_formula("{Hb} × 3.0333", &lookup, &row, &EngineOptions::default()),
        Ok("39.43".to_string())
    );
}

#[test]
fn test_cyclic_formulas_stop_at_pass_cap() {
    let mut rows: Vec<ResolvedParameter> = [
        ParameterDefinition::new("A", 1.0).with_formula("{B} + 1"),
        ParameterDefinition::new("B", 2.0).with_formula("{A} + 1"),
    ]
    .iter()
    .map(|definition| ResolvedParameter::from_definition(definition, ""))
    .collect();
    rows[0].result = "1".to_string();

    let outcome = apply_formulas(&mut rows, &ReentrancyGuard::new(), &EngineOptions::default());
    assert_eq!(outcome.passes, 3);
    assert!(!outcome.skipped);
}

#[test]
fn test_references_are_listed_in_order() {
    assert_eq!(
        formula_references("{Total Protein} - {Albumin}"),
        vec!["Total Protein", "Albumin"]
    );
}
