//! Tests for catalog document deserialization.

use lab_model::{
    AgeBound, BandKind, EngineOptions, Gender, PatientContext, ResultType, TestDefinition,
    TestRef, TestType, Unit,
};

const LIPID_JSON: &str = r#"{
    "_id": "64b7f0c2a1e4d3b2c1a09f88",
    "name": "Lipid Profile",
    "category": "Biochemistry",
    "testType": "multiple",
    "parameters": [
        {
            "name": "HDL",
            "unit": { "_id": "64b7f0c2a1e4d3b2c1a09f01", "name": "mg/dL" },
            "resultType": "manual",
            "order": 2,
            "normalValues": [
                {
                    "gender": "Male",
                    "minAge": 18,
                    "maxAge": "",
                    "ageUnit": "Years",
                    "type": "Numeric range",
                    "lowerValue": "40",
                    "upperValue": 60,
                    "displayInReport": false
                }
            ]
        },
        {
            "name": "LDL/HDL Ratio",
            "unit": "64b7f0c2a1e4d3b2c1a09f02",
            "resultType": "formula",
            "formula": "{LDL} / {HDL}",
            "order": 3
        },
        {
            "name": "Appearance",
            "unit": "",
            "resultType": "dropdown",
            "dropdownOptions": "Clear, Turbid",
            "order": 1,
            "normalValues": [
                { "minAge": "1-10 Days", "type": "Text", "textValue": "Clear" }
            ]
        }
    ]
}"#;

#[test]
fn test_deserializes_host_document() {
    let test: TestDefinition = serde_json::from_str(LIPID_JSON).unwrap();
    assert_eq!(test.id.as_deref(), Some("64b7f0c2a1e4d3b2c1a09f88"));
    assert_eq!(test.test_type, TestType::Multiple);
    assert_eq!(test.parameters.len(), 3);

    let hdl = &test.parameters[0];
    assert_eq!(hdl.unit, Unit::Named("mg/dL".to_string()));
    let band = &hdl.normal_values[0];
    assert_eq!(band.gender, Gender::Male);
    assert_eq!(band.min_age, Some(AgeBound::Number(18.0)));
    assert!(band.max_age.as_ref().is_some_and(AgeBound::is_blank));
    assert_eq!(band.lower_value, Some(40.0));
    assert_eq!(band.upper_value, Some(60.0));
    assert!(!band.display_in_report);

    let ratio = &test.parameters[1];
    assert_eq!(ratio.result_type, ResultType::Formula);
    assert_eq!(
        ratio.unit,
        Unit::Unresolved("64b7f0c2a1e4d3b2c1a09f02".to_string())
    );
    assert_eq!(ratio.unit.display_name(), "");

    let appearance = &test.parameters[2];
    let band = &appearance.normal_values[0];
    assert_eq!(band.kind, BandKind::Text);
    assert_eq!(band.gender, Gender::Any);
    assert!(band.display_in_report);
    assert_eq!(band.min_age, Some(AgeBound::Text("1-10 Days".to_string())));
}

#[test]
fn test_panel_refs_accept_ids_and_inline_tests() {
    let json = r#"{
        "name": "Health Check",
        "testType": "Panel",
        "tests": ["64b7f0c2a1e4d3b2c1a09f88", { "name": "Blood Sugar", "testType": "single" }]
    }"#;
    let panel: TestDefinition = serde_json::from_str(json).unwrap();
    assert!(panel.is_panel());
    assert_eq!(panel.tests.len(), 2);
    assert!(matches!(&panel.tests[0], TestRef::Id(id) if id == "64b7f0c2a1e4d3b2c1a09f88"));
    assert!(matches!(&panel.tests[1], TestRef::Inline(test) if test.name == "Blood Sugar"));
}

#[test]
fn test_blank_numeric_strings_are_absent() {
    let json = r#"{ "type": "Numeric range", "lowerValue": "", "upperValue": "5.5" }"#;
    let band: lab_model::NormalValueBand = serde_json::from_str(json).unwrap();
    assert_eq!(band.lower_value, None);
    assert_eq!(band.upper_value, Some(5.5));
}

#[test]
fn test_patient_context_from_json() {
    let patient: PatientContext =
        serde_json::from_str(r#"{ "ageValue": 3, "ageUnit": "Months", "gender": "F" }"#).unwrap();
    assert_eq!(patient.gender, Gender::Female);
    assert!(patient.validate().is_ok());

    let negative: PatientContext = serde_json::from_str(r#"{ "ageValue": -2 }"#).unwrap();
    assert!(negative.validate().is_err());
}

#[test]
fn test_options_fill_defaults() {
    let options: EngineOptions =
        serde_json::from_str(r#"{ "formula_max_passes": 9, "baby_band_max_days": 28 }"#).unwrap();
    assert_eq!(options.baby_band_max_days, 28);
    assert_eq!(options.effective_formula_passes(), 3);
    assert_eq!(options.decimal_places, 2);
}
