//! Tests for reference-range selection.

use lab_engine::normalization::to_days;
use lab_engine::range::{apply_range, resolve_band};
use lab_model::{EngineOptions, Gender, NormalValueBand, ParameterDefinition, ResolvedParameter};

fn labelled(label: &str) -> NormalValueBand {
    NormalValueBand::text(label)
}

fn pick<'a>(bands: &'a [NormalValueBand], days: i64, gender: Gender) -> Option<&'a str> {
    resolve_band(bands, days, gender, &EngineOptions::default())
        .and_then(|band| band.text_value.as_deref())
}

#[test]
fn test_two_year_old_skips_neonatal_band() {
    let bands = vec![
        labelled("X").with_ages(Some(0.0), Some(10.0), "Days"),
        labelled("Y").with_ages(Some(0.0), Some(18.0), "Years"),
    ];
    assert_eq!(pick(&bands, 730, Gender::Male), Some("Y"));
    assert_eq!(pick(&bands, 5, Gender::Male), Some("X"));
}

#[test]
fn test_exact_gender_wins_between_equal_bands() {
    let bands = vec![
        labelled("any").with_ages(Some(18.0), Some(60.0), "Years"),
        labelled("male")
            .with_ages(Some(18.0), Some(60.0), "Years")
            .with_gender(Gender::Male),
    ];
    assert_eq!(pick(&bands, to_days(35.0, "Years"), Gender::Male), Some("male"));
    assert_eq!(pick(&bands, to_days(35.0, "Years"), Gender::Female), Some("any"));
}

#[test]
fn test_narrower_band_before_wider() {
    let bands = vec![
        labelled("lifetime").with_ages(Some(0.0), Some(100.0), "Years"),
        labelled("adult").with_ages(Some(18.0), Some(60.0), "Years"),
    ];
    assert_eq!(pick(&bands, to_days(35.0, "Years"), Gender::Any), Some("adult"));
}

#[test]
fn test_finite_band_before_open_band() {
    let bands = vec![
        labelled("open").with_ages(Some(18.0), None, "Years"),
        labelled("bounded").with_ages(Some(0.0), Some(100.0), "Years"),
    ];
    assert_eq!(pick(&bands, to_days(35.0, "Years"), Gender::Any), Some("bounded"));
}

#[test]
fn test_higher_min_breaks_width_tie() {
    let bands = vec![
        labelled("10-20").with_ages(Some(10.0), Some(20.0), "Years"),
        labelled("15-25").with_ages(Some(15.0), Some(25.0), "Years"),
    ];
    assert_eq!(pick(&bands, to_days(17.0, "Years"), Gender::Any), Some("15-25"));
}

#[test]
fn test_matching_band_beats_gender_preference() {
    let bands = vec![
        labelled("female child")
            .with_ages(Some(0.0), Some(12.0), "Years")
            .with_gender(Gender::Female),
        labelled("male adult")
            .with_ages(Some(18.0), Some(60.0), "Years")
            .with_gender(Gender::Male),
    ];
    assert_eq!(
        pick(&bands, to_days(30.0, "Years"), Gender::Female),
        Some("male adult")
    );
}

#[test]
fn test_fallback_prefers_widest_band_of_patient_gender() {
    let bands = vec![
        labelled("male child")
            .with_ages(Some(0.0), Some(18.0), "Years")
            .with_gender(Gender::Male),
        labelled("male adult")
            .with_ages(Some(18.0), Some(60.0), "Years")
            .with_gender(Gender::Male),
        labelled("any").with_ages(Some(0.0), Some(99.0), "Years"),
    ];
    assert_eq!(
        pick(&bands, to_days(100.0, "Years"), Gender::Male),
        Some("male adult")
    );
    assert_eq!(pick(&bands, to_days(100.0, "Years"), Gender::Female), Some("any"));
}

#[test]
fn test_fallback_tie_prefers_higher_max() {
    let bands = vec![
        labelled("young").with_ages(Some(0.0), Some(10.0), "Years"),
        labelled("older").with_ages(Some(20.0), Some(30.0), "Years"),
    ];
    assert_eq!(pick(&bands, to_days(15.0, "Years"), Gender::Any), Some("older"));
}

#[test]
fn test_packed_and_free_text_bounds() {
    let bands = vec![
        labelled("neonate").with_age_text("1-10 Days", None),
        labelled("infant").with_age_text("11 Days", Some("3 M")),
    ];
    assert_eq!(pick(&bands, 7, Gender::Any), Some("neonate"));
    assert_eq!(pick(&bands, 60, Gender::Any), Some("infant"));
}

#[test]
fn test_baby_threshold_is_configurable() {
    let bands = vec![labelled("a").with_ages(Some(0.0), Some(90.0), "Days")];
    let options = EngineOptions::default().with_baby_band_max_days(30);
    let picked = resolve_band(&bands, 45, Gender::Any, &options);
    assert_eq!(picked.and_then(|band| band.text_value.as_deref()), Some("a"));
}

#[test]
fn test_apply_range_sets_display_fields() {
    let mut hidden = NormalValueBand::numeric(0.0, 40.0).with_upper_only();
    hidden.display_in_report = false;
    hidden.remark = Some("Fasting sample".to_string());
    let definition = ParameterDefinition::new("SGPT", 1.0).with_band(hidden);
    let mut row = ResolvedParameter::from_definition(&definition, "");

    apply_range(&mut row, 1000, Gender::Male, &EngineOptions::default());
    assert_eq!(row.normal_range, "<40");
    assert!(!row.show_range);
    assert_eq!(row.remark.as_deref(), Some("Fasting sample"));

    row.normal_values.clear();
    apply_range(&mut row, 1000, Gender::Male, &EngineOptions::default());
    assert_eq!(row.normal_range, "");
    assert!(row.show_range);
    assert_eq!(row.range_kind, None);
}
