//! Tests for display regrouping.

use lab_engine::{GroupSection, group_sections, regroup};
use lab_model::{ParameterDefinition, ResolvedParameter};

fn row(name: &str, outer: &str, group: &str, order: f64) -> ResolvedParameter {
    let definition = ParameterDefinition::new(name, order).with_group(group);
    ResolvedParameter::from_definition(&definition, outer)
}

fn outline(sections: &[GroupSection]) -> String {
    sections
        .iter()
        .map(|section| {
            let names: Vec<&str> = section.items.iter().map(|row| row.name.as_str()).collect();
            format!(
                "{} > {}: {}",
                section.outer_group,
                section.heading.as_deref().unwrap_or("-"),
                names.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn routine_rows() -> Vec<ResolvedParameter> {
    vec![
        row("Colour", "Urine Routine", "Physical", 1.0),
        row("pH", "Urine Routine", "Chemical", 3.0),
        row("Remarks", "Urine Routine", "", 10.0),
        row("Clarity", "Urine Routine", "physical ", 2.0),
        row("Volume", "Urine Routine", "", 0.5),
        row("Colour", "Stool Routine", "physical", 1.0),
        row("Occult Blood", "Stool Routine", "Chemical", 2.0),
    ]
}

#[test]
fn test_outline_snapshot() {
    insta::assert_snapshot!(outline(&group_sections(&routine_rows())), @r"
    Urine Routine > Physical: Colour, Clarity
    Urine Routine > Chemical: pH
    Urine Routine > -: Volume, Remarks
    Stool Routine > physical: Colour
    Stool Routine > Chemical: Occult Blood
    ");
}

#[test]
fn test_label_variants_merge_within_outer_group_only() {
    let sections = group_sections(&routine_rows());
    let physical: Vec<&GroupSection> = sections
        .iter()
        .filter(|section| {
            section
                .heading
                .as_deref()
                .is_some_and(|heading| heading.eq_ignore_ascii_case("physical"))
        })
        .collect();
    assert_eq!(physical.len(), 2);
    assert_eq!(physical[0].items.len(), 2);
    assert_eq!(physical[1].items.len(), 1);
}

#[test]
fn test_regroup_is_idempotent() {
    let once = regroup(&routine_rows());
    let twice = regroup(&once);
    assert_eq!(once, twice);

    let labels: Vec<&str> = once.iter().map(|row| row.group_by.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Physical", "Physical", "Chemical", "", "", "physical", "Chemical"]
    );
}

#[test]
fn test_merged_bucket_keeps_relative_order() {
    let rows = vec![
        row("Hb", "", "Haemogram", 1.0),
        row("WBC", "", "haemogram", 2.0),
        row("RBC", "", " Haemogram", 1.5),
    ];
    let names: Vec<String> = regroup(&rows).into_iter().map(|row| row.name).collect();
    assert_eq!(names, vec!["Hb", "RBC", "WBC"]);
}
