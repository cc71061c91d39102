use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ColumnConstraint, ContentArrangement, Table, Width,
};

use anyhow::Result;
use lab_engine::{ReportSession, group_sections};
use lab_model::{ResolvedParameter, ResultStatus, TestReport};

use crate::cli::OutputFormatArg;

pub fn print_report(session: &ReportSession, format: OutputFormatArg) -> Result<()> {
    match format {
        OutputFormatArg::Table => {
            print_patient_line(session);
            for test in session.tests() {
                println!("{}", report_table(test));
            }
        }
        OutputFormatArg::Outline => {
            print_patient_line(session);
            for test in session.tests() {
                print!("{}", render_outline(test));
            }
        }
        OutputFormatArg::Json => {
            println!("{}", serde_json::to_string_pretty(session.tests())?);
        }
    }
    let flagged: usize = session.tests().iter().map(TestReport::flagged_count).sum();
    if flagged > 0 && format != OutputFormatArg::Json {
        eprintln!("{flagged} result(s) outside the reference range");
    }
    Ok(())
}

fn print_patient_line(session: &ReportSession) {
    let patient = session.patient();
    println!(
        "Patient: {} {}, {}",
        patient.age_value, patient.age_unit, patient.gender
    );
}

/// Bordered table of one test, with a row per group heading.
pub fn report_table(test: &TestReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell(&test.test_name),
        header_cell("Result"),
        header_cell("Unit"),
        header_cell("Reference"),
        header_cell("Status"),
    ]);
    apply_report_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Center);

    let mut current_outer = String::new();
    for section in group_sections(&test.parameters) {
        if section.outer_group != current_outer {
            current_outer.clone_from(&section.outer_group);
            if !current_outer.is_empty() {
                table.add_row(heading_row(&current_outer, Color::Blue));
            }
        }
        if let Some(heading) = &section.heading {
            table.add_row(heading_row(heading, Color::Cyan));
        }
        for row in &section.items {
            table.add_row(vec![
                Cell::new(&row.name),
                result_cell(row),
                dim_or_plain(&row.unit),
                dim_or_plain(&display_range(row)),
                status_cell(row.status),
            ]);
        }
    }
    table
}

/// Plain-text outline of one test, one line per row.
pub fn render_outline(test: &TestReport) -> String {
    let mut out = format!("{}\n", test.test_name);
    let mut current_outer = String::new();
    for section in group_sections(&test.parameters) {
        if section.outer_group != current_outer {
            current_outer.clone_from(&section.outer_group);
            if !current_outer.is_empty() {
                out.push_str(&format!("  [{current_outer}]\n"));
            }
        }
        let indent = if current_outer.is_empty() { "  " } else { "    " };
        let mut item_indent = indent.to_string();
        if let Some(heading) = &section.heading {
            out.push_str(&format!("{indent}{heading}\n"));
            item_indent.push_str("  ");
        }
        for row in &section.items {
            out.push_str(&format!("{item_indent}{}\n", outline_line(row)));
        }
    }
    out
}

fn outline_line(row: &ResolvedParameter) -> String {
    let mut line = format!("{}: ", row.name);
    if row.has_result() {
        line.push_str(row.result.trim());
        if !row.unit.is_empty() {
            line.push(' ');
            line.push_str(&row.unit);
        }
    } else {
        line.push('-');
    }
    let range = display_range(row);
    if !range.is_empty() {
        line.push_str(&format!(" ({range})"));
    }
    line.push_str(&format!(" {}", row.status));
    line
}

fn display_range(row: &ResolvedParameter) -> String {
    if row.show_range {
        row.normal_range.clone()
    } else {
        String::new()
    }
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_report_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(120);
    if table.column_count() >= 5 {
        table.set_constraints(vec![
            ColumnConstraint::UpperBoundary(Width::Percentage(40)),
            ColumnConstraint::LowerBoundary(Width::Fixed(8)),
            ColumnConstraint::UpperBoundary(Width::Fixed(14)),
            ColumnConstraint::UpperBoundary(Width::Percentage(30)),
            ColumnConstraint::LowerBoundary(Width::Fixed(10)),
        ]);
    }
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn heading_row(label: &str, color: Color) -> Vec<Cell> {
    vec![
        Cell::new(label).fg(color).add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
    ]
}

fn result_cell(row: &ResolvedParameter) -> Cell {
    if !row.has_result() {
        return dim_cell("-");
    }
    let cell = Cell::new(row.result.trim());
    match status_color(row.status) {
        Some(color) => cell.fg(color).add_attribute(Attribute::Bold),
        None => cell,
    }
}

fn status_cell(status: ResultStatus) -> Cell {
    match status_color(status) {
        Some(color) => Cell::new(status).fg(color).add_attribute(Attribute::Bold),
        None if status == ResultStatus::Normal => Cell::new(status).fg(Color::Green),
        None => dim_cell(status),
    }
}

fn status_color(status: ResultStatus) -> Option<Color> {
    match status {
        ResultStatus::Critical => Some(Color::Red),
        ResultStatus::High | ResultStatus::Low | ResultStatus::Abnormal => Some(Color::Yellow),
        ResultStatus::Normal | ResultStatus::Pending => None,
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_or_plain(value: &str) -> Cell {
    if value.is_empty() {
        dim_cell("-")
    } else {
        Cell::new(value)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
