//! Result status classification.

use std::collections::HashSet;

use lab_model::{BandKind, EngineOptions, ResolvedParameter, ResultStatus, canonical_label};

use crate::normalization::parse_f64;

/// Numeric interpretation of a normal-range display string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeSpec {
    /// `min-max`, bounds inclusive.
    Between { min: f64, max: f64 },
    /// `<max`
    Below(f64),
    /// `>min`
    Above(f64),
}

/// Parse `"10-20"`, `"10 – 20"`, `"10 to 20"`, `"<5"` or `">60"`.
pub fn parse_range(text: &str) -> Option<RangeSpec> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('<') {
        return parse_f64(rest.trim_start_matches('=')).map(RangeSpec::Below);
    }
    if let Some(rest) = text.strip_prefix('>') {
        return parse_f64(rest.trim_start_matches('=')).map(RangeSpec::Above);
    }
    let (min, max) = split_range(text)?;
    Some(RangeSpec::Between {
        min: parse_f64(min)?,
        max: parse_f64(max)?,
    })
}

fn split_range(text: &str) -> Option<(&str, &str)> {
    if let Some(parts) = text.split_once('–') {
        return Some(parts);
    }
    if let Some(parts) = text.split_once(" to ") {
        return Some(parts);
    }
    // a leading '-' is a sign, not a separator
    let (idx, _) = text.char_indices().skip(1).find(|(_, ch)| *ch == '-')?;
    Some((&text[..idx], &text[idx + 1..]))
}

/// Classify a row from its `result`, `normal_range` and `range_kind`.
pub fn classify(row: &ResolvedParameter, options: &EngineOptions) -> ResultStatus {
    let result = row.result.trim();
    if result.is_empty() {
        return ResultStatus::Pending;
    }
    if row.is_dropdown() {
        return classify_dropdown(result, &row.normal_range);
    }
    if row.range_kind == Some(BandKind::Text) {
        let expected = canonical_label(&row.normal_range);
        if expected.is_empty() {
            return ResultStatus::Pending;
        }
        return if canonical_label(result) == expected {
            ResultStatus::Normal
        } else {
            ResultStatus::High
        };
    }
    let Some(value) = parse_f64(result) else {
        return ResultStatus::Pending;
    };
    if row.normal_range.trim().is_empty() {
        return ResultStatus::Pending;
    }
    match parse_range(&row.normal_range) {
        Some(range) => classify_numeric(value, range, options),
        None => ResultStatus::Normal,
    }
}

/// Status of a numeric value against a parsed range.
pub fn classify_numeric(value: f64, range: RangeSpec, options: &EngineOptions) -> ResultStatus {
    match range {
        RangeSpec::Between { min, max } => {
            if value < min {
                if value < min * options.critical_low_factor {
                    ResultStatus::Critical
                } else {
                    ResultStatus::Low
                }
            } else if value > max {
                if value > max * options.critical_high_factor {
                    ResultStatus::Critical
                } else {
                    ResultStatus::High
                }
            } else {
                ResultStatus::Normal
            }
        }
        RangeSpec::Below(max) if value < max => ResultStatus::Normal,
        RangeSpec::Below(_) => ResultStatus::High,
        RangeSpec::Above(min) if value > min => ResultStatus::Normal,
        RangeSpec::Above(_) => ResultStatus::Low,
    }
}

/// Dropdowns only judge when at least two distinct normal labels exist.
fn classify_dropdown(selected: &str, normal_range: &str) -> ResultStatus {
    let normals: HashSet<String> = normal_range
        .split(',')
        .map(canonical_label)
        .filter(|label| !label.is_empty())
        .collect();
    if normals.len() >= 2 && normals.contains(&canonical_label(selected)) {
        ResultStatus::Normal
    } else {
        ResultStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lab_model::{ParameterDefinition, ResultType};

    fn numeric_row(range: &str, result: &str) -> ResolvedParameter {
        let mut row = ResolvedParameter::from_definition(&ParameterDefinition::new("X", 1.0), "");
        row.normal_range = range.to_string();
        row.range_kind = Some(BandKind::NumericRange);
        row.result = result.to_string();
        row
    }

    fn status(range: &str, result: &str) -> ResultStatus {
        classify(&numeric_row(range, result), &EngineOptions::default())
    }

    #[test]
    fn range_forms() {
        assert_eq!(parse_range("10-20"), Some(RangeSpec::Between { min: 10.0, max: 20.0 }));
        assert_eq!(parse_range("3.5 – 5"), Some(RangeSpec::Between { min: 3.5, max: 5.0 }));
        assert_eq!(parse_range("1 to 2"), Some(RangeSpec::Between { min: 1.0, max: 2.0 }));
        assert_eq!(parse_range("-5-5"), Some(RangeSpec::Between { min: -5.0, max: 5.0 }));
        assert_eq!(parse_range("<40"), Some(RangeSpec::Below(40.0)));
        assert_eq!(parse_range("> 60"), Some(RangeSpec::Above(60.0)));
        assert_eq!(parse_range("Negative"), None);
    }

    #[test]
    fn between_boundaries() {
        assert_eq!(status("10-20", "10"), ResultStatus::Normal);
        assert_eq!(status("10-20", "20"), ResultStatus::Normal);
        assert_eq!(status("10-20", "9.99"), ResultStatus::Low);
        assert_eq!(status("10-20", "5"), ResultStatus::Low);
        assert_eq!(status("10-20", "4.9"), ResultStatus::Critical);
        assert_eq!(status("10-20", "20.5"), ResultStatus::High);
        assert_eq!(status("10-20", "40"), ResultStatus::High);
        assert_eq!(status("10-20", "40.1"), ResultStatus::Critical);
    }

    #[test]
    fn one_sided_ranges() {
        assert_eq!(status("<40", "39"), ResultStatus::Normal);
        assert_eq!(status("<40", "40"), ResultStatus::High);
        assert_eq!(status(">60", "61"), ResultStatus::Normal);
        assert_eq!(status(">60", "60"), ResultStatus::Low);
    }

    #[test]
    fn degraded_inputs() {
        assert_eq!(status("10-20", ""), ResultStatus::Pending);
        assert_eq!(status("10-20", "trace"), ResultStatus::Pending);
        assert_eq!(status("", "12"), ResultStatus::Pending);
        assert_eq!(status("see remark", "12"), ResultStatus::Normal);
    }

    #[test]
    fn text_bands() {
        let mut row = numeric_row(" Negative ", "negative");
        row.range_kind = Some(BandKind::Text);
        assert_eq!(classify(&row, &EngineOptions::default()), ResultStatus::Normal);
        row.result = "Positive".to_string();
        assert_eq!(classify(&row, &EngineOptions::default()), ResultStatus::High);
    }

    #[test]
    fn dropdowns_need_two_normal_labels() {
        let mut row = numeric_row("Pale Yellow, Straw", "straw");
        row.result_type = ResultType::Dropdown;
        row.range_kind = Some(BandKind::Text);
        assert_eq!(classify(&row, &EngineOptions::default()), ResultStatus::Normal);
        row.result = "Red".to_string();
        assert_eq!(classify(&row, &EngineOptions::default()), ResultStatus::Pending);

        row.normal_range = "Clear".to_string();
        row.result = "Clear".to_string();
        assert_eq!(classify(&row, &EngineOptions::default()), ResultStatus::Pending);
    }
}
