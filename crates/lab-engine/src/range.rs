//! Reference-range resolution.
//!
//! A parameter usually carries many overlapping bands (neonatal, child,
//! adult, per gender). [`resolve_band`] picks exactly one of them for a
//! patient:
//!
//! 1. Every band's age bounds are converted to an inclusive day interval.
//!    Missing bounds are open (-inf / +inf).
//! 2. Bands containing the patient's age are ranked; the best one wins.
//! 3. With no containing band, the widest finite band of the best gender
//!    pool is used as a fallback.

use std::cmp::Ordering;

use lab_model::{AgeBound, BandKind, EngineOptions, Gender, NormalValueBand, ResolvedParameter};
use tracing::trace;

use crate::normalization::{
    days_for, detect_age_unit, first_number, format_numeric, parse_stored_age_to_days,
    unit_or_default,
};

/// Inclusive age interval of a band, in days.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgeSpan {
    pub min: f64,
    pub max: f64,
}

impl AgeSpan {
    pub const OPEN: AgeSpan = AgeSpan {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn contains(&self, days: i64) -> bool {
        let days = days as f64;
        self.min <= days && days <= self.max
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// `max - min`; infinite for open spans.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// Day interval for a band.
///
/// A packed `min_age` such as `"1-10 Days"` supplies both ends. Otherwise
/// `min_age` and `max_age` are read independently, using the band's
/// `age_unit` for bare numbers.
pub fn band_age_span(band: &NormalValueBand) -> AgeSpan {
    let companion = band.age_unit.as_deref().unwrap_or_default();
    if let Some(AgeBound::Text(text)) = &band.min_age
        && let Some((min, max)) = parse_packed_age_range(text, companion)
    {
        return AgeSpan { min, max };
    }
    AgeSpan {
        min: bound_days(band.min_age.as_ref(), companion).unwrap_or(f64::NEG_INFINITY),
        max: bound_days(band.max_age.as_ref(), companion).unwrap_or(f64::INFINITY),
    }
}

/// Parses `"<a>-<b> <unit>"` (or `"<a> to <b> <unit>"`) into day bounds.
fn parse_packed_age_range(text: &str, companion: &str) -> Option<(f64, f64)> {
    let (low, rest) = first_number(text)?;
    let rest = rest.trim_start();
    let rest = rest
        .strip_prefix('-')
        .or_else(|| rest.strip_prefix("to"))?
        .trim_start();
    if !rest.starts_with(|ch: char| ch.is_ascii_digit()) {
        return None;
    }
    let (high, unit_text) = first_number(rest)?;
    let unit = detect_age_unit(unit_text).unwrap_or_else(|| unit_or_default(companion));
    Some((days_for(low, unit) as f64, days_for(high, unit) as f64))
}

fn bound_days(bound: Option<&AgeBound>, companion: &str) -> Option<f64> {
    let bound = bound.filter(|bound| !bound.is_blank())?;
    let days = match bound {
        AgeBound::Number(value) => days_for(*value, unit_or_default(companion)),
        AgeBound::Text(text) if detect_age_unit(text).is_some() => parse_stored_age_to_days(text)?,
        AgeBound::Text(text) => {
            let (value, _) = first_number(text)?;
            days_for(value, unit_or_default(companion))
        }
    };
    Some(days as f64)
}

fn is_exact_gender(band: &NormalValueBand, gender: Gender) -> bool {
    gender.is_specific() && band.gender == gender
}

/// Ranks two containing bands; `Less` means `a` is the better choice.
fn compare_matches(
    a: (&NormalValueBand, AgeSpan),
    b: (&NormalValueBand, AgeSpan),
    patient_days: i64,
    gender: Gender,
    options: &EngineOptions,
) -> Ordering {
    let (band_a, span_a) = a;
    let (band_b, span_b) = b;
    // finite before infinite
    let finite = span_b.is_finite().cmp(&span_a.is_finite());
    if finite != Ordering::Equal {
        return finite;
    }
    // neonatal bands last once the patient is past the neonatal window
    if patient_days > options.baby_band_max_days {
        let threshold = options.baby_band_max_days as f64;
        let baby = (span_a.max <= threshold).cmp(&(span_b.max <= threshold));
        if baby != Ordering::Equal {
            return baby;
        }
    }
    // narrower first
    let width = span_a.width().partial_cmp(&span_b.width()).unwrap_or(Ordering::Equal);
    if width != Ordering::Equal {
        return width;
    }
    let exact = is_exact_gender(band_b, gender).cmp(&is_exact_gender(band_a, gender));
    if exact != Ordering::Equal {
        return exact;
    }
    // higher min first
    span_b.min.partial_cmp(&span_a.min).unwrap_or(Ordering::Equal)
}

/// Index of the band that applies to a patient, or None when `bands` is empty.
pub fn resolve_band_index(
    bands: &[NormalValueBand],
    patient_days: i64,
    gender: Gender,
    options: &EngineOptions,
) -> Option<usize> {
    if bands.is_empty() {
        return None;
    }
    let spans: Vec<AgeSpan> = bands.iter().map(band_age_span).collect();

    let best_match = (0..bands.len())
        .filter(|&idx| spans[idx].contains(patient_days))
        .min_by(|&a, &b| {
            compare_matches(
                (&bands[a], spans[a]),
                (&bands[b], spans[b]),
                patient_days,
                gender,
                options,
            )
        });
    if let Some(idx) = best_match {
        trace!(band = idx, "reference band matched by age");
        return Some(idx);
    }

    let exact: Vec<usize> = (0..bands.len())
        .filter(|&idx| is_exact_gender(&bands[idx], gender))
        .collect();
    let pool = if !exact.is_empty() {
        exact
    } else {
        let any: Vec<usize> = (0..bands.len())
            .filter(|&idx| bands[idx].gender == Gender::Any)
            .collect();
        if any.is_empty() {
            (0..bands.len()).collect()
        } else {
            any
        }
    };
    let finite: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&idx| spans[idx].is_finite())
        .collect();
    let candidates = if finite.is_empty() { pool } else { finite };

    // widest first, then higher max; first seen wins ties
    let fallback = candidates.into_iter().reduce(|best, idx| {
        let (current, next) = (spans[best], spans[idx]);
        let wider = next.width() > current.width();
        let same_width_higher_max = next.width() == current.width() && next.max > current.max;
        if wider || same_width_higher_max { idx } else { best }
    });
    trace!(band = ?fallback, "reference band chosen by fallback");
    fallback
}

/// The band that applies to a patient.
pub fn resolve_band<'a>(
    bands: &'a [NormalValueBand],
    patient_days: i64,
    gender: Gender,
    options: &EngineOptions,
) -> Option<&'a NormalValueBand> {
    resolve_band_index(bands, patient_days, gender, options).map(|idx| &bands[idx])
}

/// Display string for a band: `lo-hi`, `<hi`, `>lo` or the text value.
pub fn format_normal_range(band: &NormalValueBand) -> String {
    match band.kind {
        BandKind::Text => band.text_value.clone().unwrap_or_default().trim().to_string(),
        BandKind::NumericRange => match (band.lower_value, band.upper_value) {
            (Some(lower), Some(upper)) => {
                format!("{}-{}", format_numeric(lower), format_numeric(upper))
            }
            (None, Some(upper)) => format!("<{}", format_numeric(upper)),
            (Some(lower), None) => format!(">{}", format_numeric(lower)),
            (None, None) => String::new(),
        },
    }
}

/// Re-derive a row's range fields for the given patient.
///
/// Safe to call repeatedly; only range fields are touched.
pub fn apply_range(
    row: &mut ResolvedParameter,
    patient_days: i64,
    gender: Gender,
    options: &EngineOptions,
) {
    match resolve_band(&row.normal_values, patient_days, gender, options) {
        Some(band) => {
            row.normal_range = format_normal_range(band);
            row.range_kind = Some(band.kind);
            row.show_range = band.display_in_report;
            row.remark = band.remark.clone();
        }
        None => {
            row.normal_range.clear();
            row.range_kind = None;
            row.show_range = true;
            row.remark = None;
        }
    }
}
