//! Numeric normalization utilities.

/// Parses a string as a finite f64, returning None for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|parsed| parsed.is_finite())
}

/// Finds the first unsigned decimal number in `text`.
///
/// Returns the number and the text following it. A `-` before the digits is
/// not treated as a sign, so `"1-10 Days"` yields `1` and `"-10 Days"`.
pub fn first_number(text: &str) -> Option<(f64, &str)> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(u8::is_ascii_digit)?;
    let mut end = start;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot && bytes.get(end + 1).is_some_and(u8::is_ascii_digit) => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    let value = text[start..end].parse::<f64>().ok()?;
    Some((value, &text[end..]))
}

/// Rounds half away from zero to `places` decimals.
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Formats with exactly `places` decimals.
pub fn format_fixed(value: f64, places: u32) -> String {
    format!("{value:.prec$}", prec = places as usize)
}

/// Formats a floating-point number as a string without trailing zeros.
///
/// `10.0` prints as `10`, `10.50` as `10.5`.
pub fn format_numeric(value: f64) -> String {
    let s = format!("{value}");
    if !s.contains('.') {
        return s;
    }
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}
