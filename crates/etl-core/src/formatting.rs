//! Text rendering of cell values for CSV output, plus decimal rounding.

use crate::table::{Cell, Value};

/// Round `value` to `decimals` places, ties to even on the scaled value.
///
/// # Examples
///
/// ```
/// use etl_core::formatting::round_half_even;
///
/// assert_eq!(round_half_even(13000.0, 2), 13000.0);
/// assert_eq!(round_half_even(2.345678, 2), 2.35);
/// assert_eq!(round_half_even(0.125, 2), 0.12);
/// assert_eq!(round_half_even(0.375, 2), 0.38);
/// ```
pub fn round_half_even(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round_ties_even() / factor
}

/// Format a float in shortest round-trip form, always keeping a fractional
/// part or an exponent so it reads back as a float.
///
/// Magnitudes of `1e16` and above, and non-zero magnitudes below `1e-4`, use
/// exponent notation with a signed, two-digit-minimum exponent.
///
/// # Examples
///
/// ```
/// use etl_core::formatting::format_float;
///
/// assert_eq!(format_float(13000.0), "13000.0");
/// assert_eq!(format_float(24924.5), "24924.5");
/// assert_eq!(format_float(-0.25), "-0.25");
/// assert_eq!(format_float(1e20), "1e+20");
/// assert_eq!(format_float(1.5e-7), "1.5e-07");
/// ```
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return String::new();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let abs = value.abs();
    if abs >= 1e16 || (abs != 0.0 && abs < 1e-4) {
        let raw = format!("{:e}", value);
        // `raw` looks like "1.5e-7" or "1e20".
        let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
        let (sign, digits) = match exponent.strip_prefix('-') {
            Some(d) => ('-', d),
            None => ('+', exponent),
        };
        return format!("{}e{}{:0>2}", mantissa, sign, digits);
    }

    let plain = value.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// Render a cell as CSV field text. Missing cells render as an empty string.
pub fn format_cell(cell: &Cell) -> String {
    match cell {
        None => String::new(),
        Some(Value::Int(i)) => i.to_string(),
        Some(Value::Float(f)) => format_float(*f),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(Value::Str(s)) => s.clone(),
        Some(Value::Date(d)) => d.format("%Y-%m-%d").to_string(),
        Some(Value::Timestamp(ts)) => ts.format("%Y-%m-%d %H:%M:%S").to_string(),
    }
}
