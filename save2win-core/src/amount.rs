//! Amount parsing for loosely typed upstream values.

use serde_json::Value;

/// Convert a raw amount to `f64`, falling back to `default` on anything
/// unusable. Strings may carry `$` and thousands separators.
pub fn parse_amount(value: Option<&Value>, default: f64) -> f64 {
    let parsed = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => {
            let cleaned: String = s.chars().filter(|c| *c != ',' && *c != '$').collect();
            cleaned.trim().parse::<f64>().ok()
        }
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

/// Round half away from zero to 2 decimal places.
pub fn round2(v: f64) -> f64 {
    let r = (v * 100.0).round() / 100.0;
    // avoid emitting -0.0
    if r == 0.0 { 0.0 } else { r }
}
