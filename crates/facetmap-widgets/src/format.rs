//! Label formatting for values, percentages and field names.

use chrono::{DateTime, Datelike, NaiveDate};
use facetmap_core::value::format_number;
use facetmap_core::{Field, SimpleType, Value};

/// Label shown for null and blank values.
pub const NO_VALUE: &str = "No value";

/// Calendar date (UTC) of an epoch-millisecond timestamp.
#[must_use]
pub fn date_of(ms: f64) -> NaiveDate {
    DateTime::from_timestamp_millis(ms as i64)
        .map(|dt| dt.date_naive())
        .unwrap_or_default()
}

/// `M/D/YYYY`
#[must_use]
pub fn format_date(ms: f64) -> String {
    let d = date_of(ms);
    format!("{}/{}/{}", d.month(), d.day(), d.year())
}

/// Share as a percentage with two decimals, e.g. `12.50%`.
#[must_use]
pub fn format_pct(pct: f64) -> String {
    format!("{:.2}%", pct * 100.0)
}

/// Display label of a value.
#[must_use]
pub fn value_label(value: &Value, is_date: bool) -> String {
    if value.is_blank() {
        return NO_VALUE.to_string();
    }
    match value.as_f64() {
        Some(ms) if is_date => format_date(ms),
        _ => value.to_string(),
    }
}

/// Decimal places used to show a numeric range.
///
/// Ranges with more than three integer digits, or a single fractional
/// digit, are shown as integers; otherwise up to four fractional digits.
#[must_use]
pub fn range_precision(range: f64) -> usize {
    let text = format_number(range.abs());
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "0"));
    let frac_digits = frac_part.len().min(4);
    if frac_digits == 1 || int_part.len() > 3 {
        0
    } else {
        frac_digits
    }
}

/// Catalog label of a field: name plus its range or value count.
#[must_use]
pub fn field_label(field: &Field) -> String {
    let name = field.display_name();
    let Some(summary) = &field.summary else {
        return name.to_string();
    };
    let bounds = summary
        .min
        .as_ref()
        .and_then(Value::as_f64)
        .zip(summary.max.as_ref().and_then(Value::as_f64));
    match (field.simple_type, bounds) {
        (SimpleType::Numeric, Some((min, max))) => {
            let p = range_precision(max - min);
            format!("{name} ({min:.p$} to {max:.p$})")
        }
        (SimpleType::Date, Some((min, max))) => {
            format!("{name} ({} to {})", format_date(min), format_date(max))
        }
        (SimpleType::String, _) => match summary.unique_count {
            Some(n) if n > 0 => format!("{name} ({n} values)"),
            _ => name.to_string(),
        },
        _ => name.to_string(),
    }
}
