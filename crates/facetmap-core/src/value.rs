//! Attribute values as they arrive from a feature service.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single attribute value.
///
/// Dates are carried as epoch milliseconds in [`Value::Number`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value
    #[default]
    Null,
    /// Numeric value (also dates, as epoch milliseconds)
    Number(f64),
    /// Text value
    Text(String),
}

impl Value {
    /// Create a text value.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Check for SQL null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null, or a string holding only whitespace.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Numeric reading of the value.
    ///
    /// Text is accepted when it parses as a finite number after trimming.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Borrow the text of a text value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// True when the value reads as a number with no fractional part.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.as_f64().is_some_and(|n| n.fract() == 0.0)
    }

    /// Total order used for sorting value lists: nulls, then numbers, then text.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

/// Format a number without a trailing `.0` for integral values.
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank() {
        assert!(Value::Null.is_blank());
        assert!(Value::text("   ").is_blank());
        assert!(!Value::text(" a ").is_blank());
        assert!(!Value::Number(0.0).is_blank());
    }

    #[test]
    fn test_as_f64_parses_text() {
        assert_eq!(Value::text(" 42 ").as_f64(), Some(42.0));
        assert_eq!(Value::text("1e3").as_f64(), Some(1000.0));
        assert_eq!(Value::text("12abc").as_f64(), None);
        assert_eq!(Value::text("inf").as_f64(), None);
        assert_eq!(Value::Null.as_f64(), None);
    }

    #[test]
    fn test_integral() {
        assert!(Value::Number(3.0).is_integral());
        assert!(!Value::Number(3.5).is_integral());
        assert!(Value::text("7").is_integral());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Number(20.0).to_string(), "20");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "");
    }

    #[test]
    fn test_total_cmp_orders_kinds() {
        let mut values = vec![Value::text("b"), Value::Number(2.0), Value::Null, Value::text("a")];
        values.sort_by(Value::total_cmp);
        assert_eq!(
            values,
            vec![Value::Null, Value::Number(2.0), Value::text("a"), Value::text("b")]
        );
    }

    #[test]
    fn test_serde_untagged() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, 3, "x", 1.5]"#).unwrap();
        assert_eq!(
            values,
            vec![Value::Null, Value::Number(3.0), Value::text("x"), Value::Number(1.5)]
        );
    }
}
