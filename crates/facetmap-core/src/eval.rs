//! Client-side evaluation of predicates with SQL three-valued logic.

use crate::model::Feature;
use crate::predicate::{CastType, CmpOp, Expr, Func, Literal};
use crate::value::{format_number, Value};
use chrono::NaiveTime;
use std::cmp::Ordering;

impl Expr {
    /// Evaluate against a feature. `None` is SQL unknown.
    #[must_use]
    pub fn evaluate(&self, feature: &Feature) -> Option<bool> {
        match self {
            Self::Compare { left, op, right } => {
                let ord = compare(&left.value(feature), &right.value(feature))?;
                Some(match op {
                    CmpOp::Eq => ord == Ordering::Equal,
                    CmpOp::NotEq => ord != Ordering::Equal,
                    CmpOp::Lt => ord == Ordering::Less,
                    CmpOp::LtEq => ord != Ordering::Greater,
                    CmpOp::Gt => ord == Ordering::Greater,
                    CmpOp::GtEq => ord != Ordering::Less,
                })
            }
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let v = expr.value(feature);
                let above = compare(&v, &low.value(feature)).map(|o| o != Ordering::Less);
                let below = compare(&v, &high.value(feature)).map(|o| o != Ordering::Greater);
                and(above, below).map(|b| b != *negated)
            }
            Self::InList {
                expr,
                list,
                negated,
            } => {
                let v = expr.value(feature);
                if v.is_null() {
                    return None;
                }
                let mut unknown = false;
                for item in list {
                    match compare(&v, &item.value(feature)) {
                        Some(Ordering::Equal) => return Some(!negated),
                        None => unknown = true,
                        Some(_) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(*negated)
                }
            }
            Self::IsNull { expr, negated } => Some(expr.value(feature).is_null() != *negated),
            Self::Like {
                expr,
                pattern,
                negated,
            } => {
                let text = expr.value(feature);
                let pattern = pattern.value(feature);
                if text.is_null() || pattern.is_null() {
                    return None;
                }
                Some(like(&text.to_string(), &pattern.to_string()) != *negated)
            }
            Self::Not(inner) => inner.evaluate(feature).map(|b| !b),
            Self::And(l, r) => and(l.evaluate(feature), r.evaluate(feature)),
            Self::Or(l, r) => match (l.evaluate(feature), r.evaluate(feature)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            Self::Literal(_) | Self::Column(_) | Self::Cast { .. } | Self::Call { .. } => {
                self.value(feature).as_f64().map(|n| n != 0.0)
            }
        }
    }

    /// True only when the predicate evaluates to true.
    #[must_use]
    pub fn matches(&self, feature: &Feature) -> bool {
        self.evaluate(feature) == Some(true)
    }

    fn value(&self, feature: &Feature) -> Value {
        match self {
            Self::Literal(Literal::Null) => Value::Null,
            Self::Literal(Literal::Number(n)) => Value::Number(*n),
            Self::Literal(Literal::Text(s)) => Value::Text(s.clone()),
            Self::Literal(Literal::Date(d)) => {
                Value::Number(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis() as f64)
            }
            Self::Column(name) => feature.get(name).clone(),
            Self::Cast { expr, to } => {
                let v = expr.value(feature);
                match to {
                    CastType::Float => v.as_f64().map_or(Value::Null, Value::Number),
                    CastType::Integer => v.as_f64().map_or(Value::Null, |n| Value::Number(n.trunc())),
                    CastType::Varchar(len) => match v {
                        Value::Null => Value::Null,
                        Value::Number(n) => Value::Text(truncate(format_number(n), *len)),
                        Value::Text(s) => Value::Text(truncate(s, *len)),
                    },
                }
            }
            Self::Call { func, arg } => match arg.value(feature) {
                Value::Null => Value::Null,
                v => {
                    let s = v.to_string();
                    Value::Text(match func {
                        Func::Lower => s.to_lowercase(),
                        Func::Upper => s.to_uppercase(),
                    })
                }
            },
            _ => Value::Null,
        }
    }
}

fn truncate(s: String, len: Option<u32>) -> String {
    match len {
        Some(n) if s.chars().count() > n as usize => s.chars().take(n as usize).collect(),
        _ => s,
    }
}

fn and(l: Option<bool>, r: Option<bool>) -> Option<bool> {
    match (l, r) {
        (Some(false), _) | (_, Some(false)) => Some(false),
        (Some(true), Some(true)) => Some(true),
        _ => None,
    }
}

/// Compare two values; numeric-looking text is coerced against numbers.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Text(x), Value::Text(y)) => Some(x.cmp(y)),
        _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
    }
}

/// SQL `LIKE` with `%` and `_` wildcards, case-sensitive.
fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '%')
}
