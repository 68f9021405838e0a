//! Boolean predicate language used for filter fragments and where clauses.
//!
//! Fragments are built as typed [`Expr`] trees and rendered to SQL text with
//! [`fmt::Display`]. Rendering is precedence aware, so every rendered
//! expression parses back (see [`crate::parser::parse`]) to an equivalent tree.

use crate::value::format_number;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Predicate text could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    /// Syntax error at a byte offset.
    #[error("syntax error at offset {offset}: expected {expected}")]
    Syntax {
        /// Byte offset of the error
        offset: usize,
        /// Tokens the parser would have accepted
        expected: String,
    },
}

/// Literal operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// `NULL`
    Null,
    /// Numeric literal
    Number(f64),
    /// Single-quoted string
    Text(String),
    /// `DATE 'YYYY-MM-DD'`
    Date(NaiveDate),
}

/// Target type of a `CAST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastType {
    /// `FLOAT`
    Float,
    /// `INTEGER`
    Integer,
    /// `VARCHAR(n)`
    Varchar(Option<u32>),
}

/// Scalar function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Func {
    /// `lower(x)`
    Lower,
    /// `upper(x)`
    Upper,
}

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `<>`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
}

impl CmpOp {
    const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Predicate expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Literal),
    Column(String),
    Cast {
        expr: Box<Expr>,
        to: CastType,
    },
    Call {
        func: Func,
        arg: Box<Expr>,
    },
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    InList {
        expr: Box<Expr>,
        list: Vec<Expr>,
        negated: bool,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    Like {
        expr: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Column reference.
    #[must_use]
    pub fn col(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    /// Numeric literal.
    #[must_use]
    pub const fn num(n: f64) -> Self {
        Self::Literal(Literal::Number(n))
    }

    /// String literal.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Self::Literal(Literal::Text(s.into()))
    }

    /// Date literal.
    #[must_use]
    pub const fn date(d: NaiveDate) -> Self {
        Self::Literal(Literal::Date(d))
    }

    /// The always-true predicate `1=1`.
    #[must_use]
    pub fn tautology() -> Self {
        Self::num(1.0).equals(Self::num(1.0))
    }

    /// Check for the canonical `1=1`.
    #[must_use]
    pub fn is_tautology(&self) -> bool {
        matches!(
            self,
            Self::Compare { left, op: CmpOp::Eq, right }
                if **left == Self::num(1.0) && **right == Self::num(1.0)
        )
    }

    fn compare(self, op: CmpOp, right: Self) -> Self {
        Self::Compare {
            left: Box::new(self),
            op,
            right: Box::new(right),
        }
    }

    /// `self = right`
    #[must_use]
    pub fn equals(self, right: Self) -> Self {
        self.compare(CmpOp::Eq, right)
    }

    /// `self >= right`
    #[must_use]
    pub fn gte(self, right: Self) -> Self {
        self.compare(CmpOp::GtEq, right)
    }

    /// `self <= right`
    #[must_use]
    pub fn lte(self, right: Self) -> Self {
        self.compare(CmpOp::LtEq, right)
    }

    /// `self IN (list)`
    #[must_use]
    pub fn in_list(self, list: Vec<Self>) -> Self {
        Self::InList {
            expr: Box::new(self),
            list,
            negated: false,
        }
    }

    /// `self IS NULL`
    #[must_use]
    pub fn is_null(self) -> Self {
        Self::IsNull {
            expr: Box::new(self),
            negated: false,
        }
    }

    /// `self BETWEEN low AND high`
    #[must_use]
    pub fn between(self, low: Self, high: Self) -> Self {
        Self::Between {
            expr: Box::new(self),
            low: Box::new(low),
            high: Box::new(high),
            negated: false,
        }
    }

    /// `self LIKE pattern`
    #[must_use]
    pub fn like(self, pattern: Self) -> Self {
        Self::Like {
            expr: Box::new(self),
            pattern: Box::new(pattern),
            negated: false,
        }
    }

    /// `lower(self)`
    #[must_use]
    pub fn lower(self) -> Self {
        Self::Call {
            func: Func::Lower,
            arg: Box::new(self),
        }
    }

    /// `CAST(self AS to)`
    #[must_use]
    pub fn cast(self, to: CastType) -> Self {
        Self::Cast {
            expr: Box::new(self),
            to,
        }
    }

    /// `self AND right`
    #[must_use]
    pub fn and(self, right: Self) -> Self {
        Self::And(Box::new(self), Box::new(right))
    }

    /// `self OR right`
    #[must_use]
    pub fn or(self, right: Self) -> Self {
        Self::Or(Box::new(self), Box::new(right))
    }

    /// Disjunction of all expressions, `None` when empty.
    pub fn any_of(exprs: impl IntoIterator<Item = Self>) -> Option<Self> {
        exprs.into_iter().reduce(Self::or)
    }

    /// Parse predicate text.
    pub fn parse(input: &str) -> Result<Self, PredicateError> {
        crate::parser::parse(input)
    }

    /// Every column name referenced by the expression.
    #[must_use]
    pub fn columns(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit_columns(&mut |name| {
            out.insert(name.to_string());
        });
        out
    }

    fn visit_columns(&self, f: &mut impl FnMut(&str)) {
        match self {
            Self::Literal(_) => {}
            Self::Column(name) => f(name),
            Self::Cast { expr, .. } | Self::Call { arg: expr, .. } | Self::Not(expr) => {
                expr.visit_columns(f);
            }
            Self::IsNull { expr, .. } => expr.visit_columns(f),
            Self::Compare { left, right, .. }
            | Self::Like {
                expr: left,
                pattern: right,
                ..
            }
            | Self::And(left, right)
            | Self::Or(left, right) => {
                left.visit_columns(f);
                right.visit_columns(f);
            }
            Self::Between {
                expr, low, high, ..
            } => {
                expr.visit_columns(f);
                low.visit_columns(f);
                high.visit_columns(f);
            }
            Self::InList { expr, list, .. } => {
                expr.visit_columns(f);
                for item in list {
                    item.visit_columns(f);
                }
            }
        }
    }

    /// Wrap every reference to `field` in `CAST(field AS FLOAT)`.
    ///
    /// References already under a cast are left alone.
    #[must_use]
    pub fn cast_column(&self, field: &str) -> Self {
        let recur = |e: &Self| Box::new(e.cast_column(field));
        match self {
            Self::Column(name) if name.eq_ignore_ascii_case(field) => {
                self.clone().cast(CastType::Float)
            }
            Self::Literal(_) | Self::Column(_) | Self::Cast { .. } => self.clone(),
            Self::Call { func, arg } => Self::Call {
                func: *func,
                arg: recur(arg),
            },
            Self::Compare { left, op, right } => Self::Compare {
                left: recur(left),
                op: *op,
                right: recur(right),
            },
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => Self::Between {
                expr: recur(expr),
                low: recur(low),
                high: recur(high),
                negated: *negated,
            },
            Self::InList {
                expr,
                list,
                negated,
            } => Self::InList {
                expr: recur(expr),
                list: list.iter().map(|e| e.cast_column(field)).collect(),
                negated: *negated,
            },
            Self::IsNull { expr, negated } => Self::IsNull {
                expr: recur(expr),
                negated: *negated,
            },
            Self::Like {
                expr,
                pattern,
                negated,
            } => Self::Like {
                expr: recur(expr),
                pattern: recur(pattern),
                negated: *negated,
            },
            Self::Not(e) => Self::Not(recur(e)),
            Self::And(l, r) => Self::And(recur(l), recur(r)),
            Self::Or(l, r) => Self::Or(recur(l), recur(r)),
        }
    }

    const fn is_boolean_chain(&self) -> bool {
        matches!(self, Self::And(..) | Self::Or(..))
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote a string literal, doubling embedded quotes.
#[must_use]
pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Text(s) => f.write_str(&quote(s)),
            Self::Date(d) => write!(f, "DATE '{}'", d.format("%Y-%m-%d")),
        }
    }
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float => f.write_str("FLOAT"),
            Self::Integer => f.write_str("INTEGER"),
            Self::Varchar(Some(n)) => write!(f, "VARCHAR({n})"),
            Self::Varchar(None) => f.write_str("VARCHAR"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let not = |negated: bool| if negated { "NOT " } else { "" };
        match self {
            Self::Literal(lit) => lit.fmt(f),
            Self::Column(name) if is_plain_identifier(name) => f.write_str(name),
            Self::Column(name) => write!(f, "\"{}\"", name.replace('"', "\"\"")),
            Self::Cast { expr, to } => write!(f, "CAST({expr} AS {to})"),
            Self::Call { func, arg } => match func {
                Func::Lower => write!(f, "lower({arg})"),
                Func::Upper => write!(f, "upper({arg})"),
            },
            Self::Compare { .. } if self.is_tautology() => f.write_str("1=1"),
            Self::Compare { left, op, right } => write!(f, "{left} {} {right}", op.symbol()),
            Self::Between {
                expr,
                low,
                high,
                negated,
            } => write!(f, "{expr} {}BETWEEN {low} AND {high}", not(*negated)),
            Self::InList {
                expr,
                list,
                negated,
            } => {
                write!(f, "{expr} {}IN (", not(*negated))?;
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt(f)?;
                }
                f.write_str(")")
            }
            Self::IsNull { expr, negated } => write!(f, "{expr} IS {}NULL", not(*negated)),
            Self::Like {
                expr,
                pattern,
                negated,
            } => write!(f, "{expr} {}LIKE {pattern}", not(*negated)),
            Self::Not(inner) if inner.is_boolean_chain() => write!(f, "NOT ({inner})"),
            Self::Not(inner) => write!(f, "NOT {inner}"),
            Self::And(l, r) => {
                let side = |e: &Self| {
                    if matches!(e, Self::Or(..)) {
                        format!("({e})")
                    } else {
                        e.to_string()
                    }
                };
                write!(f, "{} AND {}", side(l), side(r))
            }
            Self::Or(l, r) => write!(f, "{l} OR {r}"),
        }
    }
}

/// Rendering target for a composed predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Local evaluation against loaded features; never casts.
    #[default]
    Client,
    /// Remote feature service; number-like fields are cast to `FLOAT`.
    Server,
}

/// One conjunct of a [`WhereClause`].
#[derive(Debug, Clone, PartialEq)]
pub struct Conjunct {
    /// The fragment
    pub expr: Expr,
    /// Field whose references are cast in the server dialect
    pub numeric_cast: Option<String>,
}

/// Conjunction of fragments, rendered per dialect.
///
/// Empty renders as `1=1`. Otherwise each fragment is parenthesized and the
/// fragments are joined with `AND` in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WhereClause {
    parts: Vec<Conjunct>,
}

impl WhereClause {
    /// The empty (always true) clause.
    #[must_use]
    pub const fn all() -> Self {
        Self { parts: Vec::new() }
    }

    /// Append a fragment.
    pub fn push(&mut self, expr: Expr, numeric_cast: Option<String>) {
        self.parts.push(Conjunct { expr, numeric_cast });
    }

    /// Builder form of [`WhereClause::push`].
    #[must_use]
    pub fn with(mut self, expr: Expr, numeric_cast: Option<String>) -> Self {
        self.push(expr, numeric_cast);
        self
    }

    /// No fragments.
    #[must_use]
    pub fn is_all(&self) -> bool {
        self.parts.is_empty()
    }

    /// The fragments in order.
    #[must_use]
    pub fn parts(&self) -> &[Conjunct] {
        &self.parts
    }

    /// Render as SQL text.
    #[must_use]
    pub fn render(&self, dialect: Dialect) -> String {
        if self.parts.is_empty() {
            return "1=1".to_string();
        }
        self.parts
            .iter()
            .map(|part| match (&part.numeric_cast, dialect) {
                (Some(field), Dialect::Server) => format!("({})", part.expr.cast_column(field)),
                _ => format!("({})", part.expr),
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Client-side evaluation; true only when every fragment is true.
    #[must_use]
    pub fn matches(&self, feature: &crate::model::Feature) -> bool {
        self.parts.iter().all(|part| part.expr.matches(feature))
    }
}
