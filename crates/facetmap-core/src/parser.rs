//! PEG grammar for predicate text.

use crate::predicate::{CastType, CmpOp, Expr, Func, Literal, PredicateError};
use chrono::NaiveDate;

peg::parser! {
    grammar sql() for str {
        rule _ = quiet!{[' ' | '\t' | '\n' | '\r']*}

        rule word() -> &'input str
            = $(['a'..='z' | 'A'..='Z' | '_'] ['a'..='z' | 'A'..='Z' | '0'..='9' | '_']*)

        rule kw(k: &'static str)
            = w:word() {? if w.eq_ignore_ascii_case(k) { Ok(()) } else { Err(k) } }

        pub rule predicate() -> Expr
            = _ e:disjunction() _ { e }

        rule disjunction() -> Expr
            = first:conjunction() rest:(_ kw("OR") _ e:conjunction() { e })* {
                rest.into_iter().fold(first, Expr::or)
            }

        rule conjunction() -> Expr
            = first:negation() rest:(_ kw("AND") _ e:negation() { e })* {
                rest.into_iter().fold(first, Expr::and)
            }

        rule negation() -> Expr
            = kw("NOT") _ e:negation() { Expr::Not(Box::new(e)) }
            / condition()

        rule negated() -> bool
            = kw("NOT") _ { true }
            / { false }

        rule condition() -> Expr
            = e:operand() _ n:negated() kw("BETWEEN") _ low:operand() _ kw("AND") _ high:operand() {
                Expr::Between { expr: Box::new(e), low: Box::new(low), high: Box::new(high), negated: n }
            }
            / e:operand() _ n:negated() kw("IN") _ "(" _ list:(operand() ** (_ "," _)) _ ")" {
                Expr::InList { expr: Box::new(e), list, negated: n }
            }
            / e:operand() _ kw("IS") _ n:negated() kw("NULL") {
                Expr::IsNull { expr: Box::new(e), negated: n }
            }
            / e:operand() _ n:negated() kw("LIKE") _ p:operand() {
                Expr::Like { expr: Box::new(e), pattern: Box::new(p), negated: n }
            }
            / l:operand() _ op:cmp_op() _ r:operand() {
                Expr::Compare { left: Box::new(l), op, right: Box::new(r) }
            }
            / "(" _ e:disjunction() _ ")" { e }

        rule cmp_op() -> CmpOp
            = ">=" { CmpOp::GtEq }
            / "<=" { CmpOp::LtEq }
            / "<>" { CmpOp::NotEq }
            / "!=" { CmpOp::NotEq }
            / "=" { CmpOp::Eq }
            / "<" { CmpOp::Lt }
            / ">" { CmpOp::Gt }

        rule operand() -> Expr
            = kw("CAST") _ "(" _ e:operand() _ kw("AS") _ to:cast_type() _ ")" {
                Expr::Cast { expr: Box::new(e), to }
            }
            / func:func() _ "(" _ arg:operand() _ ")" { Expr::Call { func, arg: Box::new(arg) } }
            / kw("DATE") _ s:string() {?
                NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                    .map(Expr::date)
                    .map_err(|_| "date literal")
            }
            / kw("NULL") { Expr::Literal(Literal::Null) }
            / n:number() { Expr::num(n) }
            / s:string() { Expr::text(s) }
            / name:identifier() { Expr::Column(name) }

        rule func() -> Func
            = kw("LOWER") { Func::Lower }
            / kw("UPPER") { Func::Upper }

        rule cast_type() -> CastType
            = (kw("FLOAT") / kw("DOUBLE") / kw("REAL")) { CastType::Float }
            / (kw("INTEGER") / kw("INT")) { CastType::Integer }
            / kw("VARCHAR") len:(_ "(" _ n:$(['0'..='9']+) _ ")" {? n.parse::<u32>().map_err(|_| "length") })? {
                CastType::Varchar(len)
            }

        rule number() -> f64
            = n:$("-"? ['0'..='9']+ ("." ['0'..='9']*)? (['e' | 'E'] ['+' | '-']? ['0'..='9']+)?) {?
                n.parse().map_err(|_| "number")
            }

        rule string() -> String
            = "'" s:$(([^ '\''] / "''")*) "'" { s.replace("''", "'") }

        rule identifier() -> String
            = w:word() { w.to_string() }
            / "\"" s:$(([^ '"'] / "\"\"")*) "\"" { s.replace("\"\"", "\"") }
    }
}

/// Parse predicate text into an expression tree.
///
/// Keywords are case-insensitive; identifiers may be double-quoted.
pub fn parse(input: &str) -> Result<Expr, PredicateError> {
    sql::predicate(input).map_err(|e| PredicateError::Syntax {
        offset: e.location.offset,
        expected: e.expected.to_string(),
    })
}
