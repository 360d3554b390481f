//! Comparator resolution for structured filters.
//!
//! A filter value may carry a sign prefix that selects the comparison operator:
//!
//! | Prefix | Operator   | Operand                    |
//! |--------|------------|----------------------------|
//! | none   | `=`        | value as is                |
//! | `!`    | `<>`       | strip 1                    |
//! | `!=`   | `<>`       | strip 2                    |
//! | `!%`   | `NOT LIKE` | strip 2, wrapped in `%…%`  |
//! | `<`    | `<`        | strip 1                    |
//! | `<=`   | `<=`       | strip 2                    |
//! | `>`    | `>`        | strip 1                    |
//! | `>=`   | `>=`       | strip 2                    |
//! | `%`    | `LIKE`     | strip 1, wrapped in `%…%`  |
//!
//! Only text values are sign-parsed. Integers, floats and booleans always compare
//! with `=` against their native literal.
//!
//! # Example
//! ```ignore
//! use pgdal::comparator::resolve;
//!
//! let c = resolve(&"<=10".into());
//! assert_eq!(c.operator.as_sql(), "<=");
//! assert_eq!(c.literal(), "'10'");
//! ```

use crate::value::Value;
use std::fmt;

/// Comparison operator produced by a sign prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
    NotLike,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
        }
    }

    fn is_pattern(self) -> bool {
        matches!(self, Operator::Like | Operator::NotLike)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A resolved `{operator, operand}` pair for one filter value.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparator {
    pub operator: Operator,
    /// The value after the sign was stripped (and `%…%` applied for patterns).
    pub operand: Value,
}

impl Comparator {
    /// The operand rendered as a SQL literal.
    pub fn literal(&self) -> String {
        render_literal(&self.operand)
    }
}

/// Split a sign token off the front of `s`.
pub fn split_sign(s: &str) -> Option<(Operator, &str)> {
    let mut chars = s.chars();
    let first = chars.next()?;
    let second = chars.next();

    let (operator, len) = match (first, second) {
        ('!', Some('%')) => (Operator::NotLike, 2),
        ('!', Some('=')) => (Operator::Ne, 2),
        ('!', _) => (Operator::Ne, 1),
        ('<', Some('=')) => (Operator::Lte, 2),
        ('<', _) => (Operator::Lt, 1),
        ('>', Some('=')) => (Operator::Gte, 2),
        ('>', _) => (Operator::Gt, 1),
        ('%', _) => (Operator::Like, 1),
        _ => return None,
    };
    Some((operator, &s[len..]))
}

fn wrap_pattern(s: &str) -> String {
    format!("%{s}%")
}

/// Resolve one filter value.
pub fn resolve(value: &Value) -> Comparator {
    let Value::Text(text) = value else {
        return Comparator {
            operator: Operator::Eq,
            operand: value.clone(),
        };
    };

    match split_sign(text) {
        Some((operator, rest)) => Comparator {
            operator,
            operand: if operator.is_pattern() {
                Value::Text(wrap_pattern(rest))
            } else {
                Value::Text(rest.to_string())
            },
        },
        None => Comparator {
            operator: Operator::Eq,
            operand: value.clone(),
        },
    }
}

/// Resolve a filter entry whose sign may sit on the column key instead of the value.
///
/// `("!id", 5)` yields column `id` compared with `<> 5`. A signed key takes
/// precedence and the value is used without sign parsing; pattern operators wrap the
/// value's text form in `%…%`.
pub fn resolve_keyed<'a>(key: &'a str, value: &Value) -> (&'a str, Comparator) {
    let Some((operator, column)) = split_sign(key) else {
        return (key, resolve(value));
    };

    let operand = if operator.is_pattern() {
        match value {
            Value::Null => Value::Null,
            other => Value::Text(wrap_pattern(&other.to_string())),
        }
    } else {
        value.clone()
    };
    (column, Comparator { operator, operand })
}

/// Render a value as an inline SQL literal.
///
/// Floats, integers and booleans are unquoted; everything else is single-quoted
/// with embedded quotes doubled.
pub fn render_literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(x) if x.is_finite() => format!("{x:?}"),
        Value::Float(x) => quote(&x.to_string()),
        Value::Text(s) => quote(s),
        Value::Json(j) => quote(&j.to_string()),
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for ch in s.chars() {
        if ch == '\'' {
            out.push('\'');
        }
        out.push(ch);
    }
    out.push('\'');
    out
}
