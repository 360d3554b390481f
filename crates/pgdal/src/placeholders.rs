//! Named placeholder compilation (`:name` → `$n`).
//!
//! Postgres only understands positional parameters. The scanner rewrites each
//! `:name` outside of string literals, quoted identifiers, dollar-quoted bodies and
//! comments into `$n`, reusing one slot per distinct name. `::type` casts are left
//! alone.

use crate::error::{DalError, OperationResult};
use crate::statement::Statement;
use crate::value::Value;

/// A statement in driver form.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// SQL with `$1, $2, ...`
    pub sql: String,
    /// Values in parameter order.
    pub params: Vec<Value>,
    /// Placeholder names in parameter order.
    pub names: Vec<String>,
}

fn is_ident_start(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphabetic()
}

fn is_ident_char(b: u8) -> bool {
    b == b'_' || b.is_ascii_alphanumeric()
}

/// End of a `'...'` / `"..."` section starting at `start`, with doubled-quote escapes.
fn skip_quoted(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// End of a `$tag$...$tag$` body starting at `start`, or `None` if `start` is not
/// a dollar-quote opener.
fn skip_dollar_quoted(sql: &str, start: usize) -> Option<usize> {
    let bytes = sql.as_bytes();
    let mut i = start + 1;
    if i < bytes.len() && !is_ident_start(bytes[i]) && bytes[i] != b'$' {
        return None;
    }
    while i < bytes.len() && is_ident_char(bytes[i]) {
        i += 1;
    }
    if bytes.get(i) != Some(&b'$') {
        return None;
    }
    let tag = &sql[start..=i];
    let body = i + 1;
    Some(sql[body..].find(tag).map_or(sql.len(), |pos| body + pos + tag.len()))
}

/// Rewrite named placeholders and collect their values.
pub fn compile(stmt: &Statement) -> OperationResult<Compiled> {
    let sql = stmt.sql();
    let bytes = sql.as_bytes();
    let mut out = String::with_capacity(sql.len());
    let mut names: Vec<String> = Vec::new();
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' | b'"' => i = skip_quoted(bytes, i, bytes[i]),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = sql[i..].find('\n').map_or(bytes.len(), |pos| i + pos + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = sql[i + 2..].find("*/").map_or(bytes.len(), |pos| i + 2 + pos + 2);
            }
            b'$' => i = skip_dollar_quoted(sql, i).unwrap_or(i + 1),
            b':' if bytes.get(i + 1) == Some(&b':') => i += 2,
            b':' if bytes.get(i + 1).copied().is_some_and(is_ident_start) => {
                let start = i + 1;
                let mut end = start;
                while end < bytes.len() && is_ident_char(bytes[end]) {
                    end += 1;
                }
                let name = &sql[start..end];
                let slot = match names.iter().position(|n| n == name) {
                    Some(pos) => pos + 1,
                    None => {
                        names.push(name.to_string());
                        names.len()
                    }
                };
                out.push_str(&sql[last..i]);
                out.push('$');
                out.push_str(&slot.to_string());
                i = end;
                last = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&sql[last..]);

    let params = names
        .iter()
        .map(|name| {
            stmt.bound(name)
                .cloned()
                .ok_or_else(|| DalError::bind(format!("no value bound for placeholder :{name}")))
        })
        .collect::<OperationResult<Vec<_>>>()?;

    for (name, _) in stmt.binds() {
        if !names.contains(name) {
            tracing::trace!(target: "pgdal", name = %name, "binding not referenced by statement");
        }
    }

    Ok(Compiled {
        sql: out,
        params,
        names,
    })
}
