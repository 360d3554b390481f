//! SQL identifier checks.
//!
//! Table and column names are spliced into statement text (Postgres cannot bind
//! identifiers), so every name that reaches a statement passes through here first.
//!
//! - Unquoted segments must match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted segments (`"CamelCase"`) allow anything except NUL, with `""` as the escape
//! - Segments are joined with `.` (`schema.table`, `table.column`)

use crate::error::{DalError, OperationResult};

/// What a name is used as, for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentKind {
    Table,
    Column,
}

impl IdentKind {
    fn label(self) -> &'static str {
        match self {
            IdentKind::Table => "table",
            IdentKind::Column => "column",
        }
    }
}

fn invalid(kind: IdentKind, name: &str, reason: &str) -> DalError {
    DalError::validation(format!("invalid {} name '{}': {}", kind.label(), name, reason))
}

/// Length of a quoted segment starting at `s[0] == '"'`, including both quotes.
fn quoted_len(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            if bytes.get(i + 1) == Some(&b'"') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

fn unquoted_len(s: &str) -> usize {
    s.char_indices()
        .find(|&(i, c)| {
            let ok = if i == 0 {
                c == '_' || c.is_ascii_alphabetic()
            } else {
                c == '_' || c == '$' || c.is_ascii_alphanumeric()
            };
            !ok
        })
        .map_or(s.len(), |(i, _)| i)
}

/// Validate a (possibly dotted, possibly quoted) identifier and return it unchanged.
pub fn check(kind: IdentKind, name: &str) -> OperationResult<&str> {
    if name.is_empty() {
        return Err(invalid(kind, name, "empty"));
    }
    if name.contains('\0') {
        return Err(invalid(kind, name, "contains NUL"));
    }

    let mut rest = name;
    loop {
        let seg_len = if rest.starts_with('"') {
            match quoted_len(rest) {
                Some(2) => return Err(invalid(kind, name, "empty quoted segment")),
                Some(n) => n,
                None => return Err(invalid(kind, name, "unclosed quote")),
            }
        } else {
            match unquoted_len(rest) {
                0 => return Err(invalid(kind, name, "unexpected character")),
                n => n,
            }
        };

        rest = &rest[seg_len..];
        match rest.strip_prefix('.') {
            Some("") => return Err(invalid(kind, name, "trailing '.'")),
            Some(next) => rest = next,
            None if rest.is_empty() => return Ok(name),
            None => return Err(invalid(kind, name, "unexpected character")),
        }
    }
}

pub fn table(name: &str) -> OperationResult<&str> {
    check(IdentKind::Table, name)
}

pub fn column(name: &str) -> OperationResult<&str> {
    check(IdentKind::Column, name)
}

/// Validate one entry of a SELECT list: `*`, `<ident>.*`, or an identifier.
pub fn select_item(item: &str) -> OperationResult<&str> {
    let item = item.trim();
    if item == "*" {
        return Ok(item);
    }
    if let Some(prefix) = item.strip_suffix(".*") {
        check(IdentKind::Table, prefix)?;
        return Ok(item);
    }
    column(item)
}

/// Whether `name` can be used verbatim as a `:name` placeholder.
pub fn is_placeholder_safe(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
