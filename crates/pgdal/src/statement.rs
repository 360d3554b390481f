//! Statement construction with named placeholders.
//!
//! Every builder here produces a [`Statement`]: SQL text using `:name`
//! placeholders plus the values bound to those names. The
//! [`placeholders`](crate::placeholders) module turns that into the positional
//! `$1, $2, ...` form the driver expects.
//!
//! ```ignore
//! use pgdal::{statement, values};
//!
//! let stmt = statement::insert("users", &values! { "name" => "a", "age" => 3 })?;
//! assert_eq!(stmt.sql(), "INSERT INTO users (name, age) VALUES (:name, :age)");
//! ```

use crate::clause::{self, FetchOptions, Filter, FilterBinding};
use crate::columns::ColumnValues;
use crate::comparator::resolve_keyed;
use crate::error::{DalError, OperationResult};
use crate::ident;
use crate::value::Value;

/// SQL text with named placeholders and their bound values.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use]
pub struct Statement {
    sql: String,
    binds: Vec<(String, Value)>,
    generated: usize,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            ..Self::default()
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn binds(&self) -> &[(String, Value)] {
        &self.binds
    }

    pub fn bound(&self, name: &str) -> Option<&Value> {
        self.binds.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Append raw SQL.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Bind `value` to `:name`, replacing an earlier binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let name = name.into();
        let value = value.into();
        match self.binds.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.binds.push((name, value)),
        }
        self
    }

    /// Bind `value` to `:name` unless that name is already bound.
    pub fn bind_if_absent(&mut self, name: &str, value: Value) -> &mut Self {
        if self.bound(name).is_some() {
            tracing::debug!(target: "pgdal", name, "keeping earlier binding for placeholder");
        } else {
            self.binds.push((name.to_string(), value));
        }
        self
    }

    /// Append `:name` and bind `value` to it.
    pub fn push_placeholder(&mut self, name: &str, value: Value) -> &mut Self {
        self.sql.push(':');
        self.sql.push_str(name);
        self.bind(name, value)
    }

    /// Append a placeholder with a generated name (`:__f0`, `:__f1`, ...).
    pub(crate) fn push_generated(&mut self, value: Value) -> &mut Self {
        let name = format!("__f{}", self.generated);
        self.generated += 1;
        self.push_placeholder(&name, value)
    }

    /// Append ` RETURNING <columns>`.
    pub fn returning(&mut self, columns: &str) -> &mut Self {
        self.push(" RETURNING ").push(columns)
    }
}

/// Placeholder name for the `idx`-th written column.
fn placeholder_for(column: &str, idx: usize) -> String {
    if ident::is_placeholder_safe(column) {
        column.to_string()
    } else {
        format!("__c{idx}")
    }
}

/// `INSERT INTO <table> (<cols>) VALUES (:<col>, ...)`
pub fn insert(table: &str, values: &ColumnValues) -> OperationResult<Statement> {
    ident::table(table)?;
    if values.is_empty() {
        return Err(DalError::empty_input(format!(
            "no column values supplied for insert into {table}"
        )));
    }

    let (columns, vals) = values.split();
    for column in &columns {
        ident::column(column)?;
    }

    let mut stmt = Statement::new(format!("INSERT INTO {} ({}) VALUES (", table, columns.join(", ")));
    for (idx, (column, value)) in columns.iter().zip(vals).enumerate() {
        if idx > 0 {
            stmt.push(", ");
        }
        stmt.push_placeholder(&placeholder_for(column, idx), value.clone());
    }
    stmt.push(")");
    Ok(stmt)
}

/// `UPDATE <table> SET <col>=:<col>, ... [WHERE ...] RETURNING *`
pub fn update(
    table: &str,
    values: &ColumnValues,
    filter: &Filter,
    binding: FilterBinding,
) -> OperationResult<Statement> {
    ident::table(table)?;
    if values.is_empty() {
        return Err(DalError::empty_input(format!(
            "no column values supplied for update of {table}"
        )));
    }

    let mut stmt = Statement::new(format!("UPDATE {table} SET "));
    for (idx, (column, value)) in values.iter().enumerate() {
        ident::column(column)?;
        if idx > 0 {
            stmt.push(", ");
        }
        stmt.push(column).push("=");
        stmt.push_placeholder(&placeholder_for(column, idx), value.clone());
    }

    if filter.is_empty() {
        tracing::debug!(target: "pgdal", table, "update without filter touches every row");
    }
    clause::push_where(&mut stmt, filter, binding)?;
    stmt.returning("*");
    Ok(stmt)
}

/// `SELECT <cols|*> FROM <table> [WHERE ...] [ORDER BY ... LIMIT ... OFFSET ...]`
pub fn select<S: AsRef<str>>(
    table: &str,
    columns: &[S],
    options: &FetchOptions,
    binding: FilterBinding,
) -> OperationResult<Statement> {
    ident::table(table)?;

    let select_list = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| ident::select_item(c.as_ref()))
            .collect::<OperationResult<Vec<_>>>()?
            .join(", ")
    };

    let mut stmt = Statement::new(format!("SELECT {select_list} FROM {table}"));
    clause::push_where(&mut stmt, &options.filter, binding)?;
    if clause::push_order(&mut stmt, &options.order)? {
        clause::push_page(&mut stmt, &options.page);
    } else if options.page != Default::default() {
        tracing::debug!(target: "pgdal", table, "pagination ignored without ORDER BY");
    }
    Ok(stmt)
}

/// `DELETE FROM <table> WHERE <field> <op> <operand>`
pub fn delete(
    table: &str,
    field: &str,
    value: &Value,
    binding: FilterBinding,
) -> OperationResult<Statement> {
    ident::table(table)?;
    let (column, comparator) = resolve_keyed(field, value);
    ident::column(column)?;

    let mut stmt = Statement::new(format!("DELETE FROM {table} WHERE "));
    clause::push_condition(&mut stmt, column, comparator, binding);
    Ok(stmt)
}

/// Options of `TRUNCATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Truncate {
    /// `RESTART IDENTITY` (otherwise `CONTINUE IDENTITY`)
    pub restart_identity: bool,
    /// `CASCADE` (otherwise `RESTRICT`)
    pub cascade: bool,
}

impl Default for Truncate {
    fn default() -> Self {
        Self {
            restart_identity: true,
            cascade: true,
        }
    }
}

impl Truncate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn restart_identity(mut self, yes: bool) -> Self {
        self.restart_identity = yes;
        self
    }

    pub fn cascade(mut self, yes: bool) -> Self {
        self.cascade = yes;
        self
    }
}

/// `TRUNCATE <table> RESTART|CONTINUE IDENTITY CASCADE|RESTRICT`
pub fn truncate(table: &str, options: Truncate) -> OperationResult<Statement> {
    ident::table(table)?;
    Ok(Statement::new(format!(
        "TRUNCATE {} {} {}",
        table,
        if options.restart_identity {
            "RESTART IDENTITY"
        } else {
            "CONTINUE IDENTITY"
        },
        if options.cascade { "CASCADE" } else { "RESTRICT" },
    )))
}

/// Caller SQL with every entry of `values` bound by name.
///
/// Names may be given with or without the leading `:`.
pub fn raw(sql: &str, values: &ColumnValues) -> Statement {
    let mut stmt = Statement::new(sql);
    for (name, value) in values.iter() {
        stmt.bind(name.trim_start_matches(':'), value.clone());
    }
    stmt
}
