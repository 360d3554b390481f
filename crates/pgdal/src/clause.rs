//! WHERE / ORDER BY / LIMIT / OFFSET clause assembly.
//!
//! A [`Filter`] is either raw SQL fragments or a structured column → value map
//! resolved through the [`comparator`](crate::comparator) DSL. Raw fragments, when
//! any non-empty one is present, win over the structured values; the values are
//! then still bound by name so fragments can reference them as `:column`.

use crate::columns::ColumnValues;
use crate::comparator::{Comparator, Operator, render_literal, resolve_keyed, split_sign};
use crate::error::{DalError, OperationResult};
use crate::ident;
use crate::statement::Statement;
use crate::value::Value;
use std::fmt;
use std::num::NonZeroU64;

/// How structured filter operands reach the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterBinding {
    /// Bind every operand as a placeholder (`id <> :__f0`).
    #[default]
    Parameterized,
    /// Splice the rendered literal into the SQL text (`id <> 5`).
    ///
    /// The caller is responsible for every value that reaches this path.
    Inline,
}

/// Logical joiner between filter conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

impl fmt::Display for Combinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Conditions of a WHERE clause.
///
/// # Example
/// ```ignore
/// use pgdal::{Filter, values};
///
/// // status = 'active' AND age >= 18
/// let f = Filter::by(values! { "status" => "active", "age" => ">=18" });
///
/// // raw fragments joined by OR, with a named value
/// let f = Filter::raw_all(["id = :id", "owner_id = :id"]).or().with("id", 7);
/// ```
const KEY_PLACEHOLDER: &str = "__key";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    raw: Vec<String>,
    values: ColumnValues,
    combinator: Combinator,
}

impl Filter {
    /// A filter that matches everything (no WHERE clause).
    pub fn new() -> Self {
        Self::default()
    }

    /// A single raw fragment, used verbatim (without the `WHERE` keyword).
    pub fn raw(fragment: impl Into<String>) -> Self {
        Self {
            raw: vec![fragment.into()],
            ..Self::default()
        }
    }

    /// Several raw fragments joined by the combinator. Empty entries are dropped.
    pub fn raw_all<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            raw: fragments.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Exact equality on `column`, with `value` bound as is.
    ///
    /// The value never goes through sign parsing, so `"!abc"` matches the text
    /// `!abc`. `column` is spliced verbatim and must already be a checked identifier.
    pub fn key(column: &str, value: impl Into<Value>) -> Self {
        Self::raw(format!("{column} = :{KEY_PLACEHOLDER}")).with(KEY_PLACEHOLDER, value)
    }

    /// A structured filter over `values`.
    pub fn by(values: ColumnValues) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    /// Add one structured entry (or named value, for raw fragments).
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column, value);
        self
    }

    pub fn combinator(mut self, combinator: Combinator) -> Self {
        self.combinator = combinator;
        self
    }

    /// Join conditions with `OR`.
    pub fn or(self) -> Self {
        self.combinator(Combinator::Or)
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn joiner(&self) -> Combinator {
        self.combinator
    }

    /// Raw fragments that survive empty-entry filtering.
    pub fn raw_fragments(&self) -> impl Iterator<Item = &str> {
        self.raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty())
    }

    pub fn has_raw(&self) -> bool {
        self.raw_fragments().next().is_some()
    }

    /// True when neither raw fragments nor structured values are present.
    pub fn is_empty(&self) -> bool {
        !self.has_raw() && self.values.is_empty()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    /// Parse `asc` / `desc` (any case). An empty string means `ASC`.
    pub fn parse(s: &str) -> OperationResult<Self> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("asc") {
            Ok(Direction::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Direction::Desc)
        } else {
            Err(DalError::validation(format!("invalid sort direction '{s}'")))
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Terms of an ORDER BY clause.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Order {
    terms: Vec<(String, Direction)>,
}

impl Order {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(mut self, column: impl Into<String>, direction: Direction) -> Self {
        self.terms.push((column.into(), direction));
        self
    }

    pub fn asc(self, column: impl Into<String>) -> Self {
        self.by(column, Direction::Asc)
    }

    pub fn desc(self, column: impl Into<String>) -> Self {
        self.by(column, Direction::Desc)
    }

    /// Build from `(column, direction)` string pairs, e.g. `[("date", "DESC"), ("id", "")]`.
    pub fn parse<I, C, D>(pairs: I) -> OperationResult<Self>
    where
        I: IntoIterator<Item = (C, D)>,
        C: Into<String>,
        D: AsRef<str>,
    {
        pairs.into_iter().try_fold(Self::new(), |order, (column, dir)| {
            Ok(order.by(column, Direction::parse(dir.as_ref())?))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[(String, Direction)] {
        &self.terms
    }
}

/// Row limit of a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Limit {
    #[default]
    All,
    Rows(NonZeroU64),
}

impl Limit {
    /// `0` means no limit.
    pub fn rows(n: u64) -> Self {
        NonZeroU64::new(n).map_or(Limit::All, Limit::Rows)
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::All => f.write_str("ALL"),
            Limit::Rows(n) => write!(f, "{n}"),
        }
    }
}

/// LIMIT / OFFSET window. Only applied together with an [`Order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Page {
    pub limit: Limit,
    pub offset: u64,
}

impl Page {
    pub fn new(limit: Limit, offset: u64) -> Self {
        Self { limit, offset }
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Limit::rows(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = n;
        self
    }
}

/// Everything a SELECT can be narrowed by.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOptions {
    pub filter: Filter,
    pub order: Order,
    pub page: Page,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.page = self.page.limit(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.page = self.page.offset(n);
        self
    }
}

/// Append `<column> <op> <operand>` for one resolved comparator.
pub(crate) fn push_condition(
    stmt: &mut Statement,
    column: &str,
    comparator: Comparator,
    binding: FilterBinding,
) {
    if comparator.operand.is_null() {
        match comparator.operator {
            Operator::Eq => {
                stmt.push(column).push(" IS NULL");
                return;
            }
            Operator::Ne => {
                stmt.push(column).push(" IS NOT NULL");
                return;
            }
            _ => {}
        }
    }

    stmt.push(column).push(" ").push(comparator.operator.as_sql()).push(" ");
    match binding {
        FilterBinding::Inline => {
            stmt.push(&render_literal(&comparator.operand));
        }
        FilterBinding::Parameterized => {
            stmt.push_generated(comparator.operand);
        }
    }
}

/// Append ` WHERE …` for `filter`, if it has any condition.
pub(crate) fn push_where(
    stmt: &mut Statement,
    filter: &Filter,
    binding: FilterBinding,
) -> OperationResult<()> {
    if filter.is_empty() {
        return Ok(());
    }

    let joiner = format!(" {} ", filter.combinator);
    stmt.push(" WHERE ");

    if filter.has_raw() {
        for (i, fragment) in filter.raw_fragments().enumerate() {
            if i > 0 {
                stmt.push(&joiner);
            }
            stmt.push(fragment);
        }
        for (name, value) in filter.values.iter() {
            let name = name.trim_start_matches(':');
            if split_sign(name).is_some() {
                return Err(DalError::validation(format!(
                    "sign prefix on '{name}' cannot be used with raw filter fragments"
                )));
            }
            stmt.bind_if_absent(name, value.clone());
        }
        return Ok(());
    }

    for (i, (key, value)) in filter.values.iter().enumerate() {
        let (column, comparator) = resolve_keyed(key, value);
        ident::column(column)?;
        if i > 0 {
            stmt.push(&joiner);
        }
        push_condition(stmt, column, comparator, binding);
    }
    Ok(())
}

/// Append ` ORDER BY …`. Returns whether anything was written.
pub(crate) fn push_order(stmt: &mut Statement, order: &Order) -> OperationResult<bool> {
    if order.is_empty() {
        return Ok(false);
    }

    stmt.push(" ORDER BY ");
    for (i, (column, direction)) in order.terms.iter().enumerate() {
        ident::column(column)?;
        if i > 0 {
            stmt.push(", ");
        }
        stmt.push(column).push(" ").push(direction.as_sql());
    }
    Ok(true)
}

/// Append ` LIMIT … OFFSET …`.
pub(crate) fn push_page(stmt: &mut Statement, page: &Page) {
    stmt.push(&format!(" LIMIT {} OFFSET {}", page.limit, page.offset));
}
