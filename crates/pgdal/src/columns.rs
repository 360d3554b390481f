//! Ordered column → value maps.

use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};

/// An ordered mapping of column names to values.
///
/// Used both as statement input (the columns of an INSERT/UPDATE, the entries of a
/// structured filter, the bindings of a raw query) and as the normalized shape of a
/// result row ([`Record`]). Names are unique: inserting an existing name replaces
/// its value in place, so iteration order is insertion order of first appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnValues {
    entries: Vec<(String, Value)>,
}

/// One normalized result row.
pub type Record = ColumnValues;

impl ColumnValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chainable insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Insert or replace a column value, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let column = column.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((column, value));
                None
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        let idx = self.entries.iter().position(|(name, _)| name == column)?;
        Some(self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(_, v)| v)
    }

    /// Split into index-aligned column and value sequences.
    pub fn split(&self) -> (Vec<&str>, Vec<&Value>) {
        self.iter().unzip()
    }

    /// Pair `names` with `values` positionally.
    ///
    /// Returns `None` when the lengths differ.
    pub fn zip<S, V>(names: &[S], values: impl IntoIterator<Item = V>) -> Option<Self>
    where
        S: AsRef<str>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.len() != names.len() {
            return None;
        }
        Some(
            names
                .iter()
                .zip(values)
                .map(|(n, v)| (n.as_ref().to_string(), v))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ColumnValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = Self::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

impl IntoIterator for ColumnValues {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for ColumnValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Build a [`ColumnValues`] inline.
///
/// ```ignore
/// let data = pgdal::values! { "name" => "alice", "age" => 30 };
/// ```
#[macro_export]
macro_rules! values {
    () => { $crate::ColumnValues::new() };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut __pgdal_values = $crate::ColumnValues::new();
        $( __pgdal_values.insert($column, $value); )+
        __pgdal_values
    }};
}
