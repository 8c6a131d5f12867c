//! Schema inference for imported tables
//!
//! Every raw value is classified as INTEGER, REAL or TEXT. A column's type is
//! the maximum over all of its observed values, so it only ever widens.

use std::fmt;

/// SQL column type, ordered `Integer < Real < Text`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    /// Classify a single raw value
    pub fn infer(value: &str) -> Self {
        let value = value.trim();
        if value.parse::<i64>().is_ok() {
            ColumnType::Integer
        } else if value.parse::<f64>().is_ok() {
            ColumnType::Real
        } else {
            ColumnType::Text
        }
    }

    /// Merge two column types (their maximum)
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    /// Infer the merged type of a sequence of values; `None` if it is empty
    pub fn infer_all<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        values.into_iter().map(Self::infer).reduce(Self::merge)
    }

    /// SQL keyword for this type
    pub fn as_sql(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Ordered column list of a table under construction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSchema {
    columns: Vec<(String, Option<ColumnType>)>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one value for a column, adding the column on first sight
    pub fn observe(&mut self, column: &str, value: &str) {
        let ty = ColumnType::infer(value);
        match self.columns.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = Some(existing.map_or(ty, |e| e.merge(ty))),
            None => self.columns.push((column.to_string(), Some(ty))),
        }
    }

    /// Record a column without a value (e.g. a JSON `null`)
    ///
    /// A column that never sees a value is typed TEXT.
    pub fn declare(&mut self, column: &str) {
        if !self.columns.iter().any(|(name, _)| name == column) {
            self.columns.push((column.to_string(), None));
        }
    }

    pub fn columns(&self) -> Vec<(String, ColumnType)> {
        self.columns
            .iter()
            .map(|(name, ty)| (name.clone(), ty.unwrap_or(ColumnType::Text)))
            .collect()
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, ty)| ty.unwrap_or(ColumnType::Text))
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}
