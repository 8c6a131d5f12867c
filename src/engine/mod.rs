//! Relational query engine
//!
//! Directives hand SQL text to a [`QueryEngine`] and get rows back. The
//! engine also owns table creation and row insertion for imported data.
//!
//! - [`SqliteEngine`]: bundled SQLite, in-memory or file-backed

mod error;
mod sqlite;

pub use error::{EngineError, EngineResult};
pub use sqlite::{SqliteEngine, IN_MEMORY};

use crate::import::ColumnType;
use std::fmt;
use std::rc::Rc;

/// A single value returned by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    /// Numeric view of the value; text is parsed, NULL has none
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Null => None,
            SqlValue::Integer(i) => Some(*i as f64),
            SqlValue::Real(f) => Some(*f),
            SqlValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Whether the engine typed this value as a number
    pub fn is_numeric(&self) -> bool {
        matches!(self, SqlValue::Integer(_) | SqlValue::Real(_))
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(i) => write!(f, "{}", i),
            SqlValue::Real(r) => write!(f, "{:?}", r),
            SqlValue::Text(s) => f.write_str(s),
        }
    }
}

/// One result row with values addressable by column name
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Rc<[String]>,
    values: Vec<SqlValue>,
}

impl Row {
    pub fn new(columns: Rc<[String]>, values: Vec<SqlValue>) -> Self {
        Self { columns, values }
    }

    /// Value of the first column with the given name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|idx| self.values.get(idx))
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

/// A relational engine that accepts SQL text and returns rows
pub trait QueryEngine {
    /// Run a query and collect every row it returns
    fn query(&self, sql: &str) -> EngineResult<Vec<Row>>;

    /// Create a table unless one with that name already exists
    fn create_table(&mut self, table: &str, columns: &[(String, ColumnType)]) -> EngineResult<()>;

    /// Insert rows (values in `columns` order); returns the number inserted
    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> EngineResult<usize>;
}

/// Quote an SQL identifier: `a"b` -> `"a""b"`
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote an SQL string literal: `it's` -> `'it''s'`
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
