//! SQLite-backed query engine
//!
//! Uses the bundled SQLite build, either in memory (`:memory:`, the default)
//! or on disk so imported tables can be reused between runs.

use super::error::{EngineError, EngineResult};
use super::{quote_identifier, QueryEngine, Row, SqlValue};
use crate::import::ColumnType;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::rc::Rc;

/// Path that selects a private in-memory database
pub const IN_MEMORY: &str = ":memory:";

/// SQLite query engine
pub struct SqliteEngine {
    conn: Connection,
    path: String,
}

impl SqliteEngine {
    /// Open (or create) a database; `:memory:` opens a private in-memory one
    pub fn open(path: &str) -> EngineResult<Self> {
        let open_err = |source| EngineError::Open {
            path: path.to_string(),
            source,
        };

        let conn = if path == IN_MEMORY {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(open_err)?;

        register_functions(&conn).map_err(open_err)?;

        tracing::debug!(database = %path, "Opened SQLite database");

        Ok(Self {
            conn,
            path: path.to_string(),
        })
    }

    /// Open a private in-memory database
    pub fn in_memory() -> EngineResult<Self> {
        Self::open(IN_MEMORY)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn query_err(sql: &str) -> impl Fn(rusqlite::Error) -> EngineError + '_ {
        move |source| {
            tracing::error!(query = %sql, error = %source, "Query rejected by SQLite");
            EngineError::Query {
                query: sql.to_string(),
                source,
            }
        }
    }
}

/// Scalar functions available to every directive query
fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    // log(base, x)
    conn.create_scalar_function(
        "log",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let base: f64 = ctx.get(0)?;
            let x: f64 = ctx.get(1)?;
            Ok(x.log(base))
        },
    )
}

impl QueryEngine for SqliteEngine {
    fn query(&self, sql: &str) -> EngineResult<Vec<Row>> {
        tracing::debug!(query = %sql, "Executing query");

        let mut stmt = self.conn.prepare(sql).map_err(Self::query_err(sql))?;
        let columns: Rc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([]).map_err(Self::query_err(sql))?;
        let mut result = Vec::new();

        while let Some(row) = rows.next().map_err(Self::query_err(sql))? {
            let values = (0..columns.len())
                .map(|idx| row.get_ref(idx).map(SqlValue::from))
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(Self::query_err(sql))?;
            result.push(Row::new(Rc::clone(&columns), values));
        }

        Ok(result)
    }

    fn create_table(&mut self, table: &str, columns: &[(String, ColumnType)]) -> EngineResult<()> {
        let column_defs: Vec<String> = columns
            .iter()
            .map(|(name, ty)| format!("{} {}", quote_identifier(name), ty))
            .collect();

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            quote_identifier(table),
            column_defs.join(", ")
        );

        tracing::debug!(query = %sql, "Creating table");
        self.conn
            .execute(&sql, [])
            .map_err(Self::query_err(&sql))?;

        Ok(())
    }

    fn insert_rows(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &[Vec<SqlValue>],
    ) -> EngineResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let tx = self.conn.transaction().map_err(Self::query_err(&sql))?;
        {
            let mut stmt = tx.prepare(&sql).map_err(Self::query_err(&sql))?;
            for row in rows {
                stmt.execute(params_from_iter(row.iter()))
                    .map_err(Self::query_err(&sql))?;
            }
        }
        tx.commit().map_err(Self::query_err(&sql))?;

        Ok(rows.len())
    }
}

impl From<ValueRef<'_>> for SqlValue {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => SqlValue::Null,
            ValueRef::Integer(i) => SqlValue::Integer(i),
            ValueRef::Real(f) => SqlValue::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                SqlValue::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Null => ToSqlOutput::Owned(Value::Null),
            SqlValue::Integer(i) => ToSqlOutput::Owned(Value::Integer(*i)),
            SqlValue::Real(f) => ToSqlOutput::Owned(Value::Real(*f)),
            SqlValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        })
    }
}
