//! Data import
//!
//! Loads benchmark results into engine tables for directives to query:
//! - RESULT logs (`IMPORT-DATA table path`)
//! - JSON arrays of flat objects (`IMPORT-JSON-DATA table path`)
//!
//! Column types are inferred from every value seen for the column and the
//! table is created on first import.

mod csv_convert;
mod error;
mod json;
mod keyvalue;
mod result_log;
mod schema;

pub use csv_convert::{csv_to_result_lines, parse_delimiter};
pub use error::{ImportError, ImportResult};
pub use json::{parse_json_records, read_json_records};
pub use keyvalue::{split_key_value_line, split_result_line, KeyValues, RESULT_PREFIX};
pub use result_log::{parse_result_log, read_result_log};
pub use schema::{ColumnType, TableSchema};

use crate::engine::{QueryEngine, SqlValue};
use std::path::Path;

/// One imported record: column name and raw value (`None` for NULL)
pub type Record = Vec<(String, Option<String>)>;

/// Source format of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Lines of `RESULT key=value ...`
    ResultLog,
    /// A JSON array of flat objects
    Json,
}

/// Outcome of loading one data file
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSummary {
    pub table: String,
    pub columns: Vec<(String, ColumnType)>,
    pub rows: usize,
}

/// Read a data file and load its records into `table`
pub fn import_file(
    engine: &mut dyn QueryEngine,
    table: &str,
    path: &Path,
    format: ImportFormat,
) -> ImportResult<ImportSummary> {
    let mut records = match format {
        ImportFormat::ResultLog => read_result_log(path)?,
        ImportFormat::Json => read_json_records(path)?,
    };

    records.retain(|record| !record.is_empty());
    if records.is_empty() {
        return Err(ImportError::NoRows(path.to_path_buf()));
    }

    let summary = load_records(engine, table, &records)?;
    tracing::info!(
        table = %table,
        path = %path.display(),
        rows = summary.rows,
        columns = summary.columns.len(),
        "Imported data"
    );

    Ok(summary)
}

/// Infer a schema for `records`, create the table and insert every record
pub fn load_records(
    engine: &mut dyn QueryEngine,
    table: &str,
    records: &[Record],
) -> ImportResult<ImportSummary> {
    let mut schema = TableSchema::new();
    for record in records {
        for (column, value) in record {
            match value {
                Some(value) => schema.observe(column, value),
                None => schema.declare(column),
            }
        }
    }

    let columns = schema.columns();
    if columns.is_empty() {
        return Err(ImportError::NoColumns(table.to_string()));
    }
    engine.create_table(table, &columns)?;

    let names: Vec<String> = columns.iter().map(|(name, _)| name.clone()).collect();
    let rows: Vec<Vec<SqlValue>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|(name, ty)| {
                    record
                        .iter()
                        .find(|(column, _)| column == name)
                        .and_then(|(_, value)| value.as_deref())
                        .map_or(SqlValue::Null, |value| typed_value(value, *ty))
                })
                .collect()
        })
        .collect();

    let inserted = engine.insert_rows(table, &names, &rows)?;

    Ok(ImportSummary {
        table: table.to_string(),
        columns,
        rows: inserted,
    })
}

/// Bind a raw value with its column's inferred type
fn typed_value(raw: &str, ty: ColumnType) -> SqlValue {
    let trimmed = raw.trim();
    match ty {
        ColumnType::Integer => trimmed
            .parse()
            .map(SqlValue::Integer)
            .unwrap_or_else(|_| SqlValue::Text(raw.to_string())),
        ColumnType::Real => trimmed
            .parse()
            .map(SqlValue::Real)
            .unwrap_or_else(|_| SqlValue::Text(raw.to_string())),
        ColumnType::Text => SqlValue::Text(raw.to_string()),
    }
}
