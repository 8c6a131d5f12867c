//! TABULAR and MATRIX renderers
//!
//! Both emit LaTeX table rows (`a & b \\`) ready to sit inside a `tabular`
//! environment.

use super::error::{RenderError, RenderResult};
use crate::engine::{EngineError, QueryEngine, Row, SqlValue};
use std::collections::HashMap;

/// Cell text for a NULL value
pub const NULL_CELL: &str = "-";

const ROW_END: &str = " \\\\";

fn cell(value: &SqlValue) -> String {
    match value {
        SqlValue::Null => NULL_CELL.to_string(),
        v if v.is_numeric() => format!("\\num{{{}}}", v),
        v => v.to_string(),
    }
}

/// Every row of `query`, its values joined by `&`
pub fn tabular(engine: &dyn QueryEngine, query: &str) -> RenderResult<String> {
    let rows = engine.query(query)?;

    let mut out = String::new();
    for row in &rows {
        let cells: Vec<String> = row.values().iter().map(cell).collect();
        out.push_str(&cells.join(" & "));
        out.push_str(ROW_END);
        out.push('\n');
    }
    Ok(out)
}

fn field<'r>(row: &'r Row, column: &str, query: &str) -> RenderResult<&'r SqlValue> {
    row.get(column).ok_or_else(|| {
        EngineError::MissingColumn {
            column: column.to_string(),
            query: query.to_string(),
        }
        .into()
    })
}

/// Pivot `x`, `y`, `val` rows into a grid: one column per x, one row per y
///
/// Labels keep first-seen order. Every (x, y) pair must have a value.
pub fn matrix(engine: &dyn QueryEngine, query: &str) -> RenderResult<String> {
    let rows = engine.query(query)?;

    let mut xs: Vec<String> = Vec::new();
    let mut ys: Vec<String> = Vec::new();
    let mut cells: HashMap<(String, String), String> = HashMap::new();

    for row in &rows {
        let x = field(row, "x", query)?.to_string();
        let y = field(row, "y", query)?.to_string();
        let val = cell(field(row, "val", query)?);

        if !xs.contains(&x) {
            xs.push(x.clone());
        }
        if !ys.contains(&y) {
            ys.push(y.clone());
        }
        cells.insert((x, y), val);
    }

    let mut out = String::new();
    for x in &xs {
        out.push_str(" & ");
        out.push_str(x);
    }
    out.push_str(ROW_END);
    out.push('\n');

    for y in &ys {
        out.push_str(y);
        for x in &xs {
            let value = cells
                .get(&(x.clone(), y.clone()))
                .ok_or_else(|| RenderError::MissingCell {
                    x: x.clone(),
                    y: y.clone(),
                    query: query.to_string(),
                })?;
            out.push_str(" & ");
            out.push_str(value);
        }
        out.push_str(ROW_END);
        out.push('\n');
    }

    Ok(out)
}
