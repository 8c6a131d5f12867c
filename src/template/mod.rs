//! Query templating for plot directives
//!
//! A MULTIPLOT query names its grouping columns once in the directive header
//! and marks where they belong with the `MULTIPLOT` placeholder:
//!
//! ```text
//! MULTIPLOT(algo) SELECT time AS x, mem AS y, MULTIPLOT FROM t
//!   WHERE file = 'a' GROUP BY MULTIPLOT, x
//! ```
//!
//! The placeholder is first expanded into the (aliased) grouping columns and
//! the query is run to find every distinct group. Then, per group, an
//! equality condition on the grouping columns is spliced into the query and
//! the filtered query yields that group's `(x, y)` coordinates.

mod error;
pub mod skeleton;

pub use error::{TemplateError, TemplateResult};
pub use skeleton::{Clause, QuerySkeleton};

use crate::engine::{quote_identifier, quote_literal, EngineError, QueryEngine, Row, SqlValue};
use std::collections::{BTreeMap, HashSet};

/// Placeholder word replaced by the grouping columns
pub const PLACEHOLDER: &str = "MULTIPLOT";

/// One `(x, y)` point
pub type Coordinate = (f64, f64);

/// Coordinates per group, iterated in ascending group order
pub type CoordinateMap = BTreeMap<GroupKey, Vec<Coordinate>>;

/// Values of the grouping columns identifying one series
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(components: Vec<String>) -> Self {
        Self(components)
    }

    pub fn single(component: impl Into<String>) -> Self {
        Self(vec![component.into()])
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The single component, or the tuple `(a<sep> b)` for several
    pub fn display_with(&self, separator: &str) -> String {
        match self.0.as_slice() {
            [only] => only.clone(),
            many => format!("({})", many.join(&format!("{} ", separator))),
        }
    }

    /// Legend label: `a` or `(a, b)`
    pub fn label(&self) -> String {
        self.display_with(",")
    }
}

impl From<Vec<String>> for GroupKey {
    fn from(components: Vec<String>) -> Self {
        Self(components)
    }
}

/// Quote a possibly qualified column: `t.size` -> `"t"."size"`
pub fn quote_qualified(column: &str) -> String {
    column
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Expand the placeholders of a MULTIPLOT query
///
/// The first placeholder becomes the grouping columns aliased to their full
/// names (`"t"."size" AS "t.size"`); later ones refer to those aliases.
pub fn distinct_values_query(query: &str, columns: &[String]) -> TemplateResult<String> {
    let skeleton = QuerySkeleton::scan(query);
    let placeholders = skeleton.occurrences(PLACEHOLDER);

    if placeholders.is_empty() {
        return Err(TemplateError::MissingPlaceholder {
            placeholder: PLACEHOLDER.to_string(),
            query: query.to_string(),
        });
    }

    let aliased = columns
        .iter()
        .map(|c| format!("{} AS {}", quote_qualified(c), quote_identifier(c)))
        .collect::<Vec<_>>()
        .join(", ");
    let referenced = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let mut out = query.to_string();
    for (idx, span) in placeholders.iter().enumerate().rev() {
        let replacement = if idx == 0 { &aliased } else { &referenced };
        out.replace_range(span.clone(), replacement);
    }

    Ok(out)
}

/// Restrict a grouping query to one group
///
/// The equality conjunction goes right after the top-level `WHERE` (the
/// existing condition is parenthesized), else as a new `WHERE` before
/// `GROUP BY` or `HAVING`, else before any trailing clause or at the end. Only the
/// outermost query is considered; subqueries keep their own conditions.
pub fn filtered_query(grouping_query: &str, columns: &[String], key: &GroupKey) -> String {
    let condition = columns
        .iter()
        .zip(key.components())
        .map(|(column, value)| format!("{} = {}", quote_qualified(column), quote_literal(value)))
        .collect::<Vec<_>>()
        .join(" AND ");

    let skeleton = QuerySkeleton::scan(grouping_query);
    let mut out = grouping_query.to_string();

    if let Some(existing) = skeleton.where_condition() {
        out.insert(existing.end, ')');
        out.insert_str(existing.start, &format!("{} AND (", condition));
        return out;
    }

    let trailing = [
        Clause::GroupBy,
        Clause::Having,
        Clause::Window,
        Clause::OrderBy,
        Clause::Limit,
        Clause::Compound,
    ];
    match trailing.iter().filter_map(|c| skeleton.clause(*c)).map(|s| s.start).min() {
        Some(pos) => out.insert_str(pos, &format!("WHERE {} ", condition)),
        None => out.insert_str(skeleton.statement_end(), &format!(" WHERE {}", condition)),
    }
    out
}

/// Read the `x` and `y` columns of a row as numbers
fn coordinate(row: &Row, group: &GroupKey, query: &str) -> TemplateResult<Coordinate> {
    let number = |column: &str| {
        row.get(column).and_then(SqlValue::as_f64).ok_or_else(|| TemplateError::NotNumeric {
            group: group.label(),
            query: query.to_string(),
        })
    };
    Ok((number("x")?, number("y")?))
}

fn coordinates(rows: &[Row], group: &GroupKey, query: &str) -> TemplateResult<Vec<Coordinate>> {
    rows.iter().map(|row| coordinate(row, group, query)).collect()
}

/// Run a MULTIPLOT query: one coordinate list per distinct group
///
/// Groups whose filtered query returns no rows are left out. Coordinates keep
/// the row order returned by the engine.
pub fn multiplot(
    engine: &dyn QueryEngine,
    query: &str,
    columns: &[String],
) -> TemplateResult<CoordinateMap> {
    let grouping_query = distinct_values_query(query, columns)?;
    let rows = engine.query(&grouping_query)?;

    let mut seen = HashSet::new();
    let mut keys = Vec::new();
    for row in &rows {
        let key = group_key(row, columns, &grouping_query)?;
        if seen.insert(key.clone()) {
            keys.push(key);
        }
    }

    tracing::debug!(groups = keys.len(), query = %grouping_query, "Found plot groups");

    let mut result = CoordinateMap::new();
    for key in keys {
        let filtered = filtered_query(&grouping_query, columns, &key);
        let rows = engine.query(&filtered)?;
        if rows.is_empty() {
            continue;
        }
        let points = coordinates(&rows, &key, &filtered)?;
        result.insert(key, points);
    }

    Ok(result)
}

/// Run a SINGLEPLOT query: one coordinate list under `label`
pub fn singleplot(
    engine: &dyn QueryEngine,
    label: &str,
    query: &str,
) -> TemplateResult<CoordinateMap> {
    let key = GroupKey::single(label);
    let rows = engine.query(query)?;

    let mut result = CoordinateMap::new();
    if !rows.is_empty() {
        let points = coordinates(&rows, &key, query)?;
        result.insert(key, points);
    }
    Ok(result)
}

fn group_key(row: &Row, columns: &[String], query: &str) -> TemplateResult<GroupKey> {
    columns
        .iter()
        .map(|column| match row.get(column) {
            None => Err(TemplateError::from(EngineError::MissingColumn {
                column: column.clone(),
                query: query.to_string(),
            })),
            Some(SqlValue::Null) => Err(TemplateError::NullGroupValue {
                column: column.clone(),
                query: query.to_string(),
            }),
            Some(value) => Ok(value.to_string()),
        })
        .collect::<TemplateResult<Vec<_>>>()
        .map(GroupKey::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SqliteEngine;
    use crate::import::{load_records, Record};

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn engine() -> SqliteEngine {
        let mut engine = SqliteEngine::in_memory().unwrap();
        let rows: &[(&str, &str, &str, &str)] = &[
            ("lz78", "a", "10", "5"),
            ("lz78", "a", "20", "8"),
            ("lzw", "a", "15", "6"),
            ("lzw", "b", "99", "99"),
            ("bwt", "b", "30", "3"),
        ];
        let records: Vec<Record> = rows
            .iter()
            .map(|(algo, file, time, mem)| {
                vec![
                    ("algo".to_string(), Some(algo.to_string())),
                    ("file".to_string(), Some(file.to_string())),
                    ("time".to_string(), Some(time.to_string())),
                    ("mem".to_string(), Some(mem.to_string())),
                ]
            })
            .collect();
        load_records(&mut engine, "t", &records).unwrap();
        engine
    }

    #[test]
    fn test_distinct_values_query() {
        let query = "SELECT time AS x, MULTIPLOT FROM t GROUP BY MULTIPLOT, x";
        assert_eq!(
            distinct_values_query(query, &cols(&["algo", "t.file"])).unwrap(),
            "SELECT time AS x, \"algo\" AS \"algo\", \"t\".\"file\" AS \"t.file\" FROM t \
             GROUP BY \"algo\", \"t.file\", x"
        );
    }

    #[test]
    fn test_missing_placeholder() {
        assert!(matches!(
            distinct_values_query("SELECT 1", &cols(&["a"])),
            Err(TemplateError::MissingPlaceholder { .. })
        ));
    }

    #[test]
    fn test_filter_after_where() {
        let query = "SELECT x FROM t WHERE a = 1 OR b = 2 GROUP BY x";
        let key = GroupKey::new(cols(&["lz78", "it's"]));
        assert_eq!(
            filtered_query(query, &cols(&["algo", "t.file"]), &key),
            "SELECT x FROM t WHERE \"algo\" = 'lz78' AND \"t\".\"file\" = 'it''s' AND (a = 1 OR b = 2) GROUP BY x"
        );
    }

    #[test]
    fn test_filter_before_group_by_or_at_end() {
        let key = GroupKey::single("a");
        assert_eq!(
            filtered_query("SELECT x FROM t GROUP BY x", &cols(&["c"]), &key),
            "SELECT x FROM t WHERE \"c\" = 'a' GROUP BY x"
        );
        assert_eq!(
            filtered_query("SELECT x FROM t ORDER BY x", &cols(&["c"]), &key),
            "SELECT x FROM t WHERE \"c\" = 'a' ORDER BY x"
        );
        assert_eq!(
            filtered_query("SELECT x FROM t;", &cols(&["c"]), &key),
            "SELECT x FROM t WHERE \"c\" = 'a';"
        );
        assert_eq!(
            filtered_query(
                "SELECT 1 AS x, 2 AS y, \"a\" FROM t HAVING count(*) > 0",
                &cols(&["a"]),
                &GroupKey::single("v")
            ),
            "SELECT 1 AS x, 2 AS y, \"a\" FROM t WHERE \"a\" = 'v' HAVING count(*) > 0"
        );
    }

    #[test]
    fn test_multiplot_groups_respect_where() {
        let engine = engine();
        let query = "SELECT time AS x, mem AS y, MULTIPLOT FROM t WHERE file='a' \
                     GROUP BY MULTIPLOT, x ORDER BY x";
        let map = multiplot(&engine, query, &cols(&["algo"])).unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(
            map[&GroupKey::single("lz78")],
            vec![(10.0, 5.0), (20.0, 8.0)]
        );
        assert_eq!(map[&GroupKey::single("lzw")], vec![(15.0, 6.0)]);
        assert!(!map.contains_key(&GroupKey::single("bwt")));
    }

    #[test]
    fn test_multiplot_with_two_columns() {
        let engine = engine();
        let query = "SELECT time AS x, mem AS y, MULTIPLOT FROM t GROUP BY MULTIPLOT, x";
        let map = multiplot(&engine, query, &cols(&["algo", "file"])).unwrap();

        let keys: Vec<String> = map.keys().map(GroupKey::label).collect();
        assert_eq!(keys, vec!["(bwt, b)", "(lz78, a)", "(lzw, a)", "(lzw, b)"]);
    }

    #[test]
    fn test_singleplot() {
        let engine = engine();
        let map = singleplot(
            &engine,
            "run",
            "SELECT time AS x, mem AS y FROM t WHERE algo = 'lz78' ORDER BY time",
        )
        .unwrap();
        assert_eq!(map[&GroupKey::single("run")], vec![(10.0, 5.0), (20.0, 8.0)]);
    }

    #[test]
    fn test_non_numeric_coordinates() {
        let engine = engine();
        let err = singleplot(&engine, "run", "SELECT algo AS x, mem AS y FROM t").unwrap_err();
        assert!(matches!(err, TemplateError::NotNumeric { .. }));
    }

    #[test]
    fn test_engine_errors_propagate() {
        let engine = engine();
        let err = multiplot(&engine, "SELECT MULTIPLOT FROM missing", &cols(&["a"])).unwrap_err();
        assert!(matches!(err, TemplateError::Engine(_)));
    }

    #[test]
    fn test_group_key_display() {
        let key = GroupKey::new(cols(&["a", "b"]));
        assert_eq!(key.label(), "(a, b)");
        assert_eq!(key.display_with(";"), "(a; b)");
        assert_eq!(GroupKey::single("x").display_with(";"), "x");
    }
}
