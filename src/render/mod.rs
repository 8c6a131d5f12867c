//! Result rendering
//!
//! Turns the coordinates of a plot directive into one of five encodings and
//! routes the text either back into the document or into an output file.
//!
//! Series are always rendered in ascending group-key order. The [`Renderer`]
//! keeps the state that spans directives: the color cache and, per output
//! file, how many series and data blocks earlier directives of this run have
//! written there. Appending directives continue that numbering.

mod color_cache;
mod error;
pub mod tabular;

pub use color_cache::{ColorCache, CACHE_FORMAT_VERSION};
pub use error::{RenderError, RenderResult};

use crate::directive::{BlockOptions, DocumentKind, OutputMode};
use crate::template::{CoordinateMap, GroupKey};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Output encoding of a plot directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    /// Python literal (`py`)
    StructuredLiteral,
    /// `title,x,y` CSV (`csv`)
    TabularText,
    /// gnuplot data blocks (`gnuplot`)
    ScriptData,
    /// JSON object (`js`)
    ObjectNotation,
    /// pgfplots commands (`tex`)
    Typesetting,
}

impl OutputKind {
    /// Parse a `type=` option value
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "tex" => Some(OutputKind::Typesetting),
            "py" => Some(OutputKind::StructuredLiteral),
            "js" | "json" => Some(OutputKind::ObjectNotation),
            "csv" => Some(OutputKind::TabularText),
            "gnuplot" | "gp" => Some(OutputKind::ScriptData),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            OutputKind::StructuredLiteral => "py",
            OutputKind::TabularText => "csv",
            OutputKind::ScriptData => "gnuplot",
            OutputKind::ObjectNotation => "js",
            OutputKind::Typesetting => "tex",
        }
    }
}

/// Python `repr` of a string
fn py_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

fn py_tuple(key: &GroupKey) -> String {
    let parts: Vec<String> = key.components().iter().map(|c| py_str(c)).collect();
    match parts.as_slice() {
        [one] => format!("({},)", one),
        many => format!("({})", many.join(", ")),
    }
}

/// A Python dict literal, one group per line
pub fn structured_literal(map: &CoordinateMap) -> String {
    if map.is_empty() {
        return "{}\n".to_string();
    }

    let entries: Vec<String> = map
        .iter()
        .map(|(key, coords)| {
            let points: Vec<String> = coords
                .iter()
                .map(|(x, y)| format!("({:?}, {:?})", x, y))
                .collect();
            format!("{}: [{}]", py_tuple(key), points.join(", "))
        })
        .collect();

    format!("{{{}}}\n", entries.join(",\n "))
}

/// `title,x,y` followed by one line per coordinate
pub fn tabular_text(map: &CoordinateMap) -> String {
    let mut out = String::from("title,x,y\n");
    for (key, coords) in map {
        let title = key.display_with(";");
        for (x, y) in coords {
            let _ = writeln!(out, "{},{:.6},{:.6}", title, x, y);
        }
    }
    out
}

#[derive(Serialize)]
struct JsonPoint<'a> {
    name: &'a [String],
    x: f64,
    y: f64,
}

#[derive(Serialize)]
struct JsonPlot<'a> {
    query: &'a str,
    result: Vec<JsonPoint<'a>>,
}

/// A JSON object holding the query and one record per coordinate
pub fn object_notation(query: &str, map: &CoordinateMap) -> RenderResult<String> {
    let result = map
        .iter()
        .flat_map(|(key, coords)| {
            coords.iter().map(move |(x, y)| JsonPoint {
                name: key.components(),
                x: *x,
                y: *y,
            })
        })
        .collect();

    let mut out = serde_json::to_string_pretty(&JsonPlot { query, result })?;
    out.push('\n');
    Ok(out)
}

/// gnuplot data blocks numbered from `first_index`; returns the text and the next index
///
/// Every block is terminated by two blank lines so that `index N` selects it.
/// A commented `plot` command listing the new blocks closes the output.
pub fn script_data(file: &Path, map: &CoordinateMap, first_index: usize) -> (String, usize) {
    let mut out = String::new();
    let mut plots = Vec::new();
    let mut index = first_index;

    for (key, coords) in map {
        let label = key.label();
        let _ = writeln!(out, "# {} (index {})", label, index);
        for (x, y) in coords {
            let _ = writeln!(out, "{:.6} {:.6}", x, y);
        }
        out.push_str("\n\n");

        let source = if plots.is_empty() {
            format!("'{}'", file.display())
        } else {
            "''".to_string()
        };
        plots.push(format!(
            "{} index {} with linespoints title '{}'",
            source,
            index,
            label.replace('\'', "''")
        ));
        index += 1;
    }

    if !plots.is_empty() {
        let _ = writeln!(out, "# plot {}", plots.join(", "));
    }
    (out, index)
}

/// pgfplots commands for every group; returns the text and the new entry count
///
/// With a color cache each series is preceded by a cycle list shift that
/// makes pgfplots pick the cached style:
/// `shift = cache index - (position in this block + previous entries)`.
pub fn typesetting(
    query: &str,
    map: &CoordinateMap,
    mut colors: Option<&mut ColorCache>,
    previous_entries: usize,
) -> (String, usize) {
    let mut out = format!("% {}\n", query);

    for (ordinal, (key, coords)) in map.iter().enumerate() {
        if let Some(cache) = colors.as_deref_mut() {
            let index = cache.index_of(key);
            let shift = index as i64 - (ordinal + previous_entries) as i64;
            let _ = writeln!(out, "\\pgfplotsset{{cycle list shift={}}} % {}", shift, index);
        }

        let points: Vec<String> = coords
            .iter()
            .map(|(x, y)| format!("({:.6}, {:.6})", x, y))
            .collect();
        let _ = writeln!(out, "\\addplot coordinates{{{}}};", points.join(" "));
        let _ = writeln!(out, "\\addlegendentry{{{}}};", key.label());
    }

    (out, previous_entries + map.len())
}

/// What earlier directives of this run wrote to one output file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TargetState {
    /// Series written, continuing the cycle shift numbering
    pub entries: usize,
    /// Next gnuplot data block index
    pub next_block: usize,
    /// Whether script data went to this file
    pub script: bool,
}

/// Renders directive results and writes output files
#[derive(Debug)]
pub struct Renderer {
    document: DocumentKind,
    colors: ColorCache,
    targets: HashMap<PathBuf, TargetState>,
}

impl Renderer {
    pub fn new(document: DocumentKind, colors: ColorCache) -> Self {
        Self {
            document,
            colors,
            targets: HashMap::new(),
        }
    }

    pub fn colors(&self) -> &ColorCache {
        &self.colors
    }

    pub fn into_colors(self) -> ColorCache {
        self.colors
    }

    pub fn target(&self, path: &Path) -> Option<TargetState> {
        self.targets.get(path).copied()
    }

    /// Output kind of a block: its `type=` option or the document default
    pub fn output_kind(&self, options: &BlockOptions) -> OutputKind {
        options
            .output
            .unwrap_or_else(|| self.document.default_output())
    }

    /// Render a plot; returns the text to inline after the directive
    pub fn plot(
        &mut self,
        query: &str,
        map: &CoordinateMap,
        options: &BlockOptions,
    ) -> RenderResult<String> {
        let kind = self.output_kind(options);

        let Some(path) = options.file.as_deref() else {
            if kind == OutputKind::ScriptData {
                return Err(RenderError::InlineScriptData);
            }
            let colors = options.color_cache.then_some(&mut self.colors);
            return Self::encode(kind, query, map, colors, Path::new(""), TargetState::default())
                .map(|(text, _)| text);
        };

        let previous = self.targets.get(path).copied();
        if kind == OutputKind::ScriptData
            && options.mode == OutputMode::Write
            && previous.map_or(false, |state| state.script)
        {
            return Err(RenderError::ScriptOverwrite(path.to_path_buf()));
        }

        let start = match (options.mode, previous) {
            (OutputMode::Append, Some(state)) => state,
            _ => TargetState::default(),
        };

        let colors = options.color_cache.then_some(&mut self.colors);
        let (text, mut state) = Self::encode(kind, query, map, colors, path, start)?;
        state.script |= kind == OutputKind::ScriptData;

        self.write_target(path, options.mode, &text)?;
        self.targets.insert(path.to_path_buf(), state);

        tracing::info!(
            path = %path.display(),
            kind = kind.name(),
            series = map.len(),
            "Wrote plot"
        );

        Ok(self.input_line(kind, path))
    }

    /// Route TABULAR / MATRIX rows; returns the text to inline
    pub fn table(&mut self, rows: &str, options: &BlockOptions) -> RenderResult<String> {
        match options.file.as_deref() {
            None => Ok(rows.to_string()),
            Some(path) => {
                self.write_target(path, options.mode, rows)?;
                self.targets.entry(path.to_path_buf()).or_default();
                tracing::info!(path = %path.display(), "Wrote table");

                Ok(self.input_line(self.document.default_output(), path))
            }
        }
    }

    fn encode(
        kind: OutputKind,
        query: &str,
        map: &CoordinateMap,
        colors: Option<&mut ColorCache>,
        path: &Path,
        start: TargetState,
    ) -> RenderResult<(String, TargetState)> {
        let mut state = start;
        let text = match kind {
            OutputKind::StructuredLiteral => structured_literal(map),
            OutputKind::TabularText => tabular_text(map),
            OutputKind::ObjectNotation => object_notation(query, map)?,
            OutputKind::ScriptData => {
                let (text, next) = script_data(path, map, start.next_block);
                state.next_block = next;
                text
            }
            OutputKind::Typesetting => {
                let (text, entries) = typesetting(query, map, colors, start.entries);
                state.entries = entries;
                return Ok((text, state));
            }
        };
        state.entries += map.len();
        Ok((text, state))
    }

    fn input_line(&self, kind: OutputKind, path: &Path) -> String {
        match kind {
            OutputKind::Typesetting => format!("\\input{{{}}}\n", path.display()),
            _ => String::new(),
        }
    }

    /// The first write of a run truncates the file; later appends extend it
    fn write_target(&self, path: &Path, mode: OutputMode, text: &str) -> RenderResult<()> {
        let append = mode == OutputMode::Append && self.targets.contains_key(path);

        let io_err = |source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)
            .map_err(io_err)?;
        file.write_all(text.as_bytes()).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(parts: &[&str]) -> GroupKey {
        GroupKey::new(parts.iter().map(|s| s.to_string()).collect())
    }

    fn sample() -> CoordinateMap {
        let mut map = CoordinateMap::new();
        map.insert(key(&["lzw"]), vec![(15.0, 6.0)]);
        map.insert(key(&["lz78"]), vec![(10.0, 5.0), (20.0, 8.0)]);
        map
    }

    #[test]
    fn test_output_kind_names() {
        assert_eq!(OutputKind::from_name("JSON"), Some(OutputKind::ObjectNotation));
        assert_eq!(OutputKind::from_name("gp"), Some(OutputKind::ScriptData));
        assert_eq!(OutputKind::from_name("xml"), None);
    }

    #[test]
    fn test_tabular_text() {
        let mut map = CoordinateMap::new();
        map.insert(key(&["run"]), vec![(10.0, 5.0), (20.0, 8.0)]);
        map.insert(key(&["a", "b"]), vec![(1.5, 2.0)]);
        assert_eq!(
            tabular_text(&map),
            "title,x,y\n(a; b),1.500000,2.000000\nrun,10.000000,5.000000\nrun,20.000000,8.000000\n"
        );
    }

    #[test]
    fn test_structured_literal() {
        assert_eq!(
            structured_literal(&sample()),
            "{('lz78',): [(10.0, 5.0), (20.0, 8.0)],\n ('lzw',): [(15.0, 6.0)]}\n"
        );
        assert_eq!(structured_literal(&CoordinateMap::new()), "{}\n");
    }

    #[test]
    fn test_object_notation() {
        let text = object_notation("SELECT 1", &sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["query"], "SELECT 1");
        assert_eq!(value["result"].as_array().unwrap().len(), 3);
        assert_eq!(value["result"][0]["name"][0], "lz78");
        assert_eq!(value["result"][2]["x"], 15.0);
    }

    #[test]
    fn test_typesetting_with_cache() {
        let mut cache = ColorCache::new();
        cache.index_of(&key(&["lzw"]));

        let (text, entries) = typesetting("Q", &sample(), Some(&mut cache), 0);
        assert_eq!(entries, 2);
        assert_eq!(
            text,
            "% Q\n\
             \\pgfplotsset{cycle list shift=2} % 2\n\
             \\addplot coordinates{(10.000000, 5.000000) (20.000000, 8.000000)};\n\
             \\addlegendentry{lz78};\n\
             \\pgfplotsset{cycle list shift=0} % 1\n\
             \\addplot coordinates{(15.000000, 6.000000)};\n\
             \\addlegendentry{lzw};\n"
        );
    }

    #[test]
    fn test_typesetting_without_cache() {
        let (text, entries) = typesetting("Q", &sample(), None, 3);
        assert_eq!(entries, 5);
        assert!(!text.contains("cycle list shift"));
    }

    #[test]
    fn test_script_data_blocks() {
        let (text, next) = script_data(Path::new("out.dat"), &sample(), 2);
        assert_eq!(next, 4);
        assert!(text.starts_with("# lz78 (index 2)\n10.000000 5.000000\n20.000000 8.000000\n\n\n"));
        assert!(text.ends_with(
            "# plot 'out.dat' index 2 with linespoints title 'lz78', '' index 3 with linespoints title 'lzw'\n"
        ));
    }

    #[test]
    fn test_append_continues_cycle_shift() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plot.tex");
        let mut renderer = Renderer::new(DocumentKind::Typesetting, ColorCache::new());

        let mut options = BlockOptions {
            file: Some(path.clone()),
            ..BlockOptions::default()
        };
        let inline = renderer.plot("first", &sample(), &options).unwrap();
        assert_eq!(inline, format!("\\input{{{}}}\n", path.display()));

        let mut second = CoordinateMap::new();
        second.insert(key(&["bwt"]), vec![(1.0, 1.0)]);
        options.mode = OutputMode::Append;
        renderer.plot("second", &second, &options).unwrap();

        // bwt gets cache index 3 and is the third series in the file
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("% first\n"));
        assert!(written.contains("\\pgfplotsset{cycle list shift=1} % 3\n"));
        assert_eq!(renderer.target(&path).unwrap().entries, 3);
    }

    #[test]
    fn test_first_write_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plot.csv");
        std::fs::write(&path, "stale content\n").unwrap();

        let mut renderer = Renderer::new(DocumentKind::TabularData, ColorCache::new());
        let options = BlockOptions {
            file: Some(path.clone()),
            mode: OutputMode::Append,
            ..BlockOptions::default()
        };
        let inline = renderer.plot("q", &sample(), &options).unwrap();
        assert_eq!(inline, "");

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("title,x,y\n"));
    }

    #[test]
    fn test_script_data_rules() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plot.dat");
        let mut renderer = Renderer::new(DocumentKind::PlottingScript, ColorCache::new());

        assert!(matches!(
            renderer.plot("q", &sample(), &BlockOptions::default()),
            Err(RenderError::InlineScriptData)
        ));

        let mut options = BlockOptions {
            file: Some(path.clone()),
            ..BlockOptions::default()
        };
        renderer.plot("q", &sample(), &options).unwrap();
        assert!(matches!(
            renderer.plot("q", &sample(), &options),
            Err(RenderError::ScriptOverwrite(_))
        ));

        options.mode = OutputMode::Append;
        renderer.plot("q", &sample(), &options).unwrap();
        assert_eq!(renderer.target(&path).unwrap().next_block, 4);

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("# lzw (index 3)\n"));
    }
}
