//! Document pass
//!
//! Feeds a document through the directive scanner, evaluates every block as
//! it closes and assembles the regenerated document. Output of a block is
//! placed right after its last line, where the next run's erase step will find
//! and replace it.

use crate::directive::header::{parse_bare, parse_call, parse_label};
use crate::directive::{Action, BlockKind, DirectiveBlock, DocumentKind, MacroTable, Scanner};
use crate::engine::QueryEngine;
use crate::error::{SqlPlotError, SqlPlotResult};
use crate::import::import_file;
use crate::render::{tabular, ColorCache, Renderer};
use crate::template;
use std::path::{Path, PathBuf};

/// Counters of one pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassStats {
    pub blocks: usize,
    pub imports: usize,
    pub macros: usize,
}

/// Evaluates the directives of one document
pub struct Processor<'e> {
    document: DocumentKind,
    engine: &'e mut dyn QueryEngine,
    macros: MacroTable,
    renderer: Renderer,
    stats: PassStats,
}

impl<'e> Processor<'e> {
    pub fn new(document: DocumentKind, engine: &'e mut dyn QueryEngine, colors: ColorCache) -> Self {
        Self {
            document,
            engine,
            macros: MacroTable::new(),
            renderer: Renderer::new(document, colors),
            stats: PassStats::default(),
        }
    }

    pub fn stats(&self) -> PassStats {
        self.stats
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Hand back the color cache, updated with every key seen in the pass
    pub fn into_colors(self) -> ColorCache {
        self.renderer.into_colors()
    }

    /// Regenerate `input`, returning the new document text
    pub fn process(&mut self, input: &str) -> SqlPlotResult<String> {
        let mut scanner = Scanner::new(self.document);
        let mut out = String::with_capacity(input.len());

        for line in input.split_inclusive('\n') {
            let actions = scanner
                .feed(line)
                .map_err(|e| SqlPlotError::from(e).at_line(scanner.line()))?;

            for action in actions {
                self.apply(action, scanner.line(), &mut out)?;
            }
        }

        if let Some(block) = scanner.finish() {
            self.dispatch(block, &mut out)?;
        }

        Ok(out)
    }

    fn apply(&mut self, action: Action<'_>, line: usize, out: &mut String) -> SqlPlotResult<()> {
        match action {
            Action::Echo(text) => out.push_str(text),
            Action::Dispatch(block) => self.dispatch(block, out)?,
            Action::Undefine(name) => {
                self.macros
                    .undefine(&name)
                    .map_err(|e| SqlPlotError::from(e).at_line(line))?;
                tracing::debug!(name = %name, "Undefined macro");
            }
            Action::Import {
                format,
                table,
                path,
            } => {
                import_file(&mut *self.engine, &table, Path::new(&path), format)
                    .map_err(|e| SqlPlotError::from(e).at_line(line))?;
                self.stats.imports += 1;
            }
        }
        Ok(())
    }

    fn dispatch(&mut self, block: DirectiveBlock, out: &mut String) -> SqlPlotResult<()> {
        let line = block.line;
        let inline = self
            .evaluate(&block)
            .map_err(|e| e.at_line(line))?;

        if !inline.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&inline);
        }
        Ok(())
    }

    /// Run one block; returns the text to place after it
    fn evaluate(&mut self, block: &DirectiveBlock) -> SqlPlotResult<String> {
        if block.kind == BlockKind::Define {
            self.macros.define_from_block(&block.body())?;
            self.stats.macros += 1;
            return Ok(String::new());
        }

        let body = self.macros.expand(&block.body())?;
        let keyword = block.kind.keyword();
        self.stats.blocks += 1;

        let inline = match block.kind {
            BlockKind::Multiplot => {
                let (columns, query) = parse_call(keyword, &body)?;
                let map = template::multiplot(&*self.engine, query, &columns)?;
                self.renderer.plot(&body, &map, &block.options)?
            }
            BlockKind::Singleplot => {
                let (label, query) = parse_label(keyword, &body)?;
                let map = template::singleplot(&*self.engine, &label, query)?;
                self.renderer.plot(&body, &map, &block.options)?
            }
            BlockKind::Tabular => {
                let rows = tabular::tabular(&*self.engine, parse_bare(keyword, &body)?)?;
                self.renderer.table(&rows, &block.options)?
            }
            BlockKind::Matrix => {
                let rows = tabular::matrix(&*self.engine, parse_bare(keyword, &body)?)?;
                self.renderer.table(&rows, &block.options)?
            }
            BlockKind::Define => String::new(),
        };

        Ok(inline)
    }
}

/// Settings of a file pass
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    /// Document kind; detected from the extension when unset
    pub kind: Option<DocumentKind>,
    /// Color cache file; `None` runs without a persisted cache
    pub color_cache: Option<PathBuf>,
}

/// Read a document, process it and return the regenerated text
///
/// The color cache is loaded before the pass and, for typesetting documents,
/// saved after it succeeded.
pub fn process_file(
    path: &Path,
    engine: &mut dyn QueryEngine,
    options: &ProcessOptions,
) -> SqlPlotResult<String> {
    let kind = match options.kind {
        Some(kind) => kind,
        None => DocumentKind::from_path(path)?,
    };

    let input = std::fs::read_to_string(path).map_err(|source| SqlPlotError::Document {
        path: path.to_path_buf(),
        source,
    })?;

    let colors = match &options.color_cache {
        Some(cache_path) => ColorCache::load(cache_path)?,
        None => ColorCache::new(),
    };

    let mut processor = Processor::new(kind, engine, colors);
    let output = processor.process(&input)?;
    let stats = processor.stats();

    tracing::info!(
        path = %path.display(),
        kind = ?kind,
        blocks = stats.blocks,
        imports = stats.imports,
        macros = stats.macros,
        "Processed document"
    );

    if let Some(cache_path) = &options.color_cache {
        if kind.persists_color_cache() {
            processor.into_colors().save(cache_path)?;
        }
    }

    Ok(output)
}

/// Replace `path` with `content` through a sibling temporary file
pub fn write_document(path: &Path, content: &str) -> SqlPlotResult<()> {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{}.sqlplot.tmp", file_name));

    let io_err = |source| SqlPlotError::Document {
        path: path.to_path_buf(),
        source,
    };

    std::fs::write(&tmp, content).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        io_err(e)
    })?;

    tracing::info!(path = %path.display(), bytes = content.len(), "Rewrote document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveError;
    use crate::engine::SqliteEngine;
    use crate::render::RenderError;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn write_log(dir: &TempDir, name: &str, content: &str) -> String {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn run(kind: DocumentKind, input: &str) -> SqlPlotResult<String> {
        let mut engine = SqliteEngine::in_memory().unwrap();
        let mut processor = Processor::new(kind, &mut engine, ColorCache::new());
        processor.process(input)
    }

    #[test]
    fn test_singleplot_csv() {
        let dir = tempdir().unwrap();
        let log = write_log(&dir, "run.txt", "RESULT time=10 mem=5\nRESULT time=20 mem=8\n");

        let doc = format!(
            "## IMPORT-DATA t {}\n\
             ## SINGLEPLOT(run) SELECT time AS x, mem AS y FROM t\n\
             \n",
            log
        );
        let out = run(DocumentKind::TabularData, &doc).unwrap();

        let expected = format!(
            "## IMPORT-DATA t {}\n\
             ## SINGLEPLOT(run) SELECT time AS x, mem AS y FROM t\n\
             title,x,y\n\
             run,10.000000,5.000000\n\
             run,20.000000,8.000000\n\
             \n",
            log
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_regeneration_is_idempotent() {
        let dir = tempdir().unwrap();
        let log = write_log(
            &dir,
            "low.txt",
            "RESULT algo=lz78 file=a time=10 mem=5\n\
             RESULT algo=lz78 file=a time=20 mem=8\n\
             RESULT algo=lzw file=a time=15 mem=6\n\
             RESULT algo=lzw file=b time=99 mem=99\n",
        );

        let doc = format!(
            "%% IMPORT-DATA low {}\n\
             %% DEFINE sel(col) SELECT time AS x, $col AS y\n\
             \n\
             \\begin{{axis}}\n\
             %% MULTIPLOT(algo) $sel(mem), MULTIPLOT FROM low\n\
             %% WHERE file='a' GROUP BY MULTIPLOT, x ORDER BY x\n\
             \n\
             \\end{{axis}}\n\
             \n\
             %% TABULAR SELECT algo, COUNT(*) FROM low GROUP BY algo ORDER BY algo\n\
             \n\
             text after\n",
            log
        );

        let first = run(DocumentKind::Typesetting, &doc).unwrap();
        assert!(first.contains(
            "\\addplot coordinates{(10.000000, 5.000000) (20.000000, 8.000000)};\n\
             \\addlegendentry{lz78};\n"
        ));
        assert!(first.contains("\\addlegendentry{lzw};\n\n\\end{axis}\n"));
        assert!(first.contains("lz78 & \\num{2} \\\\\nlzw & \\num{2} \\\\\n\ntext after\n"));
        assert!(!first.contains("99.000000"));

        let second = run(DocumentKind::Typesetting, &first).unwrap();
        assert_eq!(second, first);
    }

    #[test]
    fn test_append_mode_continues_cycle_shift() {
        let dir = tempdir().unwrap();
        let log = write_log(
            &dir,
            "log.txt",
            "RESULT algo=a grp=x time=1 mem=1\n\
             RESULT algo=b grp=x time=1 mem=2\n\
             RESULT algo=c grp=y time=1 mem=3\n",
        );
        let plot = dir.path().join("plot.tex");

        let doc = format!(
            "%% IMPORT-DATA t {log}\n\
             %% MULTIPLOT(algo) SELECT time AS x, mem AS y, MULTIPLOT FROM t WHERE grp='x' GROUP BY MULTIPLOT, x\n\
             %% CONFIG file={plot}\n\
             \n\
             %% MULTIPLOT(algo) SELECT time AS x, mem AS y, MULTIPLOT FROM t WHERE grp='y' GROUP BY MULTIPLOT, x\n\
             %% CONFIG file={plot} mode=append\n\
             \n",
            log = log,
            plot = plot.display()
        );

        let out = run(DocumentKind::Typesetting, &doc).unwrap();
        assert_eq!(out.matches(&format!("\\input{{{}}}\n", plot.display())).count(), 2);

        let written = fs::read_to_string(&plot).unwrap();
        assert!(written.contains("\\pgfplotsset{cycle list shift=1} % 1\n"));
        assert!(written.contains("\\pgfplotsset{cycle list shift=1} % 2\n"));
        // c is the third series of the file and has color index 3
        assert!(written.contains("\\pgfplotsset{cycle list shift=1} % 3\n"));
    }

    #[test]
    fn test_block_at_end_of_input() {
        let out = run(DocumentKind::Scripting, "## TABULAR SELECT 1, 'a'").unwrap();
        assert_eq!(out, "## TABULAR SELECT 1, 'a'\n\\num{1} & a \\\\\n");
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        let err = run(DocumentKind::Typesetting, "text\n%% UNDEF missing\n").unwrap_err();
        match err {
            SqlPlotError::AtLine { line, source } => {
                assert_eq!(line, 2);
                assert!(matches!(
                    *source,
                    SqlPlotError::Directive(DirectiveError::UndefinedMacro(_))
                ));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = run(
            DocumentKind::Typesetting,
            "\n%% MULTIPLOT SELECT x FROM t\n\n",
        )
        .unwrap_err();
        assert!(matches!(err, SqlPlotError::AtLine { line: 2, .. }));
    }

    #[test]
    fn test_script_data_needs_file() {
        let err = run(DocumentKind::PlottingScript, "## SINGLEPLOT(a) SELECT 1 AS x, 2 AS y\n\n")
            .unwrap_err();
        match err {
            SqlPlotError::AtLine { source, .. } => assert!(matches!(
                *source,
                SqlPlotError::Render(RenderError::InlineScriptData)
            )),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_process_file_persists_colors_for_typesetting_only() {
        let dir = tempdir().unwrap();
        let cache = dir.path().join("colors.txt");
        let options = ProcessOptions {
            kind: None,
            color_cache: Some(cache.clone()),
        };

        let py = dir.path().join("plot.py");
        fs::write(&py, "## SINGLEPLOT(a) SELECT 1 AS x, 2 AS y\n").unwrap();
        let mut engine = SqliteEngine::in_memory().unwrap();
        let out = process_file(&py, &mut engine, &options).unwrap();
        assert!(out.ends_with("{('a',): [(1.0, 2.0)]}\n"));
        assert!(!cache.exists());

        let tex = dir.path().join("plot.tex");
        fs::write(&tex, "%% SINGLEPLOT(a) SELECT 1 AS x, 2 AS y\n").unwrap();
        process_file(&tex, &mut engine, &options).unwrap();
        let saved = fs::read_to_string(&cache).unwrap();
        assert!(saved.contains("(a)\t1\n"));
    }

    #[test]
    fn test_write_document_replaces_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.tex");
        fs::write(&path, "old").unwrap();

        write_document(&path, "new\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
