//! Color cache persistence
//!
//! Maps every group key ever plotted to a stable index so that a series keeps
//! its legend style in every plot and across runs. The store is a text file:
//!
//! ```text
//! # sqlplot color cache: keeps legend styles stable across plots
//! #format=1
//! (lz78)	1
//! (lzw,fast)	2
//! ```
//!
//! Keys are parenthesized, comma-separated components. Inside a component
//! `\`, `,`, tab and newline are escaped with a backslash.

use super::error::{RenderError, RenderResult};
use crate::template::GroupKey;
use std::collections::HashMap;
use std::path::Path;

/// Version written in the `#format=` header
pub const CACHE_FORMAT_VERSION: u32 = 1;

const HEADER: &str = "# sqlplot color cache: keeps legend styles stable across plots";
const FORMAT_PREFIX: &str = "#format=";

/// Group key to color index, indices starting at 1
#[derive(Debug, Default, Clone)]
pub struct ColorCache {
    entries: HashMap<GroupKey, usize>,
    max_index: usize,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the cache; a missing file yields an empty cache
    pub fn load(path: &Path) -> RenderResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Color cache not found, will create it");
                return Ok(Self::new());
            }
            Err(source) => {
                return Err(RenderError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let cache = Self::parse(&content).map_err(|(line, message)| RenderError::CacheFormat {
            path: path.to_path_buf(),
            line,
            message,
        })?;

        tracing::info!(path = %path.display(), entries = cache.len(), "Loaded color cache");
        Ok(cache)
    }

    /// Parse cache text; errors carry the 1-based line number
    pub fn parse(content: &str) -> Result<Self, (usize, String)> {
        let mut cache = Self::new();

        for (idx, line) in content.lines().enumerate() {
            let lineno = idx + 1;

            if let Some(version) = line.strip_prefix(FORMAT_PREFIX) {
                match version.trim().parse::<u32>() {
                    Ok(CACHE_FORMAT_VERSION) => continue,
                    _ => return Err((lineno, format!("unsupported format version '{}'", version))),
                }
            }
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }

            let (key, index) = line
                .split_once('\t')
                .ok_or_else(|| (lineno, "expected '<key>\\t<index>'".to_string()))?;
            let index: usize = index
                .trim()
                .parse()
                .ok()
                .filter(|i| *i > 0)
                .ok_or_else(|| (lineno, format!("invalid index '{}'", index.trim())))?;
            let key = decode_key(key).map_err(|message| (lineno, message))?;

            if cache.entries.insert(key, index).is_some() {
                return Err((lineno, "duplicate key".to_string()));
            }
            cache.max_index = cache.max_index.max(index);
        }

        Ok(cache)
    }

    /// Write every entry, ordered by index
    pub fn save(&self, path: &Path) -> RenderResult<()> {
        std::fs::write(path, self.to_text()).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), entries = self.len(), "Saved color cache");
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut entries: Vec<(&GroupKey, &usize)> = self.entries.iter().collect();
        entries.sort_by_key(|(_, index)| **index);

        let mut out = format!("{}\n{}{}\n", HEADER, FORMAT_PREFIX, CACHE_FORMAT_VERSION);
        for (key, index) in entries {
            out.push_str(&format!("{}\t{}\n", encode_key(key), index));
        }
        out
    }

    /// Index of `key`, assigning the next unused one on first sight
    pub fn index_of(&mut self, key: &GroupKey) -> usize {
        if let Some(index) = self.entries.get(key) {
            return *index;
        }
        self.max_index += 1;
        self.entries.insert(key.clone(), self.max_index);
        self.max_index
    }

    pub fn get(&self, key: &GroupKey) -> Option<usize> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn encode_key(key: &GroupKey) -> String {
    let components: Vec<String> = key
        .components()
        .iter()
        .map(|component| {
            let mut escaped = String::with_capacity(component.len());
            for c in component.chars() {
                match c {
                    '\\' => escaped.push_str("\\\\"),
                    ',' => escaped.push_str("\\,"),
                    '\t' => escaped.push_str("\\t"),
                    '\n' => escaped.push_str("\\n"),
                    c => escaped.push(c),
                }
            }
            escaped
        })
        .collect();
    format!("({})", components.join(","))
}

fn decode_key(text: &str) -> Result<GroupKey, String> {
    let inner = text
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| format!("key '{}' is not parenthesized", text))?;

    let mut components = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some(',') => current.push(','),
                Some('t') => current.push('\t'),
                Some('n') => current.push('\n'),
                other => return Err(format!("invalid escape '\\{}'", other.unwrap_or(' '))),
            },
            ',' => components.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    components.push(current);

    Ok(GroupKey::new(components))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn key(parts: &[&str]) -> GroupKey {
        GroupKey::new(parts.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_indices_are_stable_and_increasing() {
        let mut cache = ColorCache::new();
        assert_eq!(cache.index_of(&key(&["lz78"])), 1);
        assert_eq!(cache.index_of(&key(&["lzw"])), 2);
        assert_eq!(cache.index_of(&key(&["lz78"])), 1);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_save_and_reload_continues_numbering() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("colors.txt");

        let mut cache = ColorCache::new();
        cache.index_of(&key(&["a,b", "tab\there"]));
        cache.index_of(&key(&["back\\slash"]));
        cache.save(&path).unwrap();

        let mut reloaded = ColorCache::load(&path).unwrap();
        assert_eq!(reloaded.get(&key(&["a,b", "tab\there"])), Some(1));
        assert_eq!(reloaded.get(&key(&["back\\slash"])), Some(2));
        assert_eq!(reloaded.index_of(&key(&["new"])), 3);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let cache = ColorCache::load(&dir.path().join("absent.txt")).unwrap();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_gaps_keep_max_index() {
        let mut cache = ColorCache::parse("# comment\n(a)\t4\n(b)\t2\n").unwrap();
        assert_eq!(cache.index_of(&key(&["c"])), 5);
    }

    #[test]
    fn test_malformed_lines_are_fatal() {
        assert_eq!(ColorCache::parse("(a) 1\n").unwrap_err().0, 1);
        assert_eq!(ColorCache::parse("#x\n(a)\tzero\n").unwrap_err().0, 2);
        assert!(ColorCache::parse("a\t1\n").is_err());
        assert!(ColorCache::parse("(a)\t0\n").is_err());
        assert!(ColorCache::parse("(a)\t1\n(a)\t2\n").is_err());
        assert!(ColorCache::parse("#format=2\n").is_err());
    }

    #[test]
    fn test_load_reports_path_and_line() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("colors.txt");
        std::fs::write(&path, "#format=1\n(a)\t1\nbroken\n").unwrap();

        match ColorCache::load(&path) {
            Err(RenderError::CacheFormat { line, .. }) => assert_eq!(line, 3),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
