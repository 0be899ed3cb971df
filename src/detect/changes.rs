//! Change sets and dirty-set output.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Serialize;

use crate::detect::detector::DirtySet;

/// Ordered, duplicate-free list of changed file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    paths: Vec<String>,
}

impl ChangeSet {
    /// Build a change set, keeping the first occurrence of each path.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let paths = paths
            .into_iter()
            .map(Into::into)
            .filter(|p| seen.insert(p.clone()))
            .collect();
        Self { paths }
    }

    /// Parse `git diff --name-only` style output: one path per line.
    ///
    /// Surrounding whitespace is trimmed and blank lines are skipped.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_owned),
        )
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// How a dirty set is printed for the CI runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One unit name per line.
    #[default]
    Lines,
    /// JSON array of unit names.
    Json,
    /// JSON build matrix: `{"include":[{"unit":"..."}]}`.
    Matrix,
}

#[derive(Serialize)]
struct Matrix<'a> {
    include: Vec<MatrixEntry<'a>>,
}

#[derive(Serialize)]
struct MatrixEntry<'a> {
    unit: &'a str,
}

/// Render a dirty set. Names are emitted in sorted order.
pub fn render(dirty: &DirtySet, format: OutputFormat) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Lines => {
            let mut out = String::new();
            for name in dirty {
                let _ = writeln!(out, "{name}");
            }
            Ok(out)
        }
        OutputFormat::Json => serde_json::to_string(dirty),
        OutputFormat::Matrix => serde_json::to_string(&Matrix {
            include: dirty.iter().map(|unit| MatrixEntry { unit }).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_diff_output() {
        let changes = ChangeSet::parse("src/ui/a.ts\n\n  src/cart/b.java \nsrc/ui/a.ts\r\n");
        assert_eq!(changes.paths(), &["src/ui/a.ts", "src/cart/b.java"]);
    }

    #[test]
    fn test_render_formats() {
        let dirty = DirtySet::from(["ui".to_string(), "cart".to_string()]);

        assert_eq!(render(&dirty, OutputFormat::Lines).unwrap(), "cart\nui\n");
        assert_eq!(render(&dirty, OutputFormat::Json).unwrap(), r#"["cart","ui"]"#);
        assert_eq!(
            render(&dirty, OutputFormat::Matrix).unwrap(),
            r#"{"include":[{"unit":"cart"},{"unit":"ui"}]}"#
        );
    }

    #[test]
    fn test_render_empty() {
        let dirty = DirtySet::new();
        assert_eq!(render(&dirty, OutputFormat::Lines).unwrap(), "");
        assert_eq!(render(&dirty, OutputFormat::Json).unwrap(), "[]");
        assert_eq!(render(&dirty, OutputFormat::Matrix).unwrap(), r#"{"include":[]}"#);
    }
}
