//! Header-name → column-index lookup.

use std::collections::HashMap;

/// Maps lower-cased header names to their column index.
///
/// Built once per file from the header row. Lookups never fail: a column
/// missing from the file, or a row shorter than the header, reads as `""`.
#[derive(Debug, Clone, Default)]
pub struct ColumnResolver {
    index: HashMap<String, usize>,
}

impl ColumnResolver {
    /// Build from header cells. With duplicate headers the last one wins.
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, header)| (header.as_ref().trim().to_lowercase(), i))
            .collect();
        Self { index }
    }

    /// Column index of a header, case-insensitive.
    pub fn position(&self, column: &str) -> Option<usize> {
        self.index.get(&column.trim().to_lowercase()).copied()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.position(column).is_some()
    }

    /// Trimmed cell under `column`, or `""`.
    pub fn cell<'a, S: AsRef<str>>(&self, row: &'a [S], column: &str) -> &'a str {
        self.position(column)
            .and_then(|i| row.get(i))
            .map(|cell| cell.as_ref().trim())
            .unwrap_or("")
    }

    /// Names from `expected` that the header does not contain.
    pub fn missing<'c>(&self, expected: impl IntoIterator<Item = &'c str>) -> Vec<&'c str> {
        expected
            .into_iter()
            .filter(|column| !self.has_column(column))
            .collect()
    }
}
