// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic row-oriented table, the shape of one spreadsheet sheet

use serde::{Deserialize, Serialize};
use std::fmt;

/// One spreadsheet cell
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Cell::Text(s.into())
    }

    /// Empty, or text that is only whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view; text cells are parsed
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => lexical_core::parse::<f64>(s.trim().as_bytes()).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{}", b),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

impl From<bool> for Cell {
    fn from(b: bool) -> Self {
        Cell::Bool(b)
    }
}

/// Rows of cells; the first row is the header
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with a text header row
    pub fn with_header<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            rows: vec![columns.iter().map(|c| Cell::text(c.as_ref())).collect()],
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    pub fn header(&self) -> Option<&[Cell]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header
    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().skip(1).map(Vec::as_slice)
    }

    /// Position of a header column, trimmed and case-insensitive
    pub fn column(&self, name: &str) -> Option<usize> {
        self.header()?
            .iter()
            .position(|cell| cell.to_string().trim().eq_ignore_ascii_case(name))
    }

    /// Number of columns in the header
    pub fn width(&self) -> usize {
        self.header().map_or(0, <[Cell]>::len)
    }
}

/// Cell at `col`, empty when the row is shorter
pub(crate) fn cell_at(row: &[Cell], col: usize) -> &Cell {
    row.get(col).unwrap_or(&EMPTY_CELL)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_lookup() {
        let table = Table::with_header(&[" Code ", "NAME", "color"]);
        assert_eq!(table.column("code"), Some(0));
        assert_eq!(table.column("name"), Some(1));
        assert_eq!(table.column("elements"), None);
        assert_eq!(table.width(), 3);
    }

    #[test]
    fn test_cell_text_and_numbers() {
        assert_eq!(Cell::Number(1.0).to_string(), "1");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(Cell::text(" 42 ").as_number(), Some(42.0));
        assert_eq!(Cell::Bool(true).as_number(), None);
        assert!(Cell::text("  ").is_blank());
    }

    #[test]
    fn test_short_rows_read_as_empty() {
        let row = vec![Cell::text("a")];
        assert_eq!(cell_at(&row, 0), &Cell::text("a"));
        assert_eq!(cell_at(&row, 5), &Cell::Empty);
    }

    #[test]
    fn test_json_shape() {
        let mut table = Table::with_header(&["a", "b"]);
        table.push_row(vec![Cell::Number(1.0), Cell::Empty]);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"rows":[["a","b"],[1.0,null]]}"#);
        let back: Table = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
