use core::fmt;

use serde::{Deserialize, Serialize};
use tabula_model::{CellValue, Col, RichTextValue, ValidationRule};
use thiserror::Error;

/// Errors surfaced by grid collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("range out of bounds: {0}")]
    OutOfBounds(String),
    #[error("value shape does not match range {range}: {detail}")]
    ShapeMismatch { range: String, detail: String },
    #[error("grid backend error: {0}")]
    Backend(String),
}

impl GridError {
    pub fn backend(detail: impl Into<String>) -> Self {
        GridError::Backend(detail.into())
    }
}

/// A single cell position: 1-based row, letter-addressed column.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub col: Col,
    pub row: u32,
}

impl GridCoord {
    pub const fn new(col: Col, row: u32) -> Self {
        Self { col, row }
    }

    /// A1-style reference (e.g. `B7`).
    pub fn to_a1(self) -> String {
        format!("{}{}", self.col.name(), self.row)
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// A rectangular region, inclusive on both ends and always normalized so that
/// `start.row <= end.row` and `start.col <= end.col`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridRange {
    pub start: GridCoord,
    pub end: GridCoord,
}

impl GridRange {
    pub fn new(a: GridCoord, b: GridCoord) -> Self {
        let (start_row, end_row) = if a.row <= b.row { (a.row, b.row) } else { (b.row, a.row) };
        let (start_col, end_col) = if a.col <= b.col { (a.col, b.col) } else { (b.col, a.col) };
        Self {
            start: GridCoord::new(start_col, start_row),
            end: GridCoord::new(end_col, end_row),
        }
    }

    /// A single-cell range.
    pub fn cell(at: GridCoord) -> Self {
        Self { start: at, end: at }
    }

    /// A vertical segment of one column.
    pub fn column_segment(col: Col, first_row: u32, last_row: u32) -> Self {
        Self::new(GridCoord::new(col, first_row), GridCoord::new(col, last_row))
    }

    /// Number of rows in the range.
    #[inline]
    pub const fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range.
    #[inline]
    pub fn width(&self) -> u32 {
        (self.end.col.index() - self.start.col.index()) as u32 + 1
    }

    /// A1-style reference (e.g. `A2:D9`).
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }

    pub fn contains(&self, at: GridCoord) -> bool {
        at.row >= self.start.row
            && at.row <= self.end.row
            && at.col >= self.start.col
            && at.col <= self.end.col
    }
}

impl fmt::Display for GridRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// What a [`Grid::clear_region`] call wipes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOptions {
    pub contents: bool,
    pub formats: bool,
    pub validations: bool,
}

impl ClearOptions {
    /// Wipe contents, formats and validations alike.
    pub const fn all() -> Self {
        Self { contents: true, formats: true, validations: true }
    }
}

/// The grid storage collaborator: rectangular cell I/O over 1-based rows and
/// letter-addressed columns.
///
/// Writes may be buffered; [`flush`](Grid::flush) makes them visible to
/// subsequent readers. A [`CellValue::Formula`] written through
/// [`write_range`](Grid::write_range) is interpreted as a grid formula, and
/// backends that recalculate return the computed value on later reads.
pub trait Grid: Send + Sync {
    /// Read a rectangular block. The result has exactly `range.height()` rows
    /// of `range.width()` values, blank cells as [`CellValue::Empty`].
    fn read_range(&self, range: GridRange) -> Result<Vec<Vec<CellValue>>, GridError>;

    /// Read one column from `start_row` through the last occupied row of the
    /// sheet. May include interior blanks; may be empty.
    fn read_column(&self, col: Col, start_row: u32) -> Result<Vec<CellValue>, GridError>;

    /// Write a rectangular block of plain values.
    fn write_range(&self, range: GridRange, values: &[Vec<CellValue>]) -> Result<(), GridError>;

    /// Write a rectangular block of rich-text values.
    fn write_rich_range(
        &self,
        range: GridRange,
        values: &[Vec<RichTextValue>],
    ) -> Result<(), GridError>;

    /// Apply a data-validation rule to every cell in the range.
    fn set_validation(&self, range: GridRange, rule: &ValidationRule) -> Result<(), GridError>;

    /// Clear the selected aspects of every cell in the range.
    fn clear_region(&self, range: GridRange, options: ClearOptions) -> Result<(), GridError>;

    /// Commit buffered writes so subsequent readers observe them.
    fn flush(&self) -> Result<(), GridError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coord(col: &str, row: u32) -> GridCoord {
        GridCoord::new(Col::from_name(col).unwrap(), row)
    }

    #[test]
    fn ranges_normalize_and_format() {
        let range = GridRange::new(coord("D", 9), coord("A", 2));
        assert_eq!(range.to_a1(), "A2:D9");
        assert_eq!(range.height(), 8);
        assert_eq!(range.width(), 4);
        assert!(range.contains(coord("B", 5)));
        assert!(!range.contains(coord("E", 5)));
    }

    #[test]
    fn single_cell_formats_without_colon() {
        assert_eq!(GridRange::cell(coord("C", 3)).to_a1(), "C3");
    }
}
