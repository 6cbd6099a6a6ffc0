use std::collections::BTreeMap;

use parking_lot::RwLock;
use tabula_model::{CellValue, Col, RichTextValue, ValidationRule};

use crate::grid::{ClearOptions, Grid, GridCoord, GridError, GridRange};

#[derive(Default)]
struct CellSlot {
    value: CellValue,
    validation: Option<ValidationRule>,
}

impl CellSlot {
    fn is_vacant(&self) -> bool {
        self.value.is_empty() && self.validation.is_none()
    }
}

/// An in-memory [`Grid`] backed by a sparse cell map.
///
/// Used as the test fixture and by embedders that want DAO semantics without
/// a real spreadsheet. Writes are visible immediately, so
/// [`flush`](Grid::flush) is a no-op; formulas are stored verbatim and never
/// recalculated; formats are not modeled, so clearing them is a no-op too.
#[derive(Default)]
pub struct MemoryGrid {
    cells: RwLock<BTreeMap<(u32, u16), CellSlot>>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// The value at one cell, blank cells as [`CellValue::Empty`].
    pub fn value_at(&self, at: GridCoord) -> CellValue {
        self.cells
            .read()
            .get(&(at.row, at.col.index()))
            .map(|slot| slot.value.clone())
            .unwrap_or(CellValue::Empty)
    }

    /// The validation rule attached to one cell, if any.
    pub fn validation_at(&self, at: GridCoord) -> Option<ValidationRule> {
        self.cells
            .read()
            .get(&(at.row, at.col.index()))
            .and_then(|slot| slot.validation.clone())
    }

    fn check_shape(range: GridRange, rows: usize, row_len: impl Fn(usize) -> usize) -> Result<(), GridError> {
        if rows != range.height() as usize {
            return Err(GridError::ShapeMismatch {
                range: range.to_a1(),
                detail: format!("expected {} rows, got {rows}", range.height()),
            });
        }
        for i in 0..rows {
            if row_len(i) != range.width() as usize {
                return Err(GridError::ShapeMismatch {
                    range: range.to_a1(),
                    detail: format!("row {i} has {} values, expected {}", row_len(i), range.width()),
                });
            }
        }
        Ok(())
    }
}

impl Grid for MemoryGrid {
    fn read_range(&self, range: GridRange) -> Result<Vec<Vec<CellValue>>, GridError> {
        let cells = self.cells.read();
        let mut out = Vec::with_capacity(range.height() as usize);
        for row in range.start.row..=range.end.row {
            let mut values = Vec::with_capacity(range.width() as usize);
            for col in range.start.col.index()..=range.end.col.index() {
                values.push(
                    cells
                        .get(&(row, col))
                        .map(|slot| slot.value.clone())
                        .unwrap_or(CellValue::Empty),
                );
            }
            out.push(values);
        }
        Ok(out)
    }

    fn read_column(&self, col: Col, start_row: u32) -> Result<Vec<CellValue>, GridError> {
        let cells = self.cells.read();
        let last_occupied = cells
            .iter()
            .filter(|((row, c), slot)| *c == col.index() && *row >= start_row && !slot.value.is_empty())
            .map(|((row, _), _)| *row)
            .max();

        let Some(last) = last_occupied else {
            return Ok(Vec::new());
        };

        Ok((start_row..=last)
            .map(|row| {
                cells
                    .get(&(row, col.index()))
                    .map(|slot| slot.value.clone())
                    .unwrap_or(CellValue::Empty)
            })
            .collect())
    }

    fn write_range(&self, range: GridRange, values: &[Vec<CellValue>]) -> Result<(), GridError> {
        Self::check_shape(range, values.len(), |i| values[i].len())?;

        let mut cells = self.cells.write();
        for (r, row_values) in values.iter().enumerate() {
            let row = range.start.row + r as u32;
            for (c, value) in row_values.iter().enumerate() {
                let key = (row, range.start.col.index() + c as u16);
                let slot = cells.entry(key).or_default();
                slot.value = value.clone();
                if slot.is_vacant() {
                    cells.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn write_rich_range(
        &self,
        range: GridRange,
        values: &[Vec<RichTextValue>],
    ) -> Result<(), GridError> {
        Self::check_shape(range, values.len(), |i| values[i].len())?;

        let mut cells = self.cells.write();
        for (r, row_values) in values.iter().enumerate() {
            let row = range.start.row + r as u32;
            for (c, value) in row_values.iter().enumerate() {
                let key = (row, range.start.col.index() + c as u16);
                cells.entry(key).or_default().value = CellValue::Rich(value.clone());
            }
        }
        Ok(())
    }

    fn set_validation(&self, range: GridRange, rule: &ValidationRule) -> Result<(), GridError> {
        let mut cells = self.cells.write();
        for row in range.start.row..=range.end.row {
            for col in range.start.col.index()..=range.end.col.index() {
                cells.entry((row, col)).or_default().validation = Some(rule.clone());
            }
        }
        Ok(())
    }

    fn clear_region(&self, range: GridRange, options: ClearOptions) -> Result<(), GridError> {
        let mut cells = self.cells.write();
        for row in range.start.row..=range.end.row {
            for col in range.start.col.index()..=range.end.col.index() {
                let key = (row, col);
                if let Some(slot) = cells.get_mut(&key) {
                    if options.contents {
                        slot.value = CellValue::Empty;
                    }
                    if options.validations {
                        slot.validation = None;
                    }
                    if slot.is_vacant() {
                        cells.remove(&key);
                    }
                }
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), GridError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn coord(col: &str, row: u32) -> GridCoord {
        GridCoord::new(Col::from_name(col).unwrap(), row)
    }

    #[test]
    fn blank_cells_read_as_empty() {
        let grid = MemoryGrid::new();
        let block = grid
            .read_range(GridRange::new(coord("A", 1), coord("B", 2)))
            .unwrap();
        assert_eq!(block, vec![vec![CellValue::Empty; 2]; 2]);
    }

    #[test]
    fn writes_round_trip() {
        let grid = MemoryGrid::new();
        let range = GridRange::new(coord("A", 2), coord("B", 3));
        grid.write_range(
            range,
            &[
                vec![CellValue::Number(1.0), CellValue::Text("a".into())],
                vec![CellValue::Number(2.0), CellValue::Text("b".into())],
            ],
        )
        .unwrap();

        assert_eq!(grid.value_at(coord("B", 3)), CellValue::Text("b".into()));
        assert_eq!(grid.read_range(range).unwrap()[1][0], CellValue::Number(2.0));
    }

    #[test]
    fn write_shape_must_match_range() {
        let grid = MemoryGrid::new();
        let err = grid
            .write_range(GridRange::cell(coord("A", 1)), &[vec![CellValue::Empty; 2]])
            .unwrap_err();
        assert!(matches!(err, GridError::ShapeMismatch { .. }));
    }

    #[test]
    fn column_reads_stop_at_last_occupied_row() {
        let grid = MemoryGrid::new();
        grid.write_range(
            GridRange::column_segment(Col::FIRST, 2, 5),
            &[
                vec![CellValue::Text("a".into())],
                vec![CellValue::Empty],
                vec![CellValue::Text("c".into())],
                vec![CellValue::Empty],
            ],
        )
        .unwrap();

        let column = grid.read_column(Col::FIRST, 2).unwrap();
        assert_eq!(
            column,
            vec![
                CellValue::Text("a".into()),
                CellValue::Empty,
                CellValue::Text("c".into()),
            ],
        );
        assert_eq!(grid.read_column(Col::FIRST, 5).unwrap(), Vec::new());
    }

    #[test]
    fn clear_region_wipes_contents_and_validations() {
        let grid = MemoryGrid::new();
        let range = GridRange::new(coord("A", 2), coord("A", 3));
        grid.write_range(range, &[vec![CellValue::Number(1.0)], vec![CellValue::Number(2.0)]])
            .unwrap();
        grid.set_validation(range, &ValidationRule::Checkbox).unwrap();

        grid.clear_region(range, ClearOptions { contents: true, formats: false, validations: false })
            .unwrap();
        assert_eq!(grid.value_at(coord("A", 2)), CellValue::Empty);
        assert_eq!(grid.validation_at(coord("A", 2)), Some(ValidationRule::Checkbox));

        grid.clear_region(range, ClearOptions::all()).unwrap();
        assert_eq!(grid.validation_at(coord("A", 2)), None);
    }
}
