use std::sync::Arc;

use tabula_model::CellValue;

use crate::grid::{Grid, GridCoord, GridError, GridRange};

/// A named single-cell counter used to mint primary keys.
///
/// The DAO composes [`read`](Sequence::read) and
/// [`write_back`](Sequence::write_back) into an increment that is atomic
/// under the document lock it already holds; the sequence itself takes no
/// separate lock.
pub trait Sequence: Send + Sync {
    fn read(&self) -> Result<i64, GridError>;
    fn write_back(&self, value: i64) -> Result<(), GridError>;
}

/// Read-increment-write, returning the new value.
///
/// Incrementing by `n` reserves the value range `(old, old + n]`; bulk saves
/// use this to mint a whole batch with one counter round-trip.
pub fn increment(sequence: &dyn Sequence, by: i64) -> Result<i64, GridError> {
    let next = sequence.read()? + by;
    sequence.write_back(next)?;
    Ok(next)
}

/// A [`Sequence`] backed by one numeric grid cell.
pub struct GridSequence {
    grid: Arc<dyn Grid>,
    cell: GridCoord,
}

impl GridSequence {
    pub fn new(grid: Arc<dyn Grid>, cell: GridCoord) -> Self {
        Self { grid, cell }
    }
}

impl Sequence for GridSequence {
    fn read(&self) -> Result<i64, GridError> {
        let values = self.grid.read_range(GridRange::cell(self.cell))?;
        match values.first().and_then(|row| row.first()) {
            Some(CellValue::Number(n)) => Ok(*n as i64),
            // An unset counter starts at zero.
            Some(CellValue::Empty) | None => Ok(0),
            Some(other) => Err(GridError::backend(format!(
                "sequence cell {} does not hold a number (found '{other}')",
                self.cell,
            ))),
        }
    }

    fn write_back(&self, value: i64) -> Result<(), GridError> {
        self.grid.write_range(
            GridRange::cell(self.cell),
            &[vec![CellValue::Number(value as f64)]],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryGrid;
    use tabula_model::Col;

    #[test]
    fn increments_through_the_grid_cell() {
        let grid = Arc::new(MemoryGrid::new());
        let cell = GridCoord::new(Col::from_name("Z").unwrap(), 1);
        let seq = GridSequence::new(grid.clone(), cell);

        assert_eq!(increment(&seq, 1).unwrap(), 1);
        assert_eq!(increment(&seq, 5).unwrap(), 6);
        assert_eq!(seq.read().unwrap(), 6);

        let stored = grid.read_range(GridRange::cell(cell)).unwrap();
        assert_eq!(stored[0][0], CellValue::Number(6.0));
    }

    #[test]
    fn rejects_non_numeric_counter_cells() {
        let grid = Arc::new(MemoryGrid::new());
        let cell = GridCoord::new(Col::from_name("Z").unwrap(), 1);
        grid.write_range(GridRange::cell(cell), &[vec![CellValue::Text("x".into())]])
            .unwrap();

        let seq = GridSequence::new(grid, cell);
        assert!(matches!(seq.read(), Err(GridError::Backend(_))));
    }
}
