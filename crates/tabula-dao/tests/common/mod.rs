#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tabula_dao::{ClearOptions, Grid, GridCoord, GridError, GridRange, MemoryGrid};
use tabula_model::{CellValue, Col, RichTextValue, ValidationRule};

pub fn col(name: &str) -> Col {
    Col::from_name(name).unwrap()
}

pub fn at(column: &str, row: u32) -> GridCoord {
    GridCoord::new(col(column), row)
}

/// One collaborator call, tagged with the range it touched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ReadRange(String),
    ReadColumn(String),
    WriteRange(String),
    WriteRichRange(String),
    SetValidation(String),
    ClearRegion(String),
    Flush,
}

/// A [`MemoryGrid`] that records every collaborator call, so tests can assert
/// how many range writes an operation issued and where they landed.
#[derive(Default)]
pub struct RecordingGrid {
    inner: MemoryGrid,
    calls: Mutex<Vec<Call>>,
}

impl RecordingGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn inner(&self) -> &MemoryGrid {
        &self.inner
    }

    pub fn reset_calls(&self) {
        self.calls.lock().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Ranges passed to `write_range`, in call order.
    pub fn write_ranges(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::WriteRange(range) => Some(range),
                _ => None,
            })
            .collect()
    }

    pub fn write_rich_ranges(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::WriteRichRange(range) => Some(range),
                _ => None,
            })
            .collect()
    }

    pub fn flush_count(&self) -> usize {
        self.calls().into_iter().filter(|c| *c == Call::Flush).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl Grid for RecordingGrid {
    fn read_range(&self, range: GridRange) -> Result<Vec<Vec<CellValue>>, GridError> {
        self.record(Call::ReadRange(range.to_a1()));
        self.inner.read_range(range)
    }

    fn read_column(&self, col: Col, start_row: u32) -> Result<Vec<CellValue>, GridError> {
        self.record(Call::ReadColumn(format!("{}{start_row}", col.name())));
        self.inner.read_column(col, start_row)
    }

    fn write_range(&self, range: GridRange, values: &[Vec<CellValue>]) -> Result<(), GridError> {
        self.record(Call::WriteRange(range.to_a1()));
        self.inner.write_range(range, values)
    }

    fn write_rich_range(
        &self,
        range: GridRange,
        values: &[Vec<RichTextValue>],
    ) -> Result<(), GridError> {
        self.record(Call::WriteRichRange(range.to_a1()));
        self.inner.write_rich_range(range, values)
    }

    fn set_validation(&self, range: GridRange, rule: &ValidationRule) -> Result<(), GridError> {
        self.record(Call::SetValidation(range.to_a1()));
        self.inner.set_validation(range, rule)
    }

    fn clear_region(&self, range: GridRange, options: ClearOptions) -> Result<(), GridError> {
        self.record(Call::ClearRegion(range.to_a1()));
        self.inner.clear_region(range, options)
    }

    fn flush(&self) -> Result<(), GridError> {
        self.record(Call::Flush);
        self.inner.flush()
    }
}
