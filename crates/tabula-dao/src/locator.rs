//! Key/row location over a single scanned column.
//!
//! The scan input is the primary-key column read once from the grid; rows are
//! reported 1-based relative to `start_row` (the first scanned cell).

use tabula_model::{key_eq, CellValue};

/// Outcome of resolving a key against the scanned column.
///
/// Callers branch on this value; "not found" is a normal outcome (it means
/// "create new" on the save path), not an error thrown mid-flight.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyLookup {
    /// Exactly one row holds the key.
    Found(u32),
    /// No row holds the key.
    NotFound,
    /// More than one row holds the key; the table is ambiguous for it.
    Ambiguous { count: usize },
}

/// Scan for `key`, collecting every matching row.
///
/// Equality follows [`key_eq`]: date cells match by instant, rich cells by
/// display text, and a blank `key` matches nothing (use
/// [`first_empty_row`] to find free space).
pub fn locate(cells: &[CellValue], key: &CellValue, start_row: u32) -> KeyLookup {
    let mut matches = cells
        .iter()
        .enumerate()
        .filter(|(_, cell)| key_eq(cell, key))
        .map(|(i, _)| start_row + i as u32);

    match (matches.next(), matches.next()) {
        (Some(row), None) => KeyLookup::Found(row),
        (None, _) => KeyLookup::NotFound,
        (Some(_), Some(_)) => KeyLookup::Ambiguous { count: 2 + matches.count() },
    }
}

/// Row of the first blank cell; one past the scan when fully occupied.
pub fn first_empty_row(cells: &[CellValue], start_row: u32) -> u32 {
    cells
        .iter()
        .position(|cell| cell.is_empty())
        .map(|i| start_row + i as u32)
        .unwrap_or(start_row + cells.len() as u32)
}
