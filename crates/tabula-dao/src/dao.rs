use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};
use tabula_model::text::to_camel_case;
use tabula_model::{
    CellValue, Col, KeyRepr, Record, RichTextValue, SchemaError, TableSchema, TableSchemaBuilder,
    ValidationRule,
};

use crate::codec::{Converter, Enricher, RecordCodec};
use crate::error::DaoError;
use crate::grid::{ClearOptions, Grid, GridCoord, GridError, GridRange};
use crate::lock::{self, DocumentLock, DEFAULT_LOCK_TIMEOUT};
use crate::locator::{self, KeyLookup};
use crate::search::{run_search, Search};
use crate::sequence::{self, Sequence};

/// Per-table runtime configuration: the pieces of a DAO that are behavior,
/// not shape: converters, enrichment, sequences, validation rules and the
/// lock-wait bound.
///
/// Field names are validated against the schema when the [`Dao`] is built.
#[derive(Clone, Default)]
pub struct DaoConfig {
    lock_timeout: Option<Duration>,
    converters: HashMap<String, Converter>,
    enricher: Option<Enricher>,
    sequences: HashMap<String, Arc<dyn Sequence>>,
    validations: HashMap<String, ValidationRule>,
}

impl DaoConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounded wait for the document lock. Defaults to
    /// [`DEFAULT_LOCK_TIMEOUT`] (10 seconds).
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Attach a write-time converter to a field. See [`crate::converters`].
    pub fn converter(mut self, field: impl Into<String>, converter: Converter) -> Self {
        self.converters.insert(field.into(), converter);
        self
    }

    /// Attach the read-time enrichment transform.
    pub fn enricher(mut self, enricher: impl Fn(Record) -> Record + Send + Sync + 'static) -> Self {
        self.enricher = Some(Arc::new(enricher));
        self
    }

    /// Back a field with a sequence counter. A record saved without a value
    /// for the field gets the counter's next value minted under the lock.
    pub fn sequence(mut self, field: impl Into<String>, sequence: Arc<dyn Sequence>) -> Self {
        self.sequences.insert(field.into(), sequence);
        self
    }

    /// Attach a data-validation rule to a field's column.
    pub fn validation(mut self, field: impl Into<String>, rule: ValidationRule) -> Self {
        self.validations.insert(field.into(), rule);
        self
    }
}

/// The Data Access Object: maps between one table's grid rows and
/// [`Record`]s.
///
/// Mutating operations (`save`, `bulk_save`, `clear`) run their whole
/// critical section under the document lock and flush before releasing, so
/// the next lock holder observes a consistent state. Read operations take no
/// lock and accept possibly-stale snapshots.
pub struct Dao {
    grid: Arc<dyn Grid>,
    lock: Arc<dyn DocumentLock>,
    schema: TableSchema,
    lock_timeout: Duration,
    converters: HashMap<String, Converter>,
    enricher: Option<Enricher>,
    sequences: HashMap<String, Arc<dyn Sequence>>,
    validations: HashMap<String, ValidationRule>,
}

impl Dao {
    /// Build a DAO over `schema`, validating that every configured field
    /// exists in it.
    pub fn new(
        grid: Arc<dyn Grid>,
        lock: Arc<dyn DocumentLock>,
        schema: TableSchema,
        config: DaoConfig,
    ) -> Result<Self, DaoError> {
        check_fields(&schema, "converter", config.converters.keys())?;
        check_fields(&schema, "sequence", config.sequences.keys())?;
        check_fields(&schema, "validation", config.validations.keys())?;

        Ok(Self {
            grid,
            lock,
            schema,
            lock_timeout: config.lock_timeout.unwrap_or(DEFAULT_LOCK_TIMEOUT),
            converters: config.converters,
            enricher: config.enricher,
            sequences: config.sequences,
            validations: config.validations,
        })
    }

    /// Infer a schema from the sheet's header row.
    ///
    /// The start column is the first column at/after `start_col` with a
    /// non-empty header cell, the field list ends before the first empty
    /// header cell after it, and field names are the camel-cased header
    /// titles. The returned builder has the header row accounted for
    /// (data starts at row 2) and can be refined before `build()`.
    pub fn infer_schema(grid: &dyn Grid, start_col: &str) -> Result<TableSchemaBuilder, DaoError> {
        let requested = Col::from_name(start_col).map_err(SchemaError::from)?;
        let header_range = GridRange::new(GridCoord::new(requested, 1), GridCoord::new(Col::LAST, 1));
        let header = grid
            .read_range(header_range)?
            .into_iter()
            .next()
            .unwrap_or_default();

        let offset = header
            .iter()
            .position(|cell| !cell.is_empty())
            .ok_or_else(|| DaoError::NoHeader { col: start_col.to_string() })?;
        let start = requested.offset(offset as u16).map_err(SchemaError::from)?;

        let keys: Vec<String> = header[offset..]
            .iter()
            .take_while(|cell| !cell.is_empty())
            .map(|cell| to_camel_case(&cell.display_text()))
            .collect();

        debug!("inferred {} field(s) starting at column {start}", keys.len());
        Ok(TableSchema::builder(keys).start_col(start.name()).with_header())
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Snapshot of every record in the occupied row range, in row order.
    /// Lock-free read.
    pub fn find_all(&self) -> Result<Vec<Record>, DaoError> {
        let column = self.read_key_column()?;
        let start_row = self.schema.start_row();
        let first_empty = locator::first_empty_row(&column, start_row);
        if first_empty == start_row {
            return Ok(Vec::new());
        }

        let height = first_empty - start_row;
        let block = self.grid.read_range(self.row_block_range(start_row, height))?;
        let codec = self.codec();
        Ok(block
            .into_iter()
            .enumerate()
            .map(|(i, values)| codec.decode_row(values, Some(start_row + i as u32)))
            .collect())
    }

    /// Resolve `key` in the primary-key column and read that row. Lock-free
    /// read.
    pub fn find_by_key(&self, key: impl Into<CellValue>) -> Result<Record, DaoError> {
        let key = key.into();
        let column = self.read_key_column()?;
        match locator::locate(&column, &key, self.schema.start_row()) {
            KeyLookup::Found(row) => self.find_by_row(row),
            KeyLookup::NotFound => Err(DaoError::KeyNotFound { key: key.display_text() }),
            KeyLookup::Ambiguous { count } => {
                Err(DaoError::AmbiguousKey { key: key.display_text(), count })
            }
        }
    }

    /// Read the record at a physical row. Lock-free read.
    ///
    /// Fails with [`DaoError::NoRecordAtRow`] when the row's primary-key cell
    /// is blank, guarding against reading a blank row as if it were data.
    /// Numeric zero is a valid key, not blank.
    pub fn find_by_row(&self, row: u32) -> Result<Record, DaoError> {
        let values = self
            .grid
            .read_range(self.row_block_range(row, 1))?
            .into_iter()
            .next()
            .unwrap_or_default();

        let pk = values.get(self.schema.primary_key_index());
        if pk.map_or(true, CellValue::is_empty) {
            return Err(DaoError::NoRecordAtRow { row });
        }
        Ok(self.codec().decode_row(values, Some(row)))
    }

    /// The last occupied row of the table (`start_row - 1` when empty).
    pub fn find_last_row(&self) -> Result<u32, DaoError> {
        let column = self.read_key_column()?;
        Ok(locator::first_empty_row(&column, self.schema.start_row()) - 1)
    }

    /// `find_all` filtered through `search`.
    pub fn search(&self, search: &Search) -> Result<Vec<Record>, DaoError> {
        Ok(run_search(search, &self.find_all()?))
    }

    /// Upsert one record by primary key.
    ///
    /// Under the lock: mints missing sequence-backed fields, resolves the
    /// target row by key, enforces the record's row claim against the
    /// resolution, expands per-row formulas, writes, flushes, and returns the
    /// freshly read-back record (so the caller sees exactly what is now
    /// persisted, including backend-recalculated formula cells).
    pub fn save(&self, record: &Record) -> Result<Record, DaoError> {
        let guard = lock::acquire(self.lock.as_ref(), self.lock_timeout)?;

        let record = self.mint_missing_sequences(record)?;
        let mut encoded = self.codec().encode(&record);
        let key = encoded[self.schema.primary_key_index()].clone();
        if key.is_empty() {
            return Err(DaoError::MissingKey { field: self.schema.primary_key().to_string() });
        }

        let start_row = self.schema.start_row();
        let column = self.read_key_column()?;
        let target = match locator::locate(&column, &key, start_row) {
            KeyLookup::Found(row) => {
                if let Some(claimed) = record.row() {
                    if claimed != row {
                        return Err(DaoError::RowMismatch {
                            key: key.display_text(),
                            claimed,
                            resolved: row,
                        });
                    }
                }
                debug!("save: updating '{}' in place at row {row}", key.display_text());
                row
            }
            KeyLookup::NotFound => {
                if let Some(claimed) = record.row() {
                    return Err(DaoError::RowForMissingRecord {
                        key: key.display_text(),
                        row: claimed,
                    });
                }
                let row = locator::first_empty_row(&column, start_row);
                debug!("save: creating '{}' at row {row}", key.display_text());
                row
            }
            KeyLookup::Ambiguous { count } => {
                return Err(DaoError::AmbiguousKey { key: key.display_text(), count });
            }
        };

        self.apply_formulas(&mut encoded, target);
        self.write_run(target, std::slice::from_ref(&encoded))?;
        self.grid.flush()?;

        // Read back while still holding the lock, so the result reflects this
        // critical section and nothing later.
        let saved = self.find_by_row(target);
        drop(guard);
        saved
    }

    /// Upsert a batch of records by primary key, batching contiguous updates.
    ///
    /// Updates are grouped into maximal runs of contiguous resolved rows and
    /// written one range write per run; inserts are appended as one
    /// contiguous block after the last occupied row, input order preserved.
    /// Records missing a sequence-backed field are minted with a single
    /// counter increment for the whole batch.
    ///
    /// Duplicate keys within the batch resolve last-write-wins: earlier
    /// occurrences are dropped before partitioning. Returns nothing; callers
    /// that need hydrated records re-query.
    pub fn bulk_save(&self, records: &[Record]) -> Result<(), DaoError> {
        let pk_field = self.schema.primary_key();
        // A record cannot claim an existing row without carrying its
        // identity. Checked before taking the lock.
        for record in records {
            if let Some(row) = record.row() {
                if record.is_blank(pk_field) {
                    return Err(DaoError::RowWithoutKey { row, field: pk_field.to_string() });
                }
            }
        }
        if records.is_empty() {
            return Ok(());
        }

        let _guard = lock::acquire(self.lock.as_ref(), self.lock_timeout)?;

        let records = self.mint_missing_sequences_bulk(records)?;
        let codec = self.codec();
        let pk_idx = self.schema.primary_key_index();
        let start_row = self.schema.start_row();

        // Encode and dedupe by key, keeping the later occurrence.
        let mut by_key: HashMap<KeyRepr, usize> = HashMap::new();
        let mut encoded: Vec<Option<(Option<u32>, KeyRepr, Vec<CellValue>)>> =
            Vec::with_capacity(records.len());
        for record in &records {
            let row_values = codec.encode(record);
            let Some(repr) = row_values[pk_idx].key_repr() else {
                return Err(DaoError::MissingKey { field: pk_field.to_string() });
            };
            if let Some(earlier) = by_key.insert(repr.clone(), encoded.len()) {
                trace!(
                    "bulk_save: key '{}' appears more than once in the batch; last write wins",
                    row_values[pk_idx].display_text(),
                );
                encoded[earlier] = None;
            }
            encoded.push(Some((record.row(), repr, row_values)));
        }

        // One read of the primary-key column serves the key index, the
        // first-empty-row lookup and the consistency cross-checks.
        let column = self.read_key_column()?;
        let first_empty = locator::first_empty_row(&column, start_row);
        let mut index: HashMap<KeyRepr, Vec<u32>> = HashMap::new();
        for (i, cell) in column.iter().enumerate() {
            if let Some(repr) = cell.key_repr() {
                index.entry(repr).or_default().push(start_row + i as u32);
            }
        }

        let mut updates: Vec<(u32, Vec<CellValue>)> = Vec::new();
        let mut inserts: Vec<Vec<CellValue>> = Vec::new();
        for (claimed, repr, row_values) in encoded.into_iter().flatten() {
            match index.get(&repr).map(Vec::as_slice) {
                Some([row]) => {
                    if let Some(claimed) = claimed {
                        if claimed != *row {
                            return Err(DaoError::RowMismatch {
                                key: row_values[pk_idx].display_text(),
                                claimed,
                                resolved: *row,
                            });
                        }
                    }
                    updates.push((*row, row_values));
                }
                Some(rows) => {
                    return Err(DaoError::AmbiguousKey {
                        key: row_values[pk_idx].display_text(),
                        count: rows.len(),
                    });
                }
                None => {
                    if let Some(claimed) = claimed {
                        return Err(DaoError::RowForMissingRecord {
                            key: row_values[pk_idx].display_text(),
                            row: claimed,
                        });
                    }
                    inserts.push(row_values);
                }
            }
        }

        updates.sort_by_key(|(row, _)| *row);
        let runs = contiguous_runs(updates);
        debug!(
            "bulk_save: {} update run(s), {} insert(s) at row {first_empty}",
            runs.len(),
            inserts.len(),
        );

        for mut run in runs {
            for (offset, values) in run.rows.iter_mut().enumerate() {
                self.apply_formulas(values, run.first_row + offset as u32);
            }
            trace!("bulk_save: writing rows {}..={}", run.first_row, run.last_row());
            self.write_run(run.first_row, &run.rows)?;
        }

        if !inserts.is_empty() {
            let mut inserts = inserts;
            for (offset, values) in inserts.iter_mut().enumerate() {
                self.apply_formulas(values, first_empty + offset as u32);
            }
            self.write_run(first_empty, &inserts)?;
        }

        self.grid.flush()?;
        Ok(())
    }

    /// Wipe the table's data region (contents, formats and validations) from
    /// `start_row` down. Rows above `start_row` (headers, title formulas) are
    /// never touched.
    pub fn clear(&self) -> Result<(), DaoError> {
        let _guard = lock::acquire(self.lock.as_ref(), self.lock_timeout)?;

        let column = self.read_key_column()?;
        let start_row = self.schema.start_row();
        let first_empty = locator::first_empty_row(&column, start_row);
        if first_empty > start_row {
            let region = self.row_block_range(start_row, first_empty - start_row);
            debug!("clear: wiping {region}");
            self.grid.clear_region(region, ClearOptions::all())?;
        }
        self.grid.flush()?;
        Ok(())
    }

    fn codec(&self) -> RecordCodec<'_> {
        RecordCodec::new(&self.schema, &self.converters, self.enricher.as_ref())
    }

    fn read_key_column(&self) -> Result<Vec<CellValue>, GridError> {
        self.grid
            .read_column(self.schema.primary_key_col(), self.schema.start_row())
    }

    fn row_block_range(&self, first_row: u32, height: u32) -> GridRange {
        GridRange::new(
            GridCoord::new(self.schema.start_col(), first_row),
            GridCoord::new(self.schema.end_col(), first_row + height - 1),
        )
    }

    /// Mint sequence-backed fields missing from the record, one counter
    /// round-trip each. The caller's record is never mutated.
    fn mint_missing_sequences(&self, record: &Record) -> Result<Record, DaoError> {
        let mut record = record.clone();
        for (field, seq) in &self.sequences {
            if record.is_blank(field) {
                let value = sequence::increment(seq.as_ref(), 1)?;
                trace!("minted {field}={value}");
                record.insert(field.clone(), value);
            }
        }
        Ok(record)
    }

    /// Batch variant: one counter increment per sequence field covers every
    /// record missing it; the reserved trailing value range is assigned in
    /// input order.
    fn mint_missing_sequences_bulk(&self, records: &[Record]) -> Result<Vec<Record>, DaoError> {
        let mut records = records.to_vec();
        for (field, seq) in &self.sequences {
            let needing: Vec<usize> = records
                .iter()
                .enumerate()
                .filter(|(_, r)| r.is_blank(field))
                .map(|(i, _)| i)
                .collect();
            if needing.is_empty() {
                continue;
            }

            let top = sequence::increment(seq.as_ref(), needing.len() as i64)?;
            let base = top - needing.len() as i64;
            trace!("minted {} value(s) of {field}: {}..={top}", needing.len(), base + 1);
            for (offset, idx) in needing.into_iter().enumerate() {
                records[idx].insert(field.clone(), base + 1 + offset as i64);
            }
        }
        Ok(records)
    }

    /// Overwrite formula-backed fields with their row-expanded formulas.
    fn apply_formulas(&self, encoded: &mut [CellValue], row: u32) {
        for (field, bound) in self.schema.formulas() {
            if let Some(idx) = self.schema.field_index(field) {
                encoded[idx] = CellValue::Formula(bound.at_row(row, self.schema.start_row()));
            }
        }
    }

    /// Write one contiguous run of encoded rows: a single range write of the
    /// plain projection, then one column write per field carrying rich
    /// values, then one validation write per validated field.
    fn write_run(&self, first_row: u32, rows: &[Vec<CellValue>]) -> Result<(), GridError> {
        let last_row = first_row + rows.len() as u32 - 1;
        let range = self.row_block_range(first_row, rows.len() as u32);

        let plain: Vec<Vec<CellValue>> = rows
            .iter()
            .map(|row| row.iter().map(plain_cell).collect())
            .collect();
        self.grid.write_range(range, &plain)?;

        for (idx, field) in self.schema.keys().iter().enumerate() {
            if !rows.iter().any(|row| matches!(row[idx], CellValue::Rich(_))) {
                continue;
            }
            let Some(col) = self.schema.col_of(field) else { continue };
            let rich: Vec<Vec<RichTextValue>> =
                rows.iter().map(|row| vec![rich_cell(&row[idx])]).collect();
            self.grid
                .write_rich_range(GridRange::column_segment(col, first_row, last_row), &rich)?;
        }

        for (field, rule) in &self.validations {
            let Some(col) = self.schema.col_of(field) else { continue };
            self.grid
                .set_validation(GridRange::column_segment(col, first_row, last_row), rule)?;
        }
        Ok(())
    }
}

fn check_fields<'f>(
    schema: &TableSchema,
    context: &'static str,
    fields: impl Iterator<Item = &'f String>,
) -> Result<(), DaoError> {
    for field in fields {
        if !schema.has_field(field) {
            return Err(DaoError::UnknownField { context, field: field.clone() });
        }
    }
    Ok(())
}

fn plain_cell(value: &CellValue) -> CellValue {
    match value {
        CellValue::Rich(rich) => CellValue::Text(rich.plain_text().to_string()),
        other => other.clone(),
    }
}

fn rich_cell(value: &CellValue) -> RichTextValue {
    match value {
        CellValue::Rich(rich) => rich.clone(),
        other => RichTextValue::new(other.display_text()),
    }
}

struct Run {
    first_row: u32,
    rows: Vec<Vec<CellValue>>,
}

impl Run {
    fn last_row(&self) -> u32 {
        self.first_row + self.rows.len() as u32 - 1
    }
}

/// Group row-sorted updates into maximal runs of contiguous row numbers.
fn contiguous_runs(sorted: Vec<(u32, Vec<CellValue>)>) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (row, values) in sorted {
        match runs.last_mut() {
            Some(run) if run.first_row + run.rows.len() as u32 == row => run.rows.push(values),
            _ => runs.push(Run { first_row: row, rows: vec![values] }),
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn values(n: u32) -> Vec<CellValue> {
        vec![CellValue::Number(n as f64)]
    }

    #[test]
    fn groups_contiguous_rows_into_runs() {
        let runs = contiguous_runs(vec![
            (2, values(2)),
            (3, values(3)),
            (4, values(4)),
            (7, values(7)),
            (8, values(8)),
            (12, values(12)),
        ]);

        let shapes: Vec<(u32, usize)> = runs.iter().map(|r| (r.first_row, r.rows.len())).collect();
        assert_eq!(shapes, vec![(2, 3), (7, 2), (12, 1)]);
        assert_eq!(runs[0].last_row(), 4);
    }

    #[test]
    fn single_row_is_one_run() {
        let runs = contiguous_runs(vec![(5, values(5))]);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].first_row, 5);
    }

    #[test]
    fn no_rows_no_runs() {
        assert!(contiguous_runs(Vec::new()).is_empty());
    }
}
