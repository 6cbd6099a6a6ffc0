use std::collections::HashMap;
use std::sync::Arc;

use tabula_model::{CellValue, Record, RichTextValue, TableSchema};

/// A per-field write transform: raw field value → cell representation.
///
/// Fields without a converter pass through unchanged, keeping their native
/// cell type in the bulk write. A converter that produces
/// [`CellValue::Rich`] additionally earns its field a per-column rich write.
pub type Converter = Arc<dyn Fn(&CellValue) -> CellValue + Send + Sync>;

/// A read-time transform applied after a record is built from raw row
/// values, for derived/computed fields.
pub type Enricher = Arc<dyn Fn(Record) -> Record + Send + Sync>;

/// Converter constructors.
pub mod converters {
    use super::*;

    /// Wrap the value as plain display text; blank becomes the empty string.
    pub fn plain_text() -> Converter {
        Arc::new(|value| CellValue::Text(value.display_text()))
    }

    /// Rich value whose link is computed from the cell value.
    ///
    /// The text stays the value's display text, so the cell still works as a
    /// lookup key.
    pub fn hyperlink(url: impl Fn(&CellValue) -> String + Send + Sync + 'static) -> Converter {
        Arc::new(move |value| {
            CellValue::Rich(RichTextValue::with_link(value.display_text(), url(value)))
        })
    }
}

/// Converts between one grid row (a flat ordered value list) and a keyed
/// [`Record`], in schema key order.
pub(crate) struct RecordCodec<'a> {
    schema: &'a TableSchema,
    converters: &'a HashMap<String, Converter>,
    enricher: Option<&'a Enricher>,
}

impl<'a> RecordCodec<'a> {
    pub fn new(
        schema: &'a TableSchema,
        converters: &'a HashMap<String, Converter>,
        enricher: Option<&'a Enricher>,
    ) -> Self {
        Self { schema, converters, enricher }
    }

    /// Zip raw row values with the schema's keys; attach `row` if given;
    /// apply the enricher last.
    pub fn decode_row(&self, values: Vec<CellValue>, row: Option<u32>) -> Record {
        let mut record = Record::new();
        let mut values = values.into_iter();
        for key in self.schema.keys() {
            record.insert(key.clone(), values.next().unwrap_or(CellValue::Empty));
        }
        if let Some(row) = row {
            record.set_row(row);
        }
        match self.enricher {
            Some(enrich) => enrich(record),
            None => record,
        }
    }

    /// One ordered cell array for the record, converters applied. Used both
    /// for existing-key comparison and for writing.
    pub fn encode(&self, record: &Record) -> Vec<CellValue> {
        self.schema
            .keys()
            .iter()
            .map(|key| {
                let raw = record.get(key);
                match self.converters.get(key) {
                    Some(convert) => convert(raw),
                    None => raw.clone(),
                }
            })
            .collect()
    }
}
