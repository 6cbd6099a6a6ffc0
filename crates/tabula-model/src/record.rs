use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::CellValue;

/// A record exchanged with callers: a field-name → value mapping, optionally
/// tagged with the 1-based physical row it occupies.
///
/// Field order is not carried here; the owning [`crate::TableSchema`]'s key
/// list is the authority for column order. A record with `row` set must
/// correspond to a persisted row whose primary-key cell equals the record's
/// primary-key value; the DAO fails fast on violations rather than
/// relocating rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row: Option<u32>,
    fields: HashMap<String, CellValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field assignment.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Builder-style row tag. Only meaningful for records known to exist.
    pub fn with_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<CellValue>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_row(&mut self, row: u32) {
        self.row = Some(row);
    }

    /// The 1-based row this record occupies, if persisted.
    pub fn row(&self) -> Option<u32> {
        self.row
    }

    pub fn field(&self, name: &str) -> Option<&CellValue> {
        self.fields.get(name)
    }

    /// The field's value, with missing and blank treated alike.
    pub fn get(&self, name: &str) -> &CellValue {
        self.fields.get(name).unwrap_or(&CellValue::Empty)
    }

    /// True when the field is absent or holds a blank cell.
    pub fn is_blank(&self, name: &str) -> bool {
        self.get(name).is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
