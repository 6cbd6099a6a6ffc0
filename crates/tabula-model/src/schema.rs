use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::column::{Col, ColumnError};
use crate::formula::{BoundFormula, FormulaTemplate};

/// Errors from table-schema construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("a table schema needs at least one field")]
    NoFields,
    #[error("field names cannot be empty")]
    EmptyFieldName,
    #[error("duplicate field '{0}' in schema")]
    DuplicateField(String),
    #[error("primary key '{0}' is not one of the schema fields")]
    UnknownPrimaryKey(String),
    #[error("{context} references unknown field '{field}'")]
    UnknownField { context: &'static str, field: String },
    #[error("start row must be at least 1")]
    InvalidStartRow,
    #[error(transparent)]
    Column(#[from] ColumnError),
}

/// The immutable shape of one table: an ordered field list laid out
/// left-to-right from `start_col`, a primary key, and the data region's first
/// row.
///
/// Built once by [`TableSchemaBuilder`] and never mutated afterwards; every
/// DAO operation closes over the same schema value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    keys: Vec<String>,
    primary_key: String,
    start_col: Col,
    end_col: Col,
    start_row: u32,
    field_cols: HashMap<String, Col>,
    unique_keys: HashSet<String>,
    formulas: HashMap<String, BoundFormula>,
}

impl TableSchema {
    /// Start building a schema over the given ordered field list.
    pub fn builder(keys: impl IntoIterator<Item = impl Into<String>>) -> TableSchemaBuilder {
        TableSchemaBuilder {
            keys: keys.into_iter().map(Into::into).collect(),
            primary_key: None,
            start_col: "A".to_string(),
            start_row: 1,
            unique_keys: Vec::new(),
            formulas: Vec::new(),
        }
    }

    /// Ordered field names, left-to-right from [`start_col`](Self::start_col).
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Position of the primary key within [`keys`](Self::keys).
    pub fn primary_key_index(&self) -> usize {
        // The builder guarantees membership.
        self.keys.iter().position(|k| *k == self.primary_key).unwrap_or(0)
    }

    pub fn start_col(&self) -> Col {
        self.start_col
    }

    pub fn end_col(&self) -> Col {
        self.end_col
    }

    /// First data row (1-based). A value above 1 excludes header rows.
    pub fn start_row(&self) -> u32 {
        self.start_row
    }

    pub fn field_count(&self) -> usize {
        self.keys.len()
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field_cols.contains_key(name)
    }

    /// Position of a field within [`keys`](Self::keys).
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == name)
    }

    /// The column a field occupies.
    pub fn col_of(&self, field: &str) -> Option<Col> {
        self.field_cols.get(field).copied()
    }

    /// The column of the primary-key field.
    pub fn primary_key_col(&self) -> Col {
        self.field_cols[&self.primary_key]
    }

    /// Fields whose values must be unique across the table. Always contains
    /// the primary key. Uniqueness of non-key fields is a declared invariant;
    /// bulk writes do not yet detect duplicates (documented gap).
    pub fn unique_keys(&self) -> &HashSet<String> {
        &self.unique_keys
    }

    /// Column-bound formulas by field, ready for row expansion at write time.
    pub fn formulas(&self) -> &HashMap<String, BoundFormula> {
        &self.formulas
    }
}

/// Validating builder for [`TableSchema`].
#[derive(Clone, Debug)]
pub struct TableSchemaBuilder {
    keys: Vec<String>,
    primary_key: Option<String>,
    start_col: String,
    start_row: u32,
    unique_keys: Vec<String>,
    formulas: Vec<(String, FormulaTemplate)>,
}

impl TableSchemaBuilder {
    /// The field to use as primary key. Defaults to the first field.
    pub fn primary_key(mut self, field: impl Into<String>) -> Self {
        self.primary_key = Some(field.into());
        self
    }

    /// Column letter where the table starts. Defaults to `"A"`.
    pub fn start_col(mut self, col: impl Into<String>) -> Self {
        self.start_col = col.into();
        self
    }

    /// First data row (1-based). Defaults to 1.
    pub fn start_row(mut self, row: u32) -> Self {
        self.start_row = row;
        self
    }

    /// Shorthand for a single header row: data starts at row 2.
    pub fn with_header(self) -> Self {
        self.start_row(2)
    }

    /// Declare a field whose values must be unique across the table.
    pub fn unique_key(mut self, field: impl Into<String>) -> Self {
        self.unique_keys.push(field.into());
        self
    }

    /// Attach a formula template to a field. See [`FormulaTemplate`].
    pub fn formula(mut self, field: impl Into<String>, template: impl Into<FormulaTemplate>) -> Self {
        self.formulas.push((field.into(), template.into()));
        self
    }

    pub fn build(self) -> Result<TableSchema, SchemaError> {
        if self.keys.is_empty() {
            return Err(SchemaError::NoFields);
        }
        if self.start_row < 1 {
            return Err(SchemaError::InvalidStartRow);
        }

        let mut seen = HashSet::new();
        for key in &self.keys {
            if key.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if !seen.insert(key.clone()) {
                return Err(SchemaError::DuplicateField(key.clone()));
            }
        }

        let start_col = Col::from_name(&self.start_col)?;
        let width = u16::try_from(self.keys.len() - 1).map_err(|_| ColumnError::TableTooWide)?;
        let end_col = start_col.offset(width)?;

        let mut field_cols: HashMap<String, Col> = HashMap::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            field_cols.insert(key.clone(), start_col.offset(i as u16)?);
        }

        let primary_key = self.primary_key.unwrap_or_else(|| self.keys[0].clone());
        if !field_cols.contains_key(&primary_key) {
            return Err(SchemaError::UnknownPrimaryKey(primary_key));
        }

        let mut unique_keys: HashSet<String> = HashSet::new();
        unique_keys.insert(primary_key.clone());
        for field in self.unique_keys {
            if !field_cols.contains_key(&field) {
                return Err(SchemaError::UnknownField { context: "unique key", field });
            }
            unique_keys.insert(field);
        }

        let mut formulas = HashMap::new();
        for (field, template) in self.formulas {
            if !field_cols.contains_key(&field) {
                return Err(SchemaError::UnknownField { context: "formula", field });
            }
            formulas.insert(field, template.bind_columns(&field_cols));
        }

        Ok(TableSchema {
            keys: self.keys,
            primary_key,
            start_col,
            end_col,
            start_row: self.start_row,
            field_cols,
            unique_keys,
            formulas,
        })
    }
}
