use tabula_model::SchemaError;
use thiserror::Error;

use crate::grid::GridError;
use crate::lock::LockTimeout;

/// Unified error type for DAO operations.
///
/// Every error aborts the operation entirely; there are no partial-success
/// returns and no internal retries. Messages carry the offending key, field
/// or row so they can be surfaced to an operator directly.
#[derive(Debug, Error)]
pub enum DaoError {
    /// The bounded lock wait elapsed.
    #[error(transparent)]
    LockTimeout(#[from] LockTimeout),

    /// Lookup found no row for the key.
    #[error("could not find '{key}'")]
    KeyNotFound { key: String },

    /// Lookup found more than one row for the key.
    #[error("key '{key}' is ambiguous: {count} rows hold it")]
    AmbiguousKey { key: String, count: usize },

    /// The row's primary-key cell is blank; there is no record there.
    #[error("no record found at row {row}")]
    NoRecordAtRow { row: u32 },

    /// The record claims a row, but its key resolves to "would create new".
    #[error("record '{key}' claims row {row} but does not exist in the table")]
    RowForMissingRecord { key: String, row: u32 },

    /// The record's claimed row disagrees with where its key actually lives.
    #[error("record '{key}' claims row {claimed} but its key resolves to row {resolved}")]
    RowMismatch { key: String, claimed: u32, resolved: u32 },

    /// A bulk-save record claims a row without carrying a primary-key value.
    #[error("record claims row {row} but has no value for primary key '{field}'")]
    RowWithoutKey { row: u32, field: String },

    /// No primary-key value and no sequence configured to mint one.
    #[error("record has no value for primary key '{field}' and no sequence is configured to mint one")]
    MissingKey { field: String },

    /// DAO configuration names a field the schema does not have.
    #[error("{context} references unknown field '{field}'")]
    UnknownField { context: &'static str, field: String },

    /// Schema construction failure (invalid start column, table too wide, …).
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Grid collaborator failure.
    #[error(transparent)]
    Grid(#[from] GridError),

    /// Schema inference found no header values to build fields from.
    #[error("no header values found at or after column '{col}'")]
    NoHeader { col: String },
}
