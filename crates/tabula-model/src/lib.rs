//! `tabula-model` defines the core data structures for Tabula record stores.
//!
//! The crate is intentionally self-contained so it can be reused by:
//! - the DAO engine (`tabula-dao`: row resolution, batched writes, locking)
//! - grid backends that marshal cell values in and out of real spreadsheets
//! - embedding applications via `serde` (JSON-safe schema)
//!
//! Nothing in this crate performs I/O; it describes tables (ordered field
//! lists over a column range), the values their cells can hold, and the
//! records exchanged with callers.

mod column;
mod formula;
mod record;
mod rich_text;
mod schema;
mod serde_defaults;
pub mod text;
mod validation;
mod value;

pub use column::{
    calculate_end_column, column_references, Col, ColumnError, COLUMN_COUNT, MAX_COL_INDEX,
};
pub use formula::{BoundFormula, FormulaTemplate};
pub use record::Record;
pub use rich_text::RichTextValue;
pub use schema::{SchemaError, TableSchema, TableSchemaBuilder};
pub use validation::ValidationRule;
pub use value::{key_eq, CellValue, KeyRepr};
