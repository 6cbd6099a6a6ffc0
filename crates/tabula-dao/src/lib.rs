//! `tabula-dao` maps between a grid's raw rows and structured records.
//!
//! The [`Dao`] is the engine: it resolves rows by primary key, marshals
//! values through the record codec, serializes all mutations through one
//! coarse document lock, and batches contiguous bulk updates into single
//! range writes. The grid itself, the document lock and sequence counters are
//! external collaborators reached through the [`Grid`], [`DocumentLock`] and
//! [`Sequence`] traits; an in-memory grid and an in-process lock are provided
//! for tests and embedders without a real spreadsheet.
//!
//! Consistency model: mutating operations (`save`, `bulk_save`, `clear`)
//! acquire the lock with a bounded wait, perform all reads needed for
//! consistency, write, flush, and release. Pure reads (`find_all`,
//! `find_by_key`, `find_by_row`) deliberately skip the lock and accept
//! possibly-stale snapshots.

mod codec;
mod dao;
mod error;
mod grid;
mod lock;
mod locator;
mod memory;
mod search;
mod sequence;

pub use codec::{converters, Converter, Enricher};
pub use dao::{Dao, DaoConfig};
pub use error::DaoError;
pub use grid::{ClearOptions, Grid, GridCoord, GridError, GridRange};
pub use lock::{acquire, DocumentLock, LockGuard, LockTimeout, ProcessLock, DEFAULT_LOCK_TIMEOUT};
pub use locator::{first_empty_row, locate, KeyLookup};
pub use memory::MemoryGrid;
pub use search::{run_search, Search};
pub use sequence::{increment, GridSequence, Sequence};
