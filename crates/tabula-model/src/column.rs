use core::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Number of addressable columns, `A` through `ZZ`.
pub const COLUMN_COUNT: usize = 702;

/// Highest addressable 0-based column index (`ZZ`).
pub const MAX_COL_INDEX: u16 = 701;

/// Errors from column arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColumnError {
    #[error("invalid start column '{0}' provided")]
    InvalidStartColumn(String),
    #[error("tables are only supported up to column ZZ")]
    TableTooWide,
}

/// A reference to a single grid column.
///
/// Columns are **0-indexed** internally (`0` is column `A`) and capped at
/// [`MAX_COL_INDEX`] (`ZZ`). Column letters use bijective base-26: there is no
/// "zero" digit, so `Z` (25) is followed by `AA` (26), not `BA`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Col(u16);

impl<'de> Deserialize<'de> for Col {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = u16::deserialize(deserializer)?;
        Col::new(raw).ok_or_else(|| D::Error::custom(format!("column index out of bounds: {raw}")))
    }
}

impl Col {
    /// Column `A`.
    pub const FIRST: Col = Col(0);

    /// Column `ZZ`, the last column a table may occupy.
    pub const LAST: Col = Col(MAX_COL_INDEX);

    /// Construct from a 0-based index. Returns `None` past `ZZ`.
    pub const fn new(index: u16) -> Option<Self> {
        if index <= MAX_COL_INDEX {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Parse a column letter reference (e.g. `A`, `BC`).
    ///
    /// Accepts only references within `A..=ZZ`; anything else (including
    /// three-letter references and lowercase input) is an
    /// [`ColumnError::InvalidStartColumn`].
    pub fn from_name(name: &str) -> Result<Self, ColumnError> {
        let invalid = || ColumnError::InvalidStartColumn(name.to_string());

        if name.is_empty() || name.len() > 2 {
            return Err(invalid());
        }

        let mut index: u32 = 0;
        for b in name.bytes() {
            if !b.is_ascii_uppercase() {
                return Err(invalid());
            }
            index = index * 26 + (b - b'A' + 1) as u32;
        }

        // index is 1-based after the bijective accumulation above.
        let index = (index - 1) as u16;
        Col::new(index).ok_or_else(invalid)
    }

    /// The 0-based index.
    #[inline]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// The column letters (`A`, `B`, .., `AA`, .., `ZZ`).
    pub fn name(self) -> String {
        let n = self.0;
        if n < 26 {
            ((b'A' + n as u8) as char).to_string()
        } else {
            let first = (n / 26) - 1;
            let second = n % 26;
            let mut s = String::with_capacity(2);
            s.push((b'A' + first as u8) as char);
            s.push((b'A' + second as u8) as char);
            s
        }
    }

    /// The column `by` positions to the right.
    ///
    /// Fails with [`ColumnError::TableTooWide`] past `ZZ`.
    pub fn offset(self, by: u16) -> Result<Self, ColumnError> {
        self.0
            .checked_add(by)
            .and_then(Col::new)
            .ok_or(ColumnError::TableTooWide)
    }
}

impl fmt::Display for Col {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// The full ordered sequence of column references, `"A"` through `"ZZ"`.
pub fn column_references() -> Vec<String> {
    (0..=MAX_COL_INDEX).map(|i| Col(i).name()).collect()
}

/// The column `field_count - 1` positions to the right of `start_col`.
///
/// This is the last column of a table whose first field sits at `start_col`.
pub fn calculate_end_column(start_col: &str, field_count: usize) -> Result<Col, ColumnError> {
    let start = Col::from_name(start_col)?;
    let width = u16::try_from(field_count.saturating_sub(1)).map_err(|_| ColumnError::TableTooWide)?;
    start.offset(width)
}
