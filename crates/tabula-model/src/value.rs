use std::fmt;

use chrono::NaiveDateTime;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

pub use crate::rich_text::RichTextValue;

/// Versioned, JSON-friendly representation of a cell value.
///
/// The enum uses an explicit `{type, value}` tagged layout for stable
/// serialization across process boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Empty / unset cell value.
    Empty,
    /// IEEE-754 double precision number.
    Number(f64),
    /// Boolean.
    Bool(bool),
    /// Plain string (not rich text).
    Text(String),
    /// Date/time value. Key comparisons use the underlying instant.
    Date(NaiveDateTime),
    /// Grid formula in display form (leading `=`), evaluated by the backend.
    Formula(String),
    /// Rich text value (display text + optional hyperlink).
    Rich(RichTextValue),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    /// Returns true if the value is [`CellValue::Empty`].
    ///
    /// Numeric zero, `false` and the empty string are *not* empty: a blank
    /// cell is the only thing that terminates a key scan.
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// The value as display text, used in error messages and as the plain
    /// projection of rich cells.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d %H:%M:%S").to_string(),
            CellValue::Formula(f) => f.clone(),
            CellValue::Rich(r) => r.plain_text().to_string(),
        }
    }

    /// Hashable key projection, or `None` for a blank cell.
    ///
    /// This is the single definition of key identity: primitives project
    /// structurally, dates project to their instant, rich values to their
    /// display text. The row locator, the bulk-save index and the search
    /// filter all agree because they all go through here.
    pub fn key_repr(&self) -> Option<KeyRepr> {
        match self {
            CellValue::Empty => None,
            CellValue::Number(n) => Some(KeyRepr::Number(OrderedFloat(*n))),
            CellValue::Bool(b) => Some(KeyRepr::Bool(*b)),
            CellValue::Text(s) => Some(KeyRepr::Text(s.clone())),
            CellValue::Date(d) => Some(KeyRepr::Instant(d.and_utc().timestamp_millis())),
            CellValue::Formula(f) => Some(KeyRepr::Text(f.clone())),
            CellValue::Rich(r) => Some(KeyRepr::Text(r.plain_text().to_string())),
        }
    }
}

/// Key equality: structural for primitives, instant-based for dates,
/// display-text for rich values. Blank cells never equal anything.
pub fn key_eq(a: &CellValue, b: &CellValue) -> bool {
    match (a.key_repr(), b.key_repr()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Canonical hashable projection of a key value. See [`CellValue::key_repr`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyRepr {
    Number(OrderedFloat<f64>),
    Bool(bool),
    Text(String),
    Instant(i64),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_text())
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::Date(value)
    }
}

impl From<RichTextValue> for CellValue {
    fn from(value: RichTextValue) -> Self {
        CellValue::Rich(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Empty)
    }
}
