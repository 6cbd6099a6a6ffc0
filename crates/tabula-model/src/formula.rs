//! Two-phase formula templating.
//!
//! # Invariant
//!
//! A template goes through two substitution passes with disjoint bracket
//! vocabularies:
//! 1. **Column binding** (schema construction): every `[fieldName]` token is
//!    replaced with that field's column letter, producing a [`BoundFormula`].
//! 2. **Row expansion** (write time): `[row]`, `[firstRow]` and
//!    `[previousRow]` are replaced with concrete 1-based row numbers.
//!
//! Substitution is literal replacement of all occurrences, so pass order
//! within a phase does not matter. The expanded result always carries a
//! leading `=`; templates may omit it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::Col;

/// An unbound formula template, as supplied to the schema builder.
///
/// Example: `"[price][row]*[qty][row]"` with fields `price` in column `B`
/// and `qty` in column `C` expands to `"=B5*C5"` for row 5.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormulaTemplate(String);

impl FormulaTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Phase 1: substitute `[fieldName]` tokens with column letters.
    ///
    /// Unknown bracketed tokens are left untouched; the row tokens are
    /// expanded later by [`BoundFormula::at_row`].
    pub fn bind_columns(&self, field_cols: &HashMap<String, Col>) -> BoundFormula {
        let mut expanded = self.0.clone();
        for (field, col) in field_cols {
            expanded = expanded.replace(&format!("[{field}]"), &col.name());
        }
        BoundFormula(expanded)
    }
}

impl From<&str> for FormulaTemplate {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FormulaTemplate {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A formula with columns bound, still carrying row placeholders.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundFormula(String);

impl BoundFormula {
    /// Phase 2: substitute row tokens for a concrete target row and return
    /// the grid-ready formula text (leading `=` guaranteed).
    pub fn at_row(&self, row: u32, first_row: u32) -> String {
        let expanded = self
            .0
            .replace("[row]", &row.to_string())
            .replace("[firstRow]", &first_row.to_string())
            .replace("[previousRow]", &row.saturating_sub(1).to_string());

        if expanded.starts_with('=') {
            expanded
        } else {
            format!("={expanded}")
        }
    }
}
