use serde::{Deserialize, Serialize};

use crate::serde_defaults;

/// A declarative data-validation rule applied to a field's column on write.
///
/// The DAO only forwards rules to the grid collaborator; interpretation
/// (rejecting input, rendering dropdowns or checkboxes) is the backend's job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    /// Cell value must be one of the listed options.
    OneOfList {
        values: Vec<String>,
        #[serde(
            default = "serde_defaults::default_true",
            skip_serializing_if = "serde_defaults::is_true"
        )]
        show_dropdown: bool,
    },
    /// Numeric value within an inclusive range.
    NumberBetween { min: f64, max: f64 },
    /// Boolean cell rendered as a checkbox.
    Checkbox,
    /// Cell must hold non-empty text.
    RequireText,
}

impl ValidationRule {
    pub fn one_of(values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        ValidationRule::OneOfList {
            values: values.into_iter().map(Into::into).collect(),
            show_dropdown: true,
        }
    }
}
