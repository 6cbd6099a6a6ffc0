//! Small helpers for `#[serde(default = "...")]` attributes.

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn is_true(value: &bool) -> bool {
    *value
}
