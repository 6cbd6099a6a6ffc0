use serde::{Deserialize, Serialize};

/// A cell value combining display text with an optional hyperlink.
///
/// Grid backends that support rich cells render `text` and attach `link` as
/// the cell's hyperlink target. Anywhere a rich value is used as a key it
/// compares by its [`plain_text`](RichTextValue::plain_text) alone.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RichTextValue {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl RichTextValue {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: None,
        }
    }

    pub fn with_link(text: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            link: Some(link.into()),
        }
    }

    /// The visible text, usable as a lookup key.
    pub fn plain_text(&self) -> &str {
        &self.text
    }

    pub fn is_plain(&self) -> bool {
        self.link.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_is_optional() {
        let plain = RichTextValue::new("ticket-42");
        assert!(plain.is_plain());
        assert_eq!(plain.plain_text(), "ticket-42");

        let linked = RichTextValue::with_link("ticket-42", "https://example.org/t/42");
        assert!(!linked.is_plain());
        assert_eq!(linked.plain_text(), "ticket-42");
    }

    #[test]
    fn serde_skips_missing_link() {
        let json = serde_json::to_string(&RichTextValue::new("x")).unwrap();
        assert_eq!(json, r#"{"text":"x"}"#);
    }
}
