use serde::{Deserialize, Serialize};
use tabula_model::{key_eq, CellValue, Record};

/// A conjunctive equality filter over in-memory records.
///
/// Terms accumulate through the fluent builder, so a search can be passed
/// between functions and composed further before it runs:
///
/// ```
/// use tabula_dao::Search;
///
/// let search = Search::new().where_eq("active", true).and("key", "two");
/// assert_eq!(search.terms().len(), 2);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Search {
    terms: Vec<(String, CellValue)>,
}

impl Search {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `field` to equal `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.terms.push((field.into(), value.into()));
        self
    }

    /// Alias of [`where_eq`](Search::where_eq) for fluent chains.
    pub fn and(self, field: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.where_eq(field, value)
    }

    pub fn terms(&self) -> &[(String, CellValue)] {
        &self.terms
    }

    /// True when every term matches. A record missing a constrained field is
    /// excluded, not an error. Equality follows key semantics (dates by
    /// instant, rich text by display text), never pointer identity.
    pub fn matches(&self, record: &Record) -> bool {
        self.terms.iter().all(|(field, value)| {
            record.field(field).is_some_and(|actual| key_eq(actual, value))
        })
    }
}

/// Keep only the records matching every term of `search`.
pub fn run_search(search: &Search, records: &[Record]) -> Vec<Record> {
    records.iter().filter(|r| search.matches(r)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn records() -> Vec<Record> {
        vec![
            Record::new().with_field("key", "one").with_field("active", true),
            Record::new().with_field("key", "two").with_field("active", true),
            Record::new().with_field("key", "two").with_field("active", false),
        ]
    }

    #[test]
    fn conjunction_of_terms() {
        let search = Search::new().where_eq("active", true).and("key", "two");
        let found = run_search(&search, &records());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get("key"), &CellValue::Text("two".into()));
        assert_eq!(found[0].get("active"), &CellValue::Bool(true));
    }

    #[test]
    fn empty_search_matches_everything() {
        assert_eq!(run_search(&Search::new(), &records()).len(), 3);
    }

    #[test]
    fn missing_field_excludes_the_record() {
        let search = Search::new().where_eq("missing", 1);
        assert_eq!(run_search(&search, &records()), Vec::new());
    }
}
