//! Text helpers for header-derived field names.

/// Convert a header title to a standard camel-case field name.
///
/// Words are split on whitespace; the first word is lowercased, subsequent
/// words are capitalized (`"Created At"` → `"createdAt"`).
pub fn to_camel_case(s: &str) -> String {
    s.split_whitespace()
        .enumerate()
        .map(|(i, word)| {
            if i == 0 {
                word.to_lowercase()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => {
                        first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                    }
                    None => String::new(),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn camel_cases_header_titles() {
        assert_eq!(to_camel_case("Created At"), "createdAt");
        assert_eq!(to_camel_case("KEY"), "key");
        assert_eq!(to_camel_case("  unit   PRICE  "), "unitPrice");
        assert_eq!(to_camel_case("name"), "name");
        assert_eq!(to_camel_case(""), "");
    }
}
