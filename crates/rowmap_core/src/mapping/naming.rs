//! Property/column naming convention.
//!
//! Properties are camelCase, columns are snake_case. For every property that
//! starts with a lowercase ASCII letter and contains only ASCII letters and
//! digits, `column_to_property(&property_to_column(p)) == p`.

use once_cell::sync::Lazy;
use regex::Regex;

static INTERIOR_UPPERCASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\B[A-Z]").expect("valid interior uppercase regex"));

/// `firstName` -> `first_name`.
pub fn property_to_column(property: &str) -> String {
    INTERIOR_UPPERCASE_RE
        .replace_all(property, "_${0}")
        .to_lowercase()
}

/// `first_name` -> `firstName`.
pub fn column_to_property(column: &str) -> String {
    let joined: String = column
        .split('_')
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();

    let mut chars = joined.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
