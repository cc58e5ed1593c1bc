//! Column header normalization.

/// Normalize a column name: trim surrounding whitespace, lowercase, and
/// replace interior spaces with underscores.
///
/// Applying it twice yields the same name as applying it once.
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Normalize every name in order. Duplicates are passed through as-is.
pub fn normalize_headers<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    names.into_iter().map(normalize_header).collect()
}
