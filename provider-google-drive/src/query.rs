//! Drive v3 search-query construction.
//!
//! Values are embedded in single-quoted string literals, so they must be
//! escaped before they reach `q=`.

/// Escape a value for use inside a single-quoted query literal.
///
/// Backslashes are escaped first so the quote escapes are not doubled.
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Non-trashed children of `container_id` named exactly `name`.
pub fn child_named(container_id: &str, name: &str) -> String {
    format!(
        "'{}' in parents and name = '{}' and trashed = false",
        escape_query_value(container_id),
        escape_query_value(name)
    )
}

/// All non-trashed children of `folder_id`.
pub fn children_of(folder_id: &str) -> String {
    format!(
        "'{}' in parents and trashed = false",
        escape_query_value(folder_id)
    )
}
