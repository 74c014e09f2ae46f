//! # Utility Module
//!
//! Small helpers shared by the query DSL, the SQL builder and the schema
//! editor: identifier and string-literal quoting.

/// Quotes an SQL identifier with double quotes.
///
/// Quoting is idempotent: an identifier that already starts with a double
/// quote passes through unchanged.
///
/// # Example
///
/// ```rust,ignore
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("\"users\""), "\"users\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    if name.starts_with('"') {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

/// Wraps a string value in single quotes.
///
/// No escaping is performed: it is the caller's contract to pass safe
/// literals for non-parameterised emission.
pub fn quote_literal(value: &str) -> String {
    format!("'{value}'")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident_is_idempotent() {
        assert_eq!(quote_ident("users"), "\"users\"");
        assert_eq!(quote_ident("\"users\""), "\"users\"");
    }

    #[test]
    fn test_quote_literal_does_not_escape() {
        assert_eq!(quote_literal("John"), "'John'");
    }
}
