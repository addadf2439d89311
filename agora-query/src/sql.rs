//! SQL generation utilities.

/// Words that must be quoted when used as identifiers.
const RESERVED: &[&str] = &[
    "all", "and", "as", "between", "case", "check", "create", "default", "delete", "desc",
    "distinct", "do", "else", "end", "except", "foreign", "from", "group", "having", "in",
    "index", "insert", "intersect", "into", "is", "join", "key", "left", "like", "limit",
    "not", "null", "offset", "on", "or", "order", "primary", "returning", "right", "select",
    "set", "table", "then", "union", "update", "user", "using", "values", "when", "where",
];

/// Wrap an identifier in double quotes, doubling embedded quotes.
pub fn escape_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Whether an identifier is reserved or contains characters that need quoting.
pub fn needs_quoting(name: &str) -> bool {
    if RESERVED.contains(&name.to_ascii_lowercase().as_str()) {
        return true;
    }
    name.is_empty()
        || name.starts_with(|c: char| c.is_ascii_digit())
        || !name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Quote an identifier if needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name)
    } else {
        name.to_string()
    }
}

/// PostgreSQL placeholder for a 1-based parameter index.
#[inline]
pub fn placeholder(index: usize) -> String {
    format!("${}", index)
}

/// Comma-separated, quoted column list.
pub fn column_list<S: AsRef<str>>(columns: &[S]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(c.as_ref()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `$start, $start+1, ...` for `count` parameters.
pub fn placeholder_list(start: usize, count: usize) -> String {
    (start..start + count)
        .map(placeholder)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("user"), "\"user\"");
        assert_eq!(escape_identifier("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_needs_quoting() {
        assert!(needs_quoting("order"));
        assert!(needs_quoting("has space"));
        assert!(needs_quoting("MixedCase"));
        assert!(needs_quoting("1st"));
        assert!(!needs_quoting("content_items"));
        assert!(!needs_quoting("_count"));
    }

    #[test]
    fn test_column_list() {
        assert_eq!(column_list(&["id", "order", "title"]), "id, \"order\", title");
    }

    #[test]
    fn test_placeholder_list() {
        assert_eq!(placeholder_list(3, 3), "$3, $4, $5");
        assert_eq!(placeholder_list(1, 0), "");
    }
}
