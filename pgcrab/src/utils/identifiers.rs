//! SQL identifier checks
//!
//! Database, role and principal names come from configuration and end up
//! unquoted inside DDL, so they are validated instead of escaped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, Result};

/// PostgreSQL truncates identifiers longer than this (NAMEDATALEN - 1)
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

// Lowercase only: unquoted identifiers are case-folded by the server, so a
// mixed-case role would connect under one name and be granted under another
static IDENTIFIER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z_][a-z0-9_$]*$").expect("valid identifier pattern"));

/// Check if a name is a PostgreSQL reserved keyword
///
/// Covers the fully reserved words, the ones reserved except as function or
/// type names, and the role names GRANT treats specially.
pub fn is_sql_keyword(name: &str) -> bool {
    const SQL_KEYWORDS: &[&str] = &[
        // reserved
        "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
        "both", "case", "cast", "check", "collate", "column", "constraint", "create",
        "current_catalog", "current_date", "current_role", "current_time",
        "current_timestamp", "current_user", "default", "deferrable", "desc", "distinct",
        "do", "else", "end", "except", "false", "fetch", "for", "foreign", "from", "grant",
        "group", "having", "in", "initially", "intersect", "into", "lateral", "leading",
        "limit", "localtime", "localtimestamp", "not", "null", "offset", "on", "only", "or",
        "order", "placing", "primary", "references", "returning", "select", "session_user",
        "some", "symmetric", "system_user", "table", "then", "to", "trailing", "true",
        "union", "unique", "user", "using", "variadic", "when", "where", "window", "with",
        // reserved, can be function or type
        "authorization", "binary", "collation", "concurrently", "cross", "current_schema",
        "freeze", "full", "ilike", "inner", "is", "isnull", "join", "left", "like",
        "natural", "notnull", "outer", "overlaps", "right", "similar", "tablesample",
        "verbose",
        // role specifications
        "public", "none",
    ];

    SQL_KEYWORDS.contains(&name.to_lowercase().as_str())
}

/// True if `name` can be placed unquoted into a PostgreSQL statement
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= MAX_IDENTIFIER_LENGTH
        && IDENTIFIER_PATTERN.is_match(name)
        && !is_sql_keyword(name)
}

/// Validate an identifier, returning it unchanged on success
pub fn validate_identifier(name: &str) -> Result<&str> {
    if is_valid_identifier(name) {
        Ok(name)
    } else {
        Err(Error::InvalidIdentifier(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ivt")]
    #[case("ivt_test")]
    #[case("_staging2")]
    #[case("app$db")]
    #[case("owner")]
    fn test_accepts_plain_identifiers(#[case] name: &str) {
        assert!(is_valid_identifier(name));
        assert_eq!(validate_identifier(name).unwrap(), name);
    }

    #[rstest]
    #[case("")]
    #[case("1db")]
    #[case("my-db")]
    #[case("ivt; DROP TABLE users")]
    #[case("\"quoted\"")]
    #[case("user")]
    #[case("TABLE")]
    #[case("Deploy")]
    #[case("ivtTest")]
    #[case("do")]
    #[case("offset")]
    #[case("only")]
    #[case("true")]
    #[case("current_role")]
    #[case("lateral")]
    #[case("public")]
    fn test_rejects_unsafe_identifiers(#[case] name: &str) {
        assert!(!is_valid_identifier(name));
        assert!(matches!(
            validate_identifier(name),
            Err(Error::InvalidIdentifier(n)) if n == name
        ));
    }

    #[test]
    fn test_identifier_length_limit() {
        let longest = "a".repeat(MAX_IDENTIFIER_LENGTH);
        assert!(is_valid_identifier(&longest));
        assert!(!is_valid_identifier(&format!("{}a", longest)));
    }

    #[test]
    fn test_is_sql_keyword() {
        assert!(is_sql_keyword("SELECT"));
        assert!(is_sql_keyword("grant"));
        assert!(is_sql_keyword("Window"));
        assert!(is_sql_keyword("using"));
        assert!(!is_sql_keyword("username"));
    }
}
