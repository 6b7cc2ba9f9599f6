//! Identifier sanitization and quoting for generated SQL.
//!
//! Relation and column names arrive from callers, but SQL identifiers cannot be
//! bound as statement parameters. Every identifier that reaches a statement
//! therefore goes through two gates:
//!
//! 1. [`sanitize`] reduces the caller's label to the allow-list `[a-z0-9_]`
//! 2. [`quote_pg`] validates the result and wraps it in double quotes
//!
//! Values are never interpolated; they are always bound parameters.

use crate::error::{EngineError, Result};

/// Maximum identifier length in bytes (PostgreSQL NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

/// Normalize a caller-supplied label into a storage identifier.
///
/// Lowercases, turns spaces into underscores, then deletes every character
/// outside `[a-z0-9_]`. Total and idempotent; the result may be empty, which
/// callers must reject (see [`sanitize_identifier`]).
///
/// # Examples
///
/// ```
/// use pg_record_engine::core::identifier::sanitize;
///
/// assert_eq!(sanitize("First Name"), "first_name");
/// assert_eq!(sanitize("e-mail!"), "email");
/// assert_eq!(sanitize("!!!"), "");
/// ```
pub fn sanitize(label: &str) -> String {
    label
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' { '_' } else { c })
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        .collect()
}

/// Validate an identifier that is about to be used in a statement.
///
/// Rejects:
/// - Empty identifiers
/// - Identifiers exceeding [`MAX_IDENTIFIER_LENGTH`]
/// - Anything outside the sanitizer's alphabet
pub fn validate_identifier(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EngineError::Validation(
            "identifier cannot be empty".to_string(),
        ));
    }

    if name.len() > MAX_IDENTIFIER_LENGTH {
        return Err(EngineError::Validation(format!(
            "identifier exceeds maximum length of {} bytes (got {} bytes): {:?}",
            MAX_IDENTIFIER_LENGTH,
            name.len(),
            name
        )));
    }

    if !name
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
    {
        return Err(EngineError::Validation(format!(
            "identifier contains characters outside [a-z0-9_]: {:?}",
            name
        )));
    }

    Ok(())
}

/// Sanitize a label and reject degenerate results.
pub fn sanitize_identifier(label: &str) -> Result<String> {
    let name = sanitize(label);
    if name.is_empty() {
        return Err(EngineError::Validation(format!(
            "{:?} does not contain any usable identifier characters",
            label
        )));
    }
    validate_identifier(&name)?;
    Ok(name)
}

/// Quote a PostgreSQL identifier.
///
/// Validates the identifier, escapes double quotes by doubling them and
/// wraps the result in double quotes.
///
/// ```ignore
/// assert_eq!(quote_pg("users")?, "\"users\"");
/// ```
pub fn quote_pg(name: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!("\"{}\"", name.replace('"', "\"\"")))
}

/// Qualify a PostgreSQL relation name with schema.
///
/// Returns `"schema"."relation"` with proper quoting.
pub fn qualify_pg(schema: &str, relation: &str) -> Result<String> {
    Ok(format!("{}.{}", quote_pg(schema)?, quote_pg(relation)?))
}

/// Screen a caller-declared column type before it is spliced into DDL.
///
/// Declared types (`timestamp`, `varchar(80)`, `numeric(8,3)`) are trusted to
/// be meaningful but not to be safe. Only lowercase words, digits, spaces,
/// underscores, commas and parentheses are accepted, which rules out
/// statement separators, comments and quoting.
pub fn validate_type_declaration(declaration: &str) -> Result<()> {
    let decl = declaration.trim();

    if decl.is_empty() {
        return Err(EngineError::Validation(
            "column type cannot be empty".to_string(),
        ));
    }

    if decl.contains(';') || decl.contains("--") || decl.contains("/*") {
        return Err(EngineError::Validation(format!(
            "column type contains statement or comment markers: {:?}",
            declaration
        )));
    }

    if !decl.starts_with(|c: char| c.is_ascii_lowercase()) {
        return Err(EngineError::Validation(format!(
            "column type must start with a letter: {:?}",
            declaration
        )));
    }

    if !decl
        .chars()
        .all(|c| matches!(c, 'a'..='z' | '0'..='9' | ' ' | '_' | '(' | ')' | ','))
    {
        return Err(EngineError::Validation(format!(
            "column type contains disallowed characters: {:?}",
            declaration
        )));
    }

    let depth = decl.chars().try_fold(0i32, |depth, c| {
        let next = match c {
            '(' => depth + 1,
            ')' => depth - 1,
            _ => depth,
        };
        (next >= 0).then_some(next)
    });
    if depth != Some(0) {
        return Err(EngineError::Validation(format!(
            "column type has unbalanced parentheses: {:?}",
            declaration
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<&'static str> {
        vec![
            "",
            "id",
            "First Name",
            "  padded  ",
            "e-mail",
            "Robert'); DROP TABLE users;--",
            "\"quoted\"",
            "ÉCOLE",
            "数据",
            "tab\tseparated",
            "under_score_9",
            "MiXeD CaSe 123",
            "!!!",
        ]
    }

    // =========================================================================
    // Sanitizer
    // =========================================================================

    #[test]
    fn test_sanitize_lowercases_and_replaces_spaces() {
        assert_eq!(sanitize("First Name"), "first_name");
        assert_eq!(sanitize("MiXeD CaSe 123"), "mixed_case_123");
    }

    #[test]
    fn test_sanitize_deletes_rather_than_substitutes() {
        assert_eq!(sanitize("e-mail"), "email");
        assert_eq!(sanitize("Robert'); DROP TABLE users;--"), "robert_drop_table_users");
        assert_eq!(sanitize("tab\tseparated"), "tabseparated");
    }

    #[test]
    fn test_sanitize_may_produce_empty() {
        assert_eq!(sanitize("!!!"), "");
        assert_eq!(sanitize("数据"), "");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in samples() {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_sanitize_output_alphabet() {
        for input in samples() {
            let out = sanitize(input);
            assert!(
                out.chars().all(|c| matches!(c, 'a'..='z' | '0'..='9' | '_')),
                "input {:?} produced {:?}",
                input,
                out
            );
        }
    }

    #[test]
    fn test_sanitize_collisions_are_possible() {
        assert_eq!(sanitize("nick-name"), sanitize("nickname"));
    }

    #[test]
    fn test_sanitize_identifier_rejects_empty() {
        assert!(matches!(
            sanitize_identifier("???"),
            Err(EngineError::Validation(_))
        ));
        assert_eq!(sanitize_identifier("Events").unwrap(), "events");
    }

    // =========================================================================
    // Validation and quoting
    // =========================================================================

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH)).is_ok());
        assert!(validate_identifier(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
        assert!(validate_identifier("Users").is_err());
        assert!(validate_identifier("a\"b").is_err());
    }

    #[test]
    fn test_quote_pg() {
        assert_eq!(quote_pg("users").unwrap(), "\"users\"");
        assert!(quote_pg("").is_err());
        assert!(quote_pg("bad name").is_err());
    }

    #[test]
    fn test_qualify_pg() {
        assert_eq!(
            qualify_pg("public", "events").unwrap(),
            "\"public\".\"events\""
        );
    }

    // =========================================================================
    // Declared types
    // =========================================================================

    #[test]
    fn test_type_declaration_accepts_common_types() {
        for decl in [
            "timestamp",
            "varchar(80)",
            "numeric(8, 3)",
            "double precision",
            "timestamp with time zone",
            "jsonb",
        ] {
            assert!(validate_type_declaration(decl).is_ok(), "{}", decl);
        }
    }

    #[test]
    fn test_type_declaration_rejects_injection() {
        for decl in [
            "text; DROP TABLE users",
            "text -- comment",
            "text /* x */",
            "text default 'x'",
            "text\"",
            "(text",
            "text)",
            "",
            "1text",
        ] {
            assert!(validate_type_declaration(decl).is_err(), "{}", decl);
        }
    }
}
