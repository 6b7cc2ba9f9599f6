//! Column type selection.
//!
//! Two entry points:
//!
//! - [`infer_storage_type`] picks a type for a new column from its name and a
//!   sample value. Name heuristics always win over the sample.
//! - [`parse_declared_type`] maps a caller-declared type string onto the
//!   closed storage set when it can, and screens it otherwise.

use std::sync::OnceLock;

use regex::Regex;

use crate::core::identifier::validate_type_declaration;
use crate::core::schema::{ColumnType, StorageType};
use crate::core::value::Value;
use crate::error::Result;

/// Strings longer than this (in characters) become unbounded text.
pub const MAX_BOUNDED_STRING: usize = 255;

const EMAIL: StorageType = StorageType::VarChar { length: 255 };
const PHONE: StorageType = StorageType::VarChar { length: 20 };
const STRING: StorageType = StorageType::VarChar { length: 255 };
const MONEY: StorageType = StorageType::Decimal {
    precision: 12,
    scale: 2,
};
const FRACTION: StorageType = StorageType::Decimal {
    precision: 10,
    scale: 2,
};

/// Name heuristics in priority order; first substring hit wins.
const NAME_RULES: &[(&[&str], StorageType)] = &[
    (&["email", "mail"], EMAIL),
    (&["phone", "tel"], PHONE),
    (&["url", "website"], StorageType::Text),
    (&["age"], StorageType::Integer),
    (&["salary", "price", "amount"], MONEY),
];

fn email_pattern() -> &'static Regex {
    static EMAIL_PATTERN: OnceLock<Regex> = OnceLock::new();
    EMAIL_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("email pattern is a valid regex")
    })
}

/// Check whether a string looks like an email address.
pub fn is_email_shaped(s: &str) -> bool {
    email_pattern().is_match(s)
}

/// Pick the storage type for a new column.
///
/// Pure and deterministic: the same `(column_name, sample)` always yields the
/// same type.
pub fn infer_storage_type(column_name: &str, sample: &Value) -> StorageType {
    if let Some(t) = type_from_name(column_name) {
        return t;
    }

    match sample {
        Value::Text(s) if is_email_shaped(s) => EMAIL,
        Value::Text(s) if s.chars().count() > MAX_BOUNDED_STRING => StorageType::Text,
        Value::Text(_) => STRING,
        Value::Integer(_) => StorageType::Integer,
        Value::Decimal(_) => FRACTION,
        Value::Bool(_) => StorageType::Boolean,
        Value::Null => StorageType::Text,
    }
}

fn type_from_name(column_name: &str) -> Option<StorageType> {
    let lower = column_name.to_lowercase();
    NAME_RULES
        .iter()
        .find(|(needles, _)| needles.iter().any(|n| lower.contains(n)))
        .map(|(_, t)| *t)
}

/// Map a caller-declared column type onto a [`ColumnType`].
///
/// Known spellings of the closed set (`varchar(n)`, `text`, `integer`,
/// `decimal(p,s)`, `boolean` and their aliases) become storage types.
/// Anything else is kept verbatim after passing the declaration screen.
pub fn parse_declared_type(declaration: &str) -> Result<ColumnType> {
    let decl = declaration.trim().to_lowercase();

    let storage = match decl.as_str() {
        "text" => Some(StorageType::Text),
        "integer" | "int" | "int4" => Some(StorageType::Integer),
        "boolean" | "bool" => Some(StorageType::Boolean),
        _ => parse_parameterized(&decl),
    };

    match storage {
        Some(t) => Ok(ColumnType::Storage(t)),
        None => {
            validate_type_declaration(&decl)?;
            Ok(ColumnType::Declared(decl))
        }
    }
}

fn parse_parameterized(decl: &str) -> Option<StorageType> {
    let (base, args) = decl.split_once('(')?;
    let args = args.strip_suffix(')')?;
    let args: Vec<&str> = args.split(',').map(str::trim).collect();

    match (base.trim(), args.as_slice()) {
        ("varchar" | "character varying", [n]) => {
            n.parse().ok().map(|length| StorageType::VarChar { length })
        }
        ("decimal" | "numeric", [p, s]) => Some(StorageType::Decimal {
            precision: p.parse().ok()?,
            scale: s.parse().ok()?,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    // =========================================================================
    // Name heuristics
    // =========================================================================

    #[test]
    fn test_name_rules() {
        let v = Value::Null;
        assert_eq!(infer_storage_type("email", &v), EMAIL);
        assert_eq!(infer_storage_type("work_mail", &v), EMAIL);
        assert_eq!(infer_storage_type("phone", &v), PHONE);
        assert_eq!(infer_storage_type("tel_home", &v), PHONE);
        assert_eq!(infer_storage_type("homepage_url", &v), StorageType::Text);
        assert_eq!(infer_storage_type("website", &v), StorageType::Text);
        assert_eq!(infer_storage_type("age", &v), StorageType::Integer);
        assert_eq!(infer_storage_type("unit_price", &v), MONEY);
        assert_eq!(infer_storage_type("salary", &v), MONEY);
        assert_eq!(infer_storage_type("amount", &v), MONEY);
    }

    #[test]
    fn test_name_rules_are_case_insensitive() {
        assert_eq!(infer_storage_type("EMAIL", &Value::Integer(1)), EMAIL);
    }

    #[test]
    fn test_name_rule_priority() {
        // "email_age" hits the email rule before the age rule.
        assert_eq!(infer_storage_type("email_age", &Value::Integer(3)), EMAIL);
        // "telephone" is caught by "phone" before "tel"; both give the same type.
        assert_eq!(infer_storage_type("telephone", &Value::Null), PHONE);
    }

    #[test]
    fn test_name_dominates_value() {
        assert_eq!(
            infer_storage_type("email", &Value::Integer(42)),
            infer_storage_type("email", &Value::from("x"))
        );
        assert_eq!(infer_storage_type("age", &Value::from("forty")), StorageType::Integer);
    }

    // =========================================================================
    // Value rules
    // =========================================================================

    #[test]
    fn test_value_rules() {
        assert_eq!(infer_storage_type("contact", &Value::from("a@b.io")), EMAIL);
        assert_eq!(infer_storage_type("title", &Value::from("hi")), STRING);
        assert_eq!(
            infer_storage_type("body", &Value::Text("x".repeat(256))),
            StorageType::Text
        );
        assert_eq!(infer_storage_type("body", &Value::Text("x".repeat(255))), STRING);
        assert_eq!(infer_storage_type("count", &Value::Integer(3)), StorageType::Integer);
        assert_eq!(
            infer_storage_type("ratio", &Value::Decimal(Decimal::new(15, 1))),
            FRACTION
        );
        assert_eq!(infer_storage_type("active", &Value::Bool(true)), StorageType::Boolean);
        assert_eq!(infer_storage_type("notes", &Value::Null), StorageType::Text);
    }

    #[test]
    fn test_long_string_counts_characters() {
        // 255 two-byte characters is still a bounded string.
        assert_eq!(infer_storage_type("body", &Value::Text("é".repeat(255))), STRING);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let sample = Value::from("Bob");
        let first = infer_storage_type("nickname", &sample);
        for _ in 0..10 {
            assert_eq!(infer_storage_type("nickname", &sample), first);
        }
        assert_eq!(first, STRING);
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email_shaped("someone@example.com"));
        assert!(is_email_shaped("first.last+tag@sub.example.org"));
        assert!(!is_email_shaped("not-an-email"));
        assert!(!is_email_shaped("a@b"));
        assert!(!is_email_shaped("a@b.c"));
    }

    // =========================================================================
    // Declared types
    // =========================================================================

    #[test]
    fn test_parse_declared_closed_set() {
        assert_eq!(
            parse_declared_type("VARCHAR(80)").unwrap(),
            ColumnType::Storage(StorageType::VarChar { length: 80 })
        );
        assert_eq!(
            parse_declared_type("numeric(8, 3)").unwrap(),
            ColumnType::Storage(StorageType::Decimal { precision: 8, scale: 3 })
        );
        assert_eq!(
            parse_declared_type(" int ").unwrap(),
            ColumnType::Storage(StorageType::Integer)
        );
        assert_eq!(
            parse_declared_type("BOOL").unwrap(),
            ColumnType::Storage(StorageType::Boolean)
        );
    }

    #[test]
    fn test_parse_declared_passthrough() {
        assert_eq!(
            parse_declared_type("TIMESTAMP").unwrap(),
            ColumnType::Declared("timestamp".into())
        );
        assert!(parse_declared_type("text; drop table users").is_err());
    }
}
