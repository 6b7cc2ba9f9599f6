//! Payload domain rules, checked before any schema or row is touched.

use crate::core::identifier::sanitize;
use crate::core::value::{Record, Value};
use crate::error::{EngineError, Result};
use crate::typemap::is_email_shaped;

/// Column whose value must look like an email address when present.
pub const EMAIL_FIELD: &str = "email";

/// Check a write payload against the domain rules.
///
/// Rules apply to the column a key is stored under, so `Email` and `EMAIL`
/// are held to the email rule too. Every violation is collected so the
/// caller sees them all at once.
pub fn validate_payload(payload: &Record) -> Result<()> {
    let mut errors = Vec::new();

    for (key, value) in payload.iter() {
        if key != EMAIL_FIELD && sanitize(key) != EMAIL_FIELD {
            continue;
        }
        match value {
            Value::Null => {}
            Value::Text(s) if is_email_shaped(s) => {}
            Value::Text(s) => errors.push(format!("invalid email format: '{}'", s)),
            other => errors.push(format!(
                "{} must be a string, got {}",
                key,
                other.kind()
            )),
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(errors.join("; ")))
    }
}
