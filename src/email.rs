//! Email policy: syntax validation and tenancy uniqueness.

use anyhow::Result;
use regex::Regex;
use serde_json::{json, Value};

use crate::core::Core;
use crate::reply::{Check, Deny, Why};
use crate::resolve::user_exists;

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

/// Basic RFC-shaped format check.
pub fn valid_email_format(email: &str) -> bool {
    Regex::new(EMAIL_PATTERN).is_ok_and(|regex| regex.is_match(email))
}

/// Validate an email for registration or change: syntax first, then a
/// uniqueness probe. Success returns the email unmodified.
pub async fn validate_email(core: &Core, value: &Value) -> Result<Check<String>> {
    let Some(email) = value.as_str() else {
        return Ok(Err(Deny::with_details(
            Why::EmailInvalidFormat,
            json!({ "email": value }),
        )));
    };

    if !valid_email_format(email) {
        return Ok(Err(Deny::with_details(
            Why::EmailInvalidFormat,
            json!({ "email": email }),
        )));
    }

    if user_exists(core, "email", &json!(email)).await? {
        return Ok(Err(Deny::with_details(
            Why::EmailExists,
            json!({ "email": email }),
        )));
    }

    Ok(Ok(email.to_string()))
}
