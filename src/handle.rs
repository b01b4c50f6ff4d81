//! Handle policy: validation and generation.
//!
//! Validation runs its checks in a fixed order, cheapest first, so the
//! store round-trip for uniqueness only happens for structurally valid
//! candidates. Each failure carries a distinct reason code; a blocked term
//! is reported base64-encoded so the content never propagates into logs or
//! responses.

use anyhow::Result;
use base64ct::{Base64, Encoding};
use rand::Rng;
use serde_json::{json, Value};

use crate::core::Core;
use crate::reply::{Check, Deny, Why};
use crate::resolve::user_exists;

/// Validate a candidate handle; success returns the normalized form.
pub async fn validate_handle(core: &Core, value: &Value) -> Result<Check<String>> {
    let Some(candidate) = value.as_str() else {
        return Ok(Err(Deny::with_details(
            Why::NotString,
            json!({ "handle": value }),
        )));
    };

    let policy = core.options().handle();
    let handle = if policy.downcase() {
        candidate.to_lowercase()
    } else {
        candidate.to_string()
    };

    if core.is_reserved(&handle) {
        return Ok(Err(Deny::with_details(
            Why::Reserved,
            json!({ "handle": handle }),
        )));
    }

    if core.is_disallowed(&handle) {
        // Never echo the blocked term itself.
        return Ok(Err(Deny::with_details(
            Why::Disallowed,
            json!({ "handle_base64": Base64::encode_string(handle.as_bytes()) }),
        )));
    }

    if !policy.matches_charset(&handle) {
        return Ok(Err(Deny::with_details(
            Why::InvalidChars,
            json!({ "handle": handle }),
        )));
    }

    let length = handle.chars().count();
    if length < policy.minlen() {
        return Ok(Err(Deny::with_details(
            Why::HandleTooShort,
            json!({ "handle": handle, "handle_length": length, "minimum": policy.minlen() }),
        )));
    }
    if policy.maxlen() < length {
        return Ok(Err(Deny::with_details(
            Why::HandleTooLong,
            json!({ "handle": handle, "handle_length": length, "maximum": policy.maxlen() }),
        )));
    }

    if user_exists(core, "handle", &json!(handle)).await? {
        return Ok(Err(Deny::with_details(
            Why::HandleExists,
            json!({ "handle": handle }),
        )));
    }

    Ok(Ok(handle))
}

/// Ensure the request carries one canonical handle, generating one when
/// necessary: email local-part plus four random digits, or the configured
/// generator. The result is written back into the request containers so
/// every later step sees the same value.
pub fn ensure_handle(core: &Core, msg: &mut Value) -> String {
    let policy = core.options().handle();

    let container_key = ["user_data", "user"]
        .into_iter()
        .find(|key| msg.get(*key).is_some_and(Value::is_object));

    let existing = msg
        .get("handle")
        .and_then(Value::as_str)
        .or_else(|| {
            container_key
                .and_then(|key| msg.get(key))
                .and_then(|container| container.get("handle"))
                .and_then(Value::as_str)
        })
        .map(ToString::to_string);

    let mut handle = match existing {
        Some(handle) => handle,
        None => {
            let email = msg
                .get("email")
                .and_then(Value::as_str)
                .or_else(|| {
                    container_key
                        .and_then(|key| msg.get(key))
                        .and_then(|container| container.get("email"))
                        .and_then(Value::as_str)
                })
                .map(ToString::to_string);
            match email {
                // NOTE: assumes the email was already validated.
                Some(email) => {
                    let local = email.split('@').next().unwrap_or_default().to_lowercase();
                    let digits: u16 = rand::thread_rng().gen_range(0..10_000);
                    format!("{local}{digits:04}")
                }
                None => core.minter().make_handle(),
            }
        }
    };

    handle = handle.chars().take(policy.maxlen()).collect();
    if policy.downcase() {
        handle = handle.to_lowercase();
    }

    if let Some(map) = msg.as_object_mut() {
        map.insert("handle".to_string(), Value::String(handle.clone()));
    }
    if let Some(container) = container_key.and_then(|key| msg.get_mut(key)) {
        if let Some(map) = container.as_object_mut() {
            map.insert("handle".to_string(), Value::String(handle.clone()));
        }
    }

    handle
}
