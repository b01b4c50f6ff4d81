//! Flat request helpers.
//!
//! The accepted aliases, containers, and precedence orders live here as
//! data, not as branching scattered through handlers. Requests are plain
//! JSON objects; these helpers read them without panicking on any shape.

use secrecy::SecretString;
use serde_json::{Map, Value};

/// Top-level shortcut fields folded into a resolution query, by decreasing
/// precedence. Only the first one present is used.
pub(crate) const CONVENIENCE_FIELDS: [&str; 5] = ["id", "user_id", "handle", "email", "name"];

/// Containers a password may arrive in, by decreasing precedence.
/// `None` is the top level of the request.
pub(crate) const PASS_CONTAINERS: [Option<&str>; 3] = [None, Some("user"), Some("user_data")];

/// Fields the generic update path must never touch; each has a dedicated
/// operation or is store-owned.
pub(crate) const PROTECTED_FIELDS: [&str; 8] = [
    "id", "user_id", "handle", "email", "pass", "salt", "active", "nick",
];

pub(crate) fn str_field<'a>(msg: &'a Value, key: &str) -> Option<&'a str> {
    msg.get(key).and_then(Value::as_str)
}

pub(crate) fn bool_field(msg: &Value, key: &str) -> Option<bool> {
    msg.get(key).and_then(Value::as_bool)
}

pub(crate) fn i64_field(msg: &Value, key: &str) -> Option<i64> {
    msg.get(key).and_then(Value::as_i64)
}

pub(crate) fn object_field<'a>(msg: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    msg.get(key).and_then(Value::as_object)
}

/// A `fields` request entry: the caller's extra projection names.
pub(crate) fn string_list(msg: &Value, key: &str) -> Vec<String> {
    msg.get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Plaintext password material extracted from a request.
pub struct PassInput {
    pub pass: SecretString,
    pub repeat: Option<SecretString>,
}

fn pass_from_container(container: &Value) -> Option<PassInput> {
    let pass = str_field(container, "pass").or_else(|| str_field(container, "password"))?;
    Some(PassInput {
        pass: SecretString::from(pass.to_string()),
        repeat: str_field(container, "repeat").map(|repeat| SecretString::from(repeat.to_string())),
    })
}

/// Find password material under any accepted alias/container. The first
/// container carrying one wins; the repeat value must come from the same
/// container as the password it confirms.
pub(crate) fn extract_pass(msg: &Value) -> Option<PassInput> {
    PASS_CONTAINERS.iter().find_map(|container| {
        let scope = match container {
            None => msg,
            Some(key) => msg.get(*key)?,
        };
        pass_from_container(scope)
    })
}

/// Standard projection plus caller extras, de-duplicated, order preserved.
pub(crate) fn projection(standard: &[String], requested: &[String], extra: &[&str]) -> Vec<String> {
    let mut fields: Vec<String> = Vec::new();
    for name in standard
        .iter()
        .map(String::as_str)
        .chain(requested.iter().map(String::as_str))
        .chain(extra.iter().copied())
    {
        if !fields.iter().any(|existing| existing == name) {
            fields.push(name.to_string());
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn extract_pass_prefers_top_level() {
        let msg = json!({
            "pass": "top-secret",
            "user": {"password": "inner-secret", "repeat": "inner-secret"}
        });
        let input = extract_pass(&msg).unwrap();
        assert_eq!(input.pass.expose_secret(), "top-secret");
        assert!(input.repeat.is_none());
    }

    #[test]
    fn extract_pass_accepts_password_alias_in_user_data() {
        let msg = json!({"user_data": {"password": "secret123", "repeat": "secret123"}});
        let input = extract_pass(&msg).unwrap();
        assert_eq!(input.pass.expose_secret(), "secret123");
        assert_eq!(input.repeat.unwrap().expose_secret(), "secret123");
    }

    #[test]
    fn extract_pass_ignores_non_strings() {
        assert!(extract_pass(&json!({"pass": 42})).is_none());
        assert!(extract_pass(&json!({})).is_none());
    }

    #[test]
    fn projection_dedups_and_keeps_order() {
        let standard = vec!["handle".to_string(), "email".to_string()];
        let requested = vec!["plan".to_string(), "email".to_string()];
        let fields = projection(&standard, &requested, &["pass", "handle"]);
        assert_eq!(fields, ["handle", "email", "plan", "pass"]);
    }

    #[test]
    fn string_list_drops_non_strings() {
        let msg = json!({"fields": ["plan", 7, "", "tier"]});
        assert_eq!(string_list(&msg, "fields"), ["plan", "tier"]);
    }
}
