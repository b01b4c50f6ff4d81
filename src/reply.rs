//! Tagged outcomes for policy checks and message operations.
//!
//! Nothing in this crate raises domain failures as errors: every check
//! returns a [`Deny`] with a stable `why` code, and every operation returns
//! a [`Reply`] that serializes to `{ok, ...}` or `{ok:false, why, details?}`.
//! The codes are intended for client-side branching, not prose.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Stable reason codes. The serialized form (kebab-case) is the contract;
/// variants may be added but codes never change meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Why {
    // handle policy
    NotString,
    Reserved,
    Disallowed,
    InvalidChars,
    HandleTooShort,
    HandleTooLong,
    HandleExists,
    // email policy
    EmailInvalidFormat,
    EmailExists,
    // credentials
    NoPassword,
    PasswordTooShort,
    RepeatPasswordMismatch,
    InvalidPassword,
    // resolution
    NoUserQuery,
    UserNotFound,
    MultipleMatchingUsers,
    UserNotActive,
    // sessions
    NoToken,
    LoginNotFound,
    LoginInactive,
    OnetimeExpired,
    OnetimeUsed,
    // verifications
    NoVerifyKind,
    WrongToken,
    VerifyExpired,
    VerifyAlreadyUsed,
    // surface
    UnknownOp,
}

impl Why {
    /// The wire code for this reason.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotString => "not-string",
            Self::Reserved => "reserved",
            Self::Disallowed => "disallowed",
            Self::InvalidChars => "invalid-chars",
            Self::HandleTooShort => "handle-too-short",
            Self::HandleTooLong => "handle-too-long",
            Self::HandleExists => "handle-exists",
            Self::EmailInvalidFormat => "email-invalid-format",
            Self::EmailExists => "email-exists",
            Self::NoPassword => "no-password",
            Self::PasswordTooShort => "password-too-short",
            Self::RepeatPasswordMismatch => "repeat-password-mismatch",
            Self::InvalidPassword => "invalid-password",
            Self::NoUserQuery => "no-user-query",
            Self::UserNotFound => "user-not-found",
            Self::MultipleMatchingUsers => "multiple-matching-users",
            Self::UserNotActive => "user-not-active",
            Self::NoToken => "no-token",
            Self::LoginNotFound => "login-not-found",
            Self::LoginInactive => "login-inactive",
            Self::OnetimeExpired => "onetime-expired",
            Self::OnetimeUsed => "onetime-used",
            Self::NoVerifyKind => "no-verify-kind",
            Self::WrongToken => "wrong-token",
            Self::VerifyExpired => "verify-expired",
            Self::VerifyAlreadyUsed => "verify-already-used",
            Self::UnknownOp => "unknown-op",
        }
    }
}

impl fmt::Display for Why {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A refused check: reason code plus optional diagnostic details.
///
/// Details are safe to surface to callers; anything offensive (blocked
/// handle terms) is opaquely encoded before it lands here.
#[derive(Debug, Clone, PartialEq)]
pub struct Deny {
    why: Why,
    details: Option<Value>,
}

impl Deny {
    #[must_use]
    pub fn new(why: Why) -> Self {
        Self { why, details: None }
    }

    #[must_use]
    pub fn with_details(why: Why, details: Value) -> Self {
        Self {
            why,
            details: Some(details),
        }
    }

    #[must_use]
    pub fn why(&self) -> Why {
        self.why
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }
}

impl fmt::Display for Deny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.why.as_str())
    }
}

/// Result of a single check: the value on success, a [`Deny`] otherwise.
pub type Check<T> = Result<T, Deny>;

/// The flat reply envelope of every message operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    ok: bool,
    why: Option<Why>,
    details: Option<Value>,
    body: Map<String, Value>,
}

impl Reply {
    /// A successful reply; extend it with [`Reply::with`].
    #[must_use]
    pub fn ok() -> Self {
        Self {
            ok: true,
            why: None,
            details: None,
            body: Map::new(),
        }
    }

    /// A failed reply carrying the deny's code and details unchanged.
    #[must_use]
    pub fn deny(deny: Deny) -> Self {
        Self {
            ok: false,
            why: Some(deny.why),
            details: deny.details,
            body: Map::new(),
        }
    }

    /// Attach a payload field.
    #[must_use]
    pub fn with(mut self, key: &str, value: Value) -> Self {
        self.body.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    #[must_use]
    pub fn why(&self) -> Option<Why> {
        self.why
    }

    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.details.as_ref()
    }

    /// A payload field, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }

    /// Serialize to the wire shape: `{"ok": ..}` merged with the payload,
    /// plus `why`/`details` on failure.
    #[must_use]
    pub fn into_value(self) -> Value {
        let mut out = Map::new();
        out.insert("ok".to_string(), Value::Bool(self.ok));
        if let Some(why) = self.why {
            out.insert("why".to_string(), Value::String(why.as_str().to_string()));
        }
        if let Some(details) = self.details {
            out.insert("details".to_string(), details);
        }
        for (key, value) in self.body {
            out.insert(key, value);
        }
        Value::Object(out)
    }
}

impl From<Deny> for Reply {
    fn from(deny: Deny) -> Self {
        Self::deny(deny)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn why_codes_are_kebab_case() {
        assert_eq!(Why::RepeatPasswordMismatch.as_str(), "repeat-password-mismatch");
        assert_eq!(Why::MultipleMatchingUsers.as_str(), "multiple-matching-users");
        // serde and as_str must agree
        let serialized = serde_json::to_value(Why::HandleTooShort).unwrap();
        assert_eq!(serialized, json!(Why::HandleTooShort.as_str()));
    }

    #[test]
    fn ok_reply_serializes_flat() {
        let reply = Reply::ok().with("user", json!({"handle": "alice"}));
        let value = reply.into_value();
        assert_eq!(value["ok"], json!(true));
        assert_eq!(value["user"]["handle"], json!("alice"));
        assert!(value.get("why").is_none());
    }

    #[test]
    fn deny_reply_carries_code_and_details() {
        let deny = Deny::with_details(Why::Reserved, json!({"handle": "guest"}));
        let reply = Reply::deny(deny);
        assert!(!reply.is_ok());
        assert_eq!(reply.why(), Some(Why::Reserved));
        let value = reply.into_value();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["why"], json!("reserved"));
        assert_eq!(value["details"]["handle"], json!("guest"));
    }
}
