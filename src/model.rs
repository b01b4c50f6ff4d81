//! Account, session, and verification documents.
//!
//! Documents are open: beyond the standard fields each carries an arbitrary
//! extra-field map merged from request data. Projection means any standard
//! field may be absent on a read, so most fields are optional here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version marker written into new documents, for data migration.
pub const SV: u32 = 1;

fn default_true() -> bool {
    true
}

/// One end-user identity. `pass`/`salt` are opaque blobs produced by the
/// hash hook and never appear in replies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sv: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Account {
    pub fn from_doc(doc: Value) -> Result<Self> {
        serde_json::from_value(doc).context("malformed account document")
    }

    pub fn to_doc(&self) -> Result<Value> {
        serde_json::to_value(self).context("failed to serialize account")
    }

    /// The caller-visible view: the full document minus credential fields.
    pub fn public(&self) -> Result<Value> {
        let mut doc = self.to_doc()?;
        if let Some(map) = doc.as_object_mut() {
            map.remove("pass");
            map.remove("salt");
        }
        Ok(doc)
    }

    /// The id, required once an account has been stored.
    pub fn require_id(&self) -> Result<&str> {
        self.id.as_deref().context("account document has no id")
    }
}

/// One authenticated session, or a single-use action grant.
///
/// `handle`/`email` are deliberately denormalized at issuance time; later
/// account changes do not rewrite historical sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onetime_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onetime_expiry: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onetime_active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub user_id: String,
    pub when: DateTime<Utc>,
    pub active: bool,
    pub why: String,
    pub sv: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Session {
    pub fn from_doc(doc: Value) -> Result<Self> {
        serde_json::from_value(doc).context("malformed session document")
    }

    pub fn to_doc(&self) -> Result<Value> {
        serde_json::to_value(self).context("failed to serialize session")
    }
}

/// A pending confirmation challenge bound to an account and a purpose.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub token: String,
    pub user_id: String,
    pub kind: String,
    pub expiry: DateTime<Utc>,
    #[serde(default)]
    pub used: bool,
    pub when: DateTime<Utc>,
    pub sv: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Verification {
    pub fn from_doc(doc: Value) -> Result<Self> {
        serde_json::from_value(doc).context("malformed verification document")
    }

    pub fn to_doc(&self) -> Result<Value> {
        serde_json::to_value(self).context("failed to serialize verification")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn account_round_trips_extra_fields() -> Result<()> {
        let account = Account::from_doc(json!({
            "id": "u1",
            "handle": "alice",
            "active": true,
            "pass": "digest",
            "salt": "salt",
            "plan": "pro"
        }))?;
        assert_eq!(account.extra["plan"], json!("pro"));

        let doc = account.to_doc()?;
        assert_eq!(doc["plan"], json!("pro"));
        assert_eq!(doc["pass"], json!("digest"));
        Ok(())
    }

    #[test]
    fn public_view_never_carries_credentials() -> Result<()> {
        let account = Account::from_doc(json!({
            "id": "u1",
            "handle": "alice",
            "pass": "digest",
            "salt": "salt"
        }))?;
        let public = account.public()?;
        assert!(public.get("pass").is_none());
        assert!(public.get("salt").is_none());
        assert_eq!(public["handle"], json!("alice"));
        Ok(())
    }

    #[test]
    fn projected_account_defaults_active() -> Result<()> {
        // A projection that omitted `active` must not read as suspended.
        let account = Account::from_doc(json!({"id": "u1", "handle": "bob"}))?;
        assert!(account.active);
        assert!(account.pass.is_none());
        Ok(())
    }
}
