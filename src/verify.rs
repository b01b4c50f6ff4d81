//! Verification challenges: short-lived, purpose-bound, single-use.
//!
//! A check must tell callers apart: wrong token, expired, already used.
//! Each is a distinct auditable outcome; collapsing them would make resend
//! and abuse handling guesswork for the host.

use anyhow::Result;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

use crate::core::Core;
use crate::model::{Account, Verification, SV};
use crate::reply::{Check, Deny, Why};
use crate::store::{Query, VERIFICATIONS};

const SYSTEM_KEYS: [&str; 7] = ["id", "token", "user_id", "kind", "expiry", "used", "when"];

/// Issue a verification for the account and purpose. `ttl` defaults to the
/// configured verification TTL.
pub async fn make_verify(
    core: &Core,
    user: &Account,
    kind: &str,
    ttl: Option<Duration>,
    verify_data: Map<String, Value>,
) -> Result<Verification> {
    let mut extra = verify_data;
    for key in SYSTEM_KEYS {
        extra.remove(key);
    }

    let now = Utc::now();
    let verification = Verification {
        id: None,
        token: core.minter().make_token(),
        user_id: user.require_id()?.to_string(),
        kind: kind.to_string(),
        expiry: now + ttl.unwrap_or_else(|| core.options().verify_expire()),
        used: false,
        when: now,
        sv: SV,
        extra,
    };

    let doc = core.store().save(VERIFICATIONS, verification.to_doc()?).await?;
    Verification::from_doc(doc)
}

/// Check a presented token for the given purpose, consuming it on success.
/// Expiry is checked before the consumed flag, so an expired token reports
/// expired regardless of prior use.
pub async fn check_verify(core: &Core, kind: &str, token: &str) -> Result<Check<Verification>> {
    let query = Query::by("kind", json!(kind)).with_field("token", json!(token));
    let Some(doc) = core.store().load(VERIFICATIONS, &query).await? else {
        return Ok(Err(Deny::new(Why::WrongToken)));
    };
    let mut verification = Verification::from_doc(doc)?;

    if Utc::now() >= verification.expiry {
        return Ok(Err(Deny::with_details(
            Why::VerifyExpired,
            json!({ "expiry": verification.expiry }),
        )));
    }
    if verification.used {
        return Ok(Err(Deny::new(Why::VerifyAlreadyUsed)));
    }

    verification.used = true;
    let doc = core.store().save(VERIFICATIONS, verification.to_doc()?).await?;
    Ok(Ok(Verification::from_doc(doc)?))
}

/// Does any verification, expired or not, used or not, exist for this
/// account and purpose? Supports idempotent-resend flows.
pub async fn verify_exists(core: &Core, user_id: &str, kind: &str) -> Result<bool> {
    let query = Query::by("user_id", json!(user_id))
        .with_field("kind", json!(kind))
        .with_limit(1);
    Ok(!core.store().list(VERIFICATIONS, &query).await?.is_empty())
}
