//! Session issuance, termination, and verification.
//!
//! Every login produces a bearer token; flows that need a single-use grant
//! additionally get a onetime token with an absolute expiry. Expiry is
//! lazy: there is no background sweep, the check happens when a token is
//! presented. Consumption of a onetime token is a single-document save.

use anyhow::Result;
use chrono::Utc;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::core::Core;
use crate::model::{Account, Session, SV};
use crate::reply::{Check, Deny, Why};
use crate::store::{Query, SESSIONS};

/// Keys the issuer owns; custom login data cannot shadow them.
const SYSTEM_KEYS: [&str; 12] = [
    "id",
    "token",
    "onetime_token",
    "onetime_expiry",
    "onetime_active",
    "handle",
    "email",
    "user_id",
    "when",
    "active",
    "why",
    "sv",
];

/// Optional extras for a new session.
#[derive(Debug, Default)]
pub struct LoginInit {
    pub onetime: bool,
    pub login_data: Map<String, Value>,
}

/// Create a session for the account. `why` records the triggering flow
/// ("password", "auto", "register", ...). The account's handle and email are
/// deliberately copied into the record at issuance time.
pub async fn make_login(core: &Core, user: &Account, why: &str, init: LoginInit) -> Result<Session> {
    let mut extra = init.login_data;
    for key in SYSTEM_KEYS {
        extra.remove(key);
    }

    let now = Utc::now();
    let session = Session {
        id: None,
        token: core.minter().make_token(),
        onetime_token: init.onetime.then(|| core.minter().make_token()),
        onetime_expiry: init.onetime.then(|| now + core.options().onetime_expire()),
        onetime_active: init.onetime.then_some(true),
        handle: user.handle.clone(),
        email: user.email.clone(),
        user_id: user.require_id()?.to_string(),
        when: now,
        active: true,
        why: why.to_string(),
        sv: SV,
        extra,
    };

    let doc = core.store().save(SESSIONS, session.to_doc()?).await?;
    Session::from_doc(doc)
}

/// Look a session up by `token` or `onetime_token`.
pub async fn load_login(core: &Core, field: &str, token: &str) -> Result<Option<Session>> {
    let doc = core
        .store()
        .load(SESSIONS, &Query::by(field, json!(token)))
        .await?;
    doc.map(Session::from_doc).transpose()
}

/// Terminate the session holding this token. Idempotent: terminating an
/// already-inactive session succeeds and leaves it inactive.
pub async fn end_login(core: &Core, token: &str) -> Result<Option<Session>> {
    let Some(mut session) = load_login(core, "token", token).await? else {
        return Ok(None);
    };
    if session.active {
        session.active = false;
        let doc = core.store().save(SESSIONS, session.to_doc()?).await?;
        session = Session::from_doc(doc)?;
    }
    Ok(Some(session))
}

/// Validity of a presented bearer token.
pub(crate) fn check_bearer(session: &Session) -> Check<()> {
    if session.active {
        Ok(())
    } else {
        Err(Deny::new(Why::LoginInactive))
    }
}

/// Validate and consume a onetime token. Expiry is checked before the
/// consumed flag: an expired token reports expired even if also used.
pub(crate) async fn consume_onetime(core: &Core, session: &mut Session) -> Result<Check<()>> {
    let now = Utc::now();
    let expired = match session.onetime_expiry {
        Some(expiry) => now >= expiry,
        None => true,
    };
    if expired {
        debug!(user_id = %session.user_id, "onetime token expired");
        return Ok(Err(Deny::new(Why::OnetimeExpired)));
    }
    if session.onetime_active != Some(true) {
        return Ok(Err(Deny::new(Why::OnetimeUsed)));
    }
    if !session.active {
        return Ok(Err(Deny::new(Why::LoginInactive)));
    }

    session.onetime_active = Some(false);
    let doc = core.store().save(SESSIONS, session.to_doc()?).await?;
    *session = Session::from_doc(doc)?;
    Ok(Ok(()))
}
