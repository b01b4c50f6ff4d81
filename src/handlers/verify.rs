//! Verification operations: issue, list, check, existence.

use anyhow::Result;
use chrono::Duration;
use serde_json::{json, Value};

use crate::core::Core;
use crate::msg::{i64_field, object_field, str_field};
use crate::normalize::fix_nick_handle;
use crate::reply::{Deny, Reply, Why};
use crate::resolve::find_user;
use crate::store::{Query, VERIFICATIONS};
use crate::verify as verification;

/// Issue a verification challenge for a resolved account and purpose.
/// `expire_ms` overrides the configured TTL for this one challenge.
pub async fn make_verify(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };
    let Some(kind) = str_field(&msg, "kind") else {
        return Ok(Reply::deny(Deny::new(Why::NoVerifyKind)));
    };

    let ttl = i64_field(&msg, "expire_ms").map(Duration::milliseconds);
    let verify_data = object_field(&msg, "verify_data").cloned().unwrap_or_default();
    let issued = verification::make_verify(core, &account, kind, ttl, verify_data).await?;
    Ok(Reply::ok().with("verify", issued.to_doc()?))
}

/// List verifications for a resolved account, optionally one purpose only.
pub async fn list_verify(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let mut query = Query::by("user_id", json!(account.require_id()?))
        .with_limit(core.options().limit());
    if let Some(kind) = str_field(&msg, "kind") {
        query = query.with_field("kind", json!(kind));
    }
    let items = core.store().list(VERIFICATIONS, &query).await?;
    Ok(Reply::ok().with("verifications", Value::Array(items)))
}

/// Check (and consume) a presented verification token.
pub async fn check_verify(core: &Core, msg: Value) -> Result<Reply> {
    let Some(kind) = str_field(&msg, "kind") else {
        return Ok(Reply::deny(Deny::new(Why::NoVerifyKind)));
    };
    let Some(token) = str_field(&msg, "token") else {
        return Ok(Reply::deny(Deny::new(Why::NoToken)));
    };

    match verification::check_verify(core, kind, token).await? {
        Ok(checked) => Ok(Reply::ok().with("verify", checked.to_doc()?)),
        Err(deny) => Ok(Reply::deny(deny)),
    }
}

/// Does any verification exist for this account and purpose, expired or
/// not? Lets hosts make resend idempotent without leaking token state.
pub async fn check_exists(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };
    let Some(kind) = str_field(&msg, "kind") else {
        return Ok(Reply::deny(Deny::new(Why::NoVerifyKind)));
    };

    let exists = verification::verify_exists(core, account.require_id()?, kind).await?;
    Ok(Reply::ok().with("exists", json!(exists)))
}
