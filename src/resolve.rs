//! Account resolution.
//!
//! Requests identify an account in several shapes: a nested `user` object,
//! a nested `user_data` object, an explicit query object (`q`/`user_q`), or
//! a top-level convenience field. Resolution merges these by fixed
//! precedence into one filter, then resolves to exactly zero or one
//! account. More than one match is a hard failure, never a silent pick.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::Core;
use crate::model::Account;
use crate::msg::{self, CONVENIENCE_FIELDS};
use crate::normalize::{fix_entity, fix_nick_handle};
use crate::reply::{Check, Deny, Why};
use crate::store::{Query, ACCOUNTS};

/// Resolve the account a request refers to, projecting the standard field
/// set plus any caller-requested `fields`.
pub async fn find_user(core: &Core, msg: &Value) -> Result<Check<Account>> {
    find_user_fields(core, msg, &[]).await
}

/// As [`find_user`], additionally projecting `extra` fields (the login path
/// needs `pass`/`salt`; nothing else does).
pub(crate) async fn find_user_fields(
    core: &Core,
    msg: &Value,
    extra: &[&str],
) -> Result<Check<Account>> {
    // A request may already carry a fully-identified account.
    if let Some(user) = msg.get("user") {
        if user.get("id").and_then(Value::as_str).is_some() {
            let mut doc = user.clone();
            fix_entity(&mut doc, core.options());
            return Ok(Ok(Account::from_doc(doc)?));
        }
    }

    let mut msg = msg.clone();
    fix_nick_handle(&mut msg, core.options());

    let mut filter = Map::new();
    // Increasing precedence: user, user_data, then the explicit query
    // object. `user_q` shadows `q` entirely when both are present.
    for container in [msg.get("user"), msg.get("user_data")] {
        if let Some(Value::Object(map)) = container {
            filter.extend(map.clone());
        }
    }
    let query_obj = msg.get("user_q").or_else(|| msg.get("q"));
    if let Some(Value::Object(map)) = query_obj {
        filter.extend(map.clone());
    }

    // At most one convenience field is folded in, by fixed precedence.
    for field in CONVENIENCE_FIELDS {
        if let Some(value) = msg.get(field) {
            if !value.is_null() {
                filter.insert(field.to_string(), value.clone());
                break;
            }
        }
    }

    // `user_id` is an alias for `id`.
    if let Some(user_id) = filter.remove("user_id") {
        if !filter.contains_key("id") && !user_id.is_null() {
            filter.insert("id".to_string(), user_id);
        }
    }

    filter.retain(|_, value| !value.is_null());

    if filter.is_empty() {
        return Ok(Err(Deny::new(Why::NoUserQuery)));
    }

    let fields = msg::projection(
        core.options().standard_fields(),
        &msg::string_list(&msg, "fields"),
        extra,
    );
    let query = Query::from_filter(filter).with_fields(fields);

    let doc = if query.filter().contains_key("id") {
        // Direct key lookup; ids are store-assigned and cannot collide.
        core.store().load(ACCOUNTS, &query).await?
    } else {
        // Handle/email are unique by policy, not by construction: a store
        // without index enforcement can hold duplicates, and operating on
        // an arbitrary one risks touching the wrong account.
        let mut docs = core.store().list(ACCOUNTS, &query).await?;
        if docs.len() > 1 {
            debug!(matches = docs.len(), "ambiguous account query");
            return Ok(Err(Deny::new(Why::MultipleMatchingUsers)));
        }
        docs.pop()
    };

    match doc {
        Some(mut doc) => {
            fix_entity(&mut doc, core.options());
            Ok(Ok(Account::from_doc(doc)?))
        }
        None => Ok(Err(Deny::new(Why::UserNotFound))),
    }
}

/// Uniqueness probe: does any account match this single field? Ambiguity
/// counts as taken.
pub(crate) async fn user_exists(core: &Core, field: &str, value: &Value) -> Result<bool> {
    let mut probe = Map::new();
    probe.insert(field.to_string(), value.clone());
    match find_user(core, &Value::Object(probe)).await? {
        Ok(_) => Ok(true),
        Err(deny) => Ok(deny.why() == Why::MultipleMatchingUsers),
    }
}
