//! Read, list, and mutate operations on existing accounts.

use anyhow::Result;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::core::Core;
use crate::model::Account;
use crate::msg::{self, bool_field, i64_field, object_field, PROTECTED_FIELDS};
use crate::normalize::{fix_entity, fix_nick_handle};
use crate::reply::Reply;
use crate::resolve::find_user;
use crate::store::{Query, ACCOUNTS};

/// Resolve and return a single account.
pub async fn get_user(core: &Core, msg: Value) -> Result<Reply> {
    match find_user(core, &msg).await? {
        Ok(account) => Ok(Reply::ok().with("user", account.public()?)),
        Err(deny) => Ok(Reply::deny(deny)),
    }
}

/// List accounts matching the request's query object, bounded by the
/// configured result limit unless the caller asks for less.
pub async fn list_user(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());

    let mut filter = object_field(&msg, "q").cloned().unwrap_or_default();
    filter.retain(|_, value| !value.is_null());

    let limit = i64_field(&msg, "limit")
        .and_then(|limit| usize::try_from(limit).ok())
        .unwrap_or_else(|| core.options().limit());
    let fields = msg::projection(
        core.options().standard_fields(),
        &msg::string_list(&msg, "fields"),
        &[],
    );
    let query = Query::from_filter(filter)
        .with_fields(fields)
        .with_limit(limit);

    let mut users = Vec::new();
    for mut doc in core.store().list(ACCOUNTS, &query).await? {
        fix_entity(&mut doc, core.options());
        users.push(Account::from_doc(doc)?.public()?);
    }
    Ok(Reply::ok().with("users", Value::Array(users)))
}

/// Apply the `active` flag to a resolved account. Everything else goes
/// through `update-user` or a dedicated `change-*` operation.
pub async fn adjust_user(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let Some(active) = bool_field(&msg, "active") else {
        return Ok(Reply::ok().with("user", account.public()?));
    };

    let id = account.require_id()?;
    let doc = core
        .store()
        .save(ACCOUNTS, json!({ "id": id, "active": active }))
        .await?;
    debug!(id = %id, active, "adjusted account");
    Ok(Reply::ok().with("user", Account::from_doc(doc)?.public()?))
}

/// Merge non-protected custom fields into a resolved account.
pub async fn update_user(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());

    // The patch container holds new values, not lookup criteria; resolve
    // from the rest of the request only.
    let mut lookup = msg.clone();
    if let Some(map) = lookup.as_object_mut() {
        map.remove("user_data");
        let resolved_user = map
            .get("user")
            .and_then(|user| user.get("id"))
            .and_then(Value::as_str)
            .is_some();
        if !resolved_user {
            map.remove("user");
        }
    }
    let account = match find_user(core, &lookup).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let mut patch: Map<String, Value> = object_field(&msg, "user_data")
        .or_else(|| object_field(&msg, "user"))
        .cloned()
        .unwrap_or_default();
    for key in PROTECTED_FIELDS.iter().chain(["password", "repeat", "sv"].iter()) {
        patch.remove(*key);
    }

    let id = account.require_id()?;
    patch.insert("id".to_string(), json!(id));
    let doc = core.store().save(ACCOUNTS, Value::Object(patch)).await?;
    Ok(Reply::ok().with("user", Account::from_doc(doc)?.public()?))
}

/// Deactivate an account. Nothing is deleted here; storage-level removal
/// semantics belong to the store.
pub async fn remove_user(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let id = account.require_id()?;
    let doc = core
        .store()
        .save(ACCOUNTS, json!({ "id": id, "active": false }))
        .await?;
    debug!(id = %id, "removed account");
    Ok(Reply::ok().with("user", Account::from_doc(doc)?.public()?))
}
