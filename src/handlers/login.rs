//! Login, logout, session listing, and token authentication.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::Core;
use crate::hash;
use crate::msg::{bool_field, extract_pass, object_field, str_field};
use crate::normalize::fix_nick_handle;
use crate::reply::{Deny, Reply, Why};
use crate::resolve::{find_user, find_user_fields};
use crate::session::{check_bearer, consume_onetime, end_login, load_login, make_login, LoginInit};
use crate::store::{Query, SESSIONS};

/// Authenticate and create a session. `auto: true` skips the password check
/// for host-authorized flows (e.g. right after a completed verification);
/// `onetime: true` additionally issues a single-use token.
pub async fn login_user(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());

    let account = match find_user_fields(core, &msg, &["pass", "salt"]).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    if !account.active {
        debug!(handle = ?account.handle, "login refused for inactive account");
        return Ok(Reply::deny(Deny::new(Why::UserNotActive)));
    }

    let auto = bool_field(&msg, "auto") == Some(true);
    if !auto {
        let Some(input) = extract_pass(&msg) else {
            return Ok(Reply::deny(Deny::new(Why::NoPassword)));
        };
        // No stored credentials reads the same as a wrong password; the
        // reply must not reveal which.
        let (Some(pass), Some(salt)) = (account.pass.as_deref(), account.salt.as_deref()) else {
            return Ok(Reply::deny(Deny::new(Why::InvalidPassword)));
        };
        if let Err(deny) = hash::verify(core, &input.pass, pass, salt).await? {
            return Ok(Reply::deny(deny));
        }
    }

    let session = make_login(
        core,
        &account,
        if auto { "auto" } else { "password" },
        LoginInit {
            onetime: bool_field(&msg, "onetime").unwrap_or(false),
            login_data: object_field(&msg, "login_data").cloned().unwrap_or_default(),
        },
    )
    .await?;

    Ok(Reply::ok()
        .with("user", account.public()?)
        .with("login", session.to_doc()?))
}

/// Terminate the session holding the presented token.
pub async fn logout_user(core: &Core, msg: Value) -> Result<Reply> {
    let Some(token) = str_field(&msg, "token") else {
        return Ok(Reply::deny(Deny::new(Why::NoToken)));
    };
    match end_login(core, token).await? {
        Some(session) => Ok(Reply::ok().with("login", session.to_doc()?)),
        None => Ok(Reply::deny(Deny::new(Why::LoginNotFound))),
    }
}

/// List sessions for a resolved account; active ones unless `all` is set.
pub async fn list_login(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let mut query = Query::by("user_id", json!(account.require_id()?))
        .with_limit(core.options().limit());
    if bool_field(&msg, "all") != Some(true) {
        query = query.with_field("active", json!(true));
    }
    let logins = core.store().list(SESSIONS, &query).await?;
    Ok(Reply::ok().with("logins", Value::Array(logins)))
}

/// Resolve a presented token to an active session and an active account.
/// Onetime tokens are consumed here, exactly once.
pub async fn auth_user(core: &Core, msg: Value) -> Result<Reply> {
    let session = if let Some(onetime_token) = str_field(&msg, "onetime_token") {
        let Some(mut session) = load_login(core, "onetime_token", onetime_token).await? else {
            return Ok(Reply::deny(Deny::new(Why::LoginNotFound)));
        };
        if let Err(deny) = consume_onetime(core, &mut session).await? {
            return Ok(Reply::deny(deny));
        }
        session
    } else if let Some(token) = str_field(&msg, "token") {
        let Some(session) = load_login(core, "token", token).await? else {
            return Ok(Reply::deny(Deny::new(Why::LoginNotFound)));
        };
        if let Err(deny) = check_bearer(&session) {
            return Ok(Reply::deny(deny));
        }
        session
    } else {
        return Ok(Reply::deny(Deny::new(Why::NoToken)));
    };

    let account = match find_user(core, &json!({ "id": session.user_id.clone() })).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };
    if !account.active {
        return Ok(Reply::deny(Deny::new(Why::UserNotActive)));
    }

    Ok(Reply::ok()
        .with("user", account.public()?)
        .with("login", session.to_doc()?))
}
