//! Credential, handle, and email changes.
//!
//! The new value arrives under `new_handle`/`new_email` (the bare field
//! names are resolution shortcuts and would be read as a lookup). Password
//! changes reuse the same aliases as registration.

use anyhow::Result;
use serde_json::{json, Value};
use tracing::debug;

use crate::core::Core;
use crate::credential::build_pass_fields;
use crate::email::validate_email;
use crate::handle::validate_handle;
use crate::model::Account;
use crate::normalize::fix_nick_handle;
use crate::reply::Reply;
use crate::resolve::find_user;
use crate::store::ACCOUNTS;

/// Replace an account's password-derived fields.
pub async fn change_pass(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let hashed = match build_pass_fields(core, &msg).await? {
        Ok(hashed) => hashed,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let id = account.require_id()?;
    let doc = core
        .store()
        .save(
            ACCOUNTS,
            json!({ "id": id, "pass": hashed.pass, "salt": hashed.salt }),
        )
        .await?;
    debug!(id = %id, "changed password");
    Ok(Reply::ok().with("user", Account::from_doc(doc)?.public()?))
}

/// Move an account to a new handle, subject to the full handle policy.
pub async fn change_handle(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let candidate = msg.get("new_handle").cloned().unwrap_or(Value::Null);
    let handle = match validate_handle(core, &candidate).await? {
        Ok(handle) => handle,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let id = account.require_id()?;
    let doc = core
        .store()
        .save(ACCOUNTS, json!({ "id": id, "handle": handle }))
        .await?;
    debug!(id = %id, "changed handle");
    Ok(Reply::ok().with("user", Account::from_doc(doc)?.public()?))
}

/// Move an account to a new email, subject to the email policy.
pub async fn change_email(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());
    let account = match find_user(core, &msg).await? {
        Ok(account) => account,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let candidate = msg.get("new_email").cloned().unwrap_or(Value::Null);
    let email = match validate_email(core, &candidate).await? {
        Ok(email) => email,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let id = account.require_id()?;
    let doc = core
        .store()
        .save(ACCOUNTS, json!({ "id": id, "email": email }))
        .await?;
    debug!(id = %id, "changed email");
    Ok(Reply::ok().with("user", Account::from_doc(doc)?.public()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::login::login_user;
    use crate::handlers::register::register_user;
    use crate::options::Options;
    use crate::reply::Why;

    async fn seeded_core() -> Result<Core> {
        let core = Core::in_memory(Options::default());
        register_user(
            &core,
            json!({"handle": "alice", "email": "a@x.com", "pass": "secret123"}),
        )
        .await?;
        register_user(&core, json!({"handle": "bob", "email": "b@x.com"})).await?;
        Ok(core)
    }

    #[tokio::test]
    async fn change_pass_invalidates_the_old_password() -> Result<()> {
        let core = seeded_core().await?;
        let reply = change_pass(
            &core,
            json!({"handle": "alice", "pass": "fresh-secret", "repeat": "fresh-secret"}),
        )
        .await?;
        assert!(reply.is_ok());

        let reply = login_user(&core, json!({"handle": "alice", "pass": "secret123"})).await?;
        assert_eq!(reply.why(), Some(Why::InvalidPassword));
        let reply = login_user(&core, json!({"handle": "alice", "pass": "fresh-secret"})).await?;
        assert!(reply.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn change_pass_enforces_repeat_and_length() -> Result<()> {
        let core = seeded_core().await?;
        let reply = change_pass(
            &core,
            json!({"handle": "alice", "pass": "fresh-secret", "repeat": "other"}),
        )
        .await?;
        assert_eq!(reply.why(), Some(Why::RepeatPasswordMismatch));

        let reply = change_pass(&core, json!({"handle": "alice", "pass": "short"})).await?;
        assert_eq!(reply.why(), Some(Why::PasswordTooShort));
        Ok(())
    }

    #[tokio::test]
    async fn change_handle_applies_full_policy() -> Result<()> {
        let core = seeded_core().await?;
        let reply = change_handle(&core, json!({"handle": "alice", "new_handle": "bob"})).await?;
        assert_eq!(reply.why(), Some(Why::HandleExists));

        let reply = change_handle(&core, json!({"handle": "alice", "new_handle": "guest"})).await?;
        assert_eq!(reply.why(), Some(Why::Reserved));

        let reply = change_handle(&core, json!({"handle": "alice"})).await?;
        assert_eq!(reply.why(), Some(Why::NotString));

        let reply =
            change_handle(&core, json!({"handle": "alice", "new_handle": "Alice_2"})).await?;
        assert!(reply.is_ok());
        assert_eq!(reply.get("user").unwrap()["handle"], json!("alice_2"));
        Ok(())
    }

    #[tokio::test]
    async fn change_email_applies_policy() -> Result<()> {
        let core = seeded_core().await?;
        let reply = change_email(&core, json!({"handle": "alice", "new_email": "b@x.com"})).await?;
        assert_eq!(reply.why(), Some(Why::EmailExists));

        let reply = change_email(&core, json!({"handle": "alice", "new_email": "nope"})).await?;
        assert_eq!(reply.why(), Some(Why::EmailInvalidFormat));

        let reply =
            change_email(&core, json!({"handle": "alice", "new_email": "new@x.com"})).await?;
        assert!(reply.is_ok());
        assert_eq!(reply.get("user").unwrap()["email"], json!("new@x.com"));
        Ok(())
    }
}
