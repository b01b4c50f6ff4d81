//! Account registration.

use anyhow::Result;
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::Core;
use crate::credential::build_pass_fields;
use crate::email::validate_email;
use crate::handle::{ensure_handle, validate_handle};
use crate::model::{Account, SV};
use crate::msg::{bool_field, extract_pass, object_field, PROTECTED_FIELDS};
use crate::normalize::fix_nick_handle;
use crate::reply::Reply;
use crate::session::{make_login, LoginInit};
use crate::store::ACCOUNTS;

/// Request keys that never become custom account fields.
const NON_DATA_KEYS: [&str; 4] = ["password", "repeat", "sv", "when"];

/// Create an account: normalize, settle the handle, apply the handle and
/// email policies, build credential fields if a password was supplied, then
/// a single store-create. With `auto_login`, a session is issued for the
/// fresh account.
pub async fn register_user(core: &Core, mut msg: Value) -> Result<Reply> {
    fix_nick_handle(&mut msg, core.options());

    let handle = ensure_handle(core, &mut msg);
    let handle = match validate_handle(core, &Value::String(handle)).await? {
        Ok(handle) => handle,
        Err(deny) => return Ok(Reply::deny(deny)),
    };

    let email_value = field_or_container(&msg, "email");
    let email = match email_value {
        Some(value) => match validate_email(core, &value).await? {
            Ok(email) => Some(email),
            Err(deny) => return Ok(Reply::deny(deny)),
        },
        None => None,
    };

    // Accounts may be provisioned without credentials; they cannot log in
    // until a password is set.
    let hashed = if extract_pass(&msg).is_some() {
        match build_pass_fields(core, &msg).await? {
            Ok(hashed) => Some(hashed),
            Err(deny) => return Ok(Reply::deny(deny)),
        }
    } else {
        None
    };

    let mut extra = Map::new();
    for key in ["user", "user_data"] {
        if let Some(container) = object_field(&msg, key) {
            extra.extend(container.clone());
        }
    }
    for key in PROTECTED_FIELDS.iter().chain(NON_DATA_KEYS.iter()) {
        extra.remove(*key);
    }
    extra.remove("name");

    let name = field_or_container(&msg, "name")
        .and_then(|value| value.as_str().map(ToString::to_string));

    let account = Account {
        id: None,
        handle: Some(handle.clone()),
        email,
        name,
        active: bool_field(&msg, "active").unwrap_or(true),
        pass: hashed.as_ref().map(|hashed| hashed.pass.clone()),
        salt: hashed.map(|hashed| hashed.salt),
        sv: Some(SV),
        extra,
    };

    let doc = core.store().save(ACCOUNTS, account.to_doc()?).await?;
    let account = Account::from_doc(doc)?;
    debug!(handle = %handle, "registered account");

    let mut reply = Reply::ok().with("user", account.public()?);
    if bool_field(&msg, "auto_login") == Some(true) {
        let session = make_login(
            core,
            &account,
            "register",
            LoginInit {
                onetime: bool_field(&msg, "onetime").unwrap_or(false),
                login_data: object_field(&msg, "login_data").cloned().unwrap_or_default(),
            },
        )
        .await?;
        reply = reply.with("login", session.to_doc()?);
    }
    Ok(reply)
}

/// A top-level field, or the same field from `user_data`/`user`.
fn field_or_container(msg: &Value, key: &str) -> Option<Value> {
    let top = msg.get(key).filter(|value| !value.is_null()).cloned();
    top.or_else(|| {
        ["user_data", "user"].into_iter().find_map(|container| {
            msg.get(container)
                .and_then(|container| container.get(key))
                .filter(|value| !value.is_null())
                .cloned()
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::reply::Why;
    use serde_json::json;

    fn test_core() -> Core {
        Core::in_memory(Options::default())
    }

    #[tokio::test]
    async fn register_with_credentials() -> Result<()> {
        let core = test_core();
        let reply = register_user(
            &core,
            json!({"handle": "alice", "email": "a@x.com",
                   "pass": "secret123", "repeat": "secret123"}),
        )
        .await?;
        assert!(reply.is_ok());
        let user = reply.get("user").unwrap();
        assert_eq!(user["handle"], json!("alice"));
        assert_eq!(user["email"], json!("a@x.com"));
        assert!(user.get("pass").is_none());
        assert!(user.get("salt").is_none());
        assert!(user["id"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn stored_credentials_never_equal_plaintext() -> Result<()> {
        let core = test_core();
        register_user(&core, json!({"handle": "alice", "pass": "secret123"})).await?;
        let doc = core
            .store()
            .load(
                ACCOUNTS,
                &crate::store::Query::by("handle", json!("alice")),
            )
            .await?
            .unwrap();
        assert_ne!(doc["pass"], json!("secret123"));
        assert!(doc["salt"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn repeat_mismatch_registers_nothing() -> Result<()> {
        let core = test_core();
        let reply = register_user(
            &core,
            json!({"handle": "alice", "pass": "secret123", "repeat": "nope"}),
        )
        .await?;
        assert_eq!(reply.why(), Some(Why::RepeatPasswordMismatch));
        assert!(core
            .store()
            .load(ACCOUNTS, &crate::store::Query::by("handle", json!("alice")))
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reserved_handle_is_refused() -> Result<()> {
        let core = test_core();
        let reply = register_user(&core, json!({"handle": "guest"})).await?;
        assert_eq!(reply.why(), Some(Why::Reserved));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_handle_is_refused() -> Result<()> {
        let core = test_core();
        assert!(register_user(&core, json!({"handle": "alice"})).await?.is_ok());
        let reply = register_user(&core, json!({"handle": "Alice"})).await?;
        assert_eq!(reply.why(), Some(Why::HandleExists));
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_refused() -> Result<()> {
        let core = test_core();
        register_user(&core, json!({"handle": "alice", "email": "a@x.com"})).await?;
        let reply = register_user(&core, json!({"handle": "bob", "email": "a@x.com"})).await?;
        assert_eq!(reply.why(), Some(Why::EmailExists));
        Ok(())
    }

    #[tokio::test]
    async fn handle_is_generated_when_missing() -> Result<()> {
        let core = test_core();
        let reply = register_user(&core, json!({"email": "dana@x.com"})).await?;
        assert!(reply.is_ok());
        let handle = reply.get("user").unwrap()["handle"].as_str().unwrap().to_string();
        assert!(handle.starts_with("dana"));
        Ok(())
    }

    #[tokio::test]
    async fn legacy_nick_registers_as_handle() -> Result<()> {
        let core = test_core();
        let reply = register_user(&core, json!({"nick": "Legacy_Name"})).await?;
        assert!(reply.is_ok());
        assert_eq!(reply.get("user").unwrap()["handle"], json!("legacy_name"));
        Ok(())
    }

    #[tokio::test]
    async fn custom_fields_are_kept_but_protected_ones_are_not() -> Result<()> {
        let core = test_core();
        let reply = register_user(
            &core,
            json!({"handle": "alice",
                   "user_data": {"plan": "pro", "id": "forced", "active": false}}),
        )
        .await?;
        let user = reply.get("user").unwrap();
        assert_eq!(user["plan"], json!("pro"));
        assert_eq!(user["active"], json!(true));
        assert_ne!(user["id"], json!("forced"));
        Ok(())
    }

    #[tokio::test]
    async fn password_in_user_data_is_credential_material() -> Result<()> {
        let core = test_core();
        let reply = register_user(
            &core,
            json!({"handle": "alice", "user_data": {"pass": "secret123"}}),
        )
        .await?;
        assert!(reply.is_ok());
        let doc = core
            .store()
            .load(ACCOUNTS, &crate::store::Query::by("handle", json!("alice")))
            .await?
            .unwrap();
        // hashed and stored as a credential, not merged as a custom field
        assert!(doc["pass"].is_string());
        assert_ne!(doc["pass"], json!("secret123"));
        Ok(())
    }

    #[tokio::test]
    async fn auto_login_issues_a_session() -> Result<()> {
        let core = test_core();
        let reply = register_user(
            &core,
            json!({"handle": "alice", "pass": "secret123", "auto_login": true}),
        )
        .await?;
        let login = reply.get("login").unwrap();
        assert_eq!(login["why"], json!("register"));
        assert!(login["token"].is_string());
        Ok(())
    }
}
