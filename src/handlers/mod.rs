//! The message-level operation surface.
//!
//! One `async fn` per operation, each taking a flat JSON request and
//! returning a [`Reply`]. [`dispatch`] routes by operation name for hosts
//! that deliver requests dynamically; direct calls work just as well.
//!
//! Handlers validate fully before their single mutating store call, so a
//! failure (or a caller abandoning the request mid-flight) leaves prior
//! state unchanged.

use anyhow::Result;
use serde_json::{json, Value};

use crate::core::Core;
use crate::reply::{Deny, Reply, Why};

pub(crate) mod account;
pub(crate) mod change;
pub(crate) mod hooks;
pub(crate) mod login;
pub(crate) mod register;
pub(crate) mod verify;

pub use account::{adjust_user, get_user, list_user, remove_user, update_user};
pub use change::{change_email, change_handle, change_pass};
pub use hooks::{encrypt_hook, pass_hook};
pub use login::{auth_user, list_login, login_user, logout_user};
pub use register::register_user;
pub use verify::{check_exists, check_verify, list_verify, make_verify};

/// Route a request by operation name. Unknown names are a refusal, not an
/// error: the surface is host-driven and must stay total.
pub async fn dispatch(core: &Core, op: &str, msg: Value) -> Result<Reply> {
    match op {
        "register-user" => register_user(core, msg).await,
        "get-user" => get_user(core, msg).await,
        "list-user" => list_user(core, msg).await,
        "adjust-user" => adjust_user(core, msg).await,
        "update-user" => update_user(core, msg).await,
        "remove-user" => remove_user(core, msg).await,
        "login-user" => login_user(core, msg).await,
        "logout-user" => logout_user(core, msg).await,
        "list-login" => list_login(core, msg).await,
        "make-verify" => make_verify(core, msg).await,
        "list-verify" => list_verify(core, msg).await,
        "change-pass" | "change-password" => change_pass(core, msg).await,
        "change-handle" => change_handle(core, msg).await,
        "change-email" => change_email(core, msg).await,
        "check-verify" => check_verify(core, msg).await,
        "check-exists" => check_exists(core, msg).await,
        "auth-user" => auth_user(core, msg).await,
        "encrypt-hook" => encrypt_hook(core, msg).await,
        "pass-hook" => pass_hook(core, msg).await,
        _ => Ok(Reply::deny(Deny::with_details(
            Why::UnknownOp,
            json!({ "op": op }),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;

    #[tokio::test]
    async fn dispatch_routes_by_name() -> Result<()> {
        let core = Core::in_memory(Options::default());
        let reply = dispatch(&core, "register-user", json!({"handle": "alice"})).await?;
        assert!(reply.is_ok());

        let reply = dispatch(&core, "get-user", json!({"handle": "alice"})).await?;
        assert_eq!(reply.get("user").unwrap()["handle"], json!("alice"));

        // the original surface's alias
        let reply = dispatch(
            &core,
            "change-password",
            json!({"handle": "alice", "pass": "secret123"}),
        )
        .await?;
        assert!(reply.is_ok());
        Ok(())
    }

    #[tokio::test]
    async fn dispatch_refuses_unknown_ops() -> Result<()> {
        let core = Core::in_memory(Options::default());
        let reply = dispatch(&core, "explode-user", json!({})).await?;
        assert_eq!(reply.why(), Some(Why::UnknownOp));
        assert_eq!(reply.details().unwrap()["op"], json!("explode-user"));
        Ok(())
    }
}
