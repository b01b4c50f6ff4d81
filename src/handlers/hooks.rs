//! The password hook operations, exposed on the message surface so hosts
//! can derive and check credential fields without going through an account.

use anyhow::Result;
use secrecy::SecretString;
use serde_json::{json, Value};

use crate::core::Core;
use crate::hash;
use crate::msg::{extract_pass, str_field};
use crate::reply::{Deny, Reply, Why};

/// Derive storable pass/salt fields from a plaintext. A supplied `salt`
/// re-derives against it instead of minting a fresh one.
pub async fn encrypt_hook(core: &Core, msg: Value) -> Result<Reply> {
    let Some(input) = extract_pass(&msg) else {
        return Ok(Reply::deny(Deny::new(Why::NoPassword)));
    };
    let salt = str_field(&msg, "salt").map(ToString::to_string);
    match hash::encrypt(core, &input.pass, salt).await? {
        Ok(hashed) => Ok(Reply::ok()
            .with("pass", json!(hashed.pass))
            .with("salt", json!(hashed.salt))),
        Err(deny) => Ok(Reply::deny(deny)),
    }
}

/// Check a proposed plaintext against stored pass/salt fields.
pub async fn pass_hook(core: &Core, msg: Value) -> Result<Reply> {
    let Some(proposed) = str_field(&msg, "proposed") else {
        return Ok(Reply::deny(Deny::new(Why::NoPassword)));
    };
    let (Some(pass), Some(salt)) = (str_field(&msg, "pass"), str_field(&msg, "salt")) else {
        return Ok(Reply::deny(Deny::new(Why::InvalidPassword)));
    };

    let proposed = SecretString::from(proposed.to_string());
    match hash::verify(core, &proposed, pass, salt).await? {
        Ok(()) => Ok(Reply::ok()),
        Err(deny) => Ok(Reply::deny(deny)),
    }
}
