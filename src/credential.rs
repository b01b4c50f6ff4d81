//! Credential management: building pass/salt fields from request material.
//!
//! Policy lives here (alias extraction, repeat confirmation); the one-way
//! transform itself is the hash hook's mechanism. A repeat mismatch never
//! reaches the hook.

use anyhow::Result;
use secrecy::ExposeSecret;
use serde_json::Value;

use crate::core::Core;
use crate::hash::{self, Hashed};
use crate::msg::{extract_pass, str_field};
use crate::reply::{Check, Deny, Why};

/// Build storable pass/salt fields from whatever password material the
/// request carries. A supplied `salt` switches the hook into verification
/// mode (re-deriving against an existing salt) instead of minting one.
pub async fn build_pass_fields(core: &Core, msg: &Value) -> Result<Check<Hashed>> {
    let Some(input) = extract_pass(msg) else {
        return Ok(Err(Deny::new(Why::NoPassword)));
    };

    if let Some(repeat) = &input.repeat {
        if repeat.expose_secret() != input.pass.expose_secret() {
            return Ok(Err(Deny::new(Why::RepeatPasswordMismatch)));
        }
    }

    let salt = str_field(msg, "salt").map(ToString::to_string);
    hash::encrypt(core, &input.pass, salt).await
}
