//! The password-hash hook: trait, default implementation, salt generation.
//!
//! The one-way transform is deliberately behind [`Hasher`] so the scheme can
//! be swapped without touching validation logic. The default hook is an
//! iterated salted SHA-256 with the configured round count; hosts with
//! stronger requirements inject their own.

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::core::Core;
use crate::options::{Options, SaltFormat};
use crate::reply::{Check, Deny, Why};

/// Opaque password-derived fields, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hashed {
    pub pass: String,
    pub salt: String,
}

/// The externally supplied one-way transform.
///
/// Failures propagate as [`Deny`] outcomes with the hook's own reason code
/// and details forwarded verbatim; infrastructure errors use the outer
/// `Result`.
#[async_trait]
pub trait Hasher: Send + Sync {
    async fn digest(&self, pass: &SecretString, salt: &str, rounds: u32) -> Result<Check<String>>;
}

/// Default hook: `rounds` iterations of SHA-256 over `salt || pass`,
/// hex-encoded.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hasher;

#[async_trait]
impl Hasher for Sha256Hasher {
    async fn digest(&self, pass: &SecretString, salt: &str, rounds: u32) -> Result<Check<String>> {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(pass.expose_secret().as_bytes());
        let mut out = hasher.finalize();
        for _ in 1..rounds {
            let mut hasher = Sha256::new();
            hasher.update(&out);
            out = hasher.finalize();
        }
        Ok(Ok(hex::encode(out)))
    }
}

/// Generate a random salt in the configured length and encoding.
pub fn generate_salt(options: &Options) -> Result<String> {
    let mut bytes = vec![0u8; options.salt_bytelen()];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate salt")?;
    Ok(match options.salt_format() {
        SaltFormat::Hex => hex::encode(&bytes),
        SaltFormat::Base64 => Base64::encode_string(&bytes),
    })
}

/// Build storable pass/salt fields from a plaintext.
///
/// Enforces the password length policy, generates a salt when none is
/// supplied (verification flows pass the stored one), and delegates the
/// transform to the injected hook.
pub async fn encrypt(core: &Core, pass: &SecretString, salt: Option<String>) -> Result<Check<Hashed>> {
    let minlen = core.options().password_minlen();
    if pass.expose_secret().chars().count() < minlen {
        return Ok(Err(Deny::with_details(
            Why::PasswordTooShort,
            json!({ "minimum": minlen }),
        )));
    }

    let salt = match salt {
        Some(salt) => salt,
        None => generate_salt(core.options())?,
    };

    match core
        .hasher()
        .digest(pass, &salt, core.options().rounds())
        .await?
    {
        Ok(pass) => Ok(Ok(Hashed { pass, salt })),
        Err(deny) => Ok(Err(deny)),
    }
}

/// Check a proposed plaintext against stored pass/salt fields.
pub async fn verify(
    core: &Core,
    proposed: &SecretString,
    pass: &str,
    salt: &str,
) -> Result<Check<()>> {
    let digest = match core
        .hasher()
        .digest(proposed, salt, core.options().rounds())
        .await?
    {
        Ok(digest) => digest,
        Err(deny) => return Ok(Err(deny)),
    };
    if digest == pass {
        Ok(Ok(()))
    } else {
        Ok(Err(Deny::new(Why::InvalidPassword)))
    }
}
