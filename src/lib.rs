//! # Konto (Account-Identity Core)
//!
//! `konto` is the account-identity core of a message-driven service: it
//! owns the lifecycle of user accounts, login sessions, and short-lived
//! verification tokens, and enforces the invariants that make an
//! authentication subsystem trustworthy: unique handles and emails,
//! password policy, token expiry.
//!
//! ## Accounts, Handles, Legacy Shapes
//!
//! An account has a unique, policy-constrained `handle` (lowercase by
//! default, reserved words and blocked terms refused, blocked terms never
//! echoed raw) and an optional unique `email`. Requests may identify an
//! account through several legacy shapes: nested `user`/`user_data`
//! objects, an explicit query object, top-level convenience fields, or the
//! deprecated `nick` alias. A normalization pass canonicalizes the shape
//! before any policy logic runs, and the resolver treats more than one
//! match as a hard failure rather than operating on an arbitrary account.
//!
//! ## Sessions and Verifications
//!
//! Logins produce bearer tokens; flows that need a single-use grant get a
//! onetime token with an absolute expiry. Verification challenges are bound
//! to an account and a purpose, and a failed check distinguishes a wrong
//! token from an expired one from one already used. Expiry is lazy: no
//! background sweep, the clock is checked when a token is presented.
//!
//! ## What the host provides
//!
//! Persistence is consumed through the [`store::EntityStore`] trait over
//! three collections (`accounts`, `sessions`, `verifications`); the
//! password transform through the [`hash::Hasher`] hook; token and handle
//! generation through [`token::TokenMinter`]. All three are resolved once
//! into a [`Core`] and passed by reference into every operation. Uniqueness
//! validation is check-then-act: the store's own unique indexes are the
//! final backstop for concurrent writers.
//!
//! ## Replies
//!
//! Every operation returns a flat `{ok, ...}` reply. Failures carry a
//! stable kebab-case `why` code and optional details; nothing domain-level
//! is raised as an error.

pub mod core;
pub mod credential;
pub mod email;
pub mod handle;
pub mod handlers;
pub mod hash;
pub mod model;
pub(crate) mod msg;
pub mod normalize;
pub mod options;
pub mod reply;
pub mod resolve;
pub mod session;
pub mod store;
pub mod token;
pub mod verify;

pub use crate::core::Core;
pub use crate::handlers::dispatch;
pub use crate::hash::{Hashed, Hasher, Sha256Hasher};
pub use crate::model::{Account, Session, Verification, SV};
pub use crate::options::{Options, SaltFormat};
pub use crate::reply::{Check, Deny, Reply, Why};
pub use crate::resolve::find_user;
pub use crate::store::{EntityStore, MemoryStore, Query};
pub use crate::token::{RandomMinter, TokenMinter};
