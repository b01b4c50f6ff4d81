//! Configuration for the account core.
//!
//! All knobs are resolved once, at [`crate::Core`] construction time, and are
//! read-only afterwards. Defaults mirror a conservative production setup:
//! short handles from a restricted alphabet, hex salts, and fifteen-minute
//! onetime tokens.

use chrono::Duration;
use regex::Regex;
use std::fmt;
use std::sync::Arc;

const DEFAULT_SALT_BYTELEN: usize = 16;
const DEFAULT_ROUNDS: u32 = 11_111;
const DEFAULT_PASSWORD_MINLEN: usize = 8;
const DEFAULT_HANDLE_MINLEN: usize = 3;
const DEFAULT_HANDLE_MAXLEN: usize = 15;
const DEFAULT_LIMIT: usize = 111;
const DEFAULT_ONETIME_EXPIRE_MS: i64 = 15 * 60 * 1000;
const DEFAULT_VERIFY_EXPIRE_MS: i64 = 10 * 60 * 1000;

const HANDLE_PATTERN: &str = r"^[a-z0-9_]+$";

/// Handles nobody may register, regardless of policy.
const DEFAULT_RESERVED: [&str; 2] = ["guest", "visitor"];

/// Default blocklist returned by the disallowed-term generator. Terms are
/// matched exactly against the whole candidate handle.
const DEFAULT_BLOCKLIST: [&str; 8] = [
    "arse", "bastard", "crap", "cunt", "fuck", "shite", "twat", "wank",
];

/// Encoding used for generated salts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SaltFormat {
    Hex,
    Base64,
}

/// Handle policy knobs: length bounds, reserved words, the disallowed-term
/// generator, the charset predicate, and case folding.
#[derive(Clone)]
pub struct HandleOptions {
    minlen: usize,
    maxlen: usize,
    reserved: Vec<String>,
    must_not_contain: Arc<dyn Fn() -> Vec<String> + Send + Sync>,
    must_match: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    downcase: bool,
}

impl HandleOptions {
    #[must_use]
    pub fn minlen(&self) -> usize {
        self.minlen
    }

    #[must_use]
    pub fn maxlen(&self) -> usize {
        self.maxlen
    }

    #[must_use]
    pub fn reserved(&self) -> &[String] {
        &self.reserved
    }

    #[must_use]
    pub fn downcase(&self) -> bool {
        self.downcase
    }

    pub(crate) fn generate_blocklist(&self) -> Vec<String> {
        (self.must_not_contain)()
    }

    pub(crate) fn matches_charset(&self, handle: &str) -> bool {
        (self.must_match)(handle)
    }
}

impl Default for HandleOptions {
    fn default() -> Self {
        Self {
            minlen: DEFAULT_HANDLE_MINLEN,
            maxlen: DEFAULT_HANDLE_MAXLEN,
            reserved: DEFAULT_RESERVED.iter().map(ToString::to_string).collect(),
            must_not_contain: Arc::new(|| {
                DEFAULT_BLOCKLIST.iter().map(ToString::to_string).collect()
            }),
            must_match: Arc::new(|handle| {
                Regex::new(HANDLE_PATTERN).is_ok_and(|regex| regex.is_match(handle))
            }),
            downcase: true,
        }
    }
}

impl fmt::Debug for HandleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleOptions")
            .field("minlen", &self.minlen)
            .field("maxlen", &self.maxlen)
            .field("reserved", &self.reserved)
            .field("downcase", &self.downcase)
            .finish_non_exhaustive()
    }
}

/// Options for the account core, resolved once per instance.
#[derive(Clone, Debug)]
pub struct Options {
    salt_bytelen: usize,
    salt_format: SaltFormat,
    rounds: u32,
    password_minlen: usize,
    standard_fields: Vec<String>,
    limit: usize,
    onetime_expire: Duration,
    verify_expire: Duration,
    handle: HandleOptions,
}

impl Options {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_salt_bytelen(mut self, bytelen: usize) -> Self {
        self.salt_bytelen = bytelen;
        self
    }

    #[must_use]
    pub fn with_salt_format(mut self, format: SaltFormat) -> Self {
        self.salt_format = format;
        self
    }

    #[must_use]
    pub fn with_rounds(mut self, rounds: u32) -> Self {
        self.rounds = rounds;
        self
    }

    #[must_use]
    pub fn with_password_minlen(mut self, minlen: usize) -> Self {
        self.password_minlen = minlen;
        self
    }

    #[must_use]
    pub fn with_standard_fields(mut self, fields: Vec<String>) -> Self {
        self.standard_fields = fields;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_onetime_expire_ms(mut self, ms: i64) -> Self {
        self.onetime_expire = Duration::milliseconds(ms);
        self
    }

    #[must_use]
    pub fn with_verify_expire_ms(mut self, ms: i64) -> Self {
        self.verify_expire = Duration::milliseconds(ms);
        self
    }

    #[must_use]
    pub fn with_handle_minlen(mut self, minlen: usize) -> Self {
        self.handle.minlen = minlen;
        self
    }

    #[must_use]
    pub fn with_handle_maxlen(mut self, maxlen: usize) -> Self {
        self.handle.maxlen = maxlen;
        self
    }

    #[must_use]
    pub fn with_handle_reserved(mut self, reserved: Vec<String>) -> Self {
        self.handle.reserved = reserved;
        self
    }

    /// Replace the disallowed-term generator. The generator runs once, at
    /// core construction; its output becomes an immutable set.
    #[must_use]
    pub fn with_handle_blocklist(
        mut self,
        must_not_contain: Arc<dyn Fn() -> Vec<String> + Send + Sync>,
    ) -> Self {
        self.handle.must_not_contain = must_not_contain;
        self
    }

    /// Replace the allowed-charset predicate.
    #[must_use]
    pub fn with_handle_charset(
        mut self,
        must_match: Arc<dyn Fn(&str) -> bool + Send + Sync>,
    ) -> Self {
        self.handle.must_match = must_match;
        self
    }

    #[must_use]
    pub fn with_handle_downcase(mut self, downcase: bool) -> Self {
        self.handle.downcase = downcase;
        self
    }

    #[must_use]
    pub fn salt_bytelen(&self) -> usize {
        self.salt_bytelen
    }

    #[must_use]
    pub fn salt_format(&self) -> SaltFormat {
        self.salt_format
    }

    #[must_use]
    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    #[must_use]
    pub fn password_minlen(&self) -> usize {
        self.password_minlen
    }

    /// Standard projection applied to account reads; callers may extend it
    /// per request but never shrink it.
    #[must_use]
    pub fn standard_fields(&self) -> &[String] {
        &self.standard_fields
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub fn onetime_expire(&self) -> Duration {
        self.onetime_expire
    }

    #[must_use]
    pub fn verify_expire(&self) -> Duration {
        self.verify_expire
    }

    #[must_use]
    pub fn handle(&self) -> &HandleOptions {
        &self.handle
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            salt_bytelen: DEFAULT_SALT_BYTELEN,
            salt_format: SaltFormat::Hex,
            rounds: DEFAULT_ROUNDS,
            password_minlen: DEFAULT_PASSWORD_MINLEN,
            standard_fields: ["handle", "email", "name", "active"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            limit: DEFAULT_LIMIT,
            onetime_expire: Duration::milliseconds(DEFAULT_ONETIME_EXPIRE_MS),
            verify_expire: Duration::milliseconds(DEFAULT_VERIFY_EXPIRE_MS),
            handle: HandleOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_policy() {
        let options = Options::default();
        assert_eq!(options.salt_bytelen(), 16);
        assert_eq!(options.salt_format(), SaltFormat::Hex);
        assert_eq!(options.rounds(), 11_111);
        assert_eq!(options.password_minlen(), 8);
        assert_eq!(options.limit(), 111);
        assert_eq!(options.onetime_expire().num_minutes(), 15);
        assert_eq!(options.verify_expire().num_minutes(), 10);
        assert_eq!(options.handle().minlen(), 3);
        assert_eq!(options.handle().maxlen(), 15);
        assert!(options.handle().downcase());
        assert_eq!(options.handle().reserved(), &["guest", "visitor"]);
    }

    #[test]
    fn builders_override() {
        let options = Options::default()
            .with_password_minlen(3)
            .with_limit(10)
            .with_onetime_expire_ms(1000)
            .with_handle_minlen(2)
            .with_handle_maxlen(20)
            .with_handle_downcase(false);
        assert_eq!(options.password_minlen(), 3);
        assert_eq!(options.limit(), 10);
        assert_eq!(options.onetime_expire().num_milliseconds(), 1000);
        assert_eq!(options.handle().minlen(), 2);
        assert_eq!(options.handle().maxlen(), 20);
        assert!(!options.handle().downcase());
    }

    #[test]
    fn default_charset_accepts_lowercase_alnum() {
        let options = Options::default();
        assert!(options.handle().matches_charset("alice_01"));
        assert!(!options.handle().matches_charset("Alice"));
        assert!(!options.handle().matches_charset("al ice"));
        assert!(!options.handle().matches_charset("ålice"));
    }

    #[test]
    fn custom_blocklist_generator_is_used() {
        let options = Options::default()
            .with_handle_blocklist(Arc::new(|| vec!["verboten".to_string()]));
        assert_eq!(options.handle().generate_blocklist(), vec!["verboten"]);
    }
}
