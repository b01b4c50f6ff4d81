//! Pluggable token and handle generation.
//!
//! Resolved once at core construction; everything that mints a token goes
//! through the same [`TokenMinter`] so hosts can swap the scheme without
//! touching lifecycle logic.

use rand::Rng;
use uuid::Uuid;

const HANDLE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const HANDLE_LEN: usize = 12;

/// Strategy for bearer tokens and generated handles.
pub trait TokenMinter: Send + Sync {
    /// An opaque, unguessable bearer token.
    fn make_token(&self) -> String;

    /// A fallback handle for registrations that supply none.
    fn make_handle(&self) -> String;
}

/// Default minter: random UUIDs for tokens, short lowercase-alpha handles.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomMinter;

impl TokenMinter for RandomMinter {
    fn make_token(&self) -> String {
        // Random, not time-ordered. Tokens must not leak creation order.
        Uuid::new_v4().to_string()
    }

    fn make_handle(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..HANDLE_LEN)
            .map(|_| HANDLE_ALPHABET[rng.gen_range(0..HANDLE_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique() {
        let minter = RandomMinter;
        assert_ne!(minter.make_token(), minter.make_token());
    }

    #[test]
    fn generated_handles_fit_default_policy() {
        let minter = RandomMinter;
        let handle = minter.make_handle();
        assert_eq!(handle.len(), HANDLE_LEN);
        assert!(handle.chars().all(|c| c.is_ascii_lowercase()));
    }
}
