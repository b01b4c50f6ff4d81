//! The per-instance context.
//!
//! A [`Core`] is built once from [`Options`] plus the injected strategy
//! objects, and passed by reference into every operation. The reserved and
//! disallowed handle sets are computed here, once; there is no process-wide
//! mutable state anywhere in the crate.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::hash::{Hasher, Sha256Hasher};
use crate::options::Options;
use crate::store::{EntityStore, MemoryStore};
use crate::token::{RandomMinter, TokenMinter};

#[derive(Clone)]
pub struct Core {
    options: Options,
    reserved: HashSet<String>,
    disallowed: HashSet<String>,
    store: Arc<dyn EntityStore>,
    hasher: Arc<dyn Hasher>,
    minter: Arc<dyn TokenMinter>,
}

impl Core {
    /// Build a context over the given store, with the default hash hook and
    /// token minter. The disallowed-term generator runs exactly once, here.
    #[must_use]
    pub fn new(options: Options, store: Arc<dyn EntityStore>) -> Self {
        let reserved = options.handle().reserved().iter().cloned().collect();
        let disallowed = options.handle().generate_blocklist().into_iter().collect();
        Self {
            options,
            reserved,
            disallowed,
            store,
            hasher: Arc::new(Sha256Hasher),
            minter: Arc::new(RandomMinter),
        }
    }

    /// A context over a fresh [`MemoryStore`]; test and demo convenience.
    #[must_use]
    pub fn in_memory(options: Options) -> Self {
        Self::new(options, Arc::new(MemoryStore::new()))
    }

    /// Swap the password-hash hook.
    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn Hasher>) -> Self {
        self.hasher = hasher;
        self
    }

    /// Swap the token/handle generator.
    #[must_use]
    pub fn with_minter(mut self, minter: Arc<dyn TokenMinter>) -> Self {
        self.minter = minter;
        self
    }

    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn hasher(&self) -> &dyn Hasher {
        self.hasher.as_ref()
    }

    #[must_use]
    pub fn minter(&self) -> &dyn TokenMinter {
        self.minter.as_ref()
    }

    pub(crate) fn is_reserved(&self, handle: &str) -> bool {
        self.reserved.contains(handle)
    }

    pub(crate) fn is_disallowed(&self, handle: &str) -> bool {
        self.disallowed.contains(handle)
    }
}

impl fmt::Debug for Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core")
            .field("options", &self.options)
            .field("reserved", &self.reserved.len())
            .field("disallowed", &self.disallowed.len())
            .finish_non_exhaustive()
    }
}
