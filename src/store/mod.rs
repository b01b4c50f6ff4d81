//! The consumed entity-store interface.
//!
//! The engine never talks to a database directly: it loads, lists, and
//! saves JSON documents through [`EntityStore`] over three canonical
//! collections. The store owns id assignment durability and any unique
//! indexes; this crate's uniqueness checks are a fast-reject optimization,
//! not the final guarantee.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Collection of account documents.
pub const ACCOUNTS: &str = "accounts";
/// Collection of session documents.
pub const SESSIONS: &str = "sessions";
/// Collection of verification documents.
pub const VERIFICATIONS: &str = "verifications";

/// Filter fields that identify at most one document.
pub const UNIQUE_KEYS: [&str; 3] = ["id", "handle", "email"];

/// Errors a store implementation reports for malformed documents.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document is not an object")]
    NotAnObject,
    #[error("document id is not a string")]
    BadId,
}

/// An exact-match query with optional projection and result limit.
#[derive(Debug, Clone, Default)]
pub struct Query {
    filter: Map<String, Value>,
    fields: Vec<String>,
    limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A query matching a single field.
    #[must_use]
    pub fn by(key: &str, value: Value) -> Self {
        let mut filter = Map::new();
        filter.insert(key.to_string(), value);
        Self {
            filter,
            fields: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn from_filter(filter: Map<String, Value>) -> Self {
        Self {
            filter,
            fields: Vec::new(),
            limit: None,
        }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: Value) -> Self {
        self.filter.insert(key.to_string(), value);
        self
    }

    /// Set the projection. An empty list means the full document.
    #[must_use]
    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn filter(&self) -> &Map<String, Value> {
        &self.filter
    }

    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// The first unique-key field present in the filter, if any. Queries
    /// carrying one can take a direct-lookup fast path.
    #[must_use]
    pub fn unique_key(&self) -> Option<(&str, &Value)> {
        UNIQUE_KEYS
            .iter()
            .find_map(|key| self.filter.get(*key).map(|value| (*key, value)))
    }
}

/// Load/list/save over JSON documents.
///
/// `save` upserts by `id`: fields of the supplied document are merged over
/// the stored one, so a partially projected read can be written back without
/// clobbering unprojected fields. Documents without an id are inserted and
/// assigned one.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load(&self, collection: &str, query: &Query) -> Result<Option<Value>>;
    async fn list(&self, collection: &str, query: &Query) -> Result<Vec<Value>>;
    async fn save(&self, collection: &str, doc: Value) -> Result<Value>;
}
