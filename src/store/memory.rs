//! In-process entity store for tests and demos.
//!
//! Exact-match filters, merge-upsert by id, projection. No unique indexes:
//! like a store without constraint enforcement, it will happily keep two
//! documents with the same handle, which is exactly what the policy layer's
//! fast-reject checks are tested against.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;
use ulid::Ulid;

use super::{EntityStore, Query, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<Map<String, Value>>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn matches(doc: &Map<String, Value>, query: &Query) -> bool {
        query
            .filter()
            .iter()
            .all(|(key, value)| doc.get(key) == Some(value))
    }

    fn project(doc: &Map<String, Value>, query: &Query) -> Value {
        if query.fields().is_empty() {
            return Value::Object(doc.clone());
        }
        let mut out = Map::new();
        // The id always survives projection.
        if let Some(id) = doc.get("id") {
            out.insert("id".to_string(), id.clone());
        }
        for field in query.fields() {
            if let Some(value) = doc.get(field) {
                out.insert(field.clone(), value.clone());
            }
        }
        Value::Object(out)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn load(&self, collection: &str, query: &Query) -> Result<Option<Value>> {
        let collections = self.collections.lock().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(None);
        };
        Ok(docs
            .iter()
            .find(|doc| Self::matches(doc, query))
            .map(|doc| Self::project(doc, query)))
    }

    async fn list(&self, collection: &str, query: &Query) -> Result<Vec<Value>> {
        let collections = self.collections.lock().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        let limit = query.limit().unwrap_or(usize::MAX);
        Ok(docs
            .iter()
            .filter(|doc| Self::matches(doc, query))
            .take(limit)
            .map(|doc| Self::project(doc, query))
            .collect())
    }

    async fn save(&self, collection: &str, doc: Value) -> Result<Value> {
        let Value::Object(mut doc) = doc else {
            return Err(StoreError::NotAnObject.into());
        };

        let mut collections = self.collections.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();

        let id = match doc.get("id") {
            None => {
                let id = Ulid::new().to_string();
                doc.insert("id".to_string(), Value::String(id.clone()));
                id
            }
            Some(Value::String(id)) => id.clone(),
            Some(_) => return Err(StoreError::BadId.into()),
        };

        if let Some(existing) = docs
            .iter_mut()
            .find(|existing| existing.get("id").and_then(Value::as_str) == Some(id.as_str()))
        {
            for (key, value) in doc {
                existing.insert(key, value);
            }
            return Ok(Value::Object(existing.clone()));
        }

        docs.push(doc.clone());
        Ok(Value::Object(doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_assigns_an_id() -> Result<()> {
        let store = MemoryStore::new();
        let saved = store.save("accounts", json!({"handle": "alice"})).await?;
        assert!(saved["id"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn save_merges_over_existing_fields() -> Result<()> {
        let store = MemoryStore::new();
        let saved = store
            .save("accounts", json!({"handle": "alice", "plan": "pro"}))
            .await?;
        let id = saved["id"].as_str().unwrap().to_string();

        // A projected read written back must not clobber `plan`.
        store
            .save("accounts", json!({"id": id, "name": "Alice"}))
            .await?;
        let loaded = store
            .load("accounts", &Query::by("id", json!(id)))
            .await?
            .unwrap();
        assert_eq!(loaded["plan"], json!("pro"));
        assert_eq!(loaded["name"], json!("Alice"));
        Ok(())
    }

    #[tokio::test]
    async fn load_filters_and_projects() -> Result<()> {
        let store = MemoryStore::new();
        store
            .save(
                "accounts",
                json!({"handle": "alice", "email": "a@x.com", "pass": "digest"}),
            )
            .await?;

        let query = Query::by("handle", json!("alice"))
            .with_fields(vec!["handle".to_string(), "email".to_string()]);
        let doc = store.load("accounts", &query).await?.unwrap();
        assert_eq!(doc["handle"], json!("alice"));
        assert!(doc.get("pass").is_none());
        assert!(doc["id"].is_string());

        assert!(store
            .load("accounts", &Query::by("handle", json!("bob")))
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn list_respects_limit() -> Result<()> {
        let store = MemoryStore::new();
        for n in 0..5 {
            store
                .save("accounts", json!({"handle": format!("user_{n}"), "active": true}))
                .await?;
        }
        let docs = store
            .list(
                "accounts",
                &Query::by("active", json!(true)).with_limit(3),
            )
            .await?;
        assert_eq!(docs.len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn save_rejects_non_objects() {
        let store = MemoryStore::new();
        assert!(store.save("accounts", json!("nope")).await.is_err());
    }
}
