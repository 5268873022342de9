//! Generic key-value repository.
//!
//! Any record that can name its own key implements [`Entity`] and can be kept
//! in a [`Repository`]. Services depend on the trait object so the storage
//! engine can be swapped (tests use the same in-memory backend as production).
//!
//! # Semantics
//!
//! - `insert` and `update` are both upserts (last writer wins).
//! - `find` and `delete` return [`RepositoryError::NotFound`] for absent keys.
//! - `list_all` returns a snapshot; order is unspecified.

use crate::error::{RepositoryError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use tokio::sync::RwLock;

/// A record that carries its own identity.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Key type used to store and look up the record.
    type Key: Clone + Eq + Hash + Display + Send + Sync + 'static;

    /// Returns the record's key.
    fn key(&self) -> Self::Key;
}

/// Storage contract for identity-bearing records.
#[async_trait]
pub trait Repository<T: Entity>: Send + Sync {
    /// Store a record, replacing any existing record with the same key.
    async fn insert(&self, record: T) -> Result<()>;

    /// Look up a record by key.
    async fn find(&self, key: &T::Key) -> Result<T>;

    /// Replace the stored record with the same key (inserts if absent).
    async fn update(&self, record: T) -> Result<()>;

    /// Remove the record stored under `key`.
    async fn delete(&self, key: &T::Key) -> Result<()>;

    /// Snapshot of every stored record.
    async fn list_all(&self) -> Result<Vec<T>>;
}

/// In-process repository backed by a `RwLock<HashMap>`.
///
/// Contents live for the process lifetime only.
#[derive(Debug)]
pub struct InMemoryRepository<T: Entity> {
    records: RwLock<HashMap<T::Key, T>>,
}

impl<T: Entity> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> InMemoryRepository<T> {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the repository holds no records.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    async fn insert(&self, record: T) -> Result<()> {
        self.records.write().await.insert(record.key(), record);
        Ok(())
    }

    async fn find(&self, key: &T::Key) -> Result<T> {
        self.records
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(key.to_string()))
    }

    async fn update(&self, record: T) -> Result<()> {
        self.records.write().await.insert(record.key(), record);
        Ok(())
    }

    async fn delete(&self, key: &T::Key) -> Result<()> {
        match self.records.write().await.remove(key) {
            Some(_) => Ok(()),
            None => {
                tracing::debug!(target: "common.repository", key = %key, "Delete of absent key");
                Err(RepositoryError::NotFound(key.to_string()))
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<T>> {
        Ok(self.records.read().await.values().cloned().collect())
    }
}
