//! Document collections
//!
//! Documents are JSON objects. The `_id` field holds the [`ObjectId`] in
//! extended-JSON form and is assigned by the collection on insert when absent.

use super::backend::Backend;
use super::cursor::{Cursor, CursorRegistry, RawDocument, DEFAULT_BATCH_SIZE};
use super::{ObjectId, StoreError, StoreResult};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Name of the identifier field inside every document.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    /// The `_id` of the new document, as stored.
    pub inserted_id: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

struct Inner {
    namespace: String,
    backend: Arc<dyn Backend>,
    cursors: Arc<CursorRegistry>,
}

/// Cheaply cloneable handle to one collection. Safe to share between tasks.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("namespace", &self.inner.namespace)
            .field("open_cursors", &self.inner.cursors.len())
            .finish()
    }
}

impl Collection {
    /// Wrap an arbitrary backend.
    pub fn with_backend(namespace: impl Into<String>, backend: Arc<dyn Backend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                namespace: namespace.into(),
                backend,
                cursors: Arc::new(CursorRegistry::default()),
            }),
        }
    }

    /// `database.collection`
    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    /// Number of cursors that have been opened and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.inner.cursors.len()
    }

    pub async fn insert_one<T: Serialize>(&self, doc: &T) -> StoreResult<InsertOneResult> {
        let mut map = to_document(doc)?;
        let id = match map.get(ID_FIELD) {
            Some(value) => serde_json::from_value::<ObjectId>(value.clone())?,
            None => {
                let id = ObjectId::new();
                map.insert(ID_FIELD.to_string(), serde_json::to_value(id)?);
                id
            }
        };

        let bytes = serde_json::to_vec(&map)?;
        if !self.blocking(move |b| b.insert(&id, bytes)).await? {
            return Err(StoreError::DuplicateKey(id));
        }
        tracing::trace!(namespace = %self.inner.namespace, id = %id, "document inserted");

        Ok(InsertOneResult {
            inserted_id: serde_json::to_value(id)?,
        })
    }

    pub async fn find_one(&self, id: &ObjectId) -> StoreResult<Option<RawDocument>> {
        let id = *id;
        Ok(self
            .blocking(move |b| b.get(&id))
            .await?
            .map(|bytes| RawDocument::new(id, bytes)))
    }

    /// Replace the whole document. The `_id` of the replacement must be absent
    /// or equal to `id`.
    pub async fn replace_one<T: Serialize>(
        &self,
        id: &ObjectId,
        doc: &T,
    ) -> StoreResult<UpdateResult> {
        let mut map = to_document(doc)?;
        if let Some(value) = map.get(ID_FIELD) {
            let supplied = serde_json::from_value::<ObjectId>(value.clone())?;
            if supplied != *id {
                return Err(StoreError::ImmutableId {
                    stored: *id,
                    supplied,
                });
            }
        }
        map.insert(ID_FIELD.to_string(), serde_json::to_value(id)?);

        let bytes = serde_json::to_vec(&map)?;
        let id = *id;
        let matched = u64::from(self.blocking(move |b| b.replace(&id, bytes)).await?);
        Ok(UpdateResult {
            matched_count: matched,
            modified_count: matched,
        })
    }

    pub async fn delete_one(&self, id: &ObjectId) -> StoreResult<DeleteResult> {
        let id = *id;
        let deleted = u64::from(self.blocking(move |b| b.remove(&id)).await?);
        Ok(DeleteResult {
            deleted_count: deleted,
        })
    }

    /// Open a cursor over every document.
    pub async fn find(&self) -> StoreResult<Cursor> {
        self.find_batched(DEFAULT_BATCH_SIZE).await
    }

    pub async fn find_batched(&self, batch_size: usize) -> StoreResult<Cursor> {
        let source = self.blocking(|b| b.scan()).await?;
        Ok(Cursor::open(
            &self.inner.namespace,
            source,
            self.inner.cursors.clone(),
            batch_size,
        ))
    }

    pub async fn count_documents(&self) -> StoreResult<u64> {
        Ok(self.blocking(|b| b.len()).await? as u64)
    }

    /// Run a backend call on the blocking pool; sled does synchronous disk I/O.
    async fn blocking<F, R>(&self, op: F) -> StoreResult<R>
    where
        F: FnOnce(&dyn Backend) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let backend = self.inner.backend.clone();
        tokio::task::spawn_blocking(move || op(backend.as_ref()))
            .await
            .map_err(|e| StoreError::Backend(format!("storage task failed: {}", e)))?
    }
}

fn to_document<T: Serialize>(doc: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(doc)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotADocument),
    }
}
