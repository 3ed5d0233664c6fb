//! Blog repository: a thin mapping from record operations to collection calls.
//!
//! Engine failures are wrapped in [`Error::Storage`] and passed up as-is.

use crate::common::{Error, Result};
use crate::engine::{Collection, Cursor, ObjectId, DEFAULT_BATCH_SIZE};
use crate::service::model::BlogItem;
use serde_json::Value;

#[derive(Clone, Debug)]
pub struct BlogRepository {
    collection: Collection,
    batch_size: usize,
}

impl BlogRepository {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Documents pulled per cursor batch in [`scan_all`](Self::scan_all).
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// Store a new record. Returns the identifier exactly as the engine reported it.
    pub async fn insert(&self, item: &BlogItem) -> Result<Value> {
        let res = self.collection.insert_one(item).await?;
        Ok(res.inserted_id)
    }

    pub async fn find_by_id(&self, id: &ObjectId) -> Result<Option<BlogItem>> {
        match self.collection.find_one(id).await? {
            Some(raw) => {
                let item = raw.decode().map_err(|e| Error::Decode(e.to_string()))?;
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    /// Whole-record replacement. Returns `false` when no record matched.
    pub async fn replace(&self, id: &ObjectId, item: &BlogItem) -> Result<bool> {
        let res = self.collection.replace_one(id, item).await?;
        Ok(res.matched_count > 0)
    }

    pub async fn delete_by_id(&self, id: &ObjectId) -> Result<u64> {
        let res = self.collection.delete_one(id).await?;
        Ok(res.deleted_count)
    }

    pub async fn scan_all(&self) -> Result<Cursor> {
        Ok(self.collection.find_batched(self.batch_size).await?)
    }
}
