//! Server-side cursors
//!
//! A cursor is registered with its collection when opened and deregistered
//! when dropped, so the collection always knows how many scans are in flight.

use super::backend::ScanIter;
use super::{ObjectId, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Default number of documents pulled from the backend per batch.
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Open cursors of one collection.
#[derive(Debug, Default)]
pub(crate) struct CursorRegistry {
    next_id: AtomicU64,
    open: Mutex<HashSet<u64>>,
}

impl CursorRegistry {
    fn register(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.open
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(id);
        id
    }

    fn release(&self, id: u64) -> bool {
        self.open
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.open
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// A stored document that has not been decoded yet.
#[derive(Debug, Clone)]
pub struct RawDocument {
    id: ObjectId,
    bytes: Vec<u8>,
}

impl RawDocument {
    pub(crate) fn new(id: ObjectId, bytes: Vec<u8>) -> Self {
        Self { id, bytes }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// Deserialize into a typed document.
    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        serde_json::from_slice(&self.bytes).map_err(|e| StoreError::Decode {
            id: self.id,
            reason: e.to_string(),
        })
    }
}

type Entry = StoreResult<(ObjectId, Vec<u8>)>;

/// Iterates a collection one document at a time.
///
/// Documents are pulled from the backend in batches on the blocking pool.
/// After an error or exhaustion `next` keeps returning `None`.
pub struct Cursor {
    id: u64,
    namespace: String,
    source: Option<ScanIter>,
    buffer: VecDeque<Entry>,
    registry: Arc<CursorRegistry>,
    batch_size: usize,
    pulled: usize,
    done: bool,
}

impl Cursor {
    pub(crate) fn open(
        namespace: &str,
        source: ScanIter,
        registry: Arc<CursorRegistry>,
        batch_size: usize,
    ) -> Self {
        let id = registry.register();
        tracing::debug!(cursor = id, namespace = %namespace, "cursor opened");
        Self {
            id,
            namespace: namespace.to_string(),
            source: Some(source),
            buffer: VecDeque::new(),
            registry,
            batch_size: batch_size.max(1),
            pulled: 0,
            done: false,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pull the next document.
    pub async fn next(&mut self) -> Option<StoreResult<RawDocument>> {
        if self.done {
            return None;
        }
        if self.buffer.is_empty() {
            if let Err(e) = self.fill().await {
                self.done = true;
                return Some(Err(e));
            }
        }

        match self.buffer.pop_front() {
            Some(Ok((id, bytes))) => {
                self.pulled += 1;
                Some(Ok(RawDocument::new(id, bytes)))
            }
            Some(Err(e)) => {
                self.done = true;
                Some(Err(e))
            }
            None => {
                self.done = true;
                None
            }
        }
    }

    async fn fill(&mut self) -> StoreResult<()> {
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };
        let batch_size = self.batch_size;
        let (source, batch, exhausted) = tokio::task::spawn_blocking(move || {
            let mut batch = Vec::with_capacity(batch_size);
            while batch.len() < batch_size {
                match source.next() {
                    Some(entry) => {
                        let failed = entry.is_err();
                        batch.push(entry);
                        if failed {
                            return (source, batch, true);
                        }
                    }
                    None => return (source, batch, true),
                }
            }
            (source, batch, false)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("cursor batch task failed: {}", e)))?;

        if !exhausted {
            self.source = Some(source);
        }
        self.buffer.extend(batch);
        Ok(())
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if self.registry.release(self.id) {
            tracing::debug!(
                cursor = self.id,
                namespace = %self.namespace,
                pulled = self.pulled,
                "cursor released"
            );
        }
    }
}
