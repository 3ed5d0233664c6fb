//! Raw document storage backends
//!
//! A backend stores serialized documents keyed by [`ObjectId`]. It knows nothing
//! about the document format; the [`Collection`](super::Collection) layer owns
//! encoding and the `_id` field. Every method is atomic per document.
//!
//! Supports in-memory and sled backends.
use super::{ObjectId, StoreError, StoreResult};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Lazy iterator over `(id, serialized document)` pairs.
pub type ScanIter = Box<dyn Iterator<Item = StoreResult<(ObjectId, Vec<u8>)>> + Send>;

/// Trait for document storage backends
pub trait Backend: Send + Sync {
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>>;

    /// Insert if absent. Returns `false` when the key already exists.
    fn insert(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool>;

    /// Overwrite an existing document. Returns `false` when nothing matched.
    fn replace(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool>;

    /// Returns `true` when a document was removed.
    fn remove(&self, id: &ObjectId) -> StoreResult<bool>;

    fn scan(&self) -> StoreResult<ScanIter>;

    fn len(&self) -> StoreResult<usize>;

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}

type DocMap = BTreeMap<ObjectId, Vec<u8>>;

/// In-memory backend (default)
#[derive(Default)]
pub struct MemBackend {
    map: Arc<RwLock<DocMap>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(map: &RwLock<DocMap>) -> StoreResult<RwLockReadGuard<'_, DocMap>> {
        map.read()
            .map_err(|_| StoreError::Backend("memory backend lock poisoned".into()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, DocMap>> {
        self.map
            .write()
            .map_err(|_| StoreError::Backend("memory backend lock poisoned".into()))
    }
}

impl Backend for MemBackend {
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        Ok(Self::read(&self.map)?.get(id).cloned())
    }

    fn insert(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool> {
        let mut map = self.write()?;
        if map.contains_key(id) {
            return Ok(false);
        }
        map.insert(*id, doc);
        Ok(true)
    }

    fn replace(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool> {
        let mut map = self.write()?;
        match map.get_mut(id) {
            Some(slot) => {
                *slot = doc;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn remove(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.write()?.remove(id).is_some())
    }

    /// Snapshots the key set, then fetches each document on demand. Documents
    /// removed after the scan started are skipped.
    fn scan(&self) -> StoreResult<ScanIter> {
        let keys: Vec<ObjectId> = Self::read(&self.map)?.keys().copied().collect();
        let map = self.map.clone();
        let iter = keys.into_iter().filter_map(move |id| match Self::read(&map) {
            Ok(guard) => guard.get(&id).cloned().map(|doc| Ok((id, doc))),
            Err(e) => Some(Err(e)),
        });
        Ok(Box::new(iter))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(Self::read(&self.map)?.len())
    }
}

/// Sled backend, one tree per collection
#[cfg(feature = "sled")]
pub struct SledBackend {
    tree: sled::Tree,
}

#[cfg(feature = "sled")]
impl SledBackend {
    pub fn open(db: &sled::Db, namespace: &str) -> StoreResult<Self> {
        Ok(Self {
            tree: db.open_tree(namespace)?,
        })
    }

    fn key_to_id(key: &[u8]) -> StoreResult<ObjectId> {
        let bytes: [u8; ObjectId::LEN] = key
            .try_into()
            .map_err(|_| StoreError::InvalidKey(hex::encode(key)))?;
        Ok(ObjectId::from_bytes(bytes))
    }
}

#[cfg(feature = "sled")]
impl Backend for SledBackend {
    fn get(&self, id: &ObjectId) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.tree.get(id.bytes())?.map(|ivec| ivec.to_vec()))
    }

    fn insert(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool> {
        let swapped = self
            .tree
            .compare_and_swap(id.bytes(), None as Option<&[u8]>, Some(doc))?;
        Ok(swapped.is_ok())
    }

    fn replace(&self, id: &ObjectId, doc: Vec<u8>) -> StoreResult<bool> {
        let previous = self
            .tree
            .fetch_and_update(id.bytes(), |old| old.map(|_| doc.clone()))?;
        Ok(previous.is_some())
    }

    fn remove(&self, id: &ObjectId) -> StoreResult<bool> {
        Ok(self.tree.remove(id.bytes())?.is_some())
    }

    fn scan(&self) -> StoreResult<ScanIter> {
        let iter = self.tree.iter().map(|entry| {
            let (key, value) = entry?;
            Ok((Self::key_to_id(&key)?, value.to_vec()))
        });
        Ok(Box::new(iter))
    }

    fn len(&self) -> StoreResult<usize> {
        Ok(self.tree.len())
    }
}
