//! Embedded document engine
//!
//! The engine stores JSON documents in named collections grouped into
//! databases:
//! - `Client` owns the backend (memory or sled)
//! - `Database` is a named group of collections
//! - `Collection` is the handle the service layer works with
//!
//! Collection handles are `Clone + Send + Sync` and may be shared freely
//! between concurrent calls.

pub mod backend;
pub mod collection;
pub mod cursor;
pub mod error;
pub mod object_id;

pub use backend::{Backend, MemBackend, ScanIter};
#[cfg(feature = "sled")]
pub use backend::SledBackend;
pub use collection::{Collection, DeleteResult, InsertOneResult, UpdateResult, ID_FIELD};
pub use cursor::{Cursor, RawDocument, DEFAULT_BATCH_SIZE};
pub use error::{StoreError, StoreResult};
pub use object_id::ObjectId;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Builds a backend for a `database.collection` namespace.
pub type BackendFactory = dyn Fn(&str) -> StoreResult<Arc<dyn Backend>> + Send + Sync;

enum Engine {
    Memory,
    #[cfg(feature = "sled")]
    Sled(sled::Db),
    Custom(Arc<BackendFactory>),
}

struct ClientInner {
    engine: Engine,
    collections: Mutex<HashMap<String, Collection>>,
}

/// Entry point to the engine. Opening the same namespace twice yields handles
/// to the same collection.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl Client {
    fn with_engine(engine: Engine) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                engine,
                collections: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Volatile in-memory engine.
    pub fn memory() -> Self {
        Self::with_engine(Engine::Memory)
    }

    /// Persistent engine backed by a sled database directory.
    #[cfg(feature = "sled")]
    pub fn open_sled(path: impl AsRef<std::path::Path>) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self::with_engine(Engine::Sled(db)))
    }

    /// Engine whose collections come from a caller-provided factory.
    pub fn with_backend_factory<F>(factory: F) -> Self
    where
        F: Fn(&str) -> StoreResult<Arc<dyn Backend>> + Send + Sync + 'static,
    {
        Self::with_engine(Engine::Custom(Arc::new(factory)))
    }

    pub fn database(&self, name: &str) -> Database {
        Database {
            client: self.clone(),
            name: name.to_string(),
        }
    }

    /// Round-trip to the engine.
    pub fn ping(&self) -> StoreResult<()> {
        match &self.inner.engine {
            #[cfg(feature = "sled")]
            Engine::Sled(db) => {
                db.size_on_disk()?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Flush pending writes to durable storage, if the engine has any.
    pub async fn flush(&self) -> StoreResult<()> {
        match &self.inner.engine {
            #[cfg(feature = "sled")]
            Engine::Sled(db) => {
                db.flush_async().await?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn collection(&self, namespace: String) -> StoreResult<Collection> {
        let mut collections = self
            .inner
            .collections
            .lock()
            .map_err(|_| StoreError::Backend("collection registry lock poisoned".into()))?;
        if let Some(existing) = collections.get(&namespace) {
            return Ok(existing.clone());
        }

        let backend: Arc<dyn Backend> = match &self.inner.engine {
            Engine::Memory => Arc::new(MemBackend::new()),
            #[cfg(feature = "sled")]
            Engine::Sled(db) => Arc::new(SledBackend::open(db, &namespace)?),
            Engine::Custom(factory) => (**factory)(&namespace)?,
        };
        let collection = Collection::with_backend(namespace.clone(), backend);
        collections.insert(namespace, collection.clone());
        Ok(collection)
    }
}

/// Named group of collections.
#[derive(Clone)]
pub struct Database {
    client: Client,
    name: String,
}

impl Database {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn collection(&self, name: &str) -> StoreResult<Collection> {
        self.client.collection(format!("{}.{}", self.name, name))
    }
}
