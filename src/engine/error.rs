//! Error types for the document engine

use super::ObjectId;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sled")]
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document must be a JSON object")]
    NotADocument,

    #[error("duplicate key: {0}")]
    DuplicateKey(ObjectId),

    #[error("the _id field is immutable (stored {stored}, supplied {supplied})")]
    ImmutableId { stored: ObjectId, supplied: ObjectId },

    #[error("invalid key in backend: {0}")]
    InvalidKey(String),

    #[error("decode error for document {id}: {reason}")]
    Decode { id: ObjectId, reason: String },

    #[error("backend error: {0}")]
    Backend(String),
}
