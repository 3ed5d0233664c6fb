//! # blogd
//!
//! A gRPC service for blog posts stored in an embedded document engine:
//! - Create / Read / Update / Delete / List over `blog.BlogService`
//! - 24-character hex identifiers at the boundary
//! - Streamed listing with guaranteed cursor cleanup
//! - In-memory or sled-backed storage
//!
//! ## Architecture
//!
//! ```text
//! client ──gRPC──▶ BlogGrpcService ──▶ codec ──▶ BlogRepository ──▶ Collection
//!                        │                                             │
//!                        └──── stream emitter ◀──── Cursor ◀───────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! blogd serve --grpc 0.0.0.0:50051 --http 127.0.0.1:50052
//! blogd serve --storage sled --data ./blog-data   # needs --features sled-backend
//! ```

pub mod common;
pub mod engine;
pub mod service;

// Re-export commonly used types
pub use common::{Config, Error, Result};
pub use service::BlogServer;

// Generated protobuf code
pub mod proto {
    tonic::include_proto!("blog");

    /// Encoded descriptors for server reflection.
    pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("blog_descriptor");
}

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
