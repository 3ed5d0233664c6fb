//! Common utilities and types shared across blogd

pub mod config;
pub mod error;
pub mod metrics;
pub mod request_id;

pub use config::{Config, ServerConfig, StorageBackend, StorageConfig};
pub use error::{Error, Result};
pub use metrics::{MetricsRegistry, METRICS};
