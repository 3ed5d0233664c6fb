//! Configuration for blogd
//!
//! Sources, lowest priority first:
//! 1. built-in defaults
//! 2. TOML file (`BLOGD_CONFIG`, default `blogd.toml`, optional)
//! 3. environment variables `BLOGD__<SECTION>__<KEY>`
//!
//! Command-line flags are applied on top by the binary.

use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "BLOGD_CONFIG";

const DEFAULT_CONFIG_FILE: &str = "blogd.toml";

/// Global configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,

    /// Logging level
    pub log_level: String,
}

/// RPC server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for gRPC
    pub grpc_addr: SocketAddr,

    /// Bind address for the admin HTTP API (disabled when absent)
    pub http_addr: Option<SocketAddr>,

    /// Messages buffered per ListBlog stream
    pub stream_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            grpc_addr: SocketAddr::from(([0, 0, 0, 0], 50051)),
            http_addr: None,
            stream_buffer: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Memory,
    Sled,
}

impl std::str::FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "sled" => Ok(StorageBackend::Sled),
            other => Err(Error::InvalidConfig(format!("unknown storage backend: {}", other))),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Data directory (sled only)
    pub path: PathBuf,

    pub database: String,
    pub collection: String,

    /// Documents pulled per cursor batch
    pub scan_batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            path: PathBuf::from("./blog-data"),
            database: "mydb".to_string(),
            collection: "blog".to_string(),
            scan_batch_size: crate::engine::DEFAULT_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Load from the file named by `BLOGD_CONFIG` (or `blogd.toml`) and the environment.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::from_sources(Path::new(&path), false)
    }

    /// Load from an explicit file, which must exist.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_sources(path.as_ref(), true)
    }

    fn from_sources(path: &Path, required: bool) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(required))
            .add_source(
                config::Environment::with_prefix("BLOGD")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.stream_buffer == 0 {
            return Err(Error::InvalidConfig("server.stream_buffer must be > 0".into()));
        }
        if self.storage.scan_batch_size == 0 {
            return Err(Error::InvalidConfig("storage.scan_batch_size must be > 0".into()));
        }
        if self.storage.database.is_empty() || self.storage.collection.is_empty() {
            return Err(Error::InvalidConfig(
                "storage.database and storage.collection must not be empty".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Sled && !cfg!(feature = "sled") {
            return Err(Error::InvalidConfig(
                "sled backend requested but blogd was built without the sled-backend feature"
                    .into(),
            ));
        }
        Ok(())
    }

    pub fn log_level(&self) -> &str {
        if self.log_level.is_empty() {
            "info"
        } else {
            &self.log_level
        }
    }
}
