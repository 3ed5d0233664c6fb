//! Error types for blogd

use crate::engine::StoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Request Errors ===
    #[error("cannot convert to object id: {0}")]
    InvalidIdentifier(String),

    #[error("cannot find blog with specified id: {0}")]
    NotFound(String),

    // === Storage Errors ===
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("failed to decode data from storage: {0}")]
    Decode(String),

    #[error("cannot convert inserted id to object id: {0}")]
    UnexpectedIdentifier(String),

    // === Network Errors ===
    #[error("failed to send data in response stream: {0}")]
    StreamDelivery(String),

    #[error("transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to gRPC status for RPC responses
    pub fn to_grpc_status(&self) -> tonic::Status {
        use tonic::Code;
        match self {
            Error::InvalidIdentifier(_) => tonic::Status::new(Code::InvalidArgument, self.to_string()),
            Error::NotFound(_) => tonic::Status::new(Code::NotFound, self.to_string()),
            _ => tonic::Status::new(Code::Internal, self.to_string()),
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::InvalidIdentifier(_) | Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for tonic::Status {
    fn from(e: Error) -> Self {
        e.to_grpc_status()
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
