//! Blob storage module.
//!
//! This module provides:
//! - The `BlobStore` seam the intake pipeline writes through
//! - An Azure Blob Storage client speaking the REST API directly
//! - An in-memory store for tests and local runs

pub mod azure;
pub mod connection;
pub mod memory;

use std::future::Future;

use thiserror::Error;

pub use azure::AzureBlobStore;
pub use connection::{ConnectionString, Credential};
pub use memory::{MemoryBlobStore, StoredBlob};

/// Content type used for every blob this service writes.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Errors raised while talking to blob storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage connection string: {0}")]
    InvalidConnectionString(String),

    #[error("storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("storage rejected write to {path} with status {status}: {body}")]
    Rejected {
        path: String,
        status: u16,
        body: String,
    },
}

/// A container that accepts whole-object writes.
///
/// Writes replace any object already stored under the same path.
pub trait BlobStore: Send + Sync + 'static {
    fn put_blob(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
