//! Email intake - lands email webhook payloads in Azure Blob Storage.
//!
//! One HTTP endpoint receives the JSON payload an email-automation workflow
//! forwards, stores it verbatim, and stores a compact summary next to it.
//!
//! ## Flow
//!
//! ```text
//! POST /email_intake → landing/email/raw/... (raw payload)
//!                    → processed/email/summary/... (summary with plain-text body)
//! ```

pub mod config;
pub mod error;
pub mod html;
pub mod intake;
pub mod storage;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::IntakeError;
pub use intake::{ingest_email, EmailSummary, IntakePayload, IntakeReceipt};
pub use storage::{AzureBlobStore, BlobStore, MemoryBlobStore, StorageError};
pub use web::{router, AppState};
