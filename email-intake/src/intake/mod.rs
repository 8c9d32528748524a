//! Email intake pipeline.
//!
//! Turns one webhook payload into two blobs:
//!
//! ```text
//! IntakePayload → raw blob (pretty JSON) → EmailSummary → summary blob (compact JSON)
//! ```
//!
//! The writes are sequential and not transactional. If the summary write
//! fails, the raw blob stays where it is and the error goes back to the caller.

pub mod path;
pub mod types;

use tracing::{error, info};

use crate::error::IntakeError;
use crate::html::html_to_text;
use crate::storage::{BlobStore, JSON_CONTENT_TYPE};

pub use path::{build_blob_path, compose_blob_path, parse_timestamp, safe_id, BlobArea};
pub use types::{EmailSummary, IntakePayload, IntakeReceipt};

/// Land the raw payload and its summary in blob storage.
pub async fn ingest_email<S: BlobStore>(
    store: &S,
    payload: &IntakePayload,
) -> Result<IntakeReceipt, IntakeError> {
    let internet_message_id = payload.internet_message_id();
    let received = payload.received_date_time();

    let raw_blob_path = build_blob_path(BlobArea::Raw, internet_message_id, received);
    let raw_json = payload.to_pretty_json()?;
    let raw_length = raw_json.len();

    store
        .put_blob(&raw_blob_path, raw_json.into_bytes(), JSON_CONTENT_TYPE)
        .await?;

    info!(
        blob_path = %raw_blob_path,
        body_length = raw_length,
        "raw_blob_written"
    );

    let body_text = html_to_text(payload.body_html());
    let summary = EmailSummary::from_payload(payload, body_text, raw_blob_path.clone());
    let summary_blob_path = build_blob_path(BlobArea::Summary, internet_message_id, received);
    let summary_json = summary.to_json_bytes()?;

    if let Err(e) = store
        .put_blob(&summary_blob_path, summary_json, JSON_CONTENT_TYPE)
        .await
    {
        error!(
            raw_blob_path = %raw_blob_path,
            summary_blob_path = %summary_blob_path,
            error = %e,
            "summary_blob_write_failed_raw_kept"
        );
        return Err(e.into());
    }

    info!(
        blob_path = %summary_blob_path,
        body_text_length = summary.body_text.chars().count(),
        "summary_blob_written"
    );

    Ok(IntakeReceipt::new(raw_blob_path, summary_blob_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::BODY_TEXT_LIMIT;
    use crate::storage::{MemoryBlobStore, StorageError};
    use chrono::Utc;
    use serde_json::{json, Value};

    /// Accepts raw blobs, refuses summaries.
    #[derive(Default)]
    struct SummaryRejectingStore {
        inner: MemoryBlobStore,
    }

    impl BlobStore for SummaryRejectingStore {
        async fn put_blob(
            &self,
            path: &str,
            body: Vec<u8>,
            content_type: &'static str,
        ) -> Result<(), StorageError> {
            if path.starts_with(BlobArea::Summary.prefix()) {
                return Err(StorageError::Rejected {
                    path: path.to_string(),
                    status: 503,
                    body: "ServerBusy".to_string(),
                });
            }
            self.inner.put_blob(path, body, content_type).await
        }
    }

    fn payload(value: Value) -> IntakePayload {
        IntakePayload::from_slice(value.to_string().as_bytes()).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_writes_raw_and_summary() {
        let store = MemoryBlobStore::new();
        let payload = payload(json!({
            "internetMessageId": "<CAF1@mail.example.com>",
            "subject": "Quarterly numbers",
            "receivedDateTime": "2025-11-26T10:15:30Z",
            "id": "AAMkAD",
            "from": {"emailAddress": {"name": "Ana", "address": "ana@example.com"}},
            "hasAttachments": true,
            "body": "<html><body><p>Hello <b>team</b></p><p>Grüße</p></body></html>"
        }));

        let receipt = ingest_email(&store, &payload).await.unwrap();

        assert_eq!(receipt.status, "ok");
        assert!(receipt
            .raw_blob_path
            .starts_with("landing/email/raw/2025/11/26/email_CAF1_mail.example.com_"));
        assert!(receipt
            .summary_blob_path
            .starts_with("processed/email/summary/2025/11/26/email_CAF1_mail.example.com_"));
        assert_eq!(store.len(), 2);

        let raw = store.get(&receipt.raw_blob_path).unwrap();
        assert_eq!(raw.content_type, JSON_CONTENT_TYPE);
        assert_eq!(raw.text(), payload.to_pretty_json().unwrap());
        assert!(raw.text().contains("\n  \"subject\": \"Quarterly numbers\""));
        assert!(raw.text().contains("Grüße"));

        let summary_blob = store.get(&receipt.summary_blob_path).unwrap();
        assert!(!summary_blob.text().contains('\n'));
        let summary: Value = serde_json::from_slice(&summary_blob.body).unwrap();
        assert_eq!(
            summary,
            json!({
                "id": "AAMkAD",
                "internetMessageId": "<CAF1@mail.example.com>",
                "subject": "Quarterly numbers",
                "from": {"emailAddress": {"name": "Ana", "address": "ana@example.com"}},
                "receivedDateTime": "2025-11-26T10:15:30Z",
                "hasAttachments": true,
                "bodyText": "Hello\nteam\nGrüße",
                "rawBlobPath": receipt.raw_blob_path
            })
        );
    }

    #[tokio::test]
    async fn test_ingest_minimal_payload_uses_today() {
        let store = MemoryBlobStore::new();
        let payload = payload(json!({"internetMessageId": null, "subject": "Hi", "body": "<i>x</i>"}));

        let today = Utc::now().format("%Y/%m/%d").to_string();
        let receipt = ingest_email(&store, &payload).await.unwrap();

        assert!(receipt
            .raw_blob_path
            .starts_with(&format!("landing/email/raw/{}/email_", today)));
        assert!(receipt
            .summary_blob_path
            .starts_with(&format!("processed/email/summary/{}/email_", today)));

        let summary: EmailSummary =
            serde_json::from_slice(&store.get(&receipt.summary_blob_path).unwrap().body).unwrap();
        assert_eq!(summary.body_text, "x");
        assert_eq!(summary.internet_message_id, Value::Null);
        assert_eq!(summary.received_date_time, Value::Null);
        assert_eq!(summary.raw_blob_path, receipt.raw_blob_path);
    }

    #[tokio::test]
    async fn test_ingest_truncates_long_bodies() {
        let store = MemoryBlobStore::new();
        let payload = payload(json!({"body": format!("<div>{}</div>", "z".repeat(9000))}));

        let receipt = ingest_email(&store, &payload).await.unwrap();
        let summary: EmailSummary =
            serde_json::from_slice(&store.get(&receipt.summary_blob_path).unwrap().body).unwrap();

        assert_eq!(summary.body_text.chars().count(), BODY_TEXT_LIMIT);
    }

    #[tokio::test]
    async fn test_repeated_ingest_never_collides() {
        let store = MemoryBlobStore::new();
        let payload = payload(json!({"internetMessageId": "<dup@example.com>"}));

        let first = ingest_email(&store, &payload).await.unwrap();
        let second = ingest_email(&store, &payload).await.unwrap();

        assert_ne!(first.raw_blob_path, second.raw_blob_path);
        assert_ne!(first.summary_blob_path, second.summary_blob_path);
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_summary_failure_keeps_raw_blob() {
        let store = SummaryRejectingStore::default();
        let payload = payload(json!({"subject": "partial"}));

        let err = ingest_email(&store, &payload).await.unwrap_err();

        assert!(matches!(
            err,
            IntakeError::Storage(StorageError::Rejected { status: 503, .. })
        ));
        let paths = store.inner.paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("landing/email/raw/"));
    }
}
