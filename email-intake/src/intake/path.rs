//! Blob path construction.
//!
//! Paths look like `<prefix>/<yyyy>/<mm>/<dd>/email_<safeId>_<suffix>.json`.
//! The date comes from `receivedDateTime` (or the current UTC time), the id
//! from a sanitised `internetMessageId`, and the suffix from a fresh UUID so
//! two calls never produce the same path.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::debug;
use uuid::Uuid;

/// Where in the container a blob belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobArea {
    /// Landing zone for the untouched payload
    Raw,
    /// Derived analytics summaries
    Summary,
}

impl BlobArea {
    pub fn prefix(self) -> &'static str {
        match self {
            BlobArea::Raw => "landing/email/raw",
            BlobArea::Summary => "processed/email/summary",
        }
    }
}

/// Build a fresh blob path for an email.
pub fn build_blob_path(
    area: BlobArea,
    internet_message_id: Option<&str>,
    received: Option<&str>,
) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    compose_blob_path(area, internet_message_id, received, Utc::now(), &suffix[..8])
}

/// Deterministic core of [`build_blob_path`].
pub fn compose_blob_path(
    area: BlobArea,
    internet_message_id: Option<&str>,
    received: Option<&str>,
    now: DateTime<Utc>,
    suffix: &str,
) -> String {
    let date = resolve_received(received, now);
    let id = safe_id(internet_message_id, date);

    format!(
        "{}/{}/email_{}_{}.json",
        area.prefix(),
        date.format("%Y/%m/%d"),
        id,
        suffix
    )
}

/// Parse `receivedDateTime`, falling back to `now` when absent or unparseable.
pub fn resolve_received(received: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    match received.filter(|r| !r.is_empty()) {
        Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
            debug!(received = raw, "received_date_time_unparseable_using_now");
            now
        }),
        None => now,
    }
}

/// Parse an ISO-8601 timestamp into UTC.
///
/// Accepts offsets (including `Z`), naive date-times (taken as UTC), and bare
/// dates (midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Offsets without a colon, or times without seconds, miss RFC 3339
    let zoned = match raw.strip_suffix(|c| c == 'Z' || c == 'z') {
        Some(rest) => format!("{}+00:00", rest),
        None => raw.to_string(),
    };

    const ZONED_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f%#z",
        "%Y-%m-%d %H:%M:%S%.f%#z",
        "%Y-%m-%dT%H:%M%#z",
        "%Y-%m-%d %H:%M%#z",
    ];

    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&zoned, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Turn a message id into a token safe for a path segment.
///
/// Without an id, the timestamp (`YYYYMMDDTHHMMSS`) stands in.
pub fn safe_id(internet_message_id: Option<&str>, date: DateTime<Utc>) -> String {
    match internet_message_id.filter(|id| !id.is_empty()) {
        Some(id) => id
            .replace('<', "")
            .replace('>', "")
            .replace('@', "_")
            .replace(':', "_")
            .replace('/', "_"),
        None => date.format("%Y%m%dT%H%M%S").to_string(),
    }
}
