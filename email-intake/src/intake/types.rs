//! Intake payload, summary, and receipt types.
//!
//! The payload is kept as the JSON object the workflow sent, so the raw blob
//! is a faithful copy (key order included). Typed accessors read the handful
//! of fields the pipeline needs.

use std::io;

use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

use crate::error::IntakeError;

/// Email webhook payload as received from the upstream workflow.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakePayload {
    fields: Map<String, Value>,
}

impl IntakePayload {
    /// Parse a request body. Anything but a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, IntakeError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(fields)) => Ok(Self { fields }),
            Ok(_) | Err(_) => Err(IntakeError::InvalidPayload),
        }
    }

    /// Raw value of a field, `Null` when absent.
    pub fn field(&self, name: &str) -> Value {
        self.fields.get(name).cloned().unwrap_or(Value::Null)
    }

    fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    pub fn internet_message_id(&self) -> Option<&str> {
        self.str_field("internetMessageId")
    }

    pub fn subject(&self) -> Option<&str> {
        self.str_field("subject")
    }

    pub fn received_date_time(&self) -> Option<&str> {
        self.str_field("receivedDateTime")
    }

    /// HTML body. Accepts a plain string or the Graph `{"content": ...}` shape.
    pub fn body_html(&self) -> Option<&str> {
        match self.fields.get("body")? {
            Value::String(html) => Some(html.as_str()),
            Value::Object(body) => body.get("content").and_then(Value::as_str),
            _ => None,
        }
    }

    /// Pretty-printed copy of the payload with two-space indentation.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.fields)
    }
}

/// Compact analytics record derived from one payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailSummary {
    pub id: Value,
    pub internet_message_id: Value,
    pub subject: Value,
    pub from: Value,
    pub received_date_time: Value,
    pub has_attachments: Value,
    pub body_text: String,
    pub raw_blob_path: String,
}

impl EmailSummary {
    /// Assemble a summary, passing the identifying fields through untouched.
    pub fn from_payload(payload: &IntakePayload, body_text: String, raw_blob_path: String) -> Self {
        Self {
            id: payload.field("id"),
            internet_message_id: payload.field("internetMessageId"),
            subject: payload.field("subject"),
            from: payload.field("from"),
            received_date_time: payload.field("receivedDateTime"),
            has_attachments: payload.field("hasAttachments"),
            body_text,
            raw_blob_path,
        }
    }

    /// Single-line JSON with `", "` and `": "` separators.
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        self.serialize(&mut ser)?;
        Ok(buf)
    }
}

/// Compact formatter that keeps a space after each separator.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Acknowledgement returned to the caller after both writes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeReceipt {
    pub status: &'static str,
    pub raw_blob_path: String,
    pub summary_blob_path: String,
}

impl IntakeReceipt {
    pub fn new(raw_blob_path: String, summary_blob_path: String) -> Self {
        Self {
            status: "ok",
            raw_blob_path,
            summary_blob_path,
        }
    }
}
