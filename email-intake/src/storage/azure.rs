//! Azure Blob Storage client.
//!
//! Speaks the Blob service REST API directly. Each write is a single
//! `Put Blob` call, which creates the block blob or replaces it wholesale.
//! Requests are authorised with Shared Key signing or a SAS token, depending
//! on what the connection string carries.

use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use sha2::Sha256;
use tracing::{debug, warn};
use url::Url;

use super::connection::{ConnectionString, Credential};
use super::{BlobStore, StorageError};

type HmacSha256 = Hmac<Sha256>;

/// Blob service REST API version sent with every request.
pub const API_VERSION: &str = "2021-08-06";

/// Azure Blob Storage client bound to one container.
pub struct AzureBlobStore {
    client: Client,
    connection: ConnectionString,
    container: String,
}

impl AzureBlobStore {
    /// Create a store from an already parsed connection string.
    pub fn new(
        connection: ConnectionString,
        container: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("email-intake/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            connection,
            container: container.into(),
        })
    }

    /// Create a store straight from a raw connection string.
    pub fn from_connection_string(
        raw: &str,
        container: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        Self::new(ConnectionString::parse(raw)?, container, timeout)
    }

    /// Name of the container every blob is written to.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Build the request URL for a blob, percent-encoding each path segment.
    fn blob_url(&self, path: &str) -> Result<Url, StorageError> {
        let mut url = self.connection.blob_endpoint.clone();
        url.set_query(None);

        url.path_segments_mut()
            .map_err(|_| {
                StorageError::InvalidConnectionString("blob endpoint cannot carry a path".into())
            })?
            .pop_if_empty()
            .push(&self.container)
            .extend(path.split('/'));

        if let Credential::Sas(token) = &self.connection.credential {
            url.set_query(Some(token));
        }

        Ok(url)
    }
}

impl BlobStore for AzureBlobStore {
    async fn put_blob(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &'static str,
    ) -> Result<(), StorageError> {
        let url = self.blob_url(path)?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let body_length = body.len();

        let mut request = self
            .client
            .put(url.clone())
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-date", &date)
            .header("x-ms-version", API_VERSION)
            .header(CONTENT_TYPE, content_type);

        if let Credential::SharedKey { account, key } = &self.connection.credential {
            let canonical_headers = format!(
                "x-ms-blob-type:BlockBlob\nx-ms-date:{}\nx-ms-version:{}\n",
                date, API_VERSION
            );
            let to_sign = string_to_sign(
                "PUT",
                body_length,
                content_type,
                &canonical_headers,
                &canonical_resource(account, &url),
            );
            let signature = sign(key, &to_sign)?;
            request = request.header(AUTHORIZATION, format!("SharedKey {}:{}", account, signature));
        }

        let response = request.body(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                container = %self.container,
                blob_path = %path,
                status = status.as_u16(),
                "blob_put_rejected"
            );
            return Err(StorageError::Rejected {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            container = %self.container,
            blob_path = %path,
            body_length = body_length,
            status = status.as_u16(),
            "blob_put_complete"
        );

        Ok(())
    }
}

/// Canonicalized resource for Shared Key: `/<account><encoded path>`.
///
/// Put Blob carries no query parameters, so none are appended.
fn canonical_resource(account: &str, url: &Url) -> String {
    format!("/{}{}", account, url.path())
}

/// Build the Shared Key string-to-sign for a Blob service request.
///
/// Standard headers in order: Content-Encoding, Content-Language,
/// Content-Length, Content-MD5, Content-Type, Date, If-Modified-Since,
/// If-Match, If-None-Match, If-Unmodified-Since, Range. A zero length is
/// signed as an empty string.
fn string_to_sign(
    verb: &str,
    content_length: usize,
    content_type: &str,
    canonical_headers: &str,
    canonical_resource: &str,
) -> String {
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let standard = [
        verb,
        "",
        "",
        length.as_str(),
        "",
        content_type,
        "",
        "",
        "",
        "",
        "",
        "",
    ];

    format!("{}\n{}{}", standard.join("\n"), canonical_headers, canonical_resource)
}

/// HMAC-SHA256 the string-to-sign with the account key, base64 encoded.
fn sign(key: &[u8], to_sign: &str) -> Result<String, StorageError> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| {
        StorageError::InvalidConnectionString("account key rejected by HMAC".into())
    })?;
    mac.update(to_sign.as_bytes());
    Ok(general_purpose::STANDARD.encode(mac.finalize().into_bytes()))
}
