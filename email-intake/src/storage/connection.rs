//! Azure Storage connection string parsing.
//!
//! A connection string is a `;`-separated list of `Key=Value` pairs, e.g.
//! `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...;EndpointSuffix=core.windows.net`.
//! Keys are matched case-insensitively. Values may themselves contain `=`
//! (base64 account keys, SAS tokens), so each pair is split on the first `=`.

use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose, Engine as _};
use url::Url;

use super::StorageError;

const DEVSTORE_ACCOUNT: &str = "devstoreaccount1";
const DEVSTORE_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEVSTORE_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// How requests to the blob endpoint are authorised.
#[derive(Clone)]
pub enum Credential {
    /// Account name plus the decoded account key, used for Shared Key signing
    SharedKey { account: String, key: Vec<u8> },
    /// Shared access signature query string, without the leading `?`
    Sas(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SharedKey { account, .. } => f
                .debug_struct("SharedKey")
                .field("account", account)
                .field("key", &"<redacted>")
                .finish(),
            Credential::Sas(_) => f.debug_tuple("Sas").field(&"<redacted>").finish(),
        }
    }
}

/// A parsed connection string: where the blob service lives and how to sign for it.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    pub blob_endpoint: Url,
    pub credential: Credential,
}

impl ConnectionString {
    /// Parse a connection string.
    ///
    /// Error messages never echo values, since most of them are secrets.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let mut fields: HashMap<String, String> = HashMap::new();

        for (index, part) in raw
            .split(';')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .enumerate()
        {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                invalid(format!("segment {} is not a Key=Value pair", index))
            })?;
            fields.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if fields
            .get("usedevelopmentstorage")
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            return Self::development_storage();
        }

        let account = fields.get("accountname").filter(|v| !v.is_empty());

        let blob_endpoint = match fields.get("blobendpoint").filter(|v| !v.is_empty()) {
            Some(endpoint) => {
                let url =
                    Url::parse(endpoint).map_err(|e| invalid(format!("BlobEndpoint: {}", e)))?;
                if !matches!(url.scheme(), "http" | "https") {
                    return Err(invalid("BlobEndpoint must be an http or https URL"));
                }
                url
            }
            None => {
                let account = account
                    .ok_or_else(|| invalid("either AccountName or BlobEndpoint is required"))?;
                let protocol = fields
                    .get("defaultendpointsprotocol")
                    .map(String::as_str)
                    .unwrap_or("https");
                let suffix = fields
                    .get("endpointsuffix")
                    .map(String::as_str)
                    .unwrap_or("core.windows.net");
                Url::parse(&format!("{}://{}.blob.{}", protocol, account, suffix))
                    .map_err(|e| invalid(format!("derived blob endpoint: {}", e)))?
            }
        };

        let credential = match (fields.get("accountkey"), fields.get("sharedaccesssignature")) {
            (Some(key), _) if !key.is_empty() => {
                let account =
                    account.ok_or_else(|| invalid("AccountKey requires AccountName"))?;
                Credential::SharedKey {
                    account: account.clone(),
                    key: decode_key(key)?,
                }
            }
            (_, Some(sas)) if !sas.is_empty() => {
                Credential::Sas(sas.trim_start_matches('?').to_string())
            }
            _ => return Err(invalid("either AccountKey or SharedAccessSignature is required")),
        };

        Ok(ConnectionString {
            blob_endpoint,
            credential,
        })
    }

    /// Settings for the local storage emulator (Azurite).
    fn development_storage() -> Result<Self, StorageError> {
        Ok(ConnectionString {
            blob_endpoint: Url::parse(DEVSTORE_BLOB_ENDPOINT)
                .map_err(|e| invalid(format!("development endpoint: {}", e)))?,
            credential: Credential::SharedKey {
                account: DEVSTORE_ACCOUNT.to_string(),
                key: decode_key(DEVSTORE_KEY)?,
            },
        })
    }
}

fn decode_key(key: &str) -> Result<Vec<u8>, StorageError> {
    general_purpose::STANDARD
        .decode(key)
        .map_err(|_| invalid("AccountKey is not valid base64"))
}

fn invalid(reason: impl Into<String>) -> StorageError {
    StorageError::InvalidConnectionString(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_key_connection_string() {
        let parsed = ConnectionString::parse(
            "DefaultEndpointsProtocol=https;AccountName=mailacct;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net",
        )
        .unwrap();

        assert_eq!(parsed.blob_endpoint.as_str(), "https://mailacct.blob.core.windows.net/");
        match parsed.credential {
            Credential::SharedKey { account, key } => {
                assert_eq!(account, "mailacct");
                assert_eq!(key, b"secret");
            }
            other => panic!("Expected SharedKey, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_defaults_protocol_and_suffix() {
        let parsed =
            ConnectionString::parse("AccountName=mailacct;AccountKey=c2VjcmV0").unwrap();
        assert_eq!(parsed.blob_endpoint.as_str(), "https://mailacct.blob.core.windows.net/");
    }

    #[test]
    fn test_parse_keys_are_case_insensitive() {
        let parsed =
            ConnectionString::parse("accountname=mailacct;ACCOUNTKEY=c2VjcmV0;").unwrap();
        assert!(matches!(parsed.credential, Credential::SharedKey { .. }));
    }

    #[test]
    fn test_parse_sas_connection_string() {
        let parsed = ConnectionString::parse(
            "BlobEndpoint=https://mailacct.blob.core.windows.net/;SharedAccessSignature=?sv=2022-11-02&sig=abc%3D",
        )
        .unwrap();

        assert_eq!(parsed.blob_endpoint.host_str(), Some("mailacct.blob.core.windows.net"));
        match parsed.credential {
            Credential::Sas(token) => assert_eq!(token, "sv=2022-11-02&sig=abc%3D"),
            other => panic!("Expected Sas, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_development_storage() {
        let parsed = ConnectionString::parse("UseDevelopmentStorage=true").unwrap();
        assert_eq!(parsed.blob_endpoint.as_str(), DEVSTORE_BLOB_ENDPOINT);
        match parsed.credential {
            Credential::SharedKey { account, .. } => assert_eq!(account, DEVSTORE_ACCOUNT),
            other => panic!("Expected SharedKey, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_missing_credential() {
        let err = ConnectionString::parse("AccountName=mailacct").unwrap_err();
        assert!(matches!(err, StorageError::InvalidConnectionString(_)));
    }

    #[test]
    fn test_parse_rejects_bad_base64_key() {
        let err = ConnectionString::parse("AccountName=mailacct;AccountKey=***").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn test_parse_rejects_non_http_endpoint() {
        let err = ConnectionString::parse("BlobEndpoint=mailto:ops@example.com;SharedAccessSignature=sv=1")
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ConnectionString::parse("not a connection string").is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let parsed =
            ConnectionString::parse("AccountName=mailacct;AccountKey=c2VjcmV0").unwrap();
        let debug = format!("{:?}", parsed);
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("115, 101, 99"));
    }
}
