//! Object storage for uploaded files.
//!
//! Two backends implement [`ObjectStore`]:
//!
//! - **local**: files under a directory, addressed by `file://` URLs.
//! - **s3**: an S3 bucket (or an S3-compatible service such as MinIO or
//!   LocalStack) using the REST API with AWS Signature V4 authentication.
//!
//! A stored document is always fetched by its object name, the last path
//! segment of the URL recorded at upload time.
//!
//! Signing uses only pure-Rust dependencies (`hmac`, `sha2`).
//!
//! # Configuration
//!
//! ```toml
//! [storage]
//! backend = "s3"
//!
//! [storage.s3]
//! bucket = "docket-judgements"
//! prefix = "uploads/"
//! region = "us-east-1"
//! # endpoint_url = "http://localhost:9000"   # MinIO
//! ```
//!
//! # Environment Variables
//!
//! - `AWS_ACCESS_KEY_ID`: required for s3
//! - `AWS_SECRET_ACCESS_KEY`: required for s3
//! - `AWS_SESSION_TOKEN`: optional (temporary credentials / IAM roles)

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{S3StorageConfig, StorageConfig};
use crate::models::object_name;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("access denied to object: {0}")]
    Unauthorized(String),
    #[error("storage request failed: {0}")]
    Request(String),
    #[error("invalid object name: '{0}'")]
    InvalidName(String),
    #[error("storage misconfigured: {0}")]
    Config(String),
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &str;

    /// Bytes of the object referenced by `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError>;

    /// Store `bytes` under `object` and return the URL to record.
    async fn put(&self, object: &str, content_type: &str, bytes: Vec<u8>)
        -> Result<String, StorageError>;
}

/// Build the backend selected by `[storage]`.
pub fn create_object_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend.as_str() {
        "local" => Ok(Arc::new(LocalObjectStore::new(config.root.clone()))),
        "s3" => {
            let s3 = config
                .s3
                .clone()
                .ok_or_else(|| anyhow::anyhow!("storage.s3 must be configured when backend is 's3'"))?;
            Ok(Arc::new(S3ObjectStore::from_env(s3)?))
        }
        other => anyhow::bail!("Unknown storage backend: {}", other),
    }
}

fn validate_object_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ============ Local Directory ============

pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let object = object_name(url);
        validate_object_name(object)?;
        match tokio::fs::read(self.root.join(object)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(object.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(StorageError::Unauthorized(object.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(
        &self,
        object: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        validate_object_name(object)?;
        tokio::fs::create_dir_all(&self.root).await?;
        let path = tokio::fs::canonicalize(&self.root).await?.join(object);
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("file://{}", path.display()))
    }
}

// ============ S3 ============

/// AWS credentials loaded from environment variables.
struct AwsCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: Option<String>,
}

impl AwsCredentials {
    fn from_env() -> Result<Self, StorageError> {
        let access_key_id = std::env::var("AWS_ACCESS_KEY_ID").map_err(|_| {
            StorageError::Config("AWS_ACCESS_KEY_ID environment variable not set".to_string())
        })?;
        let secret_access_key = std::env::var("AWS_SECRET_ACCESS_KEY").map_err(|_| {
            StorageError::Config("AWS_SECRET_ACCESS_KEY environment variable not set".to_string())
        })?;
        let session_token = std::env::var("AWS_SESSION_TOKEN").ok();

        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token,
        })
    }
}

pub struct S3ObjectStore {
    config: S3StorageConfig,
    creds: AwsCredentials,
    client: reqwest::Client,
}

/// Where a request goes: scheme + host, and the canonical URI path.
struct S3Target {
    base: String,
    host: String,
    canonical_uri: String,
}

impl S3ObjectStore {
    pub fn from_env(config: S3StorageConfig) -> Result<Self, StorageError> {
        let creds = AwsCredentials::from_env()?;
        Ok(Self {
            config,
            creds,
            client: reqwest::Client::new(),
        })
    }

    fn key(&self, object: &str) -> String {
        format!("{}{}", self.config.prefix, object)
    }

    /// Virtual-hosted style on AWS, path style on custom endpoints.
    fn target(&self, key: &str) -> S3Target {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        match &self.config.endpoint_url {
            Some(endpoint) => {
                let scheme = if endpoint.starts_with("http://") {
                    "http"
                } else {
                    "https"
                };
                let host = endpoint
                    .trim_start_matches("https://")
                    .trim_start_matches("http://")
                    .trim_end_matches('/')
                    .to_string();
                S3Target {
                    base: format!("{scheme}://{host}"),
                    canonical_uri: format!("/{}/{}", self.config.bucket, encoded_key),
                    host,
                }
            }
            None => {
                let host = format!(
                    "{}.s3.{}.amazonaws.com",
                    self.config.bucket, self.config.region
                );
                S3Target {
                    base: format!("https://{host}"),
                    canonical_uri: format!("/{encoded_key}"),
                    host,
                }
            }
        }
    }

    /// Signed request headers for `method` on `target` with the given payload hash.
    fn sign(&self, method: &str, target: &S3Target, payload_hash: &str) -> Vec<(String, String)> {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();

        let mut headers = vec![
            ("host".to_string(), target.host.clone()),
            ("x-amz-content-sha256".to_string(), payload_hash.to_string()),
            ("x-amz-date".to_string(), amz_date.clone()),
        ];
        if let Some(ref token) = self.creds.session_token {
            headers.push(("x-amz-security-token".to_string(), token.clone()));
        }
        headers.sort_by(|a, b| a.0.cmp(&b.0));

        let signed_headers: String = headers
            .iter()
            .map(|(k, _)| k.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let canonical_headers: String = headers
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, target.canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );
        let signing_key = derive_signing_key(
            &self.creds.secret_access_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.creds.access_key_id, credential_scope, signed_headers, signature
        );

        // reqwest sets Host itself.
        let mut out: Vec<(String, String)> =
            headers.into_iter().filter(|(k, _)| k != "host").collect();
        out.push(("Authorization".to_string(), authorization));
        out
    }
}

fn status_error(status: reqwest::StatusCode, key: &str) -> StorageError {
    match status.as_u16() {
        404 => StorageError::NotFound(key.to_string()),
        401 | 403 => StorageError::Unauthorized(key.to_string()),
        _ => StorageError::Request(format!("HTTP {} for key '{}'", status, key)),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    fn name(&self) -> &str {
        "s3"
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let object = object_name(url);
        validate_object_name(object)?;
        let key = self.key(object);
        let target = self.target(&key);

        let mut req = self
            .client
            .get(format!("{}{}", target.base, target.canonical_uri));
        for (name, value) in self.sign("GET", &target, &hex_sha256(b"")) {
            req = req.header(name, value);
        }

        let resp = req.send().await.map_err(|e| {
            StorageError::Request(format!("GET s3://{}/{}: {}", self.config.bucket, key, e))
        })?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status(), &key));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| StorageError::Request(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn put(
        &self,
        object: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<String, StorageError> {
        validate_object_name(object)?;
        let key = self.key(object);
        let target = self.target(&key);
        let url = format!("{}{}", target.base, target.canonical_uri);

        let mut req = self
            .client
            .put(&url)
            .header("Content-Type", content_type);
        for (name, value) in self.sign("PUT", &target, &hex_sha256(&bytes)) {
            req = req.header(name, value);
        }

        let resp = req.body(bytes).send().await.map_err(|e| {
            StorageError::Request(format!("PUT s3://{}/{}: {}", self.config.bucket, key, e))
        })?;
        if !resp.status().is_success() {
            return Err(status_error(resp.status(), &key));
        }
        tracing::info!(bucket = %self.config.bucket, %key, "object stored");
        Ok(url)
    }
}

// ============ AWS SigV4 Helpers ============

fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// RFC 3986 encoding of everything except `A-Z a-z 0-9 - _ . ~`.
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s3_store(endpoint_url: Option<&str>) -> S3ObjectStore {
        S3ObjectStore {
            config: S3StorageConfig {
                bucket: "judgements".to_string(),
                prefix: "uploads/".to_string(),
                region: "eu-west-1".to_string(),
                endpoint_url: endpoint_url.map(str::to_string),
            },
            creds: AwsCredentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "secret".to_string(),
                session_token: None,
            },
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn signing_key_matches_aws_example() {
        let key = derive_signing_key(
            "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY",
            "20120215",
            "us-east-1",
            "iam",
        );
        assert_eq!(
            hex::encode(key),
            "f4780e2d9f65fa895f9c67b32ce1baf0b0d8a43505a000a1a9e090d414db404d"
        );
    }

    #[test]
    fn uri_encode_escapes_reserved() {
        assert_eq!(uri_encode("State v Khan (2019).pdf"), "State%20v%20Khan%20%282019%29.pdf");
    }

    #[test]
    fn aws_target_is_virtual_hosted() {
        let store = s3_store(None);
        let target = store.target(&store.key("a b.pdf"));
        assert_eq!(target.base, "https://judgements.s3.eu-west-1.amazonaws.com");
        assert_eq!(target.canonical_uri, "/uploads/a%20b.pdf");
    }

    #[test]
    fn custom_endpoint_keeps_scheme_and_uses_path_style() {
        let store = s3_store(Some("http://localhost:9000/"));
        let target = store.target("uploads/x.pdf");
        assert_eq!(target.base, "http://localhost:9000");
        assert_eq!(target.host, "localhost:9000");
        assert_eq!(target.canonical_uri, "/judgements/uploads/x.pdf");
    }

    #[test]
    fn signed_headers_carry_authorization() {
        let store = s3_store(None);
        let target = store.target("uploads/x.pdf");
        let headers = store.sign("GET", &target, &hex_sha256(b""));
        let auth = headers
            .iter()
            .find(|(k, _)| k == "Authorization")
            .map(|(_, v)| v.clone())
            .unwrap();
        assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
        assert!(auth.contains("SignedHeaders=host;x-amz-content-sha256;x-amz-date"));
        assert!(headers.iter().all(|(k, _)| k != "host"));
    }

    #[tokio::test]
    async fn local_store_round_trips_by_object_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects"));
        let url = store
            .put("judgement.pdf", "application/pdf", b"%PDF-1.4".to_vec())
            .await
            .unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/judgement.pdf"));
        assert_eq!(store.fetch(&url).await.unwrap(), b"%PDF-1.4");
        assert_eq!(
            store.fetch("https://bucket.s3.amazonaws.com/judgement.pdf").await.unwrap(),
            b"%PDF-1.4"
        );
    }

    #[tokio::test]
    async fn local_store_reports_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().to_path_buf());
        assert!(matches!(
            store.fetch("file:///nowhere/missing.pdf").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(
            store.put("..", "application/pdf", Vec::new()).await,
            Err(StorageError::InvalidName(_))
        ));
    }
}
