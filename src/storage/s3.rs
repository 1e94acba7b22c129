//! S3-compatible object storage client
//!
//! Path-style `PUT {endpoint}/{bucket}/{key}` signed with AWS Signature
//! Version 4. Only the single call the publisher needs is implemented.

use super::ObjectStore;
use crate::core::config::StorageConfig;
use crate::core::error::{ConfigError, DeployResult, RemoteError};
use crate::utils::percent_encode;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "s3";
const SIGNED_HEADERS: &str = "host;x-amz-content-sha256;x-amz-date";

/// Blocking S3 client bound to one endpoint and credential pair
pub struct S3Client {
  /// `scheme://host[:port]` with no trailing slash
  origin: String,
  /// Host header value as signed
  host: String,
  /// Path under the origin the service is mounted at ("" for the root)
  base_path: String,
  region: String,
  access_key: String,
  secret_key: String,
  agent: ureq::Agent,
}

impl S3Client {
  /// Build a client from validated storage configuration
  pub fn new(config: &StorageConfig) -> DeployResult<Self> {
    let endpoint = config.endpoint.trim().trim_end_matches('/');
    let (scheme, rest) = endpoint.split_once("://").ok_or_else(|| ConfigError::InvalidValue {
      field: "S3_ENDPOINT_URL".to_string(),
      value: config.endpoint.clone(),
      reason: "expected an http:// or https:// URL".to_string(),
    })?;
    if scheme != "http" && scheme != "https" {
      return Err(
        ConfigError::InvalidValue {
          field: "S3_ENDPOINT_URL".to_string(),
          value: config.endpoint.clone(),
          reason: format!("unsupported scheme '{}'", scheme),
        }
        .into(),
      );
    }

    let (authority, base_path) = match rest.split_once('/') {
      Some((authority, path)) => (authority, format!("/{}", path.trim_matches('/'))),
      None => (rest, String::new()),
    };
    let host = match (scheme, authority.rsplit_once(':')) {
      ("https", Some((h, "443"))) | ("http", Some((h, "80"))) => h.to_string(),
      _ => authority.to_string(),
    };
    if host.is_empty() {
      return Err(
        ConfigError::InvalidValue {
          field: "S3_ENDPOINT_URL".to_string(),
          value: config.endpoint.clone(),
          reason: "missing host".to_string(),
        }
        .into(),
      );
    }

    debug!(endpoint = %endpoint, region = %config.region, "Configured S3-compatible endpoint");

    Ok(Self {
      origin: format!("{}://{}", scheme, host),
      host,
      base_path,
      region: config.region.clone(),
      access_key: config.access_key.clone(),
      secret_key: config.secret_key.clone(),
      agent: ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(30))
        .build(),
    })
  }

  /// Canonical (already encoded) path for an object
  fn object_path(&self, bucket: &str, key: &str) -> String {
    format!(
      "{}/{}/{}",
      self.base_path,
      percent_encode(bucket, false),
      percent_encode(key, true)
    )
  }
}

impl ObjectStore for S3Client {
  fn put_object(&self, bucket: &str, key: &str, body: &[u8], content_type: &str) -> DeployResult<()> {
    let path = self.object_path(bucket, key);
    let request = SigningRequest {
      method: "PUT",
      host: &self.host,
      canonical_uri: &path,
      payload_hash: payload_hash(body),
      region: &self.region,
      timestamp: Utc::now(),
    };
    let authorization = authorization_header(&self.access_key, &self.secret_key, &request);
    let operation = format!("PUT {}/{}", bucket, key);

    let result = self
      .agent
      .put(&format!("{}{}", self.origin, path))
      .set("x-amz-date", &request.amz_date())
      .set("x-amz-content-sha256", &request.payload_hash)
      .set("Authorization", &authorization)
      .set("Content-Type", content_type)
      .send_bytes(body);

    match result {
      Ok(_) => Ok(()),
      Err(ureq::Error::Status(status, response)) => Err(
        RemoteError::Status {
          service: "s3",
          operation,
          status,
          body: response.into_string().unwrap_or_default(),
        }
        .into(),
      ),
      Err(e) => Err(
        RemoteError::Transport {
          service: "s3",
          operation,
          reason: e.to_string(),
        }
        .into(),
      ),
    }
  }
}

/// Inputs to a SigV4 signature over the fixed header set
pub(crate) struct SigningRequest<'a> {
  pub method: &'a str,
  pub host: &'a str,
  pub canonical_uri: &'a str,
  pub payload_hash: String,
  pub region: &'a str,
  pub timestamp: DateTime<Utc>,
}

impl SigningRequest<'_> {
  fn amz_date(&self) -> String {
    self.timestamp.format("%Y%m%dT%H%M%SZ").to_string()
  }

  fn date_stamp(&self) -> String {
    self.timestamp.format("%Y%m%d").to_string()
  }

  fn scope(&self) -> String {
    format!("{}/{}/{}/aws4_request", self.date_stamp(), self.region, SERVICE)
  }

  fn canonical_request(&self) -> String {
    format!(
      "{}\n{}\n\nhost:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n\n{}\n{}",
      self.method,
      self.canonical_uri,
      self.host,
      self.payload_hash,
      self.amz_date(),
      SIGNED_HEADERS,
      self.payload_hash
    )
  }

  fn string_to_sign(&self) -> String {
    format!(
      "AWS4-HMAC-SHA256\n{}\n{}\n{}",
      self.amz_date(),
      self.scope(),
      hex::encode(Sha256::digest(self.canonical_request().as_bytes()))
    )
  }
}

/// `Authorization` header value for a request
pub(crate) fn authorization_header(access_key: &str, secret_key: &str, request: &SigningRequest<'_>) -> String {
  let key = derive_signing_key(secret_key, &request.date_stamp(), request.region, SERVICE);
  let signature = hex::encode(hmac_sha256(&key, request.string_to_sign().as_bytes()));
  format!(
    "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
    access_key,
    request.scope(),
    SIGNED_HEADERS,
    signature
  )
}

/// Hex SHA-256 of the request body
pub(crate) fn payload_hash(body: &[u8]) -> String {
  hex::encode(Sha256::digest(body))
}

pub(crate) fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
  let k_date = hmac_sha256(format!("AWS4{}", secret_key).as_bytes(), date.as_bytes());
  let k_region = hmac_sha256(&k_date, region.as_bytes());
  let k_service = hmac_sha256(&k_region, service.as_bytes());
  hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
  let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts any key size");
  mac.update(data);
  mac.finalize().into_bytes().to_vec()
}
