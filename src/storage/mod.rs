//! Object storage publishing
//!
//! Two keys are written per run, both under the configured prefix:
//!
//! - `{prefix}{artifact name}`: the versioned archive
//! - `{prefix}changelog.json`: a fixed, version-independent key that every
//!   run overwrites, giving consumers a stable "latest changelog" pointer

pub mod s3;

pub use s3::S3Client;

use crate::core::error::{ConfigError, DeployResult, ResultExt};
use crate::utils::content_type_for;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::info;

/// Stable key name of the changelog object
pub const CHANGELOG_KEY: &str = "changelog.json";

/// Bucket capability the publisher needs
pub trait ObjectStore {
  /// Write `body` at `key`, overwriting any existing object
  fn put_object(&self, bucket: &str, key: &str, body: &[u8], content_type: &str) -> DeployResult<()>;
}

/// Uploads files into one bucket under one key prefix
pub struct StoragePublisher<'a> {
  store: &'a dyn ObjectStore,
  bucket: &'a str,
  prefix: &'a str,
  staging_dir: &'a Path,
}

impl<'a> StoragePublisher<'a> {
  /// `prefix` is expected to be normalized already (see `normalize_prefix`).
  /// Changelog text is staged in `staging_dir`.
  pub fn new(store: &'a dyn ObjectStore, bucket: &'a str, prefix: &'a str, staging_dir: &'a Path) -> Self {
    Self {
      store,
      bucket,
      prefix,
      staging_dir,
    }
  }

  /// Full object key for `name`
  pub fn key_for(&self, name: &str) -> String {
    format!("{}{}", self.prefix, name)
  }

  /// Upload a local file to `key`
  pub fn upload(&self, key: &str, local_path: &Path) -> DeployResult<()> {
    if !local_path.is_file() {
      return Err(
        ConfigError::FileNotFound {
          path: local_path.to_path_buf(),
        }
        .into(),
      );
    }

    let body = fs::read(local_path).with_context(|| format!("Failed to read {}", local_path.display()))?;
    info!("Uploading to s3://{}/{}", self.bucket, key);
    self.store.put_object(self.bucket, key, &body, content_type_for(key))?;
    info!("Uploaded {} ({} bytes)", key, body.len());
    Ok(())
  }

  /// Upload the packaged archive under its own name; returns the key
  pub fn upload_artifact(&self, name: &str, local_path: &Path) -> DeployResult<String> {
    let key = self.key_for(name);
    self.upload(&key, local_path)?;
    Ok(key)
  }

  /// Upload changelog text to the fixed changelog key; returns the key
  ///
  /// The text is staged through a temporary file in normalized UTF-8. The
  /// file is removed when this returns, whether or not the upload succeeded.
  pub fn upload_changelog(&self, text: &str) -> DeployResult<String> {
    let key = self.key_for(CHANGELOG_KEY);

    let mut staged = tempfile::Builder::new()
      .prefix(".deploy_changelog_")
      .suffix(".json")
      .tempfile_in(self.staging_dir)
      .context("Failed to create temporary changelog file")?;
    staged.write_all(normalize_text(text).as_bytes())?;
    staged.flush()?;

    self.upload(&key, staged.path())?;
    Ok(key)
  }
}

/// Normalize text to plain UTF-8: no byte-order mark, `\n` line endings
pub fn normalize_text(text: &str) -> String {
  text.trim_start_matches('\u{feff}').replace("\r\n", "\n")
}

/// Normalize a key prefix: trimmed, defaulted when blank, ending with `/`
pub fn normalize_prefix(prefix: &str, default: &str) -> String {
  let trimmed = prefix.trim();
  let mut p = if trimmed.is_empty() { default.to_string() } else { trimmed.to_string() };
  if !p.ends_with('/') {
    p.push('/');
  }
  p
}
