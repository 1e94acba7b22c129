//! Hosted release reconciliation
//!
//! A release is identified by its tag. Reconciling converges the hosting
//! service onto one published (non-draft, non-prerelease) release for the tag
//! whose title and notes match this run, carrying exactly one asset with the
//! archive's name. Running it twice leaves the same state as running it once.

pub mod github;

pub use github::GitHubClient;

use crate::core::error::{ConfigError, DeployResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// A release as the hosting service reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRelease {
  pub id: u64,
  #[serde(rename = "tag_name")]
  pub tag: String,
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub body: Option<String>,
  /// Upload endpoint, possibly still carrying a `{?name,label}` template suffix
  #[serde(default)]
  pub upload_url: String,
}

/// A file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAsset {
  pub id: u64,
  pub name: String,
}

/// Desired title and notes for a release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDraft {
  pub tag: String,
  pub name: String,
  pub body: String,
}

/// Operations reconciliation needs from a release-hosting service
pub trait ReleaseHost {
  /// Release bound to `tag`, or `None` if there is none
  fn release_by_tag(&self, tag: &str) -> DeployResult<Option<RemoteRelease>>;

  /// Create a published release for `draft.tag`
  fn create_release(&self, draft: &ReleaseDraft) -> DeployResult<RemoteRelease>;

  /// Overwrite title and notes of an existing release and mark it published
  fn update_release(&self, release: &RemoteRelease, draft: &ReleaseDraft) -> DeployResult<RemoteRelease>;

  fn list_assets(&self, release: &RemoteRelease) -> DeployResult<Vec<RemoteAsset>>;

  fn delete_asset(&self, asset: &RemoteAsset) -> DeployResult<()>;

  fn upload_asset(&self, release: &RemoteRelease, name: &str, body: &[u8]) -> DeployResult<RemoteAsset>;
}

impl<T: ReleaseHost + ?Sized> ReleaseHost for &T {
  fn release_by_tag(&self, tag: &str) -> DeployResult<Option<RemoteRelease>> {
    (**self).release_by_tag(tag)
  }

  fn create_release(&self, draft: &ReleaseDraft) -> DeployResult<RemoteRelease> {
    (**self).create_release(draft)
  }

  fn update_release(&self, release: &RemoteRelease, draft: &ReleaseDraft) -> DeployResult<RemoteRelease> {
    (**self).update_release(release, draft)
  }

  fn list_assets(&self, release: &RemoteRelease) -> DeployResult<Vec<RemoteAsset>> {
    (**self).list_assets(release)
  }

  fn delete_asset(&self, asset: &RemoteAsset) -> DeployResult<()> {
    (**self).delete_asset(asset)
  }

  fn upload_asset(&self, release: &RemoteRelease, name: &str, body: &[u8]) -> DeployResult<RemoteAsset> {
    (**self).upload_asset(release, name, body)
  }
}

/// Result of a successful reconciliation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciledRelease {
  pub release_id: u64,
  pub created: bool,
  pub asset_id: u64,
  pub asset_name: String,
  /// Same-named assets removed before the upload
  pub replaced_assets: usize,
}

/// Find or create the release for `draft.tag`, then replace its asset
///
/// Exactly one of create or update is issued. Every existing asset named
/// `asset_name` is deleted before the new one is uploaded, so the release
/// ends with a single asset of that name.
pub fn reconcile(
  host: &dyn ReleaseHost,
  draft: &ReleaseDraft,
  asset_name: &str,
  asset_path: &Path,
) -> DeployResult<ReconciledRelease> {
  if !asset_path.is_file() {
    return Err(
      ConfigError::FileNotFound {
        path: asset_path.to_path_buf(),
      }
      .into(),
    );
  }

  let (release, created) = match host.release_by_tag(&draft.tag)? {
    Some(existing) => {
      info!(
        "Found existing release '{}' for tag {} (id {})",
        existing.name.as_deref().unwrap_or_default(),
        draft.tag,
        existing.id
      );
      if existing.body.as_deref() != Some(draft.body.as_str()) {
        debug!("Release notes for {} changed; refreshing", draft.tag);
      }
      (host.update_release(&existing, draft)?, false)
    }
    None => {
      info!("Creating release for tag {}", draft.tag);
      (host.create_release(draft)?, true)
    }
  };

  let stale: Vec<RemoteAsset> = host
    .list_assets(&release)?
    .into_iter()
    .filter(|a| a.name == asset_name)
    .collect();
  for asset in &stale {
    info!("Deleting existing asset {} (id {})", asset.name, asset.id);
    host.delete_asset(asset)?;
  }

  let body = fs::read(asset_path)?;
  info!("Uploading release asset {} ({} bytes)", asset_name, body.len());
  let asset = host.upload_asset(&release, asset_name, &body)?;
  info!("Release {} published with asset {}", draft.tag, asset.name);

  Ok(ReconciledRelease {
    release_id: release.id,
    created,
    asset_id: asset.id,
    asset_name: asset.name,
    replaced_assets: stale.len(),
  })
}
