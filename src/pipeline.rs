//! Deploy pipeline driver
//!
//! Sequences version resolution, packaging, storage publishing and (when the
//! run qualifies) release reconciliation. Each step either completes or
//! returns an error that aborts the run; nothing after a failed step runs.

use crate::changelog::{self, ChangelogPayload};
use crate::core::config::{DeployConfig, HostingConfig};
use crate::core::error::DeployResult;
use crate::package::{self, Artifact};
use crate::release::{self, ReleaseDraft, ReleaseHost};
use crate::storage::{ObjectStore, StoragePublisher};
use crate::version::{self, TagBinding, VersionSource};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Opens a hosting-service client once a release is known to be due
pub type HostConnector<'h> = dyn Fn(&HostingConfig) -> DeployResult<Box<dyn ReleaseHost + 'h>> + 'h;

/// Local inputs of one deploy run
#[derive(Debug, Clone)]
pub struct DeployInputs {
  pub artifact_dir: PathBuf,
  pub changelog: PathBuf,
  pub releaselog: PathBuf,
  /// Caller-supplied version; replaces the resolved one when set
  pub version: Option<String>,
  /// Where the archive is written (and left after the run)
  pub output_dir: PathBuf,
}

/// Whether this run publishes a release
#[derive(Debug, Clone)]
pub enum ReleaseDecision {
  /// Skip flag set
  Skip,
  /// HEAD carries no exact tag
  Untagged,
  Publish { tag: String, hosting: HostingConfig },
}

/// What happened on the hosting service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReleaseOutcome {
  Skipped,
  Untagged,
  Published {
    tag: String,
    release_id: u64,
    created: bool,
    asset_name: String,
  },
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
  pub version: String,
  pub exact_tag: Option<String>,
  pub archive: PathBuf,
  pub archive_size: u64,
  pub uploaded_keys: Vec<String>,
  pub release: ReleaseOutcome,
}

pub struct Pipeline<'a, 'h> {
  config: &'a DeployConfig,
  versions: &'a dyn VersionSource,
  store: &'a dyn ObjectStore,
  connect_host: &'a HostConnector<'h>,
}

impl<'a, 'h> Pipeline<'a, 'h> {
  pub fn new(
    config: &'a DeployConfig,
    versions: &'a dyn VersionSource,
    store: &'a dyn ObjectStore,
    connect_host: &'a HostConnector<'h>,
  ) -> Self {
    Self {
      config,
      versions,
      store,
      connect_host,
    }
  }

  /// Decide on reconciliation; hosting settings are validated only if it will run
  pub fn decide_release(&self, binding: &TagBinding) -> DeployResult<ReleaseDecision> {
    if self.config.skip_release {
      return Ok(ReleaseDecision::Skip);
    }
    match &binding.exact_tag {
      None => Ok(ReleaseDecision::Untagged),
      Some(tag) => Ok(ReleaseDecision::Publish {
        tag: tag.clone(),
        hosting: self.config.hosting.validate()?,
      }),
    }
  }

  pub fn run(&self, inputs: &DeployInputs) -> DeployResult<DeployReport> {
    let binding = version::apply_override(version::resolve(self.versions), inputs.version.as_deref());
    info!(version = %binding.version, has_tag = binding.has_tag(), "Resolved version");

    let decision = self.decide_release(&binding)?;

    let changelog_text = changelog::read_text(&inputs.changelog)?;
    let releaselog_text = changelog::read_text(&inputs.releaselog)?;
    check_changelog_version(&changelog_text, &binding.version);

    let name = package::artifact_name(&self.config.product.name, &self.config.product.platform, &binding.version);
    let artifact = package::package(&inputs.artifact_dir, &inputs.output_dir.join(&name))?;

    let publisher = StoragePublisher::new(
      self.store,
      &self.config.storage.bucket,
      &self.config.prefix,
      &inputs.output_dir,
    );
    let uploaded_keys = vec![
      publisher.upload_artifact(&artifact.name, &artifact.path)?,
      publisher.upload_changelog(&changelog_text)?,
    ];

    let release = match decision {
      ReleaseDecision::Skip => {
        info!("Skipping GitHub Release as requested (skip_release=true)");
        ReleaseOutcome::Skipped
      }
      ReleaseDecision::Untagged => {
        info!("HEAD is not tagged; skipping GitHub Release creation (test build)");
        ReleaseOutcome::Untagged
      }
      ReleaseDecision::Publish { tag, hosting } => self.publish(&tag, &hosting, &binding, &releaselog_text, &artifact)?,
    };

    info!("Deployment completed successfully");
    Ok(DeployReport {
      version: binding.version,
      exact_tag: binding.exact_tag,
      archive: artifact.path,
      archive_size: artifact.size,
      uploaded_keys,
      release,
    })
  }

  fn publish(
    &self,
    tag: &str,
    hosting: &HostingConfig,
    binding: &TagBinding,
    notes: &str,
    artifact: &Artifact,
  ) -> DeployResult<ReleaseOutcome> {
    let host = (self.connect_host)(hosting)?;
    let draft = ReleaseDraft {
      tag: tag.to_string(),
      name: format!("{} {}", self.config.product.name, binding.version),
      body: notes.to_string(),
    };
    let reconciled = release::reconcile(host.as_ref(), &draft, &artifact.name, &artifact.path)?;
    Ok(ReleaseOutcome::Published {
      tag: tag.to_string(),
      release_id: reconciled.release_id,
      created: reconciled.created,
      asset_name: reconciled.asset_name,
    })
  }
}

/// Warn when the changelog was generated for another version
fn check_changelog_version(text: &str, version: &str) {
  match ChangelogPayload::parse(text) {
    Ok(payload) => match payload.version.as_deref() {
      Some(recorded) if recorded != version => {
        warn!("changelog.json was generated for version '{}', deploying '{}'", recorded, version);
      }
      _ => {}
    },
    Err(e) => warn!(error = %e, "changelog.json is not a valid changelog payload; uploading as-is"),
  }
}
