//! GitHub Releases REST client

use super::{ReleaseDraft, ReleaseHost, RemoteAsset, RemoteRelease};
use crate::core::config::HostingConfig;
use crate::core::error::{DeployError, DeployResult, RemoteError};
use crate::utils::{content_type_for, percent_encode};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "github";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;
const USER_AGENT: &str = concat!("dyn-deploy/", env!("CARGO_PKG_VERSION"));

/// Blocking client for one repository's releases
pub struct GitHubClient {
  api_url: String,
  owner: String,
  repo: String,
  token: String,
  agent: ureq::Agent,
}

impl GitHubClient {
  pub fn new(config: &HostingConfig) -> Self {
    Self {
      api_url: config.api_url.trim_end_matches('/').to_string(),
      owner: config.owner.clone(),
      repo: config.repo.clone(),
      token: config.token.clone(),
      agent: ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_secs(30))
        .build(),
    }
  }

  fn repo_url(&self, path: &str) -> String {
    format!("{}/repos/{}/{}{}", self.api_url, self.owner, self.repo, path)
  }

  fn request(&self, method: &str, url: &str) -> ureq::Request {
    debug!(method, url, "GitHub request");
    self
      .agent
      .request(method, url)
      .set("Accept", "application/vnd.github+json")
      .set("Authorization", &format!("Bearer {}", self.token))
      .set("X-GitHub-Api-Version", API_VERSION)
      .set("User-Agent", USER_AGENT)
  }
}

impl ReleaseHost for GitHubClient {
  fn release_by_tag(&self, tag: &str) -> DeployResult<Option<RemoteRelease>> {
    let operation = format!("get release for tag {}", tag);
    let url = self.repo_url(&format!("/releases/tags/{}", percent_encode(tag, false)));
    match self.request("GET", &url).call() {
      Ok(response) => decode(response, &operation).map(Some),
      Err(ureq::Error::Status(404, _)) => Ok(None),
      Err(e) => Err(remote_error(e, operation)),
    }
  }

  fn create_release(&self, draft: &ReleaseDraft) -> DeployResult<RemoteRelease> {
    let operation = format!("create release {}", draft.tag);
    let payload = json!({
      "tag_name": draft.tag,
      "name": draft.name,
      "body": draft.body,
      "draft": false,
      "prerelease": false,
    });
    let response = self
      .request("POST", &self.repo_url("/releases"))
      .send_json(payload)
      .map_err(|e| remote_error(e, operation.clone()))?;
    decode(response, &operation)
  }

  fn update_release(&self, release: &RemoteRelease, draft: &ReleaseDraft) -> DeployResult<RemoteRelease> {
    let operation = format!("update release {}", release.id);
    let payload = json!({
      "name": draft.name,
      "body": draft.body,
      "draft": false,
      "prerelease": false,
    });
    let response = self
      .request("PATCH", &self.repo_url(&format!("/releases/{}", release.id)))
      .send_json(payload)
      .map_err(|e| remote_error(e, operation.clone()))?;
    decode(response, &operation)
  }

  fn list_assets(&self, release: &RemoteRelease) -> DeployResult<Vec<RemoteAsset>> {
    let operation = format!("list assets of release {}", release.id);
    let url = self.repo_url(&format!("/releases/{}/assets", release.id));
    let mut assets = Vec::new();

    for page in 1.. {
      let response = self
        .request("GET", &url)
        .query("per_page", &PAGE_SIZE.to_string())
        .query("page", &page.to_string())
        .call()
        .map_err(|e| remote_error(e, operation.clone()))?;
      let batch: Vec<RemoteAsset> = decode(response, &operation)?;
      let last = batch.len() < PAGE_SIZE;
      assets.extend(batch);
      if last {
        break;
      }
    }

    Ok(assets)
  }

  fn delete_asset(&self, asset: &RemoteAsset) -> DeployResult<()> {
    let operation = format!("delete asset {}", asset.name);
    let response = self
      .request("DELETE", &self.repo_url(&format!("/releases/assets/{}", asset.id)))
      .call()
      .map_err(|e| remote_error(e, operation.clone()))?;

    if response.status() != 204 {
      return Err(
        RemoteError::Status {
          service: SERVICE,
          operation,
          status: response.status(),
          body: response.into_string().unwrap_or_default(),
        }
        .into(),
      );
    }
    Ok(())
  }

  fn upload_asset(&self, release: &RemoteRelease, name: &str, body: &[u8]) -> DeployResult<RemoteAsset> {
    let operation = format!("upload asset {}", name);
    let url = upload_endpoint(&release.upload_url, name).ok_or_else(|| RemoteError::Decode {
      service: SERVICE,
      operation: operation.clone(),
      reason: format!("release {} has no upload_url", release.id),
    })?;

    let response = self
      .request("POST", &url)
      .set("Content-Type", content_type_for(name))
      .send_bytes(body)
      .map_err(|e| remote_error(e, operation.clone()))?;
    decode(response, &operation)
  }
}

/// Concrete upload URL from a release's templated `upload_url`
///
/// `https://uploads.github.com/.../assets{?name,label}` becomes
/// `https://uploads.github.com/.../assets?name={name}`.
pub(crate) fn upload_endpoint(template: &str, name: &str) -> Option<String> {
  let base = template.split('{').next().unwrap_or_default().trim();
  if base.is_empty() {
    return None;
  }
  Some(format!("{}?name={}", base, percent_encode(name, false)))
}

fn decode<T: DeserializeOwned>(response: ureq::Response, operation: &str) -> DeployResult<T> {
  response.into_json::<T>().map_err(|e| {
    RemoteError::Decode {
      service: SERVICE,
      operation: operation.to_string(),
      reason: e.to_string(),
    }
    .into()
  })
}

fn remote_error(err: ureq::Error, operation: String) -> DeployError {
  match err {
    ureq::Error::Status(status, response) => RemoteError::Status {
      service: SERVICE,
      operation,
      status,
      body: response.into_string().unwrap_or_default(),
    }
    .into(),
    other => RemoteError::Transport {
      service: SERVICE,
      operation,
      reason: other.to_string(),
    }
    .into(),
  }
}
