//! Deployment configuration
//!
//! Built once in the command layer from, highest precedence first: CLI flags,
//! environment variables, an optional `deploy.toml`, then built-in defaults.
//! Components receive the resulting [`DeployConfig`] by reference and never
//! read the environment themselves.

use crate::core::error::{ConfigError, DeployResult, ResultExt};
use crate::storage::normalize_prefix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PREFIX: &str = "dyn/";
pub const DEFAULT_PRODUCT: &str = "DyNode";
pub const DEFAULT_PLATFORM: &str = "win";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

pub const ENV_S3_ENDPOINT: &str = "S3_ENDPOINT_URL";
pub const ENV_S3_ACCESS_KEY: &str = "S3_ACCESS_KEY";
pub const ENV_S3_SECRET_KEY: &str = "S3_SECRET_KEY";
pub const ENV_S3_BUCKET: &str = "S3_BUCKET";
pub const ENV_S3_REGION: &str = "S3_REGION";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_GITHUB_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_GITHUB_API_URL: &str = "GITHUB_API_URL";
pub const ENV_SKIP_RELEASE: &str = "SKIP_GH_RELEASE";

/// Snapshot of environment variables taken once at process entry
#[derive(Debug, Clone, Default)]
pub struct Env(BTreeMap<String, String>);

impl Env {
  /// Capture the current process environment
  pub fn from_process() -> Self {
    std::env::vars().collect()
  }

  /// Trimmed value of `name`; blank values count as unset
  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
  }
}

impl FromIterator<(String, String)> for Env {
  fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Optional `deploy.toml`
///
/// ```toml
/// [product]
/// name = "DyNode"
/// platform = "win"
///
/// [storage]
/// prefix = "dyn/"
/// region = "us-east-1"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
  #[serde(default)]
  pub product: ProductSection,
  #[serde(default)]
  pub storage: StorageSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductSection {
  #[serde(default)]
  pub name: Option<String>,
  #[serde(default)]
  pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSection {
  #[serde(default)]
  pub prefix: Option<String>,
  #[serde(default)]
  pub region: Option<String>,
}

impl FileConfig {
  /// Find config file in search order: deploy.toml, .deploy.toml, .config/deploy.toml
  pub fn find_config_path(dir: &Path) -> Option<PathBuf> {
    let candidates = [
      dir.join("deploy.toml"),
      dir.join(".deploy.toml"),
      dir.join(".config").join("deploy.toml"),
    ];

    candidates.into_iter().find(|p| p.is_file())
  }

  /// Load an explicit path, or search `dir`; no file means defaults
  pub fn load(explicit: Option<&Path>, dir: &Path) -> DeployResult<Self> {
    let path = match explicit {
      Some(path) if !path.is_file() => {
        return Err(
          ConfigError::FileNotFound {
            path: path.to_path_buf(),
          }
          .into(),
        );
      }
      Some(path) => path.to_path_buf(),
      None => match Self::find_config_path(dir) {
        Some(path) => path,
        None => return Ok(Self::default()),
      },
    };

    let content = fs::read_to_string(&path).with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig =
      toml_edit::de::from_str(&content).with_context(|| format!("Failed to parse config from {}", path.display()))?;
    Ok(config)
  }
}

/// Product naming used for archives and release titles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductConfig {
  pub name: String,
  pub platform: String,
}

impl ProductConfig {
  pub fn resolve(file: &FileConfig, overrides: &DeployOverrides) -> Self {
    Self {
      name: overrides
        .product
        .clone()
        .or_else(|| file.product.name.clone())
        .unwrap_or_else(|| DEFAULT_PRODUCT.to_string()),
      platform: overrides
        .platform
        .clone()
        .or_else(|| file.product.platform.clone())
        .unwrap_or_else(|| DEFAULT_PLATFORM.to_string()),
    }
  }
}

/// Object storage credentials and target bucket
#[derive(Debug, Clone)]
pub struct StorageConfig {
  pub endpoint: String,
  pub access_key: String,
  pub secret_key: String,
  pub bucket: String,
  pub region: String,
}

impl StorageConfig {
  /// Read storage settings; every missing variable is named in the error
  pub fn from_env(env: &Env, file: &FileConfig) -> DeployResult<Self> {
    let missing: Vec<&str> = [ENV_S3_BUCKET, ENV_S3_ENDPOINT, ENV_S3_ACCESS_KEY, ENV_S3_SECRET_KEY]
      .into_iter()
      .filter(|name| env.get(name).is_none())
      .collect();
    if !missing.is_empty() {
      return Err(
        ConfigError::MissingField {
          field: missing.join(", "),
        }
        .into(),
      );
    }

    let var = |name: &str| env.get(name).unwrap_or_default().to_string();
    Ok(Self {
      endpoint: var(ENV_S3_ENDPOINT),
      access_key: var(ENV_S3_ACCESS_KEY),
      secret_key: var(ENV_S3_SECRET_KEY),
      bucket: var(ENV_S3_BUCKET),
      region: env
        .get(ENV_S3_REGION)
        .map(str::to_string)
        .or_else(|| file.storage.region.clone())
        .unwrap_or_else(|| DEFAULT_REGION.to_string()),
    })
  }
}

/// Hosting-service settings as found; validated only when a release is due
#[derive(Debug, Clone)]
pub struct HostingSettings {
  pub token: Option<String>,
  pub repository: Option<String>,
  pub api_url: String,
}

/// Validated hosting-service credentials and repository identity
#[derive(Debug, Clone)]
pub struct HostingConfig {
  pub token: String,
  pub owner: String,
  pub repo: String,
  pub api_url: String,
}

impl HostingSettings {
  pub fn from_env(env: &Env) -> Self {
    Self {
      token: env.get(ENV_GITHUB_TOKEN).map(str::to_string),
      repository: env.get(ENV_GITHUB_REPOSITORY).map(str::to_string),
      api_url: env
        .get(ENV_GITHUB_API_URL)
        .unwrap_or(DEFAULT_GITHUB_API)
        .trim_end_matches('/')
        .to_string(),
    }
  }

  /// Require a token and an `owner/repo` identity
  pub fn validate(&self) -> DeployResult<HostingConfig> {
    let missing: Vec<&str> = [
      (ENV_GITHUB_TOKEN, self.token.is_none()),
      (ENV_GITHUB_REPOSITORY, self.repository.is_none()),
    ]
    .into_iter()
    .filter_map(|(name, absent)| absent.then_some(name))
    .collect();
    if !missing.is_empty() {
      return Err(
        ConfigError::MissingField {
          field: missing.join(", "),
        }
        .into(),
      );
    }

    let slug = self.repository.as_deref().unwrap_or_default();
    let (owner, repo) = parse_repository(slug)?;
    Ok(HostingConfig {
      token: self.token.clone().unwrap_or_default(),
      owner,
      repo,
      api_url: self.api_url.clone(),
    })
  }
}

/// Split `owner/repo`, rejecting empty halves and extra segments
pub fn parse_repository(slug: &str) -> DeployResult<(String, String)> {
  let invalid = |reason: &str| ConfigError::InvalidValue {
    field: ENV_GITHUB_REPOSITORY.to_string(),
    value: slug.to_string(),
    reason: reason.to_string(),
  };

  let (owner, repo) = slug.split_once('/').ok_or_else(|| invalid("expected owner/repo"))?;
  if owner.is_empty() || repo.is_empty() {
    return Err(invalid("owner and repo must both be non-empty").into());
  }
  if repo.contains('/') {
    return Err(invalid("too many path segments").into());
  }
  Ok((owner.to_string(), repo.to_string()))
}

/// Values supplied on the command line; `None` defers to lower layers
#[derive(Debug, Clone, Default)]
pub struct DeployOverrides {
  pub prefix: Option<String>,
  pub skip_release: Option<bool>,
  pub product: Option<String>,
  pub platform: Option<String>,
}

/// Everything a deploy run needs, resolved once
#[derive(Debug, Clone)]
pub struct DeployConfig {
  pub product: ProductConfig,
  pub storage: StorageConfig,
  pub hosting: HostingSettings,
  /// Normalized key prefix, always ending with `/`
  pub prefix: String,
  pub skip_release: bool,
}

impl DeployConfig {
  /// Layer CLI overrides over environment over file over defaults
  ///
  /// Fails if storage settings are incomplete; hosting settings are checked
  /// later, and only if a release is going to be published.
  pub fn load(env: &Env, file: &FileConfig, overrides: &DeployOverrides) -> DeployResult<Self> {
    let storage = StorageConfig::from_env(env, file)?;

    let product = ProductConfig::resolve(file, overrides);

    let raw_prefix = overrides
      .prefix
      .clone()
      .or_else(|| file.storage.prefix.clone())
      .unwrap_or_default();

    Ok(Self {
      product,
      storage,
      hosting: HostingSettings::from_env(env),
      prefix: normalize_prefix(&raw_prefix, DEFAULT_PREFIX),
      skip_release: overrides.skip_release.unwrap_or_else(|| skip_release_default(env)),
    })
  }
}

/// Release skipping defaults to on; only `0`, `false` or `no` turn it off
pub fn skip_release_default(env: &Env) -> bool {
  match env.get(ENV_SKIP_RELEASE) {
    Some(value) => !matches!(value.to_ascii_lowercase().as_str(), "0" | "false" | "no"),
    None => true,
  }
}
