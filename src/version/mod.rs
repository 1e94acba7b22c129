//! Version resolution from repository tag/commit state
//!
//! Resolution order:
//!
//! 1. A tag pointing at HEAD is used verbatim (exact-tag build).
//! 2. Otherwise the nearest ancestor tag plus the number of commits since it:
//!    `{tag}-{count}`.
//! 3. Otherwise `v0.0.0-{total commits}`.
//!
//! Query failures never abort; each one falls through to the next tier, and
//! the last tier has no precondition.

use crate::core::error::DeployResult;
use crate::core::vcs::SystemGit;
use std::cmp::Ordering;
use tracing::{debug, info, warn};

/// Read-only repository queries the resolver needs
pub trait VersionSource {
  /// Tags pointing directly at HEAD
  fn tags_at_head(&self) -> DeployResult<Vec<String>>;

  /// Nearest tag reachable from HEAD, `None` when history has no tags
  fn nearest_tag(&self) -> DeployResult<Option<String>>;

  /// Commits reachable from HEAD but not from `rev`
  fn count_commits_since(&self, rev: &str) -> DeployResult<u64>;

  /// Commits reachable from HEAD
  fn count_commits(&self) -> DeployResult<u64>;
}

impl VersionSource for SystemGit {
  fn tags_at_head(&self) -> DeployResult<Vec<String>> {
    SystemGit::tags_at_head(self)
  }

  fn nearest_tag(&self) -> DeployResult<Option<String>> {
    SystemGit::nearest_tag(self)
  }

  fn count_commits_since(&self, rev: &str) -> DeployResult<u64> {
    SystemGit::count_commits_since(self, rev)
  }

  fn count_commits(&self) -> DeployResult<u64> {
    SystemGit::count_commits(self)
  }
}

/// A resolved version and the tag it came from, if it is an exact-tag build
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBinding {
  /// Version identifier used for archive names, storage keys and release names
  pub version: String,
  /// Tag pointing at HEAD; `None` when the version was synthesized
  pub exact_tag: Option<String>,
}

impl TagBinding {
  /// Version taken verbatim from a tag on HEAD
  pub fn exact(tag: impl Into<String>) -> Self {
    let tag = tag.into();
    Self {
      version: tag.clone(),
      exact_tag: Some(tag),
    }
  }

  /// Version synthesized from history
  pub fn synthesized(version: impl Into<String>) -> Self {
    Self {
      version: version.into(),
      exact_tag: None,
    }
  }

  /// Whether a release may be published for this build
  pub fn has_tag(&self) -> bool {
    self.exact_tag.is_some()
  }
}

/// Resolve the version for the current checkout
pub fn resolve(source: &dyn VersionSource) -> TagBinding {
  match source.tags_at_head() {
    Ok(tags) => {
      if let Some(tag) = pick_release_tag(&tags) {
        if tags.len() > 1 {
          warn!(tags = ?tags, chosen = %tag, "Multiple tags point at HEAD");
        }
        info!("HEAD is tagged: {}", tag);
        return TagBinding::exact(tag);
      }
    }
    Err(e) => debug!(error = %e, "Could not list tags at HEAD"),
  }

  match source.nearest_tag() {
    Ok(Some(tag)) => match source.count_commits_since(&tag) {
      Ok(count) => {
        let version = format!("{}-{}", tag, count);
        info!("Computed version from latest tag: {}", version);
        return TagBinding::synthesized(version);
      }
      Err(e) => warn!(error = %e, tag = %tag, "Failed to count commits since tag"),
    },
    Ok(None) => debug!("No tags reachable from HEAD"),
    Err(e) => debug!(error = %e, "Could not describe HEAD"),
  }

  let total = source.count_commits().unwrap_or_else(|e| {
    warn!(error = %e, "Failed to count total commits");
    0
  });
  let version = format!("v0.0.0-{}", total);
  warn!("No tags found; falling back to version {}", version);
  TagBinding::synthesized(version)
}

/// Apply a caller-supplied version over the computed one
///
/// The explicit value wins; a disagreement is only a warning. The exact tag
/// is kept, since a release still has to point at the real tag.
pub fn apply_override(computed: TagBinding, explicit: Option<&str>) -> TagBinding {
  let Some(explicit) = explicit.map(str::trim).filter(|v| !v.is_empty()) else {
    return computed;
  };

  if explicit != computed.version {
    warn!(
      "Provided version '{}' does not match computed version '{}'. Using provided value.",
      explicit, computed.version
    );
  }

  TagBinding {
    version: explicit.to_string(),
    exact_tag: computed.exact_tag,
  }
}

/// Choose one tag when several point at the same commit
///
/// Greatest semantic version wins (a leading `v` is ignored). Tags that are
/// not semver rank below those that are. Remaining ties go to the
/// lexicographically greatest name.
pub fn pick_release_tag(tags: &[String]) -> Option<&String> {
  tags.iter().max_by(|a, b| compare_tags(a, b))
}

fn compare_tags(a: &str, b: &str) -> Ordering {
  match (tag_semver(a), tag_semver(b)) {
    (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
    (Some(_), None) => Ordering::Greater,
    (None, Some(_)) => Ordering::Less,
    (None, None) => a.cmp(b),
  }
}

fn tag_semver(tag: &str) -> Option<semver::Version> {
  let raw = tag.strip_prefix(['v', 'V']).unwrap_or(tag);
  semver::Version::parse(raw).ok()
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::core::error::DeployError;

  /// In-memory repository state; `None` makes the query fail
  #[derive(Default)]
  pub(crate) struct StaticVersionSource {
    pub head_tags: Option<Vec<String>>,
    pub nearest: Option<Option<String>>,
    pub since: Option<u64>,
    pub total: Option<u64>,
  }

  impl StaticVersionSource {
    pub(crate) fn tagged(tag: &str) -> Self {
      Self {
        head_tags: Some(vec![tag.to_string()]),
        nearest: Some(Some(tag.to_string())),
        since: Some(0),
        total: Some(10),
      }
    }

    pub(crate) fn after_tag(tag: &str, since: u64) -> Self {
      Self {
        head_tags: Some(vec![]),
        nearest: Some(Some(tag.to_string())),
        since: Some(since),
        total: Some(since + 3),
      }
    }
  }

  fn fail<T>(what: &str) -> DeployResult<T> {
    Err(DeployError::message(format!("{} unavailable", what)))
  }

  impl VersionSource for StaticVersionSource {
    fn tags_at_head(&self) -> DeployResult<Vec<String>> {
      self.head_tags.clone().map_or_else(|| fail("tags"), Ok)
    }

    fn nearest_tag(&self) -> DeployResult<Option<String>> {
      self.nearest.clone().map_or_else(|| fail("describe"), Ok)
    }

    fn count_commits_since(&self, _rev: &str) -> DeployResult<u64> {
      self.since.map_or_else(|| fail("rev-list"), Ok)
    }

    fn count_commits(&self) -> DeployResult<u64> {
      self.total.map_or_else(|| fail("rev-list"), Ok)
    }
  }

  #[test]
  fn test_tag_on_head_is_used_verbatim() {
    let binding = resolve(&StaticVersionSource::tagged("v1.2.0"));
    assert_eq!(binding.version, "v1.2.0");
    assert!(binding.has_tag());
    assert_eq!(binding.exact_tag.as_deref(), Some("v1.2.0"));
  }

  #[test]
  fn test_commits_since_ancestor_tag() {
    let binding = resolve(&StaticVersionSource::after_tag("v1.1.0", 7));
    assert_eq!(binding.version, "v1.1.0-7");
    assert!(!binding.has_tag());
  }

  #[test]
  fn test_no_tags_falls_back_to_total_count() {
    let source = StaticVersionSource {
      head_tags: Some(vec![]),
      nearest: Some(None),
      since: None,
      total: Some(12),
    };
    let binding = resolve(&source);
    assert_eq!(binding.version, "v0.0.0-12");
    assert!(!binding.has_tag());
  }

  #[test]
  fn test_failed_count_since_degrades_to_total() {
    let source = StaticVersionSource {
      head_tags: Some(vec![]),
      nearest: Some(Some("v1.0.0".to_string())),
      since: None,
      total: Some(5),
    };
    assert_eq!(resolve(&source).version, "v0.0.0-5");
  }

  #[test]
  fn test_every_query_failing_still_resolves() {
    let binding = resolve(&StaticVersionSource::default());
    assert_eq!(binding.version, "v0.0.0-0");
    assert!(!binding.has_tag());
  }

  #[test]
  fn test_failed_head_listing_degrades_to_describe() {
    let source = StaticVersionSource {
      head_tags: None,
      nearest: Some(Some("v2.0.0".to_string())),
      since: Some(3),
      total: Some(40),
    };
    assert_eq!(resolve(&source).version, "v2.0.0-3");
  }

  #[test]
  fn test_pick_release_tag_prefers_greatest_semver() {
    let tags = vec!["v1.2.0".to_string(), "v1.10.0".to_string(), "v1.9.3".to_string()];
    assert_eq!(pick_release_tag(&tags).unwrap(), "v1.10.0");
  }

  #[test]
  fn test_pick_release_tag_ranks_non_semver_lower() {
    let tags = vec!["nightly".to_string(), "v0.1.0".to_string(), "zeta".to_string()];
    assert_eq!(pick_release_tag(&tags).unwrap(), "v0.1.0");

    let tags = vec!["alpha".to_string(), "beta".to_string()];
    assert_eq!(pick_release_tag(&tags).unwrap(), "beta");

    assert!(pick_release_tag(&[]).is_none());
  }

  #[test]
  fn test_pick_release_tag_is_order_independent() {
    let forward = vec!["v1.0.0".to_string(), "1.0.0".to_string()];
    let backward = vec!["1.0.0".to_string(), "v1.0.0".to_string()];
    assert_eq!(pick_release_tag(&forward), pick_release_tag(&backward));
    assert_eq!(pick_release_tag(&forward).unwrap(), "v1.0.0");
  }

  #[test]
  fn test_explicit_version_wins_and_keeps_tag() {
    let computed = TagBinding::exact("v1.2.0");
    let binding = apply_override(computed, Some("v1.2.0-hotfix"));
    assert_eq!(binding.version, "v1.2.0-hotfix");
    assert_eq!(binding.exact_tag.as_deref(), Some("v1.2.0"));
  }

  #[test]
  fn test_blank_explicit_version_is_ignored() {
    let computed = TagBinding::synthesized("v1.1.0-7");
    assert_eq!(apply_override(computed.clone(), Some("  ")), computed);
    assert_eq!(apply_override(computed.clone(), None), computed);
  }
}
