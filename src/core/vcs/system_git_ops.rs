//! Tag and history queries for SystemGit

use super::system_git::{SystemGit, parse_count};
use crate::core::error::{DeployError, DeployResult, GitError};

impl SystemGit {
  /// Tags pointing directly at HEAD, in git's output order
  pub fn tags_at_head(&self) -> DeployResult<Vec<String>> {
    let stdout = self.run(&["tag", "--points-at", "HEAD"])?;

    Ok(
      stdout
        .lines()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect(),
    )
  }

  /// Nearest tag reachable from HEAD
  ///
  /// Returns `Ok(None)` when history carries no tag at all.
  pub fn nearest_tag(&self) -> DeployResult<Option<String>> {
    match self.run(&["describe", "--tags", "--abbrev=0"]) {
      Ok(tag) if tag.is_empty() => Ok(None),
      Ok(tag) => Ok(Some(tag)),
      Err(DeployError::Git(GitError::CommandFailed { stderr, .. }))
        if stderr.contains("No names found") || stderr.contains("No tags can describe") =>
      {
        Ok(None)
      }
      Err(e) => Err(e),
    }
  }

  /// Number of commits reachable from HEAD but not from `rev`
  pub fn count_commits_since(&self, rev: &str) -> DeployResult<u64> {
    let range = format!("{}..HEAD", rev);
    let stdout = self.run(&["rev-list", "--count", &range])?;
    parse_count("git rev-list --count", &stdout)
  }

  /// Number of commits reachable from HEAD
  pub fn count_commits(&self) -> DeployResult<u64> {
    let stdout = self.run(&["rev-list", "--count", "HEAD"])?;
    parse_count("git rev-list --count HEAD", &stdout)
  }
}
