//! System git backend
//!
//! Every query is one `git` subprocess run synchronously against the
//! repository directory with an isolated environment.

use crate::core::error::{DeployResult, GitError, ResultExt};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Git backend using system git (zero crate dependencies)
pub struct SystemGit {
  /// Repository working directory
  pub(crate) repo_path: PathBuf,
}

impl SystemGit {
  /// Point at a repository directory
  ///
  /// Nothing is executed here. A directory that is not a repository only
  /// shows up as failing queries, which the version resolver degrades on.
  pub fn new(path: &Path) -> Self {
    Self {
      repo_path: path.to_path_buf(),
    }
  }

  /// Repository directory this backend runs in
  pub fn repo_path(&self) -> &Path {
    &self.repo_path
  }

  /// Run git with `args` and return trimmed stdout
  ///
  /// A non-zero exit becomes [`GitError::CommandFailed`] carrying git's stderr.
  pub(crate) fn run(&self, args: &[&str]) -> DeployResult<String> {
    let output = self
      .git_cmd()
      .args(args)
      .output()
      .with_context(|| format!("Failed to execute git {}", args.join(" ")))?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(
          GitError::RepoNotFound {
            path: self.repo_path.clone(),
          }
          .into(),
        );
      }
      return Err(
        GitError::CommandFailed {
          command: format!("git {}", args.join(" ")),
          stderr: stderr.trim().to_string(),
        }
        .into(),
      );
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables
  /// - Whitelists only PATH and HOME (plus SYSTEMROOT on Windows)
  /// - Adds safe configuration overrides
  pub(crate) fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    for var in ["PATH", "HOME", "SYSTEMROOT"] {
      if let Ok(value) = std::env::var(var) {
        cmd.env(var, value);
      }
    }

    cmd.arg("-c").arg("core.quotePath=false"); // Don't escape non-ASCII tag names

    cmd
  }
}

/// Parse the single integer printed by `git rev-list --count`
pub(crate) fn parse_count(command: &str, stdout: &str) -> DeployResult<u64> {
  stdout.trim().parse::<u64>().map_err(|_| {
    GitError::UnexpectedOutput {
      command: command.to_string(),
      output: stdout.to_string(),
    }
    .into()
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_count() {
    assert_eq!(parse_count("git rev-list --count HEAD", "42\n").unwrap(), 42);
    assert_eq!(parse_count("git rev-list --count HEAD", "0").unwrap(), 0);
    assert!(parse_count("git rev-list --count HEAD", "forty-two").is_err());
    assert!(parse_count("git rev-list --count HEAD", "").is_err());
  }

  #[test]
  fn test_queries_fail_outside_repository() {
    let dir = tempfile::TempDir::new().unwrap();
    let git = SystemGit::new(dir.path());
    assert!(git.run(&["rev-parse", "HEAD"]).is_err());
    assert_eq!(git.repo_path(), dir.path());
  }
}
