//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Environment variables that would leak the caller's CI setup into a test
const DEPLOY_ENV: &[&str] = &[
  "S3_ENDPOINT_URL",
  "S3_ACCESS_KEY",
  "S3_SECRET_KEY",
  "S3_BUCKET",
  "S3_REGION",
  "GITHUB_TOKEN",
  "GITHUB_REPOSITORY",
  "GITHUB_API_URL",
  "GITHUB_OUTPUT",
  "GITHUB_STEP_SUMMARY",
  "SKIP_GH_RELEASE",
  "LOG_FORMAT",
  "RUST_LOG",
];

/// A throwaway git repository with a build-output directory
pub struct TestRepo {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestRepo {
  /// Create a repository with one commit and no tags
  pub fn new() -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    git(&path, &["init", "--initial-branch=main"])?;
    git(&path, &["config", "user.name", "Test User"])?;
    git(&path, &["config", "user.email", "test@example.com"])?;
    git(&path, &["config", "commit.gpgsign", "false"])?;
    git(&path, &["config", "tag.gpgsign", "false"])?;

    let repo = Self { _root: root, path };
    repo.commit("Initial commit")?;
    Ok(repo)
  }

  /// Commit a change to a tracked file
  pub fn commit(&self, message: &str) -> Result<()> {
    let log = self.path.join("history.txt");
    let mut content = std::fs::read_to_string(&log).unwrap_or_default();
    content.push_str(message);
    content.push('\n');
    std::fs::write(&log, content)?;

    git(&self.path, &["add", "history.txt"])?;
    git(&self.path, &["commit", "-m", message])?;
    Ok(())
  }

  /// Lightweight tag on HEAD
  pub fn tag(&self, name: &str) -> Result<()> {
    git(&self.path, &["tag", name])?;
    Ok(())
  }

  /// Populate `windows-build/` and the pre-deploy outputs
  pub fn add_build_output(&self) -> Result<()> {
    let build = self.path.join("windows-build");
    std::fs::create_dir_all(build.join("data"))?;
    std::fs::write(build.join("app.exe"), b"MZ binary")?;
    std::fs::write(build.join("data/readme.txt"), b"hello")?;
    std::fs::write(
      self.path.join("changelog.json"),
      r#"{"version": "v1.2.0", "zh-cn": "变更", "en-us": "Changes"}"#,
    )?;
    std::fs::write(self.path.join("releaselog.txt"), "变更\n\n---------\nChanges\n")?;
    Ok(())
  }

  pub fn write(&self, relative: &str, content: &str) -> Result<()> {
    let path = self.path.join(relative);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(())
  }

  pub fn read_file(&self, relative: &str) -> Result<String> {
    Ok(std::fs::read_to_string(self.path.join(relative))?)
  }

  pub fn file_exists(&self, relative: &str) -> bool {
    self.path.join(relative).exists()
  }
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Run dyn-deploy with a controlled environment; the exit status is not checked
pub fn run_dyn_deploy(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let mut cmd = Command::new(env!("CARGO_BIN_EXE_dyn-deploy"));
  cmd.current_dir(cwd).args(args);
  for name in DEPLOY_ENV {
    cmd.env_remove(name);
  }
  for (name, value) in env {
    cmd.env(name, value);
  }

  cmd.output().context("Failed to run dyn-deploy")
}

/// Run dyn-deploy and fail the test unless it exits successfully
pub fn run_dyn_deploy_ok(cwd: &Path, args: &[&str], env: &[(&str, &str)]) -> Result<Output> {
  let output = run_dyn_deploy(cwd, args, env)?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    anyhow::bail!(
      "dyn-deploy command failed: dyn-deploy {}\nstdout: {}\nstderr: {}",
      args.join(" "),
      stdout,
      stderr
    );
  }

  Ok(output)
}

/// Storage settings pointing at a port nothing listens on
pub fn unreachable_storage_env() -> Vec<(&'static str, &'static str)> {
  vec![
    ("S3_ENDPOINT_URL", "http://127.0.0.1:1"),
    ("S3_ACCESS_KEY", "AKIDEXAMPLE"),
    ("S3_SECRET_KEY", "secret"),
    ("S3_BUCKET", "releases"),
  ]
}

/// Sorted entry names of a zip archive
pub fn archive_entries(path: &Path) -> Result<Vec<String>> {
  let file = std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
  let archive = zip::ZipArchive::new(file)?;
  let mut names: Vec<String> = archive.file_names().map(String::from).collect();
  names.sort();
  Ok(names)
}
