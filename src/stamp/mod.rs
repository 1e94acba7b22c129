//! Post-build manifest stamping
//!
//! Embeds a manifest into an executable that already sits inside a packaged
//! archive: extract, run the manifest tool against the executable, re-pack
//! over the original archive.

use crate::core::error::{ConfigError, DeployError, DeployResult, ResultExt};
use crate::package;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::{debug, info};

/// Inputs to a stamping run
#[derive(Debug, Clone)]
pub struct StampRequest {
  /// Manifest tool executable (`mt.exe` or compatible)
  pub tool: PathBuf,
  pub archive: PathBuf,
  pub manifest: PathBuf,
  /// Executable path relative to the archive root
  pub target_exe: String,
}

/// Embed the manifest and rewrite the archive in place
///
/// The archive is only rewritten after the tool succeeds. The scratch
/// directory is removed on every path.
pub fn stamp(request: &StampRequest) -> DeployResult<package::Artifact> {
  for path in [&request.tool, &request.archive, &request.manifest] {
    if !path.is_file() {
      return Err(ConfigError::FileNotFound { path: path.clone() }.into());
    }
  }
  let relative = target_path(&request.target_exe)?;

  info!("Processing archive: {}", request.archive.display());
  let scratch = TempDir::new().context("Failed to create temporary directory")?;
  debug!(dir = %scratch.path().display(), "Created scratch directory");

  package::extract(&request.archive, scratch.path())
    .with_context(|| format!("Failed to extract {}", request.archive.display()))?;

  let exe_path = scratch.path().join(&relative);
  if !exe_path.is_file() {
    return Err(DeployError::with_help(
      format!("Target executable '{}' not found in the archive", request.target_exe),
      "Pass the executable's path relative to the archive root with --target-exe.",
    ));
  }

  run_tool(&request.tool, &request.manifest, &exe_path)?;

  info!("Re-packing modified files into '{}'", request.archive.display());
  let artifact = repack(scratch.path(), &request.archive)?;
  info!("Manifest embedded into {}", request.target_exe);
  Ok(artifact)
}

/// Package `source` beside `archive`, then rename it over the original
fn repack(source: &Path, archive: &Path) -> DeployResult<package::Artifact> {
  let parent = archive
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or(Path::new("."));
  let file_name = archive.file_name().ok_or_else(|| {
    DeployError::message(format!("Archive path {} has no file name", archive.display()))
  })?;

  let staging = tempfile::Builder::new()
    .prefix(".stamp-")
    .tempdir_in(parent)
    .context("Failed to create staging directory")?;
  let mut artifact = package::package(source, &staging.path().join(file_name))?;

  fs::rename(&artifact.path, archive).with_context(|| format!("Failed to replace {}", archive.display()))?;
  artifact.path = archive.to_path_buf();
  Ok(artifact)
}

fn run_tool(tool: &Path, manifest: &Path, exe_path: &Path) -> DeployResult<()> {
  let output_resource = format!("-outputresource:{};#1", exe_path.display());
  info!(
    "Executing command: {} -manifest {} {}",
    tool.display(),
    manifest.display(),
    output_resource
  );

  let output = Command::new(tool)
    .arg("-manifest")
    .arg(manifest)
    .arg(&output_resource)
    .output()
    .with_context(|| format!("Failed to run {}", tool.display()))?;

  if !output.status.success() {
    return Err(DeployError::message(format!(
      "{} failed with {}\nStderr:\n{}\nStdout:\n{}",
      tool.display(),
      output.status,
      String::from_utf8_lossy(&output.stderr).trim_end(),
      String::from_utf8_lossy(&output.stdout).trim_end()
    )));
  }

  debug!("Manifest tool completed successfully");
  Ok(())
}

/// Relative, non-escaping path of the executable inside the archive
fn target_path(target_exe: &str) -> DeployResult<PathBuf> {
  let path = PathBuf::from(target_exe);
  let escapes = path
    .components()
    .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
  if target_exe.trim().is_empty() || escapes {
    return Err(
      ConfigError::InvalidValue {
        field: "--target-exe".to_string(),
        value: target_exe.to_string(),
        reason: "must be a relative path inside the archive".to_string(),
      }
      .into(),
    );
  }
  Ok(path)
}
