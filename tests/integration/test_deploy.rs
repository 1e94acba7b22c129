//! Integration tests for `dyn-deploy deploy`
//!
//! Storage points at a closed local port, so every test here ends before or
//! at the first network call.

use crate::helpers::{TestRepo, run_dyn_deploy, unreachable_storage_env};
use anyhow::Result;

#[test]
fn test_missing_bucket_aborts_without_touching_archive() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;
  repo.tag("v1.2.0")?;
  repo.write("DyNode-win-v1.2.0.zip", "previous archive")?;

  let env: Vec<_> = unreachable_storage_env()
    .into_iter()
    .filter(|(name, _)| *name != "S3_BUCKET")
    .collect();
  let output = run_dyn_deploy(&repo.path, &["deploy"], &env)?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("S3_BUCKET"));
  assert_eq!(repo.read_file("DyNode-win-v1.2.0.zip")?, "previous archive");
  Ok(())
}

#[test]
fn test_missing_artifact_dir_is_config_error() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;

  let output = run_dyn_deploy(
    &repo.path,
    &["deploy", "--artifact-dir", "missing-build"],
    &unreachable_storage_env(),
  )?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("missing-build"));
  Ok(())
}

#[test]
fn test_release_without_hosting_credentials_fails_before_packaging() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;
  repo.tag("v1.2.0")?;

  let output = run_dyn_deploy(&repo.path, &["deploy", "--no-skip-release"], &unreachable_storage_env())?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("GITHUB_TOKEN"));
  assert!(!repo.file_exists("DyNode-win-v1.2.0.zip"));
  Ok(())
}

#[test]
fn test_storage_failure_is_remote_error_and_keeps_archive() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;
  repo.tag("v1.2.0")?;

  let output = run_dyn_deploy(&repo.path, &["deploy", "--s3-prefix", "builds"], &unreachable_storage_env())?;

  assert_eq!(output.status.code(), Some(3));
  assert!(String::from_utf8_lossy(&output.stderr).contains("builds/DyNode-win-v1.2.0.zip"));
  assert!(repo.file_exists("DyNode-win-v1.2.0.zip"));
  Ok(())
}

#[test]
fn test_untagged_build_names_archive_with_synthesized_version() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;
  repo.tag("v1.1.0")?;
  repo.commit("one")?;
  repo.commit("two")?;

  // A release is never attempted for an untagged build, so hosting
  // credentials are not required even with skipping disabled
  let output = run_dyn_deploy(&repo.path, &["deploy"], &{
    let mut env = unreachable_storage_env();
    env.push(("SKIP_GH_RELEASE", "0"));
    env
  })?;

  assert_eq!(output.status.code(), Some(3));
  assert!(repo.file_exists("DyNode-win-v1.1.0-2.zip"));
  Ok(())
}
