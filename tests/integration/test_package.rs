//! Integration tests for `dyn-deploy package`

use crate::helpers::{TestRepo, archive_entries, run_dyn_deploy, run_dyn_deploy_ok};
use anyhow::Result;

#[test]
fn test_package_explicit_output() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;

  run_dyn_deploy_ok(&repo.path, &["package", "--output", "dist/out.zip"], &[])?;

  assert_eq!(
    archive_entries(&repo.path.join("dist/out.zip"))?,
    vec!["app.exe", "data/readme.txt"]
  );
  Ok(())
}

#[test]
fn test_package_default_name_uses_version_and_product() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;
  repo.write("deploy.toml", "[product]\nname = \"Product\"\n")?;
  repo.tag("v1.2.0")?;

  run_dyn_deploy_ok(&repo.path, &["package"], &[])?;

  assert!(repo.file_exists("Product-win-v1.2.0.zip"));
  assert_eq!(
    archive_entries(&repo.path.join("Product-win-v1.2.0.zip"))?,
    vec!["app.exe", "data/readme.txt"]
  );
  Ok(())
}

#[test]
fn test_package_twice_is_stable() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;

  run_dyn_deploy_ok(&repo.path, &["package", "--output", "out.zip"], &[])?;
  let first = archive_entries(&repo.path.join("out.zip"))?;
  run_dyn_deploy_ok(&repo.path, &["package", "--output", "out.zip"], &[])?;

  assert_eq!(archive_entries(&repo.path.join("out.zip"))?, first);
  Ok(())
}

#[test]
fn test_package_missing_directory_is_config_error() -> Result<()> {
  let repo = TestRepo::new()?;

  let output = run_dyn_deploy(&repo.path, &["package", "--artifact-dir", "nope", "--output", "out.zip"], &[])?;

  assert_eq!(output.status.code(), Some(1));
  assert!(String::from_utf8_lossy(&output.stderr).contains("nope"));
  assert!(!repo.file_exists("out.zip"));
  Ok(())
}
