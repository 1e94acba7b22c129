//! Integration tests for `dyn-deploy notes`

use crate::helpers::{TestRepo, run_dyn_deploy, run_dyn_deploy_ok};
use anyhow::Result;

#[test]
fn test_notes_written_to_file() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.add_build_output()?;

  run_dyn_deploy_ok(&repo.path, &["notes", "--output", "notes.txt"], &[])?;

  assert_eq!(repo.read_file("notes.txt")?, "变更\n\n---------\nChanges\n");
  Ok(())
}

#[test]
fn test_notes_missing_primary_locale_fails() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.write("changelog.json", r#"{"version": "v1", "en-us": "Changes"}"#)?;

  let output = run_dyn_deploy(&repo.path, &["notes"], &[])?;

  assert!(!output.status.success());
  assert!(String::from_utf8_lossy(&output.stderr).contains("zh-cn"));
  Ok(())
}
