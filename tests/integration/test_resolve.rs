//! Integration tests for `dyn-deploy resolve`

use crate::helpers::{TestRepo, run_dyn_deploy_ok};
use anyhow::Result;

fn stdout(output: &std::process::Output) -> String {
  String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn test_resolve_tag_on_head() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("v1.2.0")?;

  let output = run_dyn_deploy_ok(&repo.path, &["resolve"], &[])?;
  assert_eq!(stdout(&output), "version=v1.2.0\nhas_tag=true\n");
  Ok(())
}

#[test]
fn test_resolve_counts_commits_since_ancestor_tag() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("v1.1.0")?;
  for i in 0..7 {
    repo.commit(&format!("change {}", i))?;
  }

  let output = run_dyn_deploy_ok(&repo.path, &["resolve"], &[])?;
  assert_eq!(stdout(&output), "version=v1.1.0-7\nhas_tag=false\n");
  Ok(())
}

#[test]
fn test_resolve_without_tags_uses_total_commits() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.commit("second")?;
  repo.commit("third")?;

  let output = run_dyn_deploy_ok(&repo.path, &["resolve"], &[])?;
  assert_eq!(stdout(&output), "version=v0.0.0-3\nhas_tag=false\n");
  Ok(())
}

#[test]
fn test_resolve_multiple_tags_picks_greatest_version() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("v1.9.0")?;
  repo.tag("v1.10.0")?;
  repo.tag("nightly")?;

  let output = run_dyn_deploy_ok(&repo.path, &["resolve"], &[])?;
  assert_eq!(stdout(&output), "version=v1.10.0\nhas_tag=true\n");
  Ok(())
}

#[test]
fn test_resolve_outside_repository_falls_back() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_dyn_deploy_ok(dir.path(), &["resolve"], &[])?;
  assert_eq!(stdout(&output), "version=v0.0.0-0\nhas_tag=false\n");
  Ok(())
}

#[test]
fn test_resolve_appends_step_outputs() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("v2.0.0")?;
  let out_file = repo.path.join("step-output.txt");
  std::fs::write(&out_file, "previous=1\n")?;
  let out_path = out_file.to_string_lossy().into_owned();

  run_dyn_deploy_ok(&repo.path, &["resolve"], &[("GITHUB_OUTPUT", out_path.as_str())])?;

  assert_eq!(
    std::fs::read_to_string(&out_file)?,
    "previous=1\nversion=v2.0.0\nhas_tag=true\n"
  );
  Ok(())
}

#[test]
fn test_resolve_appends_step_summary() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("v2.0.0")?;
  let summary = repo.path.join("summary.md");
  let summary_path = summary.to_string_lossy().into_owned();

  run_dyn_deploy_ok(&repo.path, &["resolve", "--step-summary", summary_path.as_str()], &[])?;

  let text = std::fs::read_to_string(&summary)?;
  assert!(text.contains("- version: v2.0.0\n"));
  assert!(text.contains("- has_tag: true\n"));
  Ok(())
}

#[test]
fn test_resolve_json_output() -> Result<()> {
  let repo = TestRepo::new()?;
  repo.tag("v1.0.0")?;
  repo.commit("after")?;

  let output = run_dyn_deploy_ok(&repo.path, &["resolve", "--json"], &[])?;
  let value: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(value["version"], "v1.0.0-1");
  assert_eq!(value["has_tag"], false);
  assert!(value["exact_tag"].is_null());
  Ok(())
}
