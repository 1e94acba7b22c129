use serde::Serialize;
use std::env;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::core::error::{DeployResult, ResultExt};
use crate::core::vcs::SystemGit;
use crate::version::{self, TagBinding};

#[derive(Debug, Serialize)]
struct ResolveOutput<'a> {
  version: &'a str,
  has_tag: bool,
  exact_tag: Option<&'a str>,
}

/// Run the resolve command
pub fn run_resolve(github_output: Option<&Path>, step_summary: Option<&Path>, json: bool) -> DeployResult<()> {
  let current_dir = env::current_dir()?;
  let binding = version::resolve(&SystemGit::new(&current_dir));

  if json {
    let output = ResolveOutput {
      version: &binding.version,
      has_tag: binding.has_tag(),
      exact_tag: binding.exact_tag.as_deref(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
  } else {
    print!("{}", step_outputs(&binding));
  }

  if let Some(path) = github_output {
    append(path, &step_outputs(&binding))?;
  }
  if let Some(path) = step_summary {
    append(path, &summary_markdown(&binding))?;
  }

  Ok(())
}

fn append(path: &Path, text: &str) -> DeployResult<()> {
  let mut file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("Failed to open {}", path.display()))?;
  file.write_all(text.as_bytes())?;
  Ok(())
}

/// `key=value` lines in the CI step-output format
fn step_outputs(binding: &TagBinding) -> String {
  format!("version={}\nhas_tag={}\n", binding.version, binding.has_tag())
}

/// Markdown block for the CI job summary page
fn summary_markdown(binding: &TagBinding) -> String {
  format!(
    "## Resolved Version\n\n- version: {}\n- has_tag: {}\n\n",
    binding.version,
    binding.has_tag()
  )
}
