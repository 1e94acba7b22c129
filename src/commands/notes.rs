use std::fs;
use std::path::Path;

use crate::changelog::{self, ChangelogPayload};
use crate::core::error::{DeployResult, ResultExt};

/// Run the notes command: print release notes, or write them to `output`
pub fn run_notes(changelog_path: &Path, output: Option<&Path>, primary: &str, secondary: &str) -> DeployResult<()> {
  let text = changelog::read_text(changelog_path)?;
  let payload =
    ChangelogPayload::parse(&text).with_context(|| format!("Failed to parse {}", changelog_path.display()))?;
  let notes = changelog::render_release_notes(&payload, primary, secondary)?;

  match output {
    Some(path) => {
      fs::write(path, &notes).with_context(|| format!("Failed to write {}", path.display()))?;
      println!("✅ Wrote {}", path.display());
    }
    None => print!("{}", notes),
  }
  Ok(())
}
