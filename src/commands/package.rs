use std::env;
use std::path::{Path, PathBuf};

use crate::core::config::{DeployOverrides, FileConfig, ProductConfig};
use crate::core::error::DeployResult;
use crate::core::vcs::SystemGit;
use crate::package;
use crate::version;

/// Run the package command
///
/// Without `--output` the archive gets its release name in the working
/// directory, which needs the resolved version.
pub fn run_package(
  artifact_dir: &Path,
  output: Option<PathBuf>,
  explicit_version: Option<&str>,
  config: Option<&Path>,
) -> DeployResult<()> {
  let current_dir = env::current_dir()?;

  let dest = match output {
    Some(path) => path,
    None => {
      let file = FileConfig::load(config, &current_dir)?;
      let product = ProductConfig::resolve(&file, &DeployOverrides::default());
      let binding = version::apply_override(version::resolve(&SystemGit::new(&current_dir)), explicit_version);
      current_dir.join(package::artifact_name(&product.name, &product.platform, &binding.version))
    }
  };

  let artifact = package::package(artifact_dir, &dest)?;
  println!("✅ {} ({} entries, {} bytes)", artifact.path.display(), artifact.entries.len(), artifact.size);
  Ok(())
}
