use crate::core::error::DeployResult;
use crate::stamp::{self, StampRequest};

/// Run the stamp command
pub fn run_stamp(request: StampRequest) -> DeployResult<()> {
  let artifact = stamp::stamp(&request)?;
  println!(
    "✅ Embedded {} into {} ({})",
    request.manifest.display(),
    request.target_exe,
    artifact.path.display()
  );
  Ok(())
}
