use std::env;
use std::path::PathBuf;
use tracing::debug;

use crate::core::config::{DeployConfig, DeployOverrides, Env, FileConfig, HostingConfig};
use crate::core::error::DeployResult;
use crate::core::vcs::SystemGit;
use crate::pipeline::{DeployInputs, DeployReport, Pipeline, ReleaseOutcome};
use crate::release::{GitHubClient, ReleaseHost};
use crate::storage::S3Client;

/// Arguments of the deploy command
#[derive(Debug, Clone)]
pub struct DeployArgs {
  pub artifact_dir: PathBuf,
  pub changelog: PathBuf,
  pub releaselog: PathBuf,
  pub version: Option<String>,
  pub s3_prefix: Option<String>,
  pub skip_release: Option<bool>,
  pub product: Option<String>,
  pub platform: Option<String>,
  pub output_dir: Option<PathBuf>,
  pub config: Option<PathBuf>,
  pub json: bool,
}

/// Run the deploy command
pub fn run_deploy(args: DeployArgs) -> DeployResult<()> {
  let current_dir = env::current_dir()?;
  let file = FileConfig::load(args.config.as_deref(), &current_dir)?;
  let overrides = DeployOverrides {
    prefix: args.s3_prefix,
    skip_release: args.skip_release,
    product: args.product,
    platform: args.platform,
  };

  // Storage settings are checked here, before anything touches disk or network
  let config = DeployConfig::load(&Env::from_process(), &file, &overrides)?;
  let store = S3Client::new(&config.storage)?;
  let git = SystemGit::new(&current_dir);
  debug!(repo = %git.repo_path().display(), bucket = %config.storage.bucket, prefix = %config.prefix, "Loaded deploy configuration");

  let inputs = DeployInputs {
    artifact_dir: args.artifact_dir,
    changelog: args.changelog,
    releaselog: args.releaselog,
    version: args.version,
    output_dir: args.output_dir.unwrap_or(current_dir),
  };

  let report = Pipeline::new(&config, &git, &store, &connect_github).run(&inputs)?;

  if args.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_report(&report);
  }
  Ok(())
}

fn connect_github<'a>(hosting: &HostingConfig) -> DeployResult<Box<dyn ReleaseHost + 'a>> {
  Ok(Box::new(GitHubClient::new(hosting)))
}

fn print_report(report: &DeployReport) {
  println!("✅ Deployed {}", report.version);
  println!("   archive: {} ({} bytes)", report.archive.display(), report.archive_size);
  for key in &report.uploaded_keys {
    println!("   uploaded: {}", key);
  }
  match &report.release {
    ReleaseOutcome::Skipped => println!("   release: skipped"),
    ReleaseOutcome::Untagged => println!("   release: not published (HEAD is not tagged)"),
    ReleaseOutcome::Published {
      tag,
      release_id,
      created,
      asset_name,
    } => println!(
      "   release: {} {} (id {}) with asset {}",
      if *created { "created" } else { "updated" },
      tag,
      release_id,
      asset_name
    ),
  }
}
