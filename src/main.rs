mod changelog;
mod commands;
mod core;
mod package;
mod pipeline;
mod release;
mod stamp;
mod storage;
mod utils;
mod version;

use clap::{Parser, Subcommand, ValueEnum};
use crate::core::error::{DeployError, print_error};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Package, publish and release build artifacts
#[derive(Parser)]
#[command(name = "dyn-deploy")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Log output format
  #[arg(long, global = true, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
  log_format: LogFormat,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
  Pretty,
  Json,
}

#[derive(Subcommand)]
enum Commands {
  /// Package the build output, upload it and reconcile the hosted release
  Deploy {
    /// Directory of the built artifact (unzipped)
    #[arg(long, default_value = "windows-build")]
    artifact_dir: PathBuf,
    /// Changelog payload uploaded to the stable changelog key
    #[arg(long, default_value = "changelog.json")]
    changelog: PathBuf,
    /// Release notes used as the release body
    #[arg(long, default_value = "releaselog.txt")]
    releaselog: PathBuf,
    /// Version override (empty: compute from git)
    #[arg(long)]
    version: Option<String>,
    /// Object storage key prefix (default: dyn/)
    #[arg(long)]
    s3_prefix: Option<String>,
    /// Product name used in the archive name and release title
    #[arg(long)]
    product: Option<String>,
    /// Platform segment of the archive name
    #[arg(long)]
    platform: Option<String>,
    /// Skip creating/updating the hosted release
    #[arg(long, conflicts_with = "no_skip_release")]
    skip_release: bool,
    /// Do not skip the hosted release (overrides SKIP_GH_RELEASE)
    #[arg(long)]
    no_skip_release: bool,
    /// Directory the archive is written to (default: current directory)
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Path to deploy.toml (default: searched in the current directory)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the deploy report as JSON
    #[arg(long)]
    json: bool,
  },

  /// Print the version derived from git tags
  Resolve {
    /// Append version/has_tag lines to this step-output file
    #[arg(long, env = "GITHUB_OUTPUT")]
    github_output: Option<PathBuf>,
    /// Append a markdown summary to this job-summary file
    #[arg(long, env = "GITHUB_STEP_SUMMARY")]
    step_summary: Option<PathBuf>,
    /// Output in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Build the release archive only
  Package {
    /// Directory to package
    #[arg(long, default_value = "windows-build")]
    artifact_dir: PathBuf,
    /// Archive path (default: release name in the current directory)
    #[arg(long)]
    output: Option<PathBuf>,
    /// Version override used for the default archive name
    #[arg(long)]
    version: Option<String>,
    /// Path to deploy.toml
    #[arg(long)]
    config: Option<PathBuf>,
  },

  /// Render release notes from a changelog payload
  Notes {
    /// Changelog payload to read
    #[arg(long, default_value = "changelog.json")]
    changelog: PathBuf,
    /// Write notes here instead of standard output
    #[arg(long)]
    output: Option<PathBuf>,
    /// Locale printed first
    #[arg(long, default_value = changelog::DEFAULT_PRIMARY_LOCALE)]
    primary: String,
    /// Locale printed after the separator
    #[arg(long, default_value = changelog::DEFAULT_SECONDARY_LOCALE)]
    secondary: String,
  },

  /// Embed a manifest into an executable inside a packaged archive
  Stamp {
    /// Manifest tool (mt.exe or compatible)
    #[arg(long)]
    tool: PathBuf,
    /// Archive to rewrite in place
    #[arg(long)]
    archive: PathBuf,
    /// Manifest file to embed
    #[arg(long)]
    manifest: PathBuf,
    /// Executable path relative to the archive root
    #[arg(long)]
    target_exe: String,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "dyn_deploy=info".into());
  let registry = tracing_subscriber::registry().with(filter);

  match format {
    LogFormat::Pretty => registry
      .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
      .init(),
    LogFormat::Json => registry
      .with(
        fmt::layer()
          .json()
          .with_target(true)
          .flatten_event(true)
          .with_writer(std::io::stderr),
      )
      .init(),
  }
}

fn main() {
  let cli = Cli::parse();
  init_tracing(cli.log_format);

  let result = match cli.command {
    Commands::Deploy {
      artifact_dir,
      changelog,
      releaselog,
      version,
      s3_prefix,
      product,
      platform,
      skip_release,
      no_skip_release,
      output_dir,
      config,
      json,
    } => commands::run_deploy(commands::DeployArgs {
      artifact_dir,
      changelog,
      releaselog,
      version,
      s3_prefix,
      skip_release: match (skip_release, no_skip_release) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
      },
      product,
      platform,
      output_dir,
      config,
      json,
    }),
    Commands::Resolve {
      github_output,
      step_summary,
      json,
    } => commands::run_resolve(github_output.as_deref(), step_summary.as_deref(), json),
    Commands::Package {
      artifact_dir,
      output,
      version,
      config,
    } => commands::run_package(&artifact_dir, output, version.as_deref(), config.as_deref()),
    Commands::Notes {
      changelog,
      output,
      primary,
      secondary,
    } => commands::run_notes(&changelog, output.as_deref(), &primary, &secondary),
    Commands::Stamp {
      tool,
      archive,
      manifest,
      target_exe,
    } => commands::run_stamp(stamp::StampRequest {
      tool,
      archive,
      manifest,
      target_exe,
    }),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: DeployError) -> ! {
  tracing::error!("dyn-deploy failed: {}", err);
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
