//! Artifact packaging
//!
//! Turns a build-output directory into a single deflate-compressed zip whose
//! entries are paths relative to that directory. There is no wrapping
//! top-level folder: consumers extract straight into an install root.

use crate::core::error::{ConfigError, DeployResult, ResultExt};
use crate::utils::path_to_archive_format;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// A packaged archive on local disk
#[derive(Debug, Clone)]
pub struct Artifact {
  /// File name, e.g. `DyNode-win-v1.2.0.zip`
  pub name: String,
  /// Where the archive was written
  pub path: PathBuf,
  /// Entry names in the order they were written
  pub entries: Vec<String>,
  /// Archive size in bytes
  pub size: u64,
}

/// Deterministic archive name for a product build
///
/// Path separators in any part (git allows `release/v1.0.0` as a tag) become
/// `-`, so the name is always a single file name.
pub fn artifact_name(product: &str, platform: &str, version: &str) -> String {
  format!("{}-{}-{}.zip", product, platform, version).replace(['/', '\\'], "-")
}

/// Package every regular file under `source_dir` into `dest_path`
///
/// Any existing file at `dest_path` is replaced. Entries are written in
/// file-name order, so the name-to-content mapping is a pure function of the
/// directory contents.
pub fn package(source_dir: &Path, dest_path: &Path) -> DeployResult<Artifact> {
  if !source_dir.is_dir() {
    return Err(
      ConfigError::DirectoryNotFound {
        path: source_dir.to_path_buf(),
      }
      .into(),
    );
  }

  if dest_path.exists() {
    fs::remove_file(dest_path).with_context(|| format!("Failed to remove existing archive {}", dest_path.display()))?;
  }
  if let Some(parent) = dest_path.parent().filter(|p| !p.as_os_str().is_empty()) {
    fs::create_dir_all(parent)?;
  }

  info!("Zipping directory '{}' into '{}' ...", source_dir.display(), dest_path.display());

  let file = File::create(dest_path).with_context(|| format!("Failed to create archive {}", dest_path.display()))?;
  // Resolved after creation so an archive written inside the source tree can be skipped
  let dest_canonical = fs::canonicalize(dest_path)?;

  let mut zip = ZipWriter::new(BufWriter::new(file));
  let mut entries = Vec::new();

  for entry in WalkDir::new(source_dir).follow_links(true).sort_by_file_name() {
    let entry = entry?;
    if !entry.file_type().is_file() {
      continue;
    }
    if fs::canonicalize(entry.path()).is_ok_and(|p| p == dest_canonical) {
      continue;
    }

    let relative = entry.path().strip_prefix(source_dir)?;
    let name = path_to_archive_format(relative);
    let metadata = entry.metadata()?;

    zip.start_file(name.as_str(), entry_options(&metadata))?;
    let mut reader = File::open(entry.path()).with_context(|| format!("Failed to read {}", entry.path().display()))?;
    io::copy(&mut reader, &mut zip)?;

    debug!(entry = %name, bytes = metadata.len(), "Added archive entry");
    entries.push(name);
  }

  let mut writer = zip.finish()?;
  writer.flush()?;

  let size = fs::metadata(dest_path)?.len();
  info!(
    "Zip created: {} ({:.2} MB, {} entries)",
    dest_path.display(),
    size as f64 / (1024.0 * 1024.0),
    entries.len()
  );

  Ok(Artifact {
    name: dest_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default(),
    path: dest_path.to_path_buf(),
    entries,
    size,
  })
}

/// Extract every entry of `archive` into `dest_dir`
pub fn extract(archive: &Path, dest_dir: &Path) -> DeployResult<()> {
  let file = File::open(archive).with_context(|| format!("Failed to open archive {}", archive.display()))?;
  let mut zip = ZipArchive::new(file)?;
  zip.extract(dest_dir)?;
  Ok(())
}

fn entry_options(metadata: &fs::Metadata) -> SimpleFileOptions {
  let options = SimpleFileOptions::default()
    .compression_method(CompressionMethod::Deflated)
    .large_file(metadata.len() >= u32::MAX as u64);

  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    options.unix_permissions(metadata.permissions().mode())
  }
  #[cfg(not(unix))]
  {
    options
  }
}
