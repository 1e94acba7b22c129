//! Changelog payload (`changelog.json`) and release-notes rendering

use crate::core::error::{ConfigError, DeployError, DeployResult, ResultExt};
use crate::storage::normalize_text;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const DEFAULT_PRIMARY_LOCALE: &str = "zh-cn";
pub const DEFAULT_SECONDARY_LOCALE: &str = "en-us";

/// Separator line between the two locales in rendered notes
const NOTES_SEPARATOR: &str = "---------";

/// `{ "version": "...", "<locale>": "<text>", ... }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangelogPayload {
  #[serde(default)]
  pub version: Option<String>,
  #[serde(flatten)]
  entries: BTreeMap<String, serde_json::Value>,
}

impl ChangelogPayload {
  pub fn parse(text: &str) -> DeployResult<Self> {
    let payload: ChangelogPayload = serde_json::from_str(&normalize_text(text))?;
    Ok(payload)
  }

  /// Text for `locale`, if present and a non-blank string
  pub fn locale(&self, locale: &str) -> Option<&str> {
    self
      .entries
      .get(locale)
      .and_then(|v| v.as_str())
      .filter(|s| !s.trim().is_empty())
  }

  /// Locales carrying text, in key order
  pub fn locales(&self) -> Vec<&str> {
    self
      .entries
      .iter()
      .filter(|(_, v)| v.is_string())
      .map(|(k, _)| k.as_str())
      .collect()
  }
}

/// Read a text input file, normalized to plain UTF-8
///
/// A missing file is a configuration error.
pub fn read_text(path: &Path) -> DeployResult<String> {
  if !path.is_file() {
    return Err(
      ConfigError::FileNotFound {
        path: path.to_path_buf(),
      }
      .into(),
    );
  }
  let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
  let text = String::from_utf8(bytes)
    .map_err(|_| DeployError::message(format!("{} is not valid UTF-8", path.display())))?;
  Ok(normalize_text(&text))
}

/// Render release notes: primary text, a separator, then secondary text
///
/// A missing secondary locale falls back to the primary text.
pub fn render_release_notes(payload: &ChangelogPayload, primary: &str, secondary: &str) -> DeployResult<String> {
  let first = payload.locale(primary).ok_or_else(|| {
    DeployError::with_help(
      format!("Changelog payload has no text for locale '{}'", primary),
      format!("Available locales: {}", payload.locales().join(", ")),
    )
  })?;
  let second = payload.locale(secondary).unwrap_or(first);
  Ok(format!("{}\n\n{}\n{}\n", first, NOTES_SEPARATOR, second))
}
