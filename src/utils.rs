//! Utility functions for cross-platform path handling and upload metadata

use std::path::{Component, Path};

/// Convert a relative path to archive-entry format (always forward slashes)
///
/// Zip consumers expect `/` separators regardless of the host that wrote the
/// archive, so components are joined explicitly instead of relying on the
/// platform's `Display`.
pub fn path_to_archive_format(path: &Path) -> String {
  path
    .components()
    .filter_map(|c| match c {
      Component::Normal(part) => Some(part.to_string_lossy()),
      _ => None,
    })
    .collect::<Vec<_>>()
    .join("/")
}

/// Content type sent with an upload, chosen by file extension
pub fn content_type_for(name: &str) -> &'static str {
  let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
  match ext.as_deref() {
    Some("zip") => "application/zip",
    Some("json") => "application/json; charset=utf-8",
    Some("txt") => "text/plain; charset=utf-8",
    _ => "application/octet-stream",
  }
}

/// Percent-encode a string for use in a URL
///
/// Unreserved characters (RFC 3986) pass through; with `keep_slash` the `/`
/// separator is preserved so object keys keep their path shape.
pub fn percent_encode(input: &str, keep_slash: bool) -> String {
  let mut out = String::with_capacity(input.len());
  for byte in input.bytes() {
    match byte {
      b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(byte as char),
      b'/' if keep_slash => out.push('/'),
      _ => out.push_str(&format!("%{:02X}", byte)),
    }
  }
  out
}
