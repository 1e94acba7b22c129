//! Error types for dyn-deploy with contextual messages and exit codes
//!
//! Every failure in the pipeline ends up as a [`DeployError`]. Components return
//! it up the call chain; `main` is the only place that turns one into a process
//! exit code.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for dyn-deploy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// Configuration error (missing credentials, files, directories, bad flags)
  User = 1,
  /// System error (git, I/O, archive, child tools)
  System = 2,
  /// Remote error (object storage or hosting service rejected a call)
  Remote = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for dyn-deploy
#[derive(Debug)]
pub enum DeployError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Archive read/write errors
  Archive(zip::result::ZipError),

  /// Object storage and hosting service errors
  Remote(RemoteError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl DeployError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    DeployError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Create an error with help text
  pub fn with_help(msg: impl Into<String>, help: impl Into<String>) -> Self {
    DeployError::Message {
      message: msg.into(),
      context: None,
      help: Some(help.into()),
    }
  }

  /// Add context to an existing error
  ///
  /// Structured errors keep their category (and therefore their exit code);
  /// the context is only attached to free-form messages.
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      DeployError::Message { message, context, help } => DeployError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      DeployError::Io(e) => DeployError::Message {
        message: format!("I/O error: {}", e),
        context: Some(ctx_str),
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      DeployError::Config(_) => ExitCode::User,
      DeployError::Git(_) => ExitCode::System,
      DeployError::Archive(_) => ExitCode::System,
      DeployError::Remote(_) => ExitCode::Remote,
      DeployError::Io(_) => ExitCode::System,
      DeployError::Message { .. } => ExitCode::System,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      DeployError::Config(e) => e.help_message(),
      DeployError::Git(e) => e.help_message(),
      DeployError::Remote(e) => e.help_message(),
      DeployError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for DeployError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeployError::Config(e) => write!(f, "{}", e),
      DeployError::Git(e) => write!(f, "{}", e),
      DeployError::Archive(e) => write!(f, "Archive error: {}", e),
      DeployError::Remote(e) => write!(f, "{}", e),
      DeployError::Io(e) => write!(f, "I/O error: {}", e),
      DeployError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for DeployError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      DeployError::Io(e) => Some(e),
      DeployError::Archive(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for DeployError {
  fn from(err: io::Error) -> Self {
    DeployError::Io(err)
  }
}

impl From<String> for DeployError {
  fn from(msg: String) -> Self {
    DeployError::message(msg)
  }
}

impl From<&str> for DeployError {
  fn from(msg: &str) -> Self {
    DeployError::message(msg)
  }
}

impl From<ConfigError> for DeployError {
  fn from(err: ConfigError) -> Self {
    DeployError::Config(err)
  }
}

impl From<GitError> for DeployError {
  fn from(err: GitError) -> Self {
    DeployError::Git(err)
  }
}

impl From<RemoteError> for DeployError {
  fn from(err: RemoteError) -> Self {
    DeployError::Remote(err)
  }
}

impl From<zip::result::ZipError> for DeployError {
  fn from(err: zip::result::ZipError) -> Self {
    DeployError::Archive(err)
  }
}

impl From<walkdir::Error> for DeployError {
  fn from(err: walkdir::Error) -> Self {
    DeployError::message(format!("Directory walk error: {}", err))
  }
}

impl From<toml_edit::de::Error> for DeployError {
  fn from(err: toml_edit::de::Error) -> Self {
    DeployError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for DeployError {
  fn from(err: serde_json::Error) -> Self {
    DeployError::message(format!("JSON error: {}", err))
  }
}

impl From<std::path::StripPrefixError> for DeployError {
  fn from(err: std::path::StripPrefixError) -> Self {
    DeployError::message(format!("Path strip prefix error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
  /// A required environment variable or setting is absent
  #[error("Missing required configuration: {field}")]
  MissingField { field: String },

  /// A setting is present but malformed
  #[error("Invalid value for {field}: '{value}' ({reason})")]
  InvalidValue {
    field: String,
    value: String,
    reason: String,
  },

  /// A required input file does not exist
  #[error("File not found: {}", path.display())]
  FileNotFound { path: PathBuf },

  /// A required input directory does not exist or is not a directory
  #[error("Directory not found or not a directory: {}", path.display())]
  DirectoryNotFound { path: PathBuf },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::MissingField { field } if field.starts_with("S3_") => Some(format!(
        "Set {} in the environment. Storage uploads need S3_ENDPOINT_URL, S3_ACCESS_KEY, S3_SECRET_KEY and S3_BUCKET.",
        field
      )),
      ConfigError::MissingField { field } if field.starts_with("GITHUB_") => Some(format!(
        "Set {} in the environment, or pass --skip-release to publish to storage only.",
        field
      )),
      ConfigError::InvalidValue { field, .. } if field == "GITHUB_REPOSITORY" => {
        Some("GITHUB_REPOSITORY must look like 'owner/repo'.".to_string())
      }
      ConfigError::DirectoryNotFound { .. } => {
        Some("Pass the build output directory with --artifact-dir.".to_string())
      }
      _ => None,
    }
  }
}

/// Git operation errors
#[derive(Debug, Error)]
pub enum GitError {
  /// Git command failed
  #[error("Git command failed: {command}\n{stderr}")]
  CommandFailed { command: String, stderr: String },

  /// Repository not found
  #[error("Git repository not found at: {}", path.display())]
  RepoNotFound { path: PathBuf },

  /// Git printed something we could not interpret
  #[error("Unexpected output from {command}: '{output}'")]
  UnexpectedOutput { command: String, output: String },
}

impl GitError {
  fn help_message(&self) -> Option<String> {
    match self {
      GitError::RepoNotFound { path } => Some(format!(
        "Run dyn-deploy from inside the repository being released: {}",
        path.display()
      )),
      _ => None,
    }
  }
}

/// Object storage and hosting service errors
#[derive(Debug, Error)]
pub enum RemoteError {
  /// The service answered with a non-success status
  #[error("{service} {operation} failed with HTTP {status}: {body}")]
  Status {
    service: &'static str,
    operation: String,
    status: u16,
    body: String,
  },

  /// The request never produced a response
  #[error("{service} {operation} failed: {reason}")]
  Transport {
    service: &'static str,
    operation: String,
    reason: String,
  },

  /// The service answered 2xx with a body we could not use
  #[error("{service} {operation} returned an unexpected response: {reason}")]
  Decode {
    service: &'static str,
    operation: String,
    reason: String,
  },
}

impl RemoteError {
  fn help_message(&self) -> Option<String> {
    match self {
      RemoteError::Status { status: 401 | 403, .. } => {
        Some("Check that the credentials in the environment are valid and have write access.".to_string())
      }
      RemoteError::Status { status: 422, service: "github", .. } => Some(
        "GitHub rejected the request. The tag must exist on the remote before a release can point at it.".to_string(),
      ),
      _ => None,
    }
  }
}

/// Result type alias for dyn-deploy
pub type DeployResult<T> = Result<T, DeployError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> DeployResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> DeployResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<DeployError>,
{
  fn context(self, ctx: impl Into<String>) -> DeployResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> DeployResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &DeployError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exit_codes_by_category() {
    let config = DeployError::from(ConfigError::MissingField {
      field: "S3_BUCKET".to_string(),
    });
    assert_eq!(config.exit_code(), ExitCode::User);

    let remote = DeployError::from(RemoteError::Status {
      service: "s3",
      operation: "PUT dyn/a.zip".to_string(),
      status: 500,
      body: "boom".to_string(),
    });
    assert_eq!(remote.exit_code(), ExitCode::Remote);
    assert_eq!(remote.exit_code().as_i32(), 3);

    let io = DeployError::from(io::Error::other("disk"));
    assert_eq!(io.exit_code(), ExitCode::System);
  }

  #[test]
  fn test_context_keeps_structured_category() {
    let err = DeployError::from(ConfigError::MissingField {
      field: "GITHUB_TOKEN".to_string(),
    })
    .context("while preparing release");
    assert_eq!(err.exit_code(), ExitCode::User);
  }

  #[test]
  fn test_context_chains_messages() {
    let err: DeployResult<()> = Err(DeployError::message("inner"));
    let err = err.context("middle").context("outer").unwrap_err();
    assert_eq!(err.to_string(), "inner\nouter\nmiddle");
  }

  #[test]
  fn test_remote_error_surfaces_provider_text() {
    let err = DeployError::from(RemoteError::Status {
      service: "github",
      operation: "create release".to_string(),
      status: 422,
      body: "{\"message\":\"Validation Failed\"}".to_string(),
    });
    let text = err.to_string();
    assert!(text.contains("HTTP 422"));
    assert!(text.contains("Validation Failed"));
    assert!(err.help_message().is_some());
  }

  #[test]
  fn test_missing_storage_field_has_help() {
    let err = DeployError::from(ConfigError::MissingField {
      field: "S3_BUCKET".to_string(),
    });
    assert!(err.help_message().unwrap().contains("S3_BUCKET"));
  }
}
