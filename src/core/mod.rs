//! Core building blocks shared by every command
//!
//! - **config**: layered deployment configuration (CLI, environment, deploy.toml)
//! - **error**: error types with exit codes and contextual help
//! - **vcs**: git queries through the system `git` binary

pub mod config;
pub mod error;
pub mod vcs;
