//! Read-only version-control queries
//!
//! Everything goes through the system `git` binary; see [`SystemGit`].

pub mod system_git;
mod system_git_ops;

pub use system_git::SystemGit;
