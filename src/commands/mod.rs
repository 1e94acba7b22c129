//! CLI commands for dyn-deploy
//!
//! - **deploy**: package, upload to object storage, reconcile the hosted release
//! - **resolve**: print the version derived from git tags
//! - **package**: build the release archive only
//! - **notes**: render release notes from a changelog payload
//! - **stamp**: embed a manifest into an executable inside an archive
//!
//! Each command builds its configuration once from the process environment
//! and hands it to the library code by reference.

pub mod deploy;
pub mod notes;
pub mod package;
pub mod resolve;
pub mod stamp;

pub use deploy::{DeployArgs, run_deploy};
pub use notes::run_notes;
pub use package::run_package;
pub use resolve::run_resolve;
pub use stamp::run_stamp;
