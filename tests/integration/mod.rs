//! Integration tests driving the dyn-deploy binary

mod helpers;

mod test_deploy;
mod test_notes;
mod test_package;
mod test_resolve;
