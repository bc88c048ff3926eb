//! Repository state capture and index/commit operations using git2.

pub mod ops;
pub mod snapshot;

pub use ops::{commit, push_current_branch, reset_index, restore_staged, stage_all, stage_paths};
pub use snapshot::RepoSnapshot;
