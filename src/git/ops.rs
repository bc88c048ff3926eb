//! Index and commit operations.
//!
//! Everything runs through git2 in-process except push, which shells out to
//! the git binary so the user's credential helpers and SSH config apply.
//! libgit2 never runs hooks, so commits made here always behave as if
//! `--no-verify` were passed.

use std::path::Path;
use std::process::Command;

use git2::{ApplyLocation, Diff, IndexAddOption, Oid, Repository};
use tracing::{debug, warn};

use crate::error::GitError;

use super::snapshot::resolve_head_tree;

/// Stage every change in the working tree, like `git add -A`.
pub fn stage_all(repo: &Repository) -> Result<(), GitError> {
    let mut index = repo.index().map_err(GitError::StagingFailed)?;
    index
        .add_all(["*"].iter(), IndexAddOption::DEFAULT, None)
        .map_err(GitError::StagingFailed)?;
    // add_all skips worktree deletions of tracked files.
    index
        .update_all(["*"].iter(), None)
        .map_err(GitError::StagingFailed)?;
    index.write().map_err(GitError::StagingFailed)?;
    Ok(())
}

/// Stage exactly the given paths, handling deletions.
pub fn stage_paths(repo: &Repository, paths: &[String]) -> Result<(), GitError> {
    let root = repo
        .workdir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| repo.path().to_path_buf());

    let mut index = repo.index().map_err(GitError::StagingFailed)?;
    for path in paths {
        let rel = Path::new(path);
        if root.join(rel).exists() {
            index.add_path(rel).map_err(GitError::StagingFailed)?;
        } else {
            index.remove_path(rel).map_err(GitError::StagingFailed)?;
        }
    }
    index.write().map_err(GitError::StagingFailed)?;
    Ok(())
}

/// Reset the index to match HEAD, unstaging everything. Working tree files
/// are untouched. On an unborn branch the index is simply cleared.
pub fn reset_index(repo: &Repository) -> Result<(), GitError> {
    let mut index = repo.index().map_err(GitError::ResetFailed)?;
    match resolve_head_tree(repo).map_err(|_| GitError::ResetFailed(git2::Error::from_str("HEAD lookup failed")))? {
        Some(tree) => index.read_tree(&tree).map_err(GitError::ResetFailed)?,
        None => index.clear().map_err(GitError::ResetFailed)?,
    }
    index.write().map_err(GitError::ResetFailed)?;
    Ok(())
}

/// Create a commit from the current index with the given message.
///
/// Handles the unborn-branch case (first commit, no parents). The author
/// signature comes from the repository config; a missing `user.name` or
/// `user.email` surfaces as [`GitError::ConfigError`].
pub fn commit(repo: &Repository, message: &str) -> Result<Oid, GitError> {
    let signature = repo.signature().map_err(GitError::ConfigError)?;

    let mut index = repo.index().map_err(GitError::CommitFailed)?;
    let tree_id = index.write_tree().map_err(GitError::CommitFailed)?;
    let tree = repo.find_tree(tree_id).map_err(GitError::CommitFailed)?;

    let parent = match repo.head() {
        Ok(head) => Some(head.peel_to_commit().map_err(GitError::CommitFailed)?),
        Err(_) => None,
    };
    let parents: Vec<&git2::Commit> = parent.iter().collect();

    let oid = repo
        .commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )
        .map_err(GitError::CommitFailed)?;
    debug!(%oid, "created commit");
    Ok(oid)
}

/// Restore a previously captured staged state after a failed grouped run.
///
/// First tries to apply the captured patch to the index; if the index has
/// drifted too far for a clean apply, falls back to re-staging the captured
/// paths from the working tree.
pub fn restore_staged(repo: &Repository, diff_text: &str, files: &[String]) -> Result<(), GitError> {
    reset_index(repo)?;

    match Diff::from_buffer(diff_text.as_bytes())
        .and_then(|diff| repo.apply(&diff, ApplyLocation::Index, None))
    {
        Ok(()) => Ok(()),
        Err(apply_err) => {
            warn!("patch apply failed ({apply_err}), re-staging paths instead");
            stage_paths(repo, files)
                .map_err(|e| GitError::RestoreFailed(e.to_string()))
        }
    }
}

/// Push the current branch by shelling out to git, so credential helpers,
/// SSH agents, and push hooks all behave exactly as a manual push would.
pub fn push_current_branch(repo_root: &Path) -> Result<(), GitError> {
    let output = Command::new("git")
        .arg("push")
        .current_dir(repo_root)
        .output()
        .map_err(|e| GitError::PushFailed(format!("could not run git: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(GitError::PushFailed(stderr.trim().to_string()))
    }
}
