//! Read-only snapshot of the repository state for one workflow invocation.

use std::path::PathBuf;

use git2::{Delta, DiffFormat, DiffStatsFormat, ErrorCode, Repository, Tree};

use crate::error::GitError;
use crate::secrets::SecretFinding;

/// Everything the workflow needs to know about the repository, captured
/// once at the point staged changes are inspected.
///
/// Re-captured only when the caller explicitly stages more files; nothing
/// mutates an existing snapshot in place.
#[derive(Debug, Clone)]
pub struct RepoSnapshot {
    pub root: PathBuf,
    pub branch: String,
    pub staged_files: Vec<String>,
    pub status_text: String,
    pub diff_text: String,
    pub diff_stat: String,
    pub remotes: Vec<String>,
    /// Preprocessed diff, filled by [`RepoSnapshot::with_processed`].
    pub processed_diff: String,
    /// Findings from the pluggable secret scan of the staged diff.
    pub secrets: Vec<SecretFinding>,
}

impl RepoSnapshot {
    /// Capture the staged state of `repo`.
    ///
    /// Fails with [`GitError::NoStagedChanges`] when the index matches HEAD.
    pub fn capture(repo: &Repository) -> Result<Self, GitError> {
        let root = repo
            .workdir()
            .map(PathBuf::from)
            .unwrap_or_else(|| repo.path().to_path_buf());

        let head_tree = resolve_head_tree(repo)?;
        let diff = repo
            .diff_tree_to_index(head_tree.as_ref(), None, None)
            .map_err(GitError::DiffFailed)?;

        let mut staged_files = Vec::new();
        let mut status_lines = Vec::new();
        for delta in diff.deltas() {
            let path = delta
                .new_file()
                .path()
                .or_else(|| delta.old_file().path())
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_default();
            if path.is_empty() {
                continue;
            }
            status_lines.push(format!("{} {path}", status_letter(delta.status())));
            staged_files.push(path);
        }

        if staged_files.is_empty() {
            return Err(GitError::NoStagedChanges);
        }

        let mut diff_text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            let origin = line.origin();
            if origin == '+' || origin == '-' || origin == ' ' {
                diff_text.push(origin);
            }
            diff_text.push_str(std::str::from_utf8(line.content()).unwrap_or(""));
            true
        })
        .map_err(GitError::DiffFailed)?;

        let diff_stat = diff
            .stats()
            .and_then(|s| s.to_buf(DiffStatsFormat::FULL, 80))
            .map(|buf| buf.as_str().unwrap_or("").to_string())
            .map_err(GitError::DiffFailed)?;

        let branch = current_branch(repo);
        let remotes = repo
            .remotes()
            .map(|names| {
                names
                    .iter()
                    .flatten()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        Ok(Self {
            root,
            branch,
            staged_files,
            status_text: status_lines.join("\n"),
            diff_text,
            diff_stat,
            remotes,
            processed_diff: String::new(),
            secrets: Vec::new(),
        })
    }

    /// Attach the preprocessed diff and secret findings, consuming self.
    pub fn with_processed(mut self, processed_diff: String, secrets: Vec<SecretFinding>) -> Self {
        self.processed_diff = processed_diff;
        self.secrets = secrets;
        self
    }
}

/// Resolve the HEAD tree, treating an unborn branch as "no tree" rather
/// than an error so the first commit of a repository still works.
pub(crate) fn resolve_head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    let head_ref = match repo.head() {
        Ok(r) => r,
        Err(e) if e.code() == ErrorCode::UnbornBranch || e.code() == ErrorCode::NotFound => {
            return Ok(None);
        }
        Err(e) => return Err(GitError::DiffFailed(e)),
    };

    let tree = head_ref.peel_to_tree().map_err(GitError::DiffFailed)?;
    Ok(Some(tree))
}

fn current_branch(repo: &Repository) -> String {
    match repo.head() {
        Ok(head) => head.shorthand().unwrap_or("HEAD").to_string(),
        Err(_) => "HEAD".to_string(),
    }
}

fn status_letter(status: Delta) -> char {
    match status {
        Delta::Added | Delta::Untracked => 'A',
        Delta::Deleted => 'D',
        Delta::Renamed => 'R',
        Delta::Copied => 'C',
        Delta::Typechange => 'T',
        _ => 'M',
    }
}
