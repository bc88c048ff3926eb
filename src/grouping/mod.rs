//! Grouped commits: partition the staged files into several logical
//! commits, validate the partition, and execute it sequentially.

use git2::{Oid, Repository};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::GroupingError;
use crate::git::{self, RepoSnapshot};
use crate::json::extract_json_object;
use crate::prompt::clean_message;
use crate::provider::{GenerationRequest, Message, TextGenerator};

/// One planned commit: a file subset and its message.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CommitGroup {
    pub files: Vec<String>,
    pub message: String,
}

/// An ordered partition of the staged files into commits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct GroupingPlan {
    pub groups: Vec<CommitGroup>,
}

/// How many times an invalid plan is sent back with corrective feedback.
pub const MAX_PLAN_ATTEMPTS: u32 = 3;

const GROUPING_SYSTEM_PROMPT: &str = "\
You are an expert software engineer splitting staged changes into separate git commits.\n\
Partition the staged files into logical groups where each group is one coherent change.\n\
Every staged file must appear in exactly one group. Do not invent files.\n\
Each group needs a commit message following the conventional commit format.\n\
Respond with ONLY a JSON object of this shape, no prose, no code fences:\n\
{\"groups\": [{\"files\": [\"path/a\", \"path/b\"], \"message\": \"feat: ...\"}]}";

fn build_user_prompt(staged_files: &[String], diff: &str) -> String {
    format!(
        "Staged files:\n{}\n\nStaged diff:\n{}\n\nReturn the JSON grouping plan now.",
        staged_files.join("\n"),
        diff
    )
}

/// Parse a raw backend response into a plan, cleaning each group message.
pub fn parse_plan(raw: &str) -> Result<GroupingPlan, GroupingError> {
    let json = extract_json_object(raw);
    let mut plan: GroupingPlan = serde_json::from_str(json.trim())
        .map_err(|e| GroupingError::ParseFailed(e.to_string()))?;
    for group in &mut plan.groups {
        group.message = clean_message(&group.message);
    }
    Ok(plan)
}

/// Check that `plan` is a complete, disjoint partition of `staged_files`.
///
/// Checks run in a fixed order so the retry feedback is deterministic:
/// empty plan, empty group, unknown files, then completeness before
/// disjointness. A plan that both omits and duplicates files gets the
/// missing-file corrective feedback, which the backend can act on directly.
pub fn validate_plan(plan: &GroupingPlan, staged_files: &[String]) -> Result<(), GroupingError> {
    if plan.groups.is_empty() {
        return Err(GroupingError::EmptyPlan);
    }

    for (index, group) in plan.groups.iter().enumerate() {
        if group.files.is_empty() {
            return Err(GroupingError::EmptyGroup {
                index,
                message: group.message.clone(),
            });
        }
    }

    let planned: Vec<&String> = plan.groups.iter().flat_map(|g| &g.files).collect();

    let unknown: Vec<String> = planned
        .iter()
        .filter(|f| !staged_files.contains(f))
        .map(|f| (*f).clone())
        .collect();
    if !unknown.is_empty() {
        return Err(GroupingError::UnknownFiles(unknown));
    }

    let missing: Vec<String> = staged_files
        .iter()
        .filter(|f| !planned.contains(f))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(GroupingError::MissingFiles(missing));
    }

    let mut seen: Vec<&String> = Vec::new();
    for file in planned {
        if seen.contains(&file) {
            return Err(GroupingError::DuplicateFile(file.clone()));
        }
        seen.push(file);
    }

    Ok(())
}

/// Corrective feedback sent back to the backend for an invalid plan.
///
/// For missing files the feedback names exactly the omitted paths so the
/// backend can add them without re-deriving the whole partition.
fn corrective_feedback(error: &GroupingError) -> String {
    match error {
        GroupingError::MissingFiles(files) => format!(
            "Your plan omitted these staged files: {}. Every staged file must appear \
             in exactly one group. Return the corrected JSON plan.",
            files.join(", ")
        ),
        other => format!(
            "Your plan was invalid: {other}. Return a corrected JSON plan with every \
             staged file in exactly one group."
        ),
    }
}

/// Ask the backend for a grouping plan, re-prompting with corrective
/// feedback up to `max_attempts` times when the plan is invalid.
pub async fn propose_plan(
    generator: &dyn TextGenerator,
    model: &str,
    staged_files: &[String],
    diff: &str,
    config: &GenerationConfig,
    max_attempts: u32,
) -> Result<GroupingPlan, GroupingError> {
    let max_attempts = max_attempts.max(1);
    let mut messages = vec![
        Message::system(GROUPING_SYSTEM_PROMPT),
        Message::user(build_user_prompt(staged_files, diff)),
    ];
    let mut last_error: Option<GroupingError> = None;

    for attempt in 1..=max_attempts {
        let mut request = GenerationRequest::new(model, messages.clone());
        request.temperature = config.temperature;
        request.max_tokens = config.max_tokens;
        let raw = generator.generate(&request).await?;

        let outcome = parse_plan(&raw).and_then(|plan| {
            validate_plan(&plan, staged_files)?;
            Ok(plan)
        });

        match outcome {
            Ok(plan) => {
                info!(groups = plan.groups.len(), attempt, "grouping plan accepted");
                return Ok(plan);
            }
            Err(error) => {
                warn!(attempt, %error, "grouping plan rejected");
                let feedback = corrective_feedback(&error);
                messages.push(Message::assistant(raw));
                messages.push(Message::user(feedback));
                last_error = Some(error);
            }
        }
    }

    let last = last_error.unwrap_or(GroupingError::EmptyPlan);
    Err(GroupingError::RetriesExhausted {
        attempts: max_attempts,
        last: Box::new(last),
    })
}

/// Execute a validated plan: one commit per group, in plan order.
///
/// Each step resets the index, stages the group's files, and commits. On
/// failure the original staged state is restored best-effort and the error
/// reports how many commits landed before the stop.
pub fn execute_plan(
    repo: &Repository,
    plan: &GroupingPlan,
    snapshot: &RepoSnapshot,
) -> Result<Vec<Oid>, GroupingError> {
    let total = plan.groups.len();
    let mut oids = Vec::with_capacity(total);

    for (completed, group) in plan.groups.iter().enumerate() {
        let step = || -> Result<Oid, crate::error::GitError> {
            git::reset_index(repo)?;
            git::stage_paths(repo, &group.files)?;
            git::commit(repo, &group.message)
        };

        match step() {
            Ok(oid) => {
                debug!(%oid, message = %group.message, "group committed");
                oids.push(oid);
            }
            Err(source) => {
                if let Err(restore_err) =
                    git::restore_staged(repo, &snapshot.diff_text, &snapshot.staged_files)
                {
                    warn!("could not restore staged state: {restore_err}");
                }
                return Err(GroupingError::ExecutionFailed {
                    completed,
                    total,
                    failed_message: group.message.clone(),
                    source,
                });
            }
        }
    }

    Ok(oids)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staged() -> Vec<String> {
        vec!["a.py".to_string(), "b.py".to_string(), "c.py".to_string()]
    }

    fn plan(groups: &[(&[&str], &str)]) -> GroupingPlan {
        GroupingPlan {
            groups: groups
                .iter()
                .map(|(files, message)| CommitGroup {
                    files: files.iter().map(|f| f.to_string()).collect(),
                    message: message.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_plan_from_fenced_json() {
        let raw = "```json\n{\"groups\": [{\"files\": [\"a.py\"], \"message\": \"fix: a\"}]}\n```";
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.groups.len(), 1);
        assert_eq!(plan.groups[0].files, vec!["a.py"]);
    }

    #[test]
    fn test_parse_plan_cleans_group_messages() {
        let raw = "{\"groups\": [{\"files\": [\"a.py\"], \"message\": \"tidy things\"}]}";
        let plan = parse_plan(raw).unwrap();
        assert_eq!(plan.groups[0].message, "chore: tidy things");
    }

    #[test]
    fn test_parse_plan_rejects_prose() {
        let err = parse_plan("I could not group these files.").unwrap_err();
        assert!(matches!(err, GroupingError::ParseFailed(_)));
    }

    #[test]
    fn test_validate_accepts_complete_partition() {
        let p = plan(&[(&["a.py", "b.py"], "feat: ab"), (&["c.py"], "fix: c")]);
        assert!(validate_plan(&p, &staged()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_plan() {
        let p = GroupingPlan { groups: Vec::new() };
        assert!(matches!(
            validate_plan(&p, &staged()),
            Err(GroupingError::EmptyPlan)
        ));
    }

    #[test]
    fn test_validate_rejects_empty_group() {
        let p = plan(&[(&["a.py", "b.py", "c.py"], "feat: all"), (&[], "fix: none")]);
        assert!(matches!(
            validate_plan(&p, &staged()),
            Err(GroupingError::EmptyGroup { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_files() {
        let p = plan(&[(&["a.py", "b.py", "c.py", "ghost.py"], "feat: all")]);
        match validate_plan(&p, &staged()) {
            Err(GroupingError::UnknownFiles(files)) => assert_eq!(files, vec!["ghost.py"]),
            other => panic!("expected UnknownFiles, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let p = plan(&[(&["a.py", "b.py"], "feat: ab"), (&["b.py", "c.py"], "fix: bc")]);
        match validate_plan(&p, &staged()) {
            Err(GroupingError::DuplicateFile(file)) => assert_eq!(file, "b.py"),
            other => panic!("expected DuplicateFile, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_names_missing_files() {
        let p = plan(&[(&["a.py"], "feat: a")]);
        match validate_plan(&p, &staged()) {
            Err(GroupingError::MissingFiles(files)) => {
                assert_eq!(files, vec!["b.py", "c.py"]);
            }
            other => panic!("expected MissingFiles, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_reports_missing_before_duplicates() {
        // Omits b.py AND duplicates a.py; completeness wins.
        let p = plan(&[(&["a.py", "c.py"], "feat: ac"), (&["a.py"], "fix: a again")]);
        match validate_plan(&p, &staged()) {
            Err(GroupingError::MissingFiles(files)) => assert_eq!(files, vec!["b.py"]),
            other => panic!("expected MissingFiles, got {other:?}"),
        }
    }

    #[test]
    fn test_feedback_for_missing_files_names_them() {
        let error = GroupingError::MissingFiles(vec!["b.py".to_string()]);
        let feedback = corrective_feedback(&error);
        assert!(feedback.contains("b.py"));
        assert!(feedback.contains("exactly one group"));
    }
}
