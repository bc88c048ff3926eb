//! Top-level flows: single commit, grouped commits, message-only, and the
//! interactive confirmation loop that sits in front of every commit.

use dialoguer::{Confirm, Editor, Input};
use git2::Repository;
use tracing::{info, warn};

use crate::config::{DEFAULT_DIFF_TOKEN_BUDGET, GenerationConfig, ModelId};
use crate::diff::preprocess;
use crate::error::GitError;
use crate::git::{self, RepoSnapshot};
use crate::grouping::{self, MAX_PLAN_ATTEMPTS};
use crate::prompt::{PromptOptions, build_prompts, clean_message};
use crate::provider::{GenerationRequest, Message, TextGenerator, generate_with_retry};
use crate::secrets::{DefaultScanner, SecretScanner};

/// Everything the flows need beyond the repository and the backend.
#[derive(Debug, Clone)]
pub struct WorkflowOptions {
    pub model: ModelId,
    pub prompt: PromptOptions,
    pub generation: GenerationConfig,
    /// `false` (from `--yes`) accepts the first generated message.
    pub require_confirmation: bool,
    pub dry_run: bool,
    pub push: bool,
    pub message_only: bool,
    pub add_all: bool,
    pub group: bool,
}

/// What the user chose at the confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmAction {
    Accept,
    Reject,
    Edit,
    Regenerate,
    Feedback(String),
}

/// Map raw prompt input onto an action.
///
/// Empty input and `y`/`yes` accept; `n`/`no` reject; `e` opens the editor;
/// `r` asks for an alternative; anything else becomes revision feedback.
pub fn parse_action(input: &str) -> ConfirmAction {
    let trimmed = input.trim();
    match trimmed.to_lowercase().as_str() {
        "" | "y" | "yes" => ConfirmAction::Accept,
        "n" | "no" => ConfirmAction::Reject,
        "e" | "edit" => ConfirmAction::Edit,
        "r" | "reroll" => ConfirmAction::Regenerate,
        _ => ConfirmAction::Feedback(trimmed.to_string()),
    }
}

/// Interaction boundary, so flows can be driven by a script in tests.
///
/// Every method returns `None` on keyboard interrupt, which flows treat as
/// a clean cancellation.
pub trait Prompter {
    fn read_input(&mut self, message: &str) -> Option<String>;
    fn edit(&mut self, seed: &str) -> Option<String>;
    fn confirm(&mut self, prompt: &str) -> Option<bool>;
}

/// dialoguer-backed prompter for real terminal sessions.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_input(&mut self, message: &str) -> Option<String> {
        println!("\n{message}\n");
        Input::<String>::new()
            .with_prompt("Commit? [Y]es / [n]o / [e]dit / [r]eroll / feedback")
            .allow_empty(true)
            .interact_text()
            .ok()
    }

    fn edit(&mut self, seed: &str) -> Option<String> {
        match Editor::new().edit(seed) {
            Ok(Some(edited)) => Some(edited),
            // Editor closed without saving.
            Ok(None) => None,
            Err(_) => None,
        }
    }

    fn confirm(&mut self, prompt: &str) -> Option<bool> {
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .ok()
    }
}

/// Result of the confirmation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted(String),
    Rejected,
}

/// Run the confirmation loop over a generated message.
///
/// The conversation is append-only: every regenerate or feedback round
/// pushes the rejected message and the follow-up instruction, so the
/// backend sees the full revision history.
pub async fn confirm_message(
    generator: &dyn TextGenerator,
    options: &WorkflowOptions,
    conversation: &mut Vec<Message>,
    initial: String,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<Outcome> {
    if !options.require_confirmation {
        return Ok(Outcome::Accepted(initial));
    }

    let mut message = initial;
    loop {
        let Some(input) = prompter.read_input(&message) else {
            return Ok(Outcome::Rejected);
        };

        match parse_action(&input) {
            ConfirmAction::Accept => return Ok(Outcome::Accepted(message)),
            ConfirmAction::Reject => return Ok(Outcome::Rejected),
            ConfirmAction::Edit => {
                match prompter.edit(&message) {
                    Some(edited) if !edited.trim().is_empty() => {
                        message = edited.trim().to_string();
                    }
                    // Cancelled or emptied edit keeps the prior message.
                    _ => {}
                }
            }
            ConfirmAction::Regenerate => {
                conversation.push(Message::assistant(message.clone()));
                conversation.push(Message::user(
                    "Write a different commit message for the same changes.",
                ));
                message = regenerate(generator, options, conversation).await?;
            }
            ConfirmAction::Feedback(feedback) => {
                conversation.push(Message::assistant(message.clone()));
                conversation.push(Message::user(format!(
                    "Revise the commit message with this feedback: {feedback}"
                )));
                message = regenerate(generator, options, conversation).await?;
            }
        }
    }
}

async fn regenerate(
    generator: &dyn TextGenerator,
    options: &WorkflowOptions,
    conversation: &[Message],
) -> anyhow::Result<String> {
    let mut request = GenerationRequest::new(options.model.model.clone(), conversation.to_vec());
    request.temperature = options.generation.temperature;
    request.max_tokens = options.generation.max_tokens;
    let raw = generate_with_retry(generator, &request, options.generation.max_retries).await?;
    Ok(clean_message(&raw))
}

/// Capture the staged state, preprocess the diff, and scan for secrets.
pub fn prepare_snapshot(repo: &Repository, options: &WorkflowOptions) -> Result<RepoSnapshot, GitError> {
    if options.add_all {
        git::stage_all(repo)?;
    }
    let snapshot = RepoSnapshot::capture(repo)?;
    let processed = preprocess(
        &snapshot.diff_text,
        DEFAULT_DIFF_TOKEN_BUDGET,
        &options.model.model,
    );
    let secrets = DefaultScanner::new().scan(&snapshot.diff_text);
    Ok(snapshot.with_processed(processed, secrets))
}

/// Warn about detected secrets and ask whether to continue.
///
/// Findings never hard-fail the run; with `--yes` they are logged and the
/// run proceeds.
fn pass_secret_gate(
    snapshot: &RepoSnapshot,
    options: &WorkflowOptions,
    prompter: &mut dyn Prompter,
) -> bool {
    if snapshot.secrets.is_empty() {
        return true;
    }
    for finding in &snapshot.secrets {
        warn!(label = %finding.label, "possible secret in staged diff: {}", finding.line);
    }
    if !options.require_confirmation {
        return true;
    }
    prompter
        .confirm("Staged diff may contain secrets. Commit anyway?")
        .unwrap_or(false)
}

/// Capture and preprocess, reporting the benign "nothing to do" cases.
///
/// `None` ends the run with exit 0: nothing is staged, or every staged
/// change was filtered out as noise. Neither is an error and neither
/// reaches the backend.
fn prepare_or_report(
    repo: &Repository,
    options: &WorkflowOptions,
) -> anyhow::Result<Option<RepoSnapshot>> {
    let snapshot = match prepare_snapshot(repo, options) {
        Ok(snapshot) => snapshot,
        Err(GitError::NoStagedChanges) => {
            println!("{}", GitError::NoStagedChanges);
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };

    if snapshot.processed_diff.is_empty() {
        println!("All staged changes are binary, minified, or vendored; nothing to show.");
        return Ok(None);
    }

    Ok(Some(snapshot))
}

/// Generate one commit message for the whole staged diff and commit it.
///
/// Returns the process exit code: 0 for success and clean cancellation,
/// 1 is reserved for errors surfaced through `Err`.
pub async fn run_single(
    repo: &Repository,
    generator: &dyn TextGenerator,
    options: &WorkflowOptions,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<i32> {
    let Some(snapshot) = prepare_or_report(repo, options)? else {
        return Ok(0);
    };

    let (system, user) = build_prompts(
        &snapshot.status_text,
        &snapshot.processed_diff,
        &snapshot.diff_stat,
        &options.prompt,
    );
    let mut conversation = vec![Message::system(system), Message::user(user)];
    let initial = regenerate(generator, options, &conversation).await?;

    if options.message_only {
        println!("{initial}");
        return Ok(0);
    }

    let message = match confirm_message(generator, options, &mut conversation, initial, prompter).await? {
        Outcome::Accepted(message) => message,
        Outcome::Rejected => {
            info!("commit cancelled");
            return Ok(0);
        }
    };

    if !pass_secret_gate(&snapshot, options, prompter) {
        info!("commit cancelled at secret gate");
        return Ok(0);
    }

    if options.dry_run {
        println!("[dry-run] would commit {} files:\n{message}", snapshot.staged_files.len());
        return Ok(0);
    }

    let oid = git::commit(repo, &message)?;
    println!("Committed {oid}");

    if options.push {
        git::push_current_branch(&snapshot.root)?;
        println!("Pushed {}", snapshot.branch);
    }

    Ok(0)
}

/// Partition the staged files into several commits and execute them.
pub async fn run_grouped(
    repo: &Repository,
    generator: &dyn TextGenerator,
    options: &WorkflowOptions,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<i32> {
    let Some(snapshot) = prepare_or_report(repo, options)? else {
        return Ok(0);
    };

    let plan = grouping::propose_plan(
        generator,
        &options.model.model,
        &snapshot.staged_files,
        &snapshot.processed_diff,
        &options.generation,
        MAX_PLAN_ATTEMPTS,
    )
    .await?;

    println!("\nPlanned commits:");
    for (i, group) in plan.groups.iter().enumerate() {
        println!("  {}. {} ({} files)", i + 1, group.message, group.files.len());
        for file in &group.files {
            println!("       {file}");
        }
    }

    if options.dry_run {
        println!("[dry-run] no commits created");
        return Ok(0);
    }

    if options.require_confirmation {
        let confirmed = prompter
            .confirm(&format!("Create {} commits?", plan.groups.len()))
            .unwrap_or(false);
        if !confirmed {
            info!("grouped commit cancelled");
            return Ok(0);
        }
    }

    if !pass_secret_gate(&snapshot, options, prompter) {
        info!("grouped commit cancelled at secret gate");
        return Ok(0);
    }

    let oids = grouping::execute_plan(repo, &plan, &snapshot)?;
    println!("Created {} commits", oids.len());

    if options.push {
        git::push_current_branch(&snapshot.root)?;
        println!("Pushed {}", snapshot.branch);
    }

    Ok(0)
}

/// Dispatch on `--group`.
pub async fn run(
    repo: &Repository,
    generator: &dyn TextGenerator,
    options: &WorkflowOptions,
    prompter: &mut dyn Prompter,
) -> anyhow::Result<i32> {
    if options.group {
        run_grouped(repo, generator, options, prompter).await
    } else {
        run_single(repo, generator, options, prompter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use async_trait::async_trait;

    use crate::error::AiError;

    /// Prompter driven by a script of canned responses.
    struct ScriptedPrompter {
        inputs: VecDeque<Option<String>>,
        edits: VecDeque<Option<String>>,
        shown: Vec<String>,
    }

    impl ScriptedPrompter {
        fn new(inputs: &[Option<&str>]) -> Self {
            Self {
                inputs: inputs.iter().map(|i| i.map(str::to_string)).collect(),
                edits: VecDeque::new(),
                shown: Vec::new(),
            }
        }

        fn with_edits(mut self, edits: &[Option<&str>]) -> Self {
            self.edits = edits.iter().map(|e| e.map(str::to_string)).collect();
            self
        }
    }

    impl Prompter for ScriptedPrompter {
        fn read_input(&mut self, message: &str) -> Option<String> {
            self.shown.push(message.to_string());
            self.inputs.pop_front().flatten()
        }

        fn edit(&mut self, _seed: &str) -> Option<String> {
            self.edits.pop_front().flatten()
        }

        fn confirm(&mut self, _prompt: &str) -> Option<bool> {
            Some(true)
        }
    }

    /// Generator returning canned responses in order.
    struct ScriptedGenerator {
        responses: std::sync::Mutex<VecDeque<String>>,
        calls: std::sync::atomic::AtomicU32,
    }

    impl ScriptedGenerator {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: std::sync::Mutex::new(
                    responses.iter().map(|r| r.to_string()).collect(),
                ),
                calls: std::sync::atomic::AtomicU32::new(0),
            }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, AiError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| AiError::model("script exhausted"))
        }
    }

    fn options() -> WorkflowOptions {
        WorkflowOptions {
            model: ModelId::parse("openai:gpt-4o").unwrap(),
            prompt: PromptOptions::default(),
            generation: GenerationConfig::default(),
            require_confirmation: true,
            dry_run: false,
            push: false,
            message_only: false,
            add_all: false,
            group: false,
        }
    }

    #[test]
    fn test_parse_action_map() {
        assert_eq!(parse_action(""), ConfirmAction::Accept);
        assert_eq!(parse_action("y"), ConfirmAction::Accept);
        assert_eq!(parse_action("YES"), ConfirmAction::Accept);
        assert_eq!(parse_action("n"), ConfirmAction::Reject);
        assert_eq!(parse_action("no"), ConfirmAction::Reject);
        assert_eq!(parse_action("e"), ConfirmAction::Edit);
        assert_eq!(parse_action("r"), ConfirmAction::Regenerate);
        assert_eq!(
            parse_action("mention the ticket number"),
            ConfirmAction::Feedback("mention the ticket number".to_string())
        );
    }

    #[tokio::test]
    async fn test_yes_accepts_current_message() {
        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[Some("y")]);
        let mut conversation = Vec::new();

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Accepted("feat: add x".to_string()));
    }

    #[tokio::test]
    async fn test_no_rejects_without_generation() {
        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[Some("n")]);
        let mut conversation = Vec::new();

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn test_interrupt_rejects() {
        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[None]);
        let mut conversation = Vec::new();

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[tokio::test]
    async fn test_reroll_appends_to_conversation_and_shows_new_message() {
        let generator = ScriptedGenerator::new(&["fix: better message"]);
        let mut prompter = ScriptedPrompter::new(&[Some("r"), Some("y")]);
        let mut conversation = vec![Message::system("s"), Message::user("u")];

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: first try".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Accepted("fix: better message".to_string()));
        // system, user, rejected assistant, reroll request
        assert_eq!(conversation.len(), 4);
        assert!(conversation[3].content.contains("different commit message"));
    }

    #[tokio::test]
    async fn test_feedback_is_forwarded_verbatim() {
        let generator = ScriptedGenerator::new(&["feat: add x (refs ABC-1)"]);
        let mut prompter = ScriptedPrompter::new(&[Some("mention ABC-1"), Some("y")]);
        let mut conversation = vec![Message::system("s"), Message::user("u")];

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();

        assert_eq!(outcome, Outcome::Accepted("feat: add x (refs ABC-1)".to_string()));
        assert!(conversation[3].content.contains("mention ABC-1"));
    }

    #[tokio::test]
    async fn test_edit_replaces_message() {
        let generator = ScriptedGenerator::new(&[]);
        let mut prompter =
            ScriptedPrompter::new(&[Some("e"), Some("y")]).with_edits(&[Some("docs: my edit")]);
        let mut conversation = Vec::new();

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Accepted("docs: my edit".to_string()));
    }

    #[tokio::test]
    async fn test_cancelled_edit_keeps_prior_message() {
        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[Some("e"), Some("y")]).with_edits(&[None]);
        let mut conversation = Vec::new();

        let outcome = confirm_message(
            &generator,
            &options(),
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Accepted("feat: add x".to_string()));
    }

    fn init_repo(dir: &std::path::Path) -> Repository {
        let repo = Repository::init(dir).unwrap();
        {
            let mut config = repo.config().unwrap();
            config.set_str("user.name", "Test").unwrap();
            config.set_str("user.email", "test@test.com").unwrap();
        }
        repo
    }

    fn stage(repo: &Repository, name: &str, content: &str) {
        let full = repo.workdir().unwrap().join(name);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(std::path::Path::new(name)).unwrap();
        index.write().unwrap();
    }

    #[tokio::test]
    async fn test_clean_index_exits_zero_without_backend_call() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[]);

        let code = run_single(&repo, &generator, &options(), &mut prompter)
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_clean_index_exits_zero_in_grouped_flow() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());

        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[]);

        let code = run_grouped(&repo, &generator, &options(), &mut prompter)
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_all_filtered_diff_exits_zero_without_backend_call() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        stage(&repo, "node_modules/foo/foo.min.js", "var a=1;\n");

        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[]);

        let code = run_single(&repo, &generator, &options(), &mut prompter)
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(generator.call_count(), 0);
        // Nothing was committed either.
        assert!(repo.head().is_err());
    }

    #[tokio::test]
    async fn test_no_confirmation_short_circuits() {
        let generator = ScriptedGenerator::new(&[]);
        let mut prompter = ScriptedPrompter::new(&[]);
        let mut conversation = Vec::new();
        let mut opts = options();
        opts.require_confirmation = false;

        let outcome = confirm_message(
            &generator,
            &opts,
            &mut conversation,
            "feat: add x".to_string(),
            &mut prompter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::Accepted("feat: add x".to_string()));
        assert!(prompter.shown.is_empty());
    }
}
