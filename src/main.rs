//! grapheus - CLI entry point.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use git2::Repository;
use tracing_subscriber::EnvFilter;

use grapheus::config::{DEFAULT_MAX_RETRIES, GenerationConfig, ModelId};
use grapheus::prompt::PromptOptions;
use grapheus::provider::{HttpGenerator, ProviderKind};
use grapheus::workflow::{self, TerminalPrompter, WorkflowOptions};

/// Generate git commit messages from staged changes using an LLM backend.
#[derive(Parser, Debug)]
#[command(name = "grapheus")]
#[command(about = "Generate git commit messages from staged changes using an LLM backend")]
#[command(version)]
struct Cli {
    /// Backend and model as 'provider:model' (bare 'provider' uses its default model)
    #[arg(short, long, default_value = "openai:gpt-4o")]
    model: String,

    /// Extra context forwarded to the backend verbatim
    #[arg(long)]
    hint: Option<String>,

    /// Single summary line, no bullet points
    #[arg(long)]
    one_line: bool,

    /// Drop the conventional-commit prefix requirement
    #[arg(long)]
    no_conventional: bool,

    /// Accept the first generated message without prompting
    #[arg(short, long)]
    yes: bool,

    /// Show what would be committed without committing
    #[arg(long)]
    dry_run: bool,

    /// Push the current branch after committing
    #[arg(short, long)]
    push: bool,

    /// Split the staged files into several logical commits
    #[arg(short, long)]
    group: bool,

    /// Print the generated message and exit without committing
    #[arg(long)]
    message_only: bool,

    /// Stage all changes (like 'git add -A') before generating
    #[arg(short, long)]
    add_all: bool,

    /// Attempts for the generation call
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    max_retries: u32,

    /// Verbose logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let model = resolve_model(&cli.model)?;
    let kind = ProviderKind::from_name(&model.provider)?;

    let generation = GenerationConfig {
        max_retries: cli.max_retries,
        ..Default::default()
    };
    generation.validate()?;

    let generator = HttpGenerator::new(kind, generation.timeout)
        .with_context(|| format!("Could not configure backend '{}'", model.provider))?;

    let repo = Repository::open_from_env()
        .context("Not a git repository. Run grapheus from within a git repository.")?;

    let options = WorkflowOptions {
        model,
        prompt: PromptOptions {
            one_liner: cli.one_line,
            conventional: !cli.no_conventional,
            hint: cli.hint.unwrap_or_default(),
        },
        generation,
        require_confirmation: !cli.yes,
        dry_run: cli.dry_run,
        push: cli.push,
        message_only: cli.message_only,
        add_all: cli.add_all,
        group: cli.group,
    };

    let mut prompter = TerminalPrompter;
    workflow::run(&repo, &generator, &options, &mut prompter).await
}

/// Parse `provider:model`, falling back to the provider's default model
/// when only a provider name is given.
fn resolve_model(raw: &str) -> Result<ModelId> {
    match ModelId::parse(raw) {
        Ok(model) => Ok(model),
        Err(parse_err) => match ProviderKind::from_name(raw) {
            Ok(kind) => Ok(ModelId {
                provider: raw.to_string(),
                model: kind.descriptor().default_model.to_string(),
            }),
            Err(_) => Err(parse_err.into()),
        },
    }
}
